//! Error types.

/// Why a class driver declined an interface during matching.
///
/// None of these are fatal: the interface is simply not the driver's, and
/// matching moves on to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// Class/subclass/protocol is not the XInput triple.
    InterfaceMismatch,
    /// Fewer bytes than the interface, its endpoints and the class
    /// descriptor need.
    DescriptorTooShort,
    /// An endpoint descriptor could not be parsed.
    Malformed,
    /// The transport refused to open an endpoint.
    EndpointOpen,
    /// The interface lacks an IN or an OUT endpoint.
    MissingEndpoint,
}

/// Why a report was not put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// No interface has been opened since the last reset.
    NotOpen,
    /// The link is not configured.
    NotReady,
    /// The IN endpoint is claimed or a transfer is in flight.
    Busy,
    /// The transport refused the transfer.
    Io,
}
