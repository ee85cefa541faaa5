//! Transport traits for both USB roles.
//!
//! Everything the core needs from a USB stack goes through these traits.
//! Requests return immediately; their outcome arrives later as an event
//! drained by the scheduler through `poll_event`.

use xinput_proto::{ControllerType, EndpointAddress, EndpointDescriptor, HostGamepadReport, SetupPacket};

/// Completion status of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferResult {
    Success,
    Failed,
    Stalled,
    Timeout,
}

impl TransferResult {
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Stage of a control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlStage {
    Setup,
    Data,
    Ack,
}

/// Something that happened on the device port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceEvent {
    BusReset,
    Configured,
    Unconfigured,
    Suspended,
    Resumed,
    TransferComplete {
        ep: EndpointAddress,
        result: TransferResult,
        len: usize,
    },
    ControlRequest {
        stage: ControlStage,
        request: SetupPacket,
    },
}

/// Device-role USB stack.
pub trait DeviceTransport {
    /// Open an endpoint described by `desc`.
    fn open_endpoint(&mut self, desc: &EndpointDescriptor) -> bool;

    /// Take exclusive use of an endpoint. Fails if already claimed.
    fn claim(&mut self, ep: EndpointAddress) -> bool;

    fn release(&mut self, ep: EndpointAddress);

    /// A transfer is in progress on the endpoint.
    fn busy(&self, ep: EndpointAddress) -> bool;

    /// The upstream host has configured the device.
    fn ready(&self) -> bool;

    /// Start an IN transfer. The data is copied before this returns.
    fn submit(&mut self, ep: EndpointAddress, data: &[u8]) -> bool;

    /// Arm an OUT endpoint to receive up to `len` bytes.
    fn arm_receive(&mut self, ep: EndpointAddress, len: usize) -> bool;

    /// Copy out the packet received by the last OUT completion. Returns the
    /// number of bytes written.
    fn read_packet(&mut self, ep: EndpointAddress, buf: &mut [u8]) -> usize;

    /// Answer the pending control request: `Some` sends a data stage,
    /// `None` stalls.
    fn control_reply(&mut self, data: Option<&[u8]>);

    fn poll_event(&mut self) -> Option<DeviceEvent>;
}

/// Something that happened on the host port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostEvent {
    Mounted {
        slot: u8,
        kind: ControllerType,
        connected: bool,
    },
    Unmounted {
        slot: u8,
    },
    ReportReceived {
        slot: u8,
        result: TransferResult,
        report: HostGamepadReport,
    },
}

/// Host-role controller stack.
pub trait HostTransport {
    /// Request the next input report from the pad in `slot`.
    fn receive_report(&mut self, slot: u8) -> bool;

    fn set_led(&mut self, slot: u8, quadrant: u8, on: bool) -> bool;

    fn set_rumble(&mut self, slot: u8, left: u8, right: u8) -> bool;

    fn poll_event(&mut self) -> Option<HostEvent>;
}
