//! Class driver trait.

use xinput_proto::{EndpointAddress, SetupPacket};

use crate::error::DriverError;
use crate::transport::{ControlStage, DeviceTransport, TransferResult};

/// A device-side USB class driver.
///
/// The scheduler offers every interface of the active configuration to
/// [`ClassDriver::open`] and routes control requests and endpoint
/// completions to the driver that accepted the interface.
pub trait ClassDriver {
    /// Name used in log output.
    fn name(&self) -> &'static str;

    /// Try to take the interface starting at `interface`.
    ///
    /// `max_len` is the number of configuration bytes available from the
    /// interface descriptor onwards. Returns the number of bytes consumed.
    fn open<T: DeviceTransport>(
        &mut self,
        transport: &mut T,
        interface: &[u8],
        max_len: usize,
    ) -> Result<usize, DriverError>;

    /// Handle a control request addressed to the driver's interface.
    /// Returns `false` to stall.
    fn control_transfer<T: DeviceTransport>(
        &mut self,
        transport: &mut T,
        stage: ControlStage,
        request: &SetupPacket,
    ) -> bool;

    /// Handle a transfer completion. Returns `false` if `ep` is not one of
    /// the driver's endpoints.
    fn transfer_complete<T: DeviceTransport>(
        &mut self,
        transport: &mut T,
        ep: EndpointAddress,
        result: TransferResult,
        len: usize,
    ) -> bool;

    /// Forget everything learned since the last bus reset.
    fn reset<T: DeviceTransport>(&mut self, transport: &mut T);

    /// Interface number taken by `open`, if any.
    fn interface(&self) -> Option<u8>;
}
