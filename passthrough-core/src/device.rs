//! Device-side XInput class driver: the virtual pad seen by the upstream host.

use xinput_proto::descriptor::{DESC_ENDPOINT, ENDPOINT_DESC_LEN, INTERFACE_DESC_LEN, XINPUT_CLASS_DESC_LEN};
use xinput_proto::{
    Axis, Buttons, DeviceReport, Descriptors, EndpointAddress, EndpointDescriptor, GamepadState,
    InterfaceDescriptor, OutputCommand, SetupPacket,
};

use crate::driver::ClassDriver;
use crate::error::{DriverError, SendError};
use crate::transport::{ControlStage, DeviceTransport, TransferResult};

/// Size of the OUT receive buffer, one full-speed interrupt packet.
pub const RX_BUF_SIZE: usize = 32;

/// Lifecycle of the driver's IN endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverState {
    /// No interface bound.
    Uninit,
    /// Endpoints bound, nothing sent yet.
    Open,
    /// Last IN transfer completed.
    Idle,
    /// Report copied to the transmit buffer, not yet accepted by the transport.
    Staged,
    /// IN transfer in progress; the endpoint stays claimed until completion.
    InFlight,
}

/// The virtual XInput pad.
pub struct XInputDevice {
    state: DriverState,
    interface: Option<u8>,
    ep_in: Option<EndpointAddress>,
    ep_out: Option<EndpointAddress>,
    pad: GamepadState,
    tx_buf: [u8; DeviceReport::SIZE],
    rx_buf: [u8; RX_BUF_SIZE],
    command: Option<OutputCommand>,
    last_result: Option<TransferResult>,
    last_len: usize,
}

impl Default for XInputDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl XInputDevice {
    pub const NAME: &'static str = "XINPUT_DEVICE";

    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DriverState::Uninit,
            interface: None,
            ep_in: None,
            ep_out: None,
            pad: GamepadState::neutral(),
            tx_buf: DeviceReport::neutral().to_bytes(),
            rx_buf: [0; RX_BUF_SIZE],
            command: None,
            last_result: None,
            last_len: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state != DriverState::Uninit
    }

    /// IN endpoint bound by `open`.
    #[inline]
    #[must_use]
    pub fn ep_in(&self) -> Option<EndpointAddress> {
        self.ep_in
    }

    /// OUT endpoint bound by `open`.
    #[inline]
    #[must_use]
    pub fn ep_out(&self) -> Option<EndpointAddress> {
        self.ep_out
    }

    /// Bytes of the most recently staged report.
    #[inline]
    #[must_use]
    pub fn staged(&self) -> &[u8; DeviceReport::SIZE] {
        &self.tx_buf
    }

    /// The virtual pad's current state.
    #[inline]
    #[must_use]
    pub fn pad(&self) -> &GamepadState {
        &self.pad
    }

    /// Result and length of the last completed IN transfer.
    #[must_use]
    pub fn last_transfer(&self) -> Option<(TransferResult, usize)> {
        self.last_result.map(|r| (r, self.last_len))
    }

    pub fn press_button(&mut self, button: Buttons) {
        self.pad.press_button(button);
    }

    pub fn release_button(&mut self, button: Buttons) {
        self.pad.release_button(button);
    }

    pub fn set_axis(&mut self, axis: Axis, value: i16) {
        self.pad.set_axis(axis, value);
    }

    pub fn set_triggers(&mut self, left: u8, right: u8) {
        self.pad.set_triggers(left, right);
    }

    /// Replace the whole pad state.
    pub fn set_state(&mut self, state: GamepadState) {
        self.pad = state;
    }

    /// Take the last command received from the upstream host, if any.
    pub fn take_command(&mut self) -> Option<OutputCommand> {
        self.command.take()
    }

    /// Stage the pad state and start transmitting it.
    pub fn update<T: DeviceTransport>(&mut self, transport: &mut T) -> Result<(), SendError> {
        let report = DeviceReport::from(&self.pad);
        self.send_report(transport, &report)
    }

    /// Stage `report` and start transmitting it.
    ///
    /// Returns as soon as the transport has accepted the transfer. The IN
    /// endpoint stays claimed until its completion arrives. Every failure
    /// leaves the endpoint unclaimed and an in-flight frame untouched.
    pub fn send_report<T: DeviceTransport>(
        &mut self,
        transport: &mut T,
        report: &DeviceReport,
    ) -> Result<(), SendError> {
        let Some(ep) = self.ep_in else {
            return Err(SendError::NotOpen);
        };
        if !transport.ready() {
            return Err(SendError::NotReady);
        }
        if !transport.claim(ep) {
            return Err(SendError::Busy);
        }
        if transport.busy(ep) {
            transport.release(ep);
            return Err(SendError::Busy);
        }

        self.tx_buf = report.to_bytes();
        self.state = DriverState::Staged;

        if !transport.submit(ep, &self.tx_buf) {
            transport.release(ep);
            self.state = DriverState::Idle;
            warn!("xinput: submit refused on {:#x}", ep.raw());
            return Err(SendError::Io);
        }
        self.state = DriverState::InFlight;
        Ok(())
    }

    fn arm_out<T: DeviceTransport>(&mut self, transport: &mut T, ep: EndpointAddress) {
        if !transport.arm_receive(ep, self.rx_buf.len()) {
            warn!("xinput: could not arm {:#x}", ep.raw());
        }
    }

    fn bind_endpoints<T: DeviceTransport>(
        &mut self,
        transport: &mut T,
        body: &[u8],
        num_endpoints: u8,
    ) -> Result<(), DriverError> {
        let mut ep_in = None;
        let mut ep_out = None;
        let mut found = 0u8;

        for (kind, bytes) in Descriptors::new(body) {
            if found == num_endpoints {
                break;
            }
            if kind != DESC_ENDPOINT {
                continue;
            }
            let desc = EndpointDescriptor::parse(bytes).ok_or(DriverError::Malformed)?;
            if !transport.open_endpoint(&desc) {
                return Err(DriverError::EndpointOpen);
            }
            if desc.address.is_in() {
                ep_in = Some(desc.address);
            } else {
                ep_out = Some(desc.address);
            }
            found += 1;
        }

        match (ep_in, ep_out) {
            (Some(ep_in), Some(ep_out)) => {
                self.ep_in = Some(ep_in);
                self.ep_out = Some(ep_out);
                Ok(())
            }
            _ => Err(DriverError::MissingEndpoint),
        }
    }
}

impl ClassDriver for XInputDevice {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn open<T: DeviceTransport>(
        &mut self,
        transport: &mut T,
        interface: &[u8],
        max_len: usize,
    ) -> Result<usize, DriverError> {
        let itf = InterfaceDescriptor::parse(interface).ok_or(DriverError::InterfaceMismatch)?;
        // One virtual pad
        if !itf.is_xinput() || self.is_open() {
            return Err(DriverError::InterfaceMismatch);
        }

        let driver_len = INTERFACE_DESC_LEN
            + ENDPOINT_DESC_LEN * usize::from(itf.num_endpoints)
            + XINPUT_CLASS_DESC_LEN;
        if max_len < driver_len || interface.len() < driver_len {
            return Err(DriverError::DescriptorTooShort);
        }

        let body = &interface[INTERFACE_DESC_LEN..driver_len];
        self.bind_endpoints(transport, body, itf.num_endpoints)?;

        self.interface = Some(itf.number);
        self.state = DriverState::Open;
        if let Some(ep) = self.ep_out {
            self.arm_out(transport, ep);
        }
        debug!(
            "xinput: opened interface {} (in {:?}, out {:?})",
            itf.number,
            self.ep_in.map(EndpointAddress::raw),
            self.ep_out.map(EndpointAddress::raw)
        );
        Ok(driver_len)
    }

    fn control_transfer<T: DeviceTransport>(
        &mut self,
        _transport: &mut T,
        _stage: ControlStage,
        _request: &SetupPacket,
    ) -> bool {
        true
    }

    fn transfer_complete<T: DeviceTransport>(
        &mut self,
        transport: &mut T,
        ep: EndpointAddress,
        result: TransferResult,
        len: usize,
    ) -> bool {
        if Some(ep) == self.ep_in {
            transport.release(ep);
            self.state = DriverState::Idle;
            self.last_result = Some(result);
            self.last_len = len;
            if !result.is_success() {
                warn!("xinput: IN transfer {:?} after {} bytes", result, len);
            }
            return true;
        }

        if Some(ep) == self.ep_out {
            if result.is_success() {
                let n = transport.read_packet(ep, &mut self.rx_buf).min(len);
                match OutputCommand::parse(&self.rx_buf[..n]) {
                    Some(command) => {
                        trace!("xinput: {:?}", command);
                        self.command = Some(command);
                    }
                    None => trace!("xinput: ignored {} byte OUT packet", n),
                }
            } else {
                warn!("xinput: OUT transfer {:?}", result);
            }
            self.arm_out(transport, ep);
            return true;
        }

        false
    }

    fn reset<T: DeviceTransport>(&mut self, transport: &mut T) {
        // A report still in flight never completes on a dead bus
        if let (Some(ep), DriverState::Staged | DriverState::InFlight) = (self.ep_in, self.state) {
            transport.release(ep);
        }
        *self = Self::new();
    }

    fn interface(&self) -> Option<u8> {
        self.interface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDevice;
    use xinput_proto::descriptor::{CDC_DESC_LEN, CONFIG_DESC_LEN};
    use xinput_proto::{CONFIGURATION_DESCRIPTOR, REPORT_SIZE};

    const XINPUT_OFFSET: usize = CONFIG_DESC_LEN + 2 * CDC_DESC_LEN;

    fn xinput_interface() -> &'static [u8] {
        &CONFIGURATION_DESCRIPTOR[XINPUT_OFFSET..]
    }

    fn opened() -> (XInputDevice, FakeDevice) {
        let mut transport = FakeDevice::ready();
        let mut driver = XInputDevice::new();
        let itf = xinput_interface();
        driver.open(&mut transport, itf, itf.len()).unwrap();
        (driver, transport)
    }

    #[test]
    fn test_open_binds_endpoints_and_arms_out() {
        let (driver, transport) = opened();
        assert_eq!(driver.state(), DriverState::Open);
        assert_eq!(driver.interface(), Some(4));
        assert_eq!(driver.ep_in(), Some(EndpointAddress::XINPUT_IN));
        assert_eq!(driver.ep_out(), Some(EndpointAddress::XINPUT_OUT));
        assert_eq!(transport.opened.len(), 2);
        assert_eq!(transport.armed, [(EndpointAddress::XINPUT_OUT, RX_BUF_SIZE)]);
    }

    #[test]
    fn test_open_returns_driver_length() {
        let mut transport = FakeDevice::ready();
        let mut driver = XInputDevice::new();
        let itf = xinput_interface();
        assert_eq!(driver.open(&mut transport, itf, itf.len()), Ok(9 + 2 * 7 + 16));
    }

    #[test]
    fn test_open_rejects_other_interfaces() {
        let mut transport = FakeDevice::ready();
        let mut driver = XInputDevice::new();
        // CDC control interface
        let cdc = &CONFIGURATION_DESCRIPTOR[CONFIG_DESC_LEN + 8..];
        assert_eq!(
            driver.open(&mut transport, cdc, cdc.len()),
            Err(DriverError::InterfaceMismatch)
        );
        assert!(transport.opened.is_empty());
        assert!(!driver.is_open());
    }

    #[test]
    fn test_open_rejects_short_descriptor() {
        let mut transport = FakeDevice::ready();
        let mut driver = XInputDevice::new();
        let itf = xinput_interface();
        assert_eq!(
            driver.open(&mut transport, itf, 38),
            Err(DriverError::DescriptorTooShort)
        );
        assert_eq!(
            driver.open(&mut transport, &itf[..20], 39),
            Err(DriverError::DescriptorTooShort)
        );
    }

    #[test]
    fn test_open_fails_when_endpoint_refused() {
        let mut transport = FakeDevice {
            refuse_open: true,
            ..FakeDevice::ready()
        };
        let mut driver = XInputDevice::new();
        let itf = xinput_interface();
        assert_eq!(
            driver.open(&mut transport, itf, itf.len()),
            Err(DriverError::EndpointOpen)
        );
        assert!(!driver.is_open());
    }

    #[test]
    fn test_open_requires_both_directions() {
        let mut itf = xinput_interface().to_vec();
        // Turn the OUT endpoint into a second IN endpoint
        itf[32 + 2] = 0x83;
        let mut transport = FakeDevice::ready();
        let mut driver = XInputDevice::new();
        assert_eq!(
            driver.open(&mut transport, &itf, itf.len()),
            Err(DriverError::MissingEndpoint)
        );
    }

    #[test]
    fn test_send_before_open_is_not_open() {
        let mut transport = FakeDevice::ready();
        let mut driver = XInputDevice::new();
        assert_eq!(driver.update(&mut transport), Err(SendError::NotOpen));
        assert!(transport.submitted.is_empty());
    }

    #[test]
    fn test_send_while_unconfigured_is_not_ready() {
        let (mut driver, mut transport) = opened();
        transport.ready = false;
        assert_eq!(driver.update(&mut transport), Err(SendError::NotReady));
        assert!(transport.claimed.is_empty());
    }

    #[test]
    fn test_send_submits_twenty_bytes() {
        let (mut driver, mut transport) = opened();
        driver.press_button(Buttons::A);
        driver.update(&mut transport).unwrap();
        assert_eq!(driver.state(), DriverState::InFlight);
        assert!(transport.is_claimed(EndpointAddress::XINPUT_IN));

        let (ep, bytes) = &transport.submitted[0];
        assert_eq!(*ep, EndpointAddress::XINPUT_IN);
        assert_eq!(bytes.len(), 20);
        assert_eq!(bytes[1], REPORT_SIZE);
        assert_eq!(&bytes[2..4], &[0x00, 0x10]);
    }

    #[test]
    fn test_second_send_before_completion_is_busy() {
        let (mut driver, mut transport) = opened();
        driver.press_button(Buttons::A);
        driver.update(&mut transport).unwrap();
        let first = *driver.staged();

        driver.release_button(Buttons::A);
        driver.press_button(Buttons::B);
        assert_eq!(driver.update(&mut transport), Err(SendError::Busy));

        assert_eq!(driver.staged(), &first);
        assert_eq!(transport.submitted.len(), 1);
        assert_eq!(transport.submitted[0].1, first.to_vec());
        assert_eq!(driver.state(), DriverState::InFlight);
        // The refused call must not drop the in-flight claim
        assert_eq!(transport.releases, 0);
        assert!(transport.is_claimed(EndpointAddress::XINPUT_IN));
    }

    #[test]
    fn test_busy_endpoint_releases_claim() {
        let (mut driver, mut transport) = opened();
        transport.busy.push(EndpointAddress::XINPUT_IN);
        assert_eq!(driver.update(&mut transport), Err(SendError::Busy));
        assert!(!transport.is_claimed(EndpointAddress::XINPUT_IN));
        assert_eq!(transport.releases, 1);
    }

    #[test]
    fn test_refused_submit_releases_claim() {
        let (mut driver, mut transport) = opened();
        transport.refuse_submit = true;
        assert_eq!(driver.update(&mut transport), Err(SendError::Io));
        assert!(!transport.is_claimed(EndpointAddress::XINPUT_IN));
        assert_eq!(transport.releases, 1);
        assert_eq!(driver.state(), DriverState::Idle);
    }

    #[test]
    fn test_completion_always_releases() {
        for result in [
            TransferResult::Success,
            TransferResult::Failed,
            TransferResult::Stalled,
            TransferResult::Timeout,
        ] {
            let (mut driver, mut transport) = opened();
            driver.update(&mut transport).unwrap();
            transport.busy.clear();
            assert!(driver.transfer_complete(&mut transport, EndpointAddress::XINPUT_IN, result, 20));
            assert!(!transport.is_claimed(EndpointAddress::XINPUT_IN));
            assert_eq!(transport.releases, 1);
            assert_eq!(driver.state(), DriverState::Idle);
            assert_eq!(driver.last_transfer(), Some((result, 20)));
            assert!(driver.update(&mut transport).is_ok());
        }
    }

    #[test]
    fn test_out_packet_decodes_command_and_rearms() {
        let (mut driver, mut transport) = opened();
        transport.packet = [0x00, 0x08, 0x00, 0xFF, 0x10, 0x00, 0x00, 0x00].to_vec();
        assert!(driver.transfer_complete(
            &mut transport,
            EndpointAddress::XINPUT_OUT,
            TransferResult::Success,
            8
        ));
        assert_eq!(
            driver.take_command(),
            Some(OutputCommand::Rumble {
                left: 0xFF,
                right: 0x10
            })
        );
        assert_eq!(driver.take_command(), None);
        assert_eq!(transport.armed.len(), 2);
    }

    #[test]
    fn test_unknown_endpoint_is_not_ours() {
        let (mut driver, mut transport) = opened();
        assert!(!driver.transfer_complete(
            &mut transport,
            EndpointAddress(0x81),
            TransferResult::Success,
            8
        ));
    }

    #[test]
    fn test_reset_returns_to_uninit() {
        let (mut driver, mut transport) = opened();
        driver.press_button(Buttons::Y);
        driver.update(&mut transport).unwrap();
        driver.reset(&mut transport);

        assert_eq!(driver.state(), DriverState::Uninit);
        assert_eq!(driver.ep_in(), None);
        assert_eq!(driver.interface(), None);
        assert!(driver.pad().is_neutral());
        assert_eq!(driver.staged(), &DeviceReport::neutral().to_bytes());
        assert_eq!(driver.update(&mut transport), Err(SendError::NotOpen));
    }

    #[test]
    fn test_reset_releases_in_flight_claim() {
        let (mut driver, mut transport) = opened();
        driver.press_button(Buttons::A);
        driver.update(&mut transport).unwrap();
        assert!(transport.is_claimed(EndpointAddress::XINPUT_IN));

        driver.reset(&mut transport);
        assert!(!transport.is_claimed(EndpointAddress::XINPUT_IN));
    }

    #[test]
    fn test_control_transfer_acknowledges() {
        let (mut driver, mut transport) = opened();
        assert!(driver.control_transfer(
            &mut transport,
            ControlStage::Setup,
            &SetupPacket::default()
        ));
        assert_eq!(driver.name(), "XINPUT_DEVICE");
    }
}
