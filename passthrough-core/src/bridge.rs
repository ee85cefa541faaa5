//! PassthroughBridge: mirrors host-side reports into the virtual pad.

use xinput_proto::{GamepadState, HostGamepadReport};

use crate::device::XInputDevice;
use crate::error::SendError;
use crate::transport::DeviceTransport;

/// Map a polled report onto the virtual pad.
///
/// Physical XInput pads and the virtual one share the button layout and the
/// axis range and sign, so every field is copied unchanged. The axis
/// orientation has not been checked against every controller family.
#[must_use]
pub fn translate(report: &HostGamepadReport) -> GamepadState {
    GamepadState {
        buttons: report.buttons,
        left_trigger: report.left_trigger,
        right_trigger: report.right_trigger,
        left_stick: report.left_stick,
        right_stick: report.right_stick,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeStats {
    /// Frames accepted by the device transport.
    pub relayed: u32,
    /// Frames dropped because the IN endpoint was busy or the link was down.
    pub dropped: u32,
}

/// Forwards each fresh host report to the device-side driver.
///
/// A frame that can not be sent is dropped; the next poll supplies a newer
/// one. The only frame that is retried is the neutral frame sent after the
/// controller goes away, so the upstream host never sees stuck inputs.
#[derive(Debug, Default)]
pub struct PassthroughBridge {
    neutral_pending: bool,
    stats: BridgeStats,
}

impl PassthroughBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    #[inline]
    #[must_use]
    pub fn neutral_pending(&self) -> bool {
        self.neutral_pending
    }

    /// Write `report` into the driver and start sending it.
    pub fn relay<T: DeviceTransport>(
        &mut self,
        driver: &mut XInputDevice,
        transport: &mut T,
        report: &HostGamepadReport,
    ) -> Result<(), SendError> {
        self.neutral_pending = false;
        driver.set_state(translate(report));
        match driver.update(transport) {
            Ok(()) => {
                self.stats.relayed = self.stats.relayed.wrapping_add(1);
                Ok(())
            }
            Err(e) => {
                self.stats.dropped = self.stats.dropped.wrapping_add(1);
                trace!("bridge: dropped frame ({:?})", e);
                Err(e)
            }
        }
    }

    /// Schedule a neutral frame.
    pub fn release_all(&mut self) {
        self.neutral_pending = true;
    }

    /// Try to send a scheduled neutral frame.
    pub fn service<T: DeviceTransport>(&mut self, driver: &mut XInputDevice, transport: &mut T) {
        if !self.neutral_pending {
            return;
        }
        driver.set_state(GamepadState::neutral());
        match driver.update(transport) {
            Ok(()) => {
                debug!("bridge: neutral frame sent");
                self.neutral_pending = false;
            }
            // Nothing bound upstream; reopening starts from neutral anyway
            Err(SendError::NotOpen) => self.neutral_pending = false,
            Err(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ClassDriver;
    use crate::testing::{pad_report, FakeDevice};
    use crate::transport::TransferResult;
    use xinput_proto::descriptor::{CDC_DESC_LEN, CONFIG_DESC_LEN};
    use xinput_proto::{Buttons, DeviceReport, EndpointAddress, CONFIGURATION_DESCRIPTOR};

    fn opened() -> (XInputDevice, FakeDevice) {
        let mut transport = FakeDevice::ready();
        let mut driver = XInputDevice::new();
        let itf = &CONFIGURATION_DESCRIPTOR[CONFIG_DESC_LEN + 2 * CDC_DESC_LEN..];
        driver.open(&mut transport, itf, itf.len()).unwrap();
        (driver, transport)
    }

    fn finish(driver: &mut XInputDevice, transport: &mut FakeDevice) {
        transport.busy.clear();
        driver.transfer_complete(transport, EndpointAddress::XINPUT_IN, TransferResult::Success, 20);
    }

    #[test]
    fn test_single_bits_survive_translation() {
        let (mut driver, mut transport) = opened();
        let mut bridge = PassthroughBridge::new();
        for bit in 0..16 {
            let mask = 1u16 << bit;
            bridge
                .relay(&mut driver, &mut transport, &pad_report(mask, [0; 4]))
                .unwrap();
            let sent = &transport.submitted.last().unwrap().1;
            assert_eq!(u16::from_le_bytes([sent[2], sent[3]]), mask);
            finish(&mut driver, &mut transport);
        }
        assert_eq!(bridge.stats().relayed, 16);
    }

    #[test]
    fn test_combined_masks_survive_translation() {
        for mask in [0x0000u16, 0xFFFF, 0xAAAA, 0x5555, 0xF00F, 0x1234, 0x8001, 0x0F70] {
            let state = translate(&pad_report(mask, [0; 4]));
            assert_eq!(state.buttons, Buttons(mask));
            assert_eq!(DeviceReport::from(&state).buttons, mask);
        }
    }

    #[test]
    fn test_a_with_left_stick() {
        let (mut driver, mut transport) = opened();
        let mut bridge = PassthroughBridge::new();
        let mut report = pad_report(0x1000, [100, -200, 0, 0]);
        report.left_trigger = 7;
        report.right_trigger = 250;
        bridge.relay(&mut driver, &mut transport, &report).unwrap();

        let sent = &transport.submitted[0].1;
        assert_eq!(
            sent.as_slice(),
            &[
                0x00, 0x14, 0x00, 0x10, 7, 250, 0x64, 0x00, 0x38, 0xFF, 0x00, 0x00, 0x00, 0x00,
                0, 0, 0, 0, 0, 0
            ]
        );
    }

    #[test]
    fn test_busy_endpoint_drops_frame() {
        let (mut driver, mut transport) = opened();
        let mut bridge = PassthroughBridge::new();
        bridge
            .relay(&mut driver, &mut transport, &pad_report(0x1000, [0; 4]))
            .unwrap();
        assert_eq!(
            bridge.relay(&mut driver, &mut transport, &pad_report(0x2000, [0; 4])),
            Err(SendError::Busy)
        );
        assert_eq!(bridge.stats().dropped, 1);
        assert_eq!(transport.submitted.len(), 1);
        assert!(!bridge.neutral_pending());
    }

    #[test]
    fn test_neutral_frame_retried_until_sent() {
        let (mut driver, mut transport) = opened();
        let mut bridge = PassthroughBridge::new();
        bridge
            .relay(&mut driver, &mut transport, &pad_report(0x1000, [500, 0, 0, 0]))
            .unwrap();

        bridge.release_all();
        bridge.service(&mut driver, &mut transport);
        assert!(bridge.neutral_pending());
        assert_eq!(transport.submitted.len(), 1);

        finish(&mut driver, &mut transport);
        bridge.service(&mut driver, &mut transport);
        assert!(!bridge.neutral_pending());
        assert_eq!(transport.submitted[1].1, DeviceReport::neutral().to_bytes().to_vec());
    }

    #[test]
    fn test_neutral_frame_dropped_when_not_open() {
        let mut transport = FakeDevice::ready();
        let mut driver = XInputDevice::new();
        let mut bridge = PassthroughBridge::new();
        bridge.release_all();
        bridge.service(&mut driver, &mut transport);
        assert!(!bridge.neutral_pending());
        assert!(transport.submitted.is_empty());
    }
}
