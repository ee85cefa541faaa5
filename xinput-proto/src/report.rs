//! Runtime reports on the controller interface.

use crate::types::{AnalogStick, Buttons, GamepadState};

/// Report id carried in byte 0 of every IN report.
pub const REPORT_ID: u8 = 0x00;

/// Report size carried in byte 1; also the total length of the report.
pub const REPORT_SIZE: u8 = 0x14;

/// The 20-byte IN report sent to the upstream host.
///
/// The id and size bytes are not stored: they are written by
/// [`DeviceReport::to_bytes`] from [`REPORT_ID`] and [`REPORT_SIZE`], so no
/// value of this struct can serialize to a different length or header.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceReport {
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: u16,
    pub thumb_ly: u16,
    pub thumb_rx: u16,
    pub thumb_ry: u16,
}

impl DeviceReport {
    /// Size of the report in bytes.
    pub const SIZE: usize = REPORT_SIZE as usize;

    /// Neutral/zero report.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            buttons: 0,
            left_trigger: 0,
            right_trigger: 0,
            thumb_lx: 0,
            thumb_ly: 0,
            thumb_rx: 0,
            thumb_ry: 0,
        }
    }

    /// Serialize to the wire layout.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = REPORT_ID;
        out[1] = REPORT_SIZE;
        out[2..4].copy_from_slice(&self.buttons.to_le_bytes());
        out[4] = self.left_trigger;
        out[5] = self.right_trigger;
        out[6..8].copy_from_slice(&self.thumb_lx.to_le_bytes());
        out[8..10].copy_from_slice(&self.thumb_ly.to_le_bytes());
        out[10..12].copy_from_slice(&self.thumb_rx.to_le_bytes());
        out[12..14].copy_from_slice(&self.thumb_ry.to_le_bytes());
        // 14..20 reserved, left zero
        out
    }

    /// Parse a report from the wire layout.
    ///
    /// Returns `None` if the buffer is short or the header is not
    /// `[REPORT_ID, REPORT_SIZE]`. Reserved bytes are ignored.
    #[must_use]
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE || data[0] != REPORT_ID || data[1] != REPORT_SIZE {
            return None;
        }
        let word = |at: usize| u16::from_le_bytes([data[at], data[at + 1]]);
        Some(Self {
            buttons: word(2),
            left_trigger: data[4],
            right_trigger: data[5],
            thumb_lx: word(6),
            thumb_ly: word(8),
            thumb_rx: word(10),
            thumb_ry: word(12),
        })
    }

    /// Convert back to pad state, reinterpreting axis words as signed.
    #[must_use]
    pub fn to_state(&self) -> GamepadState {
        GamepadState {
            buttons: Buttons(self.buttons),
            left_trigger: self.left_trigger,
            right_trigger: self.right_trigger,
            left_stick: AnalogStick::new(self.thumb_lx as i16, self.thumb_ly as i16),
            right_stick: AnalogStick::new(self.thumb_rx as i16, self.thumb_ry as i16),
        }
    }
}

impl From<&GamepadState> for DeviceReport {
    fn from(state: &GamepadState) -> Self {
        Self {
            buttons: state.buttons.raw(),
            left_trigger: state.left_trigger,
            right_trigger: state.right_trigger,
            // Same bits, unsigned view; no scaling
            thumb_lx: state.left_stick.x as u16,
            thumb_ly: state.left_stick.y as u16,
            thumb_rx: state.right_stick.x as u16,
            thumb_ry: state.right_stick.y as u16,
        }
    }
}

/// A packet received from the upstream host on the controller's OUT endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputCommand {
    /// Motor intensities, 0 = off.
    Rumble { left: u8, right: u8 },
    /// Ring LED animation number.
    Led(u8),
}

impl OutputCommand {
    const RUMBLE_TYPE: u8 = 0x00;
    const RUMBLE_LEN: u8 = 0x08;
    const LED_TYPE: u8 = 0x01;
    const LED_LEN: u8 = 0x03;

    /// Decode an OUT packet. Unknown or truncated packets yield `None`.
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        match data {
            [Self::RUMBLE_TYPE, Self::RUMBLE_LEN, _, left, right, ..] => Some(Self::Rumble {
                left: *left,
                right: *right,
            }),
            [Self::LED_TYPE, Self::LED_LEN, pattern, ..] => Some(Self::Led(*pattern)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Axis;

    #[test]
    fn test_report_is_always_twenty_bytes() {
        let mut state = GamepadState::neutral();
        state.buttons = Buttons(0xFFFF);
        state.set_triggers(255, 255);
        state.set_axis(Axis::LeftX, i16::MIN);
        state.set_axis(Axis::RightY, i16::MAX);

        for s in [GamepadState::neutral(), state] {
            let bytes = DeviceReport::from(&s).to_bytes();
            assert_eq!(bytes.len(), 20);
            assert_eq!(bytes[0], 0x00);
            assert_eq!(bytes[1], 0x14);
            assert_eq!(&bytes[14..], &[0u8; 6]);
        }
    }

    #[test]
    fn test_report_field_offsets() {
        let report = DeviceReport {
            buttons: 0x1234,
            left_trigger: 0xAA,
            right_trigger: 0xBB,
            thumb_lx: 0x0102,
            thumb_ly: 0x0304,
            thumb_rx: 0x0506,
            thumb_ry: 0x0708,
        };
        assert_eq!(
            report.to_bytes(),
            [
                0x00, 0x14, 0x34, 0x12, 0xAA, 0xBB, 0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0x08, 0x07,
                0, 0, 0, 0, 0, 0
            ]
        );
    }

    #[test]
    fn test_axes_are_reinterpreted_not_scaled() {
        let mut state = GamepadState::neutral();
        state.set_axis(Axis::LeftX, 100);
        state.set_axis(Axis::LeftY, -200);
        let report = DeviceReport::from(&state);
        assert_eq!(report.thumb_lx, 100);
        assert_eq!(report.thumb_ly, 0xFF38);
        assert_eq!(report.to_state(), state);
    }

    #[test]
    fn test_from_bytes_rejects_bad_header() {
        let mut bytes = DeviceReport::neutral().to_bytes();
        assert!(DeviceReport::from_bytes(&bytes).is_some());
        assert!(DeviceReport::from_bytes(&bytes[..19]).is_none());
        bytes[1] = 0x13;
        assert!(DeviceReport::from_bytes(&bytes).is_none());
    }

    #[test]
    fn test_parse_rumble_command() {
        let packet = [0x00, 0x08, 0x00, 0x40, 0x80, 0x00, 0x00, 0x00];
        assert_eq!(
            OutputCommand::parse(&packet),
            Some(OutputCommand::Rumble {
                left: 0x40,
                right: 0x80
            })
        );
    }

    #[test]
    fn test_parse_led_command() {
        assert_eq!(
            OutputCommand::parse(&[0x01, 0x03, 0x06]),
            Some(OutputCommand::Led(0x06))
        );
    }

    #[test]
    fn test_parse_unknown_or_short_packet() {
        assert_eq!(OutputCommand::parse(&[]), None);
        assert_eq!(OutputCommand::parse(&[0x00, 0x08, 0x00]), None);
        assert_eq!(OutputCommand::parse(&[0x02, 0x08, 0x00, 0x01]), None);
    }
}
