//! Virtual pad state: Buttons, AnalogStick, Axis, GamepadState.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// XInput button mask.
///
/// The bit positions are the ones the upstream XInput driver expects in the
/// IN report, and the same ones physical XInput controllers report on their
/// own IN endpoint, so a mask can be copied between the two unchanged.
///
/// # Example
///
/// ```
/// use xinput_proto::Buttons;
///
/// let buttons = Buttons::A | Buttons::START;
/// assert!(buttons.contains(Buttons::A));
/// assert!(!buttons.contains(Buttons::B));
/// assert_eq!(buttons.raw(), 0x1010);
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u16);

impl Buttons {
    pub const DPAD_UP: Self = Self(1 << 0);
    pub const DPAD_DOWN: Self = Self(1 << 1);
    pub const DPAD_LEFT: Self = Self(1 << 2);
    pub const DPAD_RIGHT: Self = Self(1 << 3);
    pub const START: Self = Self(1 << 4);
    pub const BACK: Self = Self(1 << 5);
    pub const LEFT_THUMB: Self = Self(1 << 6);
    pub const RIGHT_THUMB: Self = Self(1 << 7);
    pub const LEFT_SHOULDER: Self = Self(1 << 8);
    pub const RIGHT_SHOULDER: Self = Self(1 << 9);
    pub const GUIDE: Self = Self(1 << 10);
    // Bit 11 is a binding/sync bit on wireless receivers
    pub const SYNC: Self = Self(1 << 11);
    pub const A: Self = Self(1 << 12);
    pub const B: Self = Self(1 << 13);
    pub const X: Self = Self(1 << 14);
    pub const Y: Self = Self(1 << 15);

    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    /// Check if the given button(s) are pressed.
    #[inline]
    #[must_use]
    pub const fn contains(self, button: Buttons) -> bool {
        (self.0 & button.0) == button.0
    }

    /// Set or clear button(s).
    #[inline]
    pub fn set(&mut self, button: Buttons, pressed: bool) {
        if pressed {
            self.0 |= button.0;
        } else {
            self.0 &= !button.0;
        }
    }

    /// Get the raw u16 value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Check if no buttons are pressed.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Buttons {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for Buttons {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

/// Analog stick with signed X/Y axes.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogStick {
    pub x: i16,
    pub y: i16,
}

impl AnalogStick {
    #[must_use]
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    pub const NEUTRAL: Self = Self { x: 0, y: 0 };
}

/// One of the four stick axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

/// Mutable state of the virtual pad.
///
/// Every field is last-write-wins; nothing is queued. The state is only read
/// when a report is staged, see [`DeviceReport`](crate::DeviceReport).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadState {
    pub buttons: Buttons,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub left_stick: AnalogStick,
    pub right_stick: AnalogStick,
}

impl GamepadState {
    /// Create a neutral state (no buttons pressed, sticks centered).
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            buttons: Buttons::NONE,
            left_trigger: 0,
            right_trigger: 0,
            left_stick: AnalogStick::NEUTRAL,
            right_stick: AnalogStick::NEUTRAL,
        }
    }

    #[inline]
    pub fn press_button(&mut self, button: Buttons) {
        self.buttons.set(button, true);
    }

    #[inline]
    pub fn release_button(&mut self, button: Buttons) {
        self.buttons.set(button, false);
    }

    /// Set one stick axis.
    #[inline]
    pub fn set_axis(&mut self, axis: Axis, value: i16) {
        match axis {
            Axis::LeftX => self.left_stick.x = value,
            Axis::LeftY => self.left_stick.y = value,
            Axis::RightX => self.right_stick.x = value,
            Axis::RightY => self.right_stick.y = value,
        }
    }

    /// Read one stick axis.
    #[inline]
    #[must_use]
    pub const fn axis(&self, axis: Axis) -> i16 {
        match axis {
            Axis::LeftX => self.left_stick.x,
            Axis::LeftY => self.left_stick.y,
            Axis::RightX => self.right_stick.x,
            Axis::RightY => self.right_stick.y,
        }
    }

    #[inline]
    pub fn set_triggers(&mut self, left: u8, right: u8) {
        self.left_trigger = left;
        self.right_trigger = right;
    }

    /// Check whether the state equals [`GamepadState::neutral`].
    #[inline]
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        *self == Self::neutral()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buttons_bitwise_or() {
        let buttons = Buttons::A | Buttons::B;
        assert!(buttons.contains(Buttons::A));
        assert!(buttons.contains(Buttons::B));
        assert!(!buttons.contains(Buttons::X));
    }

    #[test]
    fn test_button_bits_match_xinput_layout() {
        assert_eq!(Buttons::DPAD_UP.raw(), 0x0001);
        assert_eq!(Buttons::START.raw(), 0x0010);
        assert_eq!(Buttons::LEFT_SHOULDER.raw(), 0x0100);
        assert_eq!(Buttons::GUIDE.raw(), 0x0400);
        assert_eq!(Buttons::A.raw(), 0x1000);
        assert_eq!(Buttons::Y.raw(), 0x8000);
    }

    #[test]
    fn test_press_release_is_last_write_wins() {
        let mut state = GamepadState::neutral();
        state.press_button(Buttons::X);
        state.press_button(Buttons::X);
        assert!(state.buttons.contains(Buttons::X));
        state.release_button(Buttons::X);
        assert!(state.is_neutral());
    }

    #[test]
    fn test_set_axis_touches_one_field() {
        let mut state = GamepadState::neutral();
        state.set_axis(Axis::RightY, -1234);
        assert_eq!(state.right_stick.y, -1234);
        assert_eq!(state.axis(Axis::RightY), -1234);
        assert_eq!(state.left_stick, AnalogStick::NEUTRAL);
        assert_eq!(state.right_stick.x, 0);
    }
}
