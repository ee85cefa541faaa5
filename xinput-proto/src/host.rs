//! Reports polled from the physical controller on the host port.

use crate::types::{AnalogStick, Buttons};

/// Controller family detected by the host-role enumeration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerType {
    /// Original Xbox (Duke / Controller S).
    OriginalXbox,
    /// Wired Xbox 360 pad.
    #[default]
    Xbox360Wired,
    /// Xbox 360 wireless receiver; a pad may or may not be paired.
    Xbox360Wireless,
    /// Xbox One / Series pad.
    XboxOne,
}

impl ControllerType {
    /// Whether a mounted device of this type may exist without a pad behind it.
    #[inline]
    #[must_use]
    pub const fn is_wireless(self) -> bool {
        matches!(self, Self::Xbox360Wireless)
    }
}

/// One decoded poll of the physical controller.
///
/// The host-role transport fills this in; the client keeps the last one
/// in place and hands it to the bridge at most once per poll via
/// [`HostGamepadReport::take`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HostGamepadReport {
    pub buttons: Buttons,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub left_stick: AnalogStick,
    pub right_stick: AnalogStick,
    /// A pad is connected (always true for wired pads).
    pub connected: bool,
    /// The report carries input not yet consumed by the bridge.
    pub new_data: bool,
    pub kind: ControllerType,
}

impl HostGamepadReport {
    /// Returns a copy of this report if it carries unconsumed input, and
    /// clears `new_data` so the same frame is never taken twice.
    pub fn take(&mut self) -> Option<Self> {
        if !(self.connected && self.new_data) {
            return None;
        }
        self.new_data = false;
        Some(*self)
    }
}
