//! Status LED blink task.

use crate::config::{
    BLINK_CONTROLLER_MS, BLINK_MOUNTED_MS, BLINK_NOT_MOUNTED_MS, BLINK_SUSPENDED_MS,
};

/// Free-running millisecond counter. Expected to wrap.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// A single on/off indicator, usually the board LED.
pub trait Indicator {
    fn set(&mut self, on: bool);
}

/// State of the link to the upstream host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    NotMounted,
    Mounted,
    Suspended,
}

/// Blinks the indicator at a rate that encodes the link state.
///
/// Suspension wins over an attached controller, which wins over the
/// mounted/not mounted rates.
#[derive(Debug)]
pub struct StatusTask {
    start_ms: u32,
    led_on: bool,
    link: LinkState,
    controller: bool,
}

impl Default for StatusTask {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusTask {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            start_ms: 0,
            led_on: false,
            link: LinkState::NotMounted,
            controller: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn set_link(&mut self, link: LinkState) {
        self.link = link;
    }

    pub fn set_controller(&mut self, attached: bool) {
        self.controller = attached;
    }

    /// Current blink period.
    #[must_use]
    pub fn interval_ms(&self) -> u32 {
        match (self.link, self.controller) {
            (LinkState::Suspended, _) => BLINK_SUSPENDED_MS,
            (_, true) => BLINK_CONTROLLER_MS,
            (LinkState::Mounted, false) => BLINK_MOUNTED_MS,
            (LinkState::NotMounted, false) => BLINK_NOT_MOUNTED_MS,
        }
    }

    /// Toggle the indicator if a period has elapsed. Returns whether it did.
    ///
    /// The next period starts where the previous one ended, not at `now`,
    /// so the rate does not drift with scheduler latency.
    pub fn step<C: Clock, L: Indicator>(&mut self, clock: &C, led: &mut L) -> bool {
        let interval = self.interval_ms();
        if clock.now_ms().wrapping_sub(self.start_ms) < interval {
            return false;
        }
        self.start_ms = self.start_ms.wrapping_add(interval);
        led.set(self.led_on);
        self.led_on = !self.led_on;
        true
    }
}
