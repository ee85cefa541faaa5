//! Board clock and status LED.

use embassy_rp::gpio::Output;
use embassy_time::Instant;
use passthrough_core::{Clock, Indicator};

/// Milliseconds since boot from the embassy time driver, truncated to 32 bits.
#[derive(Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}

/// The on-board LED.
pub struct StatusLed {
    pin: Output<'static>,
}

impl StatusLed {
    pub fn new(pin: Output<'static>) -> Self {
        Self { pin }
    }
}

impl Indicator for StatusLed {
    fn set(&mut self, on: bool) {
        if on {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}
