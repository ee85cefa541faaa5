//! Compile-time tuning.

/// Upper bound on events drained from one transport per scheduler tick, so
/// a chatty role can not starve the other.
pub const MAX_EVENTS_PER_PUMP: usize = 8;

/// Status blink period while the upstream host has not configured us.
pub const BLINK_NOT_MOUNTED_MS: u32 = 250;
/// Status blink period while configured.
pub const BLINK_MOUNTED_MS: u32 = 1000;
/// Status blink period while the bus is suspended.
pub const BLINK_SUSPENDED_MS: u32 = 2500;
/// Status blink period while a physical controller is attached.
pub const BLINK_CONTROLLER_MS: u32 = 100;

/// LED quadrants switched on when a pad is set up.
pub const MOUNT_LED_QUADRANTS: [u8; 2] = [0, 1];
