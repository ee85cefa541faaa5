//! XInput wire formats and enumeration tables for the passthrough bridge.
//!
//! This crate holds everything that is byte-exact on the bus:
//!
//! - **Types**: the virtual pad's in-memory state
//!   - [`Buttons`] - XInput button bitfield
//!   - [`AnalogStick`] - Stick X/Y position
//!   - [`GamepadState`] - Buttons, triggers and sticks with explicit setters
//!
//! - **Reports**: runtime transfers on the controller interface
//!   - [`DeviceReport`] - The fixed 20-byte IN report
//!   - [`OutputCommand`] - Rumble/LED packets arriving on the OUT endpoint
//!   - [`HostGamepadReport`] - A decoded poll from the physical controller
//!
//! - **Descriptors**: enumeration-time tables
//!   - [`descriptor`] - Device, configuration and report descriptors, built in
//!     `const` context, plus a bounds-checked descriptor walker
//!   - [`strings`] - String table and UTF-16 string descriptors
//!   - [`msos`] - MS OS 1.0 extended compat-id responder
//!   - [`SetupPacket`] - Parsed control setup packet
//!
//! # Report Layout
//!
//! ```text
//! off  size  field
//!   0     1  report id (0x00)
//!   1     1  report size (0x14)
//!   2     2  button mask (LE)
//!   4     1  left trigger
//!   5     1  right trigger
//!   6     8  LX, LY, RX, RY (u16 LE each)
//!  14     6  reserved (zero)
//! ```
//!
//! # Example
//!
//! ```
//! use xinput_proto::{Axis, Buttons, DeviceReport, GamepadState};
//!
//! let mut state = GamepadState::neutral();
//! state.press_button(Buttons::A);
//! state.set_axis(Axis::LeftY, -200);
//!
//! let bytes = DeviceReport::from(&state).to_bytes();
//! assert_eq!(bytes.len(), 20);
//! assert_eq!(bytes[1], 0x14);
//! assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 0x1000);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod descriptor;
pub mod host;
pub mod msos;
pub mod report;
pub mod setup;
pub mod strings;
pub mod types;

pub use descriptor::{
    Descriptors, EndpointAddress, EndpointDescriptor, InterfaceDescriptor,
    CONFIGURATION_DESCRIPTOR, DEVICE_DESCRIPTOR, REPORT_DESCRIPTOR,
};
pub use host::{ControllerType, HostGamepadReport};
pub use msos::{respond_vendor_request, COMPAT_ID_DESCRIPTOR, MS_OS_VENDOR_CODE};
pub use report::{DeviceReport, OutputCommand, REPORT_ID, REPORT_SIZE};
pub use setup::{Direction, Recipient, RequestKind, SetupPacket};
pub use strings::{StringDescriptor, StringTable};
pub use types::{AnalogStick, Axis, Buttons, GamepadState};
