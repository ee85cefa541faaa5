//! RP2040 board support for the XInput passthrough bridge.
//!
//! The protocol and scheduling logic live in `passthrough-core`; this crate
//! wires it to embassy: the device port, the host-port channels, the CDC
//! consoles and the status LED.

#![no_std]

pub mod console;
pub mod host_port;
pub mod status_led;
pub mod usb_device;

pub use host_port::{ChannelHostTransport, HostCommand, HOST_COMMANDS, HOST_EVENTS};
pub use status_led::{EmbassyClock, StatusLed};
pub use usb_device::{UsbDeviceTransport, UsbDriver, UsbParts};
