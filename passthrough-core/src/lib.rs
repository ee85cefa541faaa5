//! Platform-agnostic core of the XInput passthrough bridge.
//!
//! A physical controller on the host port is polled and mirrored into a
//! virtual XInput pad on the device port. This crate holds all of that
//! logic behind two transport traits, so it runs unchanged on the
//! microcontroller and in host tests.
//!
//! # Overview
//!
//! - [`transport`]: [`DeviceTransport`] and [`HostTransport`], plus the
//!   events they report
//! - [`driver`]: the [`ClassDriver`] trait the device stack matches
//!   interfaces against
//! - [`device`]: [`XInputDevice`], the virtual pad
//! - [`host`]: [`ControllerClient`], which keeps the physical pad polled
//! - [`bridge`]: [`PassthroughBridge`] and [`translate`]
//! - [`status`]: [`StatusTask`], the link-state blink
//! - [`scheduler`]: [`Passthrough`], the loop tying it all together
//!
//! # Flow
//!
//! ```text
//! HostEvent::ReportReceived -> ControllerClient -> PassthroughBridge
//!     -> XInputDevice::send_report -> DeviceTransport::submit
//! ```
//!
//! Every request returns immediately and its outcome comes back as an event
//! on a later tick. Nothing blocks, nothing allocates.
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(any(test, feature = "std")), no_std)]

// Must come first so the macros are in scope for the modules below
#[macro_use]
mod fmt;

pub mod bridge;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod host;
pub mod scheduler;
pub mod status;
pub mod transport;

#[cfg(test)]
mod testing;

pub use bridge::{translate, BridgeStats, PassthroughBridge};
pub use device::{DriverState, XInputDevice};
pub use driver::ClassDriver;
pub use error::{DriverError, SendError};
pub use host::{ClientState, ClientStats, ControllerClient};
pub use scheduler::Passthrough;
pub use status::{Clock, Indicator, LinkState, StatusTask};
pub use transport::{
    ControlStage, DeviceEvent, DeviceTransport, HostEvent, HostTransport, TransferResult,
};
