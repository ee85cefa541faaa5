//! Channel-backed host transport.
//!
//! The host-port stack (PIO USB on the second port) runs in its own task.
//! It receives [`HostCommand`]s from [`HOST_COMMANDS`] and reports what
//! happened on [`HOST_EVENTS`]; the passthrough loop only ever touches the
//! non-blocking ends of both channels.

use defmt::Format;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use passthrough_core::{HostEvent, HostTransport};

/// Depth of both host channels.
pub const HOST_QUEUE_DEPTH: usize = 8;

/// A request for the host-port stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum HostCommand {
    /// Poll the next input report; answered by `HostEvent::ReportReceived`.
    ReceiveReport { slot: u8 },
    SetLed { slot: u8, quadrant: u8, on: bool },
    SetRumble { slot: u8, left: u8, right: u8 },
}

/// Requests from the passthrough loop to the host-port stack.
pub static HOST_COMMANDS: Channel<CriticalSectionRawMutex, HostCommand, HOST_QUEUE_DEPTH> =
    Channel::new();

/// Mount, unmount and poll completions from the host-port stack.
pub static HOST_EVENTS: Channel<CriticalSectionRawMutex, HostEvent, HOST_QUEUE_DEPTH> =
    Channel::new();

/// [`HostTransport`] over [`HOST_COMMANDS`] and [`HOST_EVENTS`].
///
/// A full command queue refuses the request; the client retries polls on
/// its own.
#[derive(Default)]
pub struct ChannelHostTransport;

impl ChannelHostTransport {
    pub fn new() -> Self {
        Self
    }

    fn send(&mut self, command: HostCommand) -> bool {
        match HOST_COMMANDS.try_send(command) {
            Ok(()) => true,
            Err(_) => {
                defmt::trace!("host command queue full, dropped {}", command);
                false
            }
        }
    }
}

impl HostTransport for ChannelHostTransport {
    fn receive_report(&mut self, slot: u8) -> bool {
        self.send(HostCommand::ReceiveReport { slot })
    }

    fn set_led(&mut self, slot: u8, quadrant: u8, on: bool) -> bool {
        self.send(HostCommand::SetLed { slot, quadrant, on })
    }

    fn set_rumble(&mut self, slot: u8, left: u8, right: u8) -> bool {
        self.send(HostCommand::SetRumble { slot, left, right })
    }

    fn poll_event(&mut self) -> Option<HostEvent> {
        HOST_EVENTS.try_receive().ok()
    }
}

/// Drain [`HOST_COMMANDS`] when no host-port stack is attached.
///
/// Keeps the command queue from filling up so the passthrough loop stays
/// responsive; a host-port driver replaces this task and answers on
/// [`HOST_EVENTS`] instead.
pub async fn drain_commands() -> ! {
    loop {
        let command = HOST_COMMANDS.receive().await;
        defmt::trace!("host port idle, ignoring {}", command);
    }
}
