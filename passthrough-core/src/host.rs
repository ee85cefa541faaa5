//! Host-side client for the physical controller on the second port.

use xinput_proto::{ControllerType, HostGamepadReport};

use crate::config::MOUNT_LED_QUADRANTS;
use crate::transport::{HostTransport, TransferResult};

/// Where the client is with the attached controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClientState {
    Disconnected,
    /// Enumerated, setup not yet decided.
    Mounted,
    /// Wireless receiver without a paired pad; polling for one.
    AwaitingPairing,
    /// Pad set up and polled.
    Active,
}

/// Counters kept across mounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClientStats {
    /// Receive-report requests accepted by the transport.
    pub requests_issued: u32,
    /// Reports handed to the bridge.
    pub reports_relayed: u32,
    /// Poll completions that did not succeed.
    pub failed_polls: u32,
}

/// Client for a single physical controller.
///
/// Keeps exactly one receive-report request outstanding while a controller
/// is mounted: one is issued at mount and a new one after every completion.
pub struct ControllerClient {
    state: ClientState,
    slot: Option<u8>,
    kind: ControllerType,
    report: HostGamepadReport,
    rearm_pending: bool,
    stats: ClientStats,
}

impl Default for ControllerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ClientState::Disconnected,
            slot: None,
            kind: ControllerType::default(),
            report: HostGamepadReport::default(),
            rearm_pending: false,
            stats: ClientStats::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// A controller (or receiver) is mounted.
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state != ClientState::Disconnected
    }

    #[inline]
    #[must_use]
    pub fn slot(&self) -> Option<u8> {
        self.slot
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ControllerType {
        self.kind
    }

    /// The last report received from the controller.
    #[inline]
    #[must_use]
    pub fn report(&self) -> &HostGamepadReport {
        &self.report
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> ClientStats {
        self.stats
    }

    /// A request was refused and will be retried by [`ControllerClient::service`].
    #[inline]
    #[must_use]
    pub fn rearm_pending(&self) -> bool {
        self.rearm_pending
    }

    pub fn on_mount<T: HostTransport>(
        &mut self,
        transport: &mut T,
        slot: u8,
        kind: ControllerType,
        connected: bool,
    ) {
        // One receive request is already outstanding for a held slot
        if let Some(held) = self.slot {
            if held == slot {
                debug!("host: slot {} already mounted", slot);
            } else {
                debug!("host: ignoring slot {}, serving slot {}", slot, held);
            }
            return;
        }
        info!("host: {:?} mounted on slot {}", kind, slot);

        self.slot = Some(slot);
        self.kind = kind;
        self.report = HostGamepadReport {
            kind,
            ..HostGamepadReport::default()
        };
        self.state = ClientState::Mounted;

        if kind.is_wireless() && !connected {
            self.state = ClientState::AwaitingPairing;
        } else {
            self.set_up(transport, slot);
        }
        self.request(transport);
    }

    /// Handle a poll completion. Returns the report when it carries fresh
    /// input for the bridge.
    pub fn on_report<T: HostTransport>(
        &mut self,
        transport: &mut T,
        slot: u8,
        result: TransferResult,
        report: HostGamepadReport,
    ) -> Option<HostGamepadReport> {
        if self.slot != Some(slot) {
            return None;
        }

        let fresh = if result.is_success() {
            self.track_pairing(transport, slot, report.connected);
            self.report = HostGamepadReport {
                kind: self.kind,
                ..report
            };
            let fresh = self.report.take();
            if fresh.is_some() {
                self.stats.reports_relayed = self.stats.reports_relayed.wrapping_add(1);
            }
            fresh
        } else {
            self.stats.failed_polls = self.stats.failed_polls.wrapping_add(1);
            warn!("host: poll on slot {} ended {:?}", slot, result);
            None
        };

        self.request(transport);
        fresh
    }

    pub fn on_unmount(&mut self, slot: u8) {
        if self.slot != Some(slot) {
            return;
        }
        info!("host: slot {} unmounted", slot);
        self.state = ClientState::Disconnected;
        self.slot = None;
        self.report = HostGamepadReport::default();
        self.rearm_pending = false;
    }

    /// Retry a receive-report request the transport refused earlier.
    pub fn service<T: HostTransport>(&mut self, transport: &mut T) {
        if self.rearm_pending {
            self.request(transport);
        }
    }

    /// Switch an LED quadrant. Only while a pad is active.
    pub fn set_led<T: HostTransport>(&mut self, transport: &mut T, quadrant: u8, on: bool) -> bool {
        match (self.state, self.slot) {
            (ClientState::Active, Some(slot)) => transport.set_led(slot, quadrant, on),
            _ => false,
        }
    }

    /// Drive the rumble motors. Only while a pad is active.
    pub fn set_rumble<T: HostTransport>(&mut self, transport: &mut T, left: u8, right: u8) -> bool {
        match (self.state, self.slot) {
            (ClientState::Active, Some(slot)) => transport.set_rumble(slot, left, right),
            _ => false,
        }
    }

    fn set_up<T: HostTransport>(&mut self, transport: &mut T, slot: u8) {
        for quadrant in MOUNT_LED_QUADRANTS {
            if !transport.set_led(slot, quadrant, true) {
                warn!("host: LED {} refused", quadrant);
            }
        }
        if !transport.set_rumble(slot, 0, 0) {
            warn!("host: rumble reset refused");
        }
        self.state = ClientState::Active;
    }

    fn track_pairing<T: HostTransport>(&mut self, transport: &mut T, slot: u8, connected: bool) {
        if !self.kind.is_wireless() {
            return;
        }
        match (self.state, connected) {
            (ClientState::AwaitingPairing, true) => {
                info!("host: wireless pad paired on slot {}", slot);
                self.set_up(transport, slot);
            }
            (ClientState::Active, false) => {
                info!("host: wireless pad on slot {} went away", slot);
                self.state = ClientState::AwaitingPairing;
            }
            _ => {}
        }
    }

    fn request<T: HostTransport>(&mut self, transport: &mut T) {
        let Some(slot) = self.slot else {
            self.rearm_pending = false;
            return;
        };
        if transport.receive_report(slot) {
            self.stats.requests_issued = self.stats.requests_issued.wrapping_add(1);
            self.rearm_pending = false;
        } else {
            if !self.rearm_pending {
                warn!("host: receive request on slot {} refused", slot);
            }
            self.rearm_pending = true;
        }
    }
}
