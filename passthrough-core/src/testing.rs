//! Recording fakes for the transport, clock and indicator traits.

use std::collections::VecDeque;
use std::vec::Vec;

use xinput_proto::{
    ControllerType, EndpointAddress, EndpointDescriptor, HostGamepadReport, SetupPacket,
};

use crate::status::{Clock, Indicator};
use crate::transport::{
    ControlStage, DeviceEvent, DeviceTransport, HostEvent, HostTransport, TransferResult,
};

#[derive(Default)]
pub struct FakeDevice {
    pub ready: bool,
    pub opened: Vec<EndpointDescriptor>,
    pub claimed: Vec<EndpointAddress>,
    pub busy: Vec<EndpointAddress>,
    pub submitted: Vec<(EndpointAddress, Vec<u8>)>,
    pub armed: Vec<(EndpointAddress, usize)>,
    pub packet: Vec<u8>,
    pub replies: Vec<Option<Vec<u8>>>,
    pub events: VecDeque<DeviceEvent>,
    pub refuse_open: bool,
    pub refuse_submit: bool,
    pub releases: usize,
}

impl FakeDevice {
    pub fn ready() -> Self {
        Self {
            ready: true,
            ..Default::default()
        }
    }

    /// Finish the in-flight IN transfer on `ep` and queue its completion.
    pub fn complete_in(&mut self, ep: EndpointAddress, result: TransferResult) {
        self.busy.retain(|e| *e != ep);
        self.events.push_back(DeviceEvent::TransferComplete { ep, result, len: 20 });
    }

    /// Deliver an OUT packet on `ep` and queue its completion.
    pub fn receive_out(&mut self, ep: EndpointAddress, data: &[u8]) {
        self.packet = data.to_vec();
        self.events.push_back(DeviceEvent::TransferComplete {
            ep,
            result: TransferResult::Success,
            len: data.len(),
        });
    }

    pub fn control(&mut self, request: SetupPacket) {
        self.events.push_back(DeviceEvent::ControlRequest {
            stage: ControlStage::Setup,
            request,
        });
    }

    pub fn is_claimed(&self, ep: EndpointAddress) -> bool {
        self.claimed.contains(&ep)
    }
}

impl DeviceTransport for FakeDevice {
    fn open_endpoint(&mut self, desc: &EndpointDescriptor) -> bool {
        if self.refuse_open {
            return false;
        }
        self.opened.push(*desc);
        true
    }

    fn claim(&mut self, ep: EndpointAddress) -> bool {
        if self.claimed.contains(&ep) {
            return false;
        }
        self.claimed.push(ep);
        true
    }

    fn release(&mut self, ep: EndpointAddress) {
        self.releases += 1;
        self.claimed.retain(|e| *e != ep);
    }

    fn busy(&self, ep: EndpointAddress) -> bool {
        self.busy.contains(&ep)
    }

    fn ready(&self) -> bool {
        self.ready
    }

    fn submit(&mut self, ep: EndpointAddress, data: &[u8]) -> bool {
        if self.refuse_submit {
            return false;
        }
        self.busy.push(ep);
        self.submitted.push((ep, data.to_vec()));
        true
    }

    fn arm_receive(&mut self, ep: EndpointAddress, len: usize) -> bool {
        self.armed.push((ep, len));
        true
    }

    fn read_packet(&mut self, _ep: EndpointAddress, buf: &mut [u8]) -> usize {
        let n = self.packet.len().min(buf.len());
        buf[..n].copy_from_slice(&self.packet[..n]);
        n
    }

    fn control_reply(&mut self, data: Option<&[u8]>) {
        self.replies.push(data.map(<[u8]>::to_vec));
    }

    fn poll_event(&mut self) -> Option<DeviceEvent> {
        self.events.pop_front()
    }
}

#[derive(Default)]
pub struct FakeHost {
    pub receives: Vec<u8>,
    pub leds: Vec<(u8, u8, bool)>,
    pub rumbles: Vec<(u8, u8, u8)>,
    pub events: VecDeque<HostEvent>,
    pub refuse_receive: bool,
}

impl FakeHost {
    pub fn mount(&mut self, slot: u8, kind: ControllerType, connected: bool) {
        self.events.push_back(HostEvent::Mounted {
            slot,
            kind,
            connected,
        });
    }

    pub fn unmount(&mut self, slot: u8) {
        self.events.push_back(HostEvent::Unmounted { slot });
    }

    pub fn report(&mut self, slot: u8, report: HostGamepadReport) {
        self.events.push_back(HostEvent::ReportReceived {
            slot,
            result: TransferResult::Success,
            report,
        });
    }
}

impl HostTransport for FakeHost {
    fn receive_report(&mut self, slot: u8) -> bool {
        if self.refuse_receive {
            return false;
        }
        self.receives.push(slot);
        true
    }

    fn set_led(&mut self, slot: u8, quadrant: u8, on: bool) -> bool {
        self.leds.push((slot, quadrant, on));
        true
    }

    fn set_rumble(&mut self, slot: u8, left: u8, right: u8) -> bool {
        self.rumbles.push((slot, left, right));
        true
    }

    fn poll_event(&mut self) -> Option<HostEvent> {
        self.events.pop_front()
    }
}

#[derive(Default)]
pub struct FakeClock {
    pub now: core::cell::Cell<u32>,
}

impl FakeClock {
    pub fn at(ms: u32) -> Self {
        Self {
            now: core::cell::Cell::new(ms),
        }
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}

#[derive(Default)]
pub struct FakeLed {
    pub writes: Vec<bool>,
}

impl Indicator for FakeLed {
    fn set(&mut self, on: bool) {
        self.writes.push(on);
    }
}

/// A fresh, connected report carrying `buttons` and the given axes.
pub fn pad_report(buttons: u16, axes: [i16; 4]) -> HostGamepadReport {
    use xinput_proto::{AnalogStick, Buttons};
    HostGamepadReport {
        buttons: Buttons(buttons),
        left_trigger: 0,
        right_trigger: 0,
        left_stick: AnalogStick::new(axes[0], axes[1]),
        right_stick: AnalogStick::new(axes[2], axes[3]),
        connected: true,
        new_data: true,
        kind: ControllerType::Xbox360Wired,
    }
}
