//! The cooperative passthrough loop.
//!
//! [`Passthrough`] owns both transports, the class driver, the controller
//! client, the bridge and the status task. Each [`Passthrough::tick`] drains
//! a bounded number of events from each role, runs housekeeping and steps
//! the status LED. Nothing in a tick waits on I/O.

use xinput_proto::descriptor::{DESC_INTERFACE, DESC_STRING};
use xinput_proto::{
    respond_vendor_request, Descriptors, Direction, EndpointAddress, OutputCommand, Recipient,
    RequestKind, SetupPacket, StringTable, CONFIGURATION_DESCRIPTOR,
};

use crate::bridge::PassthroughBridge;
use crate::config::MAX_EVENTS_PER_PUMP;
use crate::device::XInputDevice;
use crate::driver::ClassDriver;
use crate::host::{ClientState, ControllerClient};
use crate::status::{Clock, Indicator, LinkState, StatusTask};
use crate::transport::{
    ControlStage, DeviceEvent, DeviceTransport, HostEvent, HostTransport, TransferResult,
};

const GET_DESCRIPTOR: u8 = 0x06;

/// Everything the passthrough needs, owned in one place.
pub struct Passthrough<D, H, C, L> {
    device: D,
    host: H,
    clock: C,
    led: L,
    driver: XInputDevice,
    client: ControllerClient,
    bridge: PassthroughBridge,
    status: StatusTask,
    strings: StringTable,
    configured: bool,
}

impl<D, H, C, L> Passthrough<D, H, C, L>
where
    D: DeviceTransport,
    H: HostTransport,
    C: Clock,
    L: Indicator,
{
    pub fn new(device: D, host: H, clock: C, led: L, strings: StringTable) -> Self {
        Self {
            device,
            host,
            clock,
            led,
            driver: XInputDevice::new(),
            client: ControllerClient::new(),
            bridge: PassthroughBridge::new(),
            status: StatusTask::new(),
            strings,
            configured: false,
        }
    }

    /// Run forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.tick();
        }
    }

    /// One scheduler iteration.
    pub fn tick(&mut self) {
        self.pump_device();
        self.pump_host();
        self.housekeeping();
        self.status.step(&self.clock, &mut self.led);
    }

    pub fn driver(&self) -> &XInputDevice {
        &self.driver
    }

    /// Mutable access to the virtual pad, for sources other than the bridge.
    pub fn driver_mut(&mut self) -> &mut XInputDevice {
        &mut self.driver
    }

    pub fn client(&self) -> &ControllerClient {
        &self.client
    }

    pub fn bridge(&self) -> &PassthroughBridge {
        &self.bridge
    }

    pub fn status(&self) -> &StatusTask {
        &self.status
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn indicator(&self) -> &L {
        &self.led
    }

    /// Decompose into the transports, clock and indicator.
    pub fn into_parts(self) -> (D, H, C, L) {
        (self.device, self.host, self.clock, self.led)
    }

    fn pump_device(&mut self) {
        for _ in 0..MAX_EVENTS_PER_PUMP {
            let Some(event) = self.device.poll_event() else {
                break;
            };
            self.on_device_event(event);
        }
    }

    fn pump_host(&mut self) {
        for _ in 0..MAX_EVENTS_PER_PUMP {
            let Some(event) = self.host.poll_event() else {
                break;
            };
            self.on_host_event(event);
        }
    }

    fn housekeeping(&mut self) {
        self.client.service(&mut self.host);
        self.bridge.service(&mut self.driver, &mut self.device);

        match self.driver.take_command() {
            Some(OutputCommand::Rumble { left, right }) => {
                if !self.client.set_rumble(&mut self.host, left, right) {
                    trace!("rumble {}/{} not forwarded", left, right);
                }
            }
            Some(OutputCommand::Led(pattern)) => debug!("upstream LED pattern {}", pattern),
            None => {}
        }
    }

    fn on_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::BusReset => {
                debug!("usb: bus reset");
                self.configured = false;
                self.driver.reset(&mut self.device);
                self.status.set_link(LinkState::NotMounted);
            }
            DeviceEvent::Configured => {
                info!("usb: configured");
                self.configured = true;
                self.driver.reset(&mut self.device);
                self.match_drivers();
                self.status.set_link(LinkState::Mounted);
            }
            DeviceEvent::Unconfigured => {
                info!("usb: unconfigured");
                self.configured = false;
                self.driver.reset(&mut self.device);
                self.status.set_link(LinkState::NotMounted);
            }
            DeviceEvent::Suspended => {
                debug!("usb: suspended");
                self.status.set_link(LinkState::Suspended);
            }
            DeviceEvent::Resumed => {
                debug!("usb: resumed");
                self.status.set_link(if self.configured {
                    LinkState::Mounted
                } else {
                    LinkState::NotMounted
                });
            }
            DeviceEvent::TransferComplete { ep, result, len } => {
                self.on_transfer_complete(ep, result, len);
            }
            DeviceEvent::ControlRequest { stage, request } => {
                self.on_control_request(stage, &request);
            }
        }
    }

    fn on_transfer_complete(&mut self, ep: EndpointAddress, result: TransferResult, len: usize) {
        if !self
            .driver
            .transfer_complete(&mut self.device, ep, result, len)
        {
            trace!("usb: completion on unclaimed endpoint {:#x}", ep.raw());
        }
    }

    /// Offer every interface of the configuration to the class driver.
    fn match_drivers(&mut self) {
        let config: &[u8] = &CONFIGURATION_DESCRIPTOR;
        let mut walker = Descriptors::new(config);
        loop {
            let at = walker.offset();
            let Some((kind, _)) = walker.next() else {
                break;
            };
            if kind != DESC_INTERFACE {
                continue;
            }
            let rest = &config[at..];
            match self.driver.open(&mut self.device, rest, rest.len()) {
                Ok(len) => info!(
                    "usb: {} took interface at offset {} ({} bytes)",
                    self.driver.name(),
                    at,
                    len
                ),
                Err(e) => trace!("usb: interface at offset {} skipped ({:?})", at, e),
            }
        }
        if !self.driver.is_open() {
            warn!("usb: no interface matched {}", self.driver.name());
        }
    }

    fn on_control_request(&mut self, stage: ControlStage, request: &SetupPacket) {
        let for_driver = request.recipient() == Recipient::Interface
            && self.driver.interface() == Some((request.index & 0xFF) as u8);

        if stage != ControlStage::Setup {
            if for_driver {
                self.driver
                    .control_transfer(&mut self.device, stage, request);
            }
            return;
        }

        match (request.kind(), request.recipient()) {
            (RequestKind::Vendor, Recipient::Device) => {
                let reply = respond_vendor_request(request);
                if reply.is_none() {
                    debug!("usb: unhandled vendor request {:#x}", request.request);
                }
                self.device.control_reply(reply);
            }
            _ if for_driver => {
                if self
                    .driver
                    .control_transfer(&mut self.device, stage, request)
                {
                    self.device.control_reply(Some(&[][..]));
                } else {
                    self.device.control_reply(None);
                }
            }
            (RequestKind::Standard, Recipient::Device)
                if request.direction() == Direction::In
                    && request.request == GET_DESCRIPTOR
                    && (request.value >> 8) as u8 == DESC_STRING =>
            {
                let index = (request.value & 0xFF) as u8;
                match self.strings.descriptor(index, request.index) {
                    Some(desc) => self.device.control_reply(Some(desc.as_bytes())),
                    None => {
                        debug!("usb: no string {:#x}", index);
                        self.device.control_reply(None);
                    }
                }
            }
            _ => self.device.control_reply(None),
        }
    }

    fn on_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Mounted {
                slot,
                kind,
                connected,
            } => {
                self.client
                    .on_mount(&mut self.host, slot, kind, connected);
                self.status.set_controller(self.client.is_attached());
            }
            HostEvent::Unmounted { slot } => {
                let held = self.client.slot() == Some(slot);
                self.client.on_unmount(slot);
                if held {
                    self.bridge.release_all();
                    self.status.set_controller(false);
                }
            }
            HostEvent::ReportReceived {
                slot,
                result,
                report,
            } => {
                let was_active = self.client.state() == ClientState::Active;
                if let Some(fresh) = self.client.on_report(&mut self.host, slot, result, report) {
                    // A dropped frame is already counted by the bridge
                    let _ = self.bridge.relay(&mut self.driver, &mut self.device, &fresh);
                }
                if was_active && self.client.state() == ClientState::AwaitingPairing {
                    // The pad's last input would otherwise stay latched upstream
                    self.bridge.release_all();
                    self.status.set_controller(self.client.is_attached());
                }
            }
        }
    }
}
