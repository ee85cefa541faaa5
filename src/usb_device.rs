//! Device port: embassy-usb stack and the [`DeviceTransport`] over it.
//!
//! embassy-usb owns enumeration and endpoint 0. The XInput endpoints are
//! serviced by two small tasks; the passthrough loop talks to them through
//! the statics below and never awaits.

use core::cell::RefCell;

use defmt::{debug, info, trace, warn};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::control::{InResponse, OutResponse, Recipient, Request, RequestType};
use embassy_usb::driver::{Direction, Endpoint, EndpointIn, EndpointOut};
use embassy_usb::types::{InterfaceNumber, StringIndex};
use embassy_usb::{Builder, Config, Handler, UsbDevice};
use passthrough_core::{DeviceEvent, DeviceTransport, TransferResult};
use portable_atomic::{AtomicBool, Ordering};
use static_cell::StaticCell;
use xinput_proto::descriptor::{
    CDC_DATA_SIZE, DEVICE_RELEASE, EP0_SIZE, ITF_NUM_XINPUT, MAX_POWER_MA, STR_MANUFACTURER,
    STR_PRODUCT, STR_SERIAL, STR_XINPUT, USB_PID, USB_VID, XINPUT_CLASS, XINPUT_CLASS_DESCRIPTOR,
    XINPUT_EP_SIZE, XINPUT_IN_INTERVAL, XINPUT_OUT_INTERVAL, XINPUT_PROTOCOL, XINPUT_SUBCLASS,
};
use xinput_proto::{
    respond_vendor_request, DeviceReport, EndpointAddress, EndpointDescriptor, SetupPacket,
    StringTable,
};

pub type UsbDriver = Driver<'static, USB>;
pub type XInputIn = <UsbDriver as embassy_usb::driver::Driver<'static>>::EndpointIn;
pub type XInputOut = <UsbDriver as embassy_usb::driver::Driver<'static>>::EndpointOut;

const EVENT_QUEUE_DEPTH: usize = 16;
const OUT_PACKET_LEN: usize = XINPUT_EP_SIZE as usize;

// Interface association descriptor class for composite devices
const MISC_CLASS: u8 = 0xEF;
const MISC_COMMON_SUBCLASS: u8 = 0x02;
const MISC_IAD_PROTOCOL: u8 = 0x01;

static DEVICE_EVENTS: Channel<CriticalSectionRawMutex, DeviceEvent, EVENT_QUEUE_DEPTH> =
    Channel::new();
static IN_REPORTS: Channel<CriticalSectionRawMutex, [u8; DeviceReport::SIZE], 1> = Channel::new();
static OUT_ARMED: Signal<CriticalSectionRawMutex, usize> = Signal::new();
static OUT_PACKET: Mutex<CriticalSectionRawMutex, RefCell<heapless::Vec<u8, OUT_PACKET_LEN>>> =
    Mutex::new(RefCell::new(heapless::Vec::new()));

static CONFIGURED: AtomicBool = AtomicBool::new(false);
static IN_CLAIMED: AtomicBool = AtomicBool::new(false);
static IN_BUSY: AtomicBool = AtomicBool::new(false);

static CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESC: StaticCell<[u8; 64]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static CDC_STATE_0: StaticCell<State> = StaticCell::new();
static CDC_STATE_1: StaticCell<State> = StaticCell::new();
static HANDLER: StaticCell<UsbHandler> = StaticCell::new();

fn post(event: DeviceEvent) {
    if DEVICE_EVENTS.try_send(event).is_err() {
        warn!("device event queue full, dropped {}", event);
    }
}

/// Everything `build` hands back to `main`.
pub struct UsbParts {
    pub device: UsbDevice<'static, UsbDriver>,
    pub consoles: [CdcAcmClass<'static, UsbDriver>; 2],
    pub xinput_in: XInputIn,
    pub xinput_out: XInputOut,
}

/// Build the composite device: two CDC consoles followed by the XInput
/// function.
///
/// Must be called exactly once. All static buffers are consumed here.
pub fn build(driver: UsbDriver, strings: &'static StringTable) -> UsbParts {
    let mut config = Config::new(USB_VID, USB_PID);
    config.manufacturer = strings.string(STR_MANUFACTURER);
    config.product = strings.string(STR_PRODUCT);
    config.serial_number = strings.string(STR_SERIAL);
    config.device_release = DEVICE_RELEASE;
    config.max_power = MAX_POWER_MA;
    config.max_packet_size_0 = EP0_SIZE;
    // embassy requires the IAD class triple when functions carry IADs
    config.composite_with_iads = true;
    config.device_class = MISC_CLASS;
    config.device_sub_class = MISC_COMMON_SUBCLASS;
    config.device_protocol = MISC_IAD_PROTOCOL;

    let mut builder = Builder::new(
        driver,
        config,
        CONFIG_DESC.init([0; 256]),
        BOS_DESC.init([0; 256]),
        MSOS_DESC.init([0; 64]),
        CONTROL_BUF.init([0; 64]),
    );

    let console_0 = CdcAcmClass::new(&mut builder, CDC_STATE_0.init(State::new()), CDC_DATA_SIZE);
    let console_1 = CdcAcmClass::new(&mut builder, CDC_STATE_1.init(State::new()), CDC_DATA_SIZE);
    let (interface, xinput_in, xinput_out) = add_xinput(&mut builder);

    let interface = u8::from(interface);
    if interface != ITF_NUM_XINPUT {
        warn!("xinput landed on interface {}, expected {}", interface, ITF_NUM_XINPUT);
    }
    builder.handler(HANDLER.init(UsbHandler::new(strings, interface)));

    UsbParts {
        device: builder.build(),
        consoles: [console_0, console_1],
        xinput_in,
        xinput_out,
    }
}

fn add_xinput(builder: &mut Builder<'static, UsbDriver>) -> (InterfaceNumber, XInputIn, XInputOut) {
    let mut function = builder.function(XINPUT_CLASS, XINPUT_SUBCLASS, XINPUT_PROTOCOL);
    let mut interface = function.interface();
    let number = interface.interface_number();
    let mut alt = interface.alt_setting(
        XINPUT_CLASS,
        XINPUT_SUBCLASS,
        XINPUT_PROTOCOL,
        Some(StringIndex::new(STR_XINPUT)),
    );
    // embassy writes bLength and bDescriptorType itself
    alt.descriptor(XINPUT_CLASS_DESCRIPTOR[1], &XINPUT_CLASS_DESCRIPTOR[2..]);
    // Addresses are left to the allocator; the CDC functions already hold
    // the low endpoint numbers.
    let ep_in = alt.endpoint_interrupt_in(None, XINPUT_EP_SIZE, XINPUT_IN_INTERVAL);
    let ep_out = alt.endpoint_interrupt_out(None, XINPUT_EP_SIZE, XINPUT_OUT_INTERVAL);
    (number, ep_in, ep_out)
}

fn setup_packet(req: &Request) -> SetupPacket {
    let direction = match req.direction {
        Direction::Out => 0x00,
        Direction::In => 0x80,
    };
    let kind = match req.request_type {
        RequestType::Standard => 0,
        RequestType::Class => 1,
        RequestType::Vendor => 2,
        RequestType::Reserved => 3,
    };
    let recipient = match req.recipient {
        Recipient::Device => 0,
        Recipient::Interface => 1,
        Recipient::Endpoint => 2,
        Recipient::Other => 3,
        Recipient::Reserved => 0x1F,
    };
    SetupPacket {
        request_type: direction | (kind << 5) | recipient,
        request: req.request,
        value: req.value,
        index: req.index,
        length: req.length,
    }
}

/// Bus callbacks and endpoint-0 requests embassy does not answer itself.
///
/// Bus state goes out as [`DeviceEvent`]s. Control requests are answered
/// here, synchronously, since embassy needs the data before the callback
/// returns.
pub struct UsbHandler {
    strings: &'static StringTable,
    xinput_interface: u8,
}

impl UsbHandler {
    fn new(strings: &'static StringTable, xinput_interface: u8) -> Self {
        Self {
            strings,
            xinput_interface,
        }
    }

    fn is_xinput(&self, req: &Request) -> bool {
        req.recipient == Recipient::Interface && req.index == u16::from(self.xinput_interface)
    }
}

impl Handler for UsbHandler {
    fn reset(&mut self) {
        CONFIGURED.store(false, Ordering::Release);
        post(DeviceEvent::BusReset);
    }

    fn configured(&mut self, configured: bool) {
        info!("usb configured: {}", configured);
        CONFIGURED.store(configured, Ordering::Release);
        post(if configured {
            DeviceEvent::Configured
        } else {
            DeviceEvent::Unconfigured
        });
    }

    fn suspended(&mut self, suspended: bool) {
        post(if suspended {
            DeviceEvent::Suspended
        } else {
            DeviceEvent::Resumed
        });
    }

    fn control_in<'a>(&'a mut self, req: Request, _buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        let setup = setup_packet(&req);
        if let Some(data) = respond_vendor_request(&setup) {
            debug!("usb: compat id descriptor, {} bytes", data.len());
            return Some(InResponse::Accepted(data));
        }
        if self.is_xinput(&req) {
            trace!("usb: xinput interface request {=u8:#x}", req.request);
            return Some(InResponse::Accepted(&[]));
        }
        None
    }

    fn control_out(&mut self, req: Request, _data: &[u8]) -> Option<OutResponse> {
        if self.is_xinput(&req) {
            return Some(OutResponse::Accepted);
        }
        None
    }

    fn get_string(&mut self, index: StringIndex, _lang_id: u16) -> Option<&str> {
        self.strings.string(u8::from(index))
    }
}

/// [`DeviceTransport`] over the embassy endpoints.
///
/// Endpoint addresses are the ones in the configuration table; they are
/// mapped onto whatever the allocator actually assigned.
#[derive(Default)]
pub struct UsbDeviceTransport;

impl UsbDeviceTransport {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceTransport for UsbDeviceTransport {
    fn open_endpoint(&mut self, desc: &EndpointDescriptor) -> bool {
        let address = desc.address;
        address == EndpointAddress::XINPUT_IN || address == EndpointAddress::XINPUT_OUT
    }

    fn claim(&mut self, ep: EndpointAddress) -> bool {
        ep == EndpointAddress::XINPUT_IN
            && IN_CLAIMED
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    fn release(&mut self, ep: EndpointAddress) {
        if ep == EndpointAddress::XINPUT_IN {
            IN_CLAIMED.store(false, Ordering::Release);
        }
    }

    fn busy(&self, ep: EndpointAddress) -> bool {
        ep == EndpointAddress::XINPUT_IN && IN_BUSY.load(Ordering::Acquire)
    }

    fn ready(&self) -> bool {
        CONFIGURED.load(Ordering::Acquire)
    }

    fn submit(&mut self, ep: EndpointAddress, data: &[u8]) -> bool {
        if ep != EndpointAddress::XINPUT_IN {
            return false;
        }
        let Ok(report) = <[u8; DeviceReport::SIZE]>::try_from(data) else {
            warn!("usb: refusing {} byte IN transfer", data.len());
            return false;
        };
        // Busy before queueing, so the writer cannot clear it first
        IN_BUSY.store(true, Ordering::Release);
        if IN_REPORTS.try_send(report).is_err() {
            IN_BUSY.store(false, Ordering::Release);
            return false;
        }
        true
    }

    fn arm_receive(&mut self, ep: EndpointAddress, len: usize) -> bool {
        if ep != EndpointAddress::XINPUT_OUT {
            return false;
        }
        OUT_ARMED.signal(len);
        true
    }

    fn read_packet(&mut self, ep: EndpointAddress, buf: &mut [u8]) -> usize {
        if ep != EndpointAddress::XINPUT_OUT {
            return 0;
        }
        OUT_PACKET.lock(|packet| {
            let packet = packet.borrow();
            let n = packet.len().min(buf.len());
            buf[..n].copy_from_slice(&packet[..n]);
            n
        })
    }

    fn control_reply(&mut self, _data: Option<&[u8]>) {
        // UsbHandler answers endpoint 0 inline; no ControlRequest is ever queued
        debug!("usb: stray control reply ignored");
    }

    fn poll_event(&mut self) -> Option<DeviceEvent> {
        DEVICE_EVENTS.try_receive().ok()
    }
}

/// Drive the XInput IN endpoint: write each submitted report and post its
/// completion.
pub async fn run_in_endpoint(mut ep: XInputIn) -> ! {
    loop {
        ep.wait_enabled().await;
        debug!("usb: xinput IN enabled");
        loop {
            let report = IN_REPORTS.receive().await;
            let (result, len) = match ep.write(&report).await {
                Ok(()) => (TransferResult::Success, report.len()),
                Err(e) => {
                    warn!("usb: xinput IN write failed: {}", e);
                    (TransferResult::Failed, 0)
                }
            };
            IN_BUSY.store(false, Ordering::Release);
            post(DeviceEvent::TransferComplete {
                ep: EndpointAddress::XINPUT_IN,
                result,
                len,
            });
            if !result.is_success() {
                break;
            }
        }
    }
}

/// Drive the XInput OUT endpoint: read one packet per arm and post its
/// completion.
pub async fn run_out_endpoint(mut ep: XInputOut) -> ! {
    let mut buf = [0u8; OUT_PACKET_LEN];
    loop {
        ep.wait_enabled().await;
        debug!("usb: xinput OUT enabled");
        loop {
            let _ = OUT_ARMED.wait().await;
            match ep.read(&mut buf).await {
                Ok(n) => {
                    OUT_PACKET.lock(|packet| {
                        let mut packet = packet.borrow_mut();
                        packet.clear();
                        // n never exceeds the endpoint size
                        let _ = packet.extend_from_slice(&buf[..n]);
                    });
                    post(DeviceEvent::TransferComplete {
                        ep: EndpointAddress::XINPUT_OUT,
                        result: TransferResult::Success,
                        len: n,
                    });
                }
                Err(e) => {
                    warn!("usb: xinput OUT read failed: {}", e);
                    post(DeviceEvent::TransferComplete {
                        ep: EndpointAddress::XINPUT_OUT,
                        result: TransferResult::Failed,
                        len: 0,
                    });
                    break;
                }
            }
        }
    }
}
