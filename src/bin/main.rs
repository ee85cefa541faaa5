#![no_std]
#![no_main]

use core::fmt::Write;

use defmt::{info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::class::cdc_acm::CdcAcmClass;
use embassy_usb::UsbDevice;
use passthrough_core::Passthrough;
use static_cell::StaticCell;
use xinput_passthrough::usb_device::{self, XInputIn, XInputOut};
use xinput_passthrough::{
    console, host_port, ChannelHostTransport, EmbassyClock, StatusLed, UsbDeviceTransport,
    UsbDriver,
};
use xinput_proto::strings::SERIAL_LEN;
use xinput_proto::StringTable;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// String descriptors, shared by the USB handler and the passthrough loop.
static STRINGS: StaticCell<StringTable> = StaticCell::new();

/// Hex-encode the flash unique id as the USB serial number.
fn board_serial(uid: &[u8]) -> heapless::String<SERIAL_LEN> {
    let mut serial = heapless::String::new();
    for byte in uid {
        // 8 id bytes fit twice over
        let _ = write!(serial, "{:02X}", byte);
    }
    serial
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("XInput passthrough starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Serial number ---
    let mut flash = Flash::<_, Blocking, FLASH_SIZE>::new_blocking(p.FLASH);
    let mut uid = [0u8; 8];
    if flash.blocking_unique_id(&mut uid).is_err() {
        warn!("flash unique id unavailable, using zeros");
    }
    let strings: &'static StringTable = STRINGS.init(StringTable::new(&board_serial(&uid)));

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);
    let usb = usb_device::build(usb_driver, strings);
    let [console_0, console_1] = usb.consoles;

    let led = Output::new(p.PIN_25, Level::Low);

    // Spawn tasks (unwrap the SpawnToken, then spawn)
    spawner.spawn(usb_task(usb.device).unwrap());
    spawner.spawn(xinput_in_task(usb.xinput_in).unwrap());
    spawner.spawn(xinput_out_task(usb.xinput_out).unwrap());
    spawner.spawn(console_task(console_0, 0).unwrap());
    spawner.spawn(console_task(console_1, 1).unwrap());
    spawner.spawn(host_port_task().unwrap());

    let mut passthrough = Passthrough::new(
        UsbDeviceTransport::new(),
        ChannelHostTransport::new(),
        EmbassyClock,
        StatusLed::new(led),
        strings.clone(),
    );

    info!("XInput passthrough initialized, waiting for the host...");
    loop {
        passthrough.tick();
        embassy_futures::yield_now().await;
    }
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) {
    device.run().await;
}

#[embassy_executor::task]
async fn xinput_in_task(ep: XInputIn) {
    usb_device::run_in_endpoint(ep).await
}

#[embassy_executor::task]
async fn xinput_out_task(ep: XInputOut) {
    usb_device::run_out_endpoint(ep).await
}

#[embassy_executor::task(pool_size = 2)]
async fn console_task(class: CdcAcmClass<'static, UsbDriver>, index: usize) {
    console::run(class, index).await
}

/// Host port task - stands in for the host-port stack on this board.
#[embassy_executor::task]
async fn host_port_task() {
    host_port::drain_commands().await
}
