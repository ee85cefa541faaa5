//! The two CDC consoles.
//!
//! Console 0 acknowledges every packet with `OK`. Console 1 is drained and
//! otherwise ignored. Opening either one at 300 baud reboots into the USB
//! bootloader.

use defmt::{info, trace};
use embassy_futures::select::{select, Either};
use embassy_usb::class::cdc_acm::CdcAcmClass;
use xinput_proto::descriptor::CDC_DATA_SIZE;

use crate::usb_device::UsbDriver;

/// Line rate that requests a reboot into the bootloader.
pub const BOOTLOADER_BAUD: u32 = 300;

const ACK: &[u8] = b"OK\r\n";

/// Serve one console until the device goes away.
pub async fn run(class: CdcAcmClass<'static, UsbDriver>, index: usize) -> ! {
    let (mut tx, mut rx, control) = class.split_with_control();
    let mut buf = [0u8; CDC_DATA_SIZE as usize];

    loop {
        rx.wait_connection().await;
        info!("console {}: connected", index);

        loop {
            match select(rx.read_packet(&mut buf), control.control_changed()).await {
                Either::First(Ok(n)) => {
                    trace!("console {}: {} bytes", index, n);
                    if index == 0 && tx.write_packet(ACK).await.is_err() {
                        break;
                    }
                }
                Either::First(Err(_)) => break,
                Either::Second(()) => {
                    if rx.line_coding().data_rate() == BOOTLOADER_BAUD {
                        info!("console {}: rebooting to bootloader", index);
                        embassy_rp::rom_data::reset_to_usb_boot(0, 0);
                    }
                }
            }
        }

        info!("console {}: disconnected", index);
    }
}
