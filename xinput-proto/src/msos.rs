//! Microsoft OS 1.0 descriptors.
//!
//! Windows reads string 0xEE once per VID/PID. If it holds `"MSFT100"`
//! followed by a vendor code, the OS then issues a vendor request with that
//! code to fetch the extended compat-id descriptor, which binds the XInput
//! interface to the in-box `XUSB22` driver without an INF.

use crate::descriptor::ITF_NUM_XINPUT;
use crate::setup::SetupPacket;

/// `bRequest` the OS uses for the follow-up vendor request.
pub const MS_OS_VENDOR_CODE: u8 = 0x90;

/// String index the OS reads the signature from.
pub const MS_OS_STRING_INDEX: u8 = 0xEE;

/// Signature string; the last code unit carries the vendor code.
pub const MS_OS_STRING: &str = "MSFT100\u{0090}";

/// `wIndex` of an extended compat-id request.
pub const COMPAT_ID_INDEX: u16 = 0x0004;

/// Device-to-host, vendor, device recipient.
const VENDOR_DEVICE_IN: u8 = 0xC0;

pub const COMPAT_ID_LEN: usize = 40;

/// Extended compat-id descriptor with one function section.
pub const COMPAT_ID_DESCRIPTOR: [u8; COMPAT_ID_LEN] = [
    // Header
    COMPAT_ID_LEN as u8, 0x00, 0x00, 0x00, // dwLength
    0x00, 0x01, // bcdVersion 1.00
    0x04, 0x00, // wIndex
    0x01, // bCount
    0, 0, 0, 0, 0, 0, 0,
    // Function section
    ITF_NUM_XINPUT, // bFirstInterfaceNumber
    0x00, // reserved
    b'X', b'U', b'S', b'B', b'2', b'2', 0x00, 0x00, // compatibleID
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // subCompatibleID
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Answer a vendor control request.
///
/// Returns the compat-id blob for the extended compat-id request and `None`
/// for anything else, which the transport turns into a stall.
#[must_use]
pub fn respond_vendor_request(setup: &SetupPacket) -> Option<&'static [u8]> {
    if setup.request_type == VENDOR_DEVICE_IN
        && setup.request == MS_OS_VENDOR_CODE
        && setup.index == COMPAT_ID_INDEX
    {
        Some(&COMPAT_ID_DESCRIPTOR)
    } else {
        None
    }
}
