//! Enumeration-time descriptor tables for the composite device.
//!
//! The device exposes two CDC-ACM consoles and one XInput controller:
//!
//! | Interface | Function | Endpoints |
//! |-----------|----------|-----------|
//! | 0, 1      | Console 0 | notify 0x81, OUT 0x08, IN 0x88 |
//! | 2, 3      | Console 1 | notify 0x84, OUT 0x05, IN 0x85 |
//! | 4         | XInput    | IN 0x82, OUT 0x02 |
//!
//! All tables are built by `const fn`s. [`CONFIGURATION_DESCRIPTOR`] is
//! assembled part by part and the builder asserts that the write cursor
//! lands exactly on [`CONFIG_TOTAL_LEN`], so a wrong declared length is a
//! compile error rather than a malformed descriptor on the bus.

// Descriptor types
pub const DESC_DEVICE: u8 = 0x01;
pub const DESC_CONFIGURATION: u8 = 0x02;
pub const DESC_STRING: u8 = 0x03;
pub const DESC_INTERFACE: u8 = 0x04;
pub const DESC_ENDPOINT: u8 = 0x05;
pub const DESC_INTERFACE_ASSOCIATION: u8 = 0x0B;
pub const DESC_CS_INTERFACE: u8 = 0x24;

const XFER_BULK: u8 = 0x02;
const XFER_INTERRUPT: u8 = 0x03;

const CLASS_CDC: u8 = 0x02;
const CLASS_CDC_DATA: u8 = 0x0A;
const CDC_SUBCLASS_ACM: u8 = 0x02;

/// USB vendor id.
pub const USB_VID: u16 = 0x045E;
/// USB product id. Unique for this interface combination, since the host
/// caches driver bindings per VID/PID.
pub const USB_PID: u16 = 0x0123;
pub const USB_BCD: u16 = 0x0200;
pub const DEVICE_RELEASE: u16 = 0x0100;
pub const EP0_SIZE: u8 = 64;

/// XInput interface class triple.
pub const XINPUT_CLASS: u8 = 0xFF;
pub const XINPUT_SUBCLASS: u8 = 0x5D;
pub const XINPUT_PROTOCOL: u8 = 0x01;

// Interface numbers
pub const ITF_NUM_CDC_0: u8 = 0;
pub const ITF_NUM_CDC_1: u8 = 2;
pub const ITF_NUM_XINPUT: u8 = 4;
pub const ITF_NUM_TOTAL: u8 = 5;

// Endpoint addresses. The RP2040 firmware lets embassy-usb allocate the
// real endpoints and maps the XInput pair onto whatever it was given.
pub const EP_CDC_0_NOTIF: u8 = 0x81;
pub const EP_CDC_0_OUT: u8 = 0x08;
pub const EP_CDC_0_IN: u8 = 0x88;
pub const EP_CDC_1_NOTIF: u8 = 0x84;
pub const EP_CDC_1_OUT: u8 = 0x05;
pub const EP_CDC_1_IN: u8 = 0x85;
pub const EP_XINPUT_OUT: u8 = 0x02;
pub const EP_XINPUT_IN: u8 = 0x82;

pub const CDC_NOTIF_SIZE: u16 = 8;
pub const CDC_DATA_SIZE: u16 = 64;
pub const XINPUT_EP_SIZE: u16 = 32;
pub const XINPUT_IN_INTERVAL: u8 = 1;
pub const XINPUT_OUT_INTERVAL: u8 = 8;

// String indices referenced from the descriptors
pub const STR_MANUFACTURER: u8 = 1;
pub const STR_PRODUCT: u8 = 2;
pub const STR_SERIAL: u8 = 3;
pub const STR_CDC: u8 = 4;
pub const STR_XINPUT: u8 = 5;

pub const MAX_POWER_MA: u16 = 500;

// Part lengths
pub const DEVICE_DESC_LEN: usize = 18;
pub const CONFIG_DESC_LEN: usize = 9;
pub const INTERFACE_DESC_LEN: usize = 9;
pub const ENDPOINT_DESC_LEN: usize = 7;
pub const CDC_DESC_LEN: usize = 8 + 9 + 5 + 5 + 4 + 5 + 7 + 9 + 7 + 7;
/// Length of the vendor class descriptor following the XInput interface.
pub const XINPUT_CLASS_DESC_LEN: usize = 16;
pub const XINPUT_DESC_LEN: usize =
    INTERFACE_DESC_LEN + XINPUT_CLASS_DESC_LEN + 2 * ENDPOINT_DESC_LEN;
pub const CDC_COUNT: usize = 2;

/// Declared `wTotalLength` of the configuration descriptor.
pub const CONFIG_TOTAL_LEN: usize = CONFIG_DESC_LEN + CDC_COUNT * CDC_DESC_LEN + XINPUT_DESC_LEN;

/// Undocumented class descriptor every wired 360 pad carries after its
/// control interface; the upstream driver refuses the interface without it.
pub const XINPUT_CLASS_DESCRIPTOR: [u8; XINPUT_CLASS_DESC_LEN] = [
    0x10, 0x21, 0x10, 0x01, 0x01, 0x24, 0x81, 0x14, 0x03, 0x00, 0x03, 0x13, 0x02, 0x00, 0x03, 0x00,
];

const fn lo(v: u16) -> u8 {
    (v & 0xFF) as u8
}

const fn hi(v: u16) -> u8 {
    (v >> 8) as u8
}

/// Device descriptor.
///
/// Class 0 at device level: each interface (and each CDC function via its
/// IAD) declares its own class.
pub const DEVICE_DESCRIPTOR: [u8; DEVICE_DESC_LEN] = [
    DEVICE_DESC_LEN as u8,
    DESC_DEVICE,
    lo(USB_BCD),
    hi(USB_BCD),
    0x00, // bDeviceClass
    0x00, // bDeviceSubClass
    0x00, // bDeviceProtocol
    EP0_SIZE,
    lo(USB_VID),
    hi(USB_VID),
    lo(USB_PID),
    hi(USB_PID),
    lo(DEVICE_RELEASE),
    hi(DEVICE_RELEASE),
    STR_MANUFACTURER,
    STR_PRODUCT,
    STR_SERIAL,
    0x01, // bNumConfigurations
];

const fn config_header(total_len: usize, interfaces: u8) -> [u8; CONFIG_DESC_LEN] {
    let total = total_len as u16;
    [
        CONFIG_DESC_LEN as u8,
        DESC_CONFIGURATION,
        lo(total),
        hi(total),
        interfaces,
        0x01, // bConfigurationValue
        0x00, // iConfiguration
        0x80, // bus powered
        (MAX_POWER_MA / 2) as u8,
    ]
}

const fn cdc_function(
    itf: u8,
    string: u8,
    ep_notif: u8,
    notif_size: u16,
    ep_out: u8,
    ep_in: u8,
    data_size: u16,
) -> [u8; CDC_DESC_LEN] {
    [
        // Interface association
        8, DESC_INTERFACE_ASSOCIATION, itf, 2, CLASS_CDC, CDC_SUBCLASS_ACM, 0x00, 0x00,
        // Control interface
        9, DESC_INTERFACE, itf, 0, 1, CLASS_CDC, CDC_SUBCLASS_ACM, 0x00, string,
        // Header functional, CDC 1.20
        5, DESC_CS_INTERFACE, 0x00, 0x20, 0x01,
        // Call management
        5, DESC_CS_INTERFACE, 0x01, 0x00, itf + 1,
        // ACM: line coding + send break
        4, DESC_CS_INTERFACE, 0x02, 0x06,
        // Union
        5, DESC_CS_INTERFACE, 0x06, itf, itf + 1,
        // Notification endpoint
        7, DESC_ENDPOINT, ep_notif, XFER_INTERRUPT, lo(notif_size), hi(notif_size), 16,
        // Data interface
        9, DESC_INTERFACE, itf + 1, 0, 2, CLASS_CDC_DATA, 0x00, 0x00, 0x00,
        // Data OUT
        7, DESC_ENDPOINT, ep_out, XFER_BULK, lo(data_size), hi(data_size), 0,
        // Data IN
        7, DESC_ENDPOINT, ep_in, XFER_BULK, lo(data_size), hi(data_size), 0,
    ]
}

const fn xinput_function(
    itf: u8,
    string: u8,
    ep_out: u8,
    ep_in: u8,
    ep_size: u16,
) -> [u8; XINPUT_DESC_LEN] {
    let c = XINPUT_CLASS_DESCRIPTOR;
    [
        9, DESC_INTERFACE, itf, 0, 2, XINPUT_CLASS, XINPUT_SUBCLASS, XINPUT_PROTOCOL, string,
        c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7],
        c[8], c[9], c[10], c[11], c[12], c[13], c[14], c[15],
        7, DESC_ENDPOINT, ep_in, XFER_INTERRUPT, lo(ep_size), hi(ep_size), XINPUT_IN_INTERVAL,
        7, DESC_ENDPOINT, ep_out, XFER_INTERRUPT, lo(ep_size), hi(ep_size), XINPUT_OUT_INTERVAL,
    ]
}

const fn put<const N: usize>(
    mut out: [u8; CONFIG_TOTAL_LEN],
    at: usize,
    part: [u8; N],
) -> ([u8; CONFIG_TOTAL_LEN], usize) {
    let mut i = 0;
    while i < N {
        out[at + i] = part[i];
        i += 1;
    }
    (out, at + N)
}

const fn build_configuration() -> [u8; CONFIG_TOTAL_LEN] {
    let out = [0u8; CONFIG_TOTAL_LEN];
    let (out, at) = put(out, 0, config_header(CONFIG_TOTAL_LEN, ITF_NUM_TOTAL));
    let (out, at) = put(
        out,
        at,
        cdc_function(
            ITF_NUM_CDC_0,
            STR_CDC,
            EP_CDC_0_NOTIF,
            CDC_NOTIF_SIZE,
            EP_CDC_0_OUT,
            EP_CDC_0_IN,
            CDC_DATA_SIZE,
        ),
    );
    let (out, at) = put(
        out,
        at,
        cdc_function(
            ITF_NUM_CDC_1,
            STR_CDC,
            EP_CDC_1_NOTIF,
            CDC_NOTIF_SIZE,
            EP_CDC_1_OUT,
            EP_CDC_1_IN,
            CDC_DATA_SIZE,
        ),
    );
    let (out, at) = put(
        out,
        at,
        xinput_function(ITF_NUM_XINPUT, STR_XINPUT, EP_XINPUT_OUT, EP_XINPUT_IN, XINPUT_EP_SIZE),
    );
    assert!(
        at == CONFIG_TOTAL_LEN,
        "configuration descriptor size is incorrect"
    );
    out
}

/// Full-speed configuration descriptor.
pub const CONFIGURATION_DESCRIPTOR: [u8; CONFIG_TOTAL_LEN] = build_configuration();

const _: () = assert!(CONFIG_TOTAL_LEN <= u16::MAX as usize);
const _: () = assert!(CDC_DESC_LEN == 66);
const _: () = assert!(XINPUT_DESC_LEN == 39);

/// XInput-compatible HID report descriptor for the controller interface:
/// four 16-bit axes, 16 buttons, a hat switch, two extra 16-bit axes and
/// eight vendor output bytes.
pub const REPORT_DESCRIPTOR: [u8; 120] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Game Pad)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x03, //   Report ID (3)
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x30, //   Usage (X)
    0x09, 0x31, //   Usage (Y)
    0x09, 0x32, //   Usage (Z)
    0x09, 0x35, //   Usage (Rz)
    0x15, 0x00, //   Logical Minimum (0)
    0x27, 0xFF, 0xFF, 0x00, 0x00, // Logical Maximum (65535)
    0x75, 0x10, //   Report Size (16)
    0x95, 0x04, //   Report Count (4)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x10, //   Usage Maximum (16)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x10, //   Report Count (16)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x39, //   Usage (Hat switch)
    0x15, 0x01, //   Logical Minimum (1)
    0x25, 0x08, //   Logical Maximum (8)
    0x35, 0x00, //   Physical Minimum (0)
    0x46, 0x3B, 0x01, // Physical Maximum (315)
    0x65, 0x14, //   Unit (English Rotation, degrees)
    0x75, 0x04, //   Report Size (4)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x42, //   Input (Data, Variable, Absolute, Null State)
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x33, //   Usage (Rx)
    0x09, 0x34, //   Usage (Ry)
    0x15, 0x00, //   Logical Minimum (0)
    0x27, 0xFF, 0xFF, 0x00, 0x00, // Logical Maximum (65535)
    0x75, 0x10, //   Report Size (16)
    0x95, 0x02, //   Report Count (2)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x85, 0x04, //   Report ID (4)
    0x06, 0x00, 0xFF, // Usage Page (Vendor Defined 0xFF00)
    0x09, 0x20, //   Usage (0x20)
    0x09, 0x21, //   Usage (0x21)
    0x09, 0x22, //   Usage (0x22)
    0x09, 0x23, //   Usage (0x23)
    0x09, 0x24, //   Usage (0x24)
    0x09, 0x25, //   Usage (0x25)
    0x09, 0x26, //   Usage (0x26)
    0x09, 0x27, //   Usage (0x27)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, // Logical Maximum (255)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x08, //   Report Count (8)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0xC0, // End Collection
];

/// Endpoint address: number in bits 0..4, direction in bit 7.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointAddress(pub u8);

impl EndpointAddress {
    const DIR_IN: u8 = 0x80;

    /// XInput interrupt IN endpoint as laid out in the table; the firmware
    /// remaps it to the endpoint embassy-usb allocates.
    pub const XINPUT_IN: Self = Self(EP_XINPUT_IN);
    /// XInput interrupt OUT endpoint as laid out in the table; remapped
    /// like [`Self::XINPUT_IN`].
    pub const XINPUT_OUT: Self = Self(EP_XINPUT_OUT);

    #[inline]
    #[must_use]
    pub const fn is_in(self) -> bool {
        self.0 & Self::DIR_IN != 0
    }

    #[inline]
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0 & 0x0F
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl From<u8> for EndpointAddress {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

/// Transfer type from `bmAttributes` of an endpoint descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferType {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

/// Parsed view of an interface descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceDescriptor {
    pub number: u8,
    pub alternate: u8,
    pub num_endpoints: u8,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub string: u8,
}

impl InterfaceDescriptor {
    /// Parse the leading interface descriptor of `data`.
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        match data {
            [len, DESC_INTERFACE, number, alternate, num_endpoints, class, subclass, protocol, string, ..]
                if usize::from(*len) >= INTERFACE_DESC_LEN =>
            {
                Some(Self {
                    number: *number,
                    alternate: *alternate,
                    num_endpoints: *num_endpoints,
                    class: *class,
                    subclass: *subclass,
                    protocol: *protocol,
                    string: *string,
                })
            }
            _ => None,
        }
    }

    /// Whether this is the XInput control interface.
    #[inline]
    #[must_use]
    pub const fn is_xinput(&self) -> bool {
        self.class == XINPUT_CLASS
            && self.subclass == XINPUT_SUBCLASS
            && self.protocol == XINPUT_PROTOCOL
    }
}

/// Parsed view of an endpoint descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointDescriptor {
    pub address: EndpointAddress,
    pub transfer: TransferType,
    pub max_packet_size: u16,
    pub interval: u8,
}

impl EndpointDescriptor {
    /// Parse the leading endpoint descriptor of `data`.
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        match data {
            [len, DESC_ENDPOINT, address, attributes, size_lo, size_hi, interval, ..]
                if usize::from(*len) >= ENDPOINT_DESC_LEN =>
            {
                let transfer = match attributes & 0x03 {
                    0 => TransferType::Control,
                    1 => TransferType::Isochronous,
                    2 => TransferType::Bulk,
                    _ => TransferType::Interrupt,
                };
                Some(Self {
                    address: EndpointAddress(*address),
                    transfer,
                    max_packet_size: u16::from_le_bytes([*size_lo, *size_hi]),
                    interval: *interval,
                })
            }
            _ => None,
        }
    }
}

/// Iterator over the descriptors packed in a blob.
///
/// Yields `(bDescriptorType, bytes)` for each descriptor. Iteration stops
/// at a zero `bLength` or at a descriptor that would run past the end of
/// the blob.
#[derive(Clone, Debug)]
pub struct Descriptors<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Descriptors<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Byte offset of the next descriptor within the blob.
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for Descriptors<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.data.get(self.offset..)?;
        let len = usize::from(*rest.first()?);
        if len < 2 || len > rest.len() {
            return None;
        }
        self.offset += len;
        Some((rest[1], &rest[..len]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_length_is_sum_of_parts() {
        let sum: usize = Descriptors::new(&CONFIGURATION_DESCRIPTOR)
            .map(|(_, d)| d.len())
            .sum();
        assert_eq!(sum, CONFIG_TOTAL_LEN);
        assert_eq!(CONFIG_TOTAL_LEN, 180);

        let declared =
            u16::from_le_bytes([CONFIGURATION_DESCRIPTOR[2], CONFIGURATION_DESCRIPTOR[3]]);
        assert_eq!(usize::from(declared), CONFIG_TOTAL_LEN);
    }

    #[test]
    fn test_parts_add_up_per_function() {
        let interfaces = Descriptors::new(&CONFIGURATION_DESCRIPTOR)
            .filter(|(t, _)| *t == DESC_INTERFACE)
            .count();
        let endpoints = Descriptors::new(&CONFIGURATION_DESCRIPTOR)
            .filter(|(t, _)| *t == DESC_ENDPOINT)
            .count();
        assert_eq!(interfaces, usize::from(ITF_NUM_TOTAL));
        assert_eq!(endpoints, 3 + 3 + 2);
        assert_eq!(CONFIGURATION_DESCRIPTOR[4], ITF_NUM_TOTAL);
        assert_eq!(CONFIGURATION_DESCRIPTOR[8], 250);
    }

    #[test]
    fn test_endpoint_addresses_are_unique() {
        let mut seen: std::vec::Vec<u8> = Descriptors::new(&CONFIGURATION_DESCRIPTOR)
            .filter_map(|(_, d)| EndpointDescriptor::parse(d))
            .map(|ep| ep.address.raw())
            .collect();
        let total = seen.len();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), total);
    }

    #[test]
    fn test_xinput_function_layout() {
        let offset = CONFIG_DESC_LEN + CDC_COUNT * CDC_DESC_LEN;
        let xinput = &CONFIGURATION_DESCRIPTOR[offset..];
        assert_eq!(xinput.len(), XINPUT_DESC_LEN);

        let itf = InterfaceDescriptor::parse(xinput).unwrap();
        assert!(itf.is_xinput());
        assert_eq!(itf.number, ITF_NUM_XINPUT);
        assert_eq!(itf.num_endpoints, 2);
        assert_eq!(itf.string, STR_XINPUT);
        assert_eq!(&xinput[9..25], &XINPUT_CLASS_DESCRIPTOR);

        let ep_in = EndpointDescriptor::parse(&xinput[25..]).unwrap();
        assert_eq!(ep_in.address, EndpointAddress::XINPUT_IN);
        assert_eq!(ep_in.transfer, TransferType::Interrupt);
        assert_eq!(ep_in.max_packet_size, 32);
        assert_eq!(ep_in.interval, 1);

        let ep_out = EndpointDescriptor::parse(&xinput[32..]).unwrap();
        assert_eq!(ep_out.address, EndpointAddress::XINPUT_OUT);
        assert!(!ep_out.address.is_in());
        assert_eq!(ep_out.interval, 8);
    }

    #[test]
    fn test_device_descriptor_fields() {
        assert_eq!(DEVICE_DESCRIPTOR[0], 18);
        assert_eq!(DEVICE_DESCRIPTOR[1], DESC_DEVICE);
        assert_eq!(DEVICE_DESCRIPTOR[4], 0x00);
        assert_eq!(&DEVICE_DESCRIPTOR[8..12], &[0x5E, 0x04, 0x23, 0x01]);
        assert_eq!(DEVICE_DESCRIPTOR[17], 1);
    }

    #[test]
    fn test_walker_stops_on_zero_or_truncated_length() {
        let blob = [0x09, 0x04, 0, 0, 0, 0, 0, 0, 0, 0x00, 0x05];
        let items: std::vec::Vec<_> = Descriptors::new(&blob).collect();
        assert_eq!(items.len(), 1);

        let truncated = [0x07, 0x05, 0x81, 0x03];
        assert_eq!(Descriptors::new(&truncated).count(), 0);
        assert_eq!(Descriptors::new(&[]).count(), 0);
    }

    #[test]
    fn test_interface_parse_rejects_other_types() {
        assert!(InterfaceDescriptor::parse(&CONFIGURATION_DESCRIPTOR).is_none());
        assert!(InterfaceDescriptor::parse(&CONFIGURATION_DESCRIPTOR[9..]).is_none()); // IAD
        let cdc = InterfaceDescriptor::parse(&CONFIGURATION_DESCRIPTOR[17..]).unwrap();
        assert_eq!(cdc.class, CLASS_CDC);
        assert!(!cdc.is_xinput());
    }

    #[test]
    fn test_report_descriptor_is_one_collection() {
        assert_eq!(&REPORT_DESCRIPTOR[..6], &[0x05, 0x01, 0x09, 0x05, 0xA1, 0x01]);
        assert_eq!(REPORT_DESCRIPTOR[REPORT_DESCRIPTOR.len() - 1], 0xC0);
    }
}
