//! String table and string descriptor encoding.

use heapless::{String, Vec};

use crate::descriptor::{
    DESC_STRING, STR_CDC, STR_MANUFACTURER, STR_PRODUCT, STR_SERIAL, STR_XINPUT,
};
use crate::msos::{MS_OS_STRING, MS_OS_STRING_INDEX};

/// Supported language: English (United States).
pub const LANGID_EN_US: u16 = 0x0409;

pub const MANUFACTURER: &str = "Tak";
pub const PRODUCT: &str = "Tak's Device";
pub const CDC_INTERFACE: &str = "Tak's CDC Interface";
pub const XINPUT_INTERFACE: &str = "Tak's Roller";

/// Longest string encoded, in UTF-16 code units. Longer strings are cut.
pub const MAX_CHARS: usize = 32;

/// Serial numbers are at most this many characters.
pub const SERIAL_LEN: usize = 32;

/// An encoded string descriptor.
///
/// The UTF-16 code units and the wire bytes live in separate buffers, so
/// encoding never reinterprets one as the other.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringDescriptor {
    units: Vec<u16, MAX_CHARS>,
    bytes: Vec<u8, { 2 + 2 * MAX_CHARS }>,
}

impl StringDescriptor {
    /// Encode a descriptor holding the given code units, cut at [`MAX_CHARS`].
    #[must_use]
    pub fn from_units(units: impl IntoIterator<Item = u16>) -> Self {
        let mut out = Self::default();
        for unit in units.into_iter().take(MAX_CHARS) {
            // take() bounds the count to the capacity
            let _ = out.units.push(unit);
        }
        out.encode();
        out
    }

    fn encode(&mut self) {
        self.bytes.clear();
        let len = 2 + 2 * self.units.len();
        let _ = self.bytes.push(len as u8);
        let _ = self.bytes.push(DESC_STRING);
        for unit in &self.units {
            let _ = self.bytes.extend_from_slice(&unit.to_le_bytes());
        }
    }

    /// Code units carried by the descriptor.
    #[must_use]
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Wire form: `bLength`, `bDescriptorType`, then UTF-16LE code units.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Strings referenced by the device and configuration descriptors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringTable {
    serial: String<SERIAL_LEN>,
}

impl StringTable {
    /// Build the table around a board-supplied serial number, cut at
    /// [`SERIAL_LEN`] characters.
    #[must_use]
    pub fn new(serial: &str) -> Self {
        let mut owned = String::new();
        for c in serial.chars() {
            if owned.push(c).is_err() {
                break;
            }
        }
        Self { serial: owned }
    }

    /// Text of a string index, or `None` for an index with no string.
    ///
    /// Index 0 is the language list, not text, and also yields `None`; see
    /// [`StringTable::descriptor`].
    #[must_use]
    pub fn string(&self, index: u8) -> Option<&str> {
        match index {
            STR_MANUFACTURER => Some(MANUFACTURER),
            STR_PRODUCT => Some(PRODUCT),
            STR_SERIAL => Some(self.serial.as_str()),
            STR_CDC => Some(CDC_INTERFACE),
            STR_XINPUT => Some(XINPUT_INTERFACE),
            MS_OS_STRING_INDEX => Some(MS_OS_STRING),
            _ => None,
        }
    }

    /// Encoded string descriptor for `index`.
    ///
    /// Only one language is supported, so `langid` does not change the
    /// result. Returns `None` for an unsupported index.
    #[must_use]
    pub fn descriptor(&self, index: u8, langid: u16) -> Option<StringDescriptor> {
        let _ = langid;
        if index == 0 {
            return Some(StringDescriptor::from_units([LANGID_EN_US]));
        }
        self.string(index)
            .map(|s| StringDescriptor::from_units(s.encode_utf16()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_langid_descriptor() {
        let table = StringTable::new("E6614103E7");
        let desc = table.descriptor(0, 0).unwrap();
        assert_eq!(desc.as_bytes(), &[0x04, 0x03, 0x09, 0x04]);
    }

    #[test]
    fn test_ascii_string_is_utf16le() {
        let table = StringTable::new("E6614103E7");
        let desc = table.descriptor(STR_MANUFACTURER, LANGID_EN_US).unwrap();
        assert_eq!(desc.as_bytes(), &[0x08, 0x03, b'T', 0, b'a', 0, b'k', 0]);
        assert_eq!(desc.units(), &[u16::from(b'T'), u16::from(b'a'), u16::from(b'k')]);
    }

    #[test]
    fn test_serial_comes_from_board() {
        let table = StringTable::new("E6614103E7");
        assert_eq!(table.string(STR_SERIAL), Some("E6614103E7"));
        assert_eq!(table.descriptor(STR_SERIAL, LANGID_EN_US).unwrap().len(), 2 + 2 * 10);
    }

    #[test]
    fn test_unsupported_index_yields_none() {
        let table = StringTable::new("1");
        assert!(table.descriptor(0xFF, LANGID_EN_US).is_none());
        assert!(table.descriptor(6, LANGID_EN_US).is_none());
        assert!(table.string(0).is_none());
    }

    #[test]
    fn test_long_strings_are_capped() {
        let long = "0123456789012345678901234567890123456789";
        let table = StringTable::new(long);
        assert_eq!(table.string(STR_SERIAL).map(str::len), Some(SERIAL_LEN));

        let desc = StringDescriptor::from_units(long.encode_utf16());
        assert_eq!(desc.units().len(), MAX_CHARS);
        assert_eq!(desc.as_bytes()[0], 66);
        assert_eq!(desc.len(), 66);
    }

    #[test]
    fn test_ms_os_string_descriptor() {
        let table = StringTable::new("1");
        let desc = table.descriptor(0xEE, LANGID_EN_US).unwrap();
        assert_eq!(desc.len(), 18);
        assert_eq!(&desc.as_bytes()[..4], &[18, 0x03, b'M', 0]);
        assert_eq!(&desc.as_bytes()[16..], &[0x90, 0x00]);
    }
}
