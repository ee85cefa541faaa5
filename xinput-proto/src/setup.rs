//! Control transfer setup packets.

/// Data stage direction, bit 7 of `bmRequestType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Out,
    In,
}

/// Request type, bits 5..6 of `bmRequestType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestKind {
    Standard,
    Class,
    Vendor,
    Reserved,
}

/// Recipient, bits 0..4 of `bmRequestType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
    Reserved,
}

/// An 8-byte SETUP packet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub const SIZE: usize = 8;

    /// Parse a SETUP packet from its wire form.
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        match data {
            [request_type, request, v0, v1, i0, i1, l0, l1, ..] => Some(Self {
                request_type: *request_type,
                request: *request,
                value: u16::from_le_bytes([*v0, *v1]),
                index: u16::from_le_bytes([*i0, *i1]),
                length: u16::from_le_bytes([*l0, *l1]),
            }),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let [v0, v1] = self.value.to_le_bytes();
        let [i0, i1] = self.index.to_le_bytes();
        let [l0, l1] = self.length.to_le_bytes();
        [self.request_type, self.request, v0, v1, i0, i1, l0, l1]
    }

    #[inline]
    #[must_use]
    pub const fn direction(&self) -> Direction {
        if self.request_type & 0x80 != 0 {
            Direction::In
        } else {
            Direction::Out
        }
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match (self.request_type >> 5) & 0x03 {
            0 => RequestKind::Standard,
            1 => RequestKind::Class,
            2 => RequestKind::Vendor,
            _ => RequestKind::Reserved,
        }
    }

    #[inline]
    #[must_use]
    pub const fn recipient(&self) -> Recipient {
        match self.request_type & 0x1F {
            0 => Recipient::Device,
            1 => Recipient::Interface,
            2 => Recipient::Endpoint,
            3 => Recipient::Other,
            _ => Recipient::Reserved,
        }
    }
}
