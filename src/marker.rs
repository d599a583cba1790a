pub(crate) enum MarkerType {
    Segment,
    StandAlone,
}

/// Marker codes, identified by the byte following `0xFF`.
///
/// Families that share a meaning (frame types, restarts, application segments) carry their
/// index instead of getting one variant each.
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Hash, Eq)]
pub(crate) enum Marker {
    /// Start of Frame, `0xC0..=0xCF` minus DHT, JPG and DAC. The payload is the process number,
    /// so `SOF(0)` is baseline DCT and `SOF(2)` progressive DCT.
    SOF(u8),

    /// Huffman table specification
    DHT,

    /// Define arithmetic coding conditioning(s)
    DAC,

    /// Restart with modulo 8 count "m"
    RST(u8),

    /// Start of image
    SOI,

    /// End of image
    EOI,

    /// Start of scan
    SOS,

    /// Define quantization table(s)
    DQT,

    /// Define number of lines
    DNL,

    /// Define restart interval
    DRI,

    /// Define hierarchical progression
    DHP,

    /// Expand reference component(s)
    EXP,

    /// Reserved for application segments, `APP0..=APP15`
    APP(u8),

    /// Reserved for JPEG extensions. `JPG(0)` is `0xC8`, `JPG(n)` for `n` in 1..=13 is `0xF0 + n - 1`
    JPG(u8),

    /// Comment
    COM,

    /// For temporary private use in arithmetic coding
    TEM,

    /// Reserved, `0x02..=0xBF`
    RES(u8),
}

impl Marker {
    pub(crate) const SIZE: usize = 2;

    /// Returns `None` for `0x00` (a stuffed data byte) and `0xFF` (fill byte).
    pub(crate) fn from_u8(code: u8) -> Option<Marker> {
        let marker = match code {
            0x00 | 0xFF => return None,
            0x01 => Marker::TEM,
            0x02..=0xBF => Marker::RES(code),
            0xC4 => Marker::DHT,
            0xC8 => Marker::JPG(0),
            0xCC => Marker::DAC,
            0xC0..=0xCF => Marker::SOF(code - 0xC0),
            0xD0..=0xD7 => Marker::RST(code - 0xD0),
            0xD8 => Marker::SOI,
            0xD9 => Marker::EOI,
            0xDA => Marker::SOS,
            0xDB => Marker::DQT,
            0xDC => Marker::DNL,
            0xDD => Marker::DRI,
            0xDE => Marker::DHP,
            0xDF => Marker::EXP,
            0xE0..=0xEF => Marker::APP(code - 0xE0),
            0xF0..=0xFD => Marker::JPG(code - 0xF0 + 1),
            0xFE => Marker::COM,
        };

        Some(marker)
    }

    pub(crate) fn code(&self) -> u8 {
        match *self {
            Marker::SOF(n) => 0xC0 + n,
            Marker::DHT => 0xC4,
            Marker::DAC => 0xCC,
            Marker::RST(n) => 0xD0 + n,
            Marker::SOI => 0xD8,
            Marker::EOI => 0xD9,
            Marker::SOS => 0xDA,
            Marker::DQT => 0xDB,
            Marker::DNL => 0xDC,
            Marker::DRI => 0xDD,
            Marker::DHP => 0xDE,
            Marker::EXP => 0xDF,
            Marker::APP(n) => 0xE0 + n,
            Marker::JPG(0) => 0xC8,
            Marker::JPG(n) => 0xF0 + n - 1,
            Marker::COM => 0xFE,
            Marker::TEM => 0x01,
            Marker::RES(code) => code,
        }
    }

    pub(crate) fn is_restart(code: u8) -> bool {
        (0xD0..=0xD7).contains(&code)
    }

    /// Whether a length-prefixed segment follows the marker.
    pub(crate) fn is_segment(&self) -> MarkerType {
        match self {
            Marker::SOI | Marker::EOI | Marker::RST(_) | Marker::TEM => MarkerType::StandAlone,
            _ => MarkerType::Segment,
        }
    }

    pub(crate) fn to_u16(&self) -> u16 {
        0xFF00 | self.code() as u16
    }
}
