use crate::bitreader::BitReader;
use crate::error::{corrupt, malformed};
use anyhow::Result;

#[derive(Debug, PartialEq, Copy, Clone, Hash, Eq)]
pub enum HuffmanClass {
    AC = 1,
    DC = 0,
}

impl HuffmanClass {
    pub(crate) fn from(ht_class: u8) -> Result<Self> {
        match ht_class {
            0 => Ok(HuffmanClass::DC),
            1 => Ok(HuffmanClass::AC),
            _ => Err(malformed(format!("huffman table class {ht_class} is neither DC nor AC"))),
        }
    }
}

// Typical tables from ITU T.81 Annex K.3, as (codes per length 1..=16, symbols).
const DC_LUMINANCE_CODE_LENGTHS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
const DC_CHROMINANCE_CODE_LENGTHS: [u8; 16] = [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];
const DC_SYMBOLS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

const AC_LUMINANCE_CODE_LENGTHS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7D];
const AC_LUMINANCE_SYMBOLS: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52, 0xD1, 0xF0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2A, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7,
    0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5,
    0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2,
    0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA,
];

const AC_CHROMINANCE_CODE_LENGTHS: [u8; 16] = [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77];
const AC_CHROMINANCE_SYMBOLS: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, 0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91, 0xA1, 0xB1, 0xC1, 0x09, 0x23, 0x33, 0x52, 0xF0,
    0x15, 0x62, 0x72, 0xD1, 0x0A, 0x16, 0x24, 0x34, 0xE1, 0x25, 0xF1, 0x17, 0x18, 0x19, 0x1A, 0x26,
    0x27, 0x28, 0x29, 0x2A, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
    0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5,
    0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3,
    0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA,
    0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA,
];

type CodeBounds = ([i32; 16], [i32; 16], [i32; 16]);

/// Assigns canonical codes length by length. Returns `None` when a length has more codes than
/// its code space holds.
fn derive_codes(code_lengths: &[u8; 16]) -> Option<CodeBounds> {
    let mut mincode = [0; 16];
    let mut maxcode = [-1; 16];
    let mut valptr = [0; 16];

    let mut code: i32 = 0;
    let mut k: i32 = 0;
    for (length, &count) in code_lengths.iter().enumerate() {
        if count > 0 {
            valptr[length] = k;
            mincode[length] = code;
            code += count as i32;
            k += count as i32;

            if code > 1 << (length + 1) {
                return None;
            }
            maxcode[length] = code - 1;
        }
        code <<= 1;
    }

    Some((mincode, maxcode, valptr))
}

/// A canonical Huffman table, built the way ITU T.81 Annex C and F.2.2.3 describe: code lengths
/// give each symbol a code in order, and decoding walks lengths 1..=16 comparing the code read so
/// far against the largest code of that length.
#[derive(Debug, Clone, PartialEq)]
pub struct HuffmanTable {
    class: HuffmanClass,
    code_lengths: [u8; 16],
    symbols: Vec<u8>,
    /// Smallest code of each length.
    mincode: [i32; 16],
    /// Largest code of each length, -1 where no code has that length.
    maxcode: [i32; 16],
    /// Index into `symbols` of the first symbol with each length.
    valptr: [i32; 16],
}

impl HuffmanTable {
    pub fn new(class: HuffmanClass, code_lengths: [u8; 16], symbols: &[u8]) -> Result<Self> {
        let total: usize = code_lengths.iter().map(|&count| count as usize).sum();
        if total > 256 {
            return Err(malformed(format!("huffman table declares {total} codes")));
        }
        if symbols.len() != total {
            return Err(malformed(format!(
                "huffman table declares {total} codes but carries {} symbols",
                symbols.len()
            )));
        }

        let (mincode, maxcode, valptr) = derive_codes(&code_lengths).ok_or_else(|| {
            malformed("huffman table assigns more codes to a length than fit")
        })?;

        Ok(HuffmanTable {
            class,
            code_lengths,
            symbols: symbols.to_vec(),
            mincode,
            maxcode,
            valptr,
        })
    }

    /// The Annex K table installed when a scan references a slot nothing defined. Slot 0 gets
    /// the luminance table, any other slot the chrominance one.
    pub fn standard(class: HuffmanClass, slot: u8) -> Self {
        let (code_lengths, symbols): (&[u8; 16], &[u8]) = match (class, slot) {
            (HuffmanClass::DC, 0) => (&DC_LUMINANCE_CODE_LENGTHS, &DC_SYMBOLS),
            (HuffmanClass::DC, _) => (&DC_CHROMINANCE_CODE_LENGTHS, &DC_SYMBOLS),
            (HuffmanClass::AC, 0) => (&AC_LUMINANCE_CODE_LENGTHS, &AC_LUMINANCE_SYMBOLS),
            (HuffmanClass::AC, _) => (&AC_CHROMINANCE_CODE_LENGTHS, &AC_CHROMINANCE_SYMBOLS),
        };

        // Annex K tables always derive.
        let (mincode, maxcode, valptr) =
            derive_codes(code_lengths).unwrap_or(([0; 16], [-1; 16], [0; 16]));

        HuffmanTable {
            class,
            code_lengths: *code_lengths,
            symbols: symbols.to_vec(),
            mincode,
            maxcode,
            valptr,
        }
    }

    pub fn class(&self) -> HuffmanClass {
        self.class
    }

    pub fn code_lengths(&self) -> &[u8; 16] {
        &self.code_lengths
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// Reads one code bit by bit and returns its symbol.
    pub fn decode(&self, reader: &mut BitReader) -> Result<u8> {
        let mut code = reader.read_bits(1)? as i32;

        for length in 0..16 {
            if code <= self.maxcode[length] && code >= self.mincode[length] {
                let index = (self.valptr[length] + code - self.mincode[length]) as usize;
                return self
                    .symbols
                    .get(index)
                    .copied()
                    .ok_or_else(|| corrupt("huffman code indexes past the symbol list"));
            }

            if length < 15 {
                code = (code << 1) | reader.read_bits(1)? as i32;
            }
        }

        Err(corrupt(format!(
            "no {:?} huffman code matches within 16 bits",
            self.class
        )))
    }

    /// Every (symbol, code, length) triple, for encoding test fixtures.
    #[cfg(test)]
    pub(crate) fn codes(&self) -> Vec<(u8, u16, u8)> {
        let mut codes = Vec::with_capacity(self.symbols.len());
        for (length, &count) in self.code_lengths.iter().enumerate() {
            for i in 0..count as i32 {
                let symbol = self.symbols[(self.valptr[length] + i) as usize];
                codes.push((symbol, (self.mincode[length] + i) as u16, length as u8 + 1));
            }
        }
        codes
    }
}
