use crate::error::{corrupt, malformed, truncated};
use crate::marker::Marker;
use anyhow::Result;

/// What the reader last saw while pulling entropy-coded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitStatus {
    Data,
    /// A marker interrupted the entropy-coded data. Further reads yield zero bits until the
    /// marker is taken with [`BitReader::next_marker`].
    MarkerFound(u8),
}

/// Cursor over a fully buffered JPEG stream.
///
/// The same cursor serves marker segments (byte aligned) and entropy-coded data (MSB-first
/// bits with `FF 00` stuffing removed), so header parsing and scan decoding never disagree on
/// where the stream is.
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    bit_buffer: u32,
    bits_in_buffer: u8,
    /// Zero bits fed into the buffer after a marker cut the data short. They sit at the low
    /// end of the buffer.
    padding_bits: u8,
    pending_marker: Option<u8>,
    /// Set once a read was satisfied partly from padding.
    read_into_padding: bool,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            position: 0,
            bit_buffer: 0,
            bits_in_buffer: 0,
            padding_bits: 0,
            pending_marker: None,
            read_into_padding: false,
        }
    }

    /// Byte offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn status(&self) -> BitStatus {
        match self.pending_marker {
            Some(code) => BitStatus::MarkerFound(code),
            None => BitStatus::Data,
        }
    }

    /// Whether any zero padding has been handed out since a marker was found.
    pub(crate) fn read_past_marker(&self) -> bool {
        self.read_into_padding
    }

    fn push_byte(&mut self, byte: u8) {
        self.bit_buffer = (self.bit_buffer << 8) | byte as u32;
        self.bits_in_buffer += 8;
    }

    fn fill_byte(&mut self) -> Result<()> {
        if self.pending_marker.is_some() {
            self.push_byte(0);
            self.padding_bits += 8;
            return Ok(());
        }

        let byte = *self
            .data
            .get(self.position)
            .ok_or_else(|| truncated("entropy-coded data ran past the end of the stream"))?;
        self.position += 1;

        if byte != 0xFF {
            self.push_byte(byte);
            return Ok(());
        }

        loop {
            let next = *self
                .data
                .get(self.position)
                .ok_or_else(|| truncated("stream ends inside a marker"))?;
            self.position += 1;

            match next {
                0x00 => {
                    self.push_byte(0xFF);
                    return Ok(());
                }
                0xFF => continue,
                code => {
                    self.pending_marker = Some(code);
                    self.push_byte(0);
                    self.padding_bits += 8;
                    return Ok(());
                }
            }
        }
    }

    /// Reads `count` bits (at most 16), most significant bit first.
    pub fn read_bits(&mut self, count: u8) -> Result<u16> {
        debug_assert!(count <= 16);
        if count == 0 {
            return Ok(0);
        }

        while self.bits_in_buffer < count {
            self.fill_byte()?;
        }

        let real = self.real_bits_remaining();
        if count > real {
            self.padding_bits -= count - real;
            self.read_into_padding = true;
        }

        self.bits_in_buffer -= count;
        let value = (self.bit_buffer >> self.bits_in_buffer) & ((1u32 << count) - 1);

        Ok(value as u16)
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Buffered bits that came from the stream rather than from post-marker padding.
    pub(crate) fn real_bits_remaining(&self) -> u8 {
        self.bits_in_buffer - self.padding_bits
    }

    /// Drops whatever is left of the current byte.
    pub fn byte_align(&mut self) {
        self.bit_buffer = 0;
        self.bits_in_buffer = 0;
        self.padding_bits = 0;
    }

    /// Looks for a marker directly after the buffered bits without consuming anything.
    ///
    /// Returns the marker code only when the buffered bits could not hold another coded unit:
    /// fewer than eight of them, all ones, which is how encoders pad before a marker.
    pub(crate) fn marker_after_padding(&self) -> Option<u8> {
        let real = self.real_bits_remaining();
        if real >= 8 {
            return None;
        }

        if real > 0 {
            let mask = (1u32 << real) - 1;
            let bits = (self.bit_buffer >> self.padding_bits) & mask;
            if bits != mask {
                return None;
            }
        }

        self.peek_marker()
    }

    fn peek_marker(&self) -> Option<u8> {
        if let Some(code) = self.pending_marker {
            return Some(code);
        }

        let mut position = self.position;
        while position + 1 < self.data.len() && self.data[position] == 0xFF {
            match self.data[position + 1] {
                0xFF => position += 1,
                0x00 => return None,
                code => return Some(code),
            }
        }

        None
    }

    /// Called where a restart interval ends. Consumes an `RSTn` marker and returns `n`, or
    /// returns `None` and leaves a different marker pending for the caller.
    pub(crate) fn expect_restart(&mut self) -> Result<Option<u8>> {
        self.byte_align();

        let code = match self.peek_marker() {
            Some(code) => code,
            None => {
                return Err(corrupt(format!(
                    "expected a restart marker at offset {}",
                    self.position
                )))
            }
        };

        if self.pending_marker.is_none() {
            // skip the FF fill bytes and the code itself
            while self.data[self.position] == 0xFF {
                self.position += 1;
            }
            self.position += 1;
            self.pending_marker = Some(code);
        }

        if Marker::is_restart(code) {
            self.pending_marker = None;
            self.read_into_padding = false;
            return Ok(Some(code - 0xD0));
        }

        Ok(None)
    }

    /// Takes the next marker, discarding the rest of the current byte and any bytes that are
    /// not a marker. Returns `None` once the data is exhausted.
    pub fn next_marker(&mut self) -> Option<u8> {
        self.byte_align();

        if let Some(code) = self.pending_marker.take() {
            self.read_into_padding = false;
            return Some(code);
        }

        while self.position < self.data.len() {
            if self.data[self.position] != 0xFF {
                self.position += 1;
                continue;
            }

            // fill bytes
            while self.position + 1 < self.data.len() && self.data[self.position + 1] == 0xFF {
                self.position += 1;
            }

            let code = *self.data.get(self.position + 1)?;
            self.position += 2;
            if code != 0x00 {
                return Some(code);
            }
        }

        None
    }

    fn read_u16(&mut self) -> Result<u16> {
        match self.data.get(self.position..self.position + 2) {
            Some(&[hi, lo]) => {
                self.position += 2;
                Ok(u16::from_be_bytes([hi, lo]))
            }
            _ => Err(truncated("stream ends inside a segment length")),
        }
    }

    /// Reads a length-prefixed marker segment and returns its payload.
    pub fn read_segment(&mut self) -> Result<&'a [u8]> {
        self.byte_align();

        let length = self.read_u16()? as usize;
        if length < 2 {
            return Err(malformed(format!("segment length {length} is shorter than its own field")));
        }

        let end = self.position + length - 2;
        let payload = self
            .data
            .get(self.position..end)
            .ok_or_else(|| truncated(format!("segment of {length} bytes runs past the end of the stream")))?;
        self.position = end;

        Ok(payload)
    }
}
