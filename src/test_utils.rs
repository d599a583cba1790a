//! Fixtures for building JPEG streams inside unit tests.

use crate::huffman_tree::{HuffmanClass, HuffmanTable};
use crate::image::Block;
use crate::quantization_table::ZIGZAG;
use anyhow::Result;

/// Small deterministic generator so tests do not need a rand dependency.
pub(crate) struct XorShift(u32);

impl XorShift {
    pub(crate) fn new(seed: u32) -> Self {
        XorShift(seed.max(1))
    }

    pub(crate) fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    /// Uniform-ish value in `lo..=hi`.
    pub(crate) fn range(&mut self, lo: i32, hi: i32) -> i32 {
        let span = (hi - lo + 1) as u32;
        lo + (self.next_u32() % span) as i32
    }
}

/// Every run/size symbol with sizes up to 10, plus ZRL and all EOBn, at one length.
pub(crate) fn universal_ac_table() -> Result<HuffmanTable> {
    let mut symbols = Vec::new();
    for r in 0..16u8 {
        for s in 0..=10u8 {
            symbols.push(r << 4 | s);
        }
    }

    let mut code_lengths = [0u8; 16];
    code_lengths[7] = symbols.len() as u8;
    HuffmanTable::new(HuffmanClass::AC, code_lengths, &symbols)
}

/// DC categories 0 through 11 as 4-bit codes.
pub(crate) fn universal_dc_table() -> Result<HuffmanTable> {
    let symbols: Vec<u8> = (0..=11).collect();
    let mut code_lengths = [0u8; 16];
    code_lengths[3] = symbols.len() as u8;
    HuffmanTable::new(HuffmanClass::DC, code_lengths, &symbols)
}

/// MSB-first bit packer with `FF 00` stuffing.
#[derive(Default)]
pub(crate) struct BitWriter {
    bytes: Vec<u8>,
    accumulator: u32,
    bits: u8,
}

impl BitWriter {
    pub(crate) fn write(&mut self, value: u32, count: u8) {
        for i in (0..count).rev() {
            self.accumulator = (self.accumulator << 1) | ((value >> i) & 1);
            self.bits += 1;

            if self.bits == 8 {
                let byte = self.accumulator as u8;
                self.bytes.push(byte);
                if byte == 0xFF {
                    self.bytes.push(0x00);
                }
                self.accumulator = 0;
                self.bits = 0;
            }
        }
    }

    /// Pads the last byte with one bits.
    pub(crate) fn flush(&mut self) {
        while self.bits != 0 {
            self.write(1, 1);
        }
    }

    pub(crate) fn into_bytes(mut self) -> Vec<u8> {
        self.flush();
        self.bytes
    }
}

pub(crate) struct HuffmanEncoder {
    codes: Vec<Option<(u16, u8)>>,
}

impl HuffmanEncoder {
    pub(crate) fn new(table: &HuffmanTable) -> Self {
        let mut codes = vec![None; 256];
        for (symbol, code, length) in table.codes() {
            codes[symbol as usize] = Some((code, length));
        }
        HuffmanEncoder { codes }
    }

    pub(crate) fn encode(&self, writer: &mut BitWriter, symbol: u8) {
        match self.codes[symbol as usize] {
            Some((code, length)) => writer.write(code as u32, length),
            None => panic!("symbol {symbol:#04x} has no code"),
        }
    }
}

fn bit_length(value: u32) -> u8 {
    (32 - value.leading_zeros()) as u8
}

/// Magnitude category and the raw bits that follow it.
pub(crate) fn magnitude(value: i32) -> (u8, u32) {
    let size = bit_length(value.unsigned_abs());
    let bits = if value < 0 { value - 1 } else { value };
    (size, bits as u32 & ((1u32 << size) - 1))
}

/// Writes entropy-coded data the way libjpeg's sequential and progressive Huffman encoders do,
/// including EOB runs and buffered refinement bits.
#[derive(Default)]
pub(crate) struct ScanEncoder {
    pub(crate) writer: BitWriter,
    eob_run: u32,
    /// Correction bits owed by the blocks inside the current EOB run.
    run_corrections: Vec<bool>,
}

impl ScanEncoder {
    pub(crate) fn baseline_block(
        &mut self,
        dc: &HuffmanEncoder,
        ac: &HuffmanEncoder,
        predictor: &mut i32,
        block: &Block,
    ) {
        let diff = block.0[0] - *predictor;
        *predictor = block.0[0];
        let (size, bits) = magnitude(diff);
        dc.encode(&mut self.writer, size);
        self.writer.write(bits, size);

        let mut run = 0;
        for k in 1..64 {
            let value = block.0[ZIGZAG[k]];
            if value == 0 {
                run += 1;
                continue;
            }
            while run > 15 {
                ac.encode(&mut self.writer, 0xF0);
                run -= 16;
            }
            let (size, bits) = magnitude(value);
            ac.encode(&mut self.writer, run << 4 | size);
            self.writer.write(bits, size);
            run = 0;
        }
        if run > 0 {
            ac.encode(&mut self.writer, 0x00);
        }
    }

    pub(crate) fn dc_first(&mut self, dc: &HuffmanEncoder, predictor: &mut i32, value: i32, al: u8) {
        let value = value >> al;
        let (size, bits) = magnitude(value - *predictor);
        *predictor = value;
        dc.encode(&mut self.writer, size);
        self.writer.write(bits, size);
    }

    pub(crate) fn dc_refine(&mut self, value: i32, al: u8) {
        self.writer.write(((value >> al) & 1) as u32, 1);
    }

    fn emit_eob_run(&mut self, ac: &HuffmanEncoder) {
        if self.eob_run == 0 {
            return;
        }

        let size = bit_length(self.eob_run) - 1;
        ac.encode(&mut self.writer, size << 4);
        self.writer.write(self.eob_run, size);
        self.eob_run = 0;

        for bit in std::mem::take(&mut self.run_corrections) {
            self.writer.write(bit as u32, 1);
        }
    }

    pub(crate) fn ac_first(&mut self, ac: &HuffmanEncoder, block: &Block, ss: u8, se: u8, al: u8) {
        let mut run = 0u8;
        for k in ss as usize..=se as usize {
            let value = block.0[ZIGZAG[k]];
            let magnitude_bits = value.unsigned_abs() >> al;
            if magnitude_bits == 0 {
                run += 1;
                continue;
            }

            self.emit_eob_run(ac);
            while run > 15 {
                ac.encode(&mut self.writer, 0xF0);
                run -= 16;
            }

            let shifted = if value < 0 {
                -(magnitude_bits as i32)
            } else {
                magnitude_bits as i32
            };
            let (size, bits) = magnitude(shifted);
            ac.encode(&mut self.writer, run << 4 | size);
            self.writer.write(bits, size);
            run = 0;
        }

        if run > 0 {
            self.eob_run += 1;
            if self.eob_run == 0x7FFF {
                self.emit_eob_run(ac);
            }
        }
    }

    pub(crate) fn ac_refine(&mut self, ac: &HuffmanEncoder, block: &Block, ss: u8, se: u8, al: u8) {
        let (ss, se) = (ss as usize, se as usize);
        let absolute: Vec<u32> = (0..=se)
            .map(|k| block.0[ZIGZAG[k]].unsigned_abs() >> al)
            .collect();
        let last_new = (ss..=se).rev().find(|&k| absolute[k] == 1).unwrap_or(0);

        let mut run = 0u8;
        let mut corrections: Vec<bool> = Vec::new();

        for k in ss..=se {
            let value = absolute[k];
            if value == 0 {
                run += 1;
                continue;
            }

            while run > 15 && k <= last_new {
                self.emit_eob_run(ac);
                ac.encode(&mut self.writer, 0xF0);
                run -= 16;
                for bit in corrections.drain(..) {
                    self.writer.write(bit as u32, 1);
                }
            }

            if value > 1 {
                corrections.push(value & 1 == 1);
                continue;
            }

            self.emit_eob_run(ac);
            ac.encode(&mut self.writer, run << 4 | 1);
            self.writer.write((block.0[ZIGZAG[k]] > 0) as u32, 1);
            for bit in corrections.drain(..) {
                self.writer.write(bit as u32, 1);
            }
            run = 0;
        }

        if run > 0 || !corrections.is_empty() {
            self.eob_run += 1;
            self.run_corrections.append(&mut corrections);
            if self.eob_run == 0x7FFF || self.run_corrections.len() > 937 {
                self.emit_eob_run(ac);
            }
        }
    }

    /// Closes the current restart interval or scan: pending EOB run, then one-bit padding.
    pub(crate) fn finish(&mut self, ac: Option<&HuffmanEncoder>) {
        if let Some(ac) = ac {
            self.emit_eob_run(ac);
        }
        self.writer.flush();
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.writer.into_bytes()
    }
}

/// Assembles marker segments into a complete stream.
#[derive(Default)]
pub(crate) struct JpegBuilder {
    bytes: Vec<u8>,
}

impl JpegBuilder {
    pub(crate) fn new() -> Self {
        JpegBuilder::default()
    }

    pub(crate) fn soi(mut self) -> Self {
        self.bytes.extend_from_slice(&[0xFF, 0xD8]);
        self
    }

    pub(crate) fn segment(mut self, marker: u8, payload: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[0xFF, marker]);
        self.bytes
            .extend_from_slice(&(payload.len() as u16 + 2).to_be_bytes());
        self.bytes.extend_from_slice(payload);
        self
    }

    pub(crate) fn app0_jfif(self, unit: u8, x: u16, y: u16) -> Self {
        let mut payload = b"JFIF\0".to_vec();
        payload.extend_from_slice(&[1, 1, unit]);
        payload.extend_from_slice(&x.to_be_bytes());
        payload.extend_from_slice(&y.to_be_bytes());
        payload.extend_from_slice(&[0, 0]);
        self.segment(0xE0, &payload)
    }

    /// An 8-bit DQT segment for a table given in natural order.
    pub(crate) fn dqt(self, slot: u8, values: &[u16; 64]) -> Self {
        let mut payload = vec![slot];
        payload.extend(ZIGZAG.iter().map(|&natural| values[natural] as u8));
        self.segment(0xDB, &payload)
    }

    /// `components` holds `(id, h, v, tq)`.
    pub(crate) fn sof(self, n: u8, width: u16, height: u16, components: &[(u8, u8, u8, u8)]) -> Self {
        let mut payload = vec![8];
        payload.extend_from_slice(&height.to_be_bytes());
        payload.extend_from_slice(&width.to_be_bytes());
        payload.push(components.len() as u8);
        for &(id, h, v, tq) in components {
            payload.extend_from_slice(&[id, h << 4 | v, tq]);
        }
        self.segment(0xC0 + n, &payload)
    }

    pub(crate) fn dht(self, slot: u8, table: &HuffmanTable) -> Self {
        let mut payload = vec![(table.class() as u8) << 4 | slot];
        payload.extend_from_slice(table.code_lengths());
        payload.extend_from_slice(table.symbols());
        self.segment(0xC4, &payload)
    }

    pub(crate) fn dri(self, interval: u16) -> Self {
        self.segment(0xDD, &interval.to_be_bytes())
    }

    /// `components` holds `(id, dc slot, ac slot)`.
    pub(crate) fn sos(self, components: &[(u8, u8, u8)], ss: u8, se: u8, ah: u8, al: u8) -> Self {
        let mut payload = vec![components.len() as u8];
        for &(id, dc, ac) in components {
            payload.extend_from_slice(&[id, dc << 4 | ac]);
        }
        payload.extend_from_slice(&[ss, se, ah << 4 | al]);
        self.segment(0xDA, &payload)
    }

    pub(crate) fn entropy(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(data);
        self
    }

    pub(crate) fn marker(mut self, code: u8) -> Self {
        self.bytes.extend_from_slice(&[0xFF, code]);
        self
    }

    pub(crate) fn rst(self, n: u8) -> Self {
        self.marker(0xD0 + n % 8)
    }

    pub(crate) fn eoi(self) -> Self {
        self.marker(0xD9)
    }

    pub(crate) fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// A block with a random DC term and a sprinkling of AC terms, everything within `limit`.
pub(crate) fn random_block(rng: &mut XorShift, density: u32, limit: i32) -> Block {
    let mut block = Block::default();
    block.0[0] = rng.range(-limit, limit);
    for k in 1..64 {
        if rng.next_u32() % 100 < density {
            block.0[ZIGZAG[k]] = rng.range(-limit, limit);
        }
    }
    block
}
