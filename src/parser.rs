use crate::coding::CodingProcess;
use crate::error::{malformed, unsupported};
use crate::frame_header::{Component, FrameHeader};
use crate::huffman_tree::{HuffmanClass, HuffmanTable};
use crate::quantization_table::QuantizationTable;
use crate::sample_precision::SamplePrecision;
use crate::scan_header::{ScanComponentSelector, ScanHeader};
use anyhow::Result;

pub const QUANTIZATION_TABLE_BYTES: usize = 64;

/// A DHT entry: class, destination slot and the table itself.
pub(crate) type HuffmanDefinition = (HuffmanClass, u8, HuffmanTable);

/// Reads the payload of a single marker segment. Every read is bounds checked, and running
/// off the end of the payload is a malformed header rather than a truncated stream, since the
/// segment length already said how much there is.
pub(crate) struct Parser<'a> {
    segment: &'a [u8],
    cursor: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(segment: &'a [u8]) -> Self {
        Parser { segment, cursor: 0 }
    }

    fn remaining(&self) -> usize {
        self.segment.len() - self.cursor
    }

    fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self
            .segment
            .get(self.cursor..self.cursor + count)
            .ok_or_else(|| {
                malformed(format!(
                    "segment of {} bytes is too short, needed {count} more at {}",
                    self.segment.len(),
                    self.cursor
                ))
            })?;
        self.cursor += count;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn finish(&self, segment: &str) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(malformed(format!("{segment} segment has {extra} trailing bytes"))),
        }
    }

    /// A DHT segment may define several tables back to back.
    pub(crate) fn parse_huffman_tables(&mut self) -> Result<Vec<HuffmanDefinition>> {
        let mut tables = vec![];

        while self.remaining() > 0 {
            let information = self.read_u8()?;
            let class = HuffmanClass::from(information >> 4)?;
            let slot = information & 0b1111;
            if slot > 3 {
                return Err(malformed(format!("huffman table destination {slot}")));
            }

            let mut code_lengths = [0u8; 16];
            code_lengths.copy_from_slice(self.read_bytes(16)?);
            let total = code_lengths.iter().map(|&c| c as usize).sum();
            let symbols = self.read_bytes(total)?;

            tables.push((class, slot, HuffmanTable::new(class, code_lengths, symbols)?));
        }

        if tables.is_empty() {
            return Err(malformed("empty DHT segment"));
        }

        Ok(tables)
    }

    /// A DQT segment may define several tables back to back.
    pub(crate) fn parse_quant_tables(&mut self) -> Result<Vec<(u8, QuantizationTable)>> {
        let mut tables = vec![];

        while self.remaining() > 0 {
            let information = self.read_u8()?;
            let precision = SamplePrecision::decode(information >> 4)?;
            let slot = information & 0b1111;
            if slot > 3 {
                return Err(malformed(format!("quantization table destination {slot}")));
            }

            let values: Vec<u16> = match precision {
                SamplePrecision::EightBit => self
                    .read_bytes(QUANTIZATION_TABLE_BYTES)?
                    .iter()
                    .map(|&v| v as u16)
                    .collect(),
                SamplePrecision::SixteenBit => self
                    .read_bytes(QUANTIZATION_TABLE_BYTES * 2)?
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect(),
            };

            tables.push((slot, QuantizationTable::from_dqt(precision, &values, true)?));
        }

        if tables.is_empty() {
            return Err(malformed("empty DQT segment"));
        }

        Ok(tables)
    }

    pub(crate) fn parse_start_of_frame(&mut self, process: CodingProcess) -> Result<FrameHeader> {
        let precision = SamplePrecision::parse(self.read_u8()?)?;
        let image_height = self.read_u16()? as usize;
        let image_width = self.read_u16()? as usize;
        let num_components = self.read_u8()?;

        if image_width == 0 {
            return Err(malformed("frame width is zero"));
        }
        match num_components {
            1 | 3 => {}
            0 => return Err(malformed("frame without components")),
            n => return Err(unsupported(format!("{n}-component frames"))),
        }
        if self.remaining() != 3 * num_components as usize {
            return Err(malformed(format!(
                "frame header for {num_components} components has {} bytes of component data",
                self.remaining()
            )));
        }

        let mut frame = FrameHeader::new(process, precision, image_width, image_height);
        for _ in 0..num_components {
            let component_id = self.read_u8()?;
            let sampling = self.read_u8()?;
            let qt_table_id = self.read_u8()?;

            frame.add_component(Component::from(
                component_id,
                sampling >> 4,
                sampling & 0b1111,
                qt_table_id,
            ))?;
        }
        frame.validate_sampling()?;

        Ok(frame)
    }

    pub(crate) fn parse_start_of_scan(&mut self, frame: &FrameHeader) -> Result<ScanHeader> {
        let num_components = self.read_u8()? as usize;
        if num_components == 0 || num_components > 4 {
            return Err(malformed(format!("scan with {num_components} components")));
        }
        if self.remaining() != 2 * num_components + 3 {
            return Err(malformed(format!(
                "scan header for {num_components} components has {} bytes",
                self.remaining() + 1
            )));
        }

        let mut scan_component_selectors: Vec<ScanComponentSelector> =
            Vec::with_capacity(num_components);
        for _ in 0..num_components {
            let component_id = self.read_u8()?;
            let tables = self.read_u8()?;

            let component_index = frame.component_index(component_id).ok_or_else(|| {
                malformed(format!("scan references unknown component {component_id}"))
            })?;
            if scan_component_selectors
                .iter()
                .any(|s| s.component_id == component_id)
            {
                return Err(malformed(format!(
                    "component {component_id} appears twice in one scan"
                )));
            }

            let (dc, ac) = (tables >> 4, tables & 0b1111);
            if dc > 3 || ac > 3 {
                return Err(malformed(format!(
                    "component {component_id} selects huffman tables {dc}/{ac}"
                )));
            }

            scan_component_selectors.push(ScanComponentSelector::from(
                component_id,
                component_index,
                dc,
                ac,
            ));
        }

        if num_components > 1 {
            let blocks: usize = scan_component_selectors
                .iter()
                .map(|s| frame.components[s.component_index].blocks_per_mcu())
                .sum();
            if blocks > 10 {
                return Err(malformed(format!("interleaved MCU of {blocks} blocks")));
            }
        }

        let spectral_start = self.read_u8()?;
        let spectral_end = self.read_u8()?;
        let approximation = self.read_u8()?;
        self.finish("SOS")?;

        Ok(ScanHeader {
            scan_component_selectors,
            spectral_start,
            spectral_end,
            successive_approx_high: approximation >> 4,
            successive_approx_low: approximation & 0b1111,
        })
    }

    /// Ri: MCUs (or blocks, in a non-interleaved scan) per restart interval, 0 to disable.
    pub(crate) fn parse_restart_interval(&mut self) -> Result<u16> {
        let interval = self.read_u16()?;
        self.finish("DRI")?;
        Ok(interval)
    }

    pub(crate) fn parse_number_of_lines(&mut self) -> Result<u16> {
        let lines = self.read_u16()?;
        self.finish("DNL")?;
        if lines == 0 {
            return Err(malformed("DNL defines zero lines"));
        }
        Ok(lines)
    }
}
