use crate::bitreader::BitReader;
use crate::error::{corrupt, malformed};
use crate::frame_header::FrameHeader;
use crate::huffman_tree::HuffmanTable;
use crate::image::{Block, BlockGrid};
use crate::marker::Marker;
use crate::quantization_table::ZIGZAG;
use crate::scan_header::{ScanHeader, ScanMode};
use anyhow::Result;
use log::{debug, trace, warn};

/// EXTEND from ITU T.81 F.2.2.1: maps the `t` raw bits following a magnitude category to a
/// signed value.
pub(crate) fn extend(value: u16, t: u8) -> i32 {
    if t == 0 {
        return 0;
    }

    let value = value as i32;
    if value < 1 << (t - 1) {
        value - (1 << t) + 1
    } else {
        value
    }
}

fn receive_extend(reader: &mut BitReader, t: u8) -> Result<i32> {
    Ok(extend(reader.read_bits(t)?, t))
}

fn decode_dc_difference(reader: &mut BitReader, table: &HuffmanTable) -> Result<i32> {
    let t = table.decode(reader)?;
    if t > 11 {
        return Err(corrupt(format!("DC magnitude category {t}")));
    }
    receive_extend(reader, t)
}

/// Huffman tables one scan component decodes with.
#[derive(Debug, Clone, Copy)]
struct ComponentTables<'a> {
    dc: Option<&'a HuffmanTable>,
    ac: Option<&'a HuffmanTable>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScanOutcome {
    /// Units (MCUs, or blocks of a non-interleaved scan) read from the stream.
    pub(crate) units: usize,
    /// Units filled by copying because a restart interval ended early.
    pub(crate) padded_units: usize,
    /// A marker other than RSTn cut the scan short.
    pub(crate) ended_early: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitLayout {
    /// MCUs in raster order over the frame's MCU grid, each holding Hi x Vi blocks of every scan
    /// component.
    Interleaved { mcus_per_line: usize, mcu_rows: usize },
    /// Single blocks in raster order over the blocks covering the component's samples.
    NonInterleaved { block_cols: usize, block_rows: usize },
}

impl UnitLayout {
    fn total(&self) -> usize {
        match *self {
            UnitLayout::Interleaved {
                mcus_per_line,
                mcu_rows,
            } => mcus_per_line * mcu_rows,
            UnitLayout::NonInterleaved {
                block_cols,
                block_rows,
            } => block_cols * block_rows,
        }
    }
}

/// Decodes the entropy-coded segment of one scan into the coefficient grids.
///
/// DC predictors and the end-of-band run live here, so they start fresh with every scan and
/// reset at every restart marker.
pub(crate) struct ScanDecoder<'a> {
    frame: &'a FrameHeader,
    scan: &'a ScanHeader,
    mode: ScanMode,
    tables: Vec<ComponentTables<'a>>,
    restart_interval: usize,
    predictors: Vec<i32>,
    eob_run: u32,
    layout: UnitLayout,
}

impl<'a> ScanDecoder<'a> {
    pub(crate) fn new(
        frame: &'a FrameHeader,
        scan: &'a ScanHeader,
        mode: ScanMode,
        dc_tables: &'a [Option<HuffmanTable>; 4],
        ac_tables: &'a [Option<HuffmanTable>; 4],
        restart_interval: u16,
    ) -> Result<Self> {
        let lookup = |tables: &'a [Option<HuffmanTable>; 4], slot: u8, what: &str| {
            tables[slot as usize]
                .as_ref()
                .ok_or_else(|| malformed(format!("scan uses undefined {what} table {slot}")))
        };

        let tables = scan
            .scan_component_selectors
            .iter()
            .map(|selector| {
                Ok(ComponentTables {
                    dc: match mode.uses_dc_table() {
                        true => Some(lookup(dc_tables, selector.dc_destination_id, "DC")?),
                        false => None,
                    },
                    ac: match mode.uses_ac_table() {
                        true => Some(lookup(ac_tables, selector.ac_destination_id, "AC")?),
                        false => None,
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let layout = match scan.is_interleaved() {
            true => UnitLayout::Interleaved {
                mcus_per_line: frame.mcus_per_line,
                mcu_rows: frame.mcu_rows,
            },
            false => {
                let component = &frame.components[scan.scan_component_selectors[0].component_index];
                UnitLayout::NonInterleaved {
                    block_cols: component.block_cols,
                    block_rows: component.block_rows,
                }
            }
        };

        Ok(ScanDecoder {
            frame,
            scan,
            mode,
            tables,
            restart_interval: restart_interval as usize,
            predictors: vec![0; scan.scan_component_selectors.len()],
            eob_run: 0,
            layout,
        })
    }

    fn reset(&mut self) {
        self.predictors.iter_mut().for_each(|p| *p = 0);
        self.eob_run = 0;
    }

    /// (scan component, block index in its grid) for every block of `unit`, in coding order.
    fn unit_blocks(&self, unit: usize, out: &mut Vec<(usize, usize)>) {
        out.clear();

        match self.layout {
            UnitLayout::Interleaved { mcus_per_line, .. } => {
                let (mcu_x, mcu_y) = (unit % mcus_per_line, unit / mcus_per_line);

                for (i, selector) in self.scan.scan_component_selectors.iter().enumerate() {
                    let component = &self.frame.components[selector.component_index];
                    let h = component.horizontal_sampling_factor as usize;
                    let v = component.vertical_sampling_factor as usize;

                    for y in 0..v {
                        for x in 0..h {
                            let (col, row) = (mcu_x * h + x, mcu_y * v + y);
                            out.push((i, row * component.grid_cols + col));
                        }
                    }
                }
            }
            UnitLayout::NonInterleaved { block_cols, .. } => {
                let selector = &self.scan.scan_component_selectors[0];
                let component = &self.frame.components[selector.component_index];
                let (col, row) = (unit % block_cols, unit / block_cols);
                out.push((0, row * component.grid_cols + col));
            }
        }
    }

    /// Whether the next unit needs at least one bit from the stream. Blocks inside an EOB run
    /// and DC refinement bits can legitimately be coded in nothing but padding-like bits.
    fn needs_coded_bits(&self) -> bool {
        self.mode != ScanMode::DcRefine && self.eob_run == 0
    }

    pub(crate) fn decode(&mut self, reader: &mut BitReader, grids: &mut [BlockGrid]) -> Result<ScanOutcome> {
        let total = self.layout.total();
        let mut outcome = ScanOutcome::default();
        let mut blocks = Vec::with_capacity(10);
        let mut last_unit: Option<usize> = None;
        let mut expected_restart = 0u8;

        debug!(
            "{:?} scan of {} component(s), {} units, Ss={} Se={} Ah={} Al={}",
            self.mode,
            self.scan.scan_component_selectors.len(),
            total,
            self.scan.spectral_start,
            self.scan.spectral_end,
            self.scan.successive_approx_high,
            self.scan.successive_approx_low
        );

        let mut unit = 0;
        while unit < total {
            if self.restart_interval > 0 && unit > 0 && unit % self.restart_interval == 0 {
                match reader.expect_restart()? {
                    Some(n) => {
                        if n != expected_restart {
                            warn!("expected RST{expected_restart}, found RST{n}");
                        }
                        debug!("RST{n} before unit {unit}");
                        expected_restart = (n + 1) % 8;
                        self.reset();
                    }
                    None => {
                        warn!("scan ended by a marker after {unit} of {total} units");
                        outcome.ended_early = true;
                        break;
                    }
                }
            }

            if self.needs_coded_bits() {
                if let Some(code) = reader.marker_after_padding() {
                    if Marker::is_restart(code) && self.restart_interval > 0 {
                        let boundary = (unit / self.restart_interval + 1) * self.restart_interval;
                        let end = boundary.min(total);
                        warn!(
                            "restart interval ends {} unit(s) early at unit {unit}, repeating the last decoded unit",
                            end - unit
                        );
                        for padded in unit..end {
                            self.replicate_unit(last_unit, padded, grids);
                        }
                        outcome.padded_units += end - unit;
                        unit = end;
                        continue;
                    }

                    warn!("marker {code:#04x} ended the scan after {unit} of {total} units");
                    outcome.ended_early = true;
                    break;
                }
            }

            self.unit_blocks(unit, &mut blocks);
            for &(i, index) in blocks.iter() {
                let component_index = self.scan.scan_component_selectors[i].component_index;
                let block = &mut grids[component_index].blocks[index];

                if let Err(err) = self.decode_block(reader, i, block) {
                    if reader.read_past_marker() {
                        warn!("scan cut short inside unit {unit}: {err}");
                        outcome.ended_early = true;
                        return Ok(outcome);
                    }
                    return Err(err);
                }
            }

            last_unit = Some(unit);
            outcome.units += 1;
            unit += 1;
        }

        Ok(outcome)
    }

    fn replicate_unit(&self, source: Option<usize>, target: usize, grids: &mut [BlockGrid]) {
        let Some(source) = source else {
            return;
        };

        let (mut from, mut to) = (Vec::new(), Vec::new());
        self.unit_blocks(source, &mut from);
        self.unit_blocks(target, &mut to);

        for (&(i, src), &(_, dst)) in from.iter().zip(to.iter()) {
            let grid = &mut grids[self.scan.scan_component_selectors[i].component_index];
            grid.blocks[dst] = grid.blocks[src];
        }
    }

    fn dc_table(&self, component: usize) -> Result<&'a HuffmanTable> {
        self.tables[component]
            .dc
            .ok_or_else(|| malformed("scan component has no DC table"))
    }

    fn ac_table(&self, component: usize) -> Result<&'a HuffmanTable> {
        self.tables[component]
            .ac
            .ok_or_else(|| malformed("scan component has no AC table"))
    }

    fn decode_block(&mut self, reader: &mut BitReader, component: usize, block: &mut Block) -> Result<()> {
        match self.mode {
            ScanMode::Baseline => self.decode_baseline(reader, component, block),
            ScanMode::DcFirst => self.decode_dc_first(reader, component, block),
            ScanMode::DcRefine => self.decode_dc_refine(reader, block),
            ScanMode::AcFirst => self.decode_ac_first(reader, component, block),
            ScanMode::AcRefine => self.decode_ac_refine(reader, component, block),
        }
    }

    fn decode_baseline(&mut self, reader: &mut BitReader, component: usize, block: &mut Block) -> Result<()> {
        let (dc, ac) = (self.dc_table(component)?, self.ac_table(component)?);

        *block = Block::default();
        let diff = decode_dc_difference(reader, dc)?;
        self.predictors[component] = self.predictors[component].wrapping_add(diff);
        block.0[0] = self.predictors[component];

        let mut k = 1;
        while k < 64 {
            let rs = ac.decode(reader)?;
            let (r, s) = (rs >> 4, rs & 0x0F);

            if s == 0 {
                if r == 15 {
                    k += 16;
                    continue;
                }
                break;
            }

            k += r as usize;
            if k > 63 {
                return Err(corrupt(format!("AC run lands on coefficient {k}")));
            }
            block.0[ZIGZAG[k]] = receive_extend(reader, s)?;
            k += 1;
        }

        Ok(())
    }

    fn decode_dc_first(&mut self, reader: &mut BitReader, component: usize, block: &mut Block) -> Result<()> {
        let dc = self.dc_table(component)?;
        let diff = decode_dc_difference(reader, dc)?;

        self.predictors[component] = self.predictors[component].wrapping_add(diff);
        block.0[0] = self.predictors[component] << self.scan.successive_approx_low;

        Ok(())
    }

    fn decode_dc_refine(&mut self, reader: &mut BitReader, block: &mut Block) -> Result<()> {
        if reader.read_bit()? {
            block.0[0] |= 1 << self.scan.successive_approx_low;
        }

        Ok(())
    }

    /// Reads the run length that follows an EOBn symbol. The current block counts as the first
    /// block of the run.
    fn read_eob_run(reader: &mut BitReader, r: u8) -> Result<u32> {
        let mut run = 1u32 << r;
        if r > 0 {
            run += reader.read_bits(r)? as u32;
        }
        trace!("EOB run of {run} blocks");
        Ok(run)
    }

    fn decode_ac_first(&mut self, reader: &mut BitReader, component: usize, block: &mut Block) -> Result<()> {
        if self.eob_run > 0 {
            self.eob_run -= 1;
            return Ok(());
        }

        let ac = self.ac_table(component)?;
        let (ss, se) = (
            self.scan.spectral_start as usize,
            self.scan.spectral_end as usize,
        );
        let al = self.scan.successive_approx_low;

        let mut k = ss;
        while k <= se {
            let rs = ac.decode(reader)?;
            let (r, s) = (rs >> 4, rs & 0x0F);

            if s == 0 {
                if r < 15 {
                    self.eob_run = Self::read_eob_run(reader, r)? - 1;
                    break;
                }
                k += 16;
                continue;
            }

            k += r as usize;
            if k > se {
                return Err(corrupt(format!("AC run lands on coefficient {k} past Se={se}")));
            }
            block.0[ZIGZAG[k]] = receive_extend(reader, s)? << al;
            k += 1;
        }

        Ok(())
    }

    fn decode_ac_refine(&mut self, reader: &mut BitReader, component: usize, block: &mut Block) -> Result<()> {
        let (ss, se) = (
            self.scan.spectral_start as usize,
            self.scan.spectral_end as usize,
        );
        let p1 = 1i32 << self.scan.successive_approx_low;
        let m1 = -1i32 << self.scan.successive_approx_low;

        let mut k = ss;
        if self.eob_run == 0 {
            let ac = self.ac_table(component)?;

            while k <= se {
                let rs = ac.decode(reader)?;
                let (mut r, s) = (rs >> 4, rs & 0x0F);

                let mut value = 0;
                if s != 0 {
                    if s != 1 {
                        return Err(corrupt(format!("refinement symbol with magnitude {s}")));
                    }
                    value = if reader.read_bit()? { p1 } else { m1 };
                } else if r != 15 {
                    self.eob_run = Self::read_eob_run(reader, r)?;
                    break;
                }

                // Skip r zero-history coefficients, refining the nonzero ones passed on the way.
                while k <= se {
                    let coefficient = &mut block.0[ZIGZAG[k]];
                    if *coefficient != 0 {
                        refine(reader, coefficient, p1, m1)?;
                    } else {
                        if r == 0 {
                            break;
                        }
                        r -= 1;
                    }
                    k += 1;
                }

                if value != 0 {
                    if k > se {
                        return Err(corrupt(format!("new coefficient lands past Se={se}")));
                    }
                    block.0[ZIGZAG[k]] = value;
                }
                k += 1;
            }
        }

        if self.eob_run > 0 {
            while k <= se {
                let coefficient = &mut block.0[ZIGZAG[k]];
                if *coefficient != 0 {
                    refine(reader, coefficient, p1, m1)?;
                }
                k += 1;
            }
            self.eob_run -= 1;
        }

        Ok(())
    }
}

/// Applies one correction bit to a coefficient that was already nonzero.
fn refine(reader: &mut BitReader, coefficient: &mut i32, p1: i32, m1: i32) -> Result<()> {
    if reader.read_bit()? && *coefficient & p1 == 0 {
        *coefficient += if *coefficient >= 0 { p1 } else { m1 };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::CodingProcess;
    use crate::error::{DecodeError, ErrorKind};
    use crate::frame_header::Component;
    use crate::sample_precision::SamplePrecision;
    use crate::scan_header::ScanComponentSelector;
    use crate::test_utils::{random_block, universal_ac_table, universal_dc_table, HuffmanEncoder, ScanEncoder, XorShift};

    fn gray_frame(process: CodingProcess, width: usize, height: usize) -> Result<FrameHeader> {
        let mut frame = FrameHeader::new(process, SamplePrecision::EightBit, width, height);
        frame.add_component(Component::from(1, 1, 1, 0))?;
        Ok(frame)
    }

    fn gray_scan(ss: u8, se: u8, ah: u8, al: u8) -> ScanHeader {
        ScanHeader {
            scan_component_selectors: vec![ScanComponentSelector::from(1, 0, 0, 0)],
            spectral_start: ss,
            spectral_end: se,
            successive_approx_high: ah,
            successive_approx_low: al,
        }
    }

    fn tables() -> Result<([Option<HuffmanTable>; 4], [Option<HuffmanTable>; 4])> {
        Ok((
            [Some(universal_dc_table()?), None, None, None],
            [Some(universal_ac_table()?), None, None, None],
        ))
    }

    fn grids(frame: &FrameHeader) -> Result<Vec<BlockGrid>> {
        frame
            .components
            .iter()
            .map(|c| BlockGrid::new(c.grid_cols, c.grid_rows))
            .collect()
    }

    fn run_scan(
        frame: &FrameHeader,
        scan: &ScanHeader,
        restart_interval: u16,
        data: &[u8],
        grids: &mut [BlockGrid],
    ) -> Result<ScanOutcome> {
        let (dc, ac) = tables()?;
        let mode = scan.mode(frame.process)?;
        let mut decoder = ScanDecoder::new(frame, scan, mode, &dc, &ac, restart_interval)?;
        let mut reader = BitReader::new(data);
        decoder.decode(&mut reader, grids)
    }

    #[test]
    fn test_extend() -> Result<()> {
        assert_eq!(extend(0, 0), 0);
        assert_eq!(extend(0, 1), -1);
        assert_eq!(extend(1, 1), 1);
        assert_eq!(extend(0b010, 3), -5);
        assert_eq!(extend(0b101, 3), 5);
        assert_eq!(extend(0, 11), -2047);

        Ok(())
    }

    #[test]
    fn test_baseline_blocks() -> Result<()> {
        let frame = gray_frame(CodingProcess::BaselineDCT, 32, 16)?;
        let (dc_table, ac_table) = (universal_dc_table()?, universal_ac_table()?);
        let (dc, ac) = (HuffmanEncoder::new(&dc_table), HuffmanEncoder::new(&ac_table));

        let mut rng = XorShift::new(7);
        let blocks: Vec<Block> = (0..8).map(|_| random_block(&mut rng, 30, 1000)).collect();

        let mut encoder = ScanEncoder::default();
        let mut predictor = 0;
        for block in blocks.iter() {
            encoder.baseline_block(&dc, &ac, &mut predictor, block);
        }
        let data = encoder.into_bytes();

        let mut grids = grids(&frame)?;
        let outcome = run_scan(&frame, &gray_scan(0, 63, 0, 0), 0, &data, &mut grids)?;

        assert_eq!(outcome.units, 8);
        assert!(!outcome.ended_early);
        assert_eq!(grids[0].blocks, blocks);

        Ok(())
    }

    #[test]
    fn test_progressive_script_reconstructs_coefficients() -> Result<()> {
        let frame = gray_frame(CodingProcess::ProgressiveDCT, 40, 24)?;
        let (dc_table, ac_table) = (universal_dc_table()?, universal_ac_table()?);
        let (dc, ac) = (HuffmanEncoder::new(&dc_table), HuffmanEncoder::new(&ac_table));

        let mut rng = XorShift::new(0xC0FFEE);
        let blocks: Vec<Block> = (0..15)
            .map(|i| match i % 4 {
                // mostly empty blocks build long EOB runs
                0 | 1 => random_block(&mut rng, 2, 60),
                _ => random_block(&mut rng, 40, 900),
            })
            .collect();

        let mut grids = grids(&frame)?;

        let mut encoder = ScanEncoder::default();
        let mut predictor = 0;
        for block in blocks.iter() {
            encoder.dc_first(&dc, &mut predictor, block.0[0], 1);
        }
        run_scan(&frame, &gray_scan(0, 0, 0, 1), 0, &encoder.into_bytes(), &mut grids)?;

        let mut encoder = ScanEncoder::default();
        for block in blocks.iter() {
            encoder.dc_refine(block.0[0], 0);
        }
        run_scan(&frame, &gray_scan(0, 0, 1, 0), 0, &encoder.into_bytes(), &mut grids)?;

        for (ss, se) in [(1, 5), (6, 63)] {
            let mut encoder = ScanEncoder::default();
            for block in blocks.iter() {
                encoder.ac_first(&ac, block, ss, se, 2);
            }
            encoder.finish(Some(&ac));
            run_scan(&frame, &gray_scan(ss, se, 0, 2), 0, &encoder.into_bytes(), &mut grids)?;

            for al in [1, 0] {
                let mut encoder = ScanEncoder::default();
                for block in blocks.iter() {
                    encoder.ac_refine(&ac, block, ss, se, al);
                }
                encoder.finish(Some(&ac));
                run_scan(&frame, &gray_scan(ss, se, al + 1, al), 0, &encoder.into_bytes(), &mut grids)?;
            }
        }

        assert_eq!(grids[0].blocks, blocks);

        Ok(())
    }

    #[test]
    fn test_restart_markers_reset_predictors() -> Result<()> {
        let frame = gray_frame(CodingProcess::BaselineDCT, 24, 8)?;
        let (dc_table, ac_table) = (universal_dc_table()?, universal_ac_table()?);
        let (dc, ac) = (HuffmanEncoder::new(&dc_table), HuffmanEncoder::new(&ac_table));

        let mut block = Block::default();
        block.0[0] = 40;
        block.0[1] = -3;

        let mut data = Vec::new();
        for n in 0..3u8 {
            let mut encoder = ScanEncoder::default();
            encoder.baseline_block(&dc, &ac, &mut 0, &block);
            data.extend(encoder.into_bytes());
            if n < 2 {
                // RST2 out of sequence only warns
                data.extend_from_slice(&[0xFF, 0xD0 + if n == 1 { 2 } else { n }]);
            }
        }

        let mut grids = grids(&frame)?;
        let outcome = run_scan(&frame, &gray_scan(0, 63, 0, 0), 1, &data, &mut grids)?;

        assert_eq!(outcome.units, 3);
        assert!(grids[0].blocks.iter().all(|b| *b == block));

        Ok(())
    }

    #[test]
    fn test_missing_restart_marker() -> Result<()> {
        let frame = gray_frame(CodingProcess::BaselineDCT, 16, 8)?;
        let (dc_table, ac_table) = (universal_dc_table()?, universal_ac_table()?);
        let (dc, ac) = (HuffmanEncoder::new(&dc_table), HuffmanEncoder::new(&ac_table));

        let mut encoder = ScanEncoder::default();
        let mut predictor = 0;
        for _ in 0..2 {
            encoder.baseline_block(&dc, &ac, &mut predictor, &Block::default());
        }
        let data = encoder.into_bytes();

        let mut grids = grids(&frame)?;
        let err = run_scan(&frame, &gray_scan(0, 63, 0, 0), 1, &data, &mut grids).unwrap_err();
        assert_eq!(DecodeError::kind_of(&err), Some(ErrorKind::CorruptEntropyData));

        Ok(())
    }

    #[test]
    fn test_restart_underrun_repeats_last_unit() -> Result<()> {
        let frame = gray_frame(CodingProcess::BaselineDCT, 64, 8)?;
        let (dc_table, ac_table) = (universal_dc_table()?, universal_ac_table()?);
        let (dc, ac) = (HuffmanEncoder::new(&dc_table), HuffmanEncoder::new(&ac_table));

        let mut rng = XorShift::new(99);
        let blocks: Vec<Block> = (0..6).map(|_| random_block(&mut rng, 20, 200)).collect();

        // the first interval only carries two of its four blocks
        let mut data = Vec::new();
        for (n, chunk) in [&blocks[..2], &blocks[2..]].iter().enumerate() {
            let mut encoder = ScanEncoder::default();
            let mut predictor = 0;
            for block in chunk.iter() {
                encoder.baseline_block(&dc, &ac, &mut predictor, block);
            }
            data.extend(encoder.into_bytes());
            if n == 0 {
                data.extend_from_slice(&[0xFF, 0xD0]);
            }
        }

        let mut grids = grids(&frame)?;
        let outcome = run_scan(&frame, &gray_scan(0, 63, 0, 0), 4, &data, &mut grids)?;

        assert_eq!(outcome.units, 6);
        assert_eq!(outcome.padded_units, 2);
        assert_eq!(grids[0].blocks[..2], blocks[..2]);
        assert_eq!(grids[0].blocks[2], blocks[1]);
        assert_eq!(grids[0].blocks[3], blocks[1]);
        assert_eq!(grids[0].blocks[4..], blocks[2..]);

        Ok(())
    }

    #[test]
    fn test_marker_ends_scan_early() -> Result<()> {
        let frame = gray_frame(CodingProcess::BaselineDCT, 32, 8)?;
        let (dc_table, ac_table) = (universal_dc_table()?, universal_ac_table()?);
        let (dc, ac) = (HuffmanEncoder::new(&dc_table), HuffmanEncoder::new(&ac_table));

        let mut encoder = ScanEncoder::default();
        let mut predictor = 0;
        let mut block = Block::default();
        block.0[0] = 8;
        encoder.baseline_block(&dc, &ac, &mut predictor, &block);
        let mut data = encoder.into_bytes();
        data.extend_from_slice(&[0xFF, 0xD9]);

        let mut grids = grids(&frame)?;
        let outcome = run_scan(&frame, &gray_scan(0, 63, 0, 0), 0, &data, &mut grids)?;

        assert!(outcome.ended_early);
        assert_eq!(outcome.units, 1);
        assert_eq!(grids[0].blocks[0], block);
        assert_eq!(grids[0].blocks[1], Block::default());

        Ok(())
    }

    #[test]
    fn test_interleaved_unit_order() -> Result<()> {
        let mut frame = FrameHeader::new(CodingProcess::BaselineDCT, SamplePrecision::EightBit, 32, 16);
        frame.add_component(Component::from(1, 2, 2, 0))?;
        frame.add_component(Component::from(2, 1, 1, 0))?;
        frame.add_component(Component::from(3, 1, 1, 0))?;

        let scan = ScanHeader {
            scan_component_selectors: (0..3)
                .map(|i| ScanComponentSelector::from(i as u8 + 1, i, 0, 0))
                .collect(),
            spectral_start: 0,
            spectral_end: 63,
            successive_approx_high: 0,
            successive_approx_low: 0,
        };
        let (dc, ac) = tables()?;
        let decoder = ScanDecoder::new(&frame, &scan, ScanMode::Baseline, &dc, &ac, 0)?;

        let mut positions = Vec::new();
        decoder.unit_blocks(1, &mut positions);
        assert_eq!(positions, vec![(0, 2), (0, 3), (0, 6), (0, 7), (1, 1), (2, 1)]);

        Ok(())
    }

    #[test]
    fn test_undefined_table_is_malformed() -> Result<()> {
        let frame = gray_frame(CodingProcess::BaselineDCT, 8, 8)?;
        let scan = gray_scan(0, 63, 0, 0);
        let (dc, _) = tables()?;
        let ac: [Option<HuffmanTable>; 4] = [None, None, None, None];

        let err = ScanDecoder::new(&frame, &scan, ScanMode::Baseline, &dc, &ac, 0).err();
        assert_eq!(
            err.as_ref().and_then(DecodeError::kind_of),
            Some(ErrorKind::MalformedHeader)
        );

        Ok(())
    }
}
