use crate::bitreader::BitReader;
use crate::coding::CodingProcess;
use crate::color_spaces::{ColorSpace, YCbCrConverter};
use crate::dequantizer::{reconstruct_plane, Dequantizer};
use crate::entropy_decoder::ScanDecoder;
use crate::error::{malformed, truncated, unsupported};
use crate::frame_header::{Component, FrameHeader};
use crate::huffman_tree::{HuffmanClass, HuffmanTable};
use crate::idct::Idct;
use crate::image::{BlockGrid, Image, Plane};
use crate::jfif::{parse_adobe, parse_app0, App0, Metadata};
use crate::marker::{Marker, MarkerType};
use crate::options::{DecoderOptions, OutputColorSpace};
use crate::parser::Parser;
use crate::quantization_table::QuantizationTable;
use crate::sample_precision::SamplePrecision;
use crate::upsampler::upsample;
use anyhow::Result;
use log::{debug, info, warn};
use memmap::Mmap;
use rayon::iter::IntoParallelRefIterator;
use rayon::iter::ParallelIterator;
use std::fs::File;
use std::ops::Deref;

enum Source {
    Mapped(Mmap),
    Buffer(Vec<u8>),
}

impl Deref for Source {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Source::Mapped(mmap) => &mmap[..],
            Source::Buffer(buffer) => buffer.as_slice(),
        }
    }
}

/// Decodes one baseline or progressive JPEG held fully in memory.
pub struct Decoder {
    source: Source,
    options: DecoderOptions,
    metadata: Metadata,
}

impl Decoder {
    pub fn new(data: &[u8]) -> Self {
        Decoder::with_options(data, DecoderOptions::default())
    }

    pub fn with_options(data: &[u8], options: DecoderOptions) -> Self {
        Decoder {
            source: Source::Buffer(data.to_vec()),
            options,
            metadata: Metadata::default(),
        }
    }

    pub fn from_file(file: File) -> Result<Self> {
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Decoder {
            source: Source::Mapped(mmap),
            options: DecoderOptions::default(),
            metadata: Metadata::default(),
        })
    }

    pub fn from_file_path(file_path: &str) -> Result<Self> {
        let file = File::open(file_path)?;
        Decoder::from_file(file)
    }

    pub fn options_mut(&mut self) -> &mut DecoderOptions {
        &mut self.options
    }

    /// Application segments and comments seen by the last call to [`Decoder::decode`].
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn decode(&mut self) -> Result<Image> {
        let data: &[u8] = &self.source;
        let state = DecodeState::new(&mut self.options);

        let (image, metadata) = state.run(data)?;
        self.metadata = metadata;

        Ok(image)
    }
}

/// Everything one decode accumulates between SOI and EOI.
struct DecodeState<'o> {
    options: &'o mut DecoderOptions,
    frame: Option<FrameHeader>,
    /// Frame height was 0 in SOF and has to come from DNL.
    awaiting_lines: bool,
    dc_tables: [Option<HuffmanTable>; 4],
    ac_tables: [Option<HuffmanTable>; 4],
    quant_tables: [Option<QuantizationTable>; 4],
    /// The table each component dequantizes with, fixed when its first scan starts.
    latched_quant: Vec<Option<QuantizationTable>>,
    grids: Vec<BlockGrid>,
    restart_interval: u16,
    metadata: Metadata,
    scans: usize,
    restart_underruns: usize,
}

impl<'o> DecodeState<'o> {
    fn new(options: &'o mut DecoderOptions) -> Self {
        DecodeState {
            options,
            frame: None,
            awaiting_lines: false,
            dc_tables: Default::default(),
            ac_tables: Default::default(),
            quant_tables: Default::default(),
            latched_quant: Vec::new(),
            grids: Vec::new(),
            restart_interval: 0,
            metadata: Metadata::default(),
            scans: 0,
            restart_underruns: 0,
        }
    }

    fn run(mut self, data: &[u8]) -> Result<(Image, Metadata)> {
        if !data.starts_with(&[0xFF, Marker::SOI.code()]) {
            return Err(malformed("stream does not start with SOI"));
        }

        let mut reader = BitReader::new(data);
        reader.next_marker();

        loop {
            let code = reader
                .next_marker()
                .ok_or_else(|| truncated("stream ends before EOI"))?;
            let Some(marker) = Marker::from_u8(code) else {
                continue;
            };
            debug!(
                "{marker:?} ({:#06X}) at offset {}",
                marker.to_u16(),
                reader.position() - Marker::SIZE
            );

            match marker {
                Marker::EOI => {
                    self.options.report_progress(reader.position());
                    break;
                }
                Marker::APP(n) => self.application_segment(n, reader.read_segment()?)?,
                Marker::COM => {
                    let comment = reader.read_segment()?;
                    self.metadata.comments.push(comment.to_vec());
                }
                Marker::DQT => self.define_quant_tables(reader.read_segment()?)?,
                Marker::DHT => self.define_huffman_tables(reader.read_segment()?)?,
                Marker::SOF(n) => self.start_of_frame(n, reader.read_segment()?)?,
                Marker::DRI => {
                    self.restart_interval = Parser::new(reader.read_segment()?).parse_restart_interval()?;
                    debug!("restart interval {}", self.restart_interval);
                }
                Marker::SOS => {
                    let segment = reader.read_segment()?;
                    self.start_of_scan(segment, data, &mut reader)?;
                }
                Marker::DNL => self.number_of_lines(reader.read_segment()?)?,
                Marker::DAC => return Err(unsupported("arithmetic coding conditioning (DAC)")),
                Marker::DHP | Marker::EXP => {
                    return Err(unsupported(format!("hierarchical process ({marker:?})")))
                }
                Marker::RST(n) => warn!("RST{n} outside of a scan"),
                Marker::SOI => warn!("repeated SOI ignored"),
                Marker::TEM => {}
                Marker::JPG(_) | Marker::RES(_) => {
                    if let MarkerType::Segment = marker.is_segment() {
                        reader.read_segment()?;
                    }
                    warn!("skipped reserved marker {:#04x}", marker.code());
                }
            }

            self.options.report_progress(reader.position());
        }

        self.assemble()
    }

    fn application_segment(&mut self, n: u8, payload: &[u8]) -> Result<()> {
        match n {
            0 => match parse_app0(payload)? {
                App0::Jfif(jfif) => {
                    debug!("JFIF {}.{:02} {:?}", jfif.version.0, jfif.version.1, jfif.density);
                    if self.metadata.jfif.is_none() {
                        self.metadata.jfif = Some(jfif);
                    }
                }
                App0::Extension(format) => self.metadata.thumbnail_formats.push(format),
                App0::Other => warn!("APP0 is neither JFIF nor JFXX"),
            },
            14 => {
                if let Some(transform) = parse_adobe(payload) {
                    debug!("Adobe transform {transform}");
                    self.metadata.adobe_transform = Some(transform);
                }
            }
            _ => {}
        }

        self.metadata.app_segments.push((n, payload.to_vec()));
        Ok(())
    }

    fn define_quant_tables(&mut self, segment: &[u8]) -> Result<()> {
        for (slot, table) in Parser::new(segment).parse_quant_tables()? {
            debug!("quantization table {slot} ({:?})", table.precision());
            self.quant_tables[slot as usize] = Some(table);
        }
        Ok(())
    }

    fn define_huffman_tables(&mut self, segment: &[u8]) -> Result<()> {
        for (class, slot, table) in Parser::new(segment).parse_huffman_tables()? {
            debug!("{class:?} huffman table {slot}");
            match class {
                HuffmanClass::DC => self.dc_tables[slot as usize] = Some(table),
                HuffmanClass::AC => self.ac_tables[slot as usize] = Some(table),
            }
        }
        Ok(())
    }

    fn start_of_frame(&mut self, n: u8, segment: &[u8]) -> Result<()> {
        if self.frame.is_some() {
            return Err(unsupported("more than one frame (hierarchical process)"));
        }

        let process = CodingProcess::from_sof(n)?;
        let frame = Parser::new(segment).parse_start_of_frame(process)?;
        debug!(
            "{process:?} {:?} frame {}x{}, {} component(s), MCU {}x{}",
            frame.precision,
            frame.width(),
            frame.height(),
            frame.components().len(),
            8 * frame.max_h,
            8 * frame.max_v
        );

        for component in frame.components() {
            if component.partial_right_edge() || component.partial_bottom_edge() {
                debug!(
                    "component {} pads {}x{} samples out to {}x{} blocks",
                    component.component_id,
                    component.sample_width,
                    component.sample_height,
                    component.grid_cols,
                    component.grid_rows
                );
            }
        }

        self.awaiting_lines = frame.image_height == 0;
        self.latched_quant = vec![None; frame.components.len()];
        self.frame = Some(frame);
        Ok(())
    }

    fn number_of_lines(&mut self, segment: &[u8]) -> Result<()> {
        let lines = Parser::new(segment).parse_number_of_lines()? as usize;

        match self.frame.as_mut() {
            Some(frame) if self.awaiting_lines => {
                if frame.image_height != lines {
                    frame.set_height(lines);
                }
                self.awaiting_lines = false;
                debug!("DNL sets height {lines}");
            }
            _ => warn!("DNL of {lines} lines ignored, frame height is already known"),
        }

        Ok(())
    }

    /// Height of a frame whose SOF said 0: the first DNL segment after the current position.
    fn find_number_of_lines(data: &[u8], from: usize) -> Result<usize> {
        let position = data
            .get(from..)
            .unwrap_or_default()
            .windows(2)
            .position(|pair| pair == [0xFF, Marker::DNL.code()])
            .ok_or_else(|| malformed("frame height is 0 and no DNL segment follows"))?;

        let mut reader = BitReader::new(&data[from + position + Marker::SIZE..]);
        Ok(Parser::new(reader.read_segment()?).parse_number_of_lines()? as usize)
    }

    fn start_of_scan(&mut self, segment: &[u8], data: &[u8], reader: &mut BitReader) -> Result<()> {
        let frame = self
            .frame
            .as_mut()
            .ok_or_else(|| malformed("SOS before SOF"))?;

        if frame.image_height == 0 {
            let lines = Self::find_number_of_lines(data, reader.position())?;
            debug!("frame height {lines} taken from DNL ahead of the first scan");
            frame.set_height(lines);
        }

        let scan = Parser::new(segment).parse_start_of_scan(frame)?;
        let mode = scan.mode(frame.process)?;

        if self.grids.is_empty() {
            self.grids = frame
                .components
                .iter()
                .map(|c| BlockGrid::new(c.grid_cols, c.grid_rows))
                .collect::<Result<Vec<_>>>()?;
        }

        for selector in scan.scan_component_selectors.iter() {
            let index = selector.component_index;
            if self.latched_quant[index].is_none() {
                let component = &frame.components[index];
                let slot = component.qt_table_id as usize;
                let table = self.quant_tables[slot].as_ref().ok_or_else(|| {
                    malformed(format!(
                        "component {} uses undefined quantization table {slot}",
                        component.component_id
                    ))
                })?;

                self.latched_quant[index] = Some(match self.options.quality_override {
                    Some(quality) => {
                        table.scaled(quality, table.precision() == SamplePrecision::EightBit)
                    }
                    None => table.clone(),
                });
            }

            if mode.uses_dc_table() && self.dc_tables[selector.dc_destination_id as usize].is_none() {
                debug!("standard DC table installed in slot {}", selector.dc_destination_id);
                self.dc_tables[selector.dc_destination_id as usize] =
                    Some(HuffmanTable::standard(HuffmanClass::DC, selector.dc_destination_id));
            }
            if mode.uses_ac_table() && self.ac_tables[selector.ac_destination_id as usize].is_none() {
                debug!("standard AC table installed in slot {}", selector.ac_destination_id);
                self.ac_tables[selector.ac_destination_id as usize] =
                    Some(HuffmanTable::standard(HuffmanClass::AC, selector.ac_destination_id));
            }
        }

        let frame: &FrameHeader = frame;
        let mut decoder = ScanDecoder::new(
            frame,
            &scan,
            mode,
            &self.dc_tables,
            &self.ac_tables,
            self.restart_interval,
        )?;
        let outcome = decoder.decode(reader, &mut self.grids)?;

        self.scans += 1;
        self.restart_underruns += outcome.padded_units;
        self.options.report_progress(reader.position());

        Ok(())
    }

    fn color_space(&self, components: &[Component]) -> ColorSpace {
        let ids: Vec<u8> = components.iter().map(|c| c.component_id).collect();

        match components.len() {
            1 => ColorSpace::Gray,
            _ if self.metadata.adobe_transform == Some(0) || ids == b"RGB" => ColorSpace::RGB,
            _ => ColorSpace::YCbCr,
        }
    }

    fn assemble(self) -> Result<(Image, Metadata)> {
        let frame = self
            .frame
            .as_ref()
            .ok_or_else(|| malformed("EOI without a frame"))?;
        if self.scans == 0 {
            return Err(malformed("EOI before any scan"));
        }
        if frame.image_height == 0 {
            return Err(malformed("frame height is 0 and no DNL segment defined it"));
        }

        let mut jobs = Vec::with_capacity(frame.components.len());
        for (i, component) in frame.components.iter().enumerate() {
            // a component no scan touched still dequantizes with its own slot
            let table = self.latched_quant[i]
                .as_ref()
                .or(self.quant_tables[component.qt_table_id as usize].as_ref())
                .ok_or_else(|| {
                    malformed(format!(
                        "component {} has no quantization table",
                        component.component_id
                    ))
                })?;
            jobs.push((component, &self.grids[i], table));
        }

        let idct = self.options.idct.build();
        let idct: &dyn Idct = idct.as_ref();
        let method = self.options.upsampling;
        let (width, height) = (frame.image_width, frame.image_height);
        let (max_h, max_v) = (frame.max_h as usize, frame.max_v as usize);

        let reconstruct = |&(component, grid, table): &(&Component, &BlockGrid, &QuantizationTable)| -> Plane {
            let dequantizer = Dequantizer::new(table, idct);
            let plane = reconstruct_plane(grid, &dequantizer, idct);

            upsample(
                &plane,
                component.sample_width,
                component.sample_height,
                max_h / component.horizontal_sampling_factor as usize,
                max_v / component.vertical_sampling_factor as usize,
                method,
            )
            .cropped(width, height)
        };

        let mut planes: Vec<Plane> = match self.options.parallel {
            true => jobs.par_iter().map(reconstruct).collect(),
            false => jobs.iter().map(reconstruct).collect(),
        };

        let mut color_space = self.color_space(&frame.components);
        if self.options.output == OutputColorSpace::Rgb && color_space == ColorSpace::YCbCr {
            YCbCrConverter::new(self.options.color_conversion).convert_planes(&mut planes);
            color_space = ColorSpace::RGB;
        }

        info!(
            "decoded {width}x{height} {color_space:?} image, {} component(s), {} scan(s){}",
            planes.len(),
            self.scans,
            if frame.process.is_progressive() { ", progressive" } else { "" }
        );

        let image = Image {
            width,
            height,
            color_space,
            planes,
            density: self.metadata.jfif.as_ref().map(|jfif| jfif.density),
            progressive: frame.process.is_progressive(),
            scans: self.scans,
            restart_underruns: self.restart_underruns,
        };

        Ok((image, self.metadata))
    }
}
