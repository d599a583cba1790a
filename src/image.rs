use crate::color_spaces::{ColorConversion, ColorSpace, YCbCrConverter};
use crate::error::unsupported;
use crate::jfif::Density;
use anyhow::Result;

/// One 8x8 block of DCT coefficients, natural (row-major) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block(pub [i32; 64]);

impl Block {
    pub(crate) const WIDTH: usize = 8;
}

impl Default for Block {
    fn default() -> Self {
        Block([0; 64])
    }
}

/// Coefficient storage for one component, sized to whole MCUs up front so scans of any order
/// write into place.
#[derive(Debug, Clone)]
pub(crate) struct BlockGrid {
    pub(crate) cols: usize,
    pub(crate) rows: usize,
    pub(crate) blocks: Vec<Block>,
}

impl BlockGrid {
    pub(crate) fn new(cols: usize, rows: usize) -> Result<Self> {
        let count = cols
            .checked_mul(rows)
            .ok_or_else(|| unsupported(format!("{cols}x{rows} blocks overflow")))?;

        let mut blocks = Vec::new();
        blocks
            .try_reserve_exact(count)
            .map_err(|e| unsupported(format!("{cols}x{rows} blocks: {e}")))?;
        blocks.resize(count, Block::default());

        Ok(BlockGrid { cols, rows, blocks })
    }
}

/// An 8-bit sample plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) samples: Vec<u8>,
}

impl Plane {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        Plane {
            width,
            height,
            samples: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.samples[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.samples[y * self.width..(y + 1) * self.width]
    }

    /// Keeps the top-left `width` by `height` samples.
    pub(crate) fn cropped(self, width: usize, height: usize) -> Self {
        if width == self.width && height == self.height {
            return self;
        }

        let mut samples = Vec::with_capacity(width * height);
        for y in 0..height {
            samples.extend_from_slice(&self.row(y)[..width]);
        }

        Plane {
            width,
            height,
            samples,
        }
    }
}

/// A decoded image: one full-resolution plane per component, in frame order.
#[derive(Debug, Clone)]
pub struct Image {
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) color_space: ColorSpace,
    pub(crate) planes: Vec<Plane>,
    pub(crate) density: Option<Density>,
    pub(crate) progressive: bool,
    pub(crate) scans: usize,
    pub(crate) restart_underruns: usize,
}

impl Image {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Pixel density from a JFIF APP0 segment, if the stream had one.
    pub fn density(&self) -> Option<Density> {
        self.density
    }

    pub fn is_progressive(&self) -> bool {
        self.progressive
    }

    pub fn scans(&self) -> usize {
        self.scans
    }

    /// MCUs filled in by copying because a restart interval ended early.
    pub fn restart_underruns(&self) -> usize {
        self.restart_underruns
    }

    /// Interleaved RGB bytes, converting from YCbCr and widening grayscale as needed.
    pub fn to_rgb8(&self, conversion: ColorConversion) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.width * self.height * 3);

        match (self.color_space, self.planes.as_slice()) {
            (ColorSpace::YCbCr, [y, cb, cr]) => {
                let converter = YCbCrConverter::new(conversion);
                for ((&y, &cb), &cr) in y.samples.iter().zip(&cb.samples).zip(&cr.samples) {
                    rgb.extend_from_slice(&converter.convert(y, cb, cr));
                }
            }
            (ColorSpace::RGB, [r, g, b]) => {
                for ((&r, &g), &b) in r.samples.iter().zip(&g.samples).zip(&b.samples) {
                    rgb.extend_from_slice(&[r, g, b]);
                }
            }
            (_, planes) => {
                if let Some(gray) = planes.first() {
                    for &value in gray.samples.iter() {
                        rgb.extend_from_slice(&[value, value, value]);
                    }
                }
            }
        }

        rgb
    }
}
