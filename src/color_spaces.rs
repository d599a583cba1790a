use crate::image::Plane;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ColorSpace {
    Gray,
    YCbCr,
    RGB,
}

/// How YCbCr samples become RGB.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum ColorConversion {
    /// Direct evaluation of the BT.601 equations.
    Float,
    /// Fixed-point tables indexed by the chroma samples.
    #[default]
    LookupTable,
}

const SCALE_BITS: i32 = 16;
const ONE_HALF: i32 = 1 << (SCALE_BITS - 1);

fn fix(x: f64) -> i32 {
    (x * (1 << SCALE_BITS) as f64 + 0.5) as i32
}

/// YCbCr to RGB using the full-range JFIF equations:
///
/// R = Y + 1.402 (Cr - 128)
/// G = Y - 0.344136 (Cb - 128) - 0.714136 (Cr - 128)
/// B = Y + 1.772 (Cb - 128)
pub struct YCbCrConverter {
    conversion: ColorConversion,
    cr_r: [i32; 256],
    cb_b: [i32; 256],
    cr_g: [i32; 256],
    cb_g: [i32; 256],
}

impl YCbCrConverter {
    pub fn new(conversion: ColorConversion) -> Self {
        let mut converter = YCbCrConverter {
            conversion,
            cr_r: [0; 256],
            cb_b: [0; 256],
            cr_g: [0; 256],
            cb_g: [0; 256],
        };

        if conversion == ColorConversion::LookupTable {
            for i in 0..256 {
                let x = i as i32 - 128;
                converter.cr_r[i] = (fix(1.402) * x + ONE_HALF) >> SCALE_BITS;
                converter.cb_b[i] = (fix(1.772) * x + ONE_HALF) >> SCALE_BITS;
                converter.cr_g[i] = -fix(0.714136) * x;
                converter.cb_g[i] = -fix(0.344136) * x + ONE_HALF;
            }
        }

        converter
    }

    pub fn convert(&self, y: u8, cb: u8, cr: u8) -> [u8; 3] {
        match self.conversion {
            ColorConversion::Float => ycbcr_to_rgb_float(y, cb, cr),
            ColorConversion::LookupTable => {
                let y = y as i32;
                let (cb, cr) = (cb as usize, cr as usize);

                let r = y + self.cr_r[cr];
                let g = y + ((self.cb_g[cb] + self.cr_g[cr]) >> SCALE_BITS);
                let b = y + self.cb_b[cb];

                [clamp(r), clamp(g), clamp(b)]
            }
        }
    }

    /// Converts three equally sized planes in place of their YCbCr values.
    pub(crate) fn convert_planes(&self, planes: &mut [Plane]) {
        if let [y, cb, cr] = planes {
            for ((y, cb), cr) in y
                .samples
                .iter_mut()
                .zip(cb.samples.iter_mut())
                .zip(cr.samples.iter_mut())
            {
                let [r, g, b] = self.convert(*y, *cb, *cr);
                *y = r;
                *cb = g;
                *cr = b;
            }
        }
    }
}

fn clamp(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

pub(crate) fn ycbcr_to_rgb_float(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = y as f32;
    let cb = cb as f32 - 128.0;
    let cr = cr as f32 - 128.0;

    let r = y + 1.402 * cr;
    let g = y - 0.344136 * cb - 0.714136 * cr;
    let b = y + 1.772 * cb;

    [
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
    ]
}
