use crate::quantization_table::QuantizationTable;
use std::f64::consts::PI;

pub(crate) const RANGE_MASK: usize = 0x3FF;

/// Clamp table for level-shifted samples.
///
/// Indexed by the low 10 bits of a signed IDCT output, it returns that value plus 128 clamped
/// to 0..=255. Outputs far outside the range wrap and clamp to the wrong end, which only
/// happens with corrupt coefficients.
pub struct RangeLimit {
    table: [u8; RANGE_MASK + 1],
}

impl RangeLimit {
    const fn build() -> Self {
        let mut table = [0u8; RANGE_MASK + 1];
        let mut i = 0;
        while i <= RANGE_MASK {
            let signed = if i < 512 { i as i32 } else { i as i32 - 1024 };
            let shifted = signed + 128;
            table[i] = if shifted < 0 {
                0
            } else if shifted > 255 {
                255
            } else {
                shifted as u8
            };
            i += 1;
        }
        RangeLimit { table }
    }

    #[inline]
    pub fn sample(&self, value: i32) -> u8 {
        self.table[(value as usize) & RANGE_MASK]
    }
}

pub(crate) static RANGE_LIMIT: RangeLimit = RangeLimit::build();

/// An 8x8 inverse DCT.
///
/// Dequantization happens through `multipliers`: each coefficient is multiplied by the
/// multiplier at its natural index before `transform` runs. An implementation may fold its own
/// scaling into them.
pub trait Idct: Send + Sync {
    fn multipliers(&self, table: &QuantizationTable) -> [f32; 64];

    /// Writes level-shifted, clamped samples in natural order.
    fn transform(&self, coefficients: &[f32; 64], output: &mut [u8; 64]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdctKind {
    /// Arai, Agui and Nakajima's scaled butterfly.
    #[default]
    Aan,
    /// Direct separable evaluation of the DCT-III sums.
    Reference,
}

impl IdctKind {
    pub fn build(self) -> Box<dyn Idct> {
        match self {
            IdctKind::Aan => Box::new(AanIdct),
            IdctKind::Reference => Box::new(ReferenceIdct::new()),
        }
    }
}

/// cos(k * pi / 16) * sqrt(2) for k > 0, 1 for k = 0.
const AAN_SCALE_FACTORS: [f32; 8] = [
    1.0,
    1.387_039_8,
    1.306_563,
    1.175_875_6,
    1.0,
    0.785_694_96,
    0.541_196_1,
    0.275_899_38,
];

/// Floating point AAN inverse DCT. The quantizers are pre-multiplied by the AAN scale factors,
/// so the butterfly needs only five multiplications per row or column.
pub struct AanIdct;

impl AanIdct {
    /// One 1-D pass over eight values spaced `stride` apart.
    #[inline]
    fn butterfly(input: &[f32; 64], base: usize, stride: usize, out: &mut [f32; 8]) {
        let at = |i: usize| input[base + i * stride];

        // even part
        let tmp10 = at(0) + at(4);
        let tmp11 = at(0) - at(4);
        let tmp13 = at(2) + at(6);
        let tmp12 = (at(2) - at(6)) * 1.414_213_6 - tmp13;

        let tmp0 = tmp10 + tmp13;
        let tmp3 = tmp10 - tmp13;
        let tmp1 = tmp11 + tmp12;
        let tmp2 = tmp11 - tmp12;

        // odd part
        let z13 = at(5) + at(3);
        let z10 = at(5) - at(3);
        let z11 = at(1) + at(7);
        let z12 = at(1) - at(7);

        let tmp7 = z11 + z13;
        let tmp11 = (z11 - z13) * 1.414_213_6;

        let z5 = (z10 + z12) * 1.847_759;
        let tmp10 = 1.082_392_2 * z12 - z5;
        let tmp12 = -2.613_126 * z10 + z5;

        let tmp6 = tmp12 - tmp7;
        let tmp5 = tmp11 - tmp6;
        let tmp4 = tmp10 + tmp5;

        *out = [
            tmp0 + tmp7,
            tmp1 + tmp6,
            tmp2 + tmp5,
            tmp3 - tmp4,
            tmp3 + tmp4,
            tmp2 - tmp5,
            tmp1 - tmp6,
            tmp0 - tmp7,
        ];
    }
}

impl Idct for AanIdct {
    fn multipliers(&self, table: &QuantizationTable) -> [f32; 64] {
        let mut multipliers = [0.0; 64];
        for (i, (multiplier, &q)) in multipliers.iter_mut().zip(table.values()).enumerate() {
            *multiplier = q as f32 * AAN_SCALE_FACTORS[i / 8] * AAN_SCALE_FACTORS[i % 8];
        }
        multipliers
    }

    fn transform(&self, coefficients: &[f32; 64], output: &mut [u8; 64]) {
        let mut workspace = [0f32; 64];
        let mut column = [0f32; 8];

        for col in 0..8 {
            if (1..8).all(|row| coefficients[row * 8 + col] == 0.0) {
                let dc = coefficients[col];
                for row in 0..8 {
                    workspace[row * 8 + col] = dc;
                }
                continue;
            }

            Self::butterfly(coefficients, col, 8, &mut column);
            for row in 0..8 {
                workspace[row * 8 + col] = column[row];
            }
        }

        let mut row_out = [0f32; 8];
        for row in 0..8 {
            let base = row * 8;
            if workspace[base + 1..base + 8].iter().all(|&v| v == 0.0) {
                let sample = RANGE_LIMIT.sample((workspace[base] / 8.0).round() as i32);
                output[base..base + 8].fill(sample);
                continue;
            }

            Self::butterfly(&workspace, base, 1, &mut row_out);
            for (x, value) in row_out.iter().enumerate() {
                output[base + x] = RANGE_LIMIT.sample((value / 8.0).round() as i32);
            }
        }
    }
}

/// The DCT-III evaluated directly, one dimension at a time. Slower than [`AanIdct`] and kept
/// for checking it.
pub struct ReferenceIdct {
    /// C(u) cos((2x + 1) u pi / 16) at `u * 8 + x`.
    table: [f64; 64],
}

impl ReferenceIdct {
    fn norm_coeff(u: usize) -> f64 {
        match u {
            0 => (0.5f64).sqrt(),
            _ => 1.0,
        }
    }

    pub fn new() -> Self {
        let mut table = [0.0; 64];

        for u in 0..8 {
            for x in 0..8 {
                table[u * 8 + x] =
                    Self::norm_coeff(u) * ((2.0 * x as f64 + 1.0) * u as f64 * PI / 16.0).cos()
            }
        }

        ReferenceIdct { table }
    }
}

impl Default for ReferenceIdct {
    fn default() -> Self {
        Self::new()
    }
}

impl Idct for ReferenceIdct {
    fn multipliers(&self, table: &QuantizationTable) -> [f32; 64] {
        let values = *table.values();
        values.map(|q| q as f32)
    }

    fn transform(&self, coefficients: &[f32; 64], output: &mut [u8; 64]) {
        // rows: tmp[v][x] = sum over u of F[v][u] * C(u) cos((2x + 1) u pi / 16)
        let mut tmp = [0f64; 64];
        for v in 0..8 {
            for x in 0..8 {
                tmp[v * 8 + x] = (0..8)
                    .map(|u| coefficients[v * 8 + u] as f64 * self.table[u * 8 + x])
                    .sum();
            }
        }

        for y in 0..8 {
            for x in 0..8 {
                let sum: f64 = (0..8).map(|v| self.table[v * 8 + y] * tmp[v * 8 + x]).sum();
                output[y * 8 + x] = RANGE_LIMIT.sample((0.25 * sum).round() as i32);
            }
        }
    }
}
