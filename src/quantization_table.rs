use crate::error::malformed;
use crate::sample_precision::SamplePrecision;
use anyhow::Result;

/// Maps a zigzag position to its natural (row-major) index in an 8x8 block.
pub const ZIGZAG: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27, 20,
    13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58, 59,
    52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

// ITU T.81 Annex K.1, natural order.
const LUMINANCE: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, 12, 12, 14, 19, 26, 58, 60, 55, 14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62, 18, 22, 37, 56, 68, 109, 103, 77, 24, 35, 55, 64, 81, 104, 113,
    92, 49, 64, 78, 87, 103, 121, 120, 101, 72, 92, 95, 98, 112, 100, 103, 99,
];

const CHROMINANCE: [u16; 64] = [
    17, 18, 24, 47, 99, 99, 99, 99, 18, 21, 26, 66, 99, 99, 99, 99, 24, 26, 56, 99, 99, 99, 99, 99,
    47, 66, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
];

/// The set of 64 quantization values used to quantize the DCT coefficients, stored in natural
/// order regardless of how they arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationTable {
    /// Specifies the precision of the Qk values. 8-bit Qk values are the only ones allowed with
    /// baseline frames.
    precision: SamplePrecision,

    values: [u16; 64],
}

impl QuantizationTable {
    /// Builds a table from the 64 values of a DQT entry. DQT carries them in zigzag order.
    pub fn from_dqt(precision: SamplePrecision, raw: &[u16], is_zigzag: bool) -> Result<Self> {
        if raw.len() != 64 {
            return Err(malformed(format!(
                "quantization table has {} values instead of 64",
                raw.len()
            )));
        }

        let mut values = [0; 64];
        for (k, &value) in raw.iter().enumerate() {
            let index = if is_zigzag { ZIGZAG[k] } else { k };
            values[index] = value;
        }

        Ok(QuantizationTable { precision, values })
    }

    pub fn standard_luminance() -> Self {
        QuantizationTable {
            precision: SamplePrecision::EightBit,
            values: LUMINANCE,
        }
    }

    pub fn standard_chrominance() -> Self {
        QuantizationTable {
            precision: SamplePrecision::EightBit,
            values: CHROMINANCE,
        }
    }

    /// Rescales the table for a quality in 1..=100 the way the IJG encoder does: 50 leaves it
    /// unchanged, lower values coarsen it, higher values refine it.
    ///
    /// Results are clamped to 1..=255 when `force_baseline` is set, otherwise to 1..=32767.
    pub fn scaled(&self, quality: u8, force_baseline: bool) -> Self {
        let scale = quality_scale(quality);
        let precision = if force_baseline {
            SamplePrecision::EightBit
        } else {
            self.precision
        };
        let max = if force_baseline {
            SamplePrecision::EightBit.max_value()
        } else {
            SamplePrecision::SixteenBit.max_value()
        };

        let mut values = [0; 64];
        for (scaled, &value) in values.iter_mut().zip(self.values.iter()) {
            let v = (value as u32 * scale + 50) / 100;
            *scaled = v.clamp(1, max as u32) as u16;
        }

        QuantizationTable { precision, values }
    }

    pub fn precision(&self) -> SamplePrecision {
        self.precision
    }

    /// Quantizers in natural order.
    pub fn values(&self) -> &[u16; 64] {
        &self.values
    }
}

/// Percentage applied to a table for a given quality. Qualities outside 1..=100 are clamped.
pub fn quality_scale(quality: u8) -> u32 {
    let quality = quality.clamp(1, 100) as u32;
    if quality < 50 {
        5000 / quality
    } else {
        200 - quality * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::XorShift;

    #[test]
    fn test_zigzag_is_a_permutation() -> Result<()> {
        let mut seen = [false; 64];
        for &index in ZIGZAG.iter() {
            assert!(!seen[index]);
            seen[index] = true;
        }
        assert_eq!(ZIGZAG[2], 8);
        assert_eq!(ZIGZAG[63], 63);

        Ok(())
    }

    #[test]
    fn test_from_dqt_unzigzags() -> Result<()> {
        let raw: Vec<u16> = (0..64).collect();
        let table = QuantizationTable::from_dqt(SamplePrecision::EightBit, &raw, true)?;

        for k in 0..64 {
            assert_eq!(table.values()[ZIGZAG[k]], k as u16);
        }

        let natural = QuantizationTable::from_dqt(SamplePrecision::EightBit, &raw, false)?;
        assert_eq!(natural.values()[8], 8);

        assert!(QuantizationTable::from_dqt(SamplePrecision::EightBit, &raw[..63], true).is_err());

        Ok(())
    }

    #[test]
    fn test_quality_scale() -> Result<()> {
        assert_eq!(quality_scale(50), 100);
        assert_eq!(quality_scale(1), 5000);
        assert_eq!(quality_scale(100), 0);
        assert_eq!(quality_scale(0), 5000);
        assert_eq!(quality_scale(75), 50);

        let table = QuantizationTable::standard_luminance();
        assert_eq!(table.scaled(50, true), table);
        assert_eq!(table.scaled(75, true).values()[0], 8);

        Ok(())
    }

    #[test]
    fn test_scaled_tables_stay_in_range() -> Result<()> {
        let mut rng = XorShift::new(0x5EED);
        let mut tables = vec![
            QuantizationTable::standard_luminance(),
            QuantizationTable::standard_chrominance(),
        ];
        for _ in 0..16 {
            let raw: Vec<u16> = (0..64).map(|_| rng.range(1, 255) as u16).collect();
            tables.push(QuantizationTable::from_dqt(SamplePrecision::EightBit, &raw, true)?);
        }
        let wide: Vec<u16> = (0..64).map(|_| rng.range(1, 65535) as u16).collect();
        tables.push(QuantizationTable::from_dqt(SamplePrecision::SixteenBit, &wide, true)?);

        for table in &tables {
            for quality in 1..=100 {
                let baseline = table.scaled(quality, true);
                assert!(baseline.values().iter().all(|&v| (1..=255).contains(&v)));
                assert_eq!(baseline.precision(), SamplePrecision::EightBit);

                let extended = table.scaled(quality, false);
                assert!(extended.values().iter().all(|&v| (1..=32767).contains(&v)));
            }
        }

        Ok(())
    }
}
