use crate::idct::Idct;
use crate::image::{Block, BlockGrid, Plane};
use crate::quantization_table::QuantizationTable;

/// Turns coefficient blocks into IDCT input for one component.
pub(crate) struct Dequantizer {
    multipliers: [f32; 64],
}

impl Dequantizer {
    pub(crate) fn new(table: &QuantizationTable, idct: &dyn Idct) -> Self {
        Dequantizer {
            multipliers: idct.multipliers(table),
        }
    }

    pub(crate) fn dequantize(&self, block: &Block) -> [f32; 64] {
        let mut coefficients = [0f32; 64];
        for ((out, &coefficient), &multiplier) in coefficients
            .iter_mut()
            .zip(block.0.iter())
            .zip(self.multipliers.iter())
        {
            *out = coefficient as f32 * multiplier;
        }
        coefficients
    }
}

/// Dequantizes and inverse transforms every block of a component into a plane of
/// `grid.cols * 8` by `grid.rows * 8` samples.
pub(crate) fn reconstruct_plane(grid: &BlockGrid, dequantizer: &Dequantizer, idct: &dyn Idct) -> Plane {
    let mut plane = Plane::new(grid.cols * Block::WIDTH, grid.rows * Block::WIDTH);
    let mut samples = [0u8; 64];

    for (i, block) in grid.blocks.iter().enumerate() {
        let (col, row) = (i % grid.cols, i / grid.cols);
        idct.transform(&dequantizer.dequantize(block), &mut samples);

        for y in 0..Block::WIDTH {
            let start = (row * Block::WIDTH + y) * plane.width + col * Block::WIDTH;
            plane.samples[start..start + Block::WIDTH]
                .copy_from_slice(&samples[y * Block::WIDTH..(y + 1) * Block::WIDTH]);
        }
    }

    plane
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idct::IdctKind;
    use crate::sample_precision::SamplePrecision;
    use anyhow::Result;

    #[test]
    fn test_dequantize_multiplies_in_natural_order() -> Result<()> {
        let raw: Vec<u16> = (1..=64).collect();
        let table = QuantizationTable::from_dqt(SamplePrecision::EightBit, &raw, false)?;
        let idct = IdctKind::Reference.build();
        let dequantizer = Dequantizer::new(&table, idct.as_ref());

        let mut block = Block::default();
        block.0[0] = 3;
        block.0[9] = -2;
        let coefficients = dequantizer.dequantize(&block);

        assert_eq!(coefficients[0], 3.0);
        assert_eq!(coefficients[9], -20.0);
        assert_eq!(coefficients[1], 0.0);

        Ok(())
    }

    #[test]
    fn test_reconstruct_places_blocks() -> Result<()> {
        let table = QuantizationTable::from_dqt(SamplePrecision::EightBit, &[8; 64], true)?;
        let idct = IdctKind::Aan.build();
        let dequantizer = Dequantizer::new(&table, idct.as_ref());

        let mut grid = BlockGrid::new(2, 2)?;
        for (i, block) in grid.blocks.iter_mut().enumerate() {
            block.0[0] = i as i32 * 10;
        }

        let plane = reconstruct_plane(&grid, &dequantizer, idct.as_ref());
        assert_eq!((plane.width(), plane.height()), (16, 16));
        assert_eq!(plane.get(0, 0), 128);
        assert_eq!(plane.get(15, 0), 138);
        assert_eq!(plane.get(0, 15), 148);
        assert_eq!(plane.get(9, 12), 158);

        Ok(())
    }
}
