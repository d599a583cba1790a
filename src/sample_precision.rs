use crate::error::{malformed, unsupported};
use anyhow::Result;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SamplePrecision {
    EightBit,
    SixteenBit,
}

impl SamplePrecision {
    /// Element precision of a quantization table, from the DQT `Pq` nibble.
    pub(crate) fn decode(pq: u8) -> Result<Self> {
        match pq {
            0 => Ok(SamplePrecision::EightBit),
            1 => Ok(SamplePrecision::SixteenBit),
            _ => Err(malformed(format!("quantization table precision {pq} is neither 0 nor 1"))),
        }
    }

    /// Sample precision of a frame, from the SOF `P` field. Only 8-bit samples are decoded.
    pub(crate) fn parse(number_of_bits: u8) -> Result<Self> {
        match number_of_bits {
            8 => Ok(SamplePrecision::EightBit),
            12 | 16 => Err(unsupported(format!("{number_of_bits}-bit sample precision"))),
            _ => Err(malformed(format!("sample precision of {number_of_bits} bits"))),
        }
    }

    /// Largest legal quantizer for this precision.
    pub(crate) fn max_value(&self) -> u16 {
        match self {
            SamplePrecision::EightBit => 255,
            SamplePrecision::SixteenBit => 32767,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, ErrorKind};

    #[test]
    fn test_frame_precision() -> Result<()> {
        assert_eq!(SamplePrecision::parse(8)?, SamplePrecision::EightBit);

        let err = SamplePrecision::parse(12).unwrap_err();
        assert_eq!(DecodeError::kind_of(&err), Some(ErrorKind::UnsupportedFeature));

        let err = SamplePrecision::parse(7).unwrap_err();
        assert_eq!(DecodeError::kind_of(&err), Some(ErrorKind::MalformedHeader));

        Ok(())
    }

    #[test]
    fn test_table_precision() -> Result<()> {
        assert_eq!(SamplePrecision::decode(0)?, SamplePrecision::EightBit);
        assert_eq!(SamplePrecision::decode(1)?, SamplePrecision::SixteenBit);
        assert!(SamplePrecision::decode(2).is_err());

        Ok(())
    }
}
