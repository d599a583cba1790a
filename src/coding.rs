use crate::error::unsupported;
use anyhow::Result;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Operation {
    Sequential,
    Progressive,
    Lossless,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum EntropyCoding {
    Huffman,
    Arithmetic,
}

/// What a SOFn marker announces, before deciding whether it can be decoded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct FrameKind {
    pub(crate) differential: bool,
    pub(crate) operation: Operation,
    pub(crate) entropy_coding: EntropyCoding,
}

impl FrameKind {
    /// Splits the low nibble of a SOF marker. Bit 3 selects arithmetic coding, bit 2 the
    /// differential (hierarchical) processes, bits 0-1 the operation.
    pub(crate) fn from_sof(n: u8) -> Self {
        let operation = match n & 0b11 {
            2 => Operation::Progressive,
            3 => Operation::Lossless,
            _ => Operation::Sequential,
        };

        FrameKind {
            differential: n & 0b100 != 0,
            operation,
            entropy_coding: if n & 0b1000 != 0 {
                EntropyCoding::Arithmetic
            } else {
                EntropyCoding::Huffman
            },
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.differential {
            write!(f, "differential ")?;
        }
        let operation = match self.operation {
            Operation::Sequential => "sequential",
            Operation::Progressive => "progressive",
            Operation::Lossless => "lossless",
        };
        let coding = match self.entropy_coding {
            EntropyCoding::Huffman => "Huffman",
            EntropyCoding::Arithmetic => "arithmetic",
        };
        write!(f, "{operation} {coding}")
    }
}

/// The two processes this crate decodes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CodingProcess {
    BaselineDCT,
    ProgressiveDCT,
}

impl CodingProcess {
    pub(crate) fn from_sof(n: u8) -> Result<Self> {
        match n {
            0 => Ok(CodingProcess::BaselineDCT),
            2 => Ok(CodingProcess::ProgressiveDCT),
            1 => Err(unsupported("SOF1 (extended sequential DCT)")),
            _ => Err(unsupported(format!("SOF{n} ({})", FrameKind::from_sof(n)))),
        }
    }

    pub fn is_progressive(&self) -> bool {
        matches!(self, CodingProcess::ProgressiveDCT)
    }
}
