//! Baseline and progressive JPEG (ITU-T T.81) decoding into per-component sample planes.

/// The decoder takes as input compressed image data and table specifications, and by means of a
/// specific set of procedures generates as output `digital reconstructed image data`.
pub mod decoder;

pub mod bitreader;
pub mod color_spaces;
pub mod error;
pub mod huffman_tree;
pub mod idct;
pub mod image;
pub mod jfif;
pub mod options;
pub mod quantization_table;
pub mod upsampler;

mod coding;
mod dequantizer;
mod entropy_decoder;
pub(crate) mod frame_header;
pub(crate) mod marker;
pub(crate) mod parser;
pub(crate) mod sample_precision;
pub(crate) mod scan_header;

#[cfg(test)]
mod test_utils;

pub use color_spaces::{ColorConversion, ColorSpace};
pub use decoder::Decoder;
pub use error::{DecodeError, ErrorKind};
pub use idct::IdctKind;
pub use image::{Image, Plane};
pub use jfif::{Density, DensityUnit, Metadata};
pub use options::{DecoderOptions, OutputColorSpace};
pub use sample_precision::SamplePrecision;
pub use upsampler::UpsamplingMethod;
