use crate::color_spaces::ColorConversion;
use crate::idct::IdctKind;
use crate::upsampler::UpsamplingMethod;
use std::fmt;

/// Called with the byte offset reached after each marker segment or scan.
pub type ProgressCallback = Box<dyn FnMut(usize) + Send>;

/// Colour space of the planes handed back by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputColorSpace {
    /// Whatever the stream encodes: gray, YCbCr or RGB.
    #[default]
    Native,
    /// YCbCr converted to RGB. Gray and RGB images are left alone.
    Rgb,
}

/// Knobs for one decode.
pub struct DecoderOptions {
    pub idct: IdctKind,
    pub upsampling: UpsamplingMethod,
    pub color_conversion: ColorConversion,
    pub output: OutputColorSpace,
    /// Reconstruct components on the rayon thread pool.
    pub parallel: bool,
    /// Rescale every quantization table to this IJG quality before dequantizing.
    pub quality_override: Option<u8>,
    pub(crate) progress: Option<ProgressCallback>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            idct: IdctKind::default(),
            upsampling: UpsamplingMethod::default(),
            color_conversion: ColorConversion::default(),
            output: OutputColorSpace::default(),
            parallel: true,
            quality_override: None,
            progress: None,
        }
    }
}

impl DecoderOptions {
    pub fn with_idct(mut self, idct: IdctKind) -> Self {
        self.idct = idct;
        self
    }

    pub fn with_upsampling(mut self, upsampling: UpsamplingMethod) -> Self {
        self.upsampling = upsampling;
        self
    }

    pub fn with_color_conversion(mut self, color_conversion: ColorConversion) -> Self {
        self.color_conversion = color_conversion;
        self
    }

    pub fn with_output(mut self, output: OutputColorSpace) -> Self {
        self.output = output;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_quality_override(mut self, quality: u8) -> Self {
        self.quality_override = Some(quality);
        self
    }

    pub fn with_progress(mut self, progress: impl FnMut(usize) + Send + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub(crate) fn report_progress(&mut self, position: usize) {
        if let Some(progress) = self.progress.as_mut() {
            progress(position);
        }
    }
}

impl fmt::Debug for DecoderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderOptions")
            .field("idct", &self.idct)
            .field("upsampling", &self.upsampling)
            .field("color_conversion", &self.color_conversion)
            .field("output", &self.output)
            .field("parallel", &self.parallel)
            .field("quality_override", &self.quality_override)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
