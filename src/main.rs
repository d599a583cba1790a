use anyhow::Result;
use clap::{Parser, ValueEnum};
use jpeg_decode::{
    ColorConversion, Decoder, DecoderOptions, IdctKind, OutputColorSpace, UpsamplingMethod,
};
use log::info;
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IdctArg {
    Aan,
    Reference,
}

impl From<IdctArg> for IdctKind {
    fn from(arg: IdctArg) -> Self {
        match arg {
            IdctArg::Aan => IdctKind::Aan,
            IdctArg::Reference => IdctKind::Reference,
        }
    }
}

#[derive(Parser)]
struct Opt {
    /// Input JPEG file
    input: PathBuf,

    /// Inverse DCT used for reconstruction
    #[clap(long, value_enum, default_value = "aan")]
    idct: IdctArg,

    /// Convert YCbCr images to RGB planes
    #[clap(long)]
    rgb: bool,

    /// Interpolate subsampled chroma instead of repeating samples
    #[clap(long)]
    bilinear: bool,

    /// Use floating point YCbCr conversion instead of lookup tables
    #[clap(long)]
    float_color: bool,

    /// Rescale quantization tables to this quality (1-100) before dequantizing
    #[clap(long)]
    quality: Option<u8>,

    /// Reconstruct components on the calling thread only
    #[clap(long)]
    single_threaded: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let opt = Opt::parse();
    let mut decoder = Decoder::from_file(File::open(&opt.input)?)?;

    let mut options = DecoderOptions::default()
        .with_idct(opt.idct.into())
        .with_parallel(!opt.single_threaded);
    if opt.rgb {
        options = options.with_output(OutputColorSpace::Rgb);
    }
    if opt.bilinear {
        options = options.with_upsampling(UpsamplingMethod::Bilinear);
    }
    if opt.float_color {
        options = options.with_color_conversion(ColorConversion::Float);
    }
    if let Some(quality) = opt.quality {
        options = options.with_quality_override(quality);
    }
    *decoder.options_mut() = options;

    let start = Instant::now();
    let image = decoder.decode()?;
    info!("decode took {:?}", start.elapsed());

    println!("Image size: {} x {}", image.width(), image.height());
    println!("Color space: {:?}", image.color_space());
    println!(
        "Process: {}",
        if image.is_progressive() { "progressive" } else { "baseline" }
    );
    println!("Scans: {}", image.scans());
    match image.density() {
        Some(density) => println!("Density: {} x {} ({:?})", density.x, density.y, density.unit),
        None => println!("Density: unspecified"),
    }
    if image.restart_underruns() > 0 {
        println!("Restart underruns padded: {}", image.restart_underruns());
    }

    let metadata = decoder.metadata();
    for (n, payload) in metadata.app_segments.iter() {
        println!("APP{n}: {} bytes", payload.len());
    }
    for comment in metadata.comments.iter() {
        println!("Comment: {}", String::from_utf8_lossy(comment));
    }

    Ok(())
}
