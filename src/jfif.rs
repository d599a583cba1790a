use crate::error::malformed;
use anyhow::Result;

const JFIF_IDENTIFIER: &[u8] = b"JFIF\0";
const JFXX_IDENTIFIER: &[u8] = b"JFXX\0";
const ADOBE_IDENTIFIER: &[u8] = b"Adobe";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityUnit {
    /// Only the aspect ratio is meaningful.
    None,
    DotsPerInch,
    DotsPerCentimeter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Density {
    pub unit: DensityUnit,
    pub x: u16,
    pub y: u16,
}

/// Thumbnail encodings a JFXX extension segment can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailFormat {
    Jpeg,
    Palette,
    Rgb,
}

/// The JFIF APP0 header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jfif {
    pub version: (u8, u8),
    pub density: Density,
    pub thumbnail_width: u8,
    pub thumbnail_height: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum App0 {
    Jfif(Jfif),
    Extension(ThumbnailFormat),
    /// APP0 written by something other than JFIF.
    Other,
}

/// Application segments and comments, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// `(n, payload)` for every APPn segment, in stream order.
    pub app_segments: Vec<(u8, Vec<u8>)>,
    pub comments: Vec<Vec<u8>>,
    pub jfif: Option<Jfif>,
    pub thumbnail_formats: Vec<ThumbnailFormat>,
    /// Transform flag of an Adobe APP14 segment: 0 unconverted, 1 YCbCr, 2 YCCK.
    pub adobe_transform: Option<u8>,
}

pub(crate) fn parse_app0(payload: &[u8]) -> Result<App0> {
    if let Some(rest) = payload.strip_prefix(JFIF_IDENTIFIER) {
        return parse_jfif(rest).map(App0::Jfif);
    }

    if let Some(rest) = payload.strip_prefix(JFXX_IDENTIFIER) {
        let format = match rest.first() {
            Some(0x10) => ThumbnailFormat::Jpeg,
            Some(0x11) => ThumbnailFormat::Palette,
            Some(0x13) => ThumbnailFormat::Rgb,
            Some(code) => return Err(malformed(format!("JFXX extension code {code:#04x}"))),
            None => return Err(malformed("JFXX segment without an extension code")),
        };
        return Ok(App0::Extension(format));
    }

    Ok(App0::Other)
}

fn parse_jfif(rest: &[u8]) -> Result<Jfif> {
    let [major, minor, unit, xd_hi, xd_lo, yd_hi, yd_lo, thumbnail_width, thumbnail_height, thumbnail @ ..] =
        rest
    else {
        return Err(malformed(format!("JFIF segment of {} bytes", rest.len() + 5)));
    };

    let unit = match *unit {
        0 => DensityUnit::None,
        1 => DensityUnit::DotsPerInch,
        2 => DensityUnit::DotsPerCentimeter,
        _ => return Err(malformed(format!("JFIF density unit {unit}"))),
    };

    let x = u16::from_be_bytes([*xd_hi, *xd_lo]);
    let y = u16::from_be_bytes([*yd_hi, *yd_lo]);
    if x == 0 || y == 0 {
        return Err(malformed(format!("JFIF density {x}x{y}")));
    }

    let expected = 3 * *thumbnail_width as usize * *thumbnail_height as usize;
    if thumbnail.len() < expected {
        return Err(malformed(format!(
            "JFIF thumbnail needs {expected} bytes, segment has {}",
            thumbnail.len()
        )));
    }

    Ok(Jfif {
        version: (*major, *minor),
        density: Density { unit, x, y },
        thumbnail_width: *thumbnail_width,
        thumbnail_height: *thumbnail_height,
    })
}

/// Returns the transform flag of an Adobe APP14 segment, or `None` for other APP14 payloads.
pub(crate) fn parse_adobe(payload: &[u8]) -> Option<u8> {
    match payload.strip_prefix(ADOBE_IDENTIFIER)? {
        [_, _, _, _, _, _, transform, ..] => Some(*transform),
        _ => None,
    }
}
