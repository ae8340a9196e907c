use super::fingerprint::Fingerprint;
use crate::error::{PipelineError, PipelineResult};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageReader, Limits};
use std::io::Cursor;

/// Largest accepted width or height, in pixels.
const MAX_DIMENSION: u32 = 8192;

/// Decoder allocation ceiling.
const MAX_DECODE_ALLOC: u64 = 512 * 1024 * 1024;

/// A normalized upload: RGBA8 PNG bytes plus their digest.
#[derive(Debug, Clone)]
pub struct CanonicalImage {
    pub bytes: Vec<u8>,
    pub fingerprint: Fingerprint,
    pub width: u32,
    pub height: u32,
}

/// Decodes `raw` and re-encodes it to the canonical PNG form.
///
/// The output only depends on the decoded pixels: the pixel buffer is always
/// expanded to RGBA8 so palette, grayscale and RGB sources collapse to the same
/// layout, and the PNG encoder runs with fixed settings and writes no ancillary
/// chunks.
///
/// # Errors
/// * [`PipelineError::TooLarge`] if `raw` is longer than `max_bytes`. Checked
///   before any decoding.
/// * [`PipelineError::InvalidInput`] if the bytes are not a supported image or
///   exceed the decode limits.
pub fn canonicalize(raw: &[u8], max_bytes: usize) -> PipelineResult<CanonicalImage> {
    if raw.len() > max_bytes {
        return Err(PipelineError::TooLarge {
            size: raw.len(),
            limit: max_bytes,
        });
    }
    if raw.is_empty() {
        return Err(PipelineError::InvalidInput("empty upload".to_string()));
    }

    let mut reader = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;
    if reader.format().is_none() {
        return Err(PipelineError::InvalidInput(
            "unrecognized image format".to_string(),
        ));
    }

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DIMENSION);
    limits.max_image_height = Some(MAX_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    reader.limits(limits);

    let decoded = reader
        .decode()
        .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    let bytes = encode_png(rgba.as_raw(), width, height)?;
    let fingerprint = Fingerprint::of(&bytes);

    tracing::debug!(
        "Canonicalized {}x{} upload ({} -> {} bytes, fp {})",
        width,
        height,
        raw.len(),
        bytes.len(),
        fingerprint.short()
    );

    Ok(CanonicalImage {
        bytes,
        fingerprint,
        width,
        height,
    })
}

fn encode_png(rgba: &[u8], width: u32, height: u32) -> PipelineResult<Vec<u8>> {
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    encoder
        .write_image(rgba, width, height, ExtendedColorType::Rgba8)
        .map_err(|e| PipelineError::InvalidInput(format!("re-encode failed: {}", e)))?;
    Ok(out)
}
