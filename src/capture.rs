//! Readback encoding: raw RGBA8 pixels to a base64 data URI.
//!
//! The output format mirrors a 2D canvas `toDataURL` call:
//! `data:<mime>;base64,<payload>`. JPEG drops the alpha channel (the format
//! has none); WebP is written lossless, so the quality fraction only affects
//! JPEG output.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::error::{Error, Result};
use crate::ImageEncoding;

/// Encode a top-left-origin RGBA8 readback into a data URI.
///
/// `quality` is a fraction in (0, 1]; callers should pass
/// [`ScreenshotRequest::effective_quality`](crate::ScreenshotRequest::effective_quality)
/// so the zero-means-default quirk is applied consistently.
pub fn encode_frame(
    pixels: &[u8],
    width: u32,
    height: u32,
    encoding: ImageEncoding,
    quality: f32,
) -> Result<String> {
    if width == 0 || height == 0 || pixels.len() != width as usize * height as usize * 4 {
        return Err(Error::SurfaceUnavailable(format!(
            "readback is {} bytes for a {}x{} target",
            pixels.len(),
            width,
            height
        )));
    }

    let mut out = Cursor::new(Vec::new());

    match encoding {
        ImageEncoding::Png => {
            PngEncoder::new(&mut out)
                .write_image(pixels, width, height, ExtendedColorType::Rgba8)
                .map_err(|e| Error::EncodeFailure(format!("png: {}", e)))?;
        }
        ImageEncoding::Jpg => {
            // JPEG has no alpha; strip to RGB
            let rgb: Vec<u8> = pixels
                .chunks_exact(4)
                .flat_map(|px| &px[..3])
                .copied()
                .collect();
            let q = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
            JpegEncoder::new_with_quality(&mut out, q)
                .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
                .map_err(|e| Error::EncodeFailure(format!("jpeg: {}", e)))?;
        }
        ImageEncoding::Webp => {
            WebPEncoder::new_lossless(&mut out)
                .write_image(pixels, width, height, ExtendedColorType::Rgba8)
                .map_err(|e| Error::EncodeFailure(format!("webp: {}", e)))?;
        }
    }

    Ok(format!(
        "data:{};base64,{}",
        encoding.mime(),
        BASE64.encode(out.into_inner())
    ))
}
