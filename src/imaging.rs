//! Signature image decoding.
//!
//! The signature pad hands us a `data:image/png;base64,...` URI. We strip the
//! prefix, base64-decode the payload and decode the PNG into an RGBA raster
//! that both PDF writers can embed.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{ImageFormat, RgbaImage};

use crate::error::{Result, SignError};
use crate::layout::Shade;

/// Returns the raw bytes behind a `data:image/<fmt>;base64,<payload>` URI.
///
/// A string without the prefix is decoded as bare base64.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let trimmed = uri.trim();
    let payload = match trimmed.strip_prefix("data:image/") {
        Some(rest) => {
            let (format, payload) = rest.split_once(";base64,").ok_or_else(|| {
                SignError::ImageDecodeError("data URI is not base64-encoded".into())
            })?;
            if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(SignError::ImageDecodeError(format!(
                    "unsupported image type {:?}",
                    format
                )));
            }
            payload
        }
        None => trimmed,
    };

    if payload.is_empty() {
        return Err(SignError::ImageDecodeError("empty image payload".into()));
    }

    BASE64
        .decode(payload)
        .map_err(|e| SignError::ImageDecodeError(format!("invalid base64: {}", e)))
}

/// A decoded signature raster.
#[derive(Debug, Clone)]
pub struct SignatureImage {
    pixels: RgbaImage,
}

impl SignatureImage {
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let bytes = decode_data_uri(uri)?;
        Self::from_png(&bytes)
    }

    pub fn from_png(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|e| SignError::ImageDecodeError(format!("Failed to decode PNG: {}", e)))?;
        let pixels = decoded.to_rgba8();
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(SignError::ImageDecodeError("image has no pixels".into()));
        }
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Splits the raster into interleaved RGB samples and a separate alpha
    /// channel, for writers that support soft masks.
    pub fn rgb_and_alpha(&self) -> (Vec<u8>, Vec<u8>) {
        let pixel_count = (self.width() * self.height()) as usize;
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(pixel_count);

        for pixel in self.pixels.pixels() {
            let [r, g, b, a] = pixel.0;
            rgb.extend_from_slice(&[r, g, b]);
            alpha.push(a);
        }
        (rgb, alpha)
    }

    /// Flattens the raster over a solid background colour.
    pub fn rgb_over(&self, background: Shade) -> Vec<u8> {
        let bg = [
            background.0 * 255.0,
            background.1 * 255.0,
            background.2 * 255.0,
        ];
        let mut rgb = Vec::with_capacity((self.width() * self.height() * 3) as usize);

        for pixel in self.pixels.pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = a as f32 / 255.0;
            for (channel, backdrop) in [r, g, b].into_iter().zip(bg) {
                let blended = channel as f32 * alpha + backdrop * (1.0 - alpha);
                rgb.push(blended.round().clamp(0.0, 255.0) as u8);
            }
        }
        rgb
    }
}
