//! Decoded Image Data
//!
//! The crate's one image representation: an immutable rectangular grid of
//! RGBA bytes, decoded once at the boundary and then treated as read-only by
//! every analysis pass. Compositing never mutates an [`ImageData`] in place;
//! it builds a new one.
//!
//! # Boundary codecs
//!
//! Callers hand us either a `data:image/...;base64,` URL (the shape browsers
//! produce for uploaded avatars) or raw encoded bytes. Both decode through
//! the `image` crate into RGBA8. The reverse direction always encodes PNG,
//! which is lossless for RGBA and keeps round trips byte-stable.
//!
//! # Resampling
//!
//! Two deterministic resamplers are provided:
//!
//! - [`ImageData::resample`]: box average, used by the palette extractor's
//!   fixed 64x64 grid. Averaging is the right call there because bucket
//!   counts should reflect area coverage.
//! - [`ImageData::resample_nearest`]: nearest source pixel, used when
//!   bounding analysis cost on oversized inputs. Nearest preserves the
//!   quantized color structure that the distinct-color metric depends on,
//!   where averaging would invent intermediate colors.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::AnalysisError;

/// Number of bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// A decoded RGBA image: width x height pixels, 4 bytes each, row-major.
///
/// The buffer length is validated at construction (`4 * width * height`)
/// and zero-area images are rejected, so every constructed value is safe to
/// index within its dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Width in pixels. Always non-zero.
    pub width: u32,
    /// Height in pixels. Always non-zero.
    pub height: u32,
    /// RGBA bytes, row-major, exactly `4 * width * height` long.
    pub data: Vec<u8>,
}

impl ImageData {
    /// Create an image from raw RGBA bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] for zero-area dimensions or a
    /// buffer whose length does not match `4 * width * height`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, AnalysisError> {
        if width == 0 || height == 0 {
            return Err(AnalysisError::invalid_input(format!(
                "zero-area image ({width}x{height})"
            )));
        }
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(AnalysisError::invalid_input(format!(
                "pixel buffer length {} does not match {width}x{height} RGBA (expected {expected})",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Decode an image from raw encoded bytes (PNG, JPEG, GIF, WebP, ...).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] when the bytes are not a
    /// decodable image.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, AnalysisError> {
        let decoded = image::load_from_memory(bytes).map_err(|e| {
            AnalysisError::invalid_input(format!("undecodable image bytes: {e}"))
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new(width, height, rgba.into_raw())
    }

    /// Decode an image from a `data:image/...;base64,` URL.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] when the URL is not a base64
    /// data URL or its payload is not a decodable image.
    pub fn from_data_url(url: &str) -> Result<Self, AnalysisError> {
        let Some(rest) = url.strip_prefix("data:") else {
            return Err(AnalysisError::invalid_input(
                "not a data URL (missing `data:` prefix)",
            ));
        };
        let Some((_media_type, encoded)) = rest.split_once(";base64,") else {
            return Err(AnalysisError::invalid_input(
                "data URL is not base64-encoded",
            ));
        };
        let payload = BASE64.decode(encoded.as_bytes()).map_err(|e| {
            AnalysisError::invalid_input(format!("invalid base64 payload: {e}"))
        })?;
        Self::from_encoded(&payload)
    }

    /// Encode this image as a PNG `data:image/png;base64,` URL.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] if PNG encoding fails, which
    /// for a validated buffer indicates a bug rather than bad user input.
    pub fn to_data_url(&self) -> Result<String, AnalysisError> {
        let buffer = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| AnalysisError::invalid_input("pixel buffer/dimension mismatch"))?;
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(buffer)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| AnalysisError::invalid_input(format!("PNG encoding failed: {e}")))?;
        Ok(format!("data:image/png;base64,{}", BASE64.encode(&png)))
    }

    /// The RGBA bytes of the pixel at `(x, y)`.
    ///
    /// Callers must stay within the image dimensions; all internal loops do.
    #[inline]
    #[must_use]
    pub fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// The red channel of the pixel at `(x, y)`.
    #[inline]
    #[must_use]
    pub fn red(&self, x: u32, y: u32) -> u8 {
        self.data[(y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL]
    }

    /// Total number of pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Deterministic box-average resample to `width x height`.
    ///
    /// Each target pixel is the channel-wise mean of its source box. Target
    /// dimensions are clamped to at least 1.
    #[must_use]
    pub fn resample(&self, width: u32, height: u32) -> ImageData {
        let tw = width.max(1);
        let th = height.max(1);
        let mut data = Vec::with_capacity(tw as usize * th as usize * BYTES_PER_PIXEL);

        for ty in 0..th {
            let y0 = (u64::from(ty) * u64::from(self.height) / u64::from(th)) as u32;
            let y1 = ((u64::from(ty) + 1) * u64::from(self.height) / u64::from(th)) as u32;
            let y1 = y1.max(y0 + 1).min(self.height);
            for tx in 0..tw {
                let x0 = (u64::from(tx) * u64::from(self.width) / u64::from(tw)) as u32;
                let x1 = ((u64::from(tx) + 1) * u64::from(self.width) / u64::from(tw)) as u32;
                let x1 = x1.max(x0 + 1).min(self.width);

                let mut sums = [0u64; 4];
                for sy in y0..y1 {
                    for sx in x0..x1 {
                        let px = self.rgba(sx, sy);
                        for (sum, channel) in sums.iter_mut().zip(px.iter()) {
                            *sum += u64::from(*channel);
                        }
                    }
                }
                let count = u64::from(y1 - y0) * u64::from(x1 - x0);
                for sum in sums {
                    data.push((sum / count) as u8);
                }
            }
        }

        ImageData {
            width: tw,
            height: th,
            data,
        }
    }

    /// Deterministic nearest-pixel resample to `width x height`.
    ///
    /// Target dimensions are clamped to at least 1.
    #[must_use]
    pub fn resample_nearest(&self, width: u32, height: u32) -> ImageData {
        let tw = width.max(1);
        let th = height.max(1);
        let mut data = Vec::with_capacity(tw as usize * th as usize * BYTES_PER_PIXEL);

        for ty in 0..th {
            let sy = (u64::from(ty) * u64::from(self.height) / u64::from(th)) as u32;
            for tx in 0..tw {
                let sx = (u64::from(tx) * u64::from(self.width) / u64::from(tw)) as u32;
                data.extend_from_slice(&self.rgba(sx, sy));
            }
        }

        ImageData {
            width: tw,
            height: th,
            data,
        }
    }

    /// A nearest-resampled copy fitting within `max_dim` on the longest
    /// side, or `None` when the image already fits (or `max_dim` is 0,
    /// meaning unbounded).
    #[must_use]
    pub fn bounded(&self, max_dim: u32) -> Option<ImageData> {
        if max_dim == 0 || self.width.max(self.height) <= max_dim {
            return None;
        }
        let (tw, th) = if self.width >= self.height {
            (
                max_dim,
                ((u64::from(self.height) * u64::from(max_dim) / u64::from(self.width)) as u32)
                    .max(1),
            )
        } else {
            (
                ((u64::from(self.width) * u64::from(max_dim) / u64::from(self.height)) as u32)
                    .max(1),
                max_dim,
            )
        };
        Some(self.resample_nearest(tw, th))
    }

    /// CRC32 fingerprint over dimensions and pixel bytes.
    ///
    /// Used as the cache key component for enhancement results; identical
    /// pixels always produce identical fingerprints.
    #[must_use]
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.width.to_le_bytes());
        hasher.update(&self.height.to_le_bytes());
        hasher.update(&self.data);
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> ImageData {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width * height) {
            data.extend_from_slice(&rgba);
        }
        ImageData::new(width, height, data).unwrap()
    }

    #[test]
    fn test_rejects_zero_area() {
        let err = ImageData::new(0, 32, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("zero-area"));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = ImageData::new(2, 2, vec![0u8; 15]).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_data_url_round_trip() {
        let original = solid(5, 3, [200, 30, 90, 255]);
        let url = original.to_data_url().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));

        let decoded = ImageData::from_data_url(&url).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_from_data_url_rejects_garbage() {
        assert!(ImageData::from_data_url("http://example.com/a.png").is_err());
        assert!(ImageData::from_data_url("data:image/png;base64,!!!!").is_err());
        assert!(ImageData::from_data_url("data:image/png,rawpayload").is_err());
    }

    #[test]
    fn test_box_resample_of_solid_stays_solid() {
        let img = solid(100, 80, [10, 120, 240, 255]);
        let small = img.resample(64, 64);
        assert_eq!(small.width, 64);
        assert_eq!(small.height, 64);
        for y in 0..64 {
            for x in 0..64 {
                assert_eq!(small.rgba(x, y), [10, 120, 240, 255]);
            }
        }
    }

    #[test]
    fn test_nearest_resample_preserves_palette() {
        // Two vertical halves; nearest sampling must not invent blend colors.
        let mut data = Vec::new();
        for _y in 0..10 {
            for x in 0..10 {
                if x < 5 {
                    data.extend_from_slice(&[250, 0, 0, 255]);
                } else {
                    data.extend_from_slice(&[0, 0, 250, 255]);
                }
            }
        }
        let img = ImageData::new(10, 10, data).unwrap();
        let small = img.resample_nearest(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                let px = small.rgba(x, y);
                assert!(px == [250, 0, 0, 255] || px == [0, 0, 250, 255]);
            }
        }
    }

    #[test]
    fn test_bounded_only_shrinks() {
        let img = solid(400, 200, [1, 2, 3, 255]);
        assert!(img.bounded(0).is_none());
        assert!(img.bounded(400).is_none());

        let shrunk = img.bounded(100).unwrap();
        assert_eq!(shrunk.width, 100);
        assert_eq!(shrunk.height, 50);
    }

    #[test]
    fn test_fingerprint_tracks_content_and_dims() {
        let a = solid(4, 4, [9, 9, 9, 255]);
        let b = solid(4, 4, [9, 9, 9, 255]);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = solid(4, 4, [9, 9, 10, 255]);
        assert_ne!(a.fingerprint(), c.fingerprint());

        // Same bytes, different shape.
        let wide = solid(8, 2, [9, 9, 9, 255]);
        assert_ne!(a.fingerprint(), wide.fingerprint());
    }
}
