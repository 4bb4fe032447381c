//! Image normalization: decode, rescale per policy, re-encode as JPEG.
//!
//! Normalization is CPU bound and synchronous; callers run it on the
//! blocking pool.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageReader, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use tracing::debug;

use crate::config::FitMode;
use crate::error::{PdfBinderError, Result};
use crate::policy::RasterPolicy;

/// MIME type of every normalized image.
pub const JPEG_MIME: &str = "image/jpeg";

/// A re-encoded image.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    /// Always [`JPEG_MIME`].
    pub mime: &'static str,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

/// Applies a [`RasterPolicy`] and [`FitMode`] to raster sources.
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    policy: RasterPolicy,
    fit: FitMode,
}

impl ImageNormalizer {
    /// Create a normalizer.
    pub fn new(policy: RasterPolicy, fit: FitMode) -> Self {
        Self { policy, fit }
    }

    /// The policy in use.
    pub fn policy(&self) -> RasterPolicy {
        self.policy
    }

    /// Normalize one image.
    ///
    /// The format is sniffed from the content, not the name. An EXIF
    /// orientation is applied first, so size limits act on the upright image.
    ///
    /// # Errors
    ///
    /// - [`PdfBinderError::Decode`] if the bytes are not a decodable image
    /// - [`PdfBinderError::Encode`] if JPEG encoding fails
    pub fn normalize(&self, name: &str, bytes: &[u8]) -> Result<NormalizedImage> {
        let decoded = decode_upright(bytes).map_err(|e| PdfBinderError::decode(name, e))?;

        let (src_w, src_h) = decoded.dimensions();
        let (width, height) = self.policy.target_dimensions(src_w, src_h, self.fit);

        let resized = if (width, height) == (src_w, src_h) {
            decoded
        } else {
            debug!(name, src_w, src_h, width, height, "Resizing image");
            decoded.resize_exact(width, height, FilterType::CatmullRom)
        };

        let rgb = flatten_on_white(resized);

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.policy.jpeg_quality())
            .encode_image(&rgb)
            .map_err(|e| PdfBinderError::encode(name, e))?;

        Ok(NormalizedImage {
            bytes: out,
            mime: JPEG_MIME,
            width,
            height,
        })
    }
}

/// Decode an image and rotate or flip it per its EXIF orientation.
fn decode_upright(bytes: &[u8]) -> image::ImageResult<DynamicImage> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation()?;

    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Composite an image over an opaque white background and drop alpha.
pub(crate) fn flatten_on_white(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut background =
        RgbaImage::from_pixel(rgba.width(), rgba.height(), Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut background, &rgba, 0, 0);
    DynamicImage::ImageRgba8(background).to_rgb8()
}
