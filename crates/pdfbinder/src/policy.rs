//! Raster quality and scaling policy.
//!
//! Pure mapping from a [`QualityTier`] and [`FitMode`] to the constraints an
//! image is normalized against. No I/O happens here.

use crate::config::{FitMode, QualityTier};

/// Width cap applied by [`FitMode::Width`] (A4 at 300 DPI).
pub const FIT_WIDTH_PX: u32 = 2480;

/// Height cap applied by [`FitMode::Height`] (A4 at 300 DPI).
pub const FIT_HEIGHT_PX: u32 = 3508;

/// Raster constraints resolved from a quality tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterPolicy {
    /// Encoder quality in `(0, 1]`.
    pub encoder_quality: f32,
    /// Maximum width and height in pixels.
    pub max_resolution: u32,
}

impl RasterPolicy {
    /// Resolve the policy for a tier.
    pub fn for_tier(tier: QualityTier) -> Self {
        let (encoder_quality, max_resolution) = match tier {
            QualityTier::Maximum => (1.0, 8000),
            QualityTier::High => (0.85, 3500),
            QualityTier::Standard => (0.75, 2000),
            QualityTier::Compressed => (0.55, 1000),
        };

        Self {
            encoder_quality,
            max_resolution,
        }
    }

    /// Encoder quality on the JPEG encoder's 1..=100 scale.
    pub fn jpeg_quality(&self) -> u8 {
        (self.encoder_quality * 100.0).round().clamp(1.0, 100.0) as u8
    }

    /// Compute output dimensions for a `width` x `height` source.
    ///
    /// The fit pre-cap runs first and never enlarges; the resolution cap then
    /// scales both sides by the same ratio. Results are at least one pixel.
    pub fn target_dimensions(&self, width: u32, height: u32, fit: FitMode) -> (u32, u32) {
        let mut w = f64::from(width.max(1));
        let mut h = f64::from(height.max(1));

        match fit {
            FitMode::Original => {}
            FitMode::Width => {
                let target = w.min(f64::from(FIT_WIDTH_PX));
                h *= target / w;
                w = target;
            }
            FitMode::Height => {
                let target = h.min(f64::from(FIT_HEIGHT_PX));
                w *= target / h;
                h = target;
            }
        }

        let max = f64::from(self.max_resolution);
        if w > max || h > max {
            let ratio = (max / w).min(max / h);
            w *= ratio;
            h *= ratio;
        }

        (to_pixels(w), to_pixels(h))
    }
}

impl From<QualityTier> for RasterPolicy {
    fn from(tier: QualityTier) -> Self {
        Self::for_tier(tier)
    }
}

fn to_pixels(value: f64) -> u32 {
    value.round().max(1.0) as u32
}
