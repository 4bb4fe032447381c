//! Configuration module for pdfbinder.
//!
//! Two kinds of settings live here:
//! - [`MergeOptions`]: the per-run choices the user makes (quality tier and
//!   fit mode), captured as an immutable snapshot when a run starts
//! - [`PipelineConfig`]: tunables of the pipeline itself (staging
//!   concurrency, progress split, output naming)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PdfBinderError, Result};

/// Default number of images normalized concurrently during staging.
pub const DEFAULT_STAGING_CONCURRENCY: usize = 10;

/// Default share of the progress scale reserved for staging, in percent.
pub const DEFAULT_STAGING_SHARE: f64 = 15.0;

/// Default product name used in output file names.
pub const DEFAULT_PRODUCT_NAME: &str = "PdfBinder";

/// Quality preset applied to images before embedding.
///
/// Ordered from best to smallest; each step lowers both encoder quality and
/// the resolution cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QualityTier {
    /// Original quality, no compression.
    #[default]
    Maximum,
    /// Sharp images, roughly 300 DPI on A4.
    High,
    /// Balanced size and quality, roughly 150 DPI on A4.
    Standard,
    /// Smallest output, roughly 72 DPI on A4.
    Compressed,
}

impl QualityTier {
    /// All tiers, best first.
    pub const ALL: [QualityTier; 4] = [
        QualityTier::Maximum,
        QualityTier::High,
        QualityTier::Standard,
        QualityTier::Compressed,
    ];

    /// Short description shown next to the tier in selection lists.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Maximum => "Original quality, no compression",
            Self::High => "Sharp images, 300 DPI equivalent",
            Self::Standard => "Balanced size/quality, 150 DPI",
            Self::Compressed => "Smallest size, 72 DPI equivalent",
        }
    }

    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maximum => "maximum",
            Self::High => "high",
            Self::Standard => "standard",
            Self::Compressed => "compressed",
        }
    }
}

impl FromStr for QualityTier {
    type Err = PdfBinderError;

    /// Parse a tier from "maximum", "high", "standard" or "compressed".
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "maximum" | "max" => Ok(Self::Maximum),
            "high" => Ok(Self::High),
            "standard" => Ok(Self::Standard),
            "compressed" => Ok(Self::Compressed),
            _ => Err(PdfBinderError::invalid_config(format!(
                "Invalid quality tier: {s}. Must be one of: maximum, high, standard, compressed"
            ))),
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How images are pre-scaled before the resolution cap.
///
/// Never affects PDF pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FitMode {
    /// Keep the source dimensions.
    #[default]
    Original,
    /// Cap the width at an A4 page width at 300 DPI.
    Width,
    /// Cap the height at an A4 page height at 300 DPI.
    Height,
}

impl FitMode {
    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Width => "width",
            Self::Height => "height",
        }
    }
}

impl FromStr for FitMode {
    type Err = PdfBinderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "original" | "none" => Ok(Self::Original),
            "width" => Ok(Self::Width),
            "height" => Ok(Self::Height),
            _ => Err(PdfBinderError::invalid_config(format!(
                "Invalid fit mode: {s}. Must be one of: original, width, height"
            ))),
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options chosen for a single merge run.
///
/// Copied into the run when it launches; later edits by the user only affect
/// the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOptions {
    /// Quality tier for images.
    pub quality: QualityTier,
    /// Fit mode for images.
    pub fit: FitMode,
}

impl MergeOptions {
    /// Create options from a tier and a fit mode.
    pub fn new(quality: QualityTier, fit: FitMode) -> Self {
        Self { quality, fit }
    }
}

/// Tunables of the merge pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Maximum number of files staged concurrently.
    pub staging_concurrency: usize,

    /// Percentage of the progress scale reserved for staging. The merge
    /// executor reports into the remainder.
    pub staging_share: f64,

    /// Product name used as the output file name prefix.
    pub product_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            staging_concurrency: DEFAULT_STAGING_CONCURRENCY,
            staging_share: DEFAULT_STAGING_SHARE,
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Staging concurrency is zero
    /// - The staging share is outside `[0, 100)`
    /// - The product name is blank or contains path separators
    pub fn validate(&self) -> Result<()> {
        if self.staging_concurrency == 0 {
            return Err(PdfBinderError::invalid_config(
                "Staging concurrency must be at least 1",
            ));
        }

        if !(0.0..100.0).contains(&self.staging_share) {
            return Err(PdfBinderError::invalid_config(format!(
                "Staging share must be in [0, 100), got {}",
                self.staging_share
            )));
        }

        let name = self.product_name.trim();
        if name.is_empty() {
            return Err(PdfBinderError::invalid_config(
                "Product name cannot be empty",
            ));
        }
        if name.contains(['/', '\\']) {
            return Err(PdfBinderError::invalid_config(format!(
                "Product name cannot contain path separators: {name}"
            )));
        }

        Ok(())
    }

    /// Staging concurrency, never below one.
    pub fn effective_concurrency(&self) -> usize {
        self.staging_concurrency.max(1)
    }
}
