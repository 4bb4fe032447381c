//! CLI argument parsing for pdfbinder.
//!
//! Only `clap` and the standard library are used here; the build script
//! includes this file to render the man page.

use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Assemble PDFs and images into a single PDF.
///
/// Inputs are merged in the order given. Images become one page each,
/// scaled per the quality tier and fit mode. Files that cannot be read as
/// PDFs or images are skipped and listed at the end.
#[derive(Parser, Debug)]
#[command(name = "pdfbinder")]
#[command(version)]
#[command(about = "Assemble PDFs and images into a single PDF", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Input files or glob patterns (in merge order)
    ///
    /// Examples:
    ///   pdfbinder cover.png report.pdf
    ///   pdfbinder 'scans/*.jpg' appendix.pdf
    #[arg(required = true, value_name = "FILE|GLOB")]
    pub inputs: Vec<String>,

    /// Directory the merged PDF is written to
    #[arg(short, long, value_name = "DIR", default_value = ".", env = "PDFBINDER_OUT_DIR")]
    pub out_dir: PathBuf,

    /// Directory for the fallback write if streaming into --out-dir fails
    ///
    /// Defaults to --out-dir.
    #[arg(long, value_name = "DIR", env = "PDFBINDER_FALLBACK_DIR")]
    pub fallback_dir: Option<PathBuf>,

    /// Image quality tier
    ///
    /// - maximum: Original quality, no compression
    /// - high: Sharp images, 300 DPI equivalent
    /// - standard: Balanced size/quality, 150 DPI
    /// - compressed: Smallest size, 72 DPI equivalent
    #[arg(
        short = 'Q',
        long,
        value_name = "TIER",
        default_value = "maximum",
        env = "PDFBINDER_QUALITY"
    )]
    #[arg(value_parser = ["maximum", "high", "standard", "compressed"])]
    pub quality: String,

    /// Pre-scale images to a page width or height
    ///
    /// - original: keep image dimensions
    /// - width: fit within 2480 px wide
    /// - height: fit within 3508 px high
    #[arg(short, long, value_name = "MODE", default_value = "original", env = "PDFBINDER_FIT")]
    #[arg(value_parser = ["original", "width", "height"])]
    pub fit: String,

    /// Number of images normalized concurrently
    #[arg(short, long, value_name = "N", env = "PDFBINDER_JOBS")]
    pub jobs: Option<usize>,

    /// Percentage of the progress bar reserved for staging
    #[arg(long, value_name = "PERCENT", env = "PDFBINDER_STAGING_SHARE")]
    pub staging_share: Option<f64>,

    /// Prefix of the output file name
    #[arg(long, value_name = "NAME", env = "PDFBINDER_PRODUCT_NAME")]
    pub product_name: Option<String>,

    /// Leave out the file at this 1-based position (repeatable)
    ///
    /// Positions refer to the expanded input list, before any --move.
    #[arg(short = 'x', long, value_name = "N")]
    pub exclude: Vec<usize>,

    /// Move the file at 1-based position FROM to position TO (repeatable)
    ///
    /// Applied in order, after exclusions.
    #[arg(short = 'm', long = "move", value_name = "FROM:TO")]
    pub moves: Vec<MoveRequest>,

    /// Print a JSON report on stdout instead of human-readable output
    #[arg(long)]
    pub json: bool,

    /// Verbose output - list queued files and log debug events
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// A `FROM:TO` reorder request with 1-based positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    /// Current position.
    pub from: usize,
    /// Target position.
    pub to: usize,
}

impl FromStr for MoveRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once(':')
            .ok_or_else(|| format!("expected FROM:TO, got '{s}'"))?;

        let position = |part: &str| -> Result<usize, String> {
            match part.trim().parse::<usize>() {
                Ok(0) => Err("positions start at 1".to_string()),
                Ok(n) => Ok(n),
                Err(_) => Err(format!("invalid position '{part}'")),
            }
        };

        Ok(Self {
            from: position(from)?,
            to: position(to)?,
        })
    }
}

impl fmt::Display for MoveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.from, self.to)
    }
}

impl Cli {
    /// Early validation that needs no I/O.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid argument.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(jobs) = self.jobs
            && jobs == 0
        {
            return Err("Number of jobs must be at least 1".to_string());
        }

        if self.exclude.contains(&0) {
            return Err("Positions passed to --exclude start at 1".to_string());
        }

        if let Some(share) = self.staging_share
            && !(0.0..100.0).contains(&share)
        {
            return Err(format!("Staging share must be in [0, 100), got {share}"));
        }

        Ok(())
    }
}
