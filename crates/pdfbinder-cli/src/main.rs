//! pdfbinder - Assemble PDFs and images into a single PDF.
//!
//! Expands the inputs, queues them, applies exclusions and moves, then runs
//! one cancellable merge and reports the outcome.

mod cli;

use anyhow::{Context, anyhow};
use clap::Parser;
use serde_json::json;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, MoveRequest};
use pdfbinder::config::{FitMode, MergeOptions, PipelineConfig, QualityTier};
use pdfbinder::error::PdfBinderError;
use pdfbinder::io::{DownloadTarget, OutputDelivery, StreamingFileTarget, read_all_incoming};
use pdfbinder::merge::{MergeRunner, RunOutcome};
use pdfbinder::output::{OutputFormatter, ProgressBar, display_queue, display_run_summary};
use pdfbinder::queue::{FileId, FileQueue};
use pdfbinder::utils::collect_paths_for_patterns;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_tracing(cli.verbose) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(exit_code(&err));
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .context("Invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<PdfBinderError>()
        .map_or(1, PdfBinderError::exit_code)
}

/// Main application logic. Returns the process exit code.
async fn run(cli: Cli) -> anyhow::Result<i32> {
    cli.validate().map_err(PdfBinderError::invalid_config)?;

    let formatter = OutputFormatter::new(cli.quiet || cli.json, cli.verbose);
    let options = MergeOptions::new(
        cli.quality.parse::<QualityTier>()?,
        cli.fit.parse::<FitMode>()?,
    );
    let config = pipeline_config(&cli);
    let runner = MergeRunner::new(config.clone())?;

    let paths = collect_paths_for_patterns(&cli.inputs).context("Failed to expand inputs")?;
    if paths.is_empty() {
        return Err(PdfBinderError::InvalidInput { rejected: 0 })
            .context(format!("Nothing matched: {}", cli.inputs.join(" ")));
    }

    debug!(inputs = paths.len(), "Inputs expanded");

    let mut queue = FileQueue::new();
    let ids = queue.add_files(read_all_incoming(&paths).await?)?;
    if ids.len() < paths.len() {
        formatter.warning(&format!(
            "{} file(s) ignored: not a PDF or image",
            paths.len() - ids.len()
        ));
    }

    for warning in apply_edits(&mut queue, &cli.exclude, &cli.moves) {
        formatter.warning(&warning);
    }
    if queue.is_empty() {
        return Err(PdfBinderError::InvalidInput { rejected: 0 })
            .context("Every input was excluded");
    }

    formatter.info(&format!("{} v{}", pdfbinder::NAME, pdfbinder::VERSION));
    display_queue(&formatter, &queue);
    formatter.detail(
        "Quality",
        &format!("{} ({})", options.quality, options.quality.description()),
    );
    formatter.detail("Fit", &options.fit.to_string());

    tokio::fs::create_dir_all(&cli.out_dir)
        .await
        .with_context(|| format!("Cannot create output directory {}", cli.out_dir.display()))?;
    let fallback_dir = cli.fallback_dir.clone().unwrap_or_else(|| cli.out_dir.clone());
    let delivery = OutputDelivery::new(
        config.product_name.clone(),
        Some(Box::new(StreamingFileTarget::new(&cli.out_dir))),
        Box::new(DownloadTarget::new(fallback_dir)),
    );

    let run = runner.prepare(&queue, options)?;
    let token = run.cancel_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let mut bar = if formatter.is_quiet() {
        ProgressBar::disabled()
    } else {
        ProgressBar::new()
    };
    let outcome = run.execute(&delivery, |state| bar.update(state)).await;
    bar.clear();
    ctrl_c.abort();

    if cli.json {
        println!("{}", json_report(&outcome)?);
    } else {
        display_run_summary(&formatter, &outcome);
    }

    Ok(outcome.exit_code())
}

fn pipeline_config(cli: &Cli) -> PipelineConfig {
    let defaults = PipelineConfig::default();
    PipelineConfig {
        staging_concurrency: cli.jobs.unwrap_or(defaults.staging_concurrency),
        staging_share: cli.staging_share.unwrap_or(defaults.staging_share),
        product_name: cli.product_name.clone().unwrap_or(defaults.product_name),
    }
}

/// Apply `--exclude` then `--move`. Returns a warning per ignored request.
///
/// Exclusions use positions in the queue as ingested; each move uses
/// positions in the queue as left by the previous edits.
fn apply_edits(queue: &mut FileQueue, exclude: &[usize], moves: &[MoveRequest]) -> Vec<String> {
    let mut warnings = Vec::new();

    let mut excluded: Vec<FileId> = Vec::new();
    for &position in exclude {
        match position.checked_sub(1).and_then(|i| queue.get_at(i)) {
            Some(file) => excluded.push(file.id),
            None => warnings.push(format!("--exclude {position}: no file at that position")),
        }
    }
    queue.remove(&excluded);

    for request in moves {
        let Some(file) = request.from.checked_sub(1).and_then(|i| queue.get_at(i)) else {
            warnings.push(format!("--move {request}: no file at position {}", request.from));
            continue;
        };
        let id = file.id;
        if request.to == 0 || request.to > queue.len() {
            warnings.push(format!("--move {request}: position {} is out of range", request.to));
            continue;
        }
        queue.reorder(id, request.to - 1);
    }

    warnings
}

fn json_report(outcome: &RunOutcome) -> anyhow::Result<String> {
    let report = json!({
        "state": outcome.state,
        "receipt": outcome.receipt,
        "pageCount": outcome.page_count,
        "executorStarted": outcome.executor_started,
        "exitCode": outcome.exit_code(),
    });
    serde_json::to_string_pretty(&report).context("Failed to serialize report")
}
