//! Terminal progress bar for merge runs.
//!
//! Renders the overall percentage and status line of a [`RunState`] on a
//! single, rewritten stderr line.

use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

use crate::status::RunState;

const BAR_WIDTH: usize = 30;

/// Progress bar driven by run state updates.
#[derive(Debug)]
pub struct ProgressBar {
    enabled: bool,
    percent: f64,
    message: String,
    start_time: Instant,
    last_render: Option<Instant>,
    update_interval: Duration,
}

impl ProgressBar {
    /// Create a progress bar, enabled only when stderr is a terminal.
    pub fn new() -> Self {
        Self {
            enabled: io::stderr().is_terminal(),
            percent: 0.0,
            message: String::new(),
            start_time: Instant::now(),
            last_render: None,
            update_interval: Duration::from_millis(100),
        }
    }

    /// Create a progress bar that never draws.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Take the latest run state, redrawing at most every 100ms unless the
    /// status line changed.
    pub fn update(&mut self, state: &RunState) {
        let message_changed = self.message != state.message;
        self.percent = state.progress;
        if message_changed {
            self.message.clone_from(&state.message);
        }

        let due = self
            .last_render
            .is_none_or(|last| last.elapsed() >= self.update_interval);
        if message_changed || due {
            self.render();
        }
    }

    /// Last percentage seen.
    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Time since the bar was created.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Erase the bar from the terminal.
    pub fn clear(&self) {
        if self.enabled {
            eprint!("\r\x1b[K");
            io::stderr().flush().ok();
        }
    }

    fn render(&mut self) {
        self.last_render = Some(Instant::now());
        if !self.enabled {
            return;
        }
        let line = render_line(self.percent, &self.message, self.start_time.elapsed());
        eprint!("\r\x1b[K{line}");
        io::stderr().flush().ok();
    }
}

impl Default for ProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

/// Render `[=====>    ]  42% 3s Merging a.pdf...`.
pub fn render_line(percent: f64, message: &str, elapsed: Duration) -> String {
    let percent = percent.clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;

    let bar = match filled {
        0 => " ".repeat(BAR_WIDTH),
        n if n >= BAR_WIDTH => "=".repeat(BAR_WIDTH),
        n => format!("{}>{}", "=".repeat(n - 1), " ".repeat(BAR_WIDTH - n)),
    };

    format!(
        "[{bar}] {:>3.0}% {} {message}",
        percent,
        format_duration(elapsed)
    )
}

/// Format a duration as a human-readable string.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
