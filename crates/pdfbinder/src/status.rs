//! Run status and the mapping from pipeline signals to user-facing progress.
//!
//! Staging owns the first `staging_share` percent of the progress scale and
//! the merge executor owns the rest. Progress never moves backwards within a
//! run, and a run in a terminal status ignores every further signal.

use serde::Serialize;

use crate::merge::events::ExecutorEvent;

/// Message shown when a run starts.
pub const START_MESSAGE: &str = "Preparing files for processing...";

/// Message shown when the user cancels.
pub const CANCEL_MESSAGE: &str = "Operation cancelled by user";

/// Message shown when a run completes without skipped files.
pub const SUCCESS_MESSAGE: &str = "Merge successful!";

/// Status of a merge run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    /// Not started.
    #[default]
    Idle,
    /// Staging, merging or delivering.
    Running,
    /// Output delivered.
    Completed,
    /// Failed without output.
    Errored,
    /// Stopped by the user.
    Cancelled,
}

impl RunStatus {
    /// Whether the run is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Errored | Self::Cancelled)
    }
}

/// What a running merge is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunPhase {
    /// Normalizing inputs.
    Staging,
    /// Building the document.
    Merging,
    /// Writing the document out.
    Delivering,
}

/// Observable state of a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    /// Lifecycle status.
    pub status: RunStatus,
    /// Current phase while running.
    pub phase: Option<RunPhase>,
    /// Overall progress in `[0, 100]`.
    pub progress: f64,
    /// Names of files left out of the output.
    pub skipped_files: Vec<String>,
    /// Status line.
    pub message: String,
    /// Error text when the run errored.
    pub error: Option<String>,
}

/// Folds staging progress, executor events and delivery results into a
/// [`RunState`].
#[derive(Debug, Clone)]
pub struct StatusReporter {
    state: RunState,
    staging_share: f64,
}

impl StatusReporter {
    /// Create a reporter for an idle run.
    pub fn new(staging_share: f64) -> Self {
        Self {
            state: RunState::default(),
            staging_share: staging_share.clamp(0.0, 100.0),
        }
    }

    /// Current state.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Consume the reporter, returning its state.
    pub fn into_state(self) -> RunState {
        self.state
    }

    /// Begin a run, resetting progress and skipped files.
    pub fn start(&mut self) {
        self.state = RunState {
            status: RunStatus::Running,
            phase: Some(RunPhase::Staging),
            message: START_MESSAGE.to_string(),
            ..RunState::default()
        };
    }

    /// Record that `done` of `total` files finished staging, the latest being
    /// `name`.
    pub fn staging_progress(&mut self, done: usize, total: usize, name: &str) {
        if !self.is_running() || total == 0 {
            return;
        }
        let fraction = done.min(total) as f64 / total as f64;
        self.advance(self.staging_share * fraction);
        self.state.message = format!("Optimizing {name}...");
    }

    /// Record a file that will not appear in the output.
    pub fn skip(&mut self, name: impl Into<String>) {
        if self.is_running() {
            self.state.skipped_files.push(name.into());
        }
    }

    /// Apply an executor event.
    pub fn executor_event(&mut self, event: &ExecutorEvent) {
        if !self.is_running() {
            return;
        }
        match event {
            ExecutorEvent::Progress { percent, message } => {
                self.state.phase = Some(RunPhase::Merging);
                let share = 100.0 - self.staging_share;
                self.advance(self.staging_share + percent.clamp(0.0, 100.0) * share / 100.0);
                self.state.message = message.clone();
            }
            ExecutorEvent::Warning { file_name, .. } => {
                self.state.skipped_files.push(file_name.clone());
            }
            ExecutorEvent::Completed { .. } => {
                self.state.phase = Some(RunPhase::Delivering);
                self.advance(100.0);
            }
            ExecutorEvent::Error { message } => self.fail(message.clone()),
        }
    }

    /// Mark the output as delivered.
    pub fn delivered(&mut self) {
        if !self.is_running() {
            return;
        }
        self.advance(100.0);
        self.state.status = RunStatus::Completed;
        self.state.phase = None;
        self.state.message = summary_message(self.state.skipped_files.len());
    }

    /// End the run with an error.
    pub fn fail(&mut self, error: impl Into<String>) {
        if !self.is_running() {
            return;
        }
        let error = error.into();
        self.state.status = RunStatus::Errored;
        self.state.phase = None;
        self.state.message = format!("Error: {error}");
        self.state.error = Some(error);
    }

    /// End the run on user request.
    pub fn cancel(&mut self) {
        if !self.is_running() {
            return;
        }
        self.state.status = RunStatus::Cancelled;
        self.state.phase = None;
        self.state.message = CANCEL_MESSAGE.to_string();
    }

    fn is_running(&self) -> bool {
        self.state.status == RunStatus::Running
    }

    fn advance(&mut self, progress: f64) {
        self.state.progress = self.state.progress.max(progress.clamp(0.0, 100.0));
    }
}

/// Summary line for a delivered run.
pub fn summary_message(skipped: usize) -> String {
    if skipped == 0 {
        SUCCESS_MESSAGE.to_string()
    } else {
        format!("Merge completed, but {skipped} file(s) skipped due to errors.")
    }
}
