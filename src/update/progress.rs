//! Update progress tracking

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;
use tokio::sync::mpsc;

/// Stage of the update state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    Checking,    // Fetching latest release metadata
    Comparing,   // Comparing latest tag against the running build
    Confirming,  // Waiting on the yes/no prompt
    Downloading, // Downloading the platform asset
    Extracting,  // Uncompressing the executable from the asset
    Replacing,   // Committing the new executable to disk
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Checking => "checking",
            Self::Comparing => "comparing",
            Self::Confirming => "confirming",
            Self::Downloading => "downloading",
            Self::Extracting => "extracting",
            Self::Replacing => "replacing",
        };
        f.write_str(label)
    }
}

/// Progress event emitted as the orchestrator enters a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateProgress {
    pub stage: UpdateStage,
    pub message: String,
}

impl UpdateProgress {
    pub fn new(stage: UpdateStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    pub fn checking() -> Self {
        Self::new(UpdateStage::Checking, " Checking for update...")
    }

    pub fn updating(version: impl fmt::Display) -> Self {
        Self::new(
            UpdateStage::Downloading,
            format!(" Updating CLI to latest version - v{version}..."),
        )
    }
}

/// Receives progress events from the orchestrator.
///
/// Implementations must not block: they are called inline between stages.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: UpdateProgress);
}

impl ProgressReporter for () {
    fn report(&self, _progress: UpdateProgress) {}
}

/// Best-effort channel reporter.
///
/// A full channel drops the event; a closed channel disables the reporter
/// after a single warning.
pub struct ChannelReporter {
    tx: mpsc::Sender<UpdateProgress>,
    disabled: AtomicBool,
}

impl ChannelReporter {
    pub fn new(tx: mpsc::Sender<UpdateProgress>) -> Self {
        Self {
            tx,
            disabled: AtomicBool::new(false),
        }
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, progress: UpdateProgress) {
        if self.disabled.load(Ordering::Relaxed) {
            return;
        }
        if let Err(e) = self.tx.try_send(progress)
            && matches!(e, mpsc::error::TrySendError::Closed(_))
        {
            warn!("Progress channel closed, continuing update without progress events");
            self.disabled.store(true, Ordering::Relaxed);
        }
    }
}
