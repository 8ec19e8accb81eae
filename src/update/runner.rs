//! Terminal front end for `vcr update`
//!
//! Wires the GitHub release client, the terminal prompt and an `indicatif`
//! spinner into the orchestrator, and prints the outcome.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use tokio_util::sync::CancellationToken;

use super::github::GitHubReleaseClient;
use super::orchestrator::{UpdateOrchestrator, UpdateOutcome, UpdateSettings};
use super::progress::{ProgressReporter, UpdateProgress, UpdateStage};
use super::prompt::TerminalConfirmer;
use crate::config::{BuildInfo, CliConfig};
use crate::ui;

/// Run `vcr update`: check for a newer release and install it.
///
/// `timeout` overrides the configured deadline.
pub async fn run_update(
    build: &BuildInfo,
    config: &CliConfig,
    force: bool,
    timeout: Option<Duration>,
) -> Result<()> {
    ui::info(build.describe());

    let client = GitHubReleaseClient::new(&config.release_url, &config.user_agent)
        .context("Failed to create release client")?;

    let mut settings = UpdateSettings::new(build.version.clone(), config.product.clone());
    settings.force = force;
    settings.timeout = timeout.unwrap_or_else(|| config.timeout());

    let spinner = SpinnerReporter::new();
    let orchestrator =
        UpdateOrchestrator::new(client, TerminalConfirmer, settings).with_reporter(spinner.clone());

    let cancel = CancellationToken::new();
    let interrupt = spawn_interrupt_handler(cancel.clone());
    let outcome = orchestrator.run(&cancel).await;
    interrupt.abort();
    spinner.clear();

    match outcome {
        UpdateOutcome::UpdateFailed(err) => return Err(err.into()),
        UpdateOutcome::UpdateDeclinedByUser { .. } => ui::warning(outcome.to_string()),
        UpdateOutcome::AlreadyLatest { .. }
        | UpdateOutcome::RunningNewerThanLatest { .. }
        | UpdateOutcome::UpdateApplied { .. } => ui::success(outcome.to_string()),
    }
    Ok(())
}

/// Ctrl-C cancels pending network work. Once the replace step has started
/// it runs to completion regardless.
fn spawn_interrupt_handler(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, cancelling update");
                cancel.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {e}"),
        }
    })
}

/// Spinner on stderr while the update talks to the network
#[derive(Clone)]
struct SpinnerReporter {
    bar: Arc<Mutex<Option<ProgressBar>>>,
}

impl SpinnerReporter {
    fn new() -> Self {
        Self {
            bar: Arc::new(Mutex::new(None)),
        }
    }

    fn start(&self, message: String) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        if let Some(previous) = slot.take() {
            previous.finish_and_clear();
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan}{msg}") {
            bar.set_style(style);
        }
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(100));
        *slot = Some(bar);
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.bar.lock()
            && let Some(bar) = slot.take()
        {
            bar.finish_and_clear();
        }
    }
}

impl ProgressReporter for SpinnerReporter {
    fn report(&self, progress: UpdateProgress) {
        match progress.stage {
            UpdateStage::Checking | UpdateStage::Downloading => self.start(progress.message),
            // The prompt needs the terminal line to itself
            UpdateStage::Comparing | UpdateStage::Confirming => self.clear(),
            UpdateStage::Extracting | UpdateStage::Replacing => {}
        }
    }
}
