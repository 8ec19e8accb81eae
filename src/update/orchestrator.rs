//! Self-update state machine
//!
//! Sequences check → compare → confirm → download → extract → replace.
//! Every stage runs to completion before the next starts. Network stages
//! observe the cancellation token and the overall deadline; the replace stage
//! never does, since interrupting it could leave a broken executable.

use std::cmp::Ordering;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;

use super::client::ReleaseClient;
use super::error::{ClientError, ExtractError, PromptError, ReplaceError, UpdateError};
use super::extract;
use super::platform::Platform;
use super::progress::{ProgressReporter, UpdateProgress, UpdateStage};
use super::prompt::{self, Confirmer};
use super::release;
use super::replace::{self, ExecutableImage};
use super::version::Version;

/// Overall deadline when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Explicit inputs of one update run.
#[derive(Debug, Clone)]
pub struct UpdateSettings {
    /// Version string of the running build (`dev` for unreleased builds)
    pub current_version: String,
    /// Asset name prefix, e.g. `vcr`
    pub product: String,
    pub platform: Platform,
    /// Executable to replace; the running executable when `None`
    pub executable: Option<PathBuf>,
    /// Skip the confirmation prompt
    pub force: bool,
    pub timeout: Duration,
}

impl UpdateSettings {
    pub fn new(current_version: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
            product: product.into(),
            platform: Platform::current().clone(),
            executable: None,
            force: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Terminal state of an update run
#[derive(Debug)]
pub enum UpdateOutcome {
    AlreadyLatest {
        current: Version,
    },
    /// Informational: local builds may be ahead of the published release.
    RunningNewerThanLatest {
        current: Version,
        latest: Version,
    },
    UpdateApplied {
        previous: Version,
        installed: Version,
        target: PathBuf,
    },
    UpdateDeclinedByUser {
        latest: Version,
    },
    UpdateFailed(UpdateError),
}

impl UpdateOutcome {
    /// Everything except `UpdateFailed` is a successful command.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::UpdateFailed(_))
    }

    pub fn into_result(self) -> Result<Self, UpdateError> {
        match self {
            Self::UpdateFailed(err) => Err(err),
            other => Ok(other),
        }
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyLatest { current } => {
                write!(f, "You are using the latest version of vcr-cli ({current})")
            }
            Self::RunningNewerThanLatest { current, latest } => write!(
                f,
                "Current version ({current}) is newer than the latest version ({latest}) !"
            ),
            Self::UpdateApplied { installed, .. } => {
                write!(f, "Successfully updated to {installed}")
            }
            Self::UpdateDeclinedByUser { .. } => write!(f, "Update aborted"),
            Self::UpdateFailed(err) => write!(f, "{err}"),
        }
    }
}

/// Drives one update run against a release feed and a confirmation source.
pub struct UpdateOrchestrator<C, P> {
    client: C,
    confirmer: Arc<P>,
    reporter: Box<dyn ProgressReporter>,
    settings: UpdateSettings,
}

impl<C, P> UpdateOrchestrator<C, P>
where
    C: ReleaseClient,
    P: Confirmer + 'static,
{
    pub fn new(client: C, confirmer: P, settings: UpdateSettings) -> Self {
        Self {
            client,
            confirmer: Arc::new(confirmer),
            reporter: Box::new(()),
            settings,
        }
    }

    pub fn with_reporter(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn settings(&self) -> &UpdateSettings {
        &self.settings
    }

    /// Run the update flow to a terminal outcome.
    pub async fn run(&self, cancel: &CancellationToken) -> UpdateOutcome {
        match self.try_run(cancel).await {
            Ok(outcome) => outcome,
            Err(err) => {
                info!("Update failed while {}: {err}", err.stage());
                UpdateOutcome::UpdateFailed(err)
            }
        }
    }

    /// Like [`run`](Self::run), with failures as `Err`.
    pub async fn try_run(&self, cancel: &CancellationToken) -> Result<UpdateOutcome, UpdateError> {
        let settings = &self.settings;
        let deadline = Instant::now() + settings.timeout;

        let current = Version::parse(&settings.current_version).map_err(UpdateError::CurrentVersion)?;
        info!("Running vcr-cli {current}, checking for update");

        self.reporter.report(UpdateProgress::checking());
        let release = guarded(cancel, deadline, self.client.get_latest_release(cancel))
            .await
            .map_err(UpdateError::FetchRelease)?;

        self.reporter
            .report(UpdateProgress::new(UpdateStage::Comparing, release.tag()));
        let latest = release.version().map_err(UpdateError::LatestVersion)?;
        match latest.compare(&current) {
            Ordering::Equal => return Ok(UpdateOutcome::AlreadyLatest { current }),
            Ordering::Less => {
                return Ok(UpdateOutcome::RunningNewerThanLatest { current, latest });
            }
            Ordering::Greater => debug!("Release {} is newer than {current}", release.tag()),
        }

        let asset = release::select_asset(&release, &settings.product, &settings.platform)
            .map_err(UpdateError::DownloadUrl)?;
        debug!("Selected asset {} for {}", asset.name(), settings.platform);

        if !self.confirm(&latest).await? {
            info!("Update to {latest} declined");
            return Ok(UpdateOutcome::UpdateDeclinedByUser { latest });
        }

        let target = match &settings.executable {
            Some(path) => path.clone(),
            None => std::env::current_exe().map_err(UpdateError::ExecutablePath)?,
        };

        checkpoint(cancel, UpdateStage::Downloading)?;
        self.reporter.report(UpdateProgress::updating(&latest));
        let url = asset.download_url().to_string();
        let archive = guarded(cancel, deadline, self.client.get_asset(cancel, &url))
            .await
            .map_err(UpdateError::Download)?;
        info!("Downloaded {} ({} bytes)", asset.name(), archive.len());

        checkpoint(cancel, UpdateStage::Extracting)?;
        self.reporter
            .report(UpdateProgress::new(UpdateStage::Extracting, asset.name()));
        let bytes = self.extract(archive, url, &target).await?;

        // Last point at which cancellation is honoured
        checkpoint(cancel, UpdateStage::Replacing)?;
        self.reporter.report(UpdateProgress::new(
            UpdateStage::Replacing,
            target.display().to_string(),
        ));
        let commit = commit(ExecutableImage::new(bytes, target)).await?;
        if let Some(leftover) = &commit.leftover {
            debug!("Previous executable left at {}", leftover.display());
        }

        info!("Updated {} from {current} to {latest}", commit.target.display());
        Ok(UpdateOutcome::UpdateApplied {
            previous: current,
            installed: latest,
            target: commit.target,
        })
    }

    /// `Ok(false)` when the update should not proceed.
    ///
    /// The prompt blocks on the terminal, so it runs on the blocking pool.
    async fn confirm(&self, latest: &Version) -> Result<bool, UpdateError> {
        if self.settings.force {
            debug!("Force flag set, skipping confirmation");
            return Ok(true);
        }
        if !self.confirmer.can_prompt() {
            info!("Cannot prompt for confirmation and --force was not given");
            return Ok(false);
        }

        let question = prompt::question(&latest.to_string());
        self.reporter
            .report(UpdateProgress::new(UpdateStage::Confirming, question.clone()));

        let confirmer = Arc::clone(&self.confirmer);
        tokio::task::spawn_blocking(move || confirmer.confirm(&question))
            .await
            .map_err(|e| UpdateError::Prompt(PromptError(inquire::InquireError::Custom(Box::new(e)))))?
            .map_err(UpdateError::Prompt)
    }

    async fn extract(&self, archive: Vec<u8>, url: String, target: &Path) -> Result<Vec<u8>, UpdateError> {
        let command = command_name(target);
        let platform = self.settings.platform.clone();

        tokio::task::spawn_blocking(move || extract::extract_for(&archive, &url, &command, &platform))
            .await
            .map_err(|e| UpdateError::Extract(ExtractError::Join(e.to_string())))?
            .map_err(UpdateError::Extract)
    }
}

/// Commit the new image. Runs to completion once started.
async fn commit(image: ExecutableImage) -> Result<replace::Commit, UpdateError> {
    replace::cleanup_stale(image.target());
    tokio::task::spawn_blocking(move || replace::replace(image))
        .await
        .map_err(|e| UpdateError::Apply(ReplaceError::Join(e.to_string())))?
        .map_err(UpdateError::Apply)
}

/// Await `fut` unless `cancel` fires or `deadline` passes first.
async fn guarded<T, F>(cancel: &CancellationToken, deadline: Instant, fut: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        result = timeout_at(deadline, fut) => {
            result.unwrap_or_else(|_| Err(ClientError::DeadlineExceeded))
        }
    }
}

fn checkpoint(cancel: &CancellationToken, next: UpdateStage) -> Result<(), UpdateError> {
    if cancel.is_cancelled() {
        return Err(UpdateError::Cancelled(next));
    }
    Ok(())
}

/// Executable base name with its extension stripped
fn command_name(target: &Path) -> String {
    target
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
