//! Self-update of the `vcr` executable
//!
//! Discovers whether a newer release exists, picks the asset built for the
//! running platform, and replaces the executable on disk without ever leaving
//! a truncated or unrunnable file behind.
//!
//! ## Module Organization
//!
//! - `version` - Semantic version parsing and precedence
//! - `platform` - Go-style OS/arch tokens of the running process
//! - `release` - Release metadata and asset selection
//! - `client` - Release feed contract, `github` - its GitHub implementation
//! - `extract` - Archive decompression keyed by URL suffix
//! - `replace` - Atomic executable replacement
//! - `prompt` - Yes/no confirmation
//! - `progress` - Stage events for the UI
//! - `orchestrator` - The update state machine
//! - `runner` - Terminal front end used by `vcr update`

mod client;
mod error;
mod extract;
mod github;
mod orchestrator;
mod platform;
mod progress;
mod prompt;
mod release;
mod replace;
mod runner;
mod version;

// Re-export public API
pub use client::ReleaseClient;
pub use error::{
    ClientError, ExtractError, NotFoundError, ParseError, PromptError, ReplaceError, ReplaceFailure,
    UpdateError,
};
pub use extract::{extract, extract_for};
pub use github::GitHubReleaseClient;
pub use orchestrator::{DEFAULT_TIMEOUT, UpdateOrchestrator, UpdateOutcome, UpdateSettings};
pub use platform::Platform;
pub use progress::{ChannelReporter, ProgressReporter, UpdateProgress, UpdateStage};
pub use prompt::{Confirmer, FixedConfirmer, TerminalConfirmer};
pub use release::{Asset, Release, asset_name, is_upgrade, select_asset};
pub use replace::{Commit, ExecutableImage, cleanup_stale, replace};
pub use runner::run_update;
pub use version::{DEV_BASELINE, DEV_VERSION, Version, compare, parse};
