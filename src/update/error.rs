//! Error taxonomy for the self-update flow
//!
//! Each component owns one error type. [`UpdateError`] wraps them with the
//! stage label users see, keeping the component error as its `source()` so
//! `{:#}` on an `anyhow::Error` prints the whole chain.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::progress::UpdateStage;

/// Malformed version string (current build tag or remote release tag).
#[derive(Debug, Error)]
#[error("{raw:?} is not a valid semantic version")]
pub struct ParseError {
    pub raw: String,
    #[source]
    pub source: semver::Error,
}

/// No usable release asset for the running platform.
///
/// Both variants are the same class of failure; callers match on the type,
/// not the variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("no asset found for {os} {arch}")]
    NoAsset { os: String, arch: String },
    #[error("download url not found for {os} {arch}")]
    EmptyUrl { os: String, arch: String },
}

impl NotFoundError {
    pub fn os(&self) -> &str {
        match self {
            Self::NoAsset { os, .. } | Self::EmptyUrl { os, .. } => os,
        }
    }

    pub fn arch(&self) -> &str {
        match self {
            Self::NoAsset { arch, .. } | Self::EmptyUrl { arch, .. } => arch,
        }
    }
}

/// Downloaded archive could not be turned into an executable image.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("archive is corrupt")]
    Corrupt(#[source] io::Error),
    #[error("zip archive is corrupt")]
    Zip(#[from] zip::result::ZipError),
    #[error("executable {expected:?} not found in archive (entries: {})", .entries.join(", "))]
    MissingEntry {
        expected: String,
        entries: Vec<String>,
    },
    #[error("gzip payload is named {found:?}, expected {expected:?}")]
    NameMismatch { expected: String, found: String },
    #[error("executable {0:?} in archive is empty")]
    EmptyEntry(String),
    #[error("executable {name:?} exceeds the {limit} byte size limit")]
    TooLarge { name: String, limit: u64 },
    #[error("extraction task failed: {0}")]
    Join(String),
}

/// Filesystem-level reason a replacement failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceFailure {
    PermissionDenied,
    StorageFull,
    CrossesDevices,
    ReadOnlyFilesystem,
    Other,
}

impl ReplaceFailure {
    pub fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::StorageFull => Self::StorageFull,
            io::ErrorKind::CrossesDevices => Self::CrossesDevices,
            io::ErrorKind::ReadOnlyFilesystem => Self::ReadOnlyFilesystem,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ReplaceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "insufficient permissions"),
            Self::StorageFull => write!(f, "insufficient disk space"),
            Self::CrossesDevices => write!(f, "cross-device rename"),
            Self::ReadOnlyFilesystem => write!(f, "read-only filesystem"),
            Self::Other => write!(f, "filesystem error"),
        }
    }
}

/// Failure while committing a new executable image to disk.
#[derive(Debug, Error)]
pub enum ReplaceError {
    #[error("{failure} while {step} {}: {cause}", .path.display())]
    Io {
        step: &'static str,
        path: PathBuf,
        failure: ReplaceFailure,
        cause: io::Error,
    },
    #[error("{} is not a replaceable file path", .0.display())]
    InvalidTarget(PathBuf),
    #[error("replace task failed: {0}")]
    Join(String),
}

impl ReplaceError {
    pub(crate) fn io(step: &'static str, path: impl Into<PathBuf>, cause: io::Error) -> Self {
        Self::Io {
            step,
            path: path.into(),
            failure: ReplaceFailure::classify(&cause),
            cause,
        }
    }

    /// Underlying OS error, when the failure came from the filesystem.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Io { cause, .. } => Some(cause),
            _ => None,
        }
    }

    pub fn failure(&self) -> ReplaceFailure {
        match self {
            Self::Io { failure, .. } => *failure,
            _ => ReplaceFailure::Other,
        }
    }
}

/// Errors surfaced by a [`ReleaseClient`](super::client::ReleaseClient).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("no data received for {0} seconds")]
    Stalled(u64),
    #[error("{url} exceeds the {limit} byte download limit")]
    TooLarge { url: String, limit: u64 },
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("{0}")]
    Other(String),
}

/// Interactive confirmation could not be obtained.
#[derive(Debug, Error)]
#[error("prompt failed")]
pub struct PromptError(#[from] pub inquire::InquireError);

/// Stage-labelled failure of the update flow.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("current update is invalid")]
    CurrentVersion(#[source] ParseError),
    #[error("failed to get assets")]
    FetchRelease(#[source] ClientError),
    #[error("failed to get latest version: invalid update found")]
    LatestVersion(#[source] ParseError),
    #[error("failed to get download url")]
    DownloadUrl(#[source] NotFoundError),
    #[error("failed to confirm update")]
    Prompt(#[source] PromptError),
    #[error("failed to get executable path")]
    ExecutablePath(#[source] io::Error),
    #[error("failed to get release asset")]
    Download(#[source] ClientError),
    #[error("failed to uncompress command")]
    Extract(#[source] ExtractError),
    #[error("failed to apply update")]
    Apply(#[source] ReplaceError),
    #[error("update cancelled before {0}")]
    Cancelled(UpdateStage),
}

impl UpdateError {
    /// Stage of the flow that produced this error.
    pub fn stage(&self) -> UpdateStage {
        match self {
            Self::CurrentVersion(_) | Self::LatestVersion(_) => UpdateStage::Comparing,
            Self::FetchRelease(_) => UpdateStage::Checking,
            Self::DownloadUrl(_) | Self::Download(_) | Self::ExecutablePath(_) => {
                UpdateStage::Downloading
            }
            Self::Prompt(_) => UpdateStage::Confirming,
            Self::Extract(_) => UpdateStage::Extracting,
            Self::Apply(_) => UpdateStage::Replacing,
            Self::Cancelled(stage) => *stage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_failure_classifies_io_kinds() {
        let cases = [
            (io::ErrorKind::PermissionDenied, ReplaceFailure::PermissionDenied),
            (io::ErrorKind::StorageFull, ReplaceFailure::StorageFull),
            (io::ErrorKind::CrossesDevices, ReplaceFailure::CrossesDevices),
            (io::ErrorKind::ReadOnlyFilesystem, ReplaceFailure::ReadOnlyFilesystem),
            (io::ErrorKind::NotFound, ReplaceFailure::Other),
        ];
        for (kind, expected) in cases {
            assert_eq!(ReplaceFailure::classify(&io::Error::from(kind)), expected);
        }
    }

    #[test]
    fn replace_error_message_keeps_os_error() {
        let err = ReplaceError::io(
            "renaming into place",
            "/usr/local/bin/vcr",
            io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied (os error 13)"),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("insufficient permissions while renaming into place"));
        assert!(msg.contains("/usr/local/bin/vcr"));
        assert!(msg.contains("os error 13"));
        assert_eq!(err.failure(), ReplaceFailure::PermissionDenied);
        assert_eq!(
            err.io_error().map(io::Error::kind),
            Some(io::ErrorKind::PermissionDenied)
        );
    }

    #[test]
    fn stage_labels_are_preserved() {
        let not_found = NotFoundError::NoAsset {
            os: "linux".into(),
            arch: "arm64".into(),
        };
        let err = UpdateError::DownloadUrl(not_found);
        let chain = format!("{:#}", anyhow::Error::new(err));
        assert_eq!(chain, "failed to get download url: no asset found for linux arm64");

        let err = UpdateError::FetchRelease(ClientError::Other("boom".into()));
        assert_eq!(err.to_string(), "failed to get assets");
        assert_eq!(err.stage(), UpdateStage::Checking);
    }

    #[test]
    fn missing_entry_lists_archive_contents() {
        let err = ExtractError::MissingEntry {
            expected: "vcr".into(),
            entries: vec!["README.md".into(), "LICENSE".into()],
        };
        assert_eq!(
            err.to_string(),
            "executable \"vcr\" not found in archive (entries: README.md, LICENSE)"
        );
    }
}
