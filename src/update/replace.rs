//! Executable replacement
//!
//! The new image is written to a temporary file in the target's directory,
//! flushed to disk, given the target's permissions, and only then moved over
//! the target. Until that final move nothing at the target path changes, and
//! the temporary file is removed on every failure path.
//!
//! - **Unix**: a single `rename(2)` over the running executable.
//! - **Windows**: the running image cannot be overwritten, so it is moved
//!   aside to `.<name>.old` first and moved back if the commit fails.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tempfile::NamedTempFile;

use super::error::ReplaceError;

/// New executable bytes bound to the path they will be installed at
#[derive(Debug)]
pub struct ExecutableImage {
    bytes: Vec<u8>,
    target: PathBuf,
}

impl ExecutableImage {
    pub fn new(bytes: Vec<u8>, target: impl Into<PathBuf>) -> Self {
        Self {
            bytes,
            target: target.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

/// Successful commit: the next launch of `target` runs the new image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub target: PathBuf,
    /// Previous image that could not be deleted yet (Windows only).
    pub leftover: Option<PathBuf>,
}

/// Replace `image.target()` with `image.bytes()`.
///
/// Blocking; callers on an async runtime should use `spawn_blocking`. Once
/// started it runs to completion (commit or clean rollback).
pub fn replace(image: ExecutableImage) -> Result<Commit, ReplaceError> {
    let ExecutableImage { bytes, target } = image;
    let (parent, name) = split_target(&target)?;

    let permissions = match fs::metadata(&target) {
        Ok(meta) => Some(meta.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(ReplaceError::io("reading metadata of", &target, e)),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(&format!(".{name}.new"))
        .tempfile_in(parent)
        .map_err(|e| ReplaceError::io("creating temporary file in", parent, e))?;
    debug!("Staging new executable at {}", temp.path().display());

    temp.write_all(&bytes)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| ReplaceError::io("writing", temp.path(), e))?;

    apply_permissions(&temp, permissions)?;

    let leftover = platform::commit(temp, &target, parent, name)?;
    sync_dir(parent);

    info!("Executable replaced at {}", target.display());
    Ok(Commit { target, leftover })
}

/// Remove a previous image left behind by an earlier replacement.
///
/// Best effort: failures are logged, never returned.
pub fn cleanup_stale(target: &Path) {
    let Ok((parent, name)) = split_target(target) else {
        return;
    };
    let stale = old_path(parent, name);
    match fs::remove_file(&stale) {
        Ok(()) => debug!("Removed stale executable {}", stale.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove stale executable {}: {e}", stale.display()),
    }
}

fn split_target(target: &Path) -> Result<(&Path, &str), ReplaceError> {
    let invalid = || ReplaceError::InvalidTarget(target.to_path_buf());
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(invalid)?;
    let parent = match target.parent() {
        Some(p) if p.as_os_str().is_empty() => Path::new("."),
        Some(p) => p,
        None => return Err(invalid()),
    };
    Ok((parent, name))
}

fn old_path(parent: &Path, name: &str) -> PathBuf {
    parent.join(format!(".{name}.old"))
}

/// Copy the target's permissions onto the staged file (0o755 for a new target)
fn apply_permissions(temp: &NamedTempFile, existing: Option<fs::Permissions>) -> Result<(), ReplaceError> {
    let permissions = match existing {
        Some(p) => p,
        None => default_permissions(temp)?,
    };
    temp.as_file()
        .set_permissions(permissions)
        .map_err(|e| ReplaceError::io("setting permissions on", temp.path(), e))
}

#[cfg(unix)]
fn default_permissions(_temp: &NamedTempFile) -> Result<fs::Permissions, ReplaceError> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn default_permissions(temp: &NamedTempFile) -> Result<fs::Permissions, ReplaceError> {
    temp.as_file()
        .metadata()
        .map(|m| m.permissions())
        .map_err(|e| ReplaceError::io("reading metadata of", temp.path(), e))
}

/// Flush the directory entry so the rename survives a crash
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        warn!("Failed to sync directory {}: {e}", dir.display());
    }
    #[cfg(not(unix))]
    let _ = dir;
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        mod platform {
            use super::*;

            pub(super) fn commit(
                temp: NamedTempFile,
                target: &Path,
                parent: &Path,
                name: &str,
            ) -> Result<Option<PathBuf>, ReplaceError> {
                let old = old_path(parent, name);
                cleanup_stale(target);

                let moved_aside = target.exists();
                if moved_aside {
                    // Dropping `temp` on this error path deletes the staged file
                    fs::rename(target, &old)
                        .map_err(|e| ReplaceError::io("moving aside", target, e))?;
                }

                if let Err(e) = temp.persist(target) {
                    if moved_aside && let Err(restore) = fs::rename(&old, target) {
                        log::error!(
                            "Failed to restore {} from {}: {restore}",
                            target.display(),
                            old.display()
                        );
                    }
                    return Err(ReplaceError::io("renaming into place", target, e.error));
                }

                if !moved_aside {
                    return Ok(None);
                }
                match fs::remove_file(&old) {
                    Ok(()) => Ok(None),
                    Err(e) => {
                        debug!("Previous executable kept at {}: {e}", old.display());
                        Ok(Some(old))
                    }
                }
            }
        }
    } else {
        mod platform {
            use super::*;

            pub(super) fn commit(
                temp: NamedTempFile,
                target: &Path,
                _parent: &Path,
                _name: &str,
            ) -> Result<Option<PathBuf>, ReplaceError> {
                // Dropping the returned temp file on error deletes it
                temp.persist(target)
                    .map_err(|e| ReplaceError::io("renaming into place", target, e.error))?;
                Ok(None)
            }
        }
    }
}
