//! Release asset extraction
//!
//! Turns a downloaded asset into the raw bytes of the executable. The
//! decompression strategy is chosen from the asset URL's suffix because the
//! release side may serve `.zip` on one platform and `.tar.gz` on another.
//! Payloads with an unrecognised suffix are taken to be the executable itself.
//!
//! Entry sizes recorded in archive headers are untrusted: reads are bounded
//! by [`MAX_EXECUTABLE_SIZE`] and a short entry is reported as corrupt.

use std::io::{self, Cursor, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use log::debug;
use tar::Archive;
use xz2::read::XzDecoder;
use zip::ZipArchive;

use super::error::ExtractError;
use super::platform::Platform;

/// Largest executable accepted from an asset
pub const MAX_EXECUTABLE_SIZE: u64 = 512 * 1024 * 1024;

// Up-front allocation cap; the rest grows as data actually arrives
const CAPACITY_HINT_LIMIT: u64 = 64 * 1024 * 1024;

type Strategy = fn(&[u8], &EntryMatcher) -> Result<Vec<u8>, ExtractError>;

/// Suffix → strategy, checked in order so `.tar.gz` wins over `.gz`.
const STRATEGIES: &[(&str, Strategy)] = &[
    (".zip", extract_zip),
    (".tar.gz", extract_tar_gz),
    (".tgz", extract_tar_gz),
    (".tar.xz", extract_tar_xz),
    (".gzip", extract_gzip),
    (".gz", extract_gzip),
    (".xz", extract_xz),
];

/// Extract the executable named `command` for the running platform.
pub fn extract(archive: &[u8], source_url: &str, command: &str) -> Result<Vec<u8>, ExtractError> {
    extract_for(archive, source_url, command, Platform::current())
}

/// Extract the executable named `command` built for `platform`.
pub fn extract_for(
    archive: &[u8],
    source_url: &str,
    command: &str,
    platform: &Platform,
) -> Result<Vec<u8>, ExtractError> {
    let matcher = EntryMatcher::new(command, platform);

    match strategy_for(source_url) {
        Some((suffix, strategy)) => {
            debug!("Extracting {command} from {suffix} asset ({} bytes)", archive.len());
            strategy(archive, &matcher)
        }
        None => {
            debug!("Asset {source_url} is not compressed, using payload as-is");
            if archive.is_empty() {
                return Err(ExtractError::EmptyEntry(command.to_string()));
            }
            Ok(archive.to_vec())
        }
    }
}

fn strategy_for(source_url: &str) -> Option<(&'static str, Strategy)> {
    // Query strings and fragments are not part of the file name
    let path = source_url
        .split(['?', '#'])
        .next()
        .unwrap_or(source_url);

    STRATEGIES
        .iter()
        .find(|(suffix, _)| path.ends_with(suffix))
        .copied()
}

/// Names an archive entry may carry for the requested command
struct EntryMatcher {
    command: String,
    candidates: [String; 6],
}

impl EntryMatcher {
    fn new(command: &str, platform: &Platform) -> Self {
        let underscored = format!("{}_{}_{}", command, platform.os, platform.arch);
        let dashed = format!("{}-{}-{}", command, platform.os, platform.arch);
        Self {
            command: command.to_string(),
            candidates: [
                command.to_string(),
                format!("{command}.exe"),
                format!("{underscored}.exe"),
                underscored,
                format!("{dashed}.exe"),
                dashed,
            ],
        }
    }

    /// Matches on the entry's base name, so nested layouts
    /// (`vcr_linux_amd64/vcr`) are accepted.
    fn matches(&self, entry_path: &Path) -> bool {
        entry_path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.candidates.iter().any(|c| c == name))
    }

    fn missing(&self, entries: Vec<String>) -> ExtractError {
        ExtractError::MissingEntry {
            expected: self.command.clone(),
            entries,
        }
    }

    /// Read the matched entry.
    ///
    /// `declared` is the size an archive header claims; the entry must hold
    /// exactly that many bytes. Streams without a header size are read up to
    /// the limit.
    fn read_entry(&self, reader: impl Read, declared: Option<u64>) -> Result<Vec<u8>, ExtractError> {
        let too_large = || ExtractError::TooLarge {
            name: self.command.clone(),
            limit: MAX_EXECUTABLE_SIZE,
        };

        let bytes = match declared {
            Some(size) => {
                if size > MAX_EXECUTABLE_SIZE {
                    return Err(too_large());
                }
                let mut bytes = Vec::with_capacity(size.min(CAPACITY_HINT_LIMIT) as usize);
                reader
                    .take(size)
                    .read_to_end(&mut bytes)
                    .map_err(ExtractError::Corrupt)?;
                if (bytes.len() as u64) < size {
                    return Err(ExtractError::Corrupt(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("entry holds {} of {size} declared bytes", bytes.len()),
                    )));
                }
                bytes
            }
            None => {
                let mut bytes = Vec::new();
                reader
                    .take(MAX_EXECUTABLE_SIZE + 1)
                    .read_to_end(&mut bytes)
                    .map_err(ExtractError::Corrupt)?;
                if bytes.len() as u64 > MAX_EXECUTABLE_SIZE {
                    return Err(too_large());
                }
                bytes
            }
        };

        if bytes.is_empty() {
            return Err(ExtractError::EmptyEntry(self.command.clone()));
        }
        Ok(bytes)
    }
}

fn extract_tar_gz(archive: &[u8], matcher: &EntryMatcher) -> Result<Vec<u8>, ExtractError> {
    extract_tar(GzDecoder::new(archive), matcher)
}

fn extract_tar_xz(archive: &[u8], matcher: &EntryMatcher) -> Result<Vec<u8>, ExtractError> {
    extract_tar(XzDecoder::new(archive), matcher)
}

/// Extract from a decompressed tar stream
fn extract_tar(stream: impl Read, matcher: &EntryMatcher) -> Result<Vec<u8>, ExtractError> {
    let mut tar = Archive::new(stream);
    let mut seen = Vec::new();

    for entry in tar.entries().map_err(ExtractError::Corrupt)? {
        let mut entry = entry.map_err(ExtractError::Corrupt)?;
        let path = entry.path().map_err(ExtractError::Corrupt)?.into_owned();
        seen.push(path.display().to_string());

        if !entry.header().entry_type().is_file() || !matcher.matches(&path) {
            continue;
        }

        let size = entry.size();
        let bytes = matcher.read_entry(&mut entry, Some(size))?;
        debug!("Found {} in tarball ({} bytes)", path.display(), bytes.len());
        return Ok(bytes);
    }

    Err(matcher.missing(seen))
}

/// Extract from a ZIP archive (entries may be at root or in a subdirectory)
fn extract_zip(archive: &[u8], matcher: &EntryMatcher) -> Result<Vec<u8>, ExtractError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;
    let mut seen = Vec::with_capacity(zip.len());

    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        let name = file.name().to_string();
        seen.push(name.clone());

        if file.is_dir() || !matcher.matches(Path::new(&name)) {
            continue;
        }

        let size = file.size();
        let bytes = matcher.read_entry(&mut file, Some(size))?;
        debug!("Found {name} in zip archive ({} bytes)", bytes.len());
        return Ok(bytes);
    }

    Err(matcher.missing(seen))
}

/// Extract a single gzip-compressed file
///
/// The gzip header's original file name is optional; when present it must
/// name the command.
fn extract_gzip(archive: &[u8], matcher: &EntryMatcher) -> Result<Vec<u8>, ExtractError> {
    let mut decoder = GzDecoder::new(archive);
    let bytes = matcher.read_entry(&mut decoder, None)?;

    if let Some(raw) = decoder.header().and_then(|h| h.filename()) {
        let found = String::from_utf8_lossy(raw).into_owned();
        if !matcher.matches(Path::new(&found)) {
            return Err(ExtractError::NameMismatch {
                expected: matcher.command.clone(),
                found,
            });
        }
    }

    Ok(bytes)
}

/// Extract a single xz-compressed file (xz streams carry no file name)
fn extract_xz(archive: &[u8], matcher: &EntryMatcher) -> Result<Vec<u8>, ExtractError> {
    matcher.read_entry(XzDecoder::new(archive), None)
}
