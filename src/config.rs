use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::update::{DEV_BASELINE, DEV_VERSION};

const DEFAULT_RELEASE_URL: &str = "https://api.github.com/repos/Vonage/vonage-cloud-runtime-cli";
const DEFAULT_PRODUCT: &str = "vcr";
const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Version information stamped into the binary at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub commit: String,
    pub build_date: String,
}

impl BuildInfo {
    pub fn new(
        version: impl Into<String>,
        commit: impl Into<String>,
        build_date: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            commit: commit.into(),
            build_date: build_date.into(),
        }
    }

    /// Values injected through `VCR_VERSION`, `VCR_COMMIT` and
    /// `VCR_BUILD_DATE` when the binary was compiled.
    pub fn from_build_env() -> Self {
        Self::new(
            option_env!("VCR_VERSION").unwrap_or(DEV_VERSION),
            option_env!("VCR_COMMIT").unwrap_or("0000"),
            option_env!("VCR_BUILD_DATE").unwrap_or("2021-09-01T00:00:00Z"),
        )
    }

    /// `vcr-cli version <v> (commit:<c>, date:<d>)`
    pub fn describe(&self) -> String {
        let version = if self.version == DEV_VERSION {
            DEV_BASELINE
        } else {
            self.version.as_str()
        };
        if self.build_date.is_empty() {
            format!("vcr-cli version {version}")
        } else {
            format!(
                "vcr-cli version {version} (commit:{}, date:{})",
                self.commit, self.build_date
            )
        }
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::from_build_env()
    }
}

/// User configuration (`~/.config/vcr-cli/config.toml` on Linux).
///
/// Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Repository API root the release feed is read from
    pub release_url: String,
    /// Asset name prefix (`<product>_<os>_<arch>.tar.gz`)
    pub product: String,
    /// Overall deadline of one update run
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            release_url: DEFAULT_RELEASE_URL.to_string(),
            product: DEFAULT_PRODUCT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("vcr-cli/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CliConfig {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vcr-cli").join("config.toml"))
    }

    /// Load from `path`, or from [`default_path`](Self::default_path).
    ///
    /// A missing file at the default location yields the defaults; an
    /// explicitly requested file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => {
                    log::debug!("No config directory on this platform, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound && !explicit => {
                log::debug!("Config not found at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file {}", path.display()));
            }
        };

        let config = Self::from_toml(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::debug!("Using config from: {}", path.display());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.release_url)
            .with_context(|| format!("release_url {:?} is not a valid URL", self.release_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("release_url must use http or https, got {:?}", url.scheme());
        }
        if self.product.is_empty() {
            bail!("product must not be empty");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn describe_maps_dev_build() {
        let info = BuildInfo::new("dev", "0000", "2021-09-01T00:00:00Z");
        assert_eq!(
            info.describe(),
            "vcr-cli version 0.0.1 (commit:0000, date:2021-09-01T00:00:00Z)"
        );

        let info = BuildInfo::new("1.4.2", "abc123", "");
        assert_eq!(info.describe(), "vcr-cli version 1.4.2");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = CliConfig::from_toml("timeout_secs = 30\n").unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.release_url, DEFAULT_RELEASE_URL);
        assert_eq!(config.product, "vcr");
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(CliConfig::from_toml("release_url = \"not a url\"").is_err());
        assert!(CliConfig::from_toml("release_url = \"ftp://example.com/x\"").is_err());
        assert!(CliConfig::from_toml("product = \"\"").is_err());
        assert!(CliConfig::from_toml("timeout_secs = 0").is_err());
        assert!(CliConfig::from_toml("timeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "release_url = \"https://example.com/repos/acme/vcr\"\n").unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.release_url, "https://example.com/repos/acme/vcr");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(CliConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn default_config_serializes_round_trip() {
        let raw = toml::to_string_pretty(&CliConfig::default()).unwrap();
        assert_eq!(CliConfig::from_toml(&raw).unwrap(), CliConfig::default());
    }
}
