//! Release metadata and asset resolution
//!
//! A [`Release`] is the immutable view of one published release: its tag and
//! the assets attached to it. Asset names follow
//! `<product>_<os>_<arch>.tar.gz` exactly; matching is case-sensitive.

use serde::Deserialize;

use super::error::{NotFoundError, ParseError};
use super::platform::Platform;
use super::version::Version;

/// Single downloadable artifact of a release
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    name: String,
    #[serde(rename = "browser_download_url", default)]
    download_url: String,
}

impl Asset {
    pub fn new(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn download_url(&self) -> &str {
        &self.download_url
    }
}

/// Release metadata as published by the release feed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    #[serde(rename = "tag_name")]
    tag: String,
    #[serde(default)]
    assets: Vec<Asset>,
}

impl Release {
    pub fn new(tag: impl Into<String>, assets: Vec<Asset>) -> Self {
        Self {
            tag: tag.into(),
            assets,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Parsed version of the release tag
    pub fn version(&self) -> Result<Version, ParseError> {
        Version::parse(&self.tag)
    }
}

/// Name of the asset built for `platform`
pub fn asset_name(product: &str, platform: &Platform) -> String {
    format!("{}_{}_{}.tar.gz", product, platform.os, platform.arch)
}

/// True iff `latest_tag` is strictly newer than `current`.
pub fn is_upgrade(current: &Version, latest_tag: &str) -> Result<bool, ParseError> {
    let latest = Version::parse(latest_tag)?;
    Ok(latest > *current)
}

/// Find the asset matching `platform` in `release`.
///
/// An entry with the right name but an empty download URL is treated the
/// same as a missing entry.
pub fn select_asset<'a>(
    release: &'a Release,
    product: &str,
    platform: &Platform,
) -> Result<&'a Asset, NotFoundError> {
    let wanted = asset_name(product, platform);

    let asset = release
        .assets
        .iter()
        .find(|asset| asset.name == wanted)
        .ok_or_else(|| NotFoundError::NoAsset {
            os: platform.os.clone(),
            arch: platform.arch.clone(),
        })?;

    if asset.download_url.is_empty() {
        return Err(NotFoundError::EmptyUrl {
            os: platform.os.clone(),
            arch: platform.arch.clone(),
        });
    }

    Ok(asset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux_amd64() -> Platform {
        Platform::new("linux", "amd64")
    }

    #[test]
    fn asset_name_is_bit_exact() {
        assert_eq!(asset_name("vcr", &linux_amd64()), "vcr_linux_amd64.tar.gz");
        assert_eq!(
            asset_name("vcr", &Platform::new("darwin", "arm64")),
            "vcr_darwin_arm64.tar.gz"
        );
    }

    #[test]
    fn deserializes_github_release_json() {
        let json = serde_json::json!({
            "tag_name": "v1.1.0",
            "name": "Release 1.1.0",
            "assets": [
                {
                    "name": "vcr_linux_amd64.tar.gz",
                    "browser_download_url": "https://example.com/vcr_linux_amd64.tar.gz",
                    "size": 1024
                },
                { "name": "checksums.txt" }
            ]
        });

        let release: Release = serde_json::from_value(json).unwrap();
        assert_eq!(release.tag(), "v1.1.0");
        assert_eq!(release.assets().len(), 2);
        assert_eq!(release.assets()[1].download_url(), "");
        assert_eq!(release.version().unwrap().to_string(), "1.1.0");
    }

    #[test]
    fn selects_matching_asset() {
        let release = Release::new(
            "v1.1.0",
            vec![
                Asset::new("vcr_windows_amd64.tar.gz", "https://example.com/win"),
                Asset::new("vcr_linux_amd64.tar.gz", "https://example.com/linux"),
            ],
        );

        let asset = select_asset(&release, "vcr", &linux_amd64()).unwrap();
        assert_eq!(asset.download_url(), "https://example.com/linux");
    }

    #[test]
    fn missing_asset_variants_share_one_error_class() {
        let platform = linux_amd64();
        let releases = [
            Release::new("v1.0.0", vec![]),
            Release::new(
                "v1.0.0",
                vec![Asset::new("vcr_darwin_amd64.tar.gz", "https://example.com/d")],
            ),
            Release::new("v1.0.0", vec![Asset::new("vcr_linux_amd64.tar.gz", "")]),
        ];

        for release in &releases {
            let err = select_asset(release, "vcr", &platform).unwrap_err();
            assert_eq!(err.os(), "linux");
            assert_eq!(err.arch(), "amd64");
        }
    }

    #[test]
    fn asset_match_is_case_sensitive() {
        let release = Release::new(
            "v1.0.0",
            vec![Asset::new("VCR_Linux_AMD64.tar.gz", "https://example.com/x")],
        );
        assert!(select_asset(&release, "vcr", &linux_amd64()).is_err());
    }

    #[test]
    fn upgrade_only_when_strictly_newer() {
        let current = Version::parse("1.0.0").unwrap();
        assert!(is_upgrade(&current, "v1.1.0").unwrap());
        assert!(is_upgrade(&current, "1.0.1").unwrap());
        assert!(!is_upgrade(&current, "v1.0.0").unwrap());
        assert!(!is_upgrade(&current, "v1.0.0+build.7").unwrap());
        assert!(!is_upgrade(&current, "v0.9.9").unwrap());
        assert!(!is_upgrade(&current, "v1.0.0-rc.1").unwrap());
        assert!(is_upgrade(&current, "not-a-version").is_err());
    }
}
