//! Platform detection for release asset selection
//!
//! Release assets are named with Go-style platform tokens (`linux`, `darwin`,
//! `amd64`, `arm64`, ...), so Rust's `std::env::consts` values are mapped to
//! those before any name is built.

use std::fmt;

use once_cell::sync::OnceCell;

/// Operating system / architecture pair of a release asset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

/// Global cache for platform detection (initialized once, used everywhere)
static PLATFORM_CACHE: OnceCell<Platform> = OnceCell::new();

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Platform of the running process (cached after first call)
    pub fn current() -> &'static Platform {
        PLATFORM_CACHE.get_or_init(|| {
            Self::new(
                os_token(std::env::consts::OS),
                arch_token(std::env::consts::ARCH),
            )
        })
    }

    /// Suffix executables carry on this platform
    pub fn exe_suffix(&self) -> &'static str {
        if self.os == "windows" { ".exe" } else { "" }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Map a Rust `target_os` value to its Go `GOOS` spelling
fn os_token(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

/// Map a Rust `target_arch` value to its Go `GOARCH` spelling
fn arch_token(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "loongarch64" => "loong64",
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
        "powerpc64" => "ppc64",
        "powerpc" => "ppc",
        "mips" if cfg!(target_endian = "little") => "mipsle",
        "mips64" if cfg!(target_endian = "little") => "mips64le",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_follow_go_spelling() {
        assert_eq!(os_token("macos"), "darwin");
        assert_eq!(os_token("linux"), "linux");
        assert_eq!(os_token("windows"), "windows");
        assert_eq!(arch_token("x86_64"), "amd64");
        assert_eq!(arch_token("aarch64"), "arm64");
        assert_eq!(arch_token("x86"), "386");
        assert_eq!(arch_token("riscv64"), "riscv64");
    }

    #[test]
    fn current_platform_is_lowercase_and_cached() {
        let platform = Platform::current();
        assert_eq!(platform.os, platform.os.to_lowercase());
        assert_eq!(platform.arch, platform.arch.to_lowercase());
        assert!(std::ptr::eq(platform, Platform::current()));
    }

    #[test]
    fn exe_suffix_only_on_windows() {
        assert_eq!(Platform::new("windows", "amd64").exe_suffix(), ".exe");
        assert_eq!(Platform::new("linux", "amd64").exe_suffix(), "");
    }
}
