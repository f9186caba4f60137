use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::error::{ConfigError, Result};

/// Specifies when to patch a package's binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchMode {
    /// Applies patches for known issues with certain packages. This is the
    /// behavior when the config doesn't name a mode.
    #[default]
    Auto,

    /// Always patches, overriding `Auto`. Might break untested packages.
    Always,

    /// Disables all patching.
    Never,
}

impl PatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchMode::Auto => "auto",
            PatchMode::Always => "always",
            PatchMode::Never => "never",
        }
    }
}

impl fmt::Display for PatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(PatchMode::Auto),
            "always" => Ok(PatchMode::Always),
            "never" => Ok(PatchMode::Never),
            other => Err(ConfigError::user(format!(
                "invalid patch mode {:?} (must be auto, always or never)",
                other
            ))),
        }
    }
}

impl Serialize for PatchMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PatchMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Systems a package can be restricted to or excluded from.
pub const SUPPORTED_PLATFORMS: &[&str] = &[
    "aarch64-darwin",
    "aarch64-linux",
    "armv7l-linux",
    "i686-linux",
    "x86_64-darwin",
    "x86_64-linux",
];

pub fn ensure_valid_platform<S: AsRef<str>>(platforms: &[S]) -> Result<()> {
    for platform in platforms {
        let platform = platform.as_ref();
        if !SUPPORTED_PLATFORMS.contains(&platform) {
            return Err(ConfigError::user(format!(
                "Unsupported platform: {}. Valid platforms are: {}",
                platform,
                SUPPORTED_PLATFORMS.join(", ")
            )));
        }
    }
    Ok(())
}

/// The `<arch>-<os>` system identifier of the running process.
pub fn current_system() -> String {
    let arch = match std::env::consts::ARCH {
        "arm" => "armv7l",
        "x86" => "i686",
        other => other,
    };
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    format!("{}-{}", arch, os)
}
