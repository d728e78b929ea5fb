//! Host platform, decided once at the process boundary and passed down.
//!
//! Detection order: explicit override (`--platform` / `DOCREPHRASE_PLATFORM`),
//! then the shell's `OSTYPE`, then the compile-time target OS.

use std::fmt;
use std::str::FromStr;

use crate::config::env_keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    MacOS,
    Linux,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown platform '{0}' (expected darwin, macos, linux or other)")]
pub struct UnknownPlatform(pub String);

impl Platform {
    /// Map an `OSTYPE`-style identifier (`darwin23`, `linux-gnu`, `msys`) to a platform.
    pub fn from_ostype(ostype: &str) -> Self {
        let id = ostype.trim().to_ascii_lowercase();
        if id.starts_with("darwin") {
            Platform::MacOS
        } else if id.starts_with("linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }

    /// Platform this binary was compiled for.
    pub fn from_target() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOS
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }

    /// Resolve the platform for this run.
    pub fn detect(override_value: Option<&str>) -> Result<Self, UnknownPlatform> {
        if let Some(v) = override_value {
            return v.parse();
        }
        match std::env::var(env_keys::env::OSTYPE) {
            Ok(ostype) if !ostype.trim().is_empty() => Ok(Self::from_ostype(&ostype)),
            _ => Ok(Self::from_target()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::MacOS => "darwin",
            Platform::Linux => "linux",
            Platform::Other => "other",
        }
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "darwin" | "macos" | "mac" | "osx" => Ok(Platform::MacOS),
            "linux" => Ok(Platform::Linux),
            "other" => Ok(Platform::Other),
            other if other.starts_with("darwin") => Ok(Platform::MacOS),
            other if other.starts_with("linux") => Ok(Platform::Linux),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
