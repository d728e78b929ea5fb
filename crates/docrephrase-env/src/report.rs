//! Completion report, stored as JSON in the environment's marker file.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::bootstrap::EnvDescriptor;
use crate::error::BootstrapError;
use crate::venv::ENV_MARKER_FILE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleVersion {
    pub module: String,
    /// Display name, e.g. "PyTorch".
    pub label: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapReport {
    pub descriptor: EnvDescriptor,
    pub platform: String,
    #[serde(default)]
    pub versions: Vec<ModuleVersion>,
    #[serde(default)]
    pub corpus: Vec<String>,
    pub completed_at: String,
}

impl BootstrapReport {
    pub fn new(
        descriptor: EnvDescriptor,
        platform: &str,
        versions: Vec<ModuleVersion>,
        corpus: Vec<String>,
    ) -> Self {
        Self {
            descriptor,
            platform: platform.to_string(),
            versions,
            corpus,
            completed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Write the marker; its presence makes the environment complete.
pub fn write_report(root: &Path, report: &BootstrapReport) -> Result<(), BootstrapError> {
    let path = root.join(ENV_MARKER_FILE);
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| BootstrapError::io("Serialize bootstrap report", io::Error::new(io::ErrorKind::InvalidData, e)))?;
    fs::write(&path, json)
        .map_err(|e| BootstrapError::io(format!("Failed to write {}", path.display()), e))
}

/// Read the marker. Ok(None) when the environment is not complete.
pub fn read_report(root: &Path) -> Result<Option<BootstrapReport>, BootstrapError> {
    let path = root.join(ENV_MARKER_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)
        .map_err(|e| BootstrapError::io(format!("Failed to read {}", path.display()), e))?;
    serde_json::from_str(&content).map(Some).map_err(|e| {
        BootstrapError::io(
            format!("Malformed {}", path.display()),
            io::Error::new(io::ErrorKind::InvalidData, e),
        )
    })
}
