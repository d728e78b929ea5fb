//! Error taxonomy for the bootstrapper. Every error is terminal.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("No compatible Python {version} interpreter available: {reason}")]
    InterpreterUnavailable { version: String, reason: String },

    #[error("Failed to create virtual environment at {}: {reason}", .path.display())]
    EnvironmentCreationFailed { path: PathBuf, reason: String },

    #[error("Installation failed for '{package}': {reason}")]
    InstallationFailed { package: String, reason: String },

    #[error("Import verification failed for module '{module}': {reason}")]
    VerificationFailed { module: String, reason: String },

    #[error("Failed to fetch corpus resource '{resource}': {reason}")]
    CorpusFetchFailed { resource: String, reason: String },

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl BootstrapError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BootstrapError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Steps of a bootstrap run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapStep {
    EnsureInterpreter,
    CreateEnvironment,
    Activate,
    UpgradePackageManager,
    InstallNumerical,
    VerifyNumerical,
    InstallPackages,
    FetchCorpus,
    VerifyAll,
    ReportVersions,
    Finalize,
}

impl BootstrapStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootstrapStep::EnsureInterpreter => "ensure interpreter",
            BootstrapStep::CreateEnvironment => "create environment",
            BootstrapStep::Activate => "activate environment",
            BootstrapStep::UpgradePackageManager => "upgrade pip",
            BootstrapStep::InstallNumerical => "install numerical library",
            BootstrapStep::VerifyNumerical => "verify numerical library",
            BootstrapStep::InstallPackages => "install packages",
            BootstrapStep::FetchCorpus => "fetch corpus",
            BootstrapStep::VerifyAll => "final verification",
            BootstrapStep::ReportVersions => "report versions",
            BootstrapStep::Finalize => "finalize",
        }
    }
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bootstrap error tagged with the step that produced it.
#[derive(Debug, Error)]
#[error("{step} failed: {error}")]
pub struct StepFailure {
    pub step: BootstrapStep,
    #[source]
    pub error: BootstrapError,
}
