//! Isolated environment (Python venv): creation, completion marker, activation.
//!
//! "Activation" here means every later command runs through the venv's own
//! interpreter with `VIRTUAL_ENV` set and the venv bin dir first on PATH.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BootstrapError;
use crate::info_log;
use crate::interpreter::Interpreter;
use crate::runner::{CommandRunner, CommandSpec};

/// Marker file indicating environment setup is complete. Holds the JSON
/// [`BootstrapReport`](crate::report::BootstrapReport).
pub const ENV_MARKER_FILE: &str = ".docrephrase_complete";

/// What to do when the target directory already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingEnvPolicy {
    /// Keep a complete environment; rebuild an incomplete one.
    #[default]
    Reuse,
    /// Always remove and rebuild.
    Recreate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvState {
    Created,
    Reused,
}

/// Directory holding executables inside a venv.
pub fn bin_dir(root: &Path) -> PathBuf {
    if cfg!(target_os = "windows") {
        root.join("Scripts")
    } else {
        root.join("bin")
    }
}

/// Path to python in the virtual environment.
pub fn python_executable(root: &Path) -> PathBuf {
    if cfg!(target_os = "windows") {
        bin_dir(root).join("python.exe")
    } else {
        bin_dir(root).join("python")
    }
}

/// True when a previous run finished successfully at `root`.
pub fn is_complete(root: &Path) -> bool {
    root.join(ENV_MARKER_FILE).is_file()
}

/// True when `root` carries `pyvenv.cfg` or the completion marker. Only such
/// directories are ever removed.
pub fn looks_like_venv(root: &Path) -> bool {
    root.join("pyvenv.cfg").is_file() || is_complete(root)
}

/// Create a fresh virtual environment at `root` using `interpreter`.
pub fn create_isolated_environment<R: CommandRunner + ?Sized>(
    runner: &R,
    interpreter: &Interpreter,
    root: &Path,
    policy: ExistingEnvPolicy,
) -> Result<EnvState, BootstrapError> {
    if root.exists() {
        if policy == ExistingEnvPolicy::Reuse && is_complete(root) {
            info_log!("Reusing complete environment at {}", root.display());
            return Ok(EnvState::Reused);
        }
        if !root.is_dir() {
            return Err(BootstrapError::EnvironmentCreationFailed {
                path: root.to_path_buf(),
                reason: "path exists and is not a directory".to_string(),
            });
        }
        let is_empty = fs::read_dir(root)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !is_empty && !looks_like_venv(root) {
            return Err(BootstrapError::EnvironmentCreationFailed {
                path: root.to_path_buf(),
                reason: "exists and is not a virtual environment".to_string(),
            });
        }
        // Remove incomplete (or force-rebuilt) environment
        tracing::warn!("Removing existing environment at {}", root.display());
        fs::remove_dir_all(root).map_err(|e| {
            BootstrapError::io(format!("Failed to remove {}", root.display()), e)
        })?;
    }

    info_log!(
        "Creating virtual environment at {} with Python {}",
        root.display(),
        interpreter.version
    );
    let cmd = CommandSpec::new(&interpreter.command)
        .args(["-m", "venv"])
        .arg(root.as_os_str());
    let out = runner.run(&cmd)?;
    if !out.success() {
        return Err(BootstrapError::EnvironmentCreationFailed {
            path: root.to_path_buf(),
            reason: out.diagnostic(),
        });
    }
    Ok(EnvState::Created)
}

/// Handle on a created environment; builds commands that run inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivatedEnv {
    root: PathBuf,
    python: PathBuf,
}

impl ActivatedEnv {
    /// Activate the environment at `root`; its interpreter must exist.
    pub fn activate(root: &Path) -> Result<Self, BootstrapError> {
        let python = python_executable(root);
        if !python.exists() {
            return Err(BootstrapError::EnvironmentCreationFailed {
                path: root.to_path_buf(),
                reason: format!("interpreter missing at {}", python.display()),
            });
        }
        let root = root
            .canonicalize()
            .map_err(|e| BootstrapError::io(format!("Failed to resolve {}", root.display()), e))?;
        Ok(Self::for_root(root))
    }

    /// Layout for `root` without touching the filesystem.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let python = python_executable(&root);
        Self { root, python }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    /// `python` inside the venv, with the activation environment applied.
    pub fn python_command(&self) -> CommandSpec {
        CommandSpec::new(&self.python)
            .env("VIRTUAL_ENV", self.root.as_os_str())
            .env("PATH", self.search_path())
            .env("PYTHONNOUSERSITE", "1")
    }

    fn search_path(&self) -> OsString {
        let mut dirs = vec![bin_dir(&self.root)];
        if let Some(existing) = std::env::var_os("PATH") {
            dirs.extend(std::env::split_paths(&existing));
        }
        std::env::join_paths(dirs).unwrap_or_else(|_| bin_dir(&self.root).into_os_string())
    }
}

#[cfg(test)]
pub(crate) fn fake_venv(root: &Path) {
    let python = python_executable(root);
    fs::create_dir_all(python.parent().unwrap()).unwrap();
    fs::write(&python, "").unwrap();
    fs::write(root.join("pyvenv.cfg"), "home = /usr/bin\n").unwrap();
}
