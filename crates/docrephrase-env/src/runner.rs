//! CommandRunner trait: the seam between bootstrap logic and child processes.
//!
//! Every external tool (python, pip, brew, apt-get) is invoked through a
//! [`CommandSpec`] handed to a runner. [`SystemRunner`] spawns real processes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::BootstrapError;

/// Lines of stderr/stdout kept in diagnostics.
const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// A fully described child process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(String, OsString)>,
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Human-readable command line, used in logs and diagnostics.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().to_string()));
        parts.join(" ")
    }
}

/// Captured result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; None when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Tail of stderr (or stdout when stderr is empty) for error messages.
    pub fn diagnostic(&self) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let lines: Vec<&str> = source.trim_end().lines().collect();
        let start = lines.len().saturating_sub(DIAGNOSTIC_TAIL_LINES);
        let tail = lines[start..].join("\n");
        if tail.is_empty() {
            match self.code {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by signal".to_string(),
            }
        } else {
            tail
        }
    }
}

/// Extension point for executing external commands.
///
/// Implementations must block until the child exits. A non-zero exit is
/// reported through [`CommandOutput`], not as an `Err`; `Err` is reserved for
/// failures to start the process at all.
pub trait CommandRunner: Send + Sync {
    fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput, BootstrapError>;

    /// Resolve a program name on PATH.
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// Runs commands as real child processes with captured output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, BootstrapError> {
        tracing::debug!(cmd = %spec.display(), "Running command");
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        for (k, v) in &spec.env {
            cmd.env(k, v);
        }
        if let Some(ref dir) = spec.current_dir {
            cmd.current_dir(dir);
        }
        let out = cmd.output().map_err(|source| BootstrapError::Spawn {
            program: spec.program.to_string_lossy().to_string(),
            source,
        })?;
        Ok(CommandOutput {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        })
    }
}
