//! Locate a compatible Python interpreter, installing one through the
//! platform package manager when none is found.
//!
//! Exactly one remediation attempt is made: probe, install, probe again.

use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use docrephrase_core::Platform;
use regex::Regex;

use crate::error::BootstrapError;
use crate::info_log;
use crate::runner::{CommandRunner, CommandSpec};

/// Parsed `Python X.Y[.Z]` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
}

impl PythonVersion {
    /// Parse the output of `python --version` (e.g. `Python 3.10.12`).
    pub fn parse_banner(text: &str) -> Option<Self> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"Python\s+(\d+)\.(\d+)(?:\.(\d+))?").expect("static regex")
        });
        let caps = re.captures(text)?;
        Some(Self {
            major: caps[1].parse().ok()?,
            minor: caps[2].parse().ok()?,
            patch: caps.get(3).and_then(|m| m.as_str().parse().ok()),
        })
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.patch {
            Some(p) => write!(f, "{}.{}.{}", self.major, self.minor, p),
            None => write!(f, "{}.{}", self.major, self.minor),
        }
    }
}

/// Requested interpreter version: `3.10` pins major.minor, `3` accepts any 3.x.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequest {
    raw: String,
    major: u32,
    minor: Option<u32>,
}

impl VersionRequest {
    pub fn parse(raw: &str) -> Result<Self, BootstrapError> {
        let raw = raw.trim();
        let invalid = || BootstrapError::InterpreterUnavailable {
            version: raw.to_string(),
            reason: "version must look like '3' or '3.10'".to_string(),
        };
        let mut parts = raw.split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(p) => Some(p.parse::<u32>().map_err(|_| invalid())?),
            None => None,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self {
            raw: raw.to_string(),
            major,
            minor,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, found: &PythonVersion) -> bool {
        found.major == self.major && self.minor.map_or(true, |m| m == found.minor)
    }

    /// Executable names to probe, most specific first.
    pub fn candidates(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.minor.is_some() {
            names.push(format!("python{}", self.raw));
        }
        names.push(format!("python{}", self.major));
        names.push("python".to_string());
        names.dedup();
        names
    }
}

/// A usable interpreter on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub command: PathBuf,
    pub version: PythonVersion,
}

/// Extension point for platform package managers.
pub trait PlatformInstaller {
    /// Installer name for logging and diagnostics.
    fn name(&self) -> &str;

    /// Commands that install the requested interpreter, run in order.
    fn install_commands(&self, version: &VersionRequest) -> Vec<CommandSpec>;
}

/// macOS: Homebrew.
#[derive(Debug, Clone, Copy, Default)]
pub struct HomebrewInstaller;

impl PlatformInstaller for HomebrewInstaller {
    fn name(&self) -> &str {
        "homebrew"
    }

    fn install_commands(&self, version: &VersionRequest) -> Vec<CommandSpec> {
        let formula = if version.minor.is_some() {
            format!("python@{}", version.as_str())
        } else {
            "python".to_string()
        };
        vec![CommandSpec::new("brew").args(["install", formula.as_str()])]
    }
}

/// Linux: apt-get (Debian/Ubuntu).
#[derive(Debug, Clone, Copy, Default)]
pub struct AptInstaller;

impl PlatformInstaller for AptInstaller {
    fn name(&self) -> &str {
        "apt-get"
    }

    fn install_commands(&self, version: &VersionRequest) -> Vec<CommandSpec> {
        let pkg = if version.minor.is_some() {
            format!("python{}", version.as_str())
        } else {
            format!("python{}", version.major)
        };
        let venv_pkg = format!("{}-venv", pkg);
        vec![
            CommandSpec::new("sudo").args(["apt-get", "update"]),
            CommandSpec::new("sudo").args(["apt-get", "install", "-y", pkg.as_str(), venv_pkg.as_str()]),
        ]
    }
}

/// Installer for the platform, or None when the platform has no supported installer.
pub fn installer_for(platform: Platform) -> Option<Box<dyn PlatformInstaller>> {
    match platform {
        Platform::MacOS => Some(Box::new(HomebrewInstaller)),
        Platform::Linux => Some(Box::new(AptInstaller)),
        Platform::Other => None,
    }
}

/// Probe the candidate executables for a matching interpreter.
pub fn find_interpreter<R: CommandRunner + ?Sized>(
    runner: &R,
    request: &VersionRequest,
) -> Option<Interpreter> {
    for name in request.candidates() {
        let Some(path) = runner.locate(&name) else {
            continue;
        };
        let out = match runner.run(&CommandSpec::new(&path).arg("--version")) {
            Ok(out) if out.success() => out,
            _ => continue,
        };
        // Python 2 prints its banner to stderr.
        let banner = format!("{}\n{}", out.stdout, out.stderr);
        match PythonVersion::parse_banner(&banner) {
            Some(version) if request.matches(&version) => {
                return Some(Interpreter {
                    command: path,
                    version,
                });
            }
            Some(version) => {
                tracing::debug!(candidate = %name, found = %version, wanted = %request.as_str(), "Interpreter version mismatch");
            }
            None => {
                tracing::debug!(candidate = %name, "Unrecognized --version output");
            }
        }
    }
    None
}

/// Ensure a Python interpreter matching `version` is available.
pub fn ensure_interpreter<R: CommandRunner + ?Sized>(
    runner: &R,
    platform: Platform,
    version: &str,
) -> Result<Interpreter, BootstrapError> {
    let request = VersionRequest::parse(version)?;
    if let Some(found) = find_interpreter(runner, &request) {
        info_log!(
            "Found Python {} at {}",
            found.version,
            found.command.display()
        );
        return Ok(found);
    }

    let unavailable = |reason: String| BootstrapError::InterpreterUnavailable {
        version: request.as_str().to_string(),
        reason,
    };

    let installer = installer_for(platform).ok_or_else(|| {
        unavailable(format!(
            "not found on PATH and no installer is known for platform '{}'",
            platform
        ))
    })?;

    tracing::warn!(
        "Python {} not found, installing via {}",
        request.as_str(),
        installer.name()
    );
    for cmd in installer.install_commands(&request) {
        let out = runner.run(&cmd).map_err(|e| unavailable(e.to_string()))?;
        if !out.success() {
            return Err(unavailable(format!(
                "{} failed: {}",
                cmd.display(),
                out.diagnostic()
            )));
        }
    }

    find_interpreter(runner, &request).ok_or_else(|| {
        unavailable(format!(
            "still not found after installing via {}",
            installer.name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::{fail, ok, ScriptedRunner};

    #[test]
    fn test_parse_banner() {
        let v = PythonVersion::parse_banner("Python 3.10.12\n").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (3, 10, Some(12)));
        assert_eq!(v.to_string(), "3.10.12");
        let v = PythonVersion::parse_banner("Python 3.13").unwrap();
        assert_eq!(v.patch, None);
        assert!(PythonVersion::parse_banner("command not found").is_none());
    }

    #[test]
    fn test_version_request() {
        let req = VersionRequest::parse("3.10").unwrap();
        assert_eq!(req.candidates(), vec!["python3.10", "python3", "python"]);
        assert!(req.matches(&PythonVersion { major: 3, minor: 10, patch: Some(4) }));
        assert!(!req.matches(&PythonVersion { major: 3, minor: 12, patch: None }));

        let any3 = VersionRequest::parse("3").unwrap();
        assert_eq!(any3.candidates(), vec!["python3", "python"]);
        assert!(any3.matches(&PythonVersion { major: 3, minor: 12, patch: None }));

        assert!(VersionRequest::parse("three").is_err());
        assert!(VersionRequest::parse("3.10.1").is_err());
    }

    #[test]
    fn test_installer_branch_per_platform() {
        let req = VersionRequest::parse("3.10").unwrap();

        let mac = installer_for(Platform::MacOS).unwrap();
        assert_eq!(mac.name(), "homebrew");
        let cmds: Vec<String> = mac.install_commands(&req).iter().map(CommandSpec::display).collect();
        assert_eq!(cmds, vec!["brew install python@3.10"]);

        let linux = installer_for(Platform::Linux).unwrap();
        assert_eq!(linux.name(), "apt-get");
        let cmds: Vec<String> = linux.install_commands(&req).iter().map(CommandSpec::display).collect();
        assert_eq!(
            cmds,
            vec![
                "sudo apt-get update",
                "sudo apt-get install -y python3.10 python3.10-venv"
            ]
        );

        assert!(installer_for(Platform::Other).is_none());
    }

    #[test]
    fn test_existing_interpreter_skips_install() {
        let runner = ScriptedRunner::new().on("python3.10 --version", vec![ok("Python 3.10.12")]);
        let found = ensure_interpreter(&runner, Platform::Linux, "3.10").unwrap();
        assert_eq!(found.command, PathBuf::from("python3.10"));
        assert!(runner.position("apt-get").is_none());
    }

    #[test]
    fn test_falls_back_to_python3_when_versioned_binary_missing() {
        let runner = ScriptedRunner::new()
            .without_program("python3.10")
            .on("python3 --version", vec![ok("Python 3.10.4")]);
        let found = ensure_interpreter(&runner, Platform::MacOS, "3.10").unwrap();
        assert_eq!(found.command, PathBuf::from("python3"));
    }

    #[test]
    fn test_linux_installs_then_reprobes() {
        let runner = ScriptedRunner::new()
            .on(
                "python3.10 --version",
                vec![fail(127, "not found"), ok("Python 3.10.12")],
            )
            .on("python3 --version", vec![ok("Python 3.12.1")])
            .on("python --version", vec![fail(127, "")]);
        let found = ensure_interpreter(&runner, Platform::Linux, "3.10").unwrap();
        assert_eq!(found.version.minor, 10);

        let calls = runner.calls();
        let update = runner.position("sudo apt-get update").unwrap();
        let install = runner.position("sudo apt-get install -y python3.10").unwrap();
        assert!(update < install);
        assert!(runner.position("brew").is_none());
        assert_eq!(calls.last().unwrap(), "python3.10 --version");
    }

    #[test]
    fn test_macos_uses_brew() {
        let runner = ScriptedRunner::new()
            .on(
                "python3.10 --version",
                vec![fail(1, ""), ok("Python 3.10.14")],
            )
            .on("python3 --version", vec![fail(1, "")])
            .on("python --version", vec![fail(1, "")]);
        ensure_interpreter(&runner, Platform::MacOS, "3.10").unwrap();
        assert!(runner.position("brew install python@3.10").is_some());
        assert!(runner.position("apt-get").is_none());
    }

    #[test]
    fn test_unknown_platform_is_unavailable() {
        let runner = ScriptedRunner::new()
            .without_program("python3.10")
            .without_program("python3")
            .without_program("python");
        let err = ensure_interpreter(&runner, Platform::Other, "3.10").unwrap_err();
        assert!(matches!(err, BootstrapError::InterpreterUnavailable { .. }));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_failed_install_is_unavailable() {
        let runner = ScriptedRunner::new()
            .without_program("python3.10")
            .without_program("python3")
            .without_program("python")
            .on("apt-get install", vec![fail(100, "E: Unable to locate package python3.10")]);
        let err = ensure_interpreter(&runner, Platform::Linux, "3.10").unwrap_err();
        match err {
            BootstrapError::InterpreterUnavailable { reason, .. } => {
                assert!(reason.contains("Unable to locate package"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
