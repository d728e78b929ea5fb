//! Bootstrap driver: runs every step in the fixed order and tags failures
//! with the step that produced them.
//!
//! Order: interpreter → venv → activate → upgrade pip → numerical library
//! (own index) → verify it → remaining packages in listed order → corpus →
//! final import check → versions → completion marker.
//!
//! All-or-nothing: the first failing step ends the run, nothing is retried
//! or rolled back. A complete environment that still matches the plan is
//! reused and only re-verified unless `force` is set; a stale one is rebuilt.

use std::path::{Path, PathBuf};
use std::time::Instant;

use docrephrase_core::config::BootstrapConfig;
use docrephrase_core::observability::{
    audit_bootstrap_finished, audit_step_completed, audit_step_failed, audit_step_started,
};
use docrephrase_core::Platform;
use serde::{Deserialize, Serialize};

use crate::corpus::{fetch_corpus_resource, PUNKT};
use crate::error::{BootstrapError, BootstrapStep, StepFailure};
use crate::info_log;
use crate::interpreter::{ensure_interpreter, PythonVersion, VersionRequest};
use crate::packages::{install_package, nlp_packages, numerical_package, upgrade_package_manager, PackageSpec};
use crate::report::{self, BootstrapReport, ModuleVersion};
use crate::runner::CommandRunner;
use crate::venv::{self, create_isolated_environment, ActivatedEnv, ExistingEnvPolicy};
use crate::verify::{module_version, verify_imports};

/// What this run built: interpreter, location, packages in install order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvDescriptor {
    pub interpreter_version: String,
    pub isolation_path: PathBuf,
    pub installed_packages: Vec<PackageSpec>,
}

impl EnvDescriptor {
    pub fn new(interpreter_version: impl Into<String>, isolation_path: impl Into<PathBuf>) -> Self {
        Self {
            interpreter_version: interpreter_version.into(),
            isolation_path: isolation_path.into(),
            installed_packages: Vec::new(),
        }
    }

    pub fn record_installed(&mut self, package: PackageSpec) {
        self.installed_packages.push(package);
    }
}

/// Everything the driver installs and checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPlan {
    pub python_version: String,
    pub venv_dir: PathBuf,
    /// Installed and verified before anything else.
    pub numerical: PackageSpec,
    pub packages: Vec<PackageSpec>,
    pub extra_index_url: Option<String>,
    pub corpus: Vec<String>,
    pub corpus_dir: Option<PathBuf>,
    /// (module, label) pairs whose `__version__` is reported.
    pub version_report: Vec<(String, String)>,
}

impl BootstrapPlan {
    pub fn from_config(cfg: &BootstrapConfig) -> Self {
        Self {
            python_version: cfg.python_version.clone(),
            venv_dir: cfg.venv_dir.clone(),
            numerical: numerical_package(&cfg.torch_index_url),
            packages: nlp_packages(),
            extra_index_url: cfg.extra_index_url.clone(),
            corpus: vec![PUNKT.to_string()],
            corpus_dir: cfg.nltk_data.clone(),
            version_report: vec![
                ("torch".to_string(), "PyTorch".to_string()),
                ("transformers".to_string(), "Transformers".to_string()),
            ],
        }
    }

    /// Modules imported by the final verification.
    pub fn critical_modules(&self) -> Vec<String> {
        std::iter::once(&self.numerical)
            .chain(self.packages.iter())
            .map(PackageSpec::module)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BootstrapOptions {
    /// Remove and rebuild even a complete environment.
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct BootstrapOutcome {
    pub report: BootstrapReport,
    /// True when an existing complete environment was only re-verified.
    pub reused: bool,
}

/// Called before each step with a short detail (package name, path, ...).
pub type ProgressFn<'a> = &'a dyn Fn(BootstrapStep, &str);

pub struct Bootstrapper<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    platform: Platform,
    plan: BootstrapPlan,
    options: BootstrapOptions,
    progress: Option<ProgressFn<'a>>,
}

impl<'a, R: CommandRunner + ?Sized> Bootstrapper<'a, R> {
    pub fn new(runner: &'a R, platform: Platform, plan: BootstrapPlan, options: BootstrapOptions) -> Self {
        Self {
            runner,
            platform,
            plan,
            options,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn plan(&self) -> &BootstrapPlan {
        &self.plan
    }

    pub fn run(&self) -> Result<BootstrapOutcome, StepFailure> {
        let root = self.plan.venv_dir.as_path();
        let result = if self.options.force {
            self.provision(root, ExistingEnvPolicy::Recreate)
        } else if venv::is_complete(root) {
            match report::read_report(root) {
                Ok(Some(existing)) => match self.stale_reason(&existing) {
                    None => self.reverify(root, existing),
                    Some(reason) => {
                        tracing::warn!("Rebuilding environment at {}: {}", root.display(), reason);
                        self.provision(root, ExistingEnvPolicy::Recreate)
                    }
                },
                Ok(None) | Err(_) => {
                    tracing::warn!(
                        "Completion marker at {} is unreadable; rebuilding the environment",
                        root.display()
                    );
                    self.provision(root, ExistingEnvPolicy::Recreate)
                }
            }
        } else {
            self.provision(root, ExistingEnvPolicy::Reuse)
        };
        audit_bootstrap_finished(result.is_ok(), &root.to_string_lossy());
        result
    }

    /// Why a completed environment no longer satisfies the plan, if it doesn't.
    fn stale_reason(&self, existing: &BootstrapReport) -> Option<String> {
        let recorded = &existing.descriptor.interpreter_version;
        let version_ok = match VersionRequest::parse(&self.plan.python_version) {
            Ok(request) => PythonVersion::parse_banner(&format!("Python {recorded}"))
                .is_some_and(|found| request.matches(&found)),
            Err(_) => false,
        };
        if !version_ok {
            return Some(format!(
                "built with Python {recorded}, Python {} requested",
                self.plan.python_version
            ));
        }
        if existing.platform != self.platform.as_str() {
            return Some(format!(
                "built on {}, running on {}",
                existing.platform, self.platform
            ));
        }
        let wanted: Vec<&PackageSpec> = std::iter::once(&self.plan.numerical)
            .chain(self.plan.packages.iter())
            .collect();
        let installed: Vec<&PackageSpec> = existing.descriptor.installed_packages.iter().collect();
        if installed != wanted {
            return Some("installed packages differ from the requested set".to_string());
        }
        None
    }

    fn reverify(&self, root: &Path, mut report: BootstrapReport) -> Result<BootstrapOutcome, StepFailure> {
        info_log!("Environment at {} is complete; re-verifying", root.display());
        let env = self.step(BootstrapStep::Activate, &root.to_string_lossy(), || {
            ActivatedEnv::activate(root)
        })?;
        report.versions = self.verify_and_report(&env)?;
        Ok(BootstrapOutcome {
            report,
            reused: true,
        })
    }

    fn verify_and_report(&self, env: &ActivatedEnv) -> Result<Vec<ModuleVersion>, StepFailure> {
        let critical = self.plan.critical_modules();
        self.step(BootstrapStep::VerifyAll, &critical.join(","), || {
            verify_imports(self.runner, env, critical.as_slice())
        })?;

        self.step(BootstrapStep::ReportVersions, "", || {
            self.plan
                .version_report
                .iter()
                .map(|(module, label)| -> Result<ModuleVersion, BootstrapError> {
                    Ok(ModuleVersion {
                        module: module.clone(),
                        label: label.clone(),
                        version: module_version(self.runner, env, module)?,
                    })
                })
                .collect::<Result<Vec<_>, BootstrapError>>()
        })
    }

    fn step<T, F>(&self, step: BootstrapStep, detail: &str, f: F) -> Result<T, StepFailure>
    where
        F: FnOnce() -> Result<T, BootstrapError>,
    {
        if let Some(progress) = self.progress {
            progress(step, detail);
        }
        audit_step_started(step.as_str(), detail);
        let started = Instant::now();
        match f() {
            Ok(value) => {
                audit_step_completed(step.as_str(), started.elapsed().as_millis() as u64);
                Ok(value)
            }
            Err(error) => {
                audit_step_failed(step.as_str(), &error.to_string());
                Err(StepFailure { step, error })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::{fail, ok, ScriptedRunner};
    use crate::venv::{fake_venv, ENV_MARKER_FILE};
    use std::cell::RefCell;

    fn plan(root: &Path) -> BootstrapPlan {
        let cfg = BootstrapConfig {
            venv_dir: root.to_path_buf(),
            ..BootstrapConfig::default()
        };
        BootstrapPlan::from_config(&cfg)
    }

    /// Runner where every tool succeeds; `venv` creates the interpreter file.
    fn healthy(runner: ScriptedRunner) -> ScriptedRunner {
        runner
            .on("print(torch.__version__)", vec![ok("2.2.1+cpu\n")])
            .on("print(transformers.__version__)", vec![ok("4.40.0\n")])
            .on_with("-m venv", vec![ok("")], |cmd| {
                fake_venv(Path::new(cmd.args.last().unwrap()));
            })
            .on("--version", vec![ok("Python 3.10.12")])
    }

    #[test]
    fn test_critical_modules() {
        let p = plan(Path::new("venv"));
        assert_eq!(
            p.critical_modules(),
            vec!["torch", "transformers", "sentencepiece", "accelerate", "docx", "nltk"]
        );
    }

    #[test]
    fn test_linux_end_to_end_without_interpreter() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("venv");
        let runner = healthy(
            ScriptedRunner::new()
                .on("python3.10 --version", vec![fail(127, ""), ok("Python 3.10.12")])
                .on("python3 --version", vec![fail(127, "")])
                .on("python --version", vec![fail(127, "")]),
        );

        let outcome = Bootstrapper::new(&runner, Platform::Linux, plan(&root), BootstrapOptions::default())
            .run()
            .unwrap();

        let order = [
            "sudo apt-get install -y python3.10 python3.10-venv",
            "-m venv",
            "--upgrade pip",
            "--disable-pip-version-check torch --index-url https://download.pytorch.org/whl/cpu",
            "-c import torch",
            "--disable-pip-version-check transformers",
            "--disable-pip-version-check sentencepiece",
            "--disable-pip-version-check accelerate",
            "--disable-pip-version-check python-docx",
            "--disable-pip-version-check nltk",
            "nltk.download('punkt'",
            "-c import docx",
            "print(torch.__version__)",
            "print(transformers.__version__)",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|p| runner.position(p).unwrap_or_else(|| panic!("missing call: {p}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", runner.calls());
        assert!(runner.position("brew").is_none());

        assert!(!outcome.reused);
        let report = &outcome.report;
        assert_eq!(report.platform, "linux");
        assert_eq!(report.descriptor.interpreter_version, "3.10.12");
        assert_eq!(report.descriptor.installed_packages.len(), 6);
        assert_eq!(report.descriptor.installed_packages[0].name, "torch");
        assert_eq!(report.versions[0].version, "2.2.1+cpu");
        assert_eq!(report.versions[1].label, "Transformers");
        assert_eq!(report.versions[1].version, "4.40.0");
        assert!(root.join(ENV_MARKER_FILE).exists());
    }

    #[test]
    fn test_numerical_install_failure_stops_run() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("venv");
        let runner = healthy(
            ScriptedRunner::new().on("torch --index-url", vec![fail(1, "ERROR: network unreachable")]),
        );

        let err = Bootstrapper::new(&runner, Platform::Linux, plan(&root), BootstrapOptions::default())
            .run()
            .unwrap_err();

        assert_eq!(err.step, BootstrapStep::InstallNumerical);
        assert!(matches!(err.error, BootstrapError::InstallationFailed { ref package, .. } if package == "torch"));
        assert!(runner.position("transformers").is_none());
        assert!(runner.position("import torch").is_none());
        assert!(!root.join(ENV_MARKER_FILE).exists());
    }

    #[test]
    fn test_numerical_verify_failure_stops_before_nlp_packages() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("venv");
        let runner = healthy(
            ScriptedRunner::new().on("-c import torch", vec![fail(1, "ImportError: libtorch_cpu.so")]),
        );

        let err = Bootstrapper::new(&runner, Platform::Linux, plan(&root), BootstrapOptions::default())
            .run()
            .unwrap_err();

        assert_eq!(err.step, BootstrapStep::VerifyNumerical);
        assert!(matches!(err.error, BootstrapError::VerificationFailed { ref module, .. } if module == "torch"));
        assert!(runner.position("transformers").is_none());
    }

    #[test]
    fn test_unknown_platform_without_interpreter() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("venv");
        let runner = ScriptedRunner::new()
            .without_program("python3.10")
            .without_program("python3")
            .without_program("python");

        let err = Bootstrapper::new(&runner, Platform::Other, plan(&root), BootstrapOptions::default())
            .run()
            .unwrap_err();

        assert_eq!(err.step, BootstrapStep::EnsureInterpreter);
        assert!(!root.exists());
    }

    #[test]
    fn test_rerun_reuses_complete_environment() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("venv");
        let runner = healthy(ScriptedRunner::new());
        let first = Bootstrapper::new(&runner, Platform::MacOS, plan(&root), BootstrapOptions::default())
            .run()
            .unwrap();
        let calls_after_first = runner.calls().len();

        let second = Bootstrapper::new(&runner, Platform::MacOS, plan(&root), BootstrapOptions::default())
            .run()
            .unwrap();

        assert!(second.reused);
        assert_eq!(second.report.descriptor, first.report.descriptor);
        let calls = runner.calls();
        let new_calls = &calls[calls_after_first..];
        assert!(new_calls.iter().all(|c| !c.contains("-m venv") && !c.contains("pip install")));
        assert!(new_calls.iter().any(|c| c.ends_with("-c import nltk")));
        assert!(root.join(ENV_MARKER_FILE).exists());
    }

    #[test]
    fn test_rerun_with_other_python_rebuilds_environment() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("venv");
        let runner = healthy(ScriptedRunner::new().on("python3.11 --version", vec![ok("Python 3.11.9")]));
        Bootstrapper::new(&runner, Platform::Linux, plan(&root), BootstrapOptions::default())
            .run()
            .unwrap();
        let calls_after_first = runner.calls().len();

        let mut wanted = plan(&root);
        wanted.python_version = "3.11".to_string();
        let outcome = Bootstrapper::new(&runner, Platform::Linux, wanted, BootstrapOptions::default())
            .run()
            .unwrap();

        assert!(!outcome.reused);
        assert_eq!(outcome.report.descriptor.interpreter_version, "3.11.9");
        let calls = runner.calls();
        let new_calls = &calls[calls_after_first..];
        assert!(new_calls.iter().any(|c| c == &format!("python3.11 -m venv {}", root.display())));
        let stored = report::read_report(&root).unwrap().unwrap();
        assert_eq!(stored.descriptor.interpreter_version, "3.11.9");
    }

    #[test]
    fn test_rerun_with_other_torch_index_rebuilds_environment() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("venv");
        let runner = healthy(ScriptedRunner::new());
        Bootstrapper::new(&runner, Platform::Linux, plan(&root), BootstrapOptions::default())
            .run()
            .unwrap();

        let cfg = BootstrapConfig {
            venv_dir: root.clone(),
            torch_index_url: "https://mirror.example/whl/cpu".to_string(),
            ..BootstrapConfig::default()
        };
        let outcome = Bootstrapper::new(&runner, Platform::Linux, BootstrapPlan::from_config(&cfg), BootstrapOptions::default())
            .run()
            .unwrap();

        assert!(!outcome.reused);
        assert!(runner.position("torch --index-url https://mirror.example/whl/cpu").is_some());
    }

    #[test]
    fn test_malformed_marker_is_rebuilt() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("venv");
        fake_venv(&root);
        std::fs::write(root.join(ENV_MARKER_FILE), "{ not json").unwrap();
        let runner = healthy(ScriptedRunner::new());

        let outcome = Bootstrapper::new(&runner, Platform::Linux, plan(&root), BootstrapOptions::default())
            .run()
            .unwrap();

        assert!(!outcome.reused);
        assert_eq!(outcome.report.descriptor.interpreter_version, "3.10.12");
        let stored = report::read_report(&root).unwrap().unwrap();
        assert_eq!(stored.descriptor, outcome.report.descriptor);
    }

    #[test]
    fn test_force_rebuilds_complete_environment() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("venv");
        let runner = healthy(ScriptedRunner::new());
        Bootstrapper::new(&runner, Platform::Linux, plan(&root), BootstrapOptions::default())
            .run()
            .unwrap();
        let calls_after_first = runner.calls().len();

        let outcome = Bootstrapper::new(&runner, Platform::Linux, plan(&root), BootstrapOptions { force: true })
            .run()
            .unwrap();

        assert!(!outcome.reused);
        let calls = runner.calls();
        let new_calls = &calls[calls_after_first..];
        assert!(new_calls.iter().any(|c| c.contains("-m venv")));
    }

    #[test]
    fn test_progress_reports_steps_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("venv");
        let runner = healthy(ScriptedRunner::new());
        let seen = RefCell::new(Vec::new());
        let record = |step: BootstrapStep, _detail: &str| seen.borrow_mut().push(step);

        Bootstrapper::new(&runner, Platform::Linux, plan(&root), BootstrapOptions::default())
            .with_progress(&record)
            .run()
            .unwrap();

        let mut steps = seen.into_inner();
        steps.dedup();
        assert_eq!(
            steps,
            vec![
                BootstrapStep::EnsureInterpreter,
                BootstrapStep::CreateEnvironment,
                BootstrapStep::Activate,
                BootstrapStep::UpgradePackageManager,
                BootstrapStep::InstallNumerical,
                BootstrapStep::VerifyNumerical,
                BootstrapStep::InstallPackages,
                BootstrapStep::FetchCorpus,
                BootstrapStep::VerifyAll,
                BootstrapStep::ReportVersions,
                BootstrapStep::Finalize,
            ]
        );
    }
}
