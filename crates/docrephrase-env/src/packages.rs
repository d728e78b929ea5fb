//! Package manifest and pip installation inside an activated environment.

use serde::{Deserialize, Serialize};

use crate::error::BootstrapError;
use crate::info_log;
use crate::runner::CommandRunner;
use crate::venv::ActivatedEnv;

/// One pip-installable package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    /// PEP 440 specifier appended to the name, e.g. `>=4.30`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_constraint: Option<String>,
    /// Replaces the default index for this package only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_url: Option<String>,
    /// Module name when it differs from the distribution name (`python-docx` → `docx`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_name: Option<String>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_constraint: None,
            index_url: None,
            import_name: None,
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.version_constraint = Some(constraint.into());
        self
    }

    pub fn from_index(mut self, url: impl Into<String>) -> Self {
        self.index_url = Some(url.into());
        self
    }

    pub fn imported_as(mut self, module: impl Into<String>) -> Self {
        self.import_name = Some(module.into());
        self
    }

    /// Requirement string passed to pip.
    pub fn requirement(&self) -> String {
        match self.version_constraint {
            Some(ref c) => format!("{}{}", self.name, c),
            None => self.name.clone(),
        }
    }

    /// Module to import when verifying this package.
    pub fn module(&self) -> String {
        self.import_name
            .clone()
            .unwrap_or_else(|| self.name.replace('-', "_"))
    }
}

/// CPU-only PyTorch, installed first from its own index.
pub fn numerical_package(torch_index_url: &str) -> PackageSpec {
    PackageSpec::new("torch").from_index(torch_index_url)
}

/// NLP stack installed after the numerical library, in this order.
pub fn nlp_packages() -> Vec<PackageSpec> {
    vec![
        PackageSpec::new("transformers"),
        PackageSpec::new("sentencepiece"),
        PackageSpec::new("accelerate"),
        PackageSpec::new("python-docx").imported_as("docx"),
        PackageSpec::new("nltk"),
    ]
}

/// `python -m pip install --upgrade pip`
pub fn upgrade_package_manager<R: CommandRunner + ?Sized>(
    runner: &R,
    env: &ActivatedEnv,
) -> Result<(), BootstrapError> {
    info_log!("Upgrading pip in {}", env.root().display());
    let cmd = env.python_command().args([
        "-m",
        "pip",
        "install",
        "--disable-pip-version-check",
        "--upgrade",
        "pip",
    ]);
    let out = runner.run(&cmd)?;
    if !out.success() {
        return Err(BootstrapError::InstallationFailed {
            package: "pip".to_string(),
            reason: out.diagnostic(),
        });
    }
    Ok(())
}

/// Install one package. `extra_index_url` is only used for packages that do
/// not carry their own index.
pub fn install_package<R: CommandRunner + ?Sized>(
    runner: &R,
    env: &ActivatedEnv,
    package: &PackageSpec,
    extra_index_url: Option<&str>,
) -> Result<(), BootstrapError> {
    let requirement = package.requirement();
    info_log!("Installing {}", requirement);

    let mut cmd = env.python_command().args([
        "-m",
        "pip",
        "install",
        "--disable-pip-version-check",
        requirement.as_str(),
    ]);
    match (package.index_url.as_deref(), extra_index_url) {
        (Some(index), _) => cmd = cmd.args(["--index-url", index]),
        (None, Some(extra)) => cmd = cmd.args(["--extra-index-url", extra]),
        (None, None) => {}
    }

    let out = runner.run(&cmd).map_err(|e| BootstrapError::InstallationFailed {
        package: package.name.clone(),
        reason: e.to_string(),
    })?;
    if !out.success() {
        return Err(BootstrapError::InstallationFailed {
            package: package.name.clone(),
            reason: out.diagnostic(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::{fail, ScriptedRunner};

    fn env() -> ActivatedEnv {
        ActivatedEnv::for_root("/work/venv")
    }

    #[test]
    fn test_requirement_and_module() {
        let p = PackageSpec::new("python-docx").imported_as("docx");
        assert_eq!(p.requirement(), "python-docx");
        assert_eq!(p.module(), "docx");
        let p = PackageSpec::new("nltk").with_constraint(">=3.8");
        assert_eq!(p.requirement(), "nltk>=3.8");
        assert_eq!(p.module(), "nltk");
        assert_eq!(PackageSpec::new("some-pkg").module(), "some_pkg");
    }

    #[test]
    fn test_nlp_packages_order() {
        let names: Vec<String> = nlp_packages().into_iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec!["transformers", "sentencepiece", "accelerate", "python-docx", "nltk"]
        );
    }

    #[test]
    fn test_install_uses_package_index() {
        let runner = ScriptedRunner::new();
        let torch = numerical_package("https://download.pytorch.org/whl/cpu");
        install_package(&runner, &env(), &torch, Some("https://mirror.example/simple")).unwrap();
        let calls = runner.calls();
        let call = &calls[0];
        assert!(call.contains("-m pip install --disable-pip-version-check torch"));
        assert!(call.ends_with("--index-url https://download.pytorch.org/whl/cpu"));
        assert!(!call.contains("--extra-index-url"));
    }

    #[test]
    fn test_install_uses_extra_index_for_plain_packages() {
        let runner = ScriptedRunner::new();
        install_package(&runner, &env(), &PackageSpec::new("nltk"), Some("https://mirror.example/simple")).unwrap();
        assert!(runner.calls()[0].ends_with("nltk --extra-index-url https://mirror.example/simple"));
    }

    #[test]
    fn test_install_failure_names_package() {
        let runner = ScriptedRunner::new().on(
            "pip install",
            vec![fail(1, "ERROR: Could not find a version that satisfies the requirement torch")],
        );
        let err = install_package(&runner, &env(), &numerical_package("https://x"), None).unwrap_err();
        match err {
            BootstrapError::InstallationFailed { package, reason } => {
                assert_eq!(package, "torch");
                assert!(reason.contains("Could not find a version"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_upgrade_pip_failure() {
        let runner = ScriptedRunner::new().on("--upgrade pip", vec![fail(2, "")]);
        let err = upgrade_package_manager(&runner, &env()).unwrap_err();
        assert!(matches!(err, BootstrapError::InstallationFailed { ref package, .. } if package == "pip"));
    }
}
