//! Import verification inside the activated environment.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::BootstrapError;
use crate::info_log;
use crate::runner::CommandRunner;
use crate::venv::ActivatedEnv;

/// Dotted Python identifier, e.g. `torch` or `transformers.pipelines`.
pub fn is_valid_module_name(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("static regex")
    });
    re.is_match(name)
}

fn checked(module: &str) -> Result<&str, BootstrapError> {
    if is_valid_module_name(module) {
        Ok(module)
    } else {
        Err(BootstrapError::VerificationFailed {
            module: module.to_string(),
            reason: "not a valid Python module name".to_string(),
        })
    }
}

/// Import each module in order; stop at the first failure.
pub fn verify_imports<R, S>(runner: &R, env: &ActivatedEnv, modules: &[S]) -> Result<(), BootstrapError>
where
    R: CommandRunner + ?Sized,
    S: AsRef<str>,
{
    for module in modules {
        let module = checked(module.as_ref())?;
        let cmd = env
            .python_command()
            .arg("-c")
            .arg(format!("import {}", module));
        let out = runner.run(&cmd).map_err(|e| BootstrapError::VerificationFailed {
            module: module.to_string(),
            reason: e.to_string(),
        })?;
        if !out.success() {
            return Err(BootstrapError::VerificationFailed {
                module: module.to_string(),
                reason: out.diagnostic(),
            });
        }
        info_log!("✓ import {}", module);
    }
    Ok(())
}

/// `module.__version__` as reported inside the environment.
pub fn module_version<R: CommandRunner + ?Sized>(
    runner: &R,
    env: &ActivatedEnv,
    module: &str,
) -> Result<String, BootstrapError> {
    let module = checked(module)?;
    let cmd = env
        .python_command()
        .arg("-c")
        .arg(format!("import {m}; print({m}.__version__)", m = module));
    let out = runner.run(&cmd)?;
    let version = out.stdout.trim();
    if !out.success() || version.is_empty() {
        return Err(BootstrapError::VerificationFailed {
            module: module.to_string(),
            reason: out.diagnostic(),
        });
    }
    Ok(version.lines().last().unwrap_or(version).trim().to_string())
}
