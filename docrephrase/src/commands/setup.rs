//! `docrephrase setup`: provision the environment end to end.
//!
//! Flow:
//!   1. Resolve config (env / .env) and apply CLI overrides
//!   2. Decide the platform once, here at the boundary
//!   3. Run the bootstrapper (interpreter → venv → packages → corpus → verify)
//!   4. Create input/ and output/, print versions and usage

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use docrephrase_core::config::BootstrapConfig;
use docrephrase_core::Platform;
use docrephrase_env::{
    BootstrapOptions, BootstrapPlan, BootstrapStep, Bootstrapper, StepFailure, SystemRunner,
};

use crate::cli::SetupArgs;
use crate::commands::usage::{usage_text, INPUT_DIR, OUTPUT_DIR};

fn progress_line(step: BootstrapStep, detail: &str) -> Option<String> {
    let line = match step {
        BootstrapStep::EnsureInterpreter => format!("🐍 Checking for Python {}...", detail),
        BootstrapStep::CreateEnvironment => format!("📁 Creating virtual environment at {}...", detail),
        BootstrapStep::Activate => "🔌 Activating virtual environment...".to_string(),
        BootstrapStep::UpgradePackageManager => "⬆️  Upgrading pip...".to_string(),
        BootstrapStep::InstallNumerical => format!("📦 Installing {} (CPU-only build)...", detail),
        BootstrapStep::VerifyNumerical => format!("🔍 Verifying {} installation...", detail),
        BootstrapStep::InstallPackages => format!("📦 Installing {}...", detail),
        BootstrapStep::FetchCorpus => format!("📚 Downloading NLTK data '{}'...", detail),
        BootstrapStep::VerifyAll => "🔍 Verifying all installations...".to_string(),
        BootstrapStep::ReportVersions | BootstrapStep::Finalize => return None,
    };
    Some(line)
}

fn setup_failure(failure: StepFailure) -> anyhow::Error {
    anyhow::anyhow!("Setup failed during {}: {}", failure.step, failure.error)
}

/// Create the rephraser's working directories under `base`.
pub fn prepare_workdirs(base: &Path) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for name in [INPUT_DIR, OUTPUT_DIR] {
        let dir = base.join(name);
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            created.push(dir);
        }
    }
    Ok(created)
}

/// `docrephrase setup`
pub fn cmd_setup(args: &SetupArgs) -> Result<()> {
    let mut cfg = BootstrapConfig::from_env();
    args.apply(&mut cfg);
    let platform = Platform::detect(cfg.platform_override.as_deref())?;
    tracing::debug!(platform = %platform, venv = %cfg.venv_dir.display(), "Resolved bootstrap config");

    eprintln!("🚀 Setting up the document rephraser environment");
    eprintln!("   Platform: {}  Python: {}", platform, cfg.python_version);
    eprintln!();

    let print_progress = |step: BootstrapStep, detail: &str| {
        if let Some(line) = progress_line(step, detail) {
            eprintln!("{}", line);
        }
    };
    let runner = SystemRunner;
    let outcome = Bootstrapper::new(
        &runner,
        platform,
        BootstrapPlan::from_config(&cfg),
        BootstrapOptions { force: args.force },
    )
    .with_progress(&print_progress)
    .run()
    .map_err(setup_failure)?;

    eprintln!();
    if outcome.reused {
        eprintln!(
            "✓ Existing environment at {} verified (use --force to rebuild)",
            cfg.venv_dir.display()
        );
    } else {
        eprintln!("✓ Setup completed successfully!");
    }
    for v in &outcome.report.versions {
        println!("{} version: {}", v.label, v.version);
    }

    if !args.no_workdirs {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        for dir in prepare_workdirs(&cwd)? {
            eprintln!("📁 Created {}", dir.display());
        }
    }

    eprintln!();
    eprintln!("{}", usage_text(&cfg.venv_dir));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_workdirs_creates_missing_only() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(INPUT_DIR)).unwrap();

        let created = prepare_workdirs(tmp.path()).unwrap();

        assert_eq!(created, vec![tmp.path().join(OUTPUT_DIR)]);
        assert!(tmp.path().join(INPUT_DIR).is_dir());
        assert!(tmp.path().join(OUTPUT_DIR).is_dir());
        assert!(prepare_workdirs(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_setup_failure_names_the_step() {
        let failure = StepFailure {
            step: BootstrapStep::InstallNumerical,
            error: docrephrase_env::BootstrapError::InstallationFailed {
                package: "torch".into(),
                reason: "network unreachable".into(),
            },
        };
        assert_eq!(
            format!("{:#}", setup_failure(failure)),
            "Setup failed during install numerical library: Installation failed for 'torch': network unreachable"
        );
    }

    #[test]
    fn test_progress_lines() {
        assert_eq!(
            progress_line(BootstrapStep::InstallNumerical, "torch").unwrap(),
            "📦 Installing torch (CPU-only build)..."
        );
        assert!(progress_line(BootstrapStep::Finalize, "").is_none());
    }
}
