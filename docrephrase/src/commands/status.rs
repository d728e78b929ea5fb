//! `docrephrase status`: is the environment ready for doc_rephraser.py?

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use docrephrase_env::report::{read_report, BootstrapReport};
use docrephrase_env::venv::{is_complete, python_executable};

#[derive(Debug, Serialize)]
pub struct EnvStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<BootstrapReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
}

impl EnvStatus {
    pub fn ready(&self) -> bool {
        self.complete && self.python.is_some() && self.problem.is_none()
    }
}

/// Inspect the environment directory without running anything inside it.
pub fn inspect(venv_dir: &Path) -> EnvStatus {
    let exists = venv_dir.is_dir();
    let python = Some(python_executable(venv_dir)).filter(|p| p.exists());
    let complete = exists && is_complete(venv_dir);
    let (report, problem) = match read_report(venv_dir) {
        Ok(report) => (report, None),
        Err(e) => (None, Some(e.to_string())),
    };
    let problem = problem.or_else(|| {
        if complete && python.is_none() {
            Some("interpreter missing from a completed environment".to_string())
        } else {
            None
        }
    });
    EnvStatus {
        path: venv_dir.to_path_buf(),
        exists,
        complete,
        python,
        report,
        problem,
    }
}

/// `docrephrase status`. Returns whether the environment is ready.
pub fn cmd_status(venv_dir: &Path, json: bool) -> Result<bool> {
    let status = inspect(venv_dir);
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(status.ready());
    }

    if !status.exists {
        eprintln!("✗ No environment at {}", venv_dir.display());
        eprintln!("  Run `docrephrase setup` first.");
        return Ok(false);
    }
    if let Some(ref problem) = status.problem {
        eprintln!("✗ Environment at {} is broken: {}", venv_dir.display(), problem);
        eprintln!("  Run `docrephrase setup --force` to rebuild it.");
        return Ok(false);
    }
    if !status.complete {
        eprintln!("✗ Environment at {} is incomplete (setup did not finish)", venv_dir.display());
        eprintln!("  Run `docrephrase setup` to finish it.");
        return Ok(false);
    }

    eprintln!("✓ Environment ready at {}", venv_dir.display());
    if let Some(ref python) = status.python {
        eprintln!("  Interpreter: {}", python.display());
    }
    if let Some(ref report) = status.report {
        eprintln!("  Python:      {}", report.descriptor.interpreter_version);
        eprintln!("  Platform:    {}", report.platform);
        eprintln!("  Completed:   {}", report.completed_at);
        eprintln!("  Packages:");
        for p in &report.descriptor.installed_packages {
            match p.index_url {
                Some(ref index) => eprintln!("    • {} ({})", p.requirement(), index),
                None => eprintln!("    • {}", p.requirement()),
            }
        }
        if !report.corpus.is_empty() {
            eprintln!("  NLTK data:   {}", report.corpus.join(", "));
        }
        for v in &report.versions {
            println!("{} version: {}", v.label, v.version);
        }
    }
    Ok(status.ready())
}
