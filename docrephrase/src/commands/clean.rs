//! `docrephrase clean`: remove the virtual environment.
//!
//! Only directories that look like a venv (`pyvenv.cfg` or the completion
//! marker) are removed.

use anyhow::{Context, Result};
use std::fs;
use std::io::BufRead;
use std::path::Path;

use docrephrase_env::venv::looks_like_venv;

/// Remove `venv_dir`. `confirm` is asked when `force` is false.
pub fn clean_environment<C>(venv_dir: &Path, dry_run: bool, force: bool, confirm: C) -> Result<bool>
where
    C: FnOnce() -> Result<bool>,
{
    if !venv_dir.exists() {
        eprintln!("No environment found at {}", venv_dir.display());
        return Ok(false);
    }
    if !venv_dir.is_dir() || !looks_like_venv(venv_dir) {
        anyhow::bail!(
            "{} does not look like a virtual environment (no pyvenv.cfg); refusing to remove it",
            venv_dir.display()
        );
    }

    let size = dir_size(venv_dir);
    eprintln!("🗂  Environment at {} ({})", venv_dir.display(), format_size(size));

    if dry_run {
        eprintln!();
        eprintln!("(Dry run: no files removed. Remove --dry-run to delete.)");
        return Ok(false);
    }

    if !force && !confirm()? {
        eprintln!("Cancelled.");
        return Ok(false);
    }

    fs::remove_dir_all(venv_dir)
        .with_context(|| format!("Failed to remove {}", venv_dir.display()))?;
    eprintln!("✓ Removed environment, freed {}", format_size(size));
    Ok(true)
}

fn confirm_on_stdin() -> Result<bool> {
    eprint!("\nRemove the environment? [y/N] ");
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// `docrephrase clean`
pub fn cmd_clean(venv_dir: &Path, dry_run: bool, force: bool) -> Result<()> {
    clean_environment(venv_dir, dry_run, force, confirm_on_stdin).map(|_| ())
}

/// Compute total size of a directory recursively.
fn dir_size(path: &Path) -> u64 {
    let mut total: u64 = 0;
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let p = entry.path();
            if p.is_dir() {
                total += dir_size(&p);
            } else if let Ok(meta) = p.metadata() {
                total += meta.len();
            }
        }
    }
    total
}

/// Format byte size to human-readable string.
fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
