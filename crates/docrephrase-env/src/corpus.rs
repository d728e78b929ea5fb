//! One-time download of NLTK data packages (e.g. the `punkt` sentence tokenizer).

use std::path::Path;

use crate::error::BootstrapError;
use crate::info_log;
use crate::runner::CommandRunner;
use crate::venv::ActivatedEnv;

/// Sentence-tokenizer data needed by nltk at runtime.
pub const PUNKT: &str = "punkt";

/// NLTK resource ids are plain names (`punkt`, `averaged_perceptron_tagger`, `omw-1.4`).
pub fn is_valid_resource_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Python snippet that downloads `resource_id` and exits 1 when nltk reports failure.
fn download_script(resource_id: &str, download_dir: Option<&Path>) -> String {
    let dir_arg = match download_dir {
        // A JSON string literal is also a valid Python string literal.
        Some(dir) => format!(
            ", download_dir={}",
            serde_json::Value::String(dir.to_string_lossy().to_string())
        ),
        None => String::new(),
    };
    format!(
        "import sys, nltk; sys.exit(0 if nltk.download('{}', quiet=True{}) else 1)",
        resource_id, dir_arg
    )
}

/// Download an NLTK data package into the default (or given) data directory.
pub fn fetch_corpus_resource<R: CommandRunner + ?Sized>(
    runner: &R,
    env: &ActivatedEnv,
    resource_id: &str,
    download_dir: Option<&Path>,
) -> Result<(), BootstrapError> {
    if !is_valid_resource_id(resource_id) {
        return Err(BootstrapError::CorpusFetchFailed {
            resource: resource_id.to_string(),
            reason: "invalid resource id".to_string(),
        });
    }
    if let Some(dir) = download_dir {
        std::fs::create_dir_all(dir).map_err(|e| {
            BootstrapError::io(format!("Failed to create {}", dir.display()), e)
        })?;
    }

    info_log!("Downloading NLTK resource '{}'", resource_id);
    let cmd = env
        .python_command()
        .arg("-c")
        .arg(download_script(resource_id, download_dir));
    let out = runner.run(&cmd).map_err(|e| BootstrapError::CorpusFetchFailed {
        resource: resource_id.to_string(),
        reason: e.to_string(),
    })?;
    if !out.success() {
        return Err(BootstrapError::CorpusFetchFailed {
            resource: resource_id.to_string(),
            reason: out.diagnostic(),
        });
    }
    Ok(())
}
