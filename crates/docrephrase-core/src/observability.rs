//! Observability: tracing init and the JSONL audit trail for bootstrap steps.
//!
//! Uses config::ObservabilityConfig for DOCREPHRASE_QUIET, LOG_LEVEL, LOG_JSON, AUDIT_LOG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::ObservabilityConfig;

static AUDIT_PATH: Mutex<Option<String>> = Mutex::new(None);

/// Initialize tracing. Call at process startup.
/// When DOCREPHRASE_QUIET=1, only WARN and above are logged.
pub fn init_tracing() {
    let cfg = ObservabilityConfig::from_env();
    let level: String = if cfg.quiet {
        "docrephrase=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}

fn get_audit_path() -> Option<String> {
    {
        let guard = AUDIT_PATH.lock().ok()?;
        if let Some(ref p) = *guard {
            return Some(p.clone());
        }
    }
    let path = ObservabilityConfig::from_env().audit_log.clone()?;
    if path.is_empty() {
        return None;
    }
    if let Some(parent) = Path::new(&path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    {
        let mut guard = AUDIT_PATH.lock().ok()?;
        *guard = Some(path.clone());
    }
    Some(path)
}

fn append_jsonl(path: &Path, record: &serde_json::Value) {
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn step_record(event: &str, step: &str, details: serde_json::Value) -> serde_json::Value {
    json!({
        "ts": now(),
        "event": event,
        "step": step,
        "details": details,
    })
}

fn emit(record: serde_json::Value) {
    if let Some(path) = get_audit_path() {
        append_jsonl(Path::new(&path), &record);
    }
}

/// Audit: step_started
pub fn audit_step_started(step: &str, detail: &str) {
    emit(step_record("step_started", step, json!({ "detail": detail })));
}

/// Audit: step_completed
pub fn audit_step_completed(step: &str, duration_ms: u64) {
    emit(step_record(
        "step_completed",
        step,
        json!({ "duration_ms": duration_ms }),
    ));
}

/// Audit: step_failed. Also logged at ERROR.
pub fn audit_step_failed(step: &str, error: &str) {
    tracing::error!(step = %step, error = %error, "Bootstrap step failed");
    emit(step_record("step_failed", step, json!({ "error": error })));
}

/// Audit: bootstrap_finished
pub fn audit_bootstrap_finished(success: bool, venv: &str) {
    emit(json!({
        "ts": now(),
        "event": "bootstrap_finished",
        "success": success,
        "venv": venv,
    }));
}
