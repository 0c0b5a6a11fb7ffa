use crate::errors::PromptWatchError;
use crate::log_retention::prune_to_budget;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

pub const DEFAULT_DISK_BUDGET_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4096;

static RUN_LOG: OnceLock<Mutex<Option<JsonlLogger>>> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct JsonlLogger {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
    pub budget_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent<'a> {
    pub level: &'a str,
    pub event_type: &'a str,
    pub payload: Value,
}

impl JsonlLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            budget_bytes: DEFAULT_DISK_BUDGET_BYTES,
        }
    }

    pub fn append(&self, event: &LogEvent<'_>) -> Result<(), PromptWatchError> {
        let parent = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            fs::create_dir_all(parent).map_err(|e| PromptWatchError::Io(e.to_string()))?;
        }
        let line = serde_json::to_string(&LogEvent {
            level: event.level,
            event_type: event.event_type,
            payload: truncate_json(event.payload.clone(), self.max_payload_bytes),
        })
        .map_err(|e| PromptWatchError::Io(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PromptWatchError::Io(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| PromptWatchError::Io(e.to_string()))?;

        if let Some(parent) = parent {
            let _ = prune_to_budget(parent, self.budget_bytes, &self.path)?;
        }
        Ok(())
    }
}

fn sink() -> &'static Mutex<Option<JsonlLogger>> {
    RUN_LOG.get_or_init(|| Mutex::new(None))
}

/// Serializes tests that install or clear the process-wide sink.
#[cfg(test)]
pub(crate) fn sink_test_guard() -> std::sync::MutexGuard<'static, ()> {
    static GUARD: Mutex<()> = Mutex::new(());
    GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Installs the process-wide run log used by `append_run_log`.
pub fn init_run_log(logger: JsonlLogger) {
    if let Ok(mut guard) = sink().lock() {
        *guard = Some(logger);
    }
}

/// Removes the process-wide run log; later `append_run_log` calls are no-ops.
pub fn reset_run_log() {
    if let Ok(mut guard) = sink().lock() {
        *guard = None;
    }
}

/// Best effort: logging never fails the caller and is a no-op until
/// `init_run_log` has run.
pub fn append_run_log(level: &str, event_type: &str, payload: Value) {
    let Ok(guard) = sink().lock() else {
        return;
    };
    if let Some(logger) = guard.as_ref() {
        let _ = logger.append(&LogEvent {
            level,
            event_type,
            payload,
        });
    }
}

fn truncate_json(value: Value, max_bytes: usize) -> Value {
    let rendered = serde_json::to_string(&value).unwrap_or_default();
    if rendered.len() <= max_bytes {
        return value;
    }
    let mut cut = max_bytes.saturating_sub(3);
    while !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    Value::String(format!("{}...", &rendered[..cut]))
}
