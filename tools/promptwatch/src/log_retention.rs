use crate::errors::PromptWatchError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Deletes the oldest `.jsonl` logs in `dir` until their combined size fits
/// `budget_bytes`. `active` is never removed, even if it alone is over budget.
pub fn prune_to_budget(
    dir: &Path,
    budget_bytes: u64,
    active: &Path,
) -> Result<Vec<PathBuf>, PromptWatchError> {
    let mut logs = fs::read_dir(dir)
        .map_err(|e| PromptWatchError::Io(e.to_string()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl"))
        .filter_map(|path| {
            let meta = fs::metadata(&path).ok()?;
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((path, meta.len(), modified))
        })
        .collect::<Vec<_>>();

    logs.sort_by_key(|(_, _, modified)| *modified);

    let mut total = logs.iter().map(|(_, len, _)| *len).sum::<u64>();
    let mut pruned = Vec::new();
    for (path, len, _) in logs {
        if total <= budget_bytes {
            break;
        }
        if path == active {
            continue;
        }
        fs::remove_file(&path).map_err(|e| PromptWatchError::Io(e.to_string()))?;
        total = total.saturating_sub(len);
        pruned.push(path);
    }

    Ok(pruned)
}
