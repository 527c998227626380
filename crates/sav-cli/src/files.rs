//! Files written next to the save: backups and JSON exports.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// First of `<save>.backup`, `<save>.backup1`, `<save>.backup2`, ... that does
/// not exist yet.
pub fn backup_path(save: &Path) -> PathBuf {
    let first = with_suffix(save, ".backup");
    if !first.exists() {
        return first;
    }
    (1u32..)
        .map(|n| with_suffix(save, &format!(".backup{n}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

/// Copy the save to a fresh backup path and return that path.
pub fn create_backup(save: &Path) -> Result<PathBuf> {
    let backup = backup_path(save);
    fs::copy(save, &backup)
        .with_context(|| format!("back up {} to {}", save.display(), backup.display()))?;
    tracing::info!(backup = %backup.display(), "wrote backup");
    Ok(backup)
}

/// Where `--json` writes the payload of `save`.
pub fn json_path(save: &Path) -> PathBuf {
    with_suffix(save, ".json")
}

/// Pretty-print a JSON payload, keeping member order.
pub fn pretty_payload(payload: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(payload).context("parse payload JSON")?;
    serde_json::to_string_pretty(&value).context("format payload JSON")
}

/// Write the pretty-printed payload next to the save and return its path.
pub fn write_json(save: &Path, payload: &str) -> Result<PathBuf> {
    let path = json_path(save);
    fs::write(&path, pretty_payload(payload)?)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
