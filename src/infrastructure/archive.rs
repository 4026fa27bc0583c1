//! Archive file naming, writing and reading.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::domain::{AppError, ArchiveDocument, ExportBatch, Result};

/// File name for an archive created at `now`.
#[must_use]
pub fn archive_file_name(now: DateTime<Local>) -> String {
    format!("gpt-backup-{}.json", now.format("%Y-%m-%d-%H-%M-%S"))
}

/// Serialize a batch as pretty JSON (2-space indent).
///
/// # Errors
/// Returns error if serialization fails.
pub fn serialize_batch(batch: &ExportBatch) -> Result<String> {
    serde_json::to_string_pretty(batch).map_err(AppError::json_parse)
}

/// Parse archive JSON back into a batch.
///
/// # Errors
/// Returns error if the content is not a conversation array.
pub fn parse_archive(json: &str) -> Result<ExportBatch> {
    serde_json::from_str(json).map_err(AppError::json_parse)
}

/// Write `batch` into `dir` under a timestamped name.
///
/// # Errors
/// Returns error if the directory or file cannot be written.
pub fn write_archive(
    dir: &Path,
    batch: &ExportBatch,
    now: DateTime<Local>,
) -> Result<(PathBuf, ArchiveDocument)> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create directory {}", dir.display()), e))?;

    let document = ArchiveDocument {
        file_name: archive_file_name(now),
        json: serialize_batch(batch)?,
    };
    let path = dir.join(&document.file_name);

    fs::write(&path, &document.json)
        .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;

    tracing::info!(path = %path.display(), conversations = batch.len(), "Archive written");

    Ok((path, document))
}

/// Read an archive file from disk.
///
/// # Errors
/// Returns error if the file cannot be read or has no file name.
pub fn read_archive(path: &Path) -> Result<ArchiveDocument> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::InvalidData {
            message: format!("Not a file path: {}", path.display()),
        })?
        .to_string();

    let json = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?;

    Ok(ArchiveDocument { file_name, json })
}
