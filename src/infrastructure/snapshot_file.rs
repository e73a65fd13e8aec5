//! Reading and writing cache snapshots on disk

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{CacheSnapshot, DomainError};

/// Read and parse a snapshot file; shape errors surface as validation errors
pub async fn read_snapshot(path: &Path) -> Result<CacheSnapshot, DomainError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        DomainError::snapshot_validation(format!("Cannot read {}: {}", path.display(), e))
    })?;

    let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
        DomainError::snapshot_validation(format!("{} is not valid JSON: {}", path.display(), e))
    })?;

    CacheSnapshot::from_json(value)
}

/// Write a snapshot through a temporary sibling file so readers never see a partial document
pub async fn write_snapshot(path: &Path, snapshot: &CacheSnapshot) -> Result<(), DomainError> {
    let body = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| DomainError::internal(format!("Failed to serialize snapshot: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| io_error(parent, e))?;
    }

    let temp = temp_path(path);
    tokio::fs::write(&temp, &body).await.map_err(|e| io_error(&temp, e))?;
    tokio::fs::rename(&temp, path).await.map_err(|e| io_error(path, e))?;

    debug!(path = %path.display(), bytes = body.len(), "Snapshot written");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    path.with_file_name(name)
}

fn io_error(path: &Path, e: std::io::Error) -> DomainError {
    DomainError::internal(format!("Snapshot I/O on {} failed: {}", path.display(), e))
}
