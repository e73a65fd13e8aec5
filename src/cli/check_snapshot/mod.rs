//! Check-snapshot command - validates a snapshot file without starting a server

use std::path::{Path, PathBuf};

use clap::Args;

use crate::domain::DomainError;
use crate::infrastructure::snapshot_file::read_snapshot;

#[derive(Args, Clone, Debug)]
pub struct CheckSnapshotArgs {
    /// Snapshot file produced by export or by `serve` on shutdown
    pub path: PathBuf,
}

/// What a valid snapshot file contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub entries: usize,
    pub embeddings: usize,
    pub dimension: Option<usize>,
}

pub async fn run(args: CheckSnapshotArgs) -> anyhow::Result<()> {
    let summary = check(&args.path).await?;

    println!(
        "{}: {} entries, {} cached embeddings, dimension {}",
        args.path.display(),
        summary.entries,
        summary.embeddings,
        summary
            .dimension
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    );

    Ok(())
}

/// Parse and fully validate a snapshot, ignoring TTL
pub async fn check(path: &Path) -> Result<SnapshotSummary, DomainError> {
    let validated = read_snapshot(path).await?.validate(None, None)?;

    Ok(SnapshotSummary {
        entries: validated.entries.len(),
        embeddings: validated.embeddings.len(),
        dimension: validated.dimension,
    })
}
