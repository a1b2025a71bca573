//! Repairs statement file names whose dates disagree with the file contents.

use std::path::{Path, PathBuf};

use finsync_core::FILE_DATE_FORMAT;
use finsync_ofx::extract_date_range;

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// Name is not `<start>-<end>--<timestamp>.ofx`.
    Skipped,
    /// Contents carry no statement range to name the file after.
    Unreadable,
    Unchanged,
    /// Another file already has the corrected name.
    Conflict { to: PathBuf },
    Renamed { from: PathBuf, to: PathBuf },
}

/// Renames `path` so its dates match the `DTSTART`/`DTEND` inside it,
/// keeping the fetch timestamp. With `dry_run`, reports without renaming.
pub fn fix_name(path: &Path, dry_run: bool) -> Result<RenameOutcome, SyncError> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(RenameOutcome::Skipped);
    };
    let parts: Vec<&str> = name.split('-').collect();
    if parts.len() != 4 {
        tracing::info!("Skipping {name:?}");
        return Ok(RenameOutcome::Skipped);
    }

    let data = std::fs::read(path).map_err(|source| SyncError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let Some(interval) = extract_date_range(&data).interval() else {
        tracing::warn!("No statement date range in {}", path.display());
        return Ok(RenameOutcome::Unreadable);
    };

    let start = interval.start().format(FILE_DATE_FORMAT).to_string();
    let end = interval.end().format(FILE_DATE_FORMAT).to_string();
    let new_name = [start.as_str(), end.as_str(), parts[2], parts[3]].join("-");
    if new_name == name {
        return Ok(RenameOutcome::Unchanged);
    }

    let new_path = path.with_file_name(&new_name);
    if new_path.exists() {
        tracing::warn!("Not renaming {}: {} already exists", path.display(), new_path.display());
        return Ok(RenameOutcome::Conflict { to: new_path });
    }
    tracing::info!("Rename {} -> {}", path.display(), new_path.display());
    if !dry_run {
        std::fs::rename(path, &new_path).map_err(|source| SyncError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(RenameOutcome::Renamed {
        from: path.to_path_buf(),
        to: new_path,
    })
}
