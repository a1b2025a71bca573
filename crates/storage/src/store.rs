use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use finsync_core::{sanitize_account_name, CoreError, CoverageInterval, CoverageSet, StatementFileName};
use thiserror::Error;

/// Directory name used when an account number cannot be a path component.
pub const FALLBACK_ACCOUNT_DIR: &str = "blank";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to move statement into place at {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Directory name for an account: the configured mapping verbatim, else the
/// sanitized number, else `blank` for numbers that cannot be sanitized.
pub fn account_dir_name(number: &str, acct_dir_map: &BTreeMap<String, String>) -> String {
    if let Some(name) = acct_dir_map.get(number) {
        return name.clone();
    }
    match sanitize_account_name(number) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!(
                "Account number is invalid path component: {number:?} ({e}); using {FALLBACK_ACCOUNT_DIR}"
            );
            FALLBACK_ACCOUNT_DIR.to_string()
        }
    }
}

/// One account's output directory. The file names in it are the only record
/// of what has been downloaded.
#[derive(Debug, Clone)]
pub struct StatementStore {
    dir: PathBuf,
}

impl StatementStore {
    /// Opens `<root>/<dir_name>`, creating it if needed.
    pub fn open(root: &Path, dir_name: &str) -> Result<Self, StoreError> {
        Self::open_dir(root.join(dir_name))
    }

    pub fn open_dir(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rebuilds the coverage set from statement file names.
    ///
    /// Names that do not follow the pattern are ignored; names that follow it
    /// but encode an impossible range are logged and skipped.
    pub fn load_coverage(&self) -> Result<CoverageSet, StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut intervals = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            match StatementFileName::parse(name) {
                Ok(parsed) => intervals.push(parsed.interval),
                Err(CoreError::NotStatementFile(_)) => {}
                Err(e) => {
                    tracing::warn!("Invalid filename: {:?} ({e})", self.dir.join(name));
                }
            }
        }
        Ok(CoverageSet::from_intervals(intervals))
    }

    /// Writes one downloaded statement under its interval-derived name.
    ///
    /// The data goes to a temporary file in the same directory which is then
    /// renamed, so a crash never leaves a partial file under a statement name.
    pub fn save(
        &self,
        interval: CoverageInterval,
        data: &[u8],
        fetched_at: i64,
    ) -> Result<PathBuf, StoreError> {
        let name = StatementFileName::new(interval, fetched_at).to_string();
        let path = self.dir.join(&name);
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(data).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| StoreError::Persist {
            path: path.clone(),
            source: e.error,
        })?;

        tracing::info!("Received data {} -- {}", interval.start(), interval.end());
        Ok(path)
    }
}
