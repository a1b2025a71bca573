use std::path::PathBuf;

use finsync_ofx::OfxError;
use finsync_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("OFX request failed: {0}")]
    Ofx(#[from] OfxError),
    #[error("Statement store error: {0}")]
    Store(#[from] StoreError),
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
