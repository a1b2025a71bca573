pub mod error;
pub mod institution;
pub mod rename;
pub mod synchronizer;

pub use error::SyncError;
pub use institution::{sync_accounts, sync_institution, InstitutionReport};
pub use rename::{fix_name, RenameOutcome};
pub use synchronizer::{SyncOutcome, SyncReport, Synchronizer};
