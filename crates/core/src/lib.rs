pub mod config;
pub mod coverage;
pub mod error;
pub mod naming;

pub use config::{Config, ConfigError, InstitutionParams, Profile, SyncOptions};
pub use coverage::{CoverageInterval, CoverageSet, Gap};
pub use error::CoreError;
pub use naming::{sanitize_account_name, StatementFileName, FILE_DATE_FORMAT};
