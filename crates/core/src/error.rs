use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid interval: start {start} is after end {end}")]
    InvalidInterval { start: NaiveDate, end: NaiveDate },
    #[error("Invalid account name: {0}")]
    InvalidAccountName(String),
    #[error("Not a statement file name: {0}")]
    NotStatementFile(String),
    #[error("Invalid date in file name {name}: {value}")]
    InvalidFileDate { name: String, value: String },
}
