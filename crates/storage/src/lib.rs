pub mod store;

pub use store::{account_dir_name, StatementStore, StoreError};
