pub mod account;
pub mod client;
pub mod error;
pub mod extract;
pub mod request;
pub mod response;
pub(crate) mod sgml;
pub mod throttle;
pub mod transport;

pub use account::{AccountDescriptor, AccountKind, StatementSource};
pub use client::{Institution, OfxAccount, OfxClient};
pub use error::OfxError;
pub use extract::{extract_date_range, parse_ofx_time, DateRangeOutcome};
pub use throttle::{Clock, ManualClock, RateLimiter, RatePermit, SystemClock};
pub use transport::Transport;
