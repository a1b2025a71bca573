use std::fmt;
use std::future::Future;

use crate::OfxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountKind {
    Bank { bank_id: String, account_type: String },
    CreditCard,
    Investment { broker_id: String },
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::Bank { account_type, .. } => write!(f, "bank ({account_type})"),
            AccountKind::CreditCard => write!(f, "credit card"),
            AccountKind::Investment { .. } => write!(f, "investment"),
        }
    }
}

/// One account as listed by the server's account-information response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDescriptor {
    pub number: String,
    pub kind: AccountKind,
    pub description: Option<String>,
}

/// An authenticated account that can return its statement history.
///
/// `download(days)` asks for `days` days of history ending today and returns
/// the raw response.
pub trait StatementSource: Send + Sync {
    fn number(&self) -> &str;

    fn download(&self, days: u32) -> impl Future<Output = Result<Vec<u8>, OfxError>> + Send;
}
