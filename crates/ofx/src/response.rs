use crate::account::{AccountDescriptor, AccountKind};
use crate::sgml;

/// `<SONRS><STATUS>` of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignonStatus {
    pub code: String,
    pub severity: Option<String>,
    pub message: Option<String>,
}

impl SignonStatus {
    pub fn is_success(&self) -> bool {
        self.code == "0"
    }
}

pub fn signon_status(text: &str) -> Option<SignonStatus> {
    let sonrs = sgml::blocks(text, "SONRS").into_iter().next()?;
    let status = sgml::blocks(sonrs, "STATUS")
        .into_iter()
        .next()
        .unwrap_or(sonrs);
    let non_empty = |tag: &str| {
        sgml::first_value(status, tag)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    Some(SignonStatus {
        code: non_empty("CODE")?,
        severity: non_empty("SEVERITY"),
        message: non_empty("MESSAGE"),
    })
}

/// Reads every `<ACCTINFO>` aggregate of an account-information response.
///
/// `default_broker_id` fills in investment accounts whose `INVACCTFROM` omits it.
pub fn parse_account_list(text: &str, default_broker_id: Option<&str>) -> Vec<AccountDescriptor> {
    sgml::blocks(text, "ACCTINFO")
        .into_iter()
        .filter_map(|info| {
            let account = parse_account_info(info, default_broker_id);
            if account.is_none() {
                tracing::debug!("Skipping unrecognised account info: {info:?}");
            }
            account
        })
        .collect()
}

fn parse_account_info(info: &str, default_broker_id: Option<&str>) -> Option<AccountDescriptor> {
    let description = sgml::first_value(info, "DESC")
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    let value = |block: &str, tag: &str| {
        sgml::first_value(block, tag)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if let Some(from) = sgml::blocks(info, "BANKACCTFROM").into_iter().next() {
        return Some(AccountDescriptor {
            number: value(from, "ACCTID")?,
            kind: AccountKind::Bank {
                bank_id: value(from, "BANKID")?,
                account_type: value(from, "ACCTTYPE").unwrap_or_else(|| "CHECKING".to_string()),
            },
            description,
        });
    }
    if let Some(from) = sgml::blocks(info, "CCACCTFROM").into_iter().next() {
        return Some(AccountDescriptor {
            number: value(from, "ACCTID")?,
            kind: AccountKind::CreditCard,
            description,
        });
    }
    if let Some(from) = sgml::blocks(info, "INVACCTFROM").into_iter().next() {
        let broker_id = value(from, "BROKERID").or_else(|| default_broker_id.map(str::to_string))?;
        return Some(AccountDescriptor {
            number: value(from, "ACCTID")?,
            kind: AccountKind::Investment { broker_id },
            description,
        });
    }
    None
}
