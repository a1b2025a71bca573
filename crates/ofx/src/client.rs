use std::sync::Arc;

use finsync_core::InstitutionParams;
use uuid::Uuid;

use crate::account::{AccountDescriptor, StatementSource};
use crate::error::OfxError;
use crate::{request, response};

const USER_AGENT: &str = concat!("finsync/", env!("CARGO_PKG_VERSION"));

/// HTTP connection to one institution's OFX endpoint.
#[derive(Debug)]
pub struct OfxClient {
    http: reqwest::Client,
    params: InstitutionParams,
}

impl OfxClient {
    pub fn new(params: InstitutionParams) -> Result<Self, OfxError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, params })
    }

    /// POSTs one request document and returns the raw response body.
    pub async fn post(&self, body: String) -> Result<Vec<u8>, OfxError> {
        let response = self
            .http
            .post(&self.params.url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ofx")
            .header(reqwest::header::ACCEPT, "*/*, application/x-ofx")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(OfxError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).chars().take(512).collect(),
            });
        }
        Ok(bytes.to_vec())
    }

    /// Signs on and lists the accounts available to this login.
    ///
    /// A rejected signon is an error; an accepted signon with no usable
    /// accounts yields an empty list.
    pub async fn connect(params: InstitutionParams) -> Result<Institution, OfxError> {
        let client = Arc::new(OfxClient::new(params)?);
        let now = chrono::Local::now().naive_local();
        let body = request::account_list_request(&client.params, now, Uuid::new_v4());
        let data = client.post(body).await?;
        let text = String::from_utf8_lossy(&data);

        match response::signon_status(&text) {
            Some(status) if status.is_success() => {}
            Some(status) => {
                return Err(OfxError::SignonRejected {
                    code: status.code,
                    message: status.message.unwrap_or_default(),
                })
            }
            None => return Err(OfxError::MalformedResponse("missing signon status".to_string())),
        }

        let accounts = response::parse_account_list(&text, client.params.broker_id.as_deref());
        tracing::info!(
            "Connected to {}: {} account(s)",
            client.params.org,
            accounts.len()
        );
        Ok(Institution { client, accounts })
    }
}

/// An authenticated login and the accounts it can see.
#[derive(Debug)]
pub struct Institution {
    client: Arc<OfxClient>,
    accounts: Vec<AccountDescriptor>,
}

impl Institution {
    pub fn accounts(&self) -> Vec<OfxAccount> {
        self.accounts
            .iter()
            .cloned()
            .map(|descriptor| OfxAccount {
                client: Arc::clone(&self.client),
                descriptor,
            })
            .collect()
    }
}

/// One account reachable through an authenticated client.
#[derive(Debug, Clone)]
pub struct OfxAccount {
    client: Arc<OfxClient>,
    descriptor: AccountDescriptor,
}

impl StatementSource for OfxAccount {
    fn number(&self) -> &str {
        &self.descriptor.number
    }

    async fn download(&self, days: u32) -> Result<Vec<u8>, OfxError> {
        let now = chrono::Local::now().naive_local();
        let start = now.date() - chrono::Days::new(u64::from(days));
        let body = request::statement_request(
            &self.client.params,
            &self.descriptor,
            start,
            now,
            Uuid::new_v4(),
        );
        let data = self.client.post(body).await?;
        if let Some(status) = response::signon_status(&String::from_utf8_lossy(&data)) {
            if !status.is_success() {
                tracing::warn!(
                    "Signon for account {} returned status {}: {}",
                    self.descriptor.number,
                    status.code,
                    status.message.unwrap_or_default()
                );
            }
        }
        Ok(data)
    }
}
