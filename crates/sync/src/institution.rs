use std::sync::Arc;

use finsync_core::Profile;
use finsync_ofx::{Clock, OfxClient, RateLimiter, StatementSource, Transport};
use finsync_storage::{account_dir_name, StatementStore};

use crate::error::SyncError;
use crate::synchronizer::{SyncReport, Synchronizer};

/// Results for every account of one profile. Failed accounts do not stop the
/// remaining ones.
#[derive(Debug, Default)]
pub struct InstitutionReport {
    pub synced: Vec<SyncReport>,
    pub failed: Vec<(String, SyncError)>,
}

impl InstitutionReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Signs on to the profile's server and synchronizes every listed account.
pub async fn sync_institution<C: Clock>(
    profile: &Profile,
    clock: C,
) -> Result<InstitutionReport, SyncError> {
    let institution = OfxClient::connect(profile.ofx.clone()).await?;
    let limiter = profile
        .min_request_interval()
        .map(|interval| Arc::new(RateLimiter::new(clock.clone(), interval)));
    if let Some(limiter) = &limiter {
        // The account-list request above does not go through the limiter.
        clock.sleep(limiter.min_interval()).await;
    }
    Ok(sync_accounts(&institution.accounts(), profile, clock, limiter).await)
}

/// Synchronizes `accounts` one after another, all sharing `limiter`.
pub async fn sync_accounts<C: Clock, A: StatementSource>(
    accounts: &[A],
    profile: &Profile,
    clock: C,
    limiter: Option<Arc<RateLimiter<C>>>,
) -> InstitutionReport {
    let mut transport = Transport::new(clock);
    if let Some(limiter) = limiter {
        transport = transport.with_limiter(limiter);
    }
    let synchronizer = Synchronizer::new(transport, profile.sync);

    let mut report = InstitutionReport::default();
    for account in accounts {
        let number = account.number().to_string();
        let dir_name = account_dir_name(&number, &profile.acct_dir_map);
        let result = match StatementStore::open(&profile.output_directory, &dir_name) {
            Ok(store) => synchronizer.sync_account(account, &store).await,
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(synced) => {
                tracing::info!(
                    "Account {number}: {} ({} new file(s), {} request(s))",
                    synced.outcome,
                    synced.files_written.len(),
                    synced.requests
                );
                report.synced.push(synced);
            }
            Err(e) => {
                tracing::error!("Account {number} failed: {e}");
                report.failed.push((number, e));
            }
        }
    }
    report
}
