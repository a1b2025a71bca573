mod support;

use std::sync::Arc;
use std::time::Duration;

use finsync_core::SyncOptions;
use finsync_ofx::{ManualClock, RateLimiter};
use finsync_sync::{sync_accounts, SyncError, SyncOutcome};

use support::{date, intervals_on_disk, profile, SimulatedServer};

#[tokio::test]
async fn accounts_share_one_request_spacing() {
    let clock = ManualClock::new(date(2024, 1, 15));
    let root = tempfile::tempdir().unwrap();
    let accounts = [
        SimulatedServer::from_date("1111", &clock, date(2023, 6, 1), 100_000),
        SimulatedServer::from_date("2222", &clock, date(2022, 1, 1), 100_000),
    ];
    let limiter = Arc::new(RateLimiter::new(clock.clone(), Duration::from_secs(5)));

    let report = sync_accounts(
        &accounts,
        &profile(root.path(), SyncOptions::default()),
        clock.clone(),
        Some(limiter),
    )
    .await;

    assert!(report.is_success());
    let requests: usize = report.synced.iter().map(|r| r.requests).sum();
    assert_eq!(requests, accounts.iter().map(|a| a.requested_starts().len()).sum::<usize>());
    // The simulated server answers instantly, so every request after the
    // first waits out the full interval.
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(5); requests - 1]);
}

#[tokio::test]
async fn without_limiter_requests_are_not_delayed() {
    let clock = ManualClock::new(date(2024, 1, 15));
    let root = tempfile::tempdir().unwrap();
    let accounts = [SimulatedServer::from_date("1111", &clock, date(2023, 6, 1), 100_000)];

    let report = sync_accounts(
        &accounts,
        &profile(root.path(), SyncOptions::default()),
        clock.clone(),
        None,
    )
    .await;

    assert!(report.is_success());
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn account_directories_follow_mapping() {
    let clock = ManualClock::new(date(2024, 1, 15));
    let root = tempfile::tempdir().unwrap();
    let mut profile = profile(root.path(), SyncOptions::default());
    profile
        .acct_dir_map
        .insert("1111".to_string(), "Checking".to_string());
    let accounts = [
        SimulatedServer::from_date("1111", &clock, date(2023, 6, 1), 100_000),
        SimulatedServer::from_date("9999:XYZ", &clock, date(2023, 6, 1), 100_000),
    ];

    let report = sync_accounts(&accounts, &profile, clock, None).await;

    assert!(report.is_success());
    assert_eq!(report.synced[0].directory, root.path().join("Checking"));
    assert_eq!(report.synced[1].directory, root.path().join("9999-XYZ"));
    assert!(!intervals_on_disk(&root.path().join("Checking")).is_empty());
    assert!(!intervals_on_disk(&root.path().join("9999-XYZ")).is_empty());
}

#[tokio::test]
async fn failed_account_does_not_stop_the_rest() {
    let clock = ManualClock::new(date(2024, 1, 15));
    let root = tempfile::tempdir().unwrap();
    let accounts = [
        SimulatedServer::from_date("1111", &clock, date(2023, 6, 1), 100_000).failing_on(0),
        SimulatedServer::from_date("2222", &clock, date(2023, 6, 1), 100_000),
    ];

    let report = sync_accounts(
        &accounts,
        &profile(root.path(), SyncOptions::default()),
        clock,
        None,
    )
    .await;

    assert!(!report.is_success());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "1111");
    assert!(matches!(report.failed[0].1, SyncError::Ofx(_)));
    assert_eq!(report.synced.len(), 1);
    assert_eq!(report.synced[0].account, "2222");
    assert_ne!(report.synced[0].outcome, SyncOutcome::NoData);
    assert!(intervals_on_disk(&root.path().join("1111")).is_empty());
}
