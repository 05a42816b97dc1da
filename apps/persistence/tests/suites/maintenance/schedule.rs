use std::sync::Arc;
use std::time::Duration as StdDuration;

use persistence::config::maintenance::MaintenanceSettings;
use persistence::{FixedClock, PeriodicCleaner};
use time::macros::datetime;
use time::Duration;
use tokio_util::sync::CancellationToken;

use crate::support::factory::{seed_token, seed_user};
use crate::support::store;

#[tokio::test]
async fn spawned_loop_sweeps_and_stops_on_cancel() {
    let store = store().await;
    let now = datetime!(2025-03-01 12:00:00 UTC);
    let user = seed_user(&store.manager, "zoe").await;
    seed_token(&store.manager, user.id, now - Duration::hours(2)).await;

    let settings = MaintenanceSettings::default()
        .with_interval(StdDuration::from_millis(50))
        .with_token_max_age(StdDuration::from_secs(3600));
    let cancel = CancellationToken::new();
    let handle = PeriodicCleaner::new(store.manager.clone(), settings)
        .with_clock(Arc::new(FixedClock::new(now)))
        .spawn(cancel.clone());

    // First tick fires immediately.
    tokio::time::sleep(StdDuration::from_millis(200)).await;
    let txn = store.manager.begin().await.unwrap();
    assert!(txn
        .new_token_gateway()
        .list_for_user(user.id)
        .await
        .unwrap()
        .is_empty());
    txn.close().await.unwrap();

    cancel.cancel();
    tokio::time::timeout(StdDuration::from_secs(2), handle)
        .await
        .expect("loop stops after cancel")
        .unwrap();
    assert_eq!(store.manager.pool().stats().in_use, 0);
    store.shutdown().await;
}

#[tokio::test]
async fn failing_runs_do_not_stop_the_loop() {
    let store = store().await;
    // Every run fails to acquire a connection.
    store.manager.pool().close().await.unwrap();

    let settings = MaintenanceSettings::default().with_interval(StdDuration::from_millis(20));
    let cancel = CancellationToken::new();
    let handle = PeriodicCleaner::new(store.manager.clone(), settings).spawn(cancel.clone());

    tokio::time::sleep(StdDuration::from_millis(150)).await;
    assert!(!handle.is_finished());

    cancel.cancel();
    tokio::time::timeout(StdDuration::from_secs(2), handle)
        .await
        .expect("loop stops after cancel")
        .expect("loop never panics");
}
