use persistence::gateways::{NewToken, NewUser, TokenKind};
use persistence::{AppError, PoolStats, TxnOutcome, TxnState};

use crate::support::factory::user_count;
use crate::support::store;

fn assert_all_released(stats: PoolStats, borrowed: u64) {
    assert_eq!(stats.borrowed, borrowed);
    assert_eq!(stats.released, borrowed);
    assert_eq!(stats.in_use, 0);
}

#[tokio::test]
async fn commit_releases_exactly_once() {
    let store = store().await;
    let txn = store.manager.begin().await.unwrap();
    assert_eq!(store.manager.pool().stats().in_use, 1);

    txn.commit().await.unwrap();
    assert_all_released(store.manager.pool().stats(), 1);

    // Second attempt is refused and releases nothing more.
    assert!(txn.commit().await.is_err());
    drop(txn);
    assert_all_released(store.manager.pool().stats(), 1);
    store.shutdown().await;
}

#[tokio::test]
async fn never_committed_transaction_is_rolled_back_on_drop() {
    let store = store().await;
    {
        let txn = store.manager.begin().await.unwrap();
        txn.new_user_gateway()
            .create_confirmed(NewUser::new("gina", "gina@example.test"))
            .await
            .unwrap();
        // Scope exit without commit.
    }
    assert_all_released(store.manager.pool().stats(), 1);
    assert_eq!(user_count(&store.manager).await, 0);
    store.shutdown().await;
}

#[tokio::test]
async fn failed_commit_aborts_releases_and_applies_nothing() {
    let store = store().await;

    let txn = store.manager.begin().await.unwrap();
    txn.new_user_gateway()
        .create_confirmed(NewUser::new("hank", "hank@example.test"))
        .await
        .unwrap();
    // Owner check is deferred to COMMIT, where the store rejects the flush.
    txn.new_token_gateway()
        .issue(NewToken::new(9_999, TokenKind::Session))
        .await
        .unwrap();

    let err = txn.commit().await.unwrap_err();
    assert!(matches!(err, AppError::Commit { .. }));
    assert_eq!(err.code(), "COMMIT_FAILED");
    assert_eq!(txn.outcome(), Some(TxnOutcome::Aborted));
    assert_eq!(txn.state(), TxnState::Closed);
    assert_all_released(store.manager.pool().stats(), 1);

    // Neither the user nor the token survived.
    assert_eq!(user_count(&store.manager).await, 0);
    let reader = store.manager.begin().await.unwrap();
    assert!(reader
        .new_user_gateway()
        .find_by_username("hank")
        .await
        .unwrap()
        .is_none());
    reader.close().await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
async fn connection_is_reusable_after_a_failed_commit() {
    let store = crate::support::bounded_store(1, 2_000).await;

    let txn = store.manager.begin().await.unwrap();
    txn.new_token_gateway()
        .issue(NewToken::new(42, TokenKind::Confirmation))
        .await
        .unwrap();
    assert!(txn.commit().await.is_err());

    // Same single connection, clean state.
    let txn = store.manager.begin().await.unwrap();
    txn.new_user_gateway()
        .create_confirmed(NewUser::new("iris", "iris@example.test"))
        .await
        .unwrap();
    txn.commit().await.unwrap();
    assert_eq!(user_count(&store.manager).await, 1);
    store.shutdown().await;
}

#[tokio::test]
async fn gateway_failure_then_close_releases_once() {
    let store = store().await;
    let txn = store.manager.begin().await.unwrap();
    let users = txn.new_user_gateway();
    users
        .create_confirmed(NewUser::new("jack", "jack@example.test"))
        .await
        .unwrap();
    let err = users
        .create_confirmed(NewUser::new("jack", "other@example.test"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "USERNAME_TAKEN");

    txn.close().await.unwrap();
    assert_all_released(store.manager.pool().stats(), 1);
    assert_eq!(user_count(&store.manager).await, 0);
    store.shutdown().await;
}
