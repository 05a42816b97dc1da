use persistence::gateways::NewUser;
use persistence::{AppError, TxnOutcome, TxnState};
use time::OffsetDateTime;

use crate::support::factory::user_count;
use crate::support::store;

#[tokio::test]
async fn commit_moves_open_to_closed_with_committed_outcome() {
    let store = store().await;
    let txn = store.manager.begin().await.unwrap();
    assert_eq!(txn.state(), TxnState::Open);
    assert_eq!(txn.outcome(), None);
    assert_eq!(txn.pool_name(), "main");

    txn.commit().await.unwrap();
    assert_eq!(txn.state(), TxnState::Closed);
    assert_eq!(txn.outcome(), Some(TxnOutcome::Committed));
    store.shutdown().await;
}

#[tokio::test]
async fn committed_write_is_visible_to_a_fresh_transaction() {
    let store = store().await;

    let txn = store.manager.begin().await.unwrap();
    let created = txn
        .new_user_gateway()
        .create_confirmed(NewUser::new("carol", "carol@example.test"))
        .await
        .unwrap();
    txn.commit().await.unwrap();

    let reader = store.manager.begin().await.unwrap();
    let found = reader
        .new_user_gateway()
        .find_by_id(created.id)
        .await
        .unwrap()
        .expect("committed user is visible");
    assert_eq!(found, created);
    reader.close().await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
async fn rollback_discards_writes() {
    let store = store().await;

    let txn = store.manager.begin().await.unwrap();
    txn.new_user_gateway()
        .create_confirmed(NewUser::new("dave", "dave@example.test"))
        .await
        .unwrap();
    txn.rollback().await.unwrap();
    assert_eq!(txn.outcome(), Some(TxnOutcome::Aborted));
    assert_eq!(txn.state(), TxnState::Closed);

    assert_eq!(user_count(&store.manager).await, 0);
    store.shutdown().await;
}

#[tokio::test]
async fn gateway_calls_after_commit_are_terminated_and_have_no_effect() {
    let store = store().await;

    let txn = store.manager.begin().await.unwrap();
    let users = txn.new_user_gateway();
    txn.commit().await.unwrap();

    let err = users
        .create_confirmed(NewUser::new("erin", "erin@example.test"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::TerminatedTransaction {
            op: "users.create_confirmed",
            state: TxnState::Closed
        }
    ));
    assert_eq!(err.code(), "TRANSACTION_TERMINATED");

    // Gateways first requested after the end are refused too.
    assert!(txn
        .new_token_gateway()
        .find_by_value("nope")
        .await
        .unwrap_err()
        .is_terminated());

    assert_eq!(user_count(&store.manager).await, 0);
    store.shutdown().await;
}

#[tokio::test]
async fn lifecycle_calls_on_a_finished_transaction_are_terminated() {
    let store = store().await;
    let txn = store.manager.begin().await.unwrap();
    txn.rollback().await.unwrap();

    assert!(txn.commit().await.unwrap_err().is_terminated());
    assert!(txn.rollback().await.unwrap_err().is_terminated());
    // close() after the end is a no-op.
    txn.close().await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
async fn cloned_gateway_outliving_its_transaction_is_terminated() {
    let store = store().await;
    let users = {
        let txn = store.manager.begin().await.unwrap();
        let users = txn.new_user_gateway().clone();
        txn.close().await.unwrap();
        users
    };
    assert!(users.count().await.unwrap_err().is_terminated());
    store.shutdown().await;
}

#[tokio::test]
async fn gateways_are_memoized_per_transaction() {
    let store = store().await;
    let a = store.manager.begin().await.unwrap();
    let b = store.manager.begin().await.unwrap();

    assert!(std::ptr::eq(a.new_user_gateway(), a.new_user_gateway()));
    assert!(std::ptr::eq(a.new_token_gateway(), a.new_token_gateway()));
    assert!(std::ptr::eq(
        a.new_configuration_gateway(),
        a.new_configuration_gateway()
    ));
    assert!(std::ptr::eq(
        a.new_organization_gateway(),
        a.new_organization_gateway()
    ));
    assert!(!std::ptr::eq(a.new_user_gateway(), b.new_user_gateway()));
    assert_ne!(a.id(), b.id());

    a.close().await.unwrap();
    b.close().await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
async fn gateway_calls_run_in_call_order_on_one_connection() {
    let store = store().await;
    let txn = store.manager.begin().await.unwrap();
    let users = txn.new_user_gateway();

    let created = users
        .create_confirmed(NewUser::new("frank", "frank@example.test"))
        .await
        .unwrap();
    // Uncommitted write is visible inside the same unit of work.
    assert_eq!(users.count().await.unwrap(), 1);
    assert!(users.update_password(created.id, "new-hash", OffsetDateTime::now_utc()).await.unwrap());
    let reread = users.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(reread.password_hash.as_deref(), Some("new-hash"));

    txn.close().await.unwrap();
    assert_eq!(user_count(&store.manager).await, 0);
    store.shutdown().await;
}
