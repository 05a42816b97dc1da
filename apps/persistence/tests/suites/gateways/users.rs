use persistence::gateways::{NewRegistration, NewUser, Require};
use time::macros::datetime;
use time::Duration;

use crate::support::factory::{seed_token, seed_user};
use crate::support::store;

#[tokio::test]
async fn lookups_return_none_when_absent() {
    let store = store().await;
    let txn = store.manager.begin().await.unwrap();
    let users = txn.new_user_gateway();

    assert!(users.find_by_id(12345).await.unwrap().is_none());
    assert!(users.find_by_username("ghost").await.unwrap().is_none());
    assert!(users.find_by_email("ghost@example.test").await.unwrap().is_none());

    let err = users
        .find_by_id(12345)
        .await
        .unwrap()
        .require("USER_NOT_FOUND", "user 12345")
        .unwrap_err();
    assert_eq!(err.code(), "USER_NOT_FOUND");

    txn.close().await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
async fn duplicate_username_and_email_are_conflicts() {
    let store = store().await;
    let txn = store.manager.begin().await.unwrap();
    let users = txn.new_user_gateway();

    users
        .create_confirmed(NewUser::new("nora", "nora@example.test"))
        .await
        .unwrap();

    let err = users
        .create_confirmed(NewUser::new("nora", "nora2@example.test"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "USERNAME_TAKEN");

    let err = users
        .create_confirmed(NewUser::new("nora2", "nora@example.test"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "EMAIL_TAKEN");
    assert!(!err.to_string().contains("nora@example.test"));

    txn.close().await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
async fn register_then_confirm_within_window() {
    let store = store().await;
    let t0 = datetime!(2025-03-01 08:00:00 UTC);

    let txn = store.manager.begin().await.unwrap();
    let users = txn.new_user_gateway();
    let pending = users
        .register(NewRegistration::new(
            "olga",
            "olga@example.test",
            "hash",
            t0,
            Duration::hours(24),
        ))
        .await
        .unwrap();
    assert!(!pending.confirmed);
    assert_eq!(
        pending.registration_expires_at,
        Some(datetime!(2025-03-02 08:00:00 UTC))
    );

    assert!(users.confirm(pending.id, t0 + Duration::hours(3)).await.unwrap());
    let confirmed = users.find_by_id(pending.id).await.unwrap().unwrap();
    assert!(confirmed.confirmed);
    assert_eq!(confirmed.registration_expires_at, None);

    // Already confirmed: nothing pending to confirm.
    assert!(!users.confirm(pending.id, t0 + Duration::hours(4)).await.unwrap());

    txn.commit().await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
async fn expired_registration_cannot_be_confirmed() {
    let store = store().await;
    let t0 = datetime!(2025-03-01 08:00:00 UTC);

    let txn = store.manager.begin().await.unwrap();
    let users = txn.new_user_gateway();
    let pending = users
        .register(NewRegistration::new(
            "pete",
            "pete@example.test",
            "hash",
            t0,
            Duration::hours(1),
        ))
        .await
        .unwrap();
    assert!(!users
        .confirm(pending.id, t0 + Duration::hours(1) + Duration::seconds(1))
        .await
        .unwrap());
    txn.close().await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
async fn stale_registration_sweep_spares_confirmed_and_open_windows() {
    let store = store().await;
    let t0 = datetime!(2025-03-01 08:00:00 UTC);

    let txn = store.manager.begin().await.unwrap();
    let users = txn.new_user_gateway();
    users
        .register(NewRegistration::new("stale", "stale@example.test", "h", t0, Duration::hours(1)))
        .await
        .unwrap();
    users
        .register(NewRegistration::new("fresh", "fresh@example.test", "h", t0, Duration::hours(48)))
        .await
        .unwrap();
    users
        .create_confirmed(NewUser::new("kept", "kept@example.test").created_at(t0))
        .await
        .unwrap();

    let now = t0 + Duration::hours(2);
    assert_eq!(users.delete_stale_registrations(now).await.unwrap(), 1);
    assert!(users.find_by_username("stale").await.unwrap().is_none());
    assert!(users.find_by_username("fresh").await.unwrap().is_some());
    assert!(users.find_by_username("kept").await.unwrap().is_some());
    assert_eq!(users.count().await.unwrap(), 2);

    txn.commit().await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
async fn deleting_a_user_removes_their_tokens() {
    let store = store().await;
    let user = seed_user(&store.manager, "quinn").await;
    let token = seed_token(&store.manager, user.id, datetime!(2025-03-01 08:00:00 UTC)).await;

    let txn = store.manager.begin().await.unwrap();
    assert!(txn.new_user_gateway().delete(user.id).await.unwrap());
    assert!(!txn.new_user_gateway().delete(user.id).await.unwrap());
    assert!(txn
        .new_token_gateway()
        .find_by_value(&token.value)
        .await
        .unwrap()
        .is_none());
    txn.commit().await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
async fn password_update_is_stamped_with_the_callers_instant() {
    let store = store().await;
    let created_at = datetime!(2025-03-01 08:00:00 UTC);
    let changed_at = datetime!(2025-03-05 17:30:00.750 UTC);

    let txn = store.manager.begin().await.unwrap();
    let users = txn.new_user_gateway();
    let user = users
        .create_confirmed(NewUser::new("pia", "pia@example.test").created_at(created_at))
        .await
        .unwrap();
    assert_eq!(user.updated_at, created_at);

    assert!(users.update_password(user.id, "rotated", changed_at).await.unwrap());
    let reread = users.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(reread.password_hash.as_deref(), Some("rotated"));
    assert_eq!(reread.updated_at, datetime!(2025-03-05 17:30:00 UTC));
    assert_eq!(reread.created_at, created_at);

    assert!(!users.update_password(user.id + 1000, "x", changed_at).await.unwrap());
    txn.commit().await.unwrap();
    store.shutdown().await;
}
