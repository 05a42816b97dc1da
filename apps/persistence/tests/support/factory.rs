use persistence::gateways::{NewRegistration, NewToken, NewUser, Token, TokenKind, User};
use persistence::TransactionManager;
use persistence_test_support::unique::{unique_email, unique_username};
use time::OffsetDateTime;

/// Commit a confirmed user in its own unit of work.
pub async fn seed_user(manager: &TransactionManager, prefix: &str) -> User {
    let txn = manager.begin().await.expect("begin");
    let user = txn
        .new_user_gateway()
        .create_confirmed(NewUser::new(unique_username(prefix), unique_email(prefix)))
        .await
        .expect("create user");
    txn.commit().await.expect("commit user");
    user
}

/// Commit a pending registration opened at `at` with the given window.
pub async fn seed_registration(
    manager: &TransactionManager,
    prefix: &str,
    at: OffsetDateTime,
    window: time::Duration,
) -> User {
    let txn = manager.begin().await.expect("begin");
    let user = txn
        .new_user_gateway()
        .register(NewRegistration::new(
            unique_username(prefix),
            unique_email(prefix),
            "argon2id$stub",
            at,
            window,
        ))
        .await
        .expect("register");
    txn.commit().await.expect("commit registration");
    user
}

/// Commit a session token for `user_id` issued at `at`.
pub async fn seed_token(manager: &TransactionManager, user_id: i64, at: OffsetDateTime) -> Token {
    let txn = manager.begin().await.expect("begin");
    let token = txn
        .new_token_gateway()
        .issue(NewToken::new(user_id, TokenKind::Session).issued_at(at))
        .await
        .expect("issue token");
    txn.commit().await.expect("commit token");
    token
}

/// Users visible to a fresh unit of work.
pub async fn user_count(manager: &TransactionManager) -> u64 {
    let txn = manager.begin().await.expect("begin");
    let n = txn.new_user_gateway().count().await.expect("count");
    txn.close().await.expect("close");
    n
}
