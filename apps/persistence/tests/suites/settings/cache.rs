use std::sync::Arc;

use persistence::settings::{Configuration, Organization};
use persistence::{AppError, SettingsCache};

use crate::support::store;

#[tokio::test]
async fn load_on_empty_store_uses_defaults_without_writing_them() {
    let store = store().await;
    let cache = SettingsCache::load(store.manager.clone()).await.unwrap();
    assert_eq!(*cache.configuration(), Configuration::default());
    assert_eq!(*cache.organization(), Organization::default());

    let txn = store.manager.begin().await.unwrap();
    assert!(txn.new_configuration_gateway().load().await.unwrap().is_none());
    txn.close().await.unwrap();
    // One unit of work for the load, one for the check.
    assert_eq!(store.manager.pool().stats().borrowed, 2);
    store.shutdown().await;
}

#[tokio::test]
async fn load_reads_stored_rows() {
    let store = store().await;
    let stored = Organization {
        name: "Stored Org".to_string(),
        contact_email: "hello@stored.test".to_string(),
        website: None,
        address: Some("1 Main St".to_string()),
    };
    let txn = store.manager.begin().await.unwrap();
    txn.new_organization_gateway().store(&stored).await.unwrap();
    txn.commit().await.unwrap();

    let cache = SettingsCache::load(store.manager.clone()).await.unwrap();
    assert_eq!(*cache.organization(), stored);
    store.shutdown().await;
}

#[tokio::test]
async fn invalid_stored_row_is_a_configuration_error() {
    let store = store().await;
    let broken = Configuration {
        session_ttl_secs: 0,
        ..Configuration::default()
    };
    let txn = store.manager.begin().await.unwrap();
    txn.new_configuration_gateway().store(&broken).await.unwrap();
    txn.commit().await.unwrap();

    let err = SettingsCache::load(store.manager.clone()).await.unwrap_err();
    assert!(matches!(err, AppError::Config { .. }));
    store.shutdown().await;
}

#[tokio::test]
async fn update_persists_then_publishes() {
    let store = store().await;
    let cache = SettingsCache::load(store.manager.clone()).await.unwrap();
    let before = cache.configuration();

    let next = Configuration {
        registration_open: false,
        default_locale: "fr".to_string(),
        ..Configuration::default()
    };
    let published = cache.update_configuration(next.clone()).await.unwrap();
    assert_eq!(*published, next);
    assert_eq!(*cache.configuration(), next);
    // Snapshots handed out earlier are unaffected.
    assert_eq!(*before, Configuration::default());

    // A fresh cache (another process, or a restart) sees the committed row.
    let reloaded = SettingsCache::load(store.manager.clone()).await.unwrap();
    assert_eq!(*reloaded.configuration(), next);
    store.shutdown().await;
}

#[tokio::test]
async fn invalid_update_is_rejected_before_any_write() {
    let store = store().await;
    let cache = SettingsCache::load(store.manager.clone()).await.unwrap();
    let borrowed_before = store.manager.pool().stats().borrowed;

    let err = cache
        .update_organization(Organization {
            contact_email: "not-an-email".to_string(),
            ..Organization::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_CONTACT_EMAIL");
    assert_eq!(store.manager.pool().stats().borrowed, borrowed_before);
    assert_eq!(*cache.organization(), Organization::default());
    store.shutdown().await;
}

#[tokio::test]
async fn failed_persist_leaves_the_cached_value_unchanged() {
    let store = crate::support::bounded_store(1, 150).await;
    let cache = SettingsCache::load(store.manager.clone()).await.unwrap();

    let held = store.manager.begin().await.unwrap();
    let err = cache
        .update_configuration(Configuration {
            registration_open: false,
            ..Configuration::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ACQUISITION_FAILED");
    assert!(cache.configuration().registration_open);

    held.close().await.unwrap();
    store.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_see_old_or_new_value_never_a_mix() {
    let store = store().await;
    let cache = Arc::new(SettingsCache::load(store.manager.clone()).await.unwrap());

    let old = Configuration::default();
    let new = Configuration {
        registration_window_secs: 7_200,
        session_ttl_secs: 900,
        default_locale: "es".to_string(),
        registration_open: false,
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let cache = Arc::clone(&cache);
        let (old, new) = (old.clone(), new.clone());
        readers.push(tokio::spawn(async move {
            for _ in 0..500 {
                let seen = cache.configuration();
                assert!(*seen == old || *seen == new);
                tokio::task::yield_now().await;
            }
        }));
    }

    let writers: Vec<_> = (0..3)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let new = new.clone();
            tokio::spawn(async move { cache.update_configuration(new).await })
        })
        .collect();

    for w in writers {
        w.await.unwrap().unwrap();
    }
    for r in readers {
        r.await.unwrap();
    }
    assert_eq!(*cache.configuration(), new);
    store.shutdown().await;
}
