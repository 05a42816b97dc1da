use persistence::settings::{Configuration, Organization};

use crate::support::store;

#[tokio::test]
async fn missing_rows_load_as_none() {
    let store = store().await;
    let txn = store.manager.begin().await.unwrap();
    assert!(txn.new_configuration_gateway().load().await.unwrap().is_none());
    assert!(txn.new_organization_gateway().load().await.unwrap().is_none());
    txn.close().await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
async fn store_inserts_then_overwrites_the_single_row() {
    let store = store().await;

    let first = Configuration {
        registration_open: false,
        ..Configuration::default()
    };
    let second = Configuration {
        default_locale: "de".to_string(),
        ..first.clone()
    };

    let txn = store.manager.begin().await.unwrap();
    let gw = txn.new_configuration_gateway();
    gw.store(&first).await.unwrap();
    gw.store(&second).await.unwrap();
    txn.commit().await.unwrap();

    let txn = store.manager.begin().await.unwrap();
    assert_eq!(
        txn.new_configuration_gateway().load().await.unwrap(),
        Some(second)
    );
    txn.close().await.unwrap();
    store.shutdown().await;
}

#[tokio::test]
async fn organization_round_trips_optional_fields() {
    let store = store().await;
    let org = Organization {
        name: "Acme Hosting".to_string(),
        contact_email: "ops@acme.test".to_string(),
        website: Some("https://acme.test".to_string()),
        address: None,
    };

    let txn = store.manager.begin().await.unwrap();
    txn.new_organization_gateway().store(&org).await.unwrap();
    txn.commit().await.unwrap();

    let txn = store.manager.begin().await.unwrap();
    assert_eq!(txn.new_organization_gateway().load().await.unwrap(), Some(org));
    txn.close().await.unwrap();
    store.shutdown().await;
}
