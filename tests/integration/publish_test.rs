use std::fs;

use scenario_rollup::config::PublishConfig;
use scenario_rollup::publish::{CredentialStore, ObjectStore, object_key};
use scenario_rollup::{JsonCredentialStore, LocalObjectStore, Publisher};

use crate::utils::Fixture;

#[test]
fn object_keys_use_file_names_without_spaces() {
    let key = object_key("latest", std::path::Path::new("/out/data/My Scenario.county.csv"));
    assert_eq!(key.unwrap(), "latest/My_Scenario.county.csv");
}

#[test]
fn region_mismatch_is_reported_with_both_values() {
    let fixture = Fixture::new();
    fixture.write_credentials("jhumodelaggregates");
    let publish = PublishConfig {
        region: "eu-west-1".to_string(),
        ..PublishConfig::default()
    };

    // the record lives at the same location regardless of region
    let store = JsonCredentialStore::new(fixture.credentials_root());
    assert!(store.fetch(&publish).is_ok());

    let err = Publisher::connect(
        Box::new(LocalObjectStore::new(fixture.store_root())),
        &store,
        &publish,
        "20200401",
    )
    .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("eu-west-1"));
    assert!(msg.contains("us-east-2"));
}

#[test]
fn missing_credential_record_fails_to_connect() {
    let fixture = Fixture::new();
    let config = fixture.config(&[]);
    assert!(fixture.publisher(&config).is_err());
}

#[test]
fn republishing_replaces_objects() {
    let fixture = Fixture::new();
    let store = LocalObjectStore::new(fixture.store_root());
    let src = fixture.root.path().join("A.csv");

    fs::write(&src, "v1").unwrap();
    store.put_file("b", "latest/A.csv", &src).unwrap();
    fs::write(&src, "v2").unwrap();
    store.put_file("b", "latest/A.csv", &src).unwrap();

    let stored = store.object_path("b", "latest/A.csv");
    assert_eq!(fs::read_to_string(stored).unwrap(), "v2");
}
