//! Issuer configuration loading

use std::time::Duration;

use casa_credentials::{
    CredentialError, DEFAULT_FETCH_TIMEOUT, DEFAULT_SECRET_FIELD, DEFAULT_XCACHE_LOCATION,
    IssuerConfig, MacaroonRootKey,
};

#[test]
fn empty_object_gives_defaults() {
    let config = IssuerConfig::from_json_str("{}").expect("config");
    assert_eq!(config, IssuerConfig::default());
    assert_eq!(config.secret_field, DEFAULT_SECRET_FIELD);
    assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
    assert_eq!(config.xcache_location, DEFAULT_XCACHE_LOCATION);
    assert_eq!(config.macaroon_root_key, MacaroonRootKey::Descrambled);
}

#[test]
fn partial_overrides_keep_other_defaults() {
    let config = IssuerConfig::from_json_str(
        r#"{
            "fetch_timeout": 2.5,
            "macaroon_root_key": "stored",
            "bundle": { "ca_common_name": "Test CA" }
        }"#,
    )
    .expect("config");

    assert_eq!(config.fetch_timeout, Duration::from_millis(2500));
    assert_eq!(config.macaroon_root_key, MacaroonRootKey::Stored);
    assert_eq!(config.bundle.ca_common_name, "Test CA");
    assert_eq!(config.bundle.server_common_name, IssuerConfig::default().bundle.server_common_name);
    assert_eq!(config.secret_field, DEFAULT_SECRET_FIELD);
}

#[test]
fn invalid_values_are_rejected() {
    for json in [
        r#"{"secret_field": ""}"#,
        r#"{"fetch_timeout": 0}"#,
        r#"{"fetch_timeout": -1}"#,
        r#"{"xcache_location": ""}"#,
        r#"{"macaroon_root_key": "raw"}"#,
        "not json",
    ] {
        let err = IssuerConfig::from_json_str(json).expect_err("must be rejected");
        assert!(matches!(err, CredentialError::Config(_)), "{json}: {err}");
    }
}

#[test]
fn config_round_trips_through_json() {
    let config = IssuerConfig {
        fetch_timeout: Duration::from_secs(3),
        xcache_location: "T1_US_FNAL".to_string(),
        ..IssuerConfig::default()
    };
    let json = serde_json::to_string(&config).expect("serialize");
    assert_eq!(IssuerConfig::from_json_str(&json).expect("config"), config);
}
