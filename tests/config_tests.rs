//! Configuration validation tests.

mod common;

use common::test_config;
use qrfast::error::AppError;

#[test]
fn test_fixture_config_is_valid() {
    assert!(test_config().validate().is_ok());
}

#[test]
fn test_short_code_length_bounds() {
    let mut config = test_config();

    config.links.short_code_length = 3;
    assert!(matches!(config.validate(), Err(AppError::Configuration(_))));

    config.links.short_code_length = 17;
    assert!(config.validate().is_err());

    config.links.short_code_length = 16;
    assert!(config.validate().is_ok());
}

#[test]
fn test_landing_path_must_be_root_relative() {
    let mut config = test_config();
    config.links.landing_path = "https://elsewhere.example".to_string();

    assert!(config.validate().is_err());
}

#[test]
fn test_base_url_needs_scheme() {
    let mut config = test_config();
    config.links.base_url = "qr.example.com".to_string();

    assert!(config.validate().is_err());
}

#[test]
fn test_rate_limit_periods() {
    let mut config = test_config();
    config.rate_limit.requests_per_minute = 60;

    assert_eq!(config.rate_limit.period_ms(), 1000);

    config.rate_limit.requests_per_minute = 0;
    assert!(config.validate().is_err());

    config.rate_limit.requests_per_minute = 60_000;
    assert_eq!(config.rate_limit.period_ms(), 1);
    assert!(config.validate().is_ok());

    config.rate_limit.requests_per_minute = 60_001;
    assert!(config.validate().is_err());
}

#[test]
fn test_bcrypt_cost_bounds() {
    let mut config = test_config();

    config.auth.bcrypt_cost = 3;
    assert!(config.validate().is_err());

    config.auth.bcrypt_cost = 12;
    assert!(config.validate().is_ok());
}

#[test]
fn test_worker_retry_cap() {
    let mut config = test_config();
    config.jobs.max_retries = 11;

    assert!(config.validate().is_err());
}

#[test]
fn test_database_settings() {
    let mut config = test_config();
    config.database.url = "mysql://localhost/qrfast".to_string();
    assert!(config.validate().is_err());

    let mut config = test_config();
    config.database.min_connections = 10;
    assert!(config.validate().is_err());
}
