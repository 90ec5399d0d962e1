// Configuration file loading and validation

use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;
use tokio_test::{assert_err, assert_ok};

use insured_bridge_relayer::{RelayerConfig, RelayerError, RelayerSettings};

fn sample_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config").join("relayer.toml")
}

#[test]
fn test_sample_config_loads_and_validates() {
    let config = assert_ok!(RelayerConfig::load(sample_config_path()));
    assert_ok!(config.validate());

    assert_eq!(config.relayer.origin_chain_id, 10);
    assert_eq!(config.relayer.whitelisted_chain_ids, vec![10]);
    assert_eq!(config.relayer.l2_lookback_window, 100_000);
    assert_eq!(assert_ok!(config.sweep_interval()), Duration::from_secs(60));

    let settings = RelayerSettings::from(&config);
    let weth = config.relayer.whitelisted_l1_tokens[0];
    assert_eq!(settings.deployments[&weth].timestamp, 1_635_962_805);
    assert_eq!(settings.deployments[&weth].block_number, 2_284_839);
}

#[test]
fn test_missing_deployment_fails_validation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("relayer.toml");

    let mut config = RelayerConfig::default();
    config.relayer.deployments.clear();
    assert_ok!(config.save(&path));

    let loaded = assert_ok!(RelayerConfig::load(&path));
    let err = assert_err!(loaded.validate());
    assert!(matches!(err, RelayerError::Config(_)));
    assert!(err.to_string().contains("no deployment configured"));
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    assert_err!(RelayerConfig::load(dir.path().join("absent.toml")));
}
