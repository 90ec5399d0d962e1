// Dry run of the sweeps over the bundled ledger snapshot

use alloy_primitives::B256;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_test::assert_ok;

use insured_bridge_relayer::chains::{CallKind, RecordingSubmitter, StaticGasEstimator};
use insured_bridge_relayer::relay::Sweep;
use insured_bridge_relayer::{
    CrossDomainFinalizer, InMemoryLedger, LedgerSnapshot, Relayer, RelayerConfig, RelayerMetrics, RelayerSettings,
};

fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

async fn load_ledger() -> (RelayerConfig, Arc<InMemoryLedger>) {
    let config = RelayerConfig::load(config_dir().join("relayer.toml")).unwrap();
    let content = std::fs::read_to_string(config_dir().join("snapshot.example.json")).unwrap();
    let snapshot: LedgerSnapshot = serde_json::from_str(&content).unwrap();
    assert_eq!(snapshot.origin_chain_id, config.relayer.origin_chain_id);

    (config, Arc::new(InMemoryLedger::from_snapshot(snapshot).await))
}

async fn load_relayer() -> (Relayer, Arc<RecordingSubmitter>) {
    let (config, ledger) = load_ledger().await;
    let submitter = Arc::new(RecordingSubmitter::new());
    let relayer = Relayer::new(
        ledger.clone(),
        ledger,
        submitter.clone(),
        Arc::new(StaticGasEstimator::new(config.relayer.gas_price.into())),
        RelayerSettings::from(&config),
        Arc::new(RelayerMetrics::new().unwrap()),
    );
    (relayer, submitter)
}

#[tokio::test]
async fn test_snapshot_relays_every_deposit_in_one_multicall() {
    let (relayer, submitter) = load_relayer().await;

    let reports = assert_ok!(relayer.run_sweeps().await);
    let relay = reports.iter().find(|r| r.sweep == Sweep::Relay).unwrap();

    // 3 WETH covers an instant relay of the 1 WETH deposit but only the
    // bond of the 10 WETH one
    assert_eq!(relay.actions_of(CallKind::InstantRelay).count(), 1);
    assert_eq!(relay.actions_of(CallKind::SlowRelay).count(), 1);
    assert_eq!(relay.sent(), 2);

    let submitted = submitter.submitted().await;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].kind, CallKind::Multicall);
    assert!(submitted[0].description.contains("WETH"));

    assert!(reports.iter().filter(|r| r.sweep != Sweep::Relay).all(|r| r.is_idle()));
}

#[tokio::test]
async fn test_reports_serialize_to_json() {
    let (relayer, _submitter) = load_relayer().await;
    let reports = assert_ok!(relayer.run_sweeps().await);

    let json = assert_ok!(serde_json::to_value(&reports));
    assert_eq!(json[0]["sweep"], "relay");
    assert_eq!(json[0]["batches"][0]["multicall"]["status"], "sent");

    let metrics = assert_ok!(relayer.metrics().gather_text());
    assert!(metrics.contains("calls_submitted"));
}

#[tokio::test]
async fn test_snapshot_finalizes_relayable_bridge_messages() {
    let (config, ledger) = load_ledger().await;
    let messages = ledger.bridge_messages().await;
    assert_eq!(messages, vec![B256::repeat_byte(0x11), B256::repeat_byte(0x22)]);

    let submitter = Arc::new(RecordingSubmitter::new());
    let finalizer = CrossDomainFinalizer::new(
        ledger,
        submitter.clone(),
        Arc::new(StaticGasEstimator::new(config.relayer.gas_price.into())),
        config.relayer.account,
        Arc::new(RelayerMetrics::new().unwrap()),
    );

    let report = assert_ok!(finalizer.finalize(&messages).await);

    assert_eq!(report.finalized, vec![B256::repeat_byte(0x11)]);
    assert_eq!(report.not_ready, vec![B256::repeat_byte(0x22)]);
    assert!(report.failures.is_empty());

    let submitted = submitter.submitted().await;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].kind, CallKind::Finalization);
}
