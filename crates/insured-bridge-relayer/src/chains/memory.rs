// In-memory ledger used for dry runs and tests
//
// Models both chains in a single process: deposits live at block heights on
// the origin side, relays and balances on the settlement side. Only the
// client's "default search" window is visible to the fast lookups, which is
// what forces the relayer into its block-by-block fallback search.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

use super::adapters::finalization_call;
use super::{
    BridgePoolInfo, CanonicalBridgeAdapter, CallKind, ClientRelayState, Deposit, DepositEvent, GasEstimator, GasPrice,
    OriginLedger, PreparedCall, Relay, SettleableRelay, SettlementLedger, TransactionConfig,
    TransactionReceipt, TransactionSubmitter,
};
use crate::error::{GatewayError, SubmissionError};

#[derive(Debug, Default)]
struct LedgerState {
    head_block: u64,
    /// First block covered by the default deposit search
    default_search_from: u64,
    deposits: Vec<(u64, Deposit)>,
    relays: HashMap<B256, Relay>,
    instant_relayers: HashMap<(Address, B256, u64), Address>,
    balances: HashMap<(Address, Address), U256>,
    proposer_bond_pct: u64,
    liveness: u64,
    current_times: HashMap<Address, u64>,
    default_realized_lp_fee_pct: u64,
    realized_lp_fees: HashMap<B256, u64>,
    pools: HashMap<Address, BridgePoolInfo>,
    deposit_contracts: HashMap<u64, Address>,
    /// L2 transaction hash -> (L1 messenger, relayable)
    bridge_messages: HashMap<B256, (Address, bool)>,
    failing_pricing: HashSet<B256>,
}

/// Both ledgers held in memory
#[derive(Debug)]
pub struct InMemoryLedger {
    origin_chain_id: u64,
    state: RwLock<LedgerState>,
    scan_calls: AtomicU64,
}

impl InMemoryLedger {
    pub fn new(origin_chain_id: u64) -> Self {
        Self {
            origin_chain_id,
            state: RwLock::new(LedgerState::default()),
            scan_calls: AtomicU64::new(0),
        }
    }

    /// Record a deposit at `block_number`, advancing the head if needed
    pub async fn add_deposit(&self, block_number: u64, event: DepositEvent) -> Deposit {
        let deposit = event.into_deposit();
        let mut state = self.state.write().await;
        state.head_block = state.head_block.max(block_number);
        state.deposits.push((block_number, deposit.clone()));
        state.deposits.sort_by_key(|(block, _)| *block);
        deposit
    }

    pub async fn set_head_block(&self, head_block: u64) {
        self.state.write().await.head_block = head_block;
    }

    pub async fn set_default_search_from(&self, block_number: u64) {
        self.state.write().await.default_search_from = block_number;
    }

    /// Insert or replace the relay for its deposit hash
    pub async fn set_relay(&self, relay: Relay) {
        self.state.write().await.relays.insert(relay.deposit_hash, relay);
    }

    pub async fn remove_relay(&self, deposit_hash: B256) -> Option<Relay> {
        self.state.write().await.relays.remove(&deposit_hash)
    }

    pub async fn set_instant_relayer(
        &self,
        l1_token: Address,
        deposit_hash: B256,
        realized_lp_fee_pct: u64,
        relayer: Address,
    ) {
        self.state
            .write()
            .await
            .instant_relayers
            .insert((l1_token, deposit_hash, realized_lp_fee_pct), relayer);
    }

    pub async fn set_balance(&self, account: Address, l1_token: Address, amount: U256) {
        self.state.write().await.balances.insert((account, l1_token), amount);
    }

    pub async fn set_proposer_bond_pct(&self, pct: u64) {
        self.state.write().await.proposer_bond_pct = pct;
    }

    pub async fn set_liveness(&self, seconds: u64) {
        self.state.write().await.liveness = seconds;
    }

    /// Move the bridge pool clock for an L1 token
    pub async fn set_current_time(&self, l1_token: Address, timestamp: u64) {
        self.state.write().await.current_times.insert(l1_token, timestamp);
    }

    /// Realized LP fee returned for deposits without a specific override
    pub async fn set_default_realized_lp_fee_pct(&self, pct: u64) {
        self.state.write().await.default_realized_lp_fee_pct = pct;
    }

    pub async fn set_realized_lp_fee_pct(&self, deposit_hash: B256, pct: u64) {
        self.state.write().await.realized_lp_fees.insert(deposit_hash, pct);
    }

    pub async fn register_pool(&self, l1_token: Address, pool: BridgePoolInfo) {
        self.state.write().await.pools.insert(l1_token, pool);
    }

    pub async fn register_deposit_contract(&self, chain_id: u64, deposit_contract: Address) {
        self.state.write().await.deposit_contracts.insert(chain_id, deposit_contract);
    }

    /// Track an L2 -> L1 bridge message. It can be finalized once `relayable`.
    pub async fn add_bridge_message(&self, l2_transaction_hash: B256, messenger: Address, relayable: bool) {
        self.state.write().await.bridge_messages.insert(l2_transaction_hash, (messenger, relayable));
    }

    /// Every tracked bridge message, sorted by L2 transaction hash
    pub async fn bridge_messages(&self) -> Vec<B256> {
        let mut hashes: Vec<B256> = self.state.read().await.bridge_messages.keys().copied().collect();
        hashes.sort();
        hashes
    }

    /// Make pricing queries for a deposit fail, simulating a flaky node
    pub async fn fail_pricing_for(&self, deposit_hash: B256) {
        self.state.write().await.failing_pricing.insert(deposit_hash);
    }

    /// Number of `scan_deposit_events` calls served so far
    pub fn scan_calls(&self) -> u64 {
        self.scan_calls.load(Ordering::SeqCst)
    }

    /// Build a ledger from a serialized snapshot
    pub async fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let ledger = Self::new(snapshot.origin_chain_id);
        for entry in snapshot.deposits {
            ledger.add_deposit(entry.block_number, entry.event).await;
        }
        {
            let mut state = ledger.state.write().await;
            state.head_block = state.head_block.max(snapshot.head_block);
            state.default_search_from = snapshot.default_search_from;
            state.proposer_bond_pct = snapshot.proposer_bond_pct;
            state.liveness = snapshot.liveness;
            state.default_realized_lp_fee_pct = snapshot.default_realized_lp_fee_pct;
            for relay in snapshot.relays {
                state.relays.insert(relay.deposit_hash, relay);
            }
            for entry in snapshot.instant_relayers {
                state.instant_relayers.insert(
                    (entry.l1_token, entry.deposit_hash, entry.realized_lp_fee_pct),
                    entry.relayer,
                );
            }
            for entry in snapshot.balances {
                state.balances.insert((entry.account, entry.l1_token), entry.amount);
            }
            for entry in snapshot.realized_lp_fees {
                state.realized_lp_fees.insert(entry.deposit_hash, entry.realized_lp_fee_pct);
            }
            for entry in snapshot.pools {
                state.current_times.insert(entry.l1_token, entry.current_time);
                state.pools.insert(entry.l1_token, entry.pool);
            }
            for entry in snapshot.deposit_contracts {
                state.deposit_contracts.insert(entry.chain_id, entry.address);
            }
            for entry in snapshot.bridge_messages {
                state
                    .bridge_messages
                    .insert(entry.l2_transaction_hash, (entry.messenger, entry.relayable));
            }
        }
        ledger
    }
}

#[async_trait]
impl OriginLedger for InMemoryLedger {
    fn chain_id(&self) -> u64 {
        self.origin_chain_id
    }

    async fn deposits_for_token(&self, l1_token: Address) -> Result<Vec<Deposit>, GatewayError> {
        let state = self.state.read().await;
        Ok(state
            .deposits
            .iter()
            .filter(|(block, deposit)| *block >= state.default_search_from && deposit.l1_token == l1_token)
            .map(|(_, deposit)| deposit.clone())
            .collect())
    }

    async fn deposit_by_hash(&self, deposit_hash: B256) -> Result<Option<Deposit>, GatewayError> {
        let state = self.state.read().await;
        Ok(state
            .deposits
            .iter()
            .find(|(block, deposit)| *block >= state.default_search_from && deposit.deposit_hash == deposit_hash)
            .map(|(_, deposit)| deposit.clone()))
    }

    async fn scan_deposit_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<DepositEvent>, GatewayError> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        Ok(state
            .deposits
            .iter()
            .filter(|(block, _)| *block >= from_block && *block <= to_block)
            .map(|(_, deposit)| DepositEvent {
                chain_id: deposit.chain_id,
                deposit_id: deposit.deposit_id,
                l1_recipient: deposit.l1_recipient,
                l2_sender: deposit.l2_sender,
                l1_token: deposit.l1_token,
                amount: deposit.amount,
                slow_relay_fee_pct: deposit.slow_relay_fee_pct,
                instant_relay_fee_pct: deposit.instant_relay_fee_pct,
                quote_timestamp: deposit.quote_timestamp,
                deposit_contract: deposit.deposit_contract,
            })
            .collect())
    }

    async fn latest_block(&self) -> Result<u64, GatewayError> {
        Ok(self.state.read().await.head_block)
    }
}

#[async_trait]
impl SettlementLedger for InMemoryLedger {
    async fn deposit_relay_state(&self, deposit: &Deposit) -> Result<ClientRelayState, GatewayError> {
        let state = self.state.read().await;
        Ok(state
            .relays
            .get(&deposit.deposit_hash)
            .map(|relay| relay.relay_state)
            .unwrap_or(ClientRelayState::Uninitialized))
    }

    async fn pending_relays(&self) -> Result<Vec<Relay>, GatewayError> {
        let state = self.state.read().await;
        let mut relays: Vec<Relay> = state
            .relays
            .values()
            .filter(|relay| relay.relay_state == ClientRelayState::Pending)
            .cloned()
            .collect();
        relays.sort_by_key(|relay| relay.relay_id);
        Ok(relays)
    }

    async fn settleable_relays(&self, l1_token: Address) -> Result<Vec<Relay>, GatewayError> {
        let state = self.state.read().await;
        let mut relays: Vec<Relay> = state
            .relays
            .values()
            .filter(|relay| {
                relay.l1_token == l1_token
                    && relay.relay_state == ClientRelayState::Pending
                    && relay.settleable != SettleableRelay::CannotSettle
            })
            .cloned()
            .collect();
        relays.sort_by_key(|relay| relay.relay_id);
        Ok(relays)
    }

    async fn relay_for_deposit(
        &self,
        l1_token: Address,
        deposit: &Deposit,
    ) -> Result<Option<Relay>, GatewayError> {
        let state = self.state.read().await;
        Ok(state
            .relays
            .get(&deposit.deposit_hash)
            .filter(|relay| relay.l1_token == l1_token && relay.relay_state == ClientRelayState::Pending)
            .cloned())
    }

    async fn instant_relayer(
        &self,
        l1_token: Address,
        deposit_hash: B256,
        realized_lp_fee_pct: u64,
    ) -> Result<Option<Address>, GatewayError> {
        let state = self.state.read().await;
        Ok(state
            .instant_relayers
            .get(&(l1_token, deposit_hash, realized_lp_fee_pct))
            .copied())
    }

    async fn token_balance(&self, account: Address, l1_token: Address) -> Result<U256, GatewayError> {
        let state = self.state.read().await;
        Ok(state.balances.get(&(account, l1_token)).copied().unwrap_or(U256::ZERO))
    }

    async fn proposer_bond_pct(&self) -> Result<u64, GatewayError> {
        Ok(self.state.read().await.proposer_bond_pct)
    }

    async fn current_time(&self, l1_token: Address) -> Result<u64, GatewayError> {
        let state = self.state.read().await;
        state
            .current_times
            .get(&l1_token)
            .copied()
            .ok_or(GatewayError::UnknownPool(l1_token))
    }

    async fn optimistic_oracle_liveness(&self) -> Result<u64, GatewayError> {
        Ok(self.state.read().await.liveness)
    }

    async fn calculate_realized_lp_fee_pct(&self, deposit: &Deposit) -> Result<u64, GatewayError> {
        let state = self.state.read().await;
        if state.failing_pricing.contains(&deposit.deposit_hash) {
            return Err(GatewayError::Query(format!(
                "realized LP fee query failed for deposit {}",
                deposit.deposit_hash
            )));
        }
        Ok(state
            .realized_lp_fees
            .get(&deposit.deposit_hash)
            .copied()
            .unwrap_or(state.default_realized_lp_fee_pct))
    }

    async fn bridge_pool(&self, l1_token: Address) -> Result<BridgePoolInfo, GatewayError> {
        let state = self.state.read().await;
        state.pools.get(&l1_token).cloned().ok_or(GatewayError::UnknownPool(l1_token))
    }

    async fn deposit_contract(&self, chain_id: u64) -> Result<Address, GatewayError> {
        let state = self.state.read().await;
        Ok(state.deposit_contracts.get(&chain_id).copied().unwrap_or(Address::ZERO))
    }
}

#[async_trait]
impl CanonicalBridgeAdapter for InMemoryLedger {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn construct_finalization_transaction(
        &self,
        l2_transaction_hash: B256,
    ) -> Result<Option<PreparedCall>, GatewayError> {
        let state = self.state.read().await;
        match state.bridge_messages.get(&l2_transaction_hash) {
            Some(&(messenger, true)) => Ok(Some(finalization_call(messenger, l2_transaction_hash))),
            Some(_) => Ok(None),
            None => Err(GatewayError::Query(format!(
                "no L2 -> L1 message sent by transaction {}",
                l2_transaction_hash
            ))),
        }
    }
}

/// Serializable view of an [`InMemoryLedger`], loaded by the `simulate` command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSnapshot {
    pub origin_chain_id: u64,
    pub head_block: u64,
    pub default_search_from: u64,
    pub proposer_bond_pct: u64,
    pub liveness: u64,
    pub default_realized_lp_fee_pct: u64,
    pub deposits: Vec<SnapshotDeposit>,
    pub relays: Vec<Relay>,
    pub instant_relayers: Vec<SnapshotInstantRelayer>,
    pub balances: Vec<SnapshotBalance>,
    pub realized_lp_fees: Vec<SnapshotLpFee>,
    pub pools: Vec<SnapshotPool>,
    pub deposit_contracts: Vec<SnapshotDepositContract>,
    pub bridge_messages: Vec<SnapshotBridgeMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDeposit {
    pub block_number: u64,
    pub event: DepositEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotInstantRelayer {
    pub l1_token: Address,
    pub deposit_hash: B256,
    pub realized_lp_fee_pct: u64,
    pub relayer: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotBalance {
    pub account: Address,
    pub l1_token: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotLpFee {
    pub deposit_hash: B256,
    pub realized_lp_fee_pct: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPool {
    pub l1_token: Address,
    pub pool: BridgePoolInfo,
    pub current_time: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDepositContract {
    pub chain_id: u64,
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotBridgeMessage {
    pub l2_transaction_hash: B256,
    pub messenger: Address,
    pub relayable: bool,
}

/// Submitter that records every call instead of sending it.
///
/// Failures can be injected per call kind or per exact calldata.
#[derive(Debug, Default)]
pub struct RecordingSubmitter {
    submitted: Mutex<Vec<(PreparedCall, TransactionConfig)>>,
    failing_kinds: Mutex<HashSet<CallKind>>,
    failing_calldata: Mutex<HashSet<Bytes>>,
    nonce: AtomicU64,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call of this kind reverts
    pub async fn fail_kind(&self, kind: CallKind) {
        self.failing_kinds.lock().await.insert(kind);
    }

    /// The call with exactly this calldata reverts
    pub async fn fail_calldata(&self, calldata: Bytes) {
        self.failing_calldata.lock().await.insert(calldata);
    }

    /// Calls attempted so far, including the ones that reverted
    pub async fn submitted(&self) -> Vec<PreparedCall> {
        self.submitted.lock().await.iter().map(|(call, _)| call.clone()).collect()
    }

    pub async fn submitted_configs(&self) -> Vec<TransactionConfig> {
        self.submitted.lock().await.iter().map(|(_, config)| *config).collect()
    }
}

#[async_trait]
impl TransactionSubmitter for RecordingSubmitter {
    async fn submit(
        &self,
        call: &PreparedCall,
        config: &TransactionConfig,
    ) -> Result<TransactionReceipt, SubmissionError> {
        self.submitted.lock().await.push((call.clone(), *config));

        if self.failing_kinds.lock().await.contains(&call.kind)
            || self.failing_calldata.lock().await.contains(&call.calldata)
        {
            return Err(SubmissionError::Reverted(format!("{} call reverted", call.kind)));
        }

        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut preimage = call.calldata.to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        Ok(TransactionReceipt { transaction_hash: keccak256(preimage) })
    }
}

/// Gas estimator returning a fixed price
#[derive(Debug, Clone)]
pub struct StaticGasEstimator {
    price: GasPrice,
}

impl StaticGasEstimator {
    pub fn new(price: GasPrice) -> Self {
        Self { price }
    }
}

#[async_trait]
impl GasEstimator for StaticGasEstimator {
    async fn update(&self) -> Result<(), GatewayError> {
        Ok(())
    }

    fn fast_price(&self) -> GasPrice {
        self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::types::test_fixtures::*;

    #[tokio::test]
    async fn test_default_search_hides_old_deposits() {
        let ledger = InMemoryLedger::new(10);
        let old = ledger.add_deposit(5, deposit_event(1)).await;
        let recent = ledger.add_deposit(50, deposit_event(2)).await;
        ledger.set_default_search_from(40).await;

        assert!(ledger.deposit_by_hash(old.deposit_hash).await.unwrap().is_none());
        assert_eq!(ledger.deposit_by_hash(recent.deposit_hash).await.unwrap(), Some(recent.clone()));
        assert_eq!(ledger.deposits_for_token(WETH).await.unwrap(), vec![recent]);

        let scanned = ledger.scan_deposit_events(0, 10).await.unwrap();
        assert_eq!(scanned, vec![deposit_event(1)]);
        assert_eq!(ledger.scan_calls(), 1);
    }

    #[tokio::test]
    async fn test_relay_state_tracks_relays() {
        let ledger = InMemoryLedger::new(10);
        let deposit = ledger.add_deposit(1, deposit_event(1)).await;
        assert_eq!(
            ledger.deposit_relay_state(&deposit).await.unwrap(),
            ClientRelayState::Uninitialized
        );

        ledger.set_relay(relay_for(&deposit, ONE_PCT)).await;
        assert_eq!(ledger.deposit_relay_state(&deposit).await.unwrap(), ClientRelayState::Pending);
        assert_eq!(ledger.pending_relays().await.unwrap().len(), 1);
        assert!(ledger.relay_for_deposit(WETH, &deposit).await.unwrap().is_some());

        assert!(ledger.remove_relay(deposit.deposit_hash).await.is_some());
        assert!(ledger.pending_relays().await.unwrap().is_empty());
        assert_eq!(
            ledger.deposit_relay_state(&deposit).await.unwrap(),
            ClientRelayState::Uninitialized
        );
    }

    #[tokio::test]
    async fn test_unregistered_deposit_contract_is_zero() {
        let ledger = InMemoryLedger::new(10);
        ledger.register_deposit_contract(10, DEPOSIT_BOX).await;

        assert_eq!(ledger.deposit_contract(10).await.unwrap(), DEPOSIT_BOX);
        assert_eq!(ledger.deposit_contract(999).await.unwrap(), Address::ZERO);
    }

    #[tokio::test]
    async fn test_recording_submitter_injects_failures() {
        let submitter = RecordingSubmitter::new();
        submitter.fail_kind(CallKind::Dispute).await;
        let config = TransactionConfig { from: SENDER, gas_price: GasPrice::default() };

        let mut call = PreparedCall {
            kind: CallKind::Settle,
            target: WETH,
            calldata: Bytes::from(vec![1, 2, 3]),
            message: "settle".to_string(),
            description: String::new(),
        };
        assert!(submitter.submit(&call, &config).await.is_ok());

        call.kind = CallKind::Dispute;
        assert!(matches!(submitter.submit(&call, &config).await, Err(SubmissionError::Reverted(_))));
        assert_eq!(submitter.submitted().await.len(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_through_json() {
        let snapshot = LedgerSnapshot {
            origin_chain_id: 10,
            head_block: 100,
            deposits: vec![SnapshotDeposit { block_number: 42, event: deposit_event(3) }],
            pools: vec![SnapshotPool {
                l1_token: WETH,
                pool: BridgePoolInfo {
                    address: DEPOSIT_BOX,
                    collateral_symbol: "WETH".to_string(),
                    collateral_decimals: 18,
                },
                current_time: 1_700_000_500,
            }],
            ..Default::default()
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: LedgerSnapshot = serde_json::from_str(&json).unwrap();

        let ledger = InMemoryLedger::from_snapshot(parsed).await;
        assert_eq!(ledger.latest_block().await.unwrap(), 100);
        assert_eq!(ledger.deposits_for_token(WETH).await.unwrap().len(), 1);
        assert_eq!(ledger.current_time(WETH).await.unwrap(), 1_700_000_500);
    }
}
