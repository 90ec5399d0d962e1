// Ledger client interfaces used by the relayer
//
// The relayer never talks to a node directly. Everything it reads or writes
// goes through the traits below, so any ledger family can be plugged in.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;

pub mod adapters;
pub mod memory;
pub mod transaction;
pub mod types;

pub use adapters::CanonicalBridgeAdapter;
pub use memory::{InMemoryLedger, LedgerSnapshot, RecordingSubmitter, StaticGasEstimator};
pub use transaction::{CallKind, GasPrice, PreparedCall, TransactionConfig, TransactionReceipt};
pub use types::{
    BridgePoolInfo, ClientRelayState, DeploymentInfo, Deposit, DepositEvent, Relay, RelaySubmitType,
    SettleableRelay, FIXED_POINT,
};

use crate::error::{GatewayError, SubmissionError};

/// Read access to the origin chain (L2) where deposits are made
#[async_trait]
pub trait OriginLedger: Send + Sync {
    /// Chain id of the origin chain
    fn chain_id(&self) -> u64;

    /// Deposits for an L1 token found by the client's default block search
    async fn deposits_for_token(&self, l1_token: Address) -> Result<Vec<Deposit>, GatewayError>;

    /// Deposit with the given hash, within the client's default block search
    async fn deposit_by_hash(&self, deposit_hash: B256) -> Result<Option<Deposit>, GatewayError>;

    /// Raw deposit events emitted in `[from_block, to_block]`, both inclusive
    async fn scan_deposit_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<DepositEvent>, GatewayError>;

    /// Latest block number
    async fn latest_block(&self) -> Result<u64, GatewayError>;
}

/// Read access to the settlement chain (L1) bridge pools and admin
#[async_trait]
pub trait SettlementLedger: Send + Sync {
    async fn deposit_relay_state(&self, deposit: &Deposit) -> Result<ClientRelayState, GatewayError>;

    /// All relays that are neither finalized nor disputed
    async fn pending_relays(&self) -> Result<Vec<Relay>, GatewayError>;

    /// Relays for an L1 token along with their settleability
    async fn settleable_relays(&self, l1_token: Address) -> Result<Vec<Relay>, GatewayError>;

    async fn relay_for_deposit(
        &self,
        l1_token: Address,
        deposit: &Deposit,
    ) -> Result<Option<Relay>, GatewayError>;

    async fn instant_relayer(
        &self,
        l1_token: Address,
        deposit_hash: B256,
        realized_lp_fee_pct: u64,
    ) -> Result<Option<Address>, GatewayError>;

    async fn has_instant_relayer(
        &self,
        l1_token: Address,
        deposit_hash: B256,
        realized_lp_fee_pct: u64,
    ) -> Result<bool, GatewayError> {
        Ok(self
            .instant_relayer(l1_token, deposit_hash, realized_lp_fee_pct)
            .await?
            .is_some())
    }

    async fn token_balance(&self, account: Address, l1_token: Address) -> Result<U256, GatewayError>;

    /// Proposer bond as an 18-decimal fraction of the relayed amount
    async fn proposer_bond_pct(&self) -> Result<u64, GatewayError>;

    /// Current time of the bridge pool contract for an L1 token
    async fn current_time(&self, l1_token: Address) -> Result<u64, GatewayError>;

    /// Dispute window, in seconds
    async fn optimistic_oracle_liveness(&self) -> Result<u64, GatewayError>;

    /// Expected realized LP fee for a deposit, priced at its quote time
    async fn calculate_realized_lp_fee_pct(&self, deposit: &Deposit) -> Result<u64, GatewayError>;

    async fn bridge_pool(&self, l1_token: Address) -> Result<BridgePoolInfo, GatewayError>;

    /// Deposit box registered with the bridge admin for an origin chain, or the
    /// zero address when the admin has none for it
    async fn deposit_contract(&self, chain_id: u64) -> Result<Address, GatewayError>;
}

/// Signs and sends prepared calls
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit(
        &self,
        call: &PreparedCall,
        config: &TransactionConfig,
    ) -> Result<TransactionReceipt, SubmissionError>;
}

/// Source of gas prices for submissions
#[async_trait]
pub trait GasEstimator: Send + Sync {
    /// Refresh the cached price
    async fn update(&self) -> Result<(), GatewayError>;

    fn fast_price(&self) -> GasPrice;
}
