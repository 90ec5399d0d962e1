// Deposit and relay records shared by the ledger clients and the relay logic
use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

/// Fee percentages are 18-decimal fixed point values (1% == 10^16).
pub const FIXED_POINT: u64 = 1_000_000_000_000_000_000;

/// Fixed point scale as a `U256` for amount arithmetic
pub fn fixed_point() -> U256 {
    U256::from(FIXED_POINT)
}

/// Raw `FundsDeposited` event as emitted by the origin chain deposit box.
///
/// The deposit hash is not part of the event; it is derived by
/// [`DepositEvent::deposit_hash`] so that two events with identical fields
/// always produce the same hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositEvent {
    pub chain_id: u64,
    pub deposit_id: u64,
    pub l1_recipient: Address,
    pub l2_sender: Address,
    pub l1_token: Address,
    pub amount: U256,
    pub slow_relay_fee_pct: u64,
    pub instant_relay_fee_pct: u64,
    pub quote_timestamp: u32,
    /// Address of the deposit box contract that emitted the event
    pub deposit_contract: Address,
}

impl DepositEvent {
    /// keccak256 over the ABI encoding of every event field
    pub fn deposit_hash(&self) -> B256 {
        let encoded = (
            U256::from(self.chain_id),
            self.deposit_id,
            self.l1_recipient,
            self.l2_sender,
            self.l1_token,
            self.amount,
            self.slow_relay_fee_pct,
            self.instant_relay_fee_pct,
            self.quote_timestamp,
            self.deposit_contract,
        )
            .abi_encode();
        keccak256(encoded)
    }

    pub fn into_deposit(self) -> Deposit {
        Deposit::from(self)
    }
}

/// A deposit observed on the origin chain, awaiting a relay on the settlement chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub chain_id: u64,
    pub deposit_id: u64,
    pub deposit_hash: B256,
    pub l1_recipient: Address,
    pub l2_sender: Address,
    pub l1_token: Address,
    pub amount: U256,
    pub slow_relay_fee_pct: u64,
    pub instant_relay_fee_pct: u64,
    pub quote_timestamp: u32,
    pub deposit_contract: Address,
}

impl From<DepositEvent> for Deposit {
    fn from(event: DepositEvent) -> Self {
        let deposit_hash = event.deposit_hash();
        Self {
            chain_id: event.chain_id,
            deposit_id: event.deposit_id,
            deposit_hash,
            l1_recipient: event.l1_recipient,
            l2_sender: event.l2_sender,
            l1_token: event.l1_token,
            amount: event.amount,
            slow_relay_fee_pct: event.slow_relay_fee_pct,
            instant_relay_fee_pct: event.instant_relay_fee_pct,
            quote_timestamp: event.quote_timestamp,
            deposit_contract: event.deposit_contract,
        }
    }
}

/// Relay state of a deposit as seen by the settlement chain client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientRelayState {
    Uninitialized,
    Pending,
    Finalized,
}

impl ClientRelayState {
    /// Discriminant used by the bridge pool contract
    pub fn as_u8(self) -> u8 {
        match self {
            ClientRelayState::Uninitialized => 0,
            ClientRelayState::Pending => 1,
            ClientRelayState::Finalized => 2,
        }
    }
}

/// Who, if anyone, may currently settle a relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettleableRelay {
    CannotSettle,
    /// Only the slow relayer may settle, within its exclusivity window
    SlowRelayerCanSettle,
    AnyoneCanSettle,
}

/// A relay submitted to the bridge pool for a deposit.
///
/// Relays echo the deposit parameters they were submitted with, so a relay
/// can be disputed even when no matching deposit exists on the origin chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    pub relay_id: u32,
    pub chain_id: u64,
    pub deposit_id: u64,
    pub deposit_hash: B256,
    pub l1_recipient: Address,
    pub l2_sender: Address,
    pub l1_token: Address,
    pub amount: U256,
    pub slow_relay_fee_pct: u64,
    pub instant_relay_fee_pct: u64,
    pub quote_timestamp: u32,
    pub realized_lp_fee_pct: u64,
    pub price_request_time: u32,
    pub slow_relayer: Address,
    pub relay_state: ClientRelayState,
    pub proposer_bond: U256,
    pub final_fee: U256,
    pub settleable: SettleableRelay,
}

impl Relay {
    /// True when every deposit parameter echoed by the relay equals the deposit's
    pub fn matches_deposit(&self, deposit: &Deposit) -> bool {
        deposit.chain_id == self.chain_id
            && deposit.deposit_id == self.deposit_id
            && deposit.deposit_hash == self.deposit_hash
            && deposit.l1_recipient == self.l1_recipient
            && deposit.l2_sender == self.l2_sender
            && deposit.l1_token == self.l1_token
            && deposit.amount == self.amount
            && deposit.slow_relay_fee_pct == self.slow_relay_fee_pct
            && deposit.instant_relay_fee_pct == self.instant_relay_fee_pct
            && deposit.quote_timestamp == self.quote_timestamp
    }

    /// Rebuild the deposit this relay claims to honor.
    ///
    /// The hash is taken from the relay as-is rather than recomputed, since
    /// the dispute must reference the relay's own deposit hash.
    pub fn claimed_deposit(&self, deposit_contract: Address) -> Deposit {
        Deposit {
            chain_id: self.chain_id,
            deposit_id: self.deposit_id,
            deposit_hash: self.deposit_hash,
            l1_recipient: self.l1_recipient,
            l2_sender: self.l2_sender,
            l1_token: self.l1_token,
            amount: self.amount,
            slow_relay_fee_pct: self.slow_relay_fee_pct,
            instant_relay_fee_pct: self.instant_relay_fee_pct,
            quote_timestamp: self.quote_timestamp,
            deposit_contract,
        }
    }
}

/// Relay action chosen for a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelaySubmitType {
    Slow,
    SpeedUp,
    Instant,
    Ignore,
}

/// Bridge pool deployment, used to bound deposit searches and reject
/// quote times the pool cannot price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub timestamp: u32,
    pub block_number: u64,
}

/// Bridge pool contract for an L1 token along with its collateral metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgePoolInfo {
    pub address: Address,
    pub collateral_symbol: String,
    pub collateral_decimals: u8,
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;
    use alloy_primitives::address;

    pub const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
    pub const DEPOSIT_BOX: Address = address!("00000000000000000000000000000000000000d0");
    pub const RECIPIENT: Address = address!("00000000000000000000000000000000000000a1");
    pub const SENDER: Address = address!("00000000000000000000000000000000000000b2");

    /// 1% in fee fixed point
    pub const ONE_PCT: u64 = 10_000_000_000_000_000;

    pub fn deposit_event(deposit_id: u64) -> DepositEvent {
        DepositEvent {
            chain_id: 10,
            deposit_id,
            l1_recipient: RECIPIENT,
            l2_sender: SENDER,
            l1_token: WETH,
            amount: U256::from(1000u64),
            slow_relay_fee_pct: ONE_PCT,
            instant_relay_fee_pct: ONE_PCT / 2,
            quote_timestamp: 1_700_000_000,
            deposit_contract: DEPOSIT_BOX,
        }
    }

    pub fn relay_for(deposit: &Deposit, realized_lp_fee_pct: u64) -> Relay {
        Relay {
            relay_id: 0,
            chain_id: deposit.chain_id,
            deposit_id: deposit.deposit_id,
            deposit_hash: deposit.deposit_hash,
            l1_recipient: deposit.l1_recipient,
            l2_sender: deposit.l2_sender,
            l1_token: deposit.l1_token,
            amount: deposit.amount,
            slow_relay_fee_pct: deposit.slow_relay_fee_pct,
            instant_relay_fee_pct: deposit.instant_relay_fee_pct,
            quote_timestamp: deposit.quote_timestamp,
            realized_lp_fee_pct,
            price_request_time: 1_700_000_100,
            slow_relayer: address!("00000000000000000000000000000000000000c3"),
            relay_state: ClientRelayState::Pending,
            proposer_bond: U256::from(50u64),
            final_fee: U256::ZERO,
            settleable: SettleableRelay::CannotSettle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;

    #[test]
    fn test_deposit_hash_is_deterministic() {
        let first = deposit_event(7).into_deposit();
        let second = deposit_event(7).into_deposit();
        assert_eq!(first.deposit_hash, second.deposit_hash);
        assert_eq!(first, second);
    }

    #[test]
    fn test_deposit_hash_changes_with_any_field() {
        let base = deposit_event(7);
        let base_hash = base.deposit_hash();

        let mut variants = Vec::new();
        variants.push(DepositEvent { chain_id: 288, ..base.clone() });
        variants.push(DepositEvent { deposit_id: 8, ..base.clone() });
        variants.push(DepositEvent { l1_recipient: SENDER, ..base.clone() });
        variants.push(DepositEvent { l2_sender: RECIPIENT, ..base.clone() });
        variants.push(DepositEvent { l1_token: DEPOSIT_BOX, ..base.clone() });
        variants.push(DepositEvent { amount: U256::from(1001u64), ..base.clone() });
        variants.push(DepositEvent { slow_relay_fee_pct: ONE_PCT + 1, ..base.clone() });
        variants.push(DepositEvent { instant_relay_fee_pct: 0, ..base.clone() });
        variants.push(DepositEvent { quote_timestamp: 1, ..base.clone() });
        variants.push(DepositEvent { deposit_contract: WETH, ..base.clone() });

        for variant in variants {
            assert_ne!(variant.deposit_hash(), base_hash, "variant {:?} collided", variant);
        }
    }

    #[test]
    fn test_relay_matches_deposit() {
        let deposit = deposit_event(1).into_deposit();
        let mut relay = relay_for(&deposit, ONE_PCT * 2);
        assert!(relay.matches_deposit(&deposit));

        relay.amount = U256::from(999u64);
        assert!(!relay.matches_deposit(&deposit));
    }

    #[test]
    fn test_claimed_deposit_keeps_relay_hash() {
        let deposit = deposit_event(1).into_deposit();
        let mut relay = relay_for(&deposit, ONE_PCT);
        relay.deposit_hash = B256::repeat_byte(0x11);

        let claimed = relay.claimed_deposit(DEPOSIT_BOX);
        assert_eq!(claimed.deposit_hash, B256::repeat_byte(0x11));
        assert_eq!(claimed.deposit_contract, DEPOSIT_BOX);
        assert_eq!(claimed.amount, deposit.amount);
    }
}
