use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::chains::{DeploymentInfo, GasPrice};
use crate::error::RelayerError;

/// Environment variables with this prefix override file values,
/// e.g. `RELAYER__GLOBAL__LOG_LEVEL=debug`
pub const ENV_PREFIX: &str = "RELAYER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayerConfig {
    pub global: GlobalConfig,
    pub relayer: BridgeConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Log level for the relayer
    pub log_level: String,
    /// Delay between sweeps, in humantime format ("60s", "2m")
    pub sweep_interval: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Account that sends every transaction
    pub account: Address,
    /// Chain ID of the origin chain the deposit client reads from
    pub origin_chain_id: u64,
    /// L1 tokens the relayer relays and settles
    pub whitelisted_l1_tokens: Vec<Address>,
    /// Relays for any other chain ID are disputed
    pub whitelisted_chain_ids: Vec<u64>,
    /// Blocks per window when searching for a deposit from pool deployment
    pub l2_lookback_window: u64,
    /// Bridge pool deployment per L1 token
    pub deployments: Vec<TokenDeployment>,
    /// Price used by the static gas estimator
    pub gas_price: GasPriceConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDeployment {
    pub l1_token: Address,
    /// Pool deployment time on the settlement chain
    pub timestamp: u32,
    /// Origin chain block at deployment
    pub block_number: u64,
}

/// Gas prices in wei
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPriceConfig {
    pub max_fee_per_gas: u64,
    pub max_priority_fee_per_gas: u64,
}

impl From<GasPriceConfig> for GasPrice {
    fn from(config: GasPriceConfig) -> Self {
        GasPrice {
            max_fee_per_gas: config.max_fee_per_gas.into(),
            max_priority_fee_per_gas: config.max_priority_fee_per_gas.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Print gathered metrics after each simulated run
    pub enabled: bool,
}

impl RelayerConfig {
    /// Load configuration from a TOML file, applying `RELAYER__*` overrides
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        let config: RelayerConfig = settings.try_deserialize()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn sweep_interval(&self) -> Result<Duration, RelayerError> {
        humantime::parse_duration(&self.global.sweep_interval).map_err(|e| {
            RelayerError::Config(format!("invalid sweep_interval {:?}: {}", self.global.sweep_interval, e))
        })
    }

    /// Deployment info keyed by L1 token
    pub fn deployment_map(&self) -> HashMap<Address, DeploymentInfo> {
        self.relayer
            .deployments
            .iter()
            .map(|d| (d.l1_token, DeploymentInfo { timestamp: d.timestamp, block_number: d.block_number }))
            .collect()
    }

    pub fn validate(&self) -> Result<(), RelayerError> {
        let relayer = &self.relayer;
        if relayer.l2_lookback_window == 0 {
            return Err(RelayerError::Config("l2_lookback_window must be greater than zero".to_string()));
        }
        if relayer.whitelisted_l1_tokens.is_empty() {
            return Err(RelayerError::Config("whitelisted_l1_tokens is empty".to_string()));
        }
        if relayer.whitelisted_chain_ids.is_empty() {
            return Err(RelayerError::Config("whitelisted_chain_ids is empty".to_string()));
        }

        let deployments = self.deployment_map();
        if let Some(token) = relayer.whitelisted_l1_tokens.iter().find(|t| !deployments.contains_key(*t)) {
            return Err(RelayerError::Config(format!("no deployment configured for L1 token {}", token)));
        }

        if self.sweep_interval()?.is_zero() {
            return Err(RelayerError::Config("sweep_interval must be greater than zero".to_string()));
        }
        Ok(())
    }
}

impl Default for RelayerConfig {
    fn default() -> Self {
        // Mainnet WETH bridge pool with Optimism as the origin chain
        let weth = alloy_primitives::address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");

        Self {
            global: GlobalConfig {
                log_level: "info".to_string(),
                sweep_interval: "60s".to_string(),
            },
            relayer: BridgeConfig {
                account: Address::ZERO,
                origin_chain_id: 10,
                whitelisted_l1_tokens: vec![weth],
                whitelisted_chain_ids: vec![10],
                l2_lookback_window: 100_000,
                deployments: vec![TokenDeployment {
                    l1_token: weth,
                    timestamp: 1_635_962_805,
                    block_number: 2_284_839,
                }],
                gas_price: GasPriceConfig {
                    max_fee_per_gas: 100_000_000_000,
                    max_priority_fee_per_gas: 2_000_000_000,
                },
            },
            metrics: MetricsConfig { enabled: false },
        }
    }
}
