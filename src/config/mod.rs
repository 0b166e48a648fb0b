//! Configuration for the vault sentinel

pub mod rpc;

use serde::{Deserialize, Serialize};

// Re-export RPC config
pub use rpc::RpcConfig;

/// Environment variable holding the operator's hex-encoded private key
pub const OPERATOR_KEY_ENV: &str = "OPERATOR_PRIVATE_KEY";

/// Monitored contract addresses (hex strings, 0x-prefixed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// The yield vault
    pub vault: String,
    /// Leveraged strategy (deposits collateral, borrows against it)
    pub leverage_strategy: String,
    /// Lending-pool strategy
    pub aave_strategy: String,
    /// Strategy router (rebalance / deleverage entry points)
    pub router: String,
    /// Pool whose interest accrual generates vault yield
    pub yield_pool: String,
    /// Underlying asset token held by the vault
    pub asset_token: String,
    /// Chain the contracts are deployed on
    pub chain_id: u64,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            vault: "0x0000000000000000000000000000000000000000".to_string(),
            leverage_strategy: "0x0000000000000000000000000000000000000000".to_string(),
            aave_strategy: "0x0000000000000000000000000000000000000000".to_string(),
            router: "0x0000000000000000000000000000000000000000".to_string(),
            yield_pool: "0x0000000000000000000000000000000000000000".to_string(),
            asset_token: "0x0000000000000000000000000000000000000000".to_string(),
            chain_id: 1,
        }
    }
}

/// Cron expressions for the three monitoring jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Comprehensive monitoring cycle
    pub full_cycle: String,
    /// Rapid price check
    pub quick_check: String,
    /// Yield accrual
    pub yield_generation: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            full_cycle: "*/15 * * * *".to_string(),
            quick_check: "*/5 * * * *".to_string(),
            yield_generation: "*/1 * * * *".to_string(),
        }
    }
}

/// Decision thresholds for the rule-driven strategy path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// 24h price move (percent, absolute) treated as volatile
    pub volatility_percent: f64,
    /// Allowed divergence between current and target allocation (percent)
    pub rebalance_tolerance_percent: f64,
    /// Accrued yield (in asset units, human decimal) worth harvesting
    pub harvest_threshold: f64,
    /// Deleverage unwind steps passed to the router
    pub deleverage_steps: u64,
    /// Target share of managed capital in the leverage strategy (percent)
    pub target_leverage_share_percent: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            volatility_percent: 10.0,
            rebalance_tolerance_percent: 5.0,
            harvest_threshold: 1.0,
            deleverage_steps: 10,
            target_leverage_share_percent: 50.0,
        }
    }
}

/// Price feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceFeedConfig {
    /// Base URL of the simple-price endpoint
    pub base_url: String,
    /// Asset identifiers to quote (feed-side ids, e.g. "chainlink")
    pub assets: Vec<String>,
}

impl Default for PriceFeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            assets: vec!["chainlink".to_string(), "weth".to_string()],
        }
    }
}

/// Operator reporting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Channel the cycle summaries are delivered to
    pub channel_id: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            channel_id: "vault-ops".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Monitored contracts
    pub contracts: ContractsConfig,
    /// Job schedules
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Decision thresholds
    #[serde(default)]
    pub risk: RiskConfig,
    /// Price feed
    #[serde(default)]
    pub price_feed: PriceFeedConfig,
    /// Operator reporting
    #[serde(default)]
    pub report: ReportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            contracts: ContractsConfig::default(),
            schedule: ScheduleConfig::default(),
            risk: RiskConfig::default(),
            price_feed: PriceFeedConfig::default(),
            report: ReportConfig::default(),
        }
    }
}
