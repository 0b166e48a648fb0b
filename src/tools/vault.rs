//! Vault and strategy read tools
//!
//! All tools here are read-only and safe to call repeatedly. Outputs keep
//! raw fixed-point values and human-decimal views side by side; only the
//! raw values are ever suitable for a follow-up contract call.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::chain::{format_units, parse_units, ChainClient};
use crate::risk::SnapshotStore;
use crate::tools::{parse_input, schema_of, Tool};
use crate::Result;

/// Reads the vault's global state.
///
/// Every successful read also records a TVL snapshot, which is what the
/// APY derivation runs on.
pub struct VaultStateTool {
    chain: Arc<ChainClient>,
    snapshots: SnapshotStore,
}

impl VaultStateTool {
    pub fn new(chain: Arc<ChainClient>, snapshots: SnapshotStore) -> Self {
        Self { chain, snapshots }
    }
}

#[async_trait]
impl Tool for VaultStateTool {
    fn name(&self) -> &'static str {
        super::TOOL_GET_VAULT_STATE
    }

    fn description(&self) -> &'static str {
        "Reads the vault's global state: total assets, total supply, and total managed assets."
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        let state = self.chain.vault_state().await?;
        self.snapshots.record(state.total_assets);

        let raw = json!({
            "total_assets": state.total_assets.to_string(),
            "total_supply": state.total_supply.to_string(),
            "total_managed_assets": state.total_managed_assets.to_string(),
        });
        let human = json!({
            "total_assets": format_units(state.total_assets, 18),
            "total_supply": format_units(state.total_supply, 18),
            "total_managed_assets": format_units(state.total_managed_assets, 18),
        });

        Ok(json!({ "raw": raw, "human": human }))
    }
}

/// Fetches detailed state for all strategies.
pub struct StrategyStatesTool {
    chain: Arc<ChainClient>,
}

impl StrategyStatesTool {
    pub fn new(chain: Arc<ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Tool for StrategyStatesTool {
    fn name(&self) -> &'static str {
        super::TOOL_GET_STRATEGY_STATES
    }

    fn description(&self) -> &'static str {
        "Reads deposited, borrowed, and pool balance details for each strategy."
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        let states = self.chain.strategy_states().await?;

        let strategies: Vec<Value> = states
            .iter()
            .map(|s| {
                json!({
                    "strategy_id": s.strategy_id,
                    "raw": {
                        "deposited": s.deposited.to_string(),
                        "borrowed": s.borrowed.to_string(),
                        "pool_balance": s.pool_balance.to_string(),
                    },
                    "human": {
                        "deposited": format_units(s.deposited, 18),
                        "borrowed": format_units(s.borrowed, 18),
                        "pool_balance": format_units(s.pool_balance, 18),
                    },
                })
            })
            .collect();

        Ok(json!({ "strategies": strategies }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UserBalancesInput {
    /// The user's wallet address
    pub user: String,
}

/// Fetches vault share balance and withdrawable amount for a user.
pub struct UserBalancesTool {
    chain: Arc<ChainClient>,
}

impl UserBalancesTool {
    pub fn new(chain: Arc<ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Tool for UserBalancesTool {
    fn name(&self) -> &'static str {
        super::TOOL_GET_USER_BALANCES
    }

    fn description(&self) -> &'static str {
        "Fetches a user's vault share balance and the asset amount it redeems for."
    }

    fn input_schema(&self) -> Option<Value> {
        schema_of::<UserBalancesInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: UserBalancesInput = parse_input(self.name(), input)?;
        let user = ChainClient::parse_address(&input.user)?;

        let balances = self.chain.user_balances(user).await?;

        Ok(json!({
            "raw": {
                "shares": balances.shares.to_string(),
                "withdrawable": balances.withdrawable.to_string(),
            },
            "human": {
                "shares": format_units(balances.shares, 18),
                "withdrawable": format_units(balances.withdrawable, 18),
            },
        }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ConvertToSharesInput {
    /// Asset amount in human-readable form
    pub amount: String,
}

/// Converts an asset amount to vault share tokens.
pub struct ConvertToSharesTool {
    chain: Arc<ChainClient>,
}

impl ConvertToSharesTool {
    pub fn new(chain: Arc<ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Tool for ConvertToSharesTool {
    fn name(&self) -> &'static str {
        super::TOOL_CONVERT_TO_SHARES
    }

    fn description(&self) -> &'static str {
        "Converts an asset amount to vault shares at the current exchange rate."
    }

    fn input_schema(&self) -> Option<Value> {
        schema_of::<ConvertToSharesInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: ConvertToSharesInput = parse_input(self.name(), input)?;
        let assets = parse_units(&input.amount)?;

        let shares = self.chain.convert_to_shares(assets).await?;

        Ok(json!({
            "raw": { "shares": shares.to_string() },
            "human": { "shares": format_units(shares, 18) },
        }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ConvertToAssetsInput {
    /// Share amount in human-readable form
    pub shares: String,
}

/// Converts vault share tokens to the underlying asset amount.
pub struct ConvertToAssetsTool {
    chain: Arc<ChainClient>,
}

impl ConvertToAssetsTool {
    pub fn new(chain: Arc<ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Tool for ConvertToAssetsTool {
    fn name(&self) -> &'static str {
        super::TOOL_CONVERT_TO_ASSETS
    }

    fn description(&self) -> &'static str {
        "Converts vault shares to the asset amount they redeem for."
    }

    fn input_schema(&self) -> Option<Value> {
        schema_of::<ConvertToAssetsInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: ConvertToAssetsInput = parse_input(self.name(), input)?;
        let shares = parse_units(&input.shares)?;

        let assets = self.chain.convert_to_assets(shares).await?;

        Ok(json!({
            "raw": { "assets": assets.to_string() },
            "human": { "assets": format_units(assets, 18) },
        }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckAllowanceInput {
    /// The user's wallet address
    pub wallet: String,
    /// Intended deposit amount in human-readable form
    pub amount: String,
}

/// Checks whether a user's token allowance covers an intended deposit.
pub struct CheckAllowanceTool {
    chain: Arc<ChainClient>,
}

impl CheckAllowanceTool {
    pub fn new(chain: Arc<ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Tool for CheckAllowanceTool {
    fn name(&self) -> &'static str {
        super::TOOL_CHECK_ALLOWANCE
    }

    fn description(&self) -> &'static str {
        "Checks if a user's asset-token allowance is enough for a deposit."
    }

    fn input_schema(&self) -> Option<Value> {
        schema_of::<CheckAllowanceInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: CheckAllowanceInput = parse_input(self.name(), input)?;
        let wallet = ChainClient::parse_address(&input.wallet)?;
        let needed = parse_units(&input.amount)?;

        let allowance = self.chain.vault_allowance(wallet).await?;

        Ok(json!({
            "raw": {
                "allowance": allowance.to_string(),
                "needed": needed.to_string(),
            },
            "human": {
                "allowance": format_units(allowance, 18),
                "needed": format_units(needed, 18),
            },
            "enough": allowance >= needed,
        }))
    }
}
