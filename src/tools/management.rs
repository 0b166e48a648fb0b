//! Protocol-maintenance write tools
//!
//! Every tool here submits an operator-signed transaction. Writes are not
//! idempotent, so each tool claims a slot in the per-cycle `WriteGuard`
//! before touching the chain; a second invocation of the same action in
//! one cycle fails validation with no side effect.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::chain::{ChainClient, TxReceipt};
use crate::tools::{parse_input, schema_of, Tool, WriteGuard};
use crate::Result;

fn receipt_json(message: &str, receipt: &TxReceipt) -> Value {
    json!({
        "message": message,
        "tx_hash": receipt.hash,
        "block_number": receipt.block_number,
    })
}

/// Triggers the vault's rebalance().
pub struct RebalanceVaultTool {
    chain: Arc<ChainClient>,
    guard: WriteGuard,
}

impl RebalanceVaultTool {
    pub fn new(chain: Arc<ChainClient>, guard: WriteGuard) -> Self {
        Self { chain, guard }
    }
}

#[async_trait]
impl Tool for RebalanceVaultTool {
    fn name(&self) -> &'static str {
        super::TOOL_REBALANCE_VAULT
    }

    fn description(&self) -> &'static str {
        "Rebalances vault capital across strategies to match target weights. Operator-signed write."
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        self.guard.claim(self.name())?;
        let receipt = self.chain.rebalance().await?;
        Ok(receipt_json("Vault rebalanced", &receipt))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HarvestStrategyInput {
    /// Address of the strategy to harvest
    pub strategy: String,
}

/// Calls harvest() on a given strategy.
pub struct HarvestStrategyTool {
    chain: Arc<ChainClient>,
    guard: WriteGuard,
}

impl HarvestStrategyTool {
    pub fn new(chain: Arc<ChainClient>, guard: WriteGuard) -> Self {
        Self { chain, guard }
    }
}

#[async_trait]
impl Tool for HarvestStrategyTool {
    fn name(&self) -> &'static str {
        super::TOOL_HARVEST_STRATEGY
    }

    fn description(&self) -> &'static str {
        "Realizes accrued yield from a strategy into the vault. Operator-signed write."
    }

    fn input_schema(&self) -> Option<Value> {
        schema_of::<HarvestStrategyInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: HarvestStrategyInput = parse_input(self.name(), input)?;
        let strategy = ChainClient::parse_address(&input.strategy)?;

        self.guard.claim(self.name())?;
        let receipt = self.chain.harvest(strategy).await?;
        Ok(receipt_json("Strategy harvested", &receipt))
    }
}

/// Repays debt to reduce liquidation risk.
pub struct AutoDeleverageTool {
    chain: Arc<ChainClient>,
    guard: WriteGuard,
    steps: u64,
}

impl AutoDeleverageTool {
    pub fn new(chain: Arc<ChainClient>, guard: WriteGuard, steps: u64) -> Self {
        Self {
            chain,
            guard,
            steps,
        }
    }
}

#[async_trait]
impl Tool for AutoDeleverageTool {
    fn name(&self) -> &'static str {
        super::TOOL_AUTO_DELEVERAGE
    }

    fn description(&self) -> &'static str {
        "Repays borrowed funds on the leverage strategy to reduce LTV. Operator-signed write."
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        self.guard.claim(self.name())?;
        let receipt = self.chain.trigger_deleverage(self.steps).await?;
        Ok(receipt_json("Deleverage executed", &receipt))
    }
}

/// Accrues interest in the yield pool.
pub struct YieldGeneratorTool {
    chain: Arc<ChainClient>,
    guard: WriteGuard,
}

impl YieldGeneratorTool {
    pub fn new(chain: Arc<ChainClient>, guard: WriteGuard) -> Self {
        Self { chain, guard }
    }
}

#[async_trait]
impl Tool for YieldGeneratorTool {
    fn name(&self) -> &'static str {
        super::TOOL_YIELD_GENERATOR
    }

    fn description(&self) -> &'static str {
        "Accrues interest in the yield pool for the vault's asset. Operator-signed write."
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        self.guard.claim(self.name())?;
        let receipt = self.chain.accrue_yield().await?;
        Ok(json!({
            "message": "Yield accrued successfully",
            "tx_hash": receipt.hash,
            "block_number": receipt.block_number,
        }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ToggleStrategyPauseInput {
    /// true to pause the leverage strategy, false to resume it
    pub paused: bool,
}

/// Pauses or resumes the leverage strategy.
pub struct ToggleStrategyPauseTool {
    chain: Arc<ChainClient>,
    guard: WriteGuard,
}

impl ToggleStrategyPauseTool {
    pub fn new(chain: Arc<ChainClient>, guard: WriteGuard) -> Self {
        Self { chain, guard }
    }
}

#[async_trait]
impl Tool for ToggleStrategyPauseTool {
    fn name(&self) -> &'static str {
        super::TOOL_TOGGLE_STRATEGY_PAUSE
    }

    fn description(&self) -> &'static str {
        "Pauses or resumes the leverage strategy. Operator-signed write."
    }

    fn input_schema(&self) -> Option<Value> {
        schema_of::<ToggleStrategyPauseInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: ToggleStrategyPauseInput = parse_input(self.name(), input)?;

        self.guard.claim(self.name())?;
        let receipt = self.chain.set_leverage_paused(input.paused).await?;
        let message = if input.paused {
            "Leverage strategy paused"
        } else {
            "Leverage strategy resumed"
        };
        Ok(receipt_json(message, &receipt))
    }
}
