//! Risk and yield-analysis tools

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::chain::{format_units, ChainClient};
use crate::risk::{self, RiskAssessment, SnapshotStore};
use crate::tools::{parse_input, schema_of, Tool};
use crate::Result;

/// Checks the leverage strategy's liquidation risk.
pub struct LiquidationRiskTool {
    chain: Arc<ChainClient>,
}

impl LiquidationRiskTool {
    pub fn new(chain: Arc<ChainClient>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Tool for LiquidationRiskTool {
    fn name(&self) -> &'static str {
        super::TOOL_CHECK_LIQUIDATION_RISK
    }

    fn description(&self) -> &'static str {
        "Computes the leverage strategy's loan-to-value ratio and risk classification."
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        let (deposited, borrowed) = self.chain.leverage_position().await?;
        let assessment = RiskAssessment::from_position(deposited, borrowed);

        Ok(json!({
            "ltv": if assessment.ltv.is_finite() { json!(assessment.ltv) } else { json!("infinite") },
            "classification": assessment.classification.to_string(),
            "safe": assessment.safe(),
            "warning": assessment.warning(),
            "critical": assessment.critical(),
            "raw": {
                "deposited": deposited.to_string(),
                "borrowed": borrowed.to_string(),
            },
            "human": {
                "deposited": format_units(deposited, 18),
                "borrowed": format_units(borrowed, 18),
            },
        }))
    }
}

/// Reports the vault APY derived from recorded TVL snapshots.
pub struct VaultApyTool {
    snapshots: SnapshotStore,
}

impl VaultApyTool {
    pub fn new(snapshots: SnapshotStore) -> Self {
        Self { snapshots }
    }
}

#[async_trait]
impl Tool for VaultApyTool {
    fn name(&self) -> &'static str {
        super::TOOL_GET_VAULT_APY
    }

    fn description(&self) -> &'static str {
        "Gets the current vault APY based on observed TVL growth."
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        let apy = self.snapshots.apy();
        Ok(serde_json::to_value(apy)?)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SimulateYieldInput {
    /// Principal as a raw fixed-point amount (base 10^18)
    pub principal: String,
    /// Annual rate, e.g. 0.05 for 5%
    pub apr: f64,
    /// Projection horizon in days
    pub days: u32,
}

/// Projects future yield using daily compound interest.
pub struct SimulateYieldTool;

#[async_trait]
impl Tool for SimulateYieldTool {
    fn name(&self) -> &'static str {
        super::TOOL_SIMULATE_YIELD
    }

    fn description(&self) -> &'static str {
        "Simulates yield for n days using compound interest. Pure projection, no chain access."
    }

    fn input_schema(&self) -> Option<Value> {
        schema_of::<SimulateYieldInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: SimulateYieldInput = parse_input(self.name(), input)?;
        let principal_raw = ChainClient::parse_amount(&input.principal)?;
        let principal: f64 = format_units(principal_raw, 18).parse().unwrap_or(0.0);

        let projection = risk::project_yield(principal, input.apr, input.days);
        Ok(serde_json::to_value(projection)?)
    }
}
