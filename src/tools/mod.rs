//! Tool implementations for the vault sentinel
//!
//! Tools are the only surface the decision strategy can act through.
//! Every tool validates its input against a schema-backed typed struct
//! before touching the chain, and every output separates raw fixed-point
//! values from human-decimal views.

pub mod management;
pub mod prices;
pub mod risk;
pub mod user_tx;
pub mod vault;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Error, Result};

pub use management::{
    AutoDeleverageTool, HarvestStrategyTool, RebalanceVaultTool, ToggleStrategyPauseTool,
    YieldGeneratorTool,
};
pub use prices::TokenPricesTool;
pub use risk::{LiquidationRiskTool, SimulateYieldTool, VaultApyTool};
pub use user_tx::{ApproveAssetTool, UserDepositTool, UserWithdrawTool};
pub use vault::{
    CheckAllowanceTool, ConvertToAssetsTool, ConvertToSharesTool, StrategyStatesTool,
    UserBalancesTool, VaultStateTool,
};

// Read tools
pub const TOOL_GET_VAULT_STATE: &str = "get_vault_state";
pub const TOOL_GET_STRATEGY_STATES: &str = "get_strategy_states";
pub const TOOL_GET_USER_BALANCES: &str = "get_user_balances";
pub const TOOL_GET_TOKEN_PRICES: &str = "get_token_prices";
pub const TOOL_CHECK_LIQUIDATION_RISK: &str = "check_liquidation_risk";
pub const TOOL_GET_VAULT_APY: &str = "get_vault_apy";
pub const TOOL_CONVERT_TO_SHARES: &str = "convert_to_shares";
pub const TOOL_CONVERT_TO_ASSETS: &str = "convert_to_assets";
pub const TOOL_CHECK_ALLOWANCE: &str = "check_allowance";
pub const TOOL_SIMULATE_YIELD: &str = "simulate_yield";

// Operator write tools
pub const TOOL_REBALANCE_VAULT: &str = "rebalance_vault";
pub const TOOL_HARVEST_STRATEGY: &str = "harvest_strategy";
pub const TOOL_AUTO_DELEVERAGE: &str = "auto_deleverage";
pub const TOOL_YIELD_GENERATOR: &str = "yield_generator";
pub const TOOL_TOGGLE_STRATEGY_PAUSE: &str = "toggle_strategy_pause";

// Unsigned-transaction tools (user-signed flows)
pub const TOOL_APPROVE_ASSET: &str = "approve_asset";
pub const TOOL_USER_DEPOSIT: &str = "user_deposit";
pub const TOOL_USER_WITHDRAW: &str = "user_withdraw";

/// A named operation the decision strategy may invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema for the input; `None` for tools that take no input.
    fn input_schema(&self) -> Option<Value> {
        None
    }

    /// Execute the tool. Implementations must deserialize (and thereby
    /// validate) their input before performing any side effect.
    async fn execute(&self, input: Value) -> Result<Value>;
}

/// Deserialize tool input into its typed form, mapping failures onto the
/// validation error so the underlying operation is never reached.
pub(crate) fn parse_input<T: DeserializeOwned>(tool: &str, input: Value) -> Result<T> {
    serde_json::from_value(input).map_err(|e| Error::Validation(format!("{}: {}", tool, e)))
}

/// Render a typed input's JSON schema.
pub(crate) fn schema_of<T: schemars::JsonSchema>() -> Option<Value> {
    serde_json::to_value(schemars::schema_for!(T)).ok()
}

/// Named lookup over the tool set, with subsets for per-step exposure.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Duplicate names are a wiring bug.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name();
        if self.tools.contains_key(name) {
            return Err(Error::InvalidArgument(format!(
                "tool '{}' registered twice",
                name
            )));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// One line per tool, for prompt assembly.
    pub fn describe(&self) -> String {
        self.tools
            .values()
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// A registry containing only the named tools. Unknown names are
    /// skipped; step wiring is tested separately.
    pub fn subset(&self, names: &[&str]) -> ToolRegistry {
        let mut subset = ToolRegistry::new();
        for name in names {
            if let Some(tool) = self.tools.get(name) {
                subset.tools.insert(tool.name(), tool.clone());
            }
        }
        subset
    }

    /// Validate and execute a tool by name.
    pub async fn invoke(&self, name: &str, input: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown tool '{}'", name)))?;
        tool.execute(input).await
    }
}

/// Per-cycle guard for write tools.
///
/// A write tool executes at most once per intended action per cycle; the
/// monitoring service resets the guard when a new cycle begins.
#[derive(Clone, Default)]
pub struct WriteGuard {
    fired: Arc<std::sync::Mutex<HashSet<String>>>,
}

impl WriteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an action slot for this cycle. Fails if the action already
    /// ran, before any side effect happens.
    pub fn claim(&self, action: &str) -> Result<()> {
        let Ok(mut fired) = self.fired.lock() else {
            return Err(Error::Validation("write guard lock poisoned".to_string()));
        };
        if !fired.insert(action.to_string()) {
            return Err(Error::Validation(format!(
                "write tool '{}' already executed this cycle",
                action
            )));
        }
        Ok(())
    }

    /// Forget this cycle's claims. Called at cycle start.
    pub fn reset(&self) {
        if let Ok(mut fired) = self.fired.lock() {
            fired.clear();
        }
    }
}
