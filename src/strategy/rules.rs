//! Deterministic rule-table strategy
//!
//! Applies a fixed decision table to tool-observed state. Given the same
//! risk, vault, and price inputs it always chooses the same action
//! category, which makes it the default backend for tests and for
//! operators who want no model in the write path.
//!
//! Priority order:
//! 1. LTV at or above the critical band → deleverage
//! 2. Volatile prices (24h move beyond the configured bound) → pause strategy
//! 3. Allocation divergence beyond tolerance → rebalance
//! 4. Accrued yield above threshold → harvest
//! 5. Otherwise → no action

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::RiskConfig;
use crate::strategy::{ActionCategory, DecisionStrategy};
use crate::tools::{self, ToolRegistry};
use crate::Result;

/// What the strategy could observe through the offered tool subset.
#[derive(Debug, Clone, Default)]
pub struct Observations {
    /// LTV ratio; infinite when collateral is zero
    pub ltv: Option<f64>,
    pub ltv_critical: bool,
    /// Largest absolute 24h price move seen (percent)
    pub max_price_move: Option<f64>,
    /// Divergence of the leverage share from its target (percent points)
    pub allocation_divergence: Option<f64>,
    /// Strategy-held capital not yet reflected in vault accounting (units)
    pub accrued_yield: Option<f64>,
}

impl Observations {
    fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ltv) = self.ltv {
            if ltv.is_finite() {
                parts.push(format!("LTV {:.4}", ltv));
            } else {
                parts.push("LTV infinite (zero collateral)".to_string());
            }
            if self.ltv_critical {
                parts.push("liquidation risk CRITICAL".to_string());
            }
        }
        if let Some(change) = self.max_price_move {
            parts.push(format!("max 24h price move {:.2}%", change));
        }
        if let Some(divergence) = self.allocation_divergence {
            parts.push(format!("allocation divergence {:.2}pp", divergence));
        }
        if let Some(accrued) = self.accrued_yield {
            parts.push(format!("accrued yield {:.4} units", accrued));
        }
        if parts.is_empty() {
            "no observations available from the offered tools".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Deterministic decision backend.
pub struct RuleTableStrategy {
    risk: RiskConfig,
    /// Harvest target (the yield-bearing strategy's address)
    harvest_strategy: String,
}

impl RuleTableStrategy {
    pub fn new(risk: RiskConfig, harvest_strategy: impl Into<String>) -> Self {
        Self {
            risk,
            harvest_strategy: harvest_strategy.into(),
        }
    }

    /// Pure decision table over observations.
    pub fn choose_action(&self, obs: &Observations) -> ActionCategory {
        if obs.ltv_critical {
            return ActionCategory::Deleverage;
        }
        if let Some(change) = obs.max_price_move {
            if change.abs() >= self.risk.volatility_percent {
                return ActionCategory::PauseStrategy;
            }
        }
        if let Some(divergence) = obs.allocation_divergence {
            if divergence > self.risk.rebalance_tolerance_percent {
                return ActionCategory::Rebalance;
            }
        }
        if let Some(accrued) = obs.accrued_yield {
            if accrued > self.risk.harvest_threshold {
                return ActionCategory::Harvest;
            }
        }
        ActionCategory::NoAction
    }

    /// Gather whatever the offered tool subset allows.
    async fn observe(&self, tools: &ToolRegistry) -> Result<Observations> {
        let mut obs = Observations::default();

        if tools.get(tools::TOOL_CHECK_LIQUIDATION_RISK).is_some() {
            let risk = tools
                .invoke(tools::TOOL_CHECK_LIQUIDATION_RISK, json!({}))
                .await?;
            obs.ltv = match &risk["ltv"] {
                Value::Number(n) => n.as_f64(),
                Value::String(_) => Some(f64::INFINITY),
                _ => None,
            };
            obs.ltv_critical = risk["critical"].as_bool().unwrap_or(false);
        }

        if tools.get(tools::TOOL_GET_TOKEN_PRICES).is_some() {
            let prices = tools.invoke(tools::TOOL_GET_TOKEN_PRICES, json!({})).await?;
            let max_move = prices["quotes"]
                .as_array()
                .map(|quotes| {
                    quotes
                        .iter()
                        .filter_map(|q| q["usd_24h_change"].as_f64())
                        .fold(0.0_f64, |acc, c| acc.max(c.abs()))
                })
                .unwrap_or(0.0);
            obs.max_price_move = Some(max_move);
        }

        let has_vault = tools.get(tools::TOOL_GET_VAULT_STATE).is_some();
        let has_strategies = tools.get(tools::TOOL_GET_STRATEGY_STATES).is_some();
        if has_vault && has_strategies {
            let vault = tools.invoke(tools::TOOL_GET_VAULT_STATE, json!({})).await?;
            let strategies = tools
                .invoke(tools::TOOL_GET_STRATEGY_STATES, json!({}))
                .await?;

            let total_managed = raw_units(&vault["raw"]["total_managed_assets"]);
            let deposited = strategy_field(&strategies, "leverage", "deposited");
            let pool_balance = strategy_field(&strategies, "aave", "pool_balance");

            let total = deposited + pool_balance;
            if total > 0.0 {
                let share = deposited / total * 100.0;
                obs.allocation_divergence =
                    Some((share - self.risk.target_leverage_share_percent).abs());
            }
            obs.accrued_yield = Some(total - total_managed);
        }

        debug!(?obs, "rule table observations");
        Ok(obs)
    }

    /// Execute the chosen action through the offered write tools.
    async fn act(&self, action: ActionCategory, tools: &ToolRegistry) -> Result<String> {
        let invocation = match action {
            ActionCategory::Deleverage => Some((tools::TOOL_AUTO_DELEVERAGE, json!({}))),
            ActionCategory::PauseStrategy => Some((
                tools::TOOL_TOGGLE_STRATEGY_PAUSE,
                json!({ "paused": true }),
            )),
            ActionCategory::Rebalance => Some((tools::TOOL_REBALANCE_VAULT, json!({}))),
            ActionCategory::Harvest => Some((
                tools::TOOL_HARVEST_STRATEGY,
                json!({ "strategy": self.harvest_strategy }),
            )),
            ActionCategory::NoAction => None,
        };

        match invocation {
            Some((tool, input)) if tools.get(tool).is_some() => {
                let outcome = tools.invoke(tool, input).await?;
                info!(action = %action, "rule table executed action");
                Ok(format!(
                    "action: {} - executed via {}: {}",
                    action, tool, outcome
                ))
            }
            Some((tool, _)) => Ok(format!(
                "action: {} - recommended, but tool '{}' was not offered",
                action, tool
            )),
            None => Ok("action: no action - all metrics within bounds".to_string()),
        }
    }

    fn has_write_tools(tools: &ToolRegistry) -> bool {
        [
            tools::TOOL_AUTO_DELEVERAGE,
            tools::TOOL_TOGGLE_STRATEGY_PAUSE,
            tools::TOOL_REBALANCE_VAULT,
            tools::TOOL_HARVEST_STRATEGY,
        ]
        .iter()
        .any(|name| tools.get(name).is_some())
    }
}

/// Parse a raw fixed-point decimal string into whole units.
fn raw_units(value: &Value) -> f64 {
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
        / 1e18
}

fn strategy_field(strategies: &Value, id: &str, field: &str) -> f64 {
    strategies["strategies"]
        .as_array()
        .and_then(|list| list.iter().find(|s| s["strategy_id"] == id))
        .map(|s| raw_units(&s["raw"][field]))
        .unwrap_or(0.0)
}

#[async_trait]
impl DecisionStrategy for RuleTableStrategy {
    async fn ask(&self, prompt: &str, tools: &ToolRegistry) -> Result<String> {
        debug!(prompt_len = prompt.len(), tools = ?tools.names(), "rule table ask");

        // Yield generation is unconditional: when the accrual tool is the
        // offered surface, accrue.
        if tools.get(tools::TOOL_YIELD_GENERATOR).is_some() {
            let outcome = tools.invoke(tools::TOOL_YIELD_GENERATOR, json!({})).await?;
            return Ok(format!("yield accrued: {}", outcome));
        }

        let obs = self.observe(tools).await?;

        if Self::has_write_tools(tools) {
            let action = self.choose_action(&obs);
            let outcome = self.act(action, tools).await?;
            Ok(format!("{} ({})", outcome, obs.summary()))
        } else {
            Ok(obs.summary())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn strategy() -> RuleTableStrategy {
        RuleTableStrategy::new(
            RiskConfig::default(),
            "0x0000000000000000000000000000000000000003",
        )
    }

    #[test]
    fn test_rule_table_priority() {
        let s = strategy();

        let critical = Observations {
            ltv: Some(0.85),
            ltv_critical: true,
            max_price_move: Some(20.0),
            allocation_divergence: Some(30.0),
            accrued_yield: Some(10.0),
        };
        assert_eq!(s.choose_action(&critical), ActionCategory::Deleverage);

        let volatile = Observations {
            ltv: Some(0.5),
            max_price_move: Some(12.0),
            ..Default::default()
        };
        assert_eq!(s.choose_action(&volatile), ActionCategory::PauseStrategy);

        let diverged = Observations {
            max_price_move: Some(1.0),
            allocation_divergence: Some(8.0),
            ..Default::default()
        };
        assert_eq!(s.choose_action(&diverged), ActionCategory::Rebalance);

        let yielding = Observations {
            accrued_yield: Some(5.0),
            ..Default::default()
        };
        assert_eq!(s.choose_action(&yielding), ActionCategory::Harvest);

        assert_eq!(
            s.choose_action(&Observations::default()),
            ActionCategory::NoAction
        );
    }

    #[test]
    fn test_rule_table_is_deterministic() {
        let s = strategy();
        let obs = Observations {
            ltv: Some(0.75),
            allocation_divergence: Some(8.0),
            ..Default::default()
        };
        let first = s.choose_action(&obs);
        for _ in 0..10 {
            assert_eq!(s.choose_action(&obs), first);
        }
    }

    /// Canned-risk tool plus a counting write tool, to drive `ask` offline.
    struct FakeRiskTool {
        critical: bool,
    }

    #[async_trait]
    impl Tool for FakeRiskTool {
        fn name(&self) -> &'static str {
            tools::TOOL_CHECK_LIQUIDATION_RISK
        }

        fn description(&self) -> &'static str {
            "canned risk"
        }

        async fn execute(&self, _input: Value) -> Result<Value> {
            Ok(json!({
                "ltv": if self.critical { 0.9 } else { 0.3 },
                "critical": self.critical,
            }))
        }
    }

    struct CountingDeleverageTool {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Tool for CountingDeleverageTool {
        fn name(&self) -> &'static str {
            tools::TOOL_AUTO_DELEVERAGE
        }

        fn description(&self) -> &'static str {
            "counting deleverage"
        }

        async fn execute(&self, _input: Value) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "message": "ok" }))
        }
    }

    #[tokio::test]
    async fn test_ask_executes_deleverage_when_critical() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(FakeRiskTool { critical: true }))
            .unwrap();
        registry
            .register(Arc::new(CountingDeleverageTool {
                calls: calls.clone(),
            }))
            .unwrap();

        let response = strategy().ask("decide", &registry).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(response.contains("deleverage"));
    }

    #[tokio::test]
    async fn test_ask_without_write_tools_only_analyzes() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(FakeRiskTool { critical: true }))
            .unwrap();

        let response = strategy().ask("analyze", &registry).await.unwrap();
        assert!(response.contains("CRITICAL"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ask_safe_position_takes_no_action() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(FakeRiskTool { critical: false }))
            .unwrap();
        registry
            .register(Arc::new(CountingDeleverageTool {
                calls: calls.clone(),
            }))
            .unwrap();

        let response = strategy().ask("decide", &registry).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(response.contains("no action"));
    }
}
