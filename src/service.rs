//! Monitoring service
//!
//! Owns the lifecycle of the three periodic jobs and sequences each full
//! cycle through its gathering and decision steps. Every step is one
//! `DecisionStrategy::ask` built from a fixed prompt template plus the
//! tool subset that step is allowed to touch. A step failure skips the
//! rest of the cycle, dispatches a best-effort error report, and leaves
//! the service ready for the next firing. A failed cycle never blocks
//! future ones.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::FutureExt;
use tracing::{info, warn};

use crate::chain::ChainClient;
use crate::config::Config;
use crate::price::{PriceFeedClient, PriceQuote};
use crate::report::{CycleKind, CycleReport, FullCycleSections, ReportSink};
use crate::risk::SnapshotStore;
use crate::scheduler::Scheduler;
use crate::strategy::DecisionStrategy;
use crate::tools::{
    self, ApproveAssetTool, AutoDeleverageTool, CheckAllowanceTool, ConvertToAssetsTool,
    ConvertToSharesTool, HarvestStrategyTool, LiquidationRiskTool, RebalanceVaultTool,
    SimulateYieldTool, StrategyStatesTool, TokenPricesTool, ToggleStrategyPauseTool, Tool,
    ToolRegistry, UserBalancesTool, UserDepositTool, UserWithdrawTool, VaultApyTool,
    VaultStateTool, WriteGuard, YieldGeneratorTool,
};
use crate::Result;

pub const JOB_FULL_CYCLE: &str = "full_cycle";
pub const JOB_QUICK_CHECK: &str = "quick_check";
pub const JOB_YIELD_GENERATION: &str = "yield_generation";

/// A quick-check price move beyond this flags for immediate review.
const QUICK_CHECK_FLAG_PERCENT: f64 = 15.0;

/// The steps of a full monitoring cycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    Price,
    Leverage,
    Risk,
    Vault,
    Decide,
}

impl CycleStep {
    fn prompt(self) -> &'static str {
        match self {
            CycleStep::Price => {
                "Check real asset prices using get_token_prices. Analyze price movements \
                 and volatility. If prices have changed significantly (>10%) or are \
                 volatile, note this for leverage strategy decisions."
            }
            CycleStep::Leverage => {
                "Check the leverage strategy state using get_strategy_states. Review \
                 deposited and borrowed amounts and leverage exposure. Assess if the \
                 strategy is at risk or needs adjustment."
            }
            CycleStep::Risk => {
                "Check liquidation risk using check_liquidation_risk. If LTV is above \
                 70% or critical, recommend deleveraging or pausing the strategy."
            }
            CycleStep::Vault => {
                "Check vault state using get_vault_state and strategy states using \
                 get_strategy_states. Compare current allocations vs target weights. \
                 Determine if rebalancing is needed."
            }
            CycleStep::Decide => {
                "Based on all the data you've gathered:\n\
                 1. If prices are volatile or dropping rapidly, consider pausing the \
                 leverage strategy (toggle_strategy_pause).\n\
                 2. If LTV is high (>70%) or liquidation risk is critical, execute \
                 auto_deleverage to reduce risk, or pause the leverage strategy.\n\
                 3. If current allocations diverge from target weights, call \
                 rebalance_vault to execute the reallocation.\n\
                 4. Check if harvest is needed (harvest_strategy).\n\
                 Take appropriate actions based on the current market conditions and \
                 risk levels. Explain your reasoning for each action."
            }
        }
    }

    fn tool_names(self) -> &'static [&'static str] {
        match self {
            CycleStep::Price => &[tools::TOOL_GET_TOKEN_PRICES],
            CycleStep::Leverage => &[tools::TOOL_GET_STRATEGY_STATES],
            CycleStep::Risk => &[tools::TOOL_CHECK_LIQUIDATION_RISK],
            CycleStep::Vault => &[
                tools::TOOL_GET_VAULT_STATE,
                tools::TOOL_GET_STRATEGY_STATES,
                tools::TOOL_GET_VAULT_APY,
            ],
            CycleStep::Decide => &[
                tools::TOOL_GET_TOKEN_PRICES,
                tools::TOOL_GET_VAULT_STATE,
                tools::TOOL_GET_STRATEGY_STATES,
                tools::TOOL_CHECK_LIQUIDATION_RISK,
                tools::TOOL_GET_VAULT_APY,
                tools::TOOL_SIMULATE_YIELD,
                tools::TOOL_REBALANCE_VAULT,
                tools::TOOL_HARVEST_STRATEGY,
                tools::TOOL_AUTO_DELEVERAGE,
                tools::TOOL_TOGGLE_STRATEGY_PAUSE,
            ],
        }
    }
}

impl std::fmt::Display for CycleStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleStep::Price => write!(f, "gathering prices"),
            CycleStep::Leverage => write!(f, "gathering leverage state"),
            CycleStep::Risk => write!(f, "gathering risk assessment"),
            CycleStep::Vault => write!(f, "gathering vault state"),
            CycleStep::Decide => write!(f, "deciding"),
        }
    }
}

/// Last-seen prices, owned by the service instance. Replaces any notion
/// of process-global price trackers.
#[derive(Clone, Default)]
pub struct PriceTracker {
    last: Arc<Mutex<HashMap<String, f64>>>,
}

/// Observed change for one asset between checks.
#[derive(Debug, Clone)]
pub struct PriceDelta {
    pub asset_id: String,
    pub current: f64,
    /// Percent change since the previous observation, once one exists
    pub change_percent: Option<f64>,
}

impl PriceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the quotes and return each asset's move since last time.
    pub fn observe(&self, quotes: &[PriceQuote]) -> Vec<PriceDelta> {
        let Ok(mut last) = self.last.lock() else {
            return Vec::new();
        };
        quotes
            .iter()
            .map(|quote| {
                let previous = last.insert(quote.asset_id.clone(), quote.usd);
                let change_percent = previous
                    .filter(|p| *p > 0.0)
                    .map(|p| (quote.usd - p) / p * 100.0);
                PriceDelta {
                    asset_id: quote.asset_id.clone(),
                    current: quote.usd,
                    change_percent,
                }
            })
            .collect()
    }
}

/// Sequences monitoring cycles and dispatches their reports.
pub struct MonitoringService {
    config: Config,
    chain: Arc<ChainClient>,
    feed: PriceFeedClient,
    strategy: Arc<dyn DecisionStrategy>,
    sink: Arc<dyn ReportSink>,
    snapshots: SnapshotStore,
    prices: PriceTracker,
}

impl MonitoringService {
    pub fn new(
        config: Config,
        chain: Arc<ChainClient>,
        strategy: Arc<dyn DecisionStrategy>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        let feed = PriceFeedClient::new(config.price_feed.base_url.clone());
        Self {
            config,
            chain,
            feed,
            strategy,
            sink,
            snapshots: SnapshotStore::new(),
            prices: PriceTracker::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Build the full tool set against a fresh per-cycle write guard.
    pub fn build_registry(&self, guard: &WriteGuard) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        let chain = &self.chain;

        let all: Vec<Arc<dyn Tool>> = vec![
            Arc::new(VaultStateTool::new(chain.clone(), self.snapshots.clone())),
            Arc::new(StrategyStatesTool::new(chain.clone())),
            Arc::new(UserBalancesTool::new(chain.clone())),
            Arc::new(ConvertToSharesTool::new(chain.clone())),
            Arc::new(ConvertToAssetsTool::new(chain.clone())),
            Arc::new(CheckAllowanceTool::new(chain.clone())),
            Arc::new(LiquidationRiskTool::new(chain.clone())),
            Arc::new(VaultApyTool::new(self.snapshots.clone())),
            Arc::new(SimulateYieldTool),
            Arc::new(TokenPricesTool::new(
                self.feed.clone(),
                self.config.price_feed.assets.clone(),
            )),
            Arc::new(RebalanceVaultTool::new(chain.clone(), guard.clone())),
            Arc::new(HarvestStrategyTool::new(chain.clone(), guard.clone())),
            Arc::new(AutoDeleverageTool::new(
                chain.clone(),
                guard.clone(),
                self.config.risk.deleverage_steps,
            )),
            Arc::new(YieldGeneratorTool::new(chain.clone(), guard.clone())),
            Arc::new(ToggleStrategyPauseTool::new(chain.clone(), guard.clone())),
            Arc::new(ApproveAssetTool::new(chain.clone())),
            Arc::new(UserDepositTool::new(chain.clone())),
            Arc::new(UserWithdrawTool::new(chain.clone())),
        ];
        for tool in all {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Build the scheduler with the three monitoring jobs attached.
    pub fn build_scheduler(self: &Arc<Self>) -> Result<Scheduler> {
        let mut scheduler = Scheduler::new();

        let svc = self.clone();
        scheduler.add_job(
            JOB_FULL_CYCLE,
            &self.config.schedule.full_cycle,
            Arc::new(move || {
                let svc = svc.clone();
                async move { svc.run_full_cycle().await.map(|_| ()) }.boxed()
            }),
        )?;

        let svc = self.clone();
        scheduler.add_job(
            JOB_QUICK_CHECK,
            &self.config.schedule.quick_check,
            Arc::new(move || {
                let svc = svc.clone();
                async move { svc.run_quick_check().await.map(|_| ()) }.boxed()
            }),
        )?;

        let svc = self.clone();
        scheduler.add_job(
            JOB_YIELD_GENERATION,
            &self.config.schedule.yield_generation,
            Arc::new(move || {
                let svc = svc.clone();
                async move { svc.run_yield_generation().await.map(|_| ()) }.boxed()
            }),
        )?;

        Ok(scheduler)
    }

    /// Run one comprehensive monitoring cycle.
    ///
    /// On failure the error report has already been dispatched; the typed
    /// error propagates so the scheduler's isolation wrapper sees it too.
    pub async fn run_full_cycle(&self) -> Result<CycleReport> {
        let started = Instant::now();
        info!("starting monitoring cycle");

        let result = self.execute_full_cycle().await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(sections) => {
                let report = CycleReport::completed(CycleKind::FullCycle, sections, duration_ms);
                self.dispatch(&report).await;
                info!(duration_ms, "monitoring cycle completed");
                Ok(report)
            }
            Err(e) => {
                let report =
                    CycleReport::failed(CycleKind::FullCycle, e.to_string(), duration_ms);
                self.dispatch(&report).await;
                Err(e)
            }
        }
    }

    async fn execute_full_cycle(&self) -> Result<FullCycleSections> {
        // Fresh guard per cycle: each write tool fires at most once within it.
        let guard = WriteGuard::new();
        let registry = self.build_registry(&guard)?;

        // Gathering steps run strictly in sequence; later prompts assume
        // earlier context exists.
        let price = self.ask_step(&registry, CycleStep::Price).await?;
        let leverage = self.ask_step(&registry, CycleStep::Leverage).await?;
        let risk = self.ask_step(&registry, CycleStep::Risk).await?;
        let vault = self.ask_step(&registry, CycleStep::Vault).await?;
        let actions = self.ask_step(&registry, CycleStep::Decide).await?;

        Ok(FullCycleSections {
            price,
            leverage,
            risk,
            vault,
            actions,
        })
    }

    async fn ask_step(&self, registry: &ToolRegistry, step: CycleStep) -> Result<String> {
        info!(step = %step, "cycle step");
        let subset = registry.subset(step.tool_names());
        self.strategy.ask(step.prompt(), &subset).await
    }

    /// Run one quick price check.
    pub async fn run_quick_check(&self) -> Result<CycleReport> {
        let started = Instant::now();

        let result = self.execute_quick_check().await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(section) => {
                let report =
                    CycleReport::single_step(CycleKind::QuickCheck, section, duration_ms);
                self.dispatch(&report).await;
                Ok(report)
            }
            Err(e) => {
                let report =
                    CycleReport::failed(CycleKind::QuickCheck, e.to_string(), duration_ms);
                self.dispatch(&report).await;
                Err(e)
            }
        }
    }

    async fn execute_quick_check(&self) -> Result<String> {
        let quotes = self.feed.get_prices(&self.config.price_feed.assets).await?;
        let deltas = self.prices.observe(&quotes);

        let flagged: Vec<&PriceDelta> = deltas
            .iter()
            .filter(|d| {
                d.change_percent
                    .map(|c| c.abs() >= QUICK_CHECK_FLAG_PERCENT)
                    .unwrap_or(false)
            })
            .collect();

        let price_lines: Vec<String> = deltas
            .iter()
            .map(|d| match d.change_percent {
                Some(change) => {
                    format!("{}: ${:.2} ({:+.2}% since last check)", d.asset_id, d.current, change)
                }
                None => format!("{}: ${:.2} (first observation)", d.asset_id, d.current),
            })
            .collect();

        let prompt = format!(
            "Quick check: current prices:\n{}\nIf any price moved more than {}% since \
             the last check, flag it for immediate review.",
            price_lines.join("\n"),
            QUICK_CHECK_FLAG_PERCENT
        );

        let guard = WriteGuard::new();
        let registry = self.build_registry(&guard)?;
        let subset = registry.subset(&[tools::TOOL_GET_TOKEN_PRICES]);
        let analysis = self.strategy.ask(&prompt, &subset).await?;

        let mut section = price_lines.join("; ");
        if !flagged.is_empty() {
            let names: Vec<&str> = flagged.iter().map(|d| d.asset_id.as_str()).collect();
            warn!(assets = ?names, "price moved beyond quick-check bound");
            section = format!(
                "FLAGGED FOR IMMEDIATE REVIEW ({}); {}",
                names.join(", "),
                section
            );
        }
        Ok(format!("{} | analysis: {}", section, analysis))
    }

    /// Run one yield-generation step.
    pub async fn run_yield_generation(&self) -> Result<CycleReport> {
        let started = Instant::now();

        let result = self.execute_yield_generation().await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(section) => {
                let report =
                    CycleReport::single_step(CycleKind::YieldGeneration, section, duration_ms);
                self.dispatch(&report).await;
                Ok(report)
            }
            Err(e) => {
                let report =
                    CycleReport::failed(CycleKind::YieldGeneration, e.to_string(), duration_ms);
                self.dispatch(&report).await;
                Err(e)
            }
        }
    }

    async fn execute_yield_generation(&self) -> Result<String> {
        let guard = WriteGuard::new();
        let registry = self.build_registry(&guard)?;
        let subset = registry.subset(&[tools::TOOL_YIELD_GENERATOR]);
        self.strategy
            .ask(
                "Use yield_generator to accrue interest to the pool, generating profits \
                 for the vault.",
                &subset,
            )
            .await
    }

    /// Best-effort delivery. Failures are logged and swallowed, never
    /// retried, and never allowed back into the cycle.
    async fn dispatch(&self, report: &CycleReport) {
        let text = report.to_text();
        if let Err(e) = self
            .sink
            .deliver(&self.config.report.channel_id, &text)
            .await
        {
            warn!(error = %e, cycle_id = %report.cycle_id, "report delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContractsConfig, RpcConfig};
    use crate::report::MemorySink;
    use crate::Error;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap as StdHashMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Strategy double that records prompts and can fail on the Nth call.
    struct ScriptedStrategy {
        calls: Arc<Mutex<Vec<String>>>,
        fail_on_call: Option<usize>,
    }

    impl ScriptedStrategy {
        fn new(fail_on_call: Option<usize>) -> (Self, Arc<Mutex<Vec<String>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    calls: calls.clone(),
                    fail_on_call,
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl DecisionStrategy for ScriptedStrategy {
        async fn ask(&self, prompt: &str, _tools: &ToolRegistry) -> Result<String> {
            let call_index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(prompt.to_string());
                calls.len()
            };
            if self.fail_on_call == Some(call_index) {
                return Err(Error::ChainRead {
                    attempts: 3,
                    message: "rpc down".to_string(),
                });
            }
            Ok(format!("analysis for call {}", call_index))
        }
    }

    fn test_config(feed_url: &str) -> Config {
        let mut config = Config::default();
        config.contracts = ContractsConfig {
            vault: "0x0000000000000000000000000000000000000001".to_string(),
            leverage_strategy: "0x0000000000000000000000000000000000000002".to_string(),
            aave_strategy: "0x0000000000000000000000000000000000000003".to_string(),
            router: "0x0000000000000000000000000000000000000004".to_string(),
            yield_pool: "0x0000000000000000000000000000000000000005".to_string(),
            asset_token: "0x0000000000000000000000000000000000000006".to_string(),
            chain_id: 31337,
        };
        config.price_feed.base_url = feed_url.to_string();
        config.price_feed.assets = vec!["chainlink".to_string()];
        config
    }

    fn test_service(
        config: Config,
        strategy: Arc<dyn DecisionStrategy>,
        sink: Arc<dyn ReportSink>,
    ) -> Arc<MonitoringService> {
        let mut urls = StdHashMap::new();
        urls.insert(31337, "http://localhost:8545".to_string());
        let chain = Arc::new(
            ChainClient::connect(&config.contracts, &RpcConfig::with_urls(urls)).unwrap(),
        );
        Arc::new(MonitoringService::new(config, chain, strategy, sink))
    }

    #[tokio::test]
    async fn test_full_cycle_runs_all_five_steps_in_order() {
        let (strategy, calls) = ScriptedStrategy::new(None);
        let sink = MemorySink::new();
        let service = test_service(
            test_config("http://unused"),
            Arc::new(strategy),
            Arc::new(sink.clone()),
        );

        let report = service.run_full_cycle().await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 5);
        assert!(calls[0].contains("get_token_prices"));
        assert!(calls[1].contains("get_strategy_states"));
        assert!(calls[2].contains("check_liquidation_risk"));
        assert!(calls[3].contains("get_vault_state"));
        assert!(calls[4].contains("Take appropriate actions"));

        assert!(!report.is_error());
        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.contains("analysis for call 5"));
    }

    #[tokio::test]
    async fn test_step_failure_skips_remaining_steps_and_reports_error() {
        // fail at step 2 (leverage gathering)
        let (strategy, calls) = ScriptedStrategy::new(Some(2));
        let sink = MemorySink::new();
        let service = test_service(
            test_config("http://unused"),
            Arc::new(strategy),
            Arc::new(sink.clone()),
        );

        let result = service.run_full_cycle().await;
        assert!(matches!(result, Err(Error::ChainRead { .. })));

        // steps 3-5 never ran
        assert_eq!(calls.lock().unwrap().len(), 2);

        // an error report, not a partial success report
        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.contains("CYCLE FAILED"));
        assert!(messages[0].1.contains("rpc down"));
        assert!(!messages[0].1.contains("analysis for call"));
    }

    #[tokio::test]
    async fn test_failed_cycle_does_not_block_the_next_one() {
        let (strategy, _) = ScriptedStrategy::new(Some(1));
        let sink = MemorySink::new();
        let service = test_service(
            test_config("http://unused"),
            Arc::new(strategy),
            Arc::new(sink.clone()),
        );

        assert!(service.run_full_cycle().await.is_err());
        // the same service instance accepts the next trigger; call 6 of the
        // scripted strategy succeeds so this cycle completes
        let report = service.run_full_cycle().await.unwrap();
        assert!(!report.is_error());
        assert_eq!(sink.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_report_delivery_failure_is_swallowed() {
        let (strategy, _) = ScriptedStrategy::new(None);
        let sink = MemorySink::failing();
        let service = test_service(
            test_config("http://unused"),
            Arc::new(strategy),
            Arc::new(sink),
        );

        // the cycle itself still succeeds
        let report = service.run_full_cycle().await.unwrap();
        assert!(!report.is_error());
    }

    #[tokio::test]
    async fn test_quick_check_flags_large_moves() {
        let mock_server = MockServer::start().await;
        // first observation at $100, second at $120 (+20%)
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chainlink": { "usd": 100.0 }
            })))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chainlink": { "usd": 120.0 }
            })))
            .mount(&mock_server)
            .await;

        let (strategy, _) = ScriptedStrategy::new(None);
        let sink = MemorySink::new();
        let service = test_service(
            test_config(&mock_server.uri()),
            Arc::new(strategy),
            Arc::new(sink.clone()),
        );

        let first = service.run_quick_check().await.unwrap();
        assert!(!first.to_text().contains("FLAGGED"));

        let second = service.run_quick_check().await.unwrap();
        assert!(second.to_text().contains("FLAGGED FOR IMMEDIATE REVIEW"));
        assert!(second.to_text().contains("chainlink"));
    }

    #[tokio::test]
    async fn test_quick_check_zero_price_reports_feed_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chainlink": { "usd": 0 }
            })))
            .mount(&mock_server)
            .await;

        let (strategy, calls) = ScriptedStrategy::new(None);
        let sink = MemorySink::new();
        let service = test_service(
            test_config(&mock_server.uri()),
            Arc::new(strategy),
            Arc::new(sink.clone()),
        );

        let result = service.run_quick_check().await;
        assert!(matches!(result, Err(Error::PriceFeed(_))));

        // the strategy was never consulted with a fabricated price
        assert_eq!(calls.lock().unwrap().len(), 0);
        // and the error report never presents zero as a price
        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.contains("CYCLE FAILED"));
        assert!(!messages[0].1.contains("$0.00"));
    }

    #[tokio::test]
    async fn test_yield_generation_reports_single_step() {
        let (strategy, calls) = ScriptedStrategy::new(None);
        let sink = MemorySink::new();
        let service = test_service(
            test_config("http://unused"),
            Arc::new(strategy),
            Arc::new(sink.clone()),
        );

        let report = service.run_yield_generation().await.unwrap();
        assert!(!report.is_error());
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert!(calls.lock().unwrap()[0].contains("yield_generator"));
        assert_eq!(sink.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_build_scheduler_registers_three_jobs() {
        let (strategy, _) = ScriptedStrategy::new(None);
        let service = test_service(
            test_config("http://unused"),
            Arc::new(strategy),
            Arc::new(MemorySink::new()),
        );

        let scheduler = service.build_scheduler().unwrap();
        assert!(scheduler.job_status(JOB_FULL_CYCLE).is_some());
        assert!(scheduler.job_status(JOB_QUICK_CHECK).is_some());
        assert!(scheduler.job_status(JOB_YIELD_GENERATION).is_some());

        scheduler.start();
        assert_eq!(scheduler.timer_count(), 3);
        scheduler.start();
        assert_eq!(scheduler.timer_count(), 3);
        scheduler.stop();
        assert_eq!(scheduler.timer_count(), 0);
    }

    #[test]
    fn test_price_tracker_reports_change_after_first_observation() {
        let tracker = PriceTracker::new();
        let quote = |usd: f64| PriceQuote {
            asset_id: "chainlink".to_string(),
            usd,
            usd_24h_change: None,
            fetched_at: Utc::now(),
        };

        let first = tracker.observe(&[quote(100.0)]);
        assert_eq!(first.len(), 1);
        assert!(first[0].change_percent.is_none());

        let second = tracker.observe(&[quote(85.0)]);
        let change = second[0].change_percent.unwrap();
        assert!((change + 15.0).abs() < 1e-9);
    }
}
