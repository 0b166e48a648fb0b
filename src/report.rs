//! Cycle reports and the operator channel sink
//!
//! The transport behind the operator channel is an external collaborator;
//! this module owns the report shape, its text rendering, and the sink
//! trait the monitoring service delivers through. Delivery failures are
//! the caller's problem to log and swallow; a report must never take a
//! cycle down with it.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{Error, Result};

/// Which job produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleKind {
    FullCycle,
    QuickCheck,
    YieldGeneration,
}

impl std::fmt::Display for CycleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleKind::FullCycle => write!(f, "full cycle"),
            CycleKind::QuickCheck => write!(f, "quick check"),
            CycleKind::YieldGeneration => write!(f, "yield generation"),
        }
    }
}

/// The five analysis sections of a completed full cycle.
#[derive(Debug, Clone, Serialize)]
pub struct FullCycleSections {
    pub price: String,
    pub leverage: String,
    pub risk: String,
    pub vault: String,
    pub actions: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// All gathering and decision steps ran.
    Completed(FullCycleSections),
    /// Quick-check / yield-generation single-step result.
    SingleStep { section: String },
    /// The cycle aborted; remaining steps were skipped.
    Failed { error_message: String },
}

/// One report per cycle. Built once, delivered, then discarded; the core
/// never persists reports.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub kind: CycleKind,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(flatten)]
    pub outcome: CycleOutcome,
}

impl CycleReport {
    pub fn completed(kind: CycleKind, sections: FullCycleSections, duration_ms: u64) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            duration_ms,
            outcome: CycleOutcome::Completed(sections),
        }
    }

    pub fn single_step(kind: CycleKind, section: String, duration_ms: u64) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            duration_ms,
            outcome: CycleOutcome::SingleStep { section },
        }
    }

    pub fn failed(kind: CycleKind, error_message: String, duration_ms: u64) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            duration_ms,
            outcome: CycleOutcome::Failed { error_message },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Failed { .. })
    }

    /// Render the operator-channel text.
    pub fn to_text(&self) -> String {
        let header = format!(
            "[{}] {} {} ({}ms)",
            self.timestamp.to_rfc3339(),
            self.kind,
            self.cycle_id,
            self.duration_ms
        );
        match &self.outcome {
            CycleOutcome::Completed(sections) => format!(
                "{}\nPrices: {}\nLeverage: {}\nRisk: {}\nVault: {}\nActions: {}",
                header,
                sections.price,
                sections.leverage,
                sections.risk,
                sections.vault,
                sections.actions
            ),
            CycleOutcome::SingleStep { section } => format!("{}\n{}", header, section),
            CycleOutcome::Failed { error_message } => {
                format!("{}\nCYCLE FAILED: {}", header, error_message)
            }
        }
    }
}

/// Outbound delivery to an operator channel.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, channel_id: &str, text: &str) -> Result<()>;
}

/// Sink that writes reports to the structured log. The default transport
/// when no external channel is wired up.
pub struct LogReportSink;

#[async_trait]
impl ReportSink for LogReportSink {
    async fn deliver(&self, channel_id: &str, text: &str) -> Result<()> {
        tracing::info!(channel_id, report = %text, "cycle report");
        Ok(())
    }
}

/// In-memory sink for tests.
#[derive(Clone, Default)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<(String, String)>>>,
    fail_delivery: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose deliveries always fail, for exercising the
    /// swallow-and-log path.
    pub fn failing() -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
            fail_delivery: true,
        }
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn deliver(&self, channel_id: &str, text: &str) -> Result<()> {
        if self.fail_delivery {
            return Err(Error::Report("delivery refused".to_string()));
        }
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((channel_id.to_string(), text.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_report_includes_all_sections() {
        let report = CycleReport::completed(
            CycleKind::FullCycle,
            FullCycleSections {
                price: "prices stable".to_string(),
                leverage: "ltv 0.5".to_string(),
                risk: "safe".to_string(),
                vault: "allocations on target".to_string(),
                actions: "no action".to_string(),
            },
            1234,
        );
        let text = report.to_text();
        assert!(text.contains("full cycle"));
        assert!(text.contains("prices stable"));
        assert!(text.contains("ltv 0.5"));
        assert!(text.contains("allocations on target"));
        assert!(text.contains("no action"));
        assert!(text.contains("1234ms"));
        assert!(!report.is_error());
    }

    #[test]
    fn test_failed_report_carries_the_error() {
        let report = CycleReport::failed(
            CycleKind::FullCycle,
            "Chain read failed after 3 attempts: totalAssets".to_string(),
            88,
        );
        let text = report.to_text();
        assert!(text.contains("CYCLE FAILED"));
        assert!(text.contains("totalAssets"));
        assert!(report.is_error());
    }

    #[tokio::test]
    async fn test_memory_sink_records_deliveries() {
        let sink = MemorySink::new();
        sink.deliver("vault-ops", "hello").await.unwrap();
        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "vault-ops");
    }

    #[tokio::test]
    async fn test_failing_sink_errors() {
        let sink = MemorySink::failing();
        assert!(sink.deliver("vault-ops", "hello").await.is_err());
    }
}
