//! Decision strategy abstraction
//!
//! The reasoning backend that picks corrective actions is an external
//! collaborator; the monitoring service depends only on this trait. The
//! in-crate `RuleTableStrategy` is the deterministic default, which keeps
//! every cycle verifiable without a live reasoning engine.

pub mod rules;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::tools::ToolRegistry;
use crate::Result;

pub use rules::RuleTableStrategy;

/// The action categories a decision can land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Deleverage,
    PauseStrategy,
    Rebalance,
    Harvest,
    NoAction,
}

impl std::fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionCategory::Deleverage => write!(f, "deleverage"),
            ActionCategory::PauseStrategy => write!(f, "pause strategy"),
            ActionCategory::Rebalance => write!(f, "rebalance"),
            ActionCategory::Harvest => write!(f, "harvest"),
            ActionCategory::NoAction => write!(f, "no action"),
        }
    }
}

/// A pluggable decision backend.
///
/// `ask` is synchronous from the caller's perspective: the strategy may
/// invoke zero or more of the offered tools before returning its analysis.
#[async_trait]
pub trait DecisionStrategy: Send + Sync {
    async fn ask(&self, prompt: &str, tools: &ToolRegistry) -> Result<String>;
}
