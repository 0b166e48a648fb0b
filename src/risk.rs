//! Risk engine: pure functions over on-chain snapshots.
//!
//! Loan-to-value classification and yield projections. No I/O here; the
//! monitoring service and tools feed snapshots in and render the results.

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// LTV below this is comfortably collateralized.
pub const LTV_WARNING: f64 = 0.70;
/// LTV at or above this risks liquidation.
pub const LTV_CRITICAL: f64 = 0.80;

/// Risk band for a leveraged position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Warning,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Safe => write!(f, "safe"),
            RiskLevel::Warning => write!(f, "warning"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Risk classification of a leverage position at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub ltv: f64,
    pub classification: RiskLevel,
    pub computed_at: DateTime<Utc>,
}

impl RiskAssessment {
    /// Assess a position from its raw fixed-point collateral and debt.
    pub fn from_position(deposited: U256, borrowed: U256) -> Self {
        let ltv = compute_ltv(deposited, borrowed);
        Self {
            ltv,
            classification: classify(ltv),
            computed_at: Utc::now(),
        }
    }

    pub fn safe(&self) -> bool {
        self.classification == RiskLevel::Safe
    }

    pub fn warning(&self) -> bool {
        self.classification == RiskLevel::Warning
    }

    pub fn critical(&self) -> bool {
        self.classification == RiskLevel::Critical
    }
}

/// Convert a base-10^18 fixed-point value to an f64 of whole units.
///
/// Precision loss above 2^53 units is acceptable: the result is only used
/// for ratios and display, never fed back into a contract call.
fn to_units(value: U256) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(f64::INFINITY) / 1e18
}

/// Compute loan-to-value: borrowed / deposited.
///
/// A position with zero collateral and outstanding debt is infinitely
/// leveraged; this returns infinity rather than raising a division fault,
/// and `classify` maps it to Critical.
pub fn compute_ltv(deposited: U256, borrowed: U256) -> f64 {
    if deposited.is_zero() {
        if borrowed.is_zero() {
            return 0.0;
        }
        return f64::INFINITY;
    }
    to_units(borrowed) / to_units(deposited)
}

/// Classify an LTV ratio. Bands are closed on their lower bound:
/// exactly 0.70 is Warning, exactly 0.80 is Critical.
pub fn classify(ltv: f64) -> RiskLevel {
    if ltv >= LTV_CRITICAL {
        RiskLevel::Critical
    } else if ltv >= LTV_WARNING {
        RiskLevel::Warning
    } else {
        RiskLevel::Safe
    }
}

/// One observation of the vault's total assets.
#[derive(Debug, Clone)]
pub struct TvlSnapshot {
    pub taken_at: DateTime<Utc>,
    pub total_assets: U256,
}

/// Annualized vault growth, or a marker that we cannot compute one yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Apy {
    /// Fewer than two snapshots: no growth rate can be derived.
    InsufficientData,
    Annualized { percent: f64, window_hours: f64 },
}

/// Compute annualized growth from ordered TVL snapshots.
///
/// Uses the relative change between the first and last snapshot,
/// extrapolated to a 365-day year. Never fabricates a number: with fewer
/// than two usable snapshots the result is `InsufficientData`.
pub fn compute_apy(snapshots: &[TvlSnapshot]) -> Apy {
    if snapshots.len() < 2 {
        return Apy::InsufficientData;
    }
    let first = &snapshots[0];
    let last = &snapshots[snapshots.len() - 1];

    let elapsed = (last.taken_at - first.taken_at).num_seconds();
    if elapsed <= 0 || first.total_assets.is_zero() {
        return Apy::InsufficientData;
    }

    let start = to_units(first.total_assets);
    let end = to_units(last.total_assets);
    let growth = (end - start) / start;

    const YEAR_SECONDS: f64 = 365.0 * 24.0 * 3600.0;
    let annualized = growth * (YEAR_SECONDS / elapsed as f64) * 100.0;

    Apy::Annualized {
        percent: annualized,
        window_hours: elapsed as f64 / 3600.0,
    }
}

/// Bounded history of TVL observations, shared between the monitoring
/// service (which records) and the APY tool (which reads).
///
/// Explicitly owned state; there are no process-global price or TVL
/// trackers anywhere in the crate.
#[derive(Clone, Default)]
pub struct SnapshotStore {
    inner: std::sync::Arc<std::sync::RwLock<Vec<TvlSnapshot>>>,
}

/// Enough for a day of 15-minute cycles.
const SNAPSHOT_CAPACITY: usize = 96;

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation, evicting the oldest beyond capacity.
    pub fn record(&self, total_assets: U256) {
        self.record_at(Utc::now(), total_assets);
    }

    pub fn record_at(&self, taken_at: DateTime<Utc>, total_assets: U256) {
        let Ok(mut snapshots) = self.inner.write() else {
            return;
        };
        snapshots.push(TvlSnapshot {
            taken_at,
            total_assets,
        });
        if snapshots.len() > SNAPSHOT_CAPACITY {
            let excess = snapshots.len() - SNAPSHOT_CAPACITY;
            snapshots.drain(..excess);
        }
    }

    pub fn snapshots(&self) -> Vec<TvlSnapshot> {
        self.inner.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// APY over the recorded history.
    pub fn apy(&self) -> Apy {
        compute_apy(&self.snapshots())
    }
}

/// Result of a compound-interest yield projection.
#[derive(Debug, Clone, Serialize)]
pub struct YieldProjection {
    pub initial: f64,
    pub projected: f64,
    pub profit: f64,
}

/// Project yield over `days` at an annual rate `apr`, compounded daily.
pub fn project_yield(principal: f64, apr: f64, days: u32) -> YieldProjection {
    let daily = apr / 365.0;
    let projected = principal * (1.0 + daily).powi(days as i32);
    YieldProjection {
        initial: principal,
        projected,
        profit: projected - principal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn wei(units: u64) -> U256 {
        U256::from(units) * U256::from(10).pow(U256::from(18u64))
    }

    #[test]
    fn test_classify_bands() {
        assert_eq!(classify(0.0), RiskLevel::Safe);
        assert_eq!(classify(0.69), RiskLevel::Safe);
        // boundaries are closed on the lower bound
        assert_eq!(classify(0.70), RiskLevel::Warning);
        assert_eq!(classify(0.79), RiskLevel::Warning);
        assert_eq!(classify(0.80), RiskLevel::Critical);
        assert_eq!(classify(1.5), RiskLevel::Critical);
        assert_eq!(classify(f64::INFINITY), RiskLevel::Critical);
    }

    #[test]
    fn test_ltv_75_percent_is_warning() {
        let assessment = RiskAssessment::from_position(wei(100), wei(75));
        assert!((assessment.ltv - 0.75).abs() < 1e-9);
        assert_eq!(assessment.classification, RiskLevel::Warning);
        assert!(!assessment.safe());
        assert!(!assessment.critical());
    }

    #[test]
    fn test_zero_collateral_is_critical_not_a_fault() {
        let assessment = RiskAssessment::from_position(U256::ZERO, wei(1));
        assert!(assessment.ltv.is_infinite());
        assert_eq!(assessment.classification, RiskLevel::Critical);
    }

    #[test]
    fn test_empty_position_is_safe() {
        let assessment = RiskAssessment::from_position(U256::ZERO, U256::ZERO);
        assert_eq!(assessment.ltv, 0.0);
        assert_eq!(assessment.classification, RiskLevel::Safe);
    }

    #[test]
    fn test_apy_insufficient_data() {
        assert_eq!(compute_apy(&[]), Apy::InsufficientData);

        let one = vec![TvlSnapshot {
            taken_at: Utc::now(),
            total_assets: wei(100),
        }];
        assert_eq!(compute_apy(&one), Apy::InsufficientData);
    }

    #[test]
    fn test_apy_annualizes_growth() {
        let start = Utc::now();
        let snapshots = vec![
            TvlSnapshot {
                taken_at: start,
                total_assets: wei(1000),
            },
            TvlSnapshot {
                taken_at: start + Duration::days(365),
                total_assets: wei(1100),
            },
        ];
        match compute_apy(&snapshots) {
            Apy::Annualized { percent, .. } => assert!((percent - 10.0).abs() < 0.01),
            other => panic!("expected annualized APY, got {:?}", other),
        }
    }

    #[test]
    fn test_apy_zero_baseline_is_insufficient() {
        let start = Utc::now();
        let snapshots = vec![
            TvlSnapshot {
                taken_at: start,
                total_assets: U256::ZERO,
            },
            TvlSnapshot {
                taken_at: start + Duration::hours(1),
                total_assets: wei(10),
            },
        ];
        assert_eq!(compute_apy(&snapshots), Apy::InsufficientData);
    }

    #[test]
    fn test_snapshot_store_bounds_history() {
        let store = SnapshotStore::new();
        let start = Utc::now();
        for i in 0..200u64 {
            store.record_at(start + Duration::minutes(i as i64), wei(1000 + i));
        }
        let snapshots = store.snapshots();
        assert_eq!(snapshots.len(), 96);
        // oldest entries were evicted
        assert_eq!(snapshots[0].total_assets, wei(1000 + 104));
    }

    #[test]
    fn test_snapshot_store_apy_needs_two_points() {
        let store = SnapshotStore::new();
        assert_eq!(store.apy(), Apy::InsufficientData);
        store.record(wei(100));
        assert_eq!(store.apy(), Apy::InsufficientData);
        store.record_at(Utc::now() + Duration::hours(1), wei(101));
        assert!(matches!(store.apy(), Apy::Annualized { .. }));
    }

    #[test]
    fn test_project_yield_compounds_daily() {
        let projection = project_yield(1000.0, 0.05, 365);
        // Daily compounding beats simple interest
        assert!(projection.projected > 1050.0);
        assert!(projection.projected < 1052.0);
        assert!((projection.profit - (projection.projected - 1000.0)).abs() < 1e-9);
    }
}
