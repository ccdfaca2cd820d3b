//! # Finance Analytics
//!
//! An analytics engine that turns a snapshot of personal-finance records into
//! the result tables behind dashboards and reports.
//!
//! ## Core Concepts
//!
//! - **Record Store**: validated, immutable view of one snapshot (categories, accounts,
//!   transactions, budgets, goals, debts, recurring items)
//! - **Hierarchy**: every category resolved to its path from a root and its depth
//! - **Trends**: debit totals bucketed per group and calendar period, with moving averages
//!   and period-over-period deltas
//! - **Anomalies**: debits whose per-category z-score exceeds a threshold
//! - **Budget Variance**: active budgets joined to actual spend for an explicit target period
//! - **Savings Rate**: monthly income, expenses and net savings
//! - **Merchant Ranking**: frequent merchants ordered by total spend
//! - **Goals and Top Expenses**: goal progress as of a given date and the largest debits
//!   of the target period
//!
//! Ratios whose denominator is zero are reported as [`Ratio::Undefined`], never as
//! infinity, NaN or a silent zero.
//!
//! ## Example
//!
//! ```rust,ignore
//! use finance_analytics::*;
//!
//! let snapshot = RecordSnapshot::from_json(&std::fs::read_to_string("snapshot.json")?)?;
//! let config = AnalyticsConfig::default();
//! let store = RecordStore::from_snapshot(snapshot, config.reference_policy)?;
//!
//! let as_of = chrono::NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
//! let params = RunParameters::new(TargetPeriod::parse("2024-03")?, as_of);
//! let report = AnalyticsEngine::new(&store, config)?.run(&params)?;
//! println!("{}", report.to_json()?);
//! ```

pub mod anomaly;
pub mod budget;
pub mod config;
pub mod engine;
pub mod error;
pub mod expenses;
pub mod goals;
pub mod hierarchy;
pub mod merchant;
pub mod rollup;
pub mod savings;
pub mod schema;
pub mod store;
pub mod utils;
pub mod window;

pub use anomaly::{AnomalyDetector, AnomalyRow, CategoryStats};
pub use budget::{
    budget_alerts, AlertSeverity, BudgetAlert, BudgetVarianceEngine, BudgetVarianceRow,
};
pub use config::{AnalyticsConfig, ReferencePolicy};
pub use engine::{process_snapshot, AnalyticsEngine, AnalyticsReport, RunParameters};
pub use error::{AnalyticsError, Result};
pub use expenses::{top_expenses, TopExpenseRow};
pub use goals::{goal_progress, GoalProgressRow};
pub use hierarchy::{resolve_hierarchy, CategoryHierarchy, CategoryPath, HierarchyResolver};
pub use merchant::{MerchantRanker, MerchantRow};
pub use rollup::{rollup_spend, CategoryRollupRow};
pub use savings::{savings_by_month, MonthlySavingsRow};
pub use schema::*;
pub use store::RecordStore;
pub use utils::{Granularity, TargetPeriod};
pub use window::{Dimension, TrendRow, WindowedAggregator};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Result of a division whose denominator may be zero.
///
/// Serialized as a number, or `null` when undefined, so tabular consumers see
/// an empty cell rather than a misleading zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Ratio {
    Defined(f64),
    Undefined,
}

impl Ratio {
    /// `numerator / denominator`, or `Undefined` when the denominator is zero
    /// or the quotient is not finite.
    pub fn of(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            return Ratio::Undefined;
        }
        let value = numerator / denominator;
        if value.is_finite() {
            Ratio::Defined(value)
        } else {
            Ratio::Undefined
        }
    }

    /// `numerator / denominator * 100`.
    pub fn percent(numerator: f64, denominator: f64) -> Self {
        Self::of(numerator * 100.0, denominator)
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Ratio::Defined(v) => Ratio::Defined(f(v)),
            Ratio::Undefined => Ratio::Undefined,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Ratio::Defined(v) => Some(*v),
            Ratio::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Ratio::Undefined)
    }

    /// Descending order on the defined values, with `Undefined` after every value.
    pub fn cmp_desc_undefined_last(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Ratio::Defined(a), Ratio::Defined(b)) => b.total_cmp(a),
            (Ratio::Defined(_), Ratio::Undefined) => Ordering::Less,
            (Ratio::Undefined, Ratio::Defined(_)) => Ordering::Greater,
            (Ratio::Undefined, Ratio::Undefined) => Ordering::Equal,
        }
    }
}

impl From<Option<f64>> for Ratio {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Ratio::Defined(v),
            _ => Ratio::Undefined,
        }
    }
}

impl From<Ratio> for Option<f64> {
    fn from(ratio: Ratio) -> Self {
        ratio.value()
    }
}
