use crate::anomaly::{AnomalyDetector, AnomalyRow};
use crate::budget::{budget_alerts, BudgetAlert, BudgetVarianceEngine, BudgetVarianceRow};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::expenses::{top_expenses, TopExpenseRow};
use crate::goals::{goal_progress, GoalProgressRow};
use crate::hierarchy::{CategoryPath, HierarchyResolver};
use crate::merchant::{MerchantRanker, MerchantRow};
use crate::rollup::{rollup_spend, CategoryRollupRow};
use crate::savings::{savings_by_month, MonthlySavingsRow};
use crate::store::RecordStore;
use crate::utils::{Granularity, TargetPeriod};
use crate::window::{Dimension, TrendRow, WindowedAggregator};
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::thread::{self, ScopedJoinHandle};

/// Call parameters for one run. Nothing here is read from the clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    /// Period for budget variance, alerts, rollup and top expenses.
    pub target_period: TargetPeriod,
    /// Reference date for goal deadlines.
    pub as_of: NaiveDate,
    /// Bucket size for the trend tables.
    pub trend_granularity: Granularity,
    /// Inclusive date range for the trend tables; full history when `None`.
    pub trend_range: Option<(NaiveDate, NaiveDate)>,
}

impl RunParameters {
    /// Monthly trends over the full history.
    pub fn new(target_period: TargetPeriod, as_of: NaiveDate) -> Self {
        Self {
            target_period,
            as_of,
            trend_granularity: Granularity::Month,
            trend_range: None,
        }
    }

    fn validate(&self) -> Result<()> {
        // Budget kind comes from the granularity while spend is summed over the
        // dates, so the two must describe the same calendar bucket.
        self.target_period.ensure_aligned()?;
        if let Some((start, end)) = self.trend_range {
            if end < start {
                return Err(AnalyticsError::InvalidParameter {
                    name: "trend_range",
                    details: format!("end {} is before start {}", end, start),
                });
            }
        }
        Ok(())
    }
}

/// Every result table of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub target_period: TargetPeriod,
    pub as_of: NaiveDate,
    pub hierarchy: Vec<CategoryPath>,
    pub category_rollup: Vec<CategoryRollupRow>,
    pub category_trends: Vec<TrendRow>,
    pub merchant_trends: Vec<TrendRow>,
    pub overall_trend: Vec<TrendRow>,
    pub anomalies: Vec<AnomalyRow>,
    pub budget_variance: Vec<BudgetVarianceRow>,
    pub budget_alerts: Vec<BudgetAlert>,
    pub savings: Vec<MonthlySavingsRow>,
    pub merchants: Vec<MerchantRow>,
    pub goals: Vec<GoalProgressRow>,
    pub top_expenses: Vec<TopExpenseRow>,
}

impl AnalyticsReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct AnalyticsEngine<'a> {
    store: &'a RecordStore,
    config: AnalyticsConfig,
}

impl<'a> AnalyticsEngine<'a> {
    pub fn new(store: &'a RecordStore, config: AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Resolves the hierarchy, then runs the independent components on scoped
    /// threads over the shared store.
    ///
    /// The run is all or nothing: a cyclic or dangling category hierarchy fails
    /// the whole call with the resolver's error, including the tables that do
    /// not read the hierarchy. Callers that want those tables regardless can
    /// call the components directly.
    pub fn run(&self, params: &RunParameters) -> Result<AnalyticsReport> {
        params.validate()?;

        info!(
            "Running analytics for {} to {} (as of {})",
            params.target_period.start, params.target_period.end, params.as_of
        );

        // 1. Hierarchy first: a cycle aborts the whole run.
        let hierarchy = HierarchyResolver::new(&self.config.path_separator)
            .resolve(self.store.categories())?;
        let hierarchy_rows: Vec<CategoryPath> = hierarchy.values().cloned().collect();

        // 2. Build the components up front so parameter errors surface before
        //    any thread is spawned.
        let aggregator =
            WindowedAggregator::new(params.trend_granularity, self.config.moving_average_window)?;
        let detector =
            AnomalyDetector::new(self.config.anomaly_threshold, self.config.anomaly_limit)?;
        let ranker = MerchantRanker::new(
            self.config.min_merchant_transactions,
            self.config.merchant_top_n,
        );
        let budgets = BudgetVarianceEngine::new(self.store);

        let store = self.store;
        let period = &params.target_period;
        let range = params.trend_range;
        let top_limit = self.config.top_expense_limit;
        let warning_pct = self.config.budget_warning_pct;

        // 3. Fan out.
        let report = thread::scope(|s| {
            let category_trends =
                s.spawn(|| aggregator.aggregate(store, Dimension::Category, range));
            let merchant_trends =
                s.spawn(|| aggregator.aggregate(store, Dimension::Merchant, range));
            let overall_trend = s.spawn(|| aggregator.aggregate(store, Dimension::Overall, range));
            let anomalies = s.spawn(|| detector.detect(store));
            let budget_variance = s.spawn(|| budgets.compute(period));
            let savings = s.spawn(|| savings_by_month(store));
            let merchants = s.spawn(|| ranker.rank(store));
            let category_rollup = s.spawn(|| rollup_spend(store, &hierarchy, Some(period)));
            let goals = s.spawn(|| goal_progress(store, params.as_of));
            let top = s.spawn(|| top_expenses(store, period, top_limit));

            let budget_variance = join(budget_variance);
            let budget_alerts = budget_alerts(&budget_variance, warning_pct);

            AnalyticsReport {
                target_period: *period,
                as_of: params.as_of,
                hierarchy: hierarchy_rows,
                category_rollup: join(category_rollup),
                category_trends: join(category_trends),
                merchant_trends: join(merchant_trends),
                overall_trend: join(overall_trend),
                anomalies: join(anomalies),
                budget_variance,
                budget_alerts,
                savings: join(savings),
                merchants: join(merchants),
                goals: join(goals),
                top_expenses: join(top),
            }
        });

        debug!(
            "Report: {} categories, {} anomalies, {} budget rows, {} alerts, {} savings months, {} merchants",
            report.hierarchy.len(),
            report.anomalies.len(),
            report.budget_variance.len(),
            report.budget_alerts.len(),
            report.savings.len(),
            report.merchants.len()
        );

        Ok(report)
    }
}

/// Re-raises a worker panic on the calling thread.
fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
}

/// Builds the store from a snapshot and runs the engine in one call.
pub fn process_snapshot(
    snapshot: crate::schema::RecordSnapshot,
    config: AnalyticsConfig,
    params: &RunParameters,
) -> Result<AnalyticsReport> {
    let store = RecordStore::from_snapshot(snapshot, config.reference_policy)?;
    AnalyticsEngine::new(&store, config)?.run(params)
}
