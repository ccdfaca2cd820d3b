use crate::schema::{Budget, BudgetPeriod};
use crate::store::RecordStore;
use crate::utils::TargetPeriod;
use crate::Ratio;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetVarianceRow {
    pub budget_id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub period: BudgetPeriod,
    pub budgeted: f64,
    pub actual: f64,
    /// `budgeted - actual`; positive means under budget.
    pub variance: f64,
    pub percent_used: Ratio,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Exceeded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAlert {
    pub category_id: i64,
    pub category_name: String,
    pub severity: AlertSeverity,
    pub percent_used: Ratio,
    pub actual: f64,
    /// How far actual spend is over the budget; zero or negative for warnings.
    pub overage: f64,
}

pub struct BudgetVarianceEngine<'a> {
    store: &'a RecordStore,
}

impl<'a> BudgetVarianceEngine<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Active budgets of the period's kind that cover the whole period.
    ///
    /// When several rows qualify for one category the most recently created wins
    /// (latest `created_at`, then highest `budget_id`).
    pub fn effective_budgets(&self, period: &TargetPeriod) -> Vec<&'a Budget> {
        let kind = period.budget_period();
        let mut chosen: BTreeMap<i64, &'a Budget> = BTreeMap::new();

        for budget in self.store.budgets() {
            if !budget.is_active || budget.period != kind || !budget.covers(period.start, period.end)
            {
                continue;
            }

            match chosen.get(&budget.category_id) {
                Some(existing) if recency(existing) >= recency(budget) => {
                    debug!(
                        "Ignoring budget {} for category {}: budget {} is more recent",
                        budget.budget_id, budget.category_id, existing.budget_id
                    );
                }
                Some(existing) => {
                    debug!(
                        "Ignoring budget {} for category {}: budget {} is more recent",
                        existing.budget_id, budget.category_id, budget.budget_id
                    );
                    chosen.insert(budget.category_id, budget);
                }
                None => {
                    chosen.insert(budget.category_id, budget);
                }
            }
        }

        chosen.into_values().collect()
    }

    /// Budget-centric join of effective budgets to debit spend inside `period`.
    ///
    /// Ordered by percent used descending, undefined last, then category id.
    pub fn compute(&self, period: &TargetPeriod) -> Vec<BudgetVarianceRow> {
        let budgets = self.effective_budgets(period);

        let mut spend: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
        for txn in self.store.debits().filter(|t| period.contains(t.date)) {
            let entry = spend.entry(txn.category_id).or_insert((0.0, 0));
            entry.0 += txn.amount;
            entry.1 += 1;
        }

        let mut rows: Vec<BudgetVarianceRow> = budgets
            .into_iter()
            .map(|budget| {
                let (actual, transaction_count) =
                    spend.get(&budget.category_id).copied().unwrap_or((0.0, 0));
                BudgetVarianceRow {
                    budget_id: budget.budget_id,
                    category_id: budget.category_id,
                    category_name: self.store.category_name(budget.category_id).to_string(),
                    period: budget.period,
                    budgeted: budget.amount,
                    actual,
                    variance: budget.amount - actual,
                    percent_used: Ratio::percent(actual, budget.amount),
                    transaction_count,
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            a.percent_used
                .cmp_desc_undefined_last(&b.percent_used)
                .then_with(|| a.category_id.cmp(&b.category_id))
        });

        debug!(
            "Budget variance for {} to {} produced {} rows",
            period.start,
            period.end,
            rows.len()
        );
        rows
    }
}

fn recency(budget: &Budget) -> (Option<chrono::NaiveDateTime>, i64) {
    (budget.created_at, budget.budget_id)
}

/// Budgets that are over, or close to, their limit.
///
/// Spend against a zero budget has no percentage but is reported as exceeded.
pub fn budget_alerts(rows: &[BudgetVarianceRow], warning_pct: f64) -> Vec<BudgetAlert> {
    rows.iter()
        .filter_map(|row| {
            let severity = match row.percent_used {
                Ratio::Defined(pct) if pct > 100.0 => AlertSeverity::Exceeded,
                Ratio::Defined(pct) if pct >= warning_pct => AlertSeverity::Warning,
                Ratio::Undefined if row.actual > 0.0 => AlertSeverity::Exceeded,
                _ => return None,
            };

            Some(BudgetAlert {
                category_id: row.category_id,
                category_name: row.category_name.clone(),
                severity,
                percent_used: row.percent_used,
                actual: row.actual,
                overage: -row.variance,
            })
        })
        .collect()
}
