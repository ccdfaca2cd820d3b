use crate::schema::{CategoryType, TransactionType};
use crate::store::RecordStore;
use crate::utils::month_start;
use crate::Ratio;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySavingsRow {
    /// First day of the month.
    pub month: NaiveDate,
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_savings: f64,
    /// Undefined when the month has no income.
    pub savings_rate_pct: Ratio,
}

/// Monthly income, expenses and savings rate, newest month first.
///
/// Income-category transactions count as income whatever their type. Only
/// debits against expense categories count as expenses; transfers and refunds
/// (credits) against expense categories are ignored, as is anything booked to
/// transfer categories. Every month with at least one transaction appears.
pub fn savings_by_month(store: &RecordStore) -> Vec<MonthlySavingsRow> {
    let mut months: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();

    for txn in store.transactions() {
        let totals = months.entry(month_start(txn.date)).or_insert((0.0, 0.0));
        let Some(category) = store.category(txn.category_id) else {
            continue;
        };

        match (category.category_type, txn.transaction_type) {
            (CategoryType::Income, _) => totals.0 += txn.amount,
            (CategoryType::Expense, TransactionType::Debit) => totals.1 += txn.amount,
            _ => {}
        }
    }

    let rows: Vec<MonthlySavingsRow> = months
        .into_iter()
        .rev()
        .map(|(month, (total_income, total_expenses))| {
            let net_savings = total_income - total_expenses;
            MonthlySavingsRow {
                month,
                total_income,
                total_expenses,
                net_savings,
                savings_rate_pct: Ratio::percent(net_savings, total_income),
            }
        })
        .collect();

    debug!("Savings rate computed for {} months", rows.len());
    rows
}
