use crate::store::RecordStore;
use crate::utils::TargetPeriod;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopExpenseRow {
    pub transaction_id: i64,
    pub date: NaiveDate,
    pub merchant: Option<String>,
    pub category_id: i64,
    pub category_name: String,
    pub amount: f64,
}

/// Largest debits inside `period`: amount descending, then newest first, then id.
pub fn top_expenses(store: &RecordStore, period: &TargetPeriod, limit: usize) -> Vec<TopExpenseRow> {
    let mut debits: Vec<_> = store.debits().filter(|t| period.contains(t.date)).collect();

    debits.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| b.date.cmp(&a.date))
            .then_with(|| a.transaction_id.cmp(&b.transaction_id))
    });

    let rows: Vec<TopExpenseRow> = debits
        .into_iter()
        .take(limit)
        .map(|txn| TopExpenseRow {
            transaction_id: txn.transaction_id,
            date: txn.date,
            merchant: txn.merchant.clone(),
            category_id: txn.category_id,
            category_name: store.category_name(txn.category_id).to_string(),
            amount: txn.amount,
        })
        .collect();

    debug!(
        "Top expenses for {} to {}: {} rows",
        period.start,
        period.end,
        rows.len()
    );
    rows
}
