use crate::store::RecordStore;
use crate::utils::sample_std_dev;
use crate::Ratio;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantRow {
    pub merchant: String,
    pub transaction_count: usize,
    pub total_spent: f64,
    pub avg_transaction: f64,
    pub first_transaction: NaiveDate,
    pub last_transaction: NaiveDate,
    /// Sample standard deviation of the amounts; undefined below two transactions.
    pub amount_std_dev: Ratio,
    pub days_active: i64,
    pub avg_days_between: Ratio,
}

pub struct MerchantRanker {
    min_transactions: usize,
    top_n: usize,
}

impl MerchantRanker {
    pub fn new(min_transactions: usize, top_n: usize) -> Self {
        Self {
            min_transactions,
            top_n,
        }
    }

    /// Merchants with at least the minimum number of debits, ordered by total
    /// spend descending (ties by name) and capped at top-N.
    pub fn rank(&self, store: &RecordStore) -> Vec<MerchantRow> {
        let mut groups: BTreeMap<&str, Vec<(NaiveDate, f64)>> = BTreeMap::new();
        for txn in store.debits() {
            if let Some(merchant) = txn.merchant.as_deref() {
                groups.entry(merchant).or_default().push((txn.date, txn.amount));
            }
        }

        let mut rows: Vec<MerchantRow> = groups
            .into_iter()
            .filter(|(_, entries)| entries.len() >= self.min_transactions)
            .filter_map(|(merchant, entries)| summarize(merchant, &entries))
            .collect();

        rows.sort_by(|a, b| {
            b.total_spent
                .total_cmp(&a.total_spent)
                .then_with(|| a.merchant.cmp(&b.merchant))
        });
        rows.truncate(self.top_n);

        debug!(
            "Merchant ranking kept {} merchants (min {} transactions, top {})",
            rows.len(),
            self.min_transactions,
            self.top_n
        );
        rows
    }
}

fn summarize(merchant: &str, entries: &[(NaiveDate, f64)]) -> Option<MerchantRow> {
    let amounts: Vec<f64> = entries.iter().map(|(_, amount)| *amount).collect();
    let count = entries.len();
    let total_spent: f64 = amounts.iter().sum();

    let first_transaction = entries.iter().map(|(d, _)| *d).min()?;
    let last_transaction = entries.iter().map(|(d, _)| *d).max()?;
    let days_active = (last_transaction - first_transaction).num_days();

    Some(MerchantRow {
        merchant: merchant.to_string(),
        transaction_count: count,
        total_spent,
        avg_transaction: total_spent / count as f64,
        first_transaction,
        last_transaction,
        amount_std_dev: sample_std_dev(&amounts).into(),
        days_active,
        avg_days_between: Ratio::of(days_active as f64, count.saturating_sub(1) as f64),
    })
}
