use crate::error::{AnalyticsError, Result};
use crate::store::RecordStore;
use crate::utils::{mean, population_std_dev};
use crate::Ratio;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Population statistics of one category's debit amounts over the full history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category_id: i64,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRow {
    pub transaction_id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub date: NaiveDate,
    pub merchant: Option<String>,
    pub amount: f64,
    pub category_mean: f64,
    pub category_std_dev: f64,
    /// Undefined when the category's amounts do not vary.
    pub z_score: Ratio,
    pub is_anomaly: bool,
}

pub struct AnomalyDetector {
    threshold: f64,
    limit: usize,
}

impl AnomalyDetector {
    pub fn new(threshold: f64, limit: usize) -> Result<Self> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(AnalyticsError::InvalidParameter {
                name: "anomaly_threshold",
                details: format!("must be a finite, non-negative number, got {}", threshold),
            });
        }
        Ok(Self { threshold, limit })
    }

    pub fn category_stats(&self, store: &RecordStore) -> BTreeMap<i64, CategoryStats> {
        let mut amounts: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
        for txn in store.debits() {
            amounts.entry(txn.category_id).or_default().push(txn.amount);
        }

        amounts
            .into_iter()
            .filter_map(|(category_id, values)| {
                let mean = mean(&values)?;
                // Identical amounts can still leave rounding noise in the deviation.
                let constant = values.iter().all(|v| *v == values[0]);
                let std_dev = if constant {
                    0.0
                } else {
                    population_std_dev(&values)?
                };
                Some((
                    category_id,
                    CategoryStats {
                        category_id,
                        count: values.len(),
                        mean,
                        std_dev,
                    },
                ))
            })
            .collect()
    }

    /// Scores every debit transaction, in store order.
    pub fn score(&self, store: &RecordStore) -> Vec<AnomalyRow> {
        let stats = self.category_stats(store);

        store
            .debits()
            .filter_map(|txn| {
                let s = stats.get(&txn.category_id)?;
                let z_score = Ratio::of(txn.amount - s.mean, s.std_dev);
                let is_anomaly = z_score.value().map_or(false, |z| z.abs() > self.threshold);

                Some(AnomalyRow {
                    transaction_id: txn.transaction_id,
                    category_id: txn.category_id,
                    category_name: store.category_name(txn.category_id).to_string(),
                    date: txn.date,
                    merchant: txn.merchant.clone(),
                    amount: txn.amount,
                    category_mean: s.mean,
                    category_std_dev: s.std_dev,
                    z_score,
                    is_anomaly,
                })
            })
            .collect()
    }

    /// Flagged transactions ordered by descending |z|, ties by transaction id,
    /// capped at the configured limit.
    pub fn detect(&self, store: &RecordStore) -> Vec<AnomalyRow> {
        let mut flagged: Vec<AnomalyRow> = self
            .score(store)
            .into_iter()
            .filter(|row| row.is_anomaly)
            .collect();

        flagged.sort_by(|a, b| {
            let za = a.z_score.map(f64::abs);
            let zb = b.z_score.map(f64::abs);
            za.cmp_desc_undefined_last(&zb)
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
        });
        flagged.truncate(self.limit);

        debug!(
            "Anomaly detection flagged {} transactions (threshold {}, limit {})",
            flagged.len(),
            self.threshold,
            self.limit
        );
        flagged
    }
}
