use crate::error::{AnalyticsError, Result};
use crate::schema::Transaction;
use crate::store::RecordStore;
use crate::utils::{truncate, Granularity};
use chrono::NaiveDate;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Partitioning key for trend series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Category,
    /// Direct parent of the transaction's category; root categories stand for themselves.
    ParentCategory,
    /// Debits without a merchant are left out.
    Merchant,
    Account,
    /// Single series over every debit.
    Overall,
}

pub const OVERALL_GROUP: &str = "All";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRow {
    /// First day of the bucket.
    pub bucket: NaiveDate,
    pub group: String,
    /// Category or account identifier behind `group`, when there is one.
    pub group_id: Option<i64>,
    pub total: f64,
    pub count: usize,
    pub moving_average: f64,
    /// Change from the previous bucket of the same group. `None` for the first bucket.
    pub delta: Option<f64>,
}

#[derive(Default)]
struct Bucket {
    total: f64,
    count: usize,
}

type GroupKey = (String, Option<i64>);

pub struct WindowedAggregator {
    granularity: Granularity,
    window: usize,
}

impl WindowedAggregator {
    pub fn new(granularity: Granularity, window: usize) -> Result<Self> {
        if window == 0 {
            return Err(AnalyticsError::InvalidParameter {
                name: "moving_average_window",
                details: "must be at least 1".to_string(),
            });
        }
        Ok(Self {
            granularity,
            window,
        })
    }

    /// Buckets debit transactions per group, then scans each group's buckets in
    /// date order.
    ///
    /// `range` restricts the input transactions to an inclusive date range.
    /// Rows come back ordered by group, then bucket ascending.
    pub fn aggregate(
        &self,
        store: &RecordStore,
        dimension: Dimension,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Vec<TrendRow> {
        // Grouping finishes before any windowing starts.
        let mut groups: BTreeMap<GroupKey, BTreeMap<NaiveDate, Bucket>> = BTreeMap::new();

        for txn in store.debits() {
            if let Some((start, end)) = range {
                if txn.date < start || txn.date > end {
                    continue;
                }
            }

            let Some(key) = group_key(store, dimension, txn) else {
                continue;
            };

            let bucket = groups
                .entry(key)
                .or_default()
                .entry(truncate(txn.date, self.granularity))
                .or_default();
            bucket.total += txn.amount;
            bucket.count += 1;
        }

        let mut rows = Vec::new();
        for ((group, group_id), buckets) in groups {
            let mut frame: VecDeque<f64> = VecDeque::with_capacity(self.window);
            let mut previous: Option<f64> = None;

            for (bucket, totals) in buckets {
                if frame.len() == self.window {
                    frame.pop_front();
                }
                frame.push_back(totals.total);
                let moving_average = frame.iter().sum::<f64>() / frame.len() as f64;

                rows.push(TrendRow {
                    bucket,
                    group: group.clone(),
                    group_id,
                    total: totals.total,
                    count: totals.count,
                    moving_average,
                    delta: previous.map(|p| totals.total - p),
                });
                previous = Some(totals.total);
            }
        }

        debug!(
            "Windowed aggregation by {:?} ({:?}, window {}) produced {} rows",
            dimension,
            self.granularity,
            self.window,
            rows.len()
        );
        rows
    }
}

fn group_key(
    store: &RecordStore,
    dimension: Dimension,
    txn: &Transaction,
) -> Option<GroupKey> {
    match dimension {
        Dimension::Category => Some((
            store.category_name(txn.category_id).to_string(),
            Some(txn.category_id),
        )),
        Dimension::ParentCategory => {
            let id = store
                .category(txn.category_id)
                .and_then(|c| c.parent_id)
                .unwrap_or(txn.category_id);
            Some((store.category_name(id).to_string(), Some(id)))
        }
        Dimension::Merchant => txn.merchant.as_ref().map(|m| (m.clone(), None)),
        Dimension::Account => {
            let name = store
                .account(txn.account_id)
                .map(|a| a.name.clone())
                .unwrap_or_default();
            Some((name, Some(txn.account_id)))
        }
        Dimension::Overall => Some((OVERALL_GROUP.to_string(), None)),
    }
}
