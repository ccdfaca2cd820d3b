use crate::error::{AnalyticsError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 2.0;
pub const DEFAULT_ANOMALY_LIMIT: usize = 50;
pub const DEFAULT_MIN_MERCHANT_TRANSACTIONS: usize = 3;
pub const DEFAULT_MERCHANT_TOP_N: usize = 20;
pub const DEFAULT_MOVING_AVERAGE_WINDOW: usize = 3;
pub const DEFAULT_PATH_SEPARATOR: &str = ".";
pub const DEFAULT_BUDGET_WARNING_PCT: f64 = 90.0;
pub const DEFAULT_TOP_EXPENSE_LIMIT: usize = 10;

/// What to do with a record whose category or account reference does not resolve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePolicy {
    #[default]
    #[schemars(description = "Fail the whole run on the first dangling reference.")]
    Abort,

    #[schemars(description = "Drop the offending record, log a warning and continue.")]
    SkipAndLog,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct AnalyticsConfig {
    #[schemars(description = "Absolute z-score above which a debit is flagged as anomalous. Default 2.0.")]
    pub anomaly_threshold: f64,

    #[schemars(description = "Maximum number of anomaly rows returned. Default 50.")]
    pub anomaly_limit: usize,

    #[schemars(description = "Merchants with fewer debit transactions are left out of the ranking. Default 3.")]
    pub min_merchant_transactions: usize,

    #[schemars(description = "Maximum number of merchants returned by the ranking. Default 20.")]
    pub merchant_top_n: usize,

    #[schemars(description = "Number of buckets (current plus preceding) in the moving average. Default 3.")]
    pub moving_average_window: usize,

    #[schemars(description = "Separator placed between category names in hierarchy paths. Default '.'.")]
    pub path_separator: String,

    #[schemars(description = "Percent-used at or above which a budget raises a warning alert. Default 90.")]
    pub budget_warning_pct: f64,

    #[schemars(description = "Maximum number of rows in the top expenses table. Default 10.")]
    pub top_expense_limit: usize,

    pub reference_policy: ReferencePolicy,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            anomaly_limit: DEFAULT_ANOMALY_LIMIT,
            min_merchant_transactions: DEFAULT_MIN_MERCHANT_TRANSACTIONS,
            merchant_top_n: DEFAULT_MERCHANT_TOP_N,
            moving_average_window: DEFAULT_MOVING_AVERAGE_WINDOW,
            path_separator: DEFAULT_PATH_SEPARATOR.to_string(),
            budget_warning_pct: DEFAULT_BUDGET_WARNING_PCT,
            top_expense_limit: DEFAULT_TOP_EXPENSE_LIMIT,
            reference_policy: ReferencePolicy::Abort,
        }
    }
}

impl AnalyticsConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.anomaly_threshold.is_finite() || self.anomaly_threshold < 0.0 {
            return Err(AnalyticsError::InvalidParameter {
                name: "anomaly_threshold",
                details: format!("must be a finite, non-negative number, got {}", self.anomaly_threshold),
            });
        }

        if self.moving_average_window == 0 {
            return Err(AnalyticsError::InvalidParameter {
                name: "moving_average_window",
                details: "must be at least 1".to_string(),
            });
        }

        if self.path_separator.is_empty() {
            return Err(AnalyticsError::InvalidParameter {
                name: "path_separator",
                details: "must not be empty".to_string(),
            });
        }

        if !self.budget_warning_pct.is_finite() || self.budget_warning_pct < 0.0 {
            return Err(AnalyticsError::InvalidParameter {
                name: "budget_warning_pct",
                details: format!("must be a finite, non-negative number, got {}", self.budget_warning_pct),
            });
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalyticsConfig)
    }
}
