use crate::error::{AnalyticsError, Result};
use crate::schema::BudgetPeriod;
use chrono::{Datelike, Days, Months, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Calendar slot size used to bucket dated records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Month,
    Quarter,
    Year,
}

impl Granularity {
    fn months(self) -> u32 {
        match self {
            Granularity::Month => 1,
            Granularity::Quarter => 3,
            Granularity::Year => 12,
        }
    }
}

impl From<BudgetPeriod> for Granularity {
    fn from(period: BudgetPeriod) -> Self {
        match period {
            BudgetPeriod::Monthly => Granularity::Month,
            BudgetPeriod::Quarterly => Granularity::Quarter,
            BudgetPeriod::Yearly => Granularity::Year,
        }
    }
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    month_start(date) + Months::new(1)
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    next_month_start(date) - Days::new(1)
}

/// Truncates `date` to the first day of its bucket.
///
/// Quarters start in January, April, July and October; years in January.
pub fn truncate(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    let start = month_start(date);
    let offset = date.month0() % granularity.months();
    start - Months::new(offset)
}

/// First and last day of the bucket containing `date`.
pub fn bucket_bounds(date: NaiveDate, granularity: Granularity) -> (NaiveDate, NaiveDate) {
    let start = truncate(date, granularity);
    let end = start + Months::new(granularity.months()) - Days::new(1);
    (start, end)
}

pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    year_diff * 12 + month_diff
}

/// Parses a period string in the format "YYYY-MM" or "YYYY-MM:YYYY-MM"
/// Returns (start_date, end_date) where end_date is the last day of the final month.
pub fn parse_period_string(period: &str) -> Result<(NaiveDate, NaiveDate)> {
    let parts: Vec<&str> = period.split(':').collect();

    match parts.len() {
        1 => {
            let start_date = parse_month(parts[0])?;
            Ok((start_date, month_end(start_date)))
        }
        2 => {
            let start_date = parse_month(parts[0])?;
            let end_date = month_end(parse_month(parts[1])?);
            if end_date < start_date {
                return Err(AnalyticsError::DateError(format!(
                    "Period '{}' ends before it starts",
                    period
                )));
            }
            Ok((start_date, end_date))
        }
        _ => Err(AnalyticsError::DateError(format!(
            "Invalid period format: {}. Expected 'YYYY-MM' or 'YYYY-MM:YYYY-MM'",
            period
        ))),
    }
}

fn parse_month(part: &str) -> Result<NaiveDate> {
    let text = format!("{}-01", part.trim());
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|_| {
        AnalyticsError::DateError(format!(
            "Invalid date format in period: {}. Expected YYYY-MM",
            part
        ))
    })
}

/// Explicit reporting window passed into period-scoped computations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct TargetPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
}

impl TargetPeriod {
    /// The calendar bucket of the given granularity that contains `date`.
    pub fn containing(date: NaiveDate, granularity: Granularity) -> Self {
        let (start, end) = bucket_bounds(date, granularity);
        Self {
            start,
            end,
            granularity,
        }
    }

    pub fn month(year: i32, month: u32) -> Result<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            AnalyticsError::DateError(format!("Invalid month {}-{:02}", year, month))
        })?;
        Ok(Self::containing(first, Granularity::Month))
    }

    /// Parses "YYYY-MM" as a month, or "YYYY-MM:YYYY-MM" spanning exactly one
    /// calendar quarter or year.
    pub fn parse(period: &str) -> Result<Self> {
        let (start, end) = parse_period_string(period)?;
        let span = months_between(start, end) + 1;

        let granularity = match span {
            1 => Granularity::Month,
            3 => Granularity::Quarter,
            12 => Granularity::Year,
            _ => {
                return Err(AnalyticsError::DateError(format!(
                    "Period '{}' spans {} months; expected 1, 3 or 12",
                    period, span
                )))
            }
        };

        let candidate = Self::containing(start, granularity);
        if candidate.start != start || candidate.end != end {
            return Err(AnalyticsError::DateError(format!(
                "Period '{}' is not aligned to a calendar {:?}",
                period, granularity
            )));
        }
        Ok(candidate)
    }

    /// Fails unless `start..=end` is exactly one calendar bucket of `granularity`.
    ///
    /// The fields are public, so a hand-built or deserialized period can pair a
    /// month of dates with a yearly granularity.
    pub fn ensure_aligned(&self) -> Result<()> {
        let expected = Self::containing(self.start, self.granularity);
        if *self != expected {
            return Err(AnalyticsError::InvalidParameter {
                name: "target_period",
                details: format!(
                    "{} to {} is not one calendar {:?}; expected {} to {}",
                    self.start, self.end, self.granularity, expected.start, expected.end
                ),
            });
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn budget_period(&self) -> BudgetPeriod {
        match self.granularity {
            Granularity::Month => BudgetPeriod::Monthly,
            Granularity::Quarter => BudgetPeriod::Quarterly,
            Granularity::Year => BudgetPeriod::Yearly,
        }
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation with an `n` denominator.
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Standard deviation with an `n - 1` denominator. `None` below two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}
