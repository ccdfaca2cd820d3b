use crate::store::RecordStore;
use crate::Ratio;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgressRow {
    pub goal_id: i64,
    pub name: String,
    pub goal_type: String,
    pub priority: u8,
    pub target_amount: f64,
    pub current_amount: f64,
    /// Negative once the goal has been overshot.
    pub amount_remaining: f64,
    pub pct_complete: Ratio,
    pub target_date: NaiveDate,
    /// Days from the as-of date to the target date; negative when overdue.
    pub days_remaining: i64,
    /// Zero when the target date is not in the future.
    pub monthly_savings_needed: f64,
}

/// Progress of active goals relative to `as_of`.
///
/// Ordered by priority (1 first), then percent complete descending with
/// undefined last, then goal id. A month is counted as 30 days.
pub fn goal_progress(store: &RecordStore, as_of: NaiveDate) -> Vec<GoalProgressRow> {
    let mut rows: Vec<GoalProgressRow> = store
        .goals()
        .iter()
        .filter(|g| g.is_active)
        .map(|goal| {
            let amount_remaining = goal.target_amount - goal.current_amount;
            let days_remaining = (goal.target_date - as_of).num_days();
            let monthly_savings_needed = if days_remaining > 0 {
                amount_remaining * 30.0 / days_remaining as f64
            } else {
                0.0
            };

            GoalProgressRow {
                goal_id: goal.goal_id,
                name: goal.name.clone(),
                goal_type: goal.goal_type.clone(),
                priority: goal.priority,
                target_amount: goal.target_amount,
                current_amount: goal.current_amount,
                amount_remaining,
                pct_complete: Ratio::percent(goal.current_amount, goal.target_amount),
                target_date: goal.target_date,
                days_remaining,
                monthly_savings_needed,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.pct_complete.cmp_desc_undefined_last(&b.pct_complete))
            .then_with(|| a.goal_id.cmp(&b.goal_id))
    });

    debug!("Goal progress computed for {} active goals", rows.len());
    rows
}
