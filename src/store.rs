use crate::config::ReferencePolicy;
use crate::error::{AnalyticsError, Result};
use crate::schema::*;
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Validated, read-only view of one snapshot.
///
/// Built once per computation run; every analytic component borrows it.
/// Transactions are kept sorted by `(date, transaction_id)` so that every scan
/// over them is deterministic regardless of the order the snapshot arrived in.
#[derive(Debug, Clone)]
pub struct RecordStore {
    categories: BTreeMap<i64, Category>,
    accounts: BTreeMap<i64, Account>,
    transactions: Vec<Transaction>,
    budgets: Vec<Budget>,
    goals: Vec<FinancialGoal>,
    debts: Vec<Debt>,
    recurring: Vec<RecurringTransaction>,
    skipped_records: usize,
}

impl RecordStore {
    pub fn from_snapshot(snapshot: RecordSnapshot, policy: ReferencePolicy) -> Result<Self> {
        let mut categories = BTreeMap::new();
        for category in snapshot.categories {
            let id = category.category_id;
            if categories.insert(id, category).is_some() {
                return Err(invalid("category", id, "duplicate identifier".to_string()));
            }
        }

        let mut accounts = BTreeMap::new();
        for account in snapshot.accounts {
            let id = account.account_id;
            ensure_finite("account", id, "current_balance", account.current_balance)?;
            if accounts.insert(id, account).is_some() {
                return Err(invalid("account", id, "duplicate identifier".to_string()));
            }
        }

        let mut skipped_records = 0;

        let mut transactions = Vec::with_capacity(snapshot.transactions.len());
        let mut seen_transactions = BTreeSet::new();
        for txn in snapshot.transactions {
            let id = txn.transaction_id;
            ensure_magnitude("transaction", id, "amount", txn.amount)?;
            if !seen_transactions.insert(id) {
                return Err(invalid("transaction", id, "duplicate identifier".to_string()));
            }

            let keep = check_reference(
                policy,
                categories.contains_key(&txn.category_id),
                "transaction",
                id,
                "category",
                txn.category_id,
            )? && check_reference(
                policy,
                accounts.contains_key(&txn.account_id),
                "transaction",
                id,
                "account",
                txn.account_id,
            )?;

            if keep {
                transactions.push(txn);
            } else {
                skipped_records += 1;
            }
        }
        transactions.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
        });

        let mut budgets = Vec::with_capacity(snapshot.budgets.len());
        for budget in snapshot.budgets {
            let id = budget.budget_id;
            ensure_magnitude("budget", id, "amount", budget.amount)?;
            if let Some(end) = budget.end_date {
                if end < budget.start_date {
                    return Err(invalid(
                        "budget",
                        id,
                        format!("end_date {} is before start_date {}", end, budget.start_date),
                    ));
                }
            }

            if check_reference(
                policy,
                categories.contains_key(&budget.category_id),
                "budget",
                id,
                "category",
                budget.category_id,
            )? {
                budgets.push(budget);
            } else {
                skipped_records += 1;
            }
        }
        budgets.sort_by_key(|b| b.budget_id);

        let mut goals = snapshot.goals;
        for goal in &goals {
            let id = goal.goal_id;
            ensure_magnitude("goal", id, "target_amount", goal.target_amount)?;
            ensure_magnitude("goal", id, "current_amount", goal.current_amount)?;
            if !(1..=5).contains(&goal.priority) {
                return Err(invalid(
                    "goal",
                    id,
                    format!("priority {} is outside 1-5", goal.priority),
                ));
            }
        }
        goals.sort_by_key(|g| g.goal_id);

        let mut debts = snapshot.debts;
        for debt in &debts {
            let id = debt.debt_id;
            ensure_magnitude("debt", id, "principal", debt.principal)?;
            ensure_finite("debt", id, "current_balance", debt.current_balance)?;
            ensure_magnitude("debt", id, "interest_rate", debt.interest_rate)?;
            ensure_magnitude("debt", id, "minimum_payment", debt.minimum_payment)?;
            if !(1..=31).contains(&debt.due_day) {
                return Err(invalid(
                    "debt",
                    id,
                    format!("due_day {} is outside 1-31", debt.due_day),
                ));
            }
        }
        debts.sort_by_key(|d| d.debt_id);

        let mut recurring = Vec::with_capacity(snapshot.recurring.len());
        for item in snapshot.recurring {
            let id = item.recurring_id;
            ensure_magnitude("recurring transaction", id, "amount", item.amount)?;

            let mut keep = check_reference(
                policy,
                categories.contains_key(&item.category_id),
                "recurring transaction",
                id,
                "category",
                item.category_id,
            )?;
            if keep {
                if let Some(account_id) = item.account_id {
                    keep = check_reference(
                        policy,
                        accounts.contains_key(&account_id),
                        "recurring transaction",
                        id,
                        "account",
                        account_id,
                    )?;
                }
            }

            if keep {
                recurring.push(item);
            } else {
                skipped_records += 1;
            }
        }
        recurring.sort_by_key(|r| r.recurring_id);

        info!(
            "Record store built: {} categories, {} accounts, {} transactions, {} budgets, {} goals, {} debts, {} recurring items",
            categories.len(),
            accounts.len(),
            transactions.len(),
            budgets.len(),
            goals.len(),
            debts.len(),
            recurring.len()
        );
        if skipped_records > 0 {
            warn!("{} records skipped because of unknown references", skipped_records);
        }

        Ok(Self {
            categories,
            accounts,
            transactions,
            budgets,
            goals,
            debts,
            recurring,
            skipped_records,
        })
    }

    pub fn category(&self, category_id: i64) -> Option<&Category> {
        self.categories.get(&category_id)
    }

    /// Name of the category, or an empty string when it is unknown.
    pub fn category_name(&self, category_id: i64) -> &str {
        self.categories
            .get(&category_id)
            .map(|c| c.name.as_str())
            .unwrap_or_default()
    }

    /// Categories ordered by identifier.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn account(&self, account_id: i64) -> Option<&Account> {
        self.accounts.get(&account_id)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn debits(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(|t| t.is_debit())
    }

    pub fn budgets(&self) -> &[Budget] {
        &self.budgets
    }

    pub fn goals(&self) -> &[FinancialGoal] {
        &self.goals
    }

    pub fn debts(&self) -> &[Debt] {
        &self.debts
    }

    pub fn recurring(&self) -> &[RecurringTransaction] {
        &self.recurring
    }

    /// Number of records dropped under [`ReferencePolicy::SkipAndLog`].
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }
}

fn invalid(entity: &'static str, id: i64, details: String) -> AnalyticsError {
    AnalyticsError::InvalidRecord {
        entity,
        id,
        details,
    }
}

fn ensure_finite(entity: &'static str, id: i64, field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(invalid(entity, id, format!("{} is not a finite number", field)));
    }
    Ok(())
}

fn ensure_magnitude(entity: &'static str, id: i64, field: &str, value: f64) -> Result<()> {
    ensure_finite(entity, id, field, value)?;
    if value < 0.0 {
        return Err(invalid(
            entity,
            id,
            format!("{} must be a non-negative magnitude, got {}", field, value),
        ));
    }
    Ok(())
}

/// Returns whether the record should be kept.
fn check_reference(
    policy: ReferencePolicy,
    found: bool,
    entity: &'static str,
    id: i64,
    reference: &'static str,
    reference_id: i64,
) -> Result<bool> {
    if found {
        return Ok(true);
    }

    match policy {
        ReferencePolicy::Abort => Err(AnalyticsError::UnknownReference {
            entity,
            id,
            reference,
            reference_id,
        }),
        ReferencePolicy::SkipAndLog => {
            warn!(
                "Skipping {} {}: unknown {} {}",
                entity, id, reference, reference_id
            );
            Ok(false)
        }
    }
}
