use chrono::{NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    #[schemars(description = "Money coming in (salary, freelance, dividends). Counts towards total income.")]
    Income,

    #[schemars(description = "Money going out (groceries, rent, utilities). Debits count towards total expenses.")]
    Expense,

    #[schemars(description = "Internal movement between accounts. Ignored by income and expense calculations.")]
    Transfer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Checking,
    Savings,
    CreditCard,
    Investment,
    Loan,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[schemars(description = "Money leaving the account. The only type that counts as spend.")]
    Debit,

    #[schemars(description = "Money entering the account.")]
    Credit,

    #[schemars(description = "Movement between the user's own accounts.")]
    Transfer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Monthly,
    Quarterly,
    Yearly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Category {
    pub category_id: i64,

    #[schemars(description = "Display name, e.g. 'Groceries'. Used as a path segment in the category hierarchy.")]
    pub name: String,

    #[serde(default)]
    #[schemars(description = "Parent category identifier. Null for root categories.")]
    pub parent_id: Option<i64>,

    pub category_type: CategoryType,

    #[serde(default)]
    pub is_essential: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Account {
    pub account_id: i64,
    pub name: String,
    pub account_type: AccountType,

    #[schemars(description = "Signed current balance. Negative for credit card and loan debt.")]
    pub current_balance: f64,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    pub transaction_id: i64,
    pub account_id: i64,
    pub category_id: i64,
    pub date: NaiveDate,

    #[schemars(
        description = "Non-negative magnitude of the transaction. Direction is carried by transaction_type, never by the sign."
    )]
    pub amount: f64,

    pub transaction_type: TransactionType,

    #[serde(default)]
    pub merchant: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub is_recurring: bool,

    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Transaction {
    pub fn is_debit(&self) -> bool {
        self.transaction_type == TransactionType::Debit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Budget {
    pub budget_id: i64,
    pub category_id: i64,
    pub period: BudgetPeriod,
    pub amount: f64,
    pub start_date: NaiveDate,

    #[serde(default)]
    #[schemars(description = "Last day the budget applies. Null means open-ended.")]
    pub end_date: Option<NaiveDate>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    #[schemars(
        description = "When the budget row was created. Used to pick the most recent row when several active budgets overlap."
    )]
    pub created_at: Option<NaiveDateTime>,
}

impl Budget {
    /// True when the budget is in effect for every day of `[start, end]`.
    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= start && self.end_date.map_or(true, |e| e >= end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FinancialGoal {
    pub goal_id: i64,
    pub name: String,

    #[schemars(description = "Free-form goal type, e.g. 'emergency_fund', 'vacation', 'retirement'.")]
    pub goal_type: String,

    pub target_amount: f64,
    pub current_amount: f64,
    pub target_date: NaiveDate,

    #[schemars(description = "1 (highest) to 5 (lowest).")]
    pub priority: u8,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Debt {
    pub debt_id: i64,
    pub name: String,
    pub debt_type: String,
    pub principal: f64,
    pub current_balance: f64,

    #[schemars(description = "Annual interest rate as a percentage, e.g. 18.99.")]
    pub interest_rate: f64,

    pub minimum_payment: f64,

    #[schemars(description = "Day of month the payment is due, 1-31.")]
    pub due_day: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecurringTransaction {
    pub recurring_id: i64,

    #[serde(default)]
    pub account_id: Option<i64>,

    pub category_id: i64,
    pub description: String,
    pub amount: f64,
    pub frequency: Frequency,
    pub start_date: NaiveDate,

    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    pub next_occurrence: NaiveDate,
}

/// Complete hand-off from the ingestion side for one computation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RecordSnapshot {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub goals: Vec<FinancialGoal>,
    #[serde(default)]
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub recurring: Vec<RecurringTransaction>,
}

impl RecordSnapshot {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RecordSnapshot)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
