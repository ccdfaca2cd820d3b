use anyhow::Result;
use chrono::NaiveDate;
use finance_analytics::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

const HOUSEHOLD_SNAPSHOT: &str = r#"{
    "categories": [
        { "category_id": 10, "name": "Food", "category_type": "expense", "is_essential": true },
        { "category_id": 1, "name": "Groceries", "parent_id": 10, "category_type": "expense" },
        { "category_id": 2, "name": "Salary", "category_type": "income" },
        { "category_id": 3, "name": "Rent", "category_type": "expense", "is_essential": true }
    ],
    "accounts": [
        { "account_id": 1, "name": "Everyday", "account_type": "checking", "current_balance": 2800.0 }
    ],
    "transactions": [
        { "transaction_id": 1, "account_id": 1, "category_id": 2, "date": "2024-05-01",
          "amount": 5000.0, "transaction_type": "credit", "description": "Payroll" },
        { "transaction_id": 2, "account_id": 1, "category_id": 1, "date": "2024-05-03",
          "amount": 400.0, "transaction_type": "debit", "merchant": "Fresh Market" },
        { "transaction_id": 3, "account_id": 1, "category_id": 1, "date": "2024-05-17",
          "amount": 300.0, "transaction_type": "debit", "merchant": "Fresh Market",
          "tags": ["weekly"] },
        { "transaction_id": 4, "account_id": 1, "category_id": 3, "date": "2024-05-01",
          "amount": 1500.0, "transaction_type": "debit", "merchant": "Oak Street Lettings",
          "is_recurring": true }
    ],
    "budgets": [
        { "budget_id": 1, "category_id": 1, "period": "monthly", "amount": 800.0,
          "start_date": "2024-01-01" },
        { "budget_id": 2, "category_id": 3, "period": "monthly", "amount": 1500.0,
          "start_date": "2024-01-01", "end_date": "2024-12-31" }
    ],
    "goals": [
        { "goal_id": 1, "name": "Emergency fund", "goal_type": "emergency_fund",
          "target_amount": 6000.0, "current_amount": 1500.0, "target_date": "2024-11-27",
          "priority": 1 }
    ],
    "debts": [
        { "debt_id": 1, "name": "Card", "debt_type": "credit_card", "principal": 2000.0,
          "current_balance": 1200.0, "interest_rate": 18.99, "minimum_payment": 35.0,
          "due_day": 15 }
    ],
    "recurring": [
        { "recurring_id": 1, "account_id": 1, "category_id": 3, "description": "Rent",
          "amount": 1500.0, "frequency": "monthly", "start_date": "2023-01-01",
          "next_occurrence": "2024-06-01" }
    ]
}"#;

fn may_params() -> Result<RunParameters> {
    Ok(RunParameters::new(TargetPeriod::parse("2024-05")?, date(2024, 5, 31)))
}

#[test]
fn test_household_snapshot_end_to_end() -> Result<()> {
    let snapshot = RecordSnapshot::from_json(HOUSEHOLD_SNAPSHOT)?;
    let report = process_snapshot(snapshot, AnalyticsConfig::default(), &may_params()?)?;

    let savings = &report.savings[0];
    assert_eq!(savings.month, date(2024, 5, 1));
    assert_eq!(savings.total_income, 5000.0);
    assert_eq!(savings.total_expenses, 2200.0);
    assert_eq!(savings.net_savings, 2800.0);
    assert_eq!(savings.savings_rate_pct, Ratio::Defined(56.0));

    let groceries = report
        .hierarchy
        .iter()
        .find(|c| c.category_id == 1)
        .expect("groceries resolved");
    assert_eq!(groceries.path, "Food.Groceries");
    assert_eq!(groceries.depth, 1);
    assert_eq!(groceries.root_id, 10);

    let food = report
        .category_rollup
        .iter()
        .find(|r| r.category_id == 10)
        .expect("food rolled up");
    assert_eq!(food.own_total, 0.0);
    assert_eq!(food.subtree_total, 700.0);
    assert_eq!(food.subtree_count, 2);

    let rent = report
        .budget_variance
        .iter()
        .find(|r| r.category_id == 3)
        .expect("rent budget");
    assert_eq!(rent.variance, 0.0);
    assert_eq!(rent.percent_used, Ratio::Defined(100.0));
    assert_eq!(report.budget_variance[0].category_id, 3);
    assert_eq!(report.budget_alerts.len(), 1);
    assert_eq!(report.budget_alerts[0].severity, AlertSeverity::Warning);

    let goal = &report.goals[0];
    assert_eq!(goal.days_remaining, 180);
    assert_eq!(goal.monthly_savings_needed, 750.0);
    assert_eq!(goal.pct_complete, Ratio::Defined(25.0));

    let top: Vec<i64> = report.top_expenses.iter().map(|r| r.transaction_id).collect();
    assert_eq!(top, vec![4, 2, 3]);

    assert!(report.anomalies.is_empty());
    Ok(())
}

#[test]
fn test_input_order_does_not_change_output() -> Result<()> {
    let snapshot = RecordSnapshot::from_json(HOUSEHOLD_SNAPSHOT)?;
    let mut shuffled = snapshot.clone();
    shuffled.categories.reverse();
    shuffled.transactions.reverse();
    shuffled.budgets.reverse();

    let params = may_params()?;
    let first = process_snapshot(snapshot, AnalyticsConfig::default(), &params)?.to_json()?;
    let second = process_snapshot(shuffled, AnalyticsConfig::default(), &params)?.to_json()?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_unknown_reference_policies() -> Result<()> {
    let mut snapshot = RecordSnapshot::from_json(HOUSEHOLD_SNAPSHOT)?;
    let mut orphan = snapshot.transactions[1].clone();
    orphan.transaction_id = 99;
    orphan.category_id = 404;
    snapshot.transactions.push(orphan);

    let aborted = RecordStore::from_snapshot(snapshot.clone(), ReferencePolicy::Abort);
    assert!(matches!(
        aborted,
        Err(AnalyticsError::UnknownReference { id: 99, reference_id: 404, .. })
    ));

    let store = RecordStore::from_snapshot(snapshot, ReferencePolicy::SkipAndLog)?;
    assert_eq!(store.skipped_records(), 1);
    assert_eq!(store.transactions().len(), 4);
    Ok(())
}

#[test]
fn test_cyclic_hierarchy_aborts_run() -> Result<()> {
    let mut snapshot = RecordSnapshot::from_json(HOUSEHOLD_SNAPSHOT)?;
    for category in snapshot.categories.iter_mut() {
        if category.category_id == 10 {
            category.parent_id = Some(1);
        }
    }

    let result = process_snapshot(snapshot, AnalyticsConfig::default(), &may_params()?);
    match result {
        Err(AnalyticsError::CyclicHierarchy { category_ids }) => {
            assert_eq!(category_ids, vec![1, 10]);
        }
        other => panic!("expected a cyclic hierarchy error, got {:?}", other.map(|_| ())),
    }
    Ok(())
}

#[test]
fn test_monthly_trend_window() -> Result<()> {
    let mut snapshot = RecordSnapshot::from_json(HOUSEHOLD_SNAPSHOT)?;
    snapshot.transactions.clear();
    for (i, amount) in [100.0, 200.0, 300.0, 400.0].into_iter().enumerate() {
        snapshot.transactions.push(Transaction {
            transaction_id: i as i64 + 1,
            account_id: 1,
            category_id: 3,
            date: date(2024, i as u32 + 1, 15),
            amount,
            transaction_type: TransactionType::Debit,
            merchant: None,
            description: None,
            is_recurring: false,
            tags: Default::default(),
        });
    }

    let store = RecordStore::from_snapshot(snapshot, ReferencePolicy::Abort)?;
    let rows = WindowedAggregator::new(Granularity::Month, 3)?.aggregate(
        &store,
        Dimension::Category,
        None,
    );

    let averages: Vec<f64> = rows.iter().map(|r| r.moving_average).collect();
    let deltas: Vec<Option<f64>> = rows.iter().map(|r| r.delta).collect();
    assert_eq!(averages, vec![100.0, 150.0, 200.0, 300.0]);
    assert_eq!(deltas, vec![None, Some(100.0), Some(100.0), Some(100.0)]);

    let quarterly = WindowedAggregator::new(Granularity::Quarter, 3)?.aggregate(
        &store,
        Dimension::Overall,
        Some((date(2024, 2, 1), date(2024, 12, 31))),
    );
    assert_eq!(quarterly.len(), 2);
    assert_eq!(quarterly[0].total, 500.0);
    assert_eq!(quarterly[1].total, 400.0);
    assert_eq!(quarterly[1].delta, Some(-100.0));
    Ok(())
}

#[test]
fn test_result_rows_export_as_csv() -> Result<()> {
    let mut snapshot = RecordSnapshot::from_json(HOUSEHOLD_SNAPSHOT)?;
    let mut june_rent = snapshot.transactions[3].clone();
    june_rent.transaction_id = 5;
    june_rent.date = date(2024, 6, 1);
    snapshot.transactions.push(june_rent);

    let store = RecordStore::from_snapshot(snapshot, ReferencePolicy::Abort)?;
    let rows = savings_by_month(&store);

    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in &rows {
        writer.serialize(row)?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing csv writer: {}", e))?;
    let data = String::from_utf8(buffer)?;

    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let headers = reader.headers()?.clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["month", "total_income", "total_expenses", "net_savings", "savings_rate_pct"]
    );

    let records: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(records.len(), 2);
    assert_eq!(&records[0][0], "2024-06-01");
    assert_eq!(&records[0][4], "");
    assert_eq!(&records[1][0], "2024-05-01");
    assert_eq!(records[1][4].parse::<f64>()?, 56.0);
    Ok(())
}

#[test]
fn test_config_and_schema_surfaces() -> Result<()> {
    let config = AnalyticsConfig::from_json(
        r#"{ "anomaly_threshold": 3.0, "path_separator": " > ", "reference_policy": "skip_and_log" }"#,
    )?;
    assert_eq!(config.anomaly_threshold, 3.0);
    assert_eq!(config.merchant_top_n, 20);
    assert_eq!(config.reference_policy, ReferencePolicy::SkipAndLog);

    let snapshot = RecordSnapshot::from_json(HOUSEHOLD_SNAPSHOT)?;
    let report = process_snapshot(snapshot, config, &may_params()?)?;
    assert!(report.hierarchy.iter().any(|c| c.path == "Food > Groceries"));

    assert!(AnalyticsConfig::from_json(r#"{ "moving_average_window": 0 }"#).is_err());

    let schema = RecordSnapshot::schema_as_json()?;
    assert!(schema.contains("transactions"));
    assert!(schema.contains("Non-negative magnitude"));
    Ok(())
}
