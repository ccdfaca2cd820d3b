use crate::hierarchy::CategoryHierarchy;
use crate::store::RecordStore;
use crate::utils::TargetPeriod;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRollupRow {
    pub category_id: i64,
    pub name: String,
    pub path: String,
    pub depth: usize,
    /// Debits booked directly against this category.
    pub own_total: f64,
    pub own_count: usize,
    /// Debits booked against this category or any of its descendants.
    pub subtree_total: f64,
    pub subtree_count: usize,
}

#[derive(Default)]
struct Totals {
    own_total: f64,
    own_count: usize,
    subtree_total: f64,
    subtree_count: usize,
}

/// Rolls debit spend up the category tree.
///
/// Each transaction is added once to its own category and once to each of its
/// ancestors. Rows are returned for every category in the hierarchy, ordered by
/// path (then id), including categories with no spend.
pub fn rollup_spend(
    store: &RecordStore,
    hierarchy: &CategoryHierarchy,
    period: Option<&TargetPeriod>,
) -> Vec<CategoryRollupRow> {
    let mut totals: BTreeMap<i64, Totals> = BTreeMap::new();

    for txn in store.debits() {
        if period.map_or(false, |p| !p.contains(txn.date)) {
            continue;
        }
        let Some(entry) = hierarchy.get(&txn.category_id) else {
            continue;
        };

        let own = totals.entry(txn.category_id).or_default();
        own.own_total += txn.amount;
        own.own_count += 1;

        for id in entry.ancestor_ids.iter().chain(std::iter::once(&txn.category_id)) {
            let node = totals.entry(*id).or_default();
            node.subtree_total += txn.amount;
            node.subtree_count += 1;
        }
    }

    let mut rows: Vec<CategoryRollupRow> = hierarchy
        .values()
        .map(|entry| {
            let t = totals.remove(&entry.category_id).unwrap_or_default();
            CategoryRollupRow {
                category_id: entry.category_id,
                name: entry.name.clone(),
                path: entry.path.clone(),
                depth: entry.depth,
                own_total: t.own_total,
                own_count: t.own_count,
                subtree_total: t.subtree_total,
                subtree_count: t.subtree_count,
            }
        })
        .collect();

    rows.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.category_id.cmp(&b.category_id)));

    debug!("Category rollup produced {} rows", rows.len());
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::resolve_hierarchy;
    use crate::schema::{CategoryType, TransactionType};
    use crate::store::fixtures::*;
    use crate::utils::Granularity;

    #[test]
    fn test_rollup_attributes_spend_to_ancestors_once() {
        let store = store(
            vec![
                category(1, "Food", None, CategoryType::Expense),
                category(2, "Groceries", Some(1), CategoryType::Expense),
                category(3, "Restaurants", Some(1), CategoryType::Expense),
                category(4, "Fast Food", Some(3), CategoryType::Expense),
                category(5, "Salary", None, CategoryType::Income),
            ],
            vec![
                debit(1, 2, date(2024, 1, 3), 100.0),
                debit(2, 4, date(2024, 1, 4), 20.0),
                debit(3, 3, date(2024, 1, 5), 50.0),
                debit(4, 1, date(2024, 1, 6), 5.0),
                txn(5, 5, date(2024, 1, 1), 3000.0, TransactionType::Credit, None),
            ],
        );
        let hierarchy = resolve_hierarchy(store.categories(), ".").unwrap();
        let rows = rollup_spend(&store, &hierarchy, None);

        let paths: Vec<&str> = rows.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["Food", "Food.Groceries", "Food.Restaurants", "Food.Restaurants.Fast Food", "Salary"]
        );

        let food = &rows[0];
        assert_eq!(food.own_total, 5.0);
        assert_eq!(food.subtree_total, 175.0);
        assert_eq!(food.subtree_count, 4);

        let restaurants = &rows[2];
        assert_eq!(restaurants.own_total, 50.0);
        assert_eq!(restaurants.subtree_total, 70.0);

        let salary = &rows[4];
        assert_eq!(salary.subtree_total, 0.0);
        assert_eq!(salary.own_count, 0);
    }

    #[test]
    fn test_rollup_respects_period() {
        let store = store(
            vec![category(1, "Fun", None, CategoryType::Expense)],
            vec![
                debit(1, 1, date(2024, 1, 31), 10.0),
                debit(2, 1, date(2024, 2, 1), 30.0),
            ],
        );
        let hierarchy = resolve_hierarchy(store.categories(), ".").unwrap();
        let period = TargetPeriod::containing(date(2024, 2, 10), Granularity::Month);
        let rows = rollup_spend(&store, &hierarchy, Some(&period));

        assert_eq!(rows[0].own_total, 30.0);
        assert_eq!(rows[0].own_count, 1);
    }
}
