use crate::error::{AnalyticsError, Result};
use crate::schema::Category;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Position of one category inside the category tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPath {
    pub category_id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    /// Names from the root down to this category, joined by the separator.
    pub path: String,
    /// Number of ancestors; roots are depth 0.
    pub depth: usize,
    pub root_id: i64,
    /// Ancestor identifiers ordered from the root down to the direct parent.
    pub ancestor_ids: Vec<i64>,
}

pub type CategoryHierarchy = BTreeMap<i64, CategoryPath>;

pub struct HierarchyResolver<'a> {
    separator: &'a str,
}

impl<'a> HierarchyResolver<'a> {
    pub fn new(separator: &'a str) -> Self {
        Self { separator }
    }

    /// Expands the parent graph breadth-first from the roots.
    ///
    /// Every category must be reachable from a root. Categories whose parent
    /// chain loops back on itself never are, and the whole call fails with
    /// [`AnalyticsError::CyclicHierarchy`] naming them.
    pub fn resolve<'c, I>(&self, categories: I) -> Result<CategoryHierarchy>
    where
        I: IntoIterator<Item = &'c Category>,
    {
        let by_id: BTreeMap<i64, &Category> = categories
            .into_iter()
            .map(|c| (c.category_id, c))
            .collect();

        let mut children: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        let mut queue: VecDeque<i64> = VecDeque::new();

        for category in by_id.values() {
            match category.parent_id {
                None => queue.push_back(category.category_id),
                Some(parent_id) => {
                    if !by_id.contains_key(&parent_id) {
                        return Err(AnalyticsError::UnknownReference {
                            entity: "category",
                            id: category.category_id,
                            reference: "parent category",
                            reference_id: parent_id,
                        });
                    }
                    children
                        .entry(parent_id)
                        .or_default()
                        .push(category.category_id);
                }
            }
        }

        let mut resolved: CategoryHierarchy = BTreeMap::new();
        let mut visited: BTreeSet<i64> = BTreeSet::new();

        for &root_id in &queue {
            let root = by_id[&root_id];
            visited.insert(root_id);
            resolved.insert(
                root_id,
                CategoryPath {
                    category_id: root_id,
                    name: root.name.clone(),
                    parent_id: None,
                    path: root.name.clone(),
                    depth: 0,
                    root_id,
                    ancestor_ids: Vec::new(),
                },
            );
        }

        while let Some(current_id) = queue.pop_front() {
            let Some(child_ids) = children.get(&current_id) else {
                continue;
            };

            for &child_id in child_ids {
                if !visited.insert(child_id) {
                    return Err(AnalyticsError::CyclicHierarchy {
                        category_ids: vec![child_id],
                    });
                }

                let parent = &resolved[&current_id];
                let child = by_id[&child_id];

                let mut ancestor_ids = parent.ancestor_ids.clone();
                ancestor_ids.push(current_id);

                let entry = CategoryPath {
                    category_id: child_id,
                    name: child.name.clone(),
                    parent_id: Some(current_id),
                    path: format!("{}{}{}", parent.path, self.separator, child.name),
                    depth: parent.depth + 1,
                    root_id: parent.root_id,
                    ancestor_ids,
                };
                resolved.insert(child_id, entry);
                queue.push_back(child_id);
            }
        }

        if resolved.len() != by_id.len() {
            let unreachable: Vec<i64> = by_id
                .keys()
                .filter(|id| !visited.contains(id))
                .copied()
                .collect();
            return Err(AnalyticsError::CyclicHierarchy {
                category_ids: unreachable,
            });
        }

        debug!(
            "Resolved hierarchy for {} categories (max depth {})",
            resolved.len(),
            resolved.values().map(|p| p.depth).max().unwrap_or(0)
        );

        Ok(resolved)
    }
}

pub fn resolve_hierarchy<'c, I>(categories: I, separator: &str) -> Result<CategoryHierarchy>
where
    I: IntoIterator<Item = &'c Category>,
{
    HierarchyResolver::new(separator).resolve(categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CategoryType;
    use crate::store::fixtures::category;

    fn sample_categories() -> Vec<Category> {
        vec![
            category(1, "Housing", None, CategoryType::Expense),
            category(2, "Rent", Some(1), CategoryType::Expense),
            category(3, "Utilities", Some(1), CategoryType::Expense),
            category(4, "Electricity", Some(3), CategoryType::Expense),
            category(5, "Income", None, CategoryType::Income),
            category(6, "Salary", Some(5), CategoryType::Income),
        ]
    }

    #[test]
    fn test_paths_and_depths() {
        let categories = sample_categories();
        let hierarchy = resolve_hierarchy(&categories, ".").unwrap();

        assert_eq!(hierarchy.len(), 6);
        assert_eq!(hierarchy[&1].path, "Housing");
        assert_eq!(hierarchy[&1].depth, 0);
        assert_eq!(hierarchy[&4].path, "Housing.Utilities.Electricity");
        assert_eq!(hierarchy[&4].depth, 2);
        assert_eq!(hierarchy[&4].ancestor_ids, vec![1, 3]);
        assert_eq!(hierarchy[&4].root_id, 1);
        assert_eq!(hierarchy[&6].path, "Income.Salary");
        assert_eq!(hierarchy[&6].root_id, 5);
    }

    #[test]
    fn test_depth_equals_ancestor_count() {
        let categories = sample_categories();
        let hierarchy = resolve_hierarchy(&categories, " > ").unwrap();

        for entry in hierarchy.values() {
            assert!(!entry.path.is_empty());
            assert_eq!(entry.depth, entry.ancestor_ids.len());

            let mut count = 0;
            let mut current = entry.parent_id;
            while let Some(parent) = current {
                count += 1;
                current = hierarchy[&parent].parent_id;
            }
            assert_eq!(entry.depth, count);
        }
        assert_eq!(hierarchy[&2].path, "Housing > Rent");
    }

    #[test]
    fn test_cycle_detected() {
        let mut categories = sample_categories();
        categories.push(category(7, "Loop A", Some(8), CategoryType::Expense));
        categories.push(category(8, "Loop B", Some(7), CategoryType::Expense));
        categories.push(category(9, "Under Loop", Some(8), CategoryType::Expense));

        let err = resolve_hierarchy(&categories, ".").unwrap_err();
        match err {
            AnalyticsError::CyclicHierarchy { category_ids } => {
                assert_eq!(category_ids, vec![7, 8, 9]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let categories = vec![category(1, "Self", Some(1), CategoryType::Expense)];
        assert!(matches!(
            resolve_hierarchy(&categories, "."),
            Err(AnalyticsError::CyclicHierarchy { .. })
        ));
    }

    #[test]
    fn test_missing_parent_is_unknown_reference() {
        let categories = vec![category(2, "Orphan", Some(42), CategoryType::Expense)];
        assert!(matches!(
            resolve_hierarchy(&categories, "."),
            Err(AnalyticsError::UnknownReference { reference_id: 42, .. })
        ));
    }

    #[test]
    fn test_empty_category_set() {
        let categories: Vec<Category> = Vec::new();
        assert!(resolve_hierarchy(&categories, ".").unwrap().is_empty());
    }
}
