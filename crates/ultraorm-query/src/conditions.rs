//! Accumulated filter state.
//!
//! Each `filter` call on a query contributes one condition group (a mapping
//! of column to value). Groups are kept in call order and flattened into a
//! single mapping at compile time: a column keeps the position of its first
//! appearance but the value of its last.

use ultraorm_core::Value;

/// Sort direction for an ORDER BY pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// SQL keyword for this direction.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Ordered list of condition groups, flattened last-write-wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionList {
    groups: Vec<Vec<(String, Value)>>,
}

impl ConditionList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one condition group.
    pub fn push<I, K, V>(&mut self, group: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.groups.push(
            group
                .into_iter()
                .map(|(column, value)| (column.into(), value.into()))
                .collect(),
        );
    }

    /// True when no group carries any entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Vec::is_empty)
    }

    /// Number of appended groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Column names mentioned by any group, in first-appearance order.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for group in &self.groups {
            for (column, _) in group {
                if !columns.contains(&column.as_str()) {
                    columns.push(column);
                }
            }
        }
        columns
    }

    /// Flatten the groups into one mapping. A column repeated across groups
    /// keeps its first position and its last value.
    #[must_use]
    pub fn flatten(&self) -> Vec<(String, Value)> {
        let mut flat: Vec<(String, Value)> = Vec::new();
        for group in &self.groups {
            for (column, value) in group {
                match flat.iter_mut().find(|(existing, _)| existing == column) {
                    Some(entry) => entry.1 = value.clone(),
                    None => flat.push((column.clone(), value.clone())),
                }
            }
        }
        flat
    }
}
