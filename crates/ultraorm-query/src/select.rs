//! SELECT and COUNT compilation.
//!
//! Compiles accumulated query state into
//! `SELECT <projection> FROM <table> [WHERE ...] [ORDER BY ...]
//! [LIMIT <n>] [OFFSET <n>]`. Only structural text (column names, the
//! ORDER BY clause, LIMIT/OFFSET integers) is interpolated; every literal
//! value is bound as a parameter.

use ultraorm_core::{Dialect, Value};

use crate::conditions::{ConditionList, SortDirection};

/// SELECT query builder.
///
/// # Example
///
/// ```
/// use ultraorm_core::{Dialect, Value};
/// use ultraorm_query::{SelectBuilder, SortDirection};
///
/// let mut select = SelectBuilder::new("users");
/// select.condition([("status", "active")]);
/// let (sql, params) = select
///     .order_by("created_at", SortDirection::Desc)
///     .limit(10)
///     .build_with_dialect(Dialect::MySql);
/// assert_eq!(
///     sql,
///     "SELECT * FROM users WHERE status = ? ORDER BY created_at DESC LIMIT 10"
/// );
/// assert_eq!(params, vec![Value::from("active")]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SelectBuilder {
    table: String,
    conditions: ConditionList,
    sorts: Vec<(String, SortDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
    projection: Option<Vec<String>>,
}

impl SelectBuilder {
    /// Create a builder for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Append one condition group.
    pub fn condition<I, K, V>(&mut self, group: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.conditions.push(group);
        self
    }

    /// Replace the accumulated conditions wholesale.
    pub fn conditions(&mut self, conditions: ConditionList) -> &mut Self {
        self.conditions = conditions;
        self
    }

    /// Append one sort pair.
    pub fn order_by(&mut self, column: impl Into<String>, direction: SortDirection) -> &mut Self {
        self.sorts.push((column.into(), direction));
        self
    }

    /// Set the row limit.
    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Set the row offset.
    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Replace the projection list. An empty list restores `*`.
    pub fn projection<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        self.projection = if columns.is_empty() { None } else { Some(columns) };
        self
    }

    fn where_clause(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let flat = self.conditions.flatten();
        if flat.is_empty() {
            return (String::new(), Vec::new());
        }
        let clauses: Vec<String> = flat
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{column} = {}", dialect.placeholder(i + 1)))
            .collect();
        let params = flat.into_iter().map(|(_, value)| value).collect();
        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }

    /// Build the SELECT SQL and parameters with the default dialect.
    #[must_use]
    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the SELECT SQL and parameters with a specific dialect.
    #[must_use]
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let projection = match &self.projection {
            Some(columns) => columns.join(", "),
            None => "*".to_string(),
        };
        let mut sql = format!("SELECT {projection} FROM {}", self.table);

        let (where_sql, params) = self.where_clause(dialect);
        sql.push_str(&where_sql);

        if !self.sorts.is_empty() {
            let orders: Vec<String> = self
                .sorts
                .iter()
                .map(|(column, direction)| format!("{column} {}", direction.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        tracing::trace!(sql = %sql, "compiled select");
        (sql, params)
    }

    /// Build the matching `SELECT COUNT(*)` statement. Sorts, limit,
    /// offset, and projection do not apply to counts.
    #[must_use]
    pub fn build_count(&self) -> (String, Vec<Value>) {
        self.build_count_with_dialect(Dialect::default())
    }

    /// Build the COUNT statement with a specific dialect.
    #[must_use]
    pub fn build_count_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let (where_sql, params) = self.where_clause(dialect);
        sql.push_str(&where_sql);
        tracing::trace!(sql = %sql, "compiled count");
        (sql, params)
    }
}
