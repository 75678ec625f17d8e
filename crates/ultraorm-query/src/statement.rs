//! INSERT, UPDATE, and DELETE compilation.
//!
//! Write statements are built from explicit column/value pairs supplied by
//! the persistence layer. UPDATE and DELETE are always keyed by a single
//! primary-key column; every value is bound as a parameter.

use ultraorm_core::{Dialect, Value};

/// INSERT statement builder.
///
/// # Example
///
/// ```
/// use ultraorm_core::{Dialect, Value};
/// use ultraorm_query::InsertBuilder;
///
/// let (sql, params) = InsertBuilder::new("users")
///     .value("name", "Ada")
///     .value("age", 36)
///     .build_with_dialect(Dialect::MySql);
/// assert_eq!(sql, "INSERT INTO users (name, age) VALUES (?, ?)");
/// assert_eq!(params, vec![Value::from("Ada"), Value::from(36)]);
/// ```
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: String,
    assignments: Vec<(String, Value)>,
}

impl InsertBuilder {
    /// Create a builder for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
        }
    }

    /// Append one column/value pair.
    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    /// Append many column/value pairs.
    #[must_use]
    pub fn values<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.assignments
            .extend(pairs.into_iter().map(|(column, value)| (column.into(), value.into())));
        self
    }

    /// True when no pair has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Build the INSERT SQL and parameters with the default dialect.
    #[must_use]
    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the INSERT SQL and parameters with a specific dialect.
    #[must_use]
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let columns: Vec<&str> = self.assignments.iter().map(|(c, _)| c.as_str()).collect();
        let placeholders: Vec<String> = (1..=self.assignments.len())
            .map(|i| dialect.placeholder(i))
            .collect();
        let params: Vec<Value> = self.assignments.iter().map(|(_, v)| v.clone()).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        );
        tracing::trace!(sql = %sql, "compiled insert");
        (sql, params)
    }
}

/// UPDATE statement builder, keyed by one primary-key column.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: String,
    assignments: Vec<(String, Value)>,
    key_column: String,
    key_value: Value,
}

impl UpdateBuilder {
    /// Create a builder for `table`, keyed on `key_column = key_value`.
    pub fn new(
        table: impl Into<String>,
        key_column: impl Into<String>,
        key_value: impl Into<Value>,
    ) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            key_column: key_column.into(),
            key_value: key_value.into(),
        }
    }

    /// Append one SET pair.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    /// True when no SET pair has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Build the UPDATE SQL and parameters with the default dialect.
    /// Returns empty SQL when there is nothing to set.
    #[must_use]
    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the UPDATE SQL and parameters with a specific dialect.
    #[must_use]
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        if self.assignments.is_empty() {
            return (String::new(), Vec::new());
        }
        let sets: Vec<String> = self
            .assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{column} = {}", dialect.placeholder(i + 1)))
            .collect();
        let mut params: Vec<Value> = self.assignments.iter().map(|(_, v)| v.clone()).collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.table,
            sets.join(", "),
            self.key_column,
            dialect.placeholder(params.len() + 1)
        );
        params.push(self.key_value.clone());
        tracing::trace!(sql = %sql, "compiled update");
        (sql, params)
    }
}

/// DELETE statement builder, keyed by one primary-key column.
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    table: String,
    key_column: String,
    key_value: Value,
}

impl DeleteBuilder {
    /// Create a builder for `table`, keyed on `key_column = key_value`.
    pub fn new(
        table: impl Into<String>,
        key_column: impl Into<String>,
        key_value: impl Into<Value>,
    ) -> Self {
        Self {
            table: table.into(),
            key_column: key_column.into(),
            key_value: key_value.into(),
        }
    }

    /// Build the DELETE SQL and parameters with the default dialect.
    #[must_use]
    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the DELETE SQL and parameters with a specific dialect.
    #[must_use]
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            self.table,
            self.key_column,
            dialect.placeholder(1)
        );
        tracing::trace!(sql = %sql, "compiled delete");
        (sql, vec![self.key_value.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_basic() {
        let (sql, params) = InsertBuilder::new("users")
            .value("name", "Ada")
            .value("age", 36)
            .build_with_dialect(Dialect::MySql);
        assert_eq!(sql, "INSERT INTO users (name, age) VALUES (?, ?)");
        assert_eq!(params, vec![Value::from("Ada"), Value::from(36)]);
    }

    #[test]
    fn test_insert_postgres() {
        let (sql, _) = InsertBuilder::new("users")
            .value("name", "Ada")
            .value("age", 36)
            .build_with_dialect(Dialect::Postgres);
        assert_eq!(sql, "INSERT INTO users (name, age) VALUES ($1, $2)");
    }

    #[test]
    fn test_insert_preserves_pair_order() {
        let (sql, _) = InsertBuilder::new("t")
            .values([("b", 2), ("a", 1), ("c", 3)])
            .build_with_dialect(Dialect::MySql);
        assert_eq!(sql, "INSERT INTO t (b, a, c) VALUES (?, ?, ?)");
    }

    #[test]
    fn test_update_basic() {
        let (sql, params) = UpdateBuilder::new("users", "id", 7)
            .set("name", "Grace")
            .set("age", 45)
            .build_with_dialect(Dialect::MySql);
        assert_eq!(sql, "UPDATE users SET name = ?, age = ? WHERE id = ?");
        assert_eq!(
            params,
            vec![Value::from("Grace"), Value::from(45), Value::from(7)]
        );
    }

    #[test]
    fn test_update_postgres_key_placeholder_numbered_after_sets() {
        let (sql, _) = UpdateBuilder::new("users", "id", 7)
            .set("name", "Grace")
            .build_with_dialect(Dialect::Postgres);
        assert_eq!(sql, "UPDATE users SET name = $1 WHERE id = $2");
    }

    #[test]
    fn test_update_empty_sets_builds_nothing() {
        let (sql, params) = UpdateBuilder::new("users", "id", 7).build_with_dialect(Dialect::MySql);
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn test_delete() {
        let (sql, params) = DeleteBuilder::new("users", "id", 7).build_with_dialect(Dialect::MySql);
        assert_eq!(sql, "DELETE FROM users WHERE id = ?");
        assert_eq!(params, vec![Value::from(7)]);
    }

    #[test]
    fn test_delete_postgres() {
        let (sql, _) = DeleteBuilder::new("users", "id", 7).build_with_dialect(Dialect::Postgres);
        assert_eq!(sql, "DELETE FROM users WHERE id = $1");
    }
}
