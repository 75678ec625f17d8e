//! Table storage and statement application.
//!
//! A [`Store`] holds every table of one named database. Rows are sparse
//! maps: a column never written stays absent and reads back as NULL.
//! Transactions are whole-store snapshots, restored on rollback.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use ultraorm_core::{Error, ExecResult, Result, Row, Value};

use crate::sql::{ColumnSpec, Projection, Statement};

#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    columns: Vec<ColumnSpec>,
    rows: Vec<HashMap<String, Value>>,
    next_auto_id: i64,
}

impl Table {
    fn new(columns: Vec<ColumnSpec>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            next_auto_id: 1,
        }
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    fn auto_increment_column(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.auto_increment)
    }
}

/// All tables of one named in-memory database.
#[derive(Debug, Clone, Default)]
pub(crate) struct Store {
    tables: HashMap<String, Table>,
}

impl Store {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::backend(format!("unknown table `{name}`")))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::backend(format!("unknown table `{name}`")))
    }

    pub(crate) fn execute(&mut self, statement: &Statement, params: &[Value]) -> Result<ExecResult> {
        match statement {
            Statement::CreateTable {
                table,
                if_not_exists,
                columns,
            } => self.create_table(table, *if_not_exists, columns),
            Statement::Insert { table, columns } => self.insert(table, columns, params),
            Statement::Update { table, sets, key } => self.update(table, sets, key, params),
            Statement::Delete { table, key } => self.delete(table, key, params),
            Statement::Select { .. } => {
                Err(Error::backend("SELECT must be issued as a query, not an execute"))
            }
        }
    }

    pub(crate) fn query(&self, statement: &Statement, params: &[Value]) -> Result<Vec<Row>> {
        match statement {
            Statement::Select {
                table,
                projection,
                conditions,
                order,
                limit,
                offset,
            } => self.select(table, projection, conditions, order, *limit, *offset, params),
            _ => Err(Error::backend("only SELECT can be issued as a query")),
        }
    }

    fn create_table(
        &mut self,
        name: &str,
        if_not_exists: bool,
        columns: &[ColumnSpec],
    ) -> Result<ExecResult> {
        if self.tables.contains_key(name) {
            if if_not_exists {
                return Ok(ExecResult::default());
            }
            return Err(Error::backend(format!("table `{name}` already exists")));
        }
        self.tables.insert(name.to_string(), Table::new(columns.to_vec()));
        tracing::debug!(table = name, "created table");
        Ok(ExecResult::default())
    }

    fn insert(&mut self, table_name: &str, columns: &[String], params: &[Value]) -> Result<ExecResult> {
        let table = self.table_mut(table_name)?;
        if params.len() != columns.len() {
            return Err(Error::backend(format!(
                "insert into `{table_name}` expected {} parameters, got {}",
                columns.len(),
                params.len()
            )));
        }
        for column in columns {
            if !table.has_column(column) {
                return Err(Error::backend(format!(
                    "unknown column `{column}` in table `{table_name}`"
                )));
            }
        }

        let mut row: HashMap<String, Value> = columns
            .iter()
            .cloned()
            .zip(params.iter().cloned())
            .collect();

        let auto_name = table.auto_increment_column().map(|c| c.name.clone());
        let mut last_insert_id = None;
        if let Some(auto_name) = auto_name {
            match row.get(&auto_name) {
                Some(Value::Int(n)) => {
                    table.next_auto_id = table.next_auto_id.max(n + 1);
                }
                Some(Value::Null) | None => {
                    let id = table.next_auto_id;
                    table.next_auto_id += 1;
                    row.insert(auto_name, Value::Int(id));
                    last_insert_id = Some(id);
                }
                Some(_) => {}
            }
        }

        table.rows.push(row);
        Ok(ExecResult {
            rows_affected: 1,
            last_insert_id,
        })
    }

    fn update(
        &mut self,
        table_name: &str,
        sets: &[String],
        key: &str,
        params: &[Value],
    ) -> Result<ExecResult> {
        let table = self.table_mut(table_name)?;
        if params.len() != sets.len() + 1 {
            return Err(Error::backend(format!(
                "update on `{table_name}` expected {} parameters, got {}",
                sets.len() + 1,
                params.len()
            )));
        }
        for column in sets {
            if !table.has_column(column) {
                return Err(Error::backend(format!(
                    "unknown column `{column}` in table `{table_name}`"
                )));
            }
        }
        if !table.has_column(key) {
            return Err(Error::backend(format!(
                "unknown column `{key}` in table `{table_name}`"
            )));
        }
        let key_value = &params[sets.len()];

        let mut affected = 0u64;
        for row in &mut table.rows {
            if !values_equal(row.get(key).unwrap_or(&Value::Null), key_value) {
                continue;
            }
            for (column, value) in sets.iter().zip(params.iter()) {
                row.insert(column.clone(), value.clone());
            }
            affected += 1;
        }
        Ok(ExecResult {
            rows_affected: affected,
            last_insert_id: None,
        })
    }

    fn delete(&mut self, table_name: &str, key: &str, params: &[Value]) -> Result<ExecResult> {
        let table = self.table_mut(table_name)?;
        let [key_value] = params else {
            return Err(Error::backend(format!(
                "delete on `{table_name}` expected 1 parameter, got {}",
                params.len()
            )));
        };
        if !table.has_column(key) {
            return Err(Error::backend(format!(
                "unknown column `{key}` in table `{table_name}`"
            )));
        }

        let before = table.rows.len();
        table
            .rows
            .retain(|row| !values_equal(row.get(key).unwrap_or(&Value::Null), key_value));
        Ok(ExecResult {
            rows_affected: (before - table.rows.len()) as u64,
            last_insert_id: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn select(
        &self,
        table_name: &str,
        projection: &Projection,
        conditions: &[String],
        order: &[(String, bool)],
        limit: Option<usize>,
        offset: Option<usize>,
        params: &[Value],
    ) -> Result<Vec<Row>> {
        let table = self.table(table_name)?;
        if params.len() != conditions.len() {
            return Err(Error::backend(format!(
                "select on `{table_name}` expected {} parameters, got {}",
                conditions.len(),
                params.len()
            )));
        }
        for column in conditions {
            if !table.has_column(column) {
                return Err(Error::backend(format!(
                    "unknown column `{column}` in table `{table_name}`"
                )));
            }
        }

        let mut matched: Vec<&HashMap<String, Value>> = table
            .rows
            .iter()
            .filter(|row| {
                conditions.iter().zip(params.iter()).all(|(column, wanted)| {
                    values_equal(row.get(column).unwrap_or(&Value::Null), wanted)
                })
            })
            .collect();

        if let Projection::Count = projection {
            let header = Arc::new(vec!["COUNT(*)".to_string()]);
            return Ok(vec![Row::new(header, vec![Value::Int(matched.len() as i64)])]);
        }

        if !order.is_empty() {
            matched.sort_by(|a, b| {
                for (column, ascending) in order {
                    let left = a.get(column).unwrap_or(&Value::Null);
                    let right = b.get(column).unwrap_or(&Value::Null);
                    let ordering = compare_values(left, right);
                    let ordering = if *ascending { ordering } else { ordering.reverse() };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let matched = matched
            .into_iter()
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX));

        let header: Vec<String> = match projection {
            Projection::All => table.columns.iter().map(|c| c.name.clone()).collect(),
            Projection::Columns(columns) => {
                for column in columns {
                    if !table.has_column(column) {
                        return Err(Error::backend(format!(
                            "unknown column `{column}` in table `{table_name}`"
                        )));
                    }
                }
                columns.clone()
            }
            // Returned early above.
            Projection::Count => Vec::new(),
        };
        let header = Arc::new(header);

        Ok(matched
            .map(|row| {
                let values = header
                    .iter()
                    .map(|column| row.get(column).cloned().unwrap_or(Value::Null))
                    .collect();
                Row::new(Arc::clone(&header), values)
            })
            .collect())
    }
}

/// Equality with numeric unification: an integer compares equal to the
/// float of the same magnitude, the way relational backends treat `1 = 1.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Float(_) => 2,
        Value::Text(_) => 3,
        Value::DateTime(_) => 4,
        Value::Json(_) => 5,
    }
}

/// Total order used by ORDER BY: NULLs first, then by kind, then within
/// kind by natural order.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    let (rank_a, rank_b) = (kind_rank(a), kind_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::DateTime(x), Value::DateTime(y)) => x.cmp(y),
        (Value::Json(x), Value::Json(y)) => x.to_string().cmp(&y.to_string()),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}
