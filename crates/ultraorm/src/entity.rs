//! Entity handles: the bridge between definitions and the backend.
//!
//! [`ConnectionManager::register`](crate::ConnectionManager::register)
//! returns an [`Entity`] whose operations run over the manager's pool:
//! instance construction, row-to-instance queries, counting, and schema
//! synchronization.

use std::sync::Arc;

use ultraorm_core::{EntityDefinition, Error, Executor, Result, Value};
use ultraorm_query::{ConditionList, SelectBuilder, SortDirection};
use ultraorm_schema::create_table;

use crate::instance::EntityInstance;
use crate::manager::ConnectionManager;
use crate::query::QueryBuilder;

/// Row-set shaping for [`Entity::find`]: sorting, windowing, projection.
///
/// The fluent way to build one is [`Entity::query`]; the plain struct is
/// the seam the query builder compiles down to.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Sort pairs, applied in order.
    pub order: Vec<(String, SortDirection)>,
    /// Maximum number of rows.
    pub limit: Option<u64>,
    /// Number of rows to skip.
    pub offset: Option<u64>,
    /// Columns to fetch; empty means every declared field.
    pub projection: Vec<String>,
}

/// A registered entity bound to its connection manager.
#[derive(Debug, Clone)]
pub struct Entity {
    manager: ConnectionManager,
    definition: Arc<EntityDefinition>,
}

impl Entity {
    pub(crate) fn new(manager: ConnectionManager, definition: Arc<EntityDefinition>) -> Self {
        Self { manager, definition }
    }

    /// The entity's definition.
    #[must_use]
    pub fn definition(&self) -> &EntityDefinition {
        &self.definition
    }

    /// The backing table name.
    #[must_use]
    pub fn table(&self) -> &str {
        self.definition.table()
    }

    /// Construct an empty unsaved instance, with declared defaults applied.
    pub fn instance(&self) -> Result<EntityInstance> {
        EntityInstance::from_data(Arc::clone(&self.definition), std::iter::empty::<(String, Value)>())
    }

    /// Construct an unsaved instance from a data mapping. Values are
    /// validated on the way in; unknown keys are rejected.
    pub fn instance_with<I, K, V>(&self, data: I) -> Result<EntityInstance>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        EntityInstance::from_data(Arc::clone(&self.definition), data)
    }

    /// Start a fluent query against this entity.
    #[must_use]
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new(self.clone())
    }

    fn ensure_declared(&self, name: &str) -> Result<()> {
        if self.definition.has_field(name) {
            Ok(())
        } else {
            Err(Error::unknown_field(self.definition.table(), name))
        }
    }

    /// Fetch instances matching `conditions`, shaped by `options`.
    ///
    /// Condition keys, order fields, and projected columns must all be
    /// declared field names. Returned instances are persisted (not new)
    /// and carry a fresh snapshot.
    pub async fn find(
        &self,
        conditions: ConditionList,
        options: &FindOptions,
    ) -> Result<Vec<EntityInstance>> {
        for column in conditions.columns() {
            self.ensure_declared(column)?;
        }
        for (column, _) in &options.order {
            self.ensure_declared(column)?;
        }
        for column in &options.projection {
            self.ensure_declared(column)?;
        }

        let mut select = SelectBuilder::new(self.definition.table());
        select.conditions(conditions);
        for (column, direction) in &options.order {
            select.order_by(column.clone(), *direction);
        }
        if let Some(limit) = options.limit {
            select.limit(limit);
        }
        if let Some(offset) = options.offset {
            select.offset(offset);
        }
        select.projection(options.projection.clone());

        let (sql, params) = select.build_with_dialect(self.manager.dialect());
        let rows = self.manager.query(&sql, &params).await?;
        tracing::debug!(
            table = self.definition.table(),
            rows = rows.len(),
            "fetched instances"
        );
        Ok(rows
            .iter()
            .map(|row| EntityInstance::from_row(Arc::clone(&self.definition), row))
            .collect())
    }

    /// Count rows matching `conditions`. Sorting, windowing, and
    /// projection never apply to counts.
    pub async fn count(&self, conditions: ConditionList) -> Result<u64> {
        for column in conditions.columns() {
            self.ensure_declared(column)?;
        }
        let mut select = SelectBuilder::new(self.definition.table());
        select.conditions(conditions);
        let (sql, params) = select.build_count_with_dialect(self.manager.dialect());
        let rows = self.manager.query(&sql, &params).await?;
        let total = rows
            .first()
            .and_then(|row| row.get(0))
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::backend("count query returned no numeric value"))?;
        u64::try_from(total)
            .map_err(|_| Error::backend("count query returned a negative value"))
    }

    /// Look up one instance by primary-key value.
    pub async fn find_by_id(&self, id: impl Into<Value>) -> Result<Option<EntityInstance>> {
        let pk = self.definition.require_primary_key()?;
        let mut conditions = ConditionList::new();
        conditions.push([(pk.name.clone(), id.into())]);
        let options = FindOptions {
            limit: Some(1),
            ..FindOptions::default()
        };
        Ok(self.find(conditions, &options).await?.into_iter().next())
    }

    /// Fetch every row of the entity.
    pub async fn all(&self) -> Result<Vec<EntityInstance>> {
        self.find(ConditionList::new(), &FindOptions::default()).await
    }

    /// Ensure the backing table exists, rendering one `CREATE TABLE IF NOT
    /// EXISTS` from the definition. Foreign keys resolve their target
    /// primary keys through the manager's registry. Safe to run repeatedly.
    #[tracing::instrument(skip(self), fields(table = %self.definition.table()))]
    pub async fn sync(&self) -> Result<()> {
        let manager = self.manager.clone();
        let ddl = create_table(&self.definition, |table| {
            manager
                .definition_of(table)
                .and_then(|d| d.primary_key().map(|f| f.name.clone()))
        })?;

        match self.manager.execute(&ddl, &[]).await {
            Ok(_) => {
                tracing::info!(table = self.definition.table(), "schema synchronized");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    table = self.definition.table(),
                    error = %e,
                    "schema synchronization failed"
                );
                if e.is_connection() {
                    Err(e)
                } else {
                    Err(Error::schema(self.definition.table(), e.to_string()))
                }
            }
        }
    }
}
