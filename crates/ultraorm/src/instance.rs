//! In-memory records with change tracking.
//!
//! An [`EntityInstance`] holds one record's current data, the snapshot taken
//! at the last load or save, and the set of fields mutated since. The save
//! path turns that state into an INSERT (new instance, all defined fields)
//! or an UPDATE (persisted instance, dirty fields only, keyed by the
//! primary-key value from the snapshot).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use ultraorm_core::{EntityDefinition, Error, Executor, FieldDescriptor, Result, Row, Value};
use ultraorm_query::{DeleteBuilder, InsertBuilder, UpdateBuilder};

/// One in-memory record of an entity.
///
/// Instances are created through [`Entity::instance`](crate::Entity::instance)
/// or returned by queries. All reads and writes go through [`get`] and
/// [`set`]; the data mapping never holds an undeclared field name.
///
/// Not internally synchronized: mutation requires `&mut`, and sharing one
/// instance across tasks must be serialized by the caller.
///
/// [`get`]: EntityInstance::get
/// [`set`]: EntityInstance::set
#[derive(Debug, Clone)]
pub struct EntityInstance {
    definition: Arc<EntityDefinition>,
    data: HashMap<String, Value>,
    original: HashMap<String, Value>,
    dirty: HashSet<String>,
    is_new: bool,
    deleted: bool,
}

impl EntityInstance {
    /// Construct an unsaved instance from a plain data mapping.
    ///
    /// Every supplied value is routed through [`set`](EntityInstance::set),
    /// so it is validated and unknown keys fail with
    /// [`Error::UnknownField`]. Declared defaults fill the fields the
    /// mapping leaves out. The result carries an empty dirty set and is
    /// marked new.
    pub fn from_data<I, K, V>(definition: Arc<EntityDefinition>, data: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut supplied: HashMap<String, Value> = data
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        for name in supplied.keys() {
            if !definition.has_field(name) {
                return Err(Error::unknown_field(definition.table(), name));
            }
        }

        let mut instance = Self {
            definition: Arc::clone(&definition),
            data: HashMap::new(),
            original: HashMap::new(),
            dirty: HashSet::new(),
            is_new: true,
            deleted: false,
        };
        for field in definition.fields() {
            if let Some(value) = supplied.remove(&field.name) {
                instance.set(&field.name, value)?;
            } else if let Some(default) = field.resolve_default() {
                instance.set(&field.name, default)?;
            }
        }
        instance.original = instance.data.clone();
        instance.dirty.clear();
        Ok(instance)
    }

    /// Build a persisted (not-new) instance from a result row.
    ///
    /// Loaded values are the backend's word and bypass validation; columns
    /// the definition does not declare are ignored.
    pub(crate) fn from_row(definition: Arc<EntityDefinition>, row: &Row) -> Self {
        let mut data = HashMap::new();
        for (column, value) in row.iter() {
            if definition.has_field(column) {
                data.insert(column.to_string(), value.clone());
            }
        }
        Self {
            definition,
            original: data.clone(),
            data,
            dirty: HashSet::new(),
            is_new: false,
            deleted: false,
        }
    }

    /// The definition this instance belongs to.
    #[must_use]
    pub fn definition(&self) -> &EntityDefinition {
        &self.definition
    }

    /// Current value of a field. Absent and undeclared names both read as
    /// `None`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// True until the first successful insert.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// True once [`delete`](EntityInstance::delete) has removed the row.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Whether `name` has been mutated since the last load or save.
    #[must_use]
    pub fn is_dirty(&self, name: &str) -> bool {
        self.dirty.contains(name)
    }

    /// Dirty field names in declaration order.
    #[must_use]
    pub fn dirty_fields(&self) -> Vec<&str> {
        self.definition
            .fields()
            .iter()
            .filter(|f| self.dirty.contains(&f.name))
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Validate and store a value, marking the field dirty.
    ///
    /// Fails with [`Error::UnknownField`] for undeclared names and
    /// [`Error::Validation`] when the value violates a field rule. Setting
    /// the value a field already holds still marks it dirty. A primary key
    /// accepts exactly one assignment: once it holds a value, or once the
    /// instance has been persisted, further writes are rejected.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let Some(field) = self.definition.field(name) else {
            return Err(Error::unknown_field(self.definition.table(), name));
        };
        if field.primary_key && (!self.is_new || self.data.contains_key(name)) {
            return Err(Error::validation(
                name,
                "primary key cannot be changed after initial assignment",
            ));
        }
        let value = value.into();
        field.validate(Some(&value))?;
        self.data.insert(name.to_string(), value);
        self.dirty.insert(name.to_string());
        Ok(())
    }

    fn ensure_not_deleted(&self) -> Result<()> {
        if self.deleted {
            return Err(Error::DeletedInstance {
                entity: self.definition.table().to_string(),
            });
        }
        Ok(())
    }

    /// Overwrite auto-now fields and fill absent auto-now-add fields.
    ///
    /// On the update path this only runs when an UPDATE will actually be
    /// emitted; a save with an empty dirty set stays a no-op.
    fn apply_auto_time(&mut self) {
        let will_update = !self.is_new && !self.dirty.is_empty();
        let now = Value::DateTime(Utc::now());
        for field in self.definition.fields() {
            if field.auto_now && (self.is_new || will_update) {
                self.data.insert(field.name.clone(), now.clone());
                if will_update {
                    self.dirty.insert(field.name.clone());
                }
            } else if field.auto_now_add && self.is_new && !self.data.contains_key(&field.name) {
                self.data.insert(field.name.clone(), now.clone());
            }
        }
    }

    /// Revalidate every declared field's current value, fail-fast in
    /// declaration order. An absent value on an auto-increment field is
    /// exempt: the backend generates it.
    fn validate_all(&self) -> Result<()> {
        for field in self.definition.fields() {
            let value = self.data.get(&field.name);
            if value.is_none() && field.auto_increment {
                continue;
            }
            field.validate(value)?;
        }
        Ok(())
    }

    fn auto_increment_pk(&self) -> Option<&FieldDescriptor> {
        self.definition
            .primary_key()
            .filter(|field| field.auto_increment)
    }

    /// Primary-key value captured in the original snapshot, which UPDATE
    /// and DELETE key on.
    fn snapshot_key(&self) -> Result<(&str, Value)> {
        let pk = self.definition.require_primary_key()?;
        let value = self.original.get(&pk.name).cloned().ok_or_else(|| {
            Error::configuration(format!(
                "instance of entity `{}` has no primary key value",
                self.definition.table()
            ))
        })?;
        Ok((pk.name.as_str(), value))
    }

    /// Persist the instance: INSERT when new, UPDATE of the dirty fields
    /// otherwise.
    ///
    /// Applies auto-now behavior, revalidates every field, and only then
    /// touches the backend. A generated auto-increment key is captured back
    /// into the primary-key field. On success the snapshot is reset and the
    /// dirty set cleared; an empty dirty set on a persisted instance makes
    /// the whole call a no-op.
    #[tracing::instrument(skip(self, executor), fields(table = %self.definition.table()))]
    pub async fn save<E>(&mut self, executor: &E) -> Result<()>
    where
        E: Executor + ?Sized,
    {
        self.ensure_not_deleted()?;
        self.apply_auto_time();
        self.validate_all()?;

        if self.is_new {
            self.insert(executor).await?;
        } else if !self.dirty.is_empty() {
            self.update(executor).await?;
        } else {
            tracing::debug!(table = self.definition.table(), "save skipped, nothing dirty");
        }

        self.original = self.data.clone();
        self.dirty.clear();
        self.is_new = false;
        Ok(())
    }

    async fn insert<E>(&mut self, executor: &E) -> Result<()>
    where
        E: Executor + ?Sized,
    {
        let mut builder = InsertBuilder::new(self.definition.table());
        for field in self.definition.fields() {
            if let Some(value) = self.data.get(&field.name) {
                builder = builder.value(&field.name, value.clone());
            }
        }
        let (sql, params) = builder.build_with_dialect(executor.dialect());
        let result = executor.execute(&sql, &params).await?;
        tracing::debug!(
            table = self.definition.table(),
            rows = result.rows_affected,
            "inserted instance"
        );

        if let Some(pk) = self.auto_increment_pk() {
            if let Some(id) = result.last_insert_id {
                self.data.insert(pk.name.clone(), Value::Int(id));
            }
        }
        Ok(())
    }

    async fn update<E>(&mut self, executor: &E) -> Result<()>
    where
        E: Executor + ?Sized,
    {
        let (key_column, key_value) = self.snapshot_key()?;
        let mut builder = UpdateBuilder::new(self.definition.table(), key_column, key_value);
        for field in self.definition.fields() {
            if self.dirty.contains(&field.name) {
                if let Some(value) = self.data.get(&field.name) {
                    builder = builder.set(&field.name, value.clone());
                }
            }
        }
        let (sql, params) = builder.build_with_dialect(executor.dialect());
        let result = executor.execute(&sql, &params).await?;
        tracing::debug!(
            table = self.definition.table(),
            rows = result.rows_affected,
            "updated instance"
        );
        Ok(())
    }

    /// Delete the backing row.
    ///
    /// A new instance has nothing persisted, so the call is a no-op with
    /// zero I/O and the instance stays usable. Otherwise the row keyed by
    /// the snapshot primary key is deleted, the in-memory data is left
    /// untouched, and the instance is marked deleted so later persistence
    /// calls are rejected.
    #[tracing::instrument(skip(self, executor), fields(table = %self.definition.table()))]
    pub async fn delete<E>(&mut self, executor: &E) -> Result<()>
    where
        E: Executor + ?Sized,
    {
        self.ensure_not_deleted()?;
        if self.is_new {
            tracing::debug!(
                table = self.definition.table(),
                "delete skipped, instance was never saved"
            );
            return Ok(());
        }

        let (key_column, key_value) = self.snapshot_key()?;
        let (sql, params) =
            DeleteBuilder::new(self.definition.table(), key_column, key_value)
                .build_with_dialect(executor.dialect());
        let result = executor.execute(&sql, &params).await?;
        tracing::debug!(
            table = self.definition.table(),
            rows = result.rows_affected,
            "deleted instance"
        );
        self.deleted = true;
        Ok(())
    }
}

impl Serialize for EntityInstance {
    /// Serializes as the data mapping, fields in declaration order, absent
    /// fields omitted.
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let present = self
            .definition
            .fields()
            .iter()
            .filter_map(|f| self.data.get(&f.name).map(|v| (f.name.as_str(), v)));
        let mut map = serializer.serialize_map(None)?;
        for (name, value) in present {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultraorm_core::FieldDescriptor;

    fn users() -> Arc<EntityDefinition> {
        Arc::new(
            EntityDefinition::builder("users")
                .field(FieldDescriptor::big_integer("id").primary_key().auto_increment())
                .field(FieldDescriptor::string("name").max_length(100))
                .field(FieldDescriptor::email("email").nullable())
                .field(FieldDescriptor::integer("age").min(0.0).max(150.0).default_value(18))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_construction_applies_defaults_and_clears_dirty() {
        let user = EntityInstance::from_data(users(), [("name", "Ada")]).unwrap();
        assert_eq!(user.get("name"), Some(&Value::Text("Ada".into())));
        assert_eq!(user.get("age"), Some(&Value::Int(18)));
        assert_eq!(user.get("email"), None);
        assert!(user.is_new());
        assert!(user.dirty_fields().is_empty());
    }

    #[test]
    fn test_construction_rejects_unknown_key() {
        let err = EntityInstance::from_data(users(), [("nickname", "Ada")]).unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }

    #[test]
    fn test_construction_validates_values() {
        let err = EntityInstance::from_data(
            users(),
            [("name", Value::from("Ada")), ("age", Value::from(-3))],
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_set_marks_dirty_without_equality_short_circuit() {
        let mut user = EntityInstance::from_data(users(), [("name", "Ada")]).unwrap();
        user.set("name", "Ada").unwrap();
        assert_eq!(user.dirty_fields(), vec!["name"]);
    }

    #[test]
    fn test_set_unknown_field() {
        let mut user = EntityInstance::from_data(users(), [("name", "Ada")]).unwrap();
        let err = user.set("nickname", "A").unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }

    #[test]
    fn test_primary_key_single_assignment() {
        let mut user = EntityInstance::from_data(users(), [("name", "Ada")]).unwrap();
        user.set("id", 7).unwrap();
        let err = user.set("id", 8).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("primary key"));
        assert_eq!(user.get("id"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_primary_key_frozen_after_load() {
        let columns = Arc::new(vec!["id".to_string(), "name".to_string()]);
        let row = Row::new(columns, vec![Value::Int(3), Value::Text("Ada".into())]);
        let mut user = EntityInstance::from_row(users(), &row);
        assert!(!user.is_new());
        let err = user.set("id", 4).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_from_row_ignores_undeclared_columns() {
        let columns = Arc::new(vec!["id".to_string(), "shadow".to_string()]);
        let row = Row::new(columns, vec![Value::Int(3), Value::Text("x".into())]);
        let user = EntityInstance::from_row(users(), &row);
        assert_eq!(user.get("id"), Some(&Value::Int(3)));
        assert_eq!(user.get("shadow"), None);
    }

    #[test]
    fn test_serialize_declaration_order() {
        let user = EntityInstance::from_data(
            users(),
            [("name", Value::from("Ada")), ("age", Value::from(30))],
        )
        .unwrap();
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(json, r#"{"name":"Ada","age":30}"#);
    }
}
