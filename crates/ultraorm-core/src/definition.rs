//! Entity definitions built at registration time.

use crate::error::{Error, Result};
use crate::field::{FieldDescriptor, FieldKind};
use crate::identifiers::ensure_identifier;
use crate::validate::pattern_error;

/// A named, ordered collection of field descriptors describing one table.
///
/// Field insertion order is column order for DDL. At most one field may be
/// the primary key. Definitions are immutable once built and shared across
/// every instance of the entity.
///
/// # Example
///
/// ```
/// use ultraorm_core::definition::EntityDefinition;
/// use ultraorm_core::field::FieldDescriptor;
///
/// let users = EntityDefinition::builder("users")
///     .field(FieldDescriptor::big_integer("id").primary_key().auto_increment())
///     .field(FieldDescriptor::string("name").max_length(100))
///     .field(FieldDescriptor::email("email").unique())
///     .build()
///     .unwrap();
///
/// assert_eq!(users.table(), "users");
/// assert_eq!(users.primary_key().unwrap().name, "id");
/// ```
#[derive(Debug, Clone)]
pub struct EntityDefinition {
    table: String,
    fields: Vec<FieldDescriptor>,
}

impl EntityDefinition {
    /// Start building a definition for `table`.
    pub fn builder(table: impl Into<String>) -> EntityDefinitionBuilder {
        EntityDefinitionBuilder {
            table: table.into(),
            fields: Vec::new(),
        }
    }

    /// The table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Declared fields in column order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up one field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` is a declared field.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// The primary-key field, if one is declared.
    #[must_use]
    pub fn primary_key(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// The primary-key field, or a configuration error when none exists.
    pub fn require_primary_key(&self) -> Result<&FieldDescriptor> {
        self.primary_key().ok_or_else(|| {
            Error::configuration(format!(
                "entity `{}` has no primary key; row identity is required for this operation",
                self.table
            ))
        })
    }

    /// Declared foreign-key fields in column order.
    #[must_use]
    pub fn foreign_keys(&self) -> Vec<&FieldDescriptor> {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::ForeignKey)
            .collect()
    }
}

/// Accumulates field descriptors and validates the definition on `build`.
#[derive(Debug)]
pub struct EntityDefinitionBuilder {
    table: String,
    fields: Vec<FieldDescriptor>,
}

impl EntityDefinitionBuilder {
    /// Append one field (insertion order = column order).
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Validate and freeze the definition.
    ///
    /// Rejects invalid identifiers (the only place names are checked, since
    /// they are later interpolated into statements), duplicate field names,
    /// more than one primary key, and patterns that do not compile.
    pub fn build(self) -> Result<EntityDefinition> {
        ensure_identifier(&self.table, "table")?;

        let mut primary_keys = 0usize;
        for (i, field) in self.fields.iter().enumerate() {
            ensure_identifier(&field.name, "field")?;
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(Error::configuration(format!(
                    "duplicate field `{}` on entity `{}`",
                    field.name, self.table
                )));
            }
            if field.primary_key {
                primary_keys += 1;
            }
            if let Some(pattern) = &field.pattern {
                if let Some(message) = pattern_error(pattern) {
                    return Err(Error::configuration(format!(
                        "field `{}` on entity `{}`: {message}",
                        field.name, self.table
                    )));
                }
            }
            if let Some(fk) = &field.references {
                ensure_identifier(&fk.table, "referenced table")?;
                if let Some(column) = &fk.column {
                    ensure_identifier(column, "referenced column")?;
                }
            }
        }

        if primary_keys > 1 {
            return Err(Error::configuration(format!(
                "entity `{}` declares {primary_keys} primary keys; at most one is allowed",
                self.table
            )));
        }

        Ok(EntityDefinition {
            table: self.table,
            fields: self.fields,
        })
    }
}
