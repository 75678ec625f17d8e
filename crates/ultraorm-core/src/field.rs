//! Field descriptors: per-column metadata, constraints, and defaults.
//!
//! A [`FieldDescriptor`] is created once at entity-definition time and shared
//! by every instance of the entity. Validation rules derived from the
//! descriptor live in [`crate::validate`]; DDL rendering lives in the schema
//! crate.

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Referential action for foreign key constraints (ON DELETE / ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferentialAction {
    /// Cascade - automatically delete/update referencing rows.
    /// Default in both directions for foreign-key fields.
    #[default]
    Cascade,
    /// No action - raise an error if any references exist.
    NoAction,
    /// Restrict - same as NO ACTION (alias for compatibility).
    Restrict,
    /// Set null - set referencing columns to NULL.
    SetNull,
    /// Set default - set referencing columns to their default values.
    SetDefault,
}

impl ReferentialAction {
    /// Get the SQL representation of this action.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }
}

/// The semantic kind of a field.
///
/// The kind selects the validation rule list and the default column type;
/// composite kinds (e-mail) extend their parent kind's rules rather than
/// replacing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Whole number stored as `INT`.
    Integer,
    /// Whole number stored as `BIGINT`.
    BigInteger,
    /// Text stored as `VARCHAR(<max-length>)`.
    String,
    /// Text constrained to the e-mail pattern; `VARCHAR(255)` by default.
    Email,
    /// Timestamp stored as `DATETIME`.
    DateTime,
    /// Two-valued logical type stored as `BOOLEAN`.
    Boolean,
    /// Arbitrary JSON document stored as `JSON`.
    Json,
    /// Numeric value stored as `FLOAT`.
    Float,
    /// Integer key referencing another entity's primary key.
    ForeignKey,
}

impl FieldKind {
    /// Human-readable kind name, used in messages and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::BigInteger => "big-integer",
            FieldKind::String => "string",
            FieldKind::Email => "email",
            FieldKind::DateTime => "datetime",
            FieldKind::Boolean => "boolean",
            FieldKind::Json => "json",
            FieldKind::Float => "float",
            FieldKind::ForeignKey => "foreign-key",
        }
    }
}

/// A declared default: either a fixed value or a generator evaluated at
/// application time (and at DDL-render time).
#[derive(Clone)]
pub enum DefaultSpec {
    /// A fixed value.
    Value(Value),
    /// A generator invoked each time the default is needed.
    Generated(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultSpec {
    /// Produce the default value, invoking the generator if there is one.
    #[must_use]
    pub fn resolve(&self) -> Value {
        match self {
            DefaultSpec::Value(v) => v.clone(),
            DefaultSpec::Generated(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultSpec::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultSpec::Generated(_) => f.write_str("Generated(..)"),
        }
    }
}

/// Foreign-key target metadata.
#[derive(Debug, Clone)]
pub struct ForeignKeyRef {
    /// Referenced table.
    pub table: String,
    /// Referenced column. `None` means "the target entity's primary key",
    /// resolved through the registry at DDL-render time.
    pub column: Option<String>,
    /// Action taken when the referenced row is deleted.
    pub on_delete: ReferentialAction,
    /// Action taken when the referenced key is updated.
    pub on_update: ReferentialAction,
}

/// Metadata for one entity column.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Field (and column) name.
    pub name: String,
    /// Semantic kind.
    pub kind: FieldKind,
    /// Explicit column-type override. When set, takes precedence over the
    /// kind's default rendering in DDL generation.
    pub column_type: Option<String>,
    /// Whether NULL/absent values pass validation.
    pub nullable: bool,
    /// Whether this is the primary key.
    pub primary_key: bool,
    /// Whether the backend generates the value on insert.
    pub auto_increment: bool,
    /// Whether a UNIQUE constraint is rendered.
    pub unique: bool,
    /// Lower bound for numeric kinds.
    pub min: Option<f64>,
    /// Upper bound for numeric kinds.
    pub max: Option<f64>,
    /// Minimum length for textual kinds (in characters).
    pub min_length: Option<u32>,
    /// Maximum length for textual kinds (in characters).
    pub max_length: Option<u32>,
    /// Extra regex pattern for textual kinds.
    pub pattern: Option<String>,
    /// Declared default.
    pub default: Option<DefaultSpec>,
    /// Overwrite with the current time on every save (datetime kinds).
    pub auto_now: bool,
    /// Set to the current time at first insert if absent (datetime kinds).
    /// Also renders a DEFAULT CURRENT_TIMESTAMP clause so direct inserts
    /// bypassing the object layer still get a timestamp.
    pub auto_now_add: bool,
    /// Foreign-key target (foreign-key kind only).
    pub references: Option<ForeignKeyRef>,
}

impl FieldDescriptor {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            column_type: None,
            nullable: false,
            primary_key: false,
            auto_increment: false,
            unique: false,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            pattern: None,
            default: None,
            auto_now: false,
            auto_now_add: false,
            references: None,
        }
    }

    /// Whole number stored as `INT`.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// Whole number stored as `BIGINT`.
    pub fn big_integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::BigInteger)
    }

    /// Text field; max length defaults to 255 characters.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    /// E-mail field: string rules plus the mandatory e-mail pattern and a
    /// default max length of 255.
    pub fn email(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Email)
    }

    /// UTC timestamp field.
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::DateTime)
    }

    /// Boolean field.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    /// JSON document field.
    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Json)
    }

    /// Float field.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    /// Foreign key referencing `table`'s primary key, cascading on delete
    /// and update unless overridden.
    pub fn foreign_key(name: impl Into<String>, table: impl Into<String>) -> Self {
        let mut field = Self::new(name, FieldKind::ForeignKey);
        field.references = Some(ForeignKeyRef {
            table: table.into(),
            column: None,
            on_delete: ReferentialAction::default(),
            on_update: ReferentialAction::default(),
        });
        field
    }

    /// Allow NULL/absent values.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as auto-incrementing (backend-generated on insert).
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Render a UNIQUE constraint.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set the numeric lower bound.
    #[must_use]
    pub fn min(mut self, value: f64) -> Self {
        self.min = Some(value);
        self
    }

    /// Set the numeric upper bound.
    #[must_use]
    pub fn max(mut self, value: f64) -> Self {
        self.max = Some(value);
        self
    }

    /// Set the minimum text length (characters).
    #[must_use]
    pub fn min_length(mut self, value: u32) -> Self {
        self.min_length = Some(value);
        self
    }

    /// Set the maximum text length (characters). Also sizes the VARCHAR
    /// column.
    #[must_use]
    pub fn max_length(mut self, value: u32) -> Self {
        self.max_length = Some(value);
        self
    }

    /// Require text to match an extra regex pattern. For e-mail fields this
    /// is additional to the mandatory e-mail pattern.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Set a fixed default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultSpec::Value(value.into()));
        self
    }

    /// Set a generated default, evaluated whenever the default is applied.
    #[must_use]
    pub fn default_with(mut self, generator: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(DefaultSpec::Generated(Arc::new(generator)));
        self
    }

    /// Overwrite with the current time on every save.
    #[must_use]
    pub fn auto_now(mut self) -> Self {
        self.auto_now = true;
        self
    }

    /// Fill with the current time at first insert when absent.
    #[must_use]
    pub fn auto_now_add(mut self) -> Self {
        self.auto_now_add = true;
        self
    }

    /// Override the rendered column type (e.g. `TEXT`, `DECIMAL(10,2)`).
    #[must_use]
    pub fn column_type(mut self, type_str: impl Into<String>) -> Self {
        self.column_type = Some(type_str.into());
        self
    }

    /// Name the referenced column explicitly instead of resolving the
    /// target's primary key. Only meaningful for foreign-key fields.
    #[must_use]
    pub fn references_column(mut self, column: impl Into<String>) -> Self {
        if let Some(fk) = self.references.as_mut() {
            fk.column = Some(column.into());
        }
        self
    }

    /// Set the ON DELETE action. Only meaningful for foreign-key fields.
    #[must_use]
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        if let Some(fk) = self.references.as_mut() {
            fk.on_delete = action;
        }
        self
    }

    /// Set the ON UPDATE action. Only meaningful for foreign-key fields.
    #[must_use]
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        if let Some(fk) = self.references.as_mut() {
            fk.on_update = action;
        }
        self
    }

    /// Get the effective column type for DDL generation.
    ///
    /// Priority: explicit `column_type` override, then the kind's default
    /// rendering (string kinds are sized by `max_length`).
    #[must_use]
    pub fn effective_column_type(&self) -> String {
        if let Some(override_str) = &self.column_type {
            return override_str.clone();
        }
        match self.kind {
            FieldKind::Integer | FieldKind::ForeignKey => "INT".to_string(),
            FieldKind::BigInteger => "BIGINT".to_string(),
            FieldKind::String | FieldKind::Email => {
                format!("VARCHAR({})", self.max_length.unwrap_or(255))
            }
            FieldKind::DateTime => "DATETIME".to_string(),
            FieldKind::Boolean => "BOOLEAN".to_string(),
            FieldKind::Json => "JSON".to_string(),
            FieldKind::Float => "FLOAT".to_string(),
        }
    }

    /// Resolve the declared default, if any.
    #[must_use]
    pub fn resolve_default(&self) -> Option<Value> {
        self.default.as_ref().map(DefaultSpec::resolve)
    }

    /// True for datetime fields that the save path touches automatically.
    #[must_use]
    pub const fn has_auto_time(&self) -> bool {
        self.auto_now || self.auto_now_add
    }
}
