//! Error taxonomy shared across the workspace.

/// Convenience alias used throughout the crates.
pub type Result<T> = std::result::Result<T, Error>;

/// All failures the engine surfaces to callers.
///
/// Validation always runs before any I/O, so a `Validation` or
/// `UnknownField` error guarantees nothing was written. `Backend` carries
/// driver failures through unchanged; the engine never retries silently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value violated one of its field's validation rules.
    #[error("validation failed for field `{field}`: {message}")]
    Validation {
        /// Field whose rule was violated.
        field: String,
        /// What the rule required.
        message: String,
    },

    /// Caller referenced a field that the entity does not declare.
    #[error("unknown field `{field}` on entity `{entity}`")]
    UnknownField {
        /// Table name of the entity.
        entity: String,
        /// The undeclared field name.
        field: String,
    },

    /// Missing primary key, unsupported backend kind, bad identifier,
    /// malformed configuration, invalid pagination arguments.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Pool/establish/teardown failure, wrapping the underlying cause
    /// when one exists.
    #[error("connection error: {message}")]
    Connection {
        /// Description of the failure.
        message: String,
        /// Underlying driver error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// DDL execution failed during schema synchronization.
    #[error("schema sync failed for table `{table}`: {message}")]
    Schema {
        /// Table whose DDL failed.
        table: String,
        /// Backend-reported reason.
        message: String,
    },

    /// Any other failure from the underlying execute call.
    #[error("backend error: {0}")]
    Backend(String),

    /// Persistence was attempted on an instance whose row was deleted.
    #[error("instance of entity `{entity}` was deleted; persistence operations are rejected")]
    DeletedInstance {
        /// Table name of the entity.
        entity: String,
    },
}

impl Error {
    /// Build a `Validation` error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build an `UnknownField` error.
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Error::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Build a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Build a `Connection` error without an underlying cause.
    pub fn connection(message: impl Into<String>) -> Self {
        Error::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Build a `Connection` error wrapping its cause.
    pub fn connection_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build a `Schema` error.
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Schema {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Build a `Backend` error.
    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend(message.into())
    }

    /// True if this is a `Validation` error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// True if this is a `Connection` error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }
}
