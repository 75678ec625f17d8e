//! Core types and traits for UltraORM.
//!
//! `ultraorm-core` is the **foundation layer** for the entire ecosystem. It
//! defines the data model and contracts that all other crates build on.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: `Driver`, `DriverConnection`, and `Executor` are the
//!   traits implemented by backend drivers and by the statement surfaces
//!   (connection manager, transaction scope) the upper layers call.
//! - **Data model**: `Value`, `Row`, `FieldDescriptor`, and `EntityDefinition`
//!   carry query inputs/outputs and entity shape, and are shared across the
//!   query, schema, pool, and driver crates.
//! - **Validation**: `validate` holds the per-kind rule pipeline every write
//!   path runs values through before they reach a backend.
//!
//! # Who Uses This Crate
//!
//! - `ultraorm-query` consumes `EntityDefinition` and `Value` to build SQL.
//! - `ultraorm-schema` renders `EntityDefinition` into DDL.
//! - `ultraorm-pool` manages `DriverConnection` instances behind a semaphore.
//! - `ultraorm-memory` implements `Driver` for the embedded backend.
//! - The `ultraorm` facade wires all of it into entities, queries, and
//!   transactions.
//!
//! Most applications should use the `ultraorm` facade; reach for
//! `ultraorm-core` directly when writing drivers or advanced integrations.

pub mod config;
pub mod connection;
pub mod definition;
pub mod error;
pub mod field;
pub mod identifiers;
pub mod row;
pub mod validate;
pub mod value;

pub use config::{BackendKind, Config};
pub use connection::{Dialect, Driver, DriverConnection, ExecResult, Executor};
pub use definition::{EntityDefinition, EntityDefinitionBuilder};
pub use error::{Error, Result};
pub use field::{DefaultSpec, FieldDescriptor, FieldKind, ForeignKeyRef, ReferentialAction};
pub use identifiers::{ensure_identifier, is_valid_identifier};
pub use row::Row;
pub use validate::{EMAIL_DEFAULT_MAX_LENGTH, EMAIL_PATTERN, Rule, matches_pattern};
pub use value::Value;
