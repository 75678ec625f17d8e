//! DDL generation for UltraORM.
//!
//! `ultraorm-schema` renders an [`EntityDefinition`](ultraorm_core::EntityDefinition)
//! into a `CREATE TABLE IF NOT EXISTS` statement: one column definition per
//! field, one named foreign-key constraint per foreign-key field. The facade
//! executes the statement during migration; nothing here performs I/O.

pub mod ddl;

pub use ddl::{column_definition, create_table, default_literal, foreign_key_clause};
