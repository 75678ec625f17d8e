//! Embedded in-memory driver for UltraORM.
//!
//! `ultraorm-memory` implements the [`Driver`](ultraorm_core::Driver)
//! contract over process-local tables, executing exactly the statement
//! shapes UltraORM's builders emit. It exists so applications and test
//! suites can run the full entity/query/transaction stack with no server.
//!
//! Stores are keyed by database name per driver instance: connections to
//! the same name share tables, separate driver instances never do.
//! Transactions use snapshot semantics and roll back when a connection is
//! dropped mid-transaction.

mod engine;
mod sql;

pub mod connection;

pub use connection::{MemoryConnection, MemoryDriver};
