//! Parameterized SQL builders for UltraORM.
//!
//! `ultraorm-query` turns accumulated query state and explicit column/value
//! pairs into SQL text plus a bound parameter list. It is a pure layer: no
//! I/O, no knowledge of entities or connections. The facade validates column
//! names against the entity definition before they reach these builders;
//! the builders interpolate only structural text and bind every value.
//!
//! - [`ConditionList`]: ordered condition groups, flattened last-write-wins.
//! - [`SelectBuilder`]: SELECT and COUNT compilation.
//! - [`InsertBuilder`], [`UpdateBuilder`], [`DeleteBuilder`]: write paths.

pub mod conditions;
pub mod select;
pub mod statement;

pub use conditions::{ConditionList, SortDirection};
pub use select::SelectBuilder;
pub use statement::{DeleteBuilder, InsertBuilder, UpdateBuilder};
