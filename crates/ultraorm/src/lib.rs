//! UltraORM: a database-agnostic ORM with typed fields, change tracking,
//! and pooled transactions.
//!
//! This crate is the **facade** over the UltraORM workspace: it wires the
//! core data model, the SQL builders, the schema renderer, the connection
//! pool, and the embedded memory driver into one surface.
//!
//! # The Shape Of An Application
//!
//! 1. Build a [`Config`] (or parse one with [`Config::from_url`]) and hand
//!    it to a [`ConnectionManager`].
//! 2. Declare entities with [`EntityDefinition::builder`] and
//!    [`FieldDescriptor`] constructors; [`register`] each one to get an
//!    [`Entity`] handle.
//! 3. [`connect`], then [`migrate`] to create the backing tables.
//! 4. Work with [`EntityInstance`] values: construct, [`set`], [`save`],
//!    [`delete`]; fetch them back through [`Entity::query`].
//! 5. Group writes with [`transaction`], which commits on success and
//!    rolls back on error.
//!
//! # Example
//!
//! ```rust,ignore
//! use ultraorm::prelude::*;
//!
//! let manager = ConnectionManager::new(Config::memory("app_db"));
//! let users = manager.register(
//!     EntityDefinition::builder("users")
//!         .field(FieldDescriptor::big_integer("id").primary_key().auto_increment())
//!         .field(FieldDescriptor::string("name").max_length(100))
//!         .field(FieldDescriptor::email("email").unique())
//!         .build()?,
//! );
//! manager.connect().await?;
//! manager.migrate().await?;
//!
//! let mut ada = users.instance_with([("name", "Ada"), ("email", "ada@lovelace.dev")])?;
//! ada.save(&manager).await?;
//!
//! let page = users
//!     .query()
//!     .filter([("name", "Ada")])
//!     .order_by("id", SortDirection::Asc)
//!     .paginate(1, 20)
//!     .await?;
//! ```
//!
//! [`register`]: ConnectionManager::register
//! [`connect`]: ConnectionManager::connect
//! [`migrate`]: ConnectionManager::migrate
//! [`transaction`]: ConnectionManager::transaction
//! [`set`]: EntityInstance::set
//! [`save`]: EntityInstance::save
//! [`delete`]: EntityInstance::delete

pub mod entity;
pub mod instance;
pub mod manager;
pub mod query;
pub mod transaction;

pub use entity::{Entity, FindOptions};
pub use instance::EntityInstance;
pub use manager::ConnectionManager;
pub use query::{PageInfo, Paginated, QueryBuilder};
pub use transaction::TransactionScope;

pub use ultraorm_core::{
    BackendKind, Config, DefaultSpec, Dialect, Driver, DriverConnection, EntityDefinition,
    EntityDefinitionBuilder, Error, ExecResult, Executor, FieldDescriptor, FieldKind,
    ForeignKeyRef, ReferentialAction, Result, Row, Value,
};
pub use ultraorm_memory::MemoryDriver;
pub use ultraorm_query::{ConditionList, SortDirection};

/// The types a typical caller needs, importable in one line.
pub mod prelude {
    pub use crate::entity::{Entity, FindOptions};
    pub use crate::instance::EntityInstance;
    pub use crate::manager::ConnectionManager;
    pub use crate::query::{PageInfo, Paginated, QueryBuilder};
    pub use crate::transaction::TransactionScope;

    pub use ultraorm_core::{
        BackendKind, Config, EntityDefinition, Error, Executor, FieldDescriptor,
        ReferentialAction, Result, Value,
    };
    pub use ultraorm_query::{ConditionList, SortDirection};
}
