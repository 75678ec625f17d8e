//! Fluent query building over one entity.
//!
//! A [`QueryBuilder`] accumulates filters, sort pairs, windowing, and
//! projection, then compiles everything into a single SELECT when a
//! terminal operation runs. Accumulators are pure state changes; only the
//! terminals touch the backend.

use serde::Serialize;

use ultraorm_core::{Error, Result, Value};
use ultraorm_query::{ConditionList, SortDirection};

use crate::entity::{Entity, FindOptions};
use crate::instance::EntityInstance;

/// Accumulated query state for one entity.
///
/// # Example
///
/// ```rust,ignore
/// let admins = users
///     .query()
///     .filter([("role", "admin"), ("active", true)])
///     .order_by("name", SortDirection::Asc)
///     .take(20)
///     .get()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    entity: Entity,
    conditions: ConditionList,
    options: FindOptions,
    includes: Vec<String>,
}

impl QueryBuilder {
    pub(crate) fn new(entity: Entity) -> Self {
        Self {
            entity,
            conditions: ConditionList::new(),
            options: FindOptions::default(),
            includes: Vec::new(),
        }
    }

    /// Append one condition group. Groups flatten at compile time: a column
    /// repeated across groups keeps its first position and its last value.
    #[must_use]
    pub fn filter<I, K, V>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.conditions.push(group);
        self
    }

    /// Append one sort pair.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.options.order.push((field.into(), direction));
        self
    }

    /// Limit the number of rows fetched.
    #[must_use]
    pub fn take(mut self, n: u64) -> Self {
        self.options.limit = Some(n);
        self
    }

    /// Skip the first `n` rows.
    #[must_use]
    pub fn skip(mut self, n: u64) -> Self {
        self.options.offset = Some(n);
        self
    }

    /// Replace the projected column list. An empty list restores every
    /// declared field.
    #[must_use]
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.projection = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Record an eager-load request. Recorded but inert: the compiled query
    /// is unaffected until relation loading lands.
    #[must_use]
    pub fn include(mut self, relation: impl Into<String>) -> Self {
        self.includes.push(relation.into());
        self
    }

    /// Relations recorded by [`include`](QueryBuilder::include).
    #[must_use]
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Execute the query and return matching instances.
    pub async fn get(self) -> Result<Vec<EntityInstance>> {
        self.entity.find(self.conditions, &self.options).await
    }

    /// Fetch the first matching instance, if any. Equivalent to
    /// `take(1)` then [`get`](QueryBuilder::get).
    pub async fn first(mut self) -> Result<Option<EntityInstance>> {
        self.options.limit = Some(1);
        Ok(self.get().await?.into_iter().next())
    }

    /// Count matching rows. Sorting, windowing, and projection accumulated
    /// on the builder do not affect the count.
    pub async fn count(self) -> Result<u64> {
        self.entity.count(self.conditions).await
    }

    /// Fetch one page of results together with pagination metadata.
    ///
    /// `page` is 1-based; both arguments must be positive. The page fetch
    /// and the total count run as two concurrent operations over the
    /// shared pool.
    pub async fn paginate(self, page: u64, per_page: u64) -> Result<Paginated> {
        if page == 0 {
            return Err(Error::configuration("page must be a positive integer"));
        }
        if per_page == 0 {
            return Err(Error::configuration("per_page must be a positive integer"));
        }

        let mut options = self.options.clone();
        options.limit = Some(per_page);
        options.offset = Some((page - 1) * per_page);

        let (items, total) = tokio::join!(
            self.entity.find(self.conditions.clone(), &options),
            self.entity.count(self.conditions.clone()),
        );
        let (items, total) = (items?, total?);

        let pages = total.div_ceil(per_page);
        Ok(Paginated {
            items,
            pagination: PageInfo {
                page,
                per_page,
                total,
                pages,
                has_next: page < pages,
                has_prev: page > 1,
            },
        })
    }
}

/// One page of query results.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated {
    /// Instances on this page.
    pub items: Vec<EntityInstance>,
    /// Position of the page within the full result set.
    pub pagination: PageInfo,
}

/// Pagination metadata, serialized in camelCase for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// 1-based page number requested.
    pub page: u64,
    /// Requested page size.
    pub per_page: u64,
    /// Total matching rows across all pages.
    pub total: u64,
    /// Total page count, `ceil(total / per_page)`.
    pub pages: u64,
    /// Whether a later page exists.
    pub has_next: bool,
    /// Whether an earlier page exists.
    pub has_prev: bool,
}
