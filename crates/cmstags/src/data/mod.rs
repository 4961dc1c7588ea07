// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Query collaborator used by the data-backed tags.
//!
//! The engine never talks to a database directly. Tags build a [`Query`]
//! and hand it to a [`DataSource`]; rows come back as JSON objects.
//!
//! # Implementations
//!
//! - [`MemoryDataSource`]: tables of JSON rows held in memory (tests, CLI fixtures)
//!
//! Production deployments implement [`DataSource`] over their own store.

mod memory;
mod query;

pub use memory::MemoryDataSource;
pub use query::{as_number, compare_values, sort_order, Condition, Direction, Query};

use crate::context::Row;
use crate::error::Result;

/// Read access to content tables plus the single write the engine needs
/// (hit counters).
pub trait DataSource: Send + Sync + std::fmt::Debug {
    /// Returns every row matching `query`, ordered and limited.
    fn fetch_many(&self, query: &Query) -> Result<Vec<Row>>;

    /// Returns the first matching row.
    fn fetch_one(&self, query: &Query) -> Result<Option<Row>> {
        let query = query.clone().limit(1);
        Ok(self.fetch_many(&query)?.into_iter().next())
    }

    /// Adds one to `column` of the row whose `key_column` equals `id`.
    fn increment(&self, table: &str, key_column: &str, id: i64, column: &str) -> Result<()>;
}
