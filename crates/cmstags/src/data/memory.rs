// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! In-memory data source for testing and fixtures.

use super::{compare_values, sort_order, DataSource, Direction, Query};
use crate::context::Row;
use crate::error::{Result, TagError};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory tables of JSON rows.
///
/// Useful for testing and development. Data is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryDataSource {
    tables: RwLock<BTreeMap<String, Vec<Row>>>,
}

impl MemoryDataSource {
    /// Creates an empty data source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads tables from a JSON object of arrays:
    /// `{"archives": [{"id": 1, ...}], "arctype": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::Data`] if the value is not an object of arrays of
    /// objects.
    pub fn from_json(value: JsonValue) -> Result<Self> {
        let JsonValue::Object(tables) = value else {
            return Err(TagError::Data("fixtures must be a JSON object".to_string()));
        };
        let source = Self::new();
        for (name, rows) in tables {
            let JsonValue::Array(rows) = rows else {
                return Err(TagError::Data(format!("table '{}' must be an array", name)));
            };
            let mut parsed = Vec::with_capacity(rows.len());
            for row in rows {
                match row {
                    JsonValue::Object(map) => parsed.push(map),
                    other => {
                        return Err(TagError::Data(format!(
                            "table '{}' holds a non-object row: {}",
                            name, other
                        )))
                    }
                }
            }
            source.set_table(&name, parsed)?;
        }
        Ok(source)
    }

    /// Adds a table, builder style. Non-object values are skipped.
    pub fn with_table(self, name: &str, rows: Vec<JsonValue>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|row| match row {
                JsonValue::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        // A fresh lock cannot be poisoned.
        let _ = self.set_table(name, rows);
        self
    }

    /// Replaces the rows of a table.
    pub fn set_table(&self, name: &str, rows: Vec<Row>) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| TagError::Data(e.to_string()))?;
        tables.insert(name.to_string(), rows);
        Ok(())
    }

    /// Appends a row to a table, creating it if needed.
    pub fn insert(&self, table: &str, row: Row) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| TagError::Data(e.to_string()))?;
        tables.entry(table.to_string()).or_default().push(row);
        Ok(())
    }

    /// Returns a copy of a table's rows.
    pub fn rows(&self, table: &str) -> Result<Vec<Row>> {
        let tables = self
            .tables
            .read()
            .map_err(|e| TagError::Data(e.to_string()))?;
        Ok(tables.get(table).cloned().unwrap_or_default())
    }

    /// Names of all tables.
    pub fn table_names(&self) -> Vec<String> {
        self.tables
            .read()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn sort_rows(rows: &mut [Row], order: &[(String, Direction)]) {
        rows.sort_by(|a, b| {
            for (column, direction) in order {
                let ordering = sort_order(a.get(column), b.get(column));
                let ordering = match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    fn project(row: Row, columns: &[String]) -> Row {
        if columns.is_empty() || columns.iter().any(|c| c == "*") {
            return row;
        }
        row.into_iter()
            .filter(|(key, _)| columns.iter().any(|c| c == key))
            .collect()
    }
}

impl DataSource for MemoryDataSource {
    fn fetch_many(&self, query: &Query) -> Result<Vec<Row>> {
        let tables = self
            .tables
            .read()
            .map_err(|e| TagError::Data(e.to_string()))?;
        let Some(rows) = tables.get(&query.table) else {
            return Err(TagError::Data(format!("unknown table '{}'", query.table)));
        };

        let mut matched: Vec<Row> = rows
            .iter()
            .filter(|row| {
                query
                    .conditions
                    .iter()
                    .all(|c| c.matches(row.get(c.column())))
            })
            .cloned()
            .collect();

        // Stable sort keeps insertion order for ties.
        Self::sort_rows(&mut matched, &query.order);
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        Ok(matched
            .into_iter()
            .map(|row| Self::project(row, &query.columns))
            .collect())
    }

    fn increment(&self, table: &str, key_column: &str, id: i64, column: &str) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| TagError::Data(e.to_string()))?;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| TagError::Data(format!("unknown table '{}'", table)))?;
        let key = JsonValue::from(id);
        let row = rows
            .iter_mut()
            .find(|row| {
                row.get(key_column)
                    .and_then(|v| compare_values(v, &key))
                    == Some(Ordering::Equal)
            })
            .ok_or_else(|| {
                TagError::Data(format!("no row in '{}' with {} = {}", table, key_column, id))
            })?;

        let current = row
            .get(column)
            .and_then(super::as_number)
            .unwrap_or(0.0) as i64;
        row.insert(column.to_string(), JsonValue::from(current + 1));
        Ok(())
    }
}
