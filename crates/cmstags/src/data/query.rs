// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Query builder handed to a [`DataSource`](super::DataSource).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl Direction {
    /// Parses `asc`/`desc` (any case); anything else is descending.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("asc") {
            Direction::Asc
        } else {
            Direction::Desc
        }
    }
}

/// A single filter on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// `column = value`
    Eq(String, JsonValue),
    /// `column != value`
    Ne(String, JsonValue),
    /// `column > value`
    Gt(String, JsonValue),
    /// `column >= value`
    Ge(String, JsonValue),
    /// `column < value`
    Lt(String, JsonValue),
    /// `column <= value`
    Le(String, JsonValue),
    /// `column IN (values)`
    In(String, Vec<JsonValue>),
    /// `column BETWEEN low AND high`, both inclusive.
    Between(String, JsonValue, JsonValue),
}

impl Condition {
    /// The column this condition tests.
    pub fn column(&self) -> &str {
        match self {
            Condition::Eq(c, _)
            | Condition::Ne(c, _)
            | Condition::Gt(c, _)
            | Condition::Ge(c, _)
            | Condition::Lt(c, _)
            | Condition::Le(c, _)
            | Condition::In(c, _)
            | Condition::Between(c, _, _) => c,
        }
    }

    /// Evaluates the condition against a column value; a missing column
    /// never matches.
    pub fn matches(&self, value: Option<&JsonValue>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            Condition::Eq(_, v) => compare_values(value, v) == Some(Ordering::Equal),
            Condition::Ne(_, v) => compare_values(value, v) != Some(Ordering::Equal),
            Condition::Gt(_, v) => compare_values(value, v) == Some(Ordering::Greater),
            Condition::Ge(_, v) => matches!(
                compare_values(value, v),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Condition::Lt(_, v) => compare_values(value, v) == Some(Ordering::Less),
            Condition::Le(_, v) => matches!(
                compare_values(value, v),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Condition::In(_, set) => set
                .iter()
                .any(|v| compare_values(value, v) == Some(Ordering::Equal)),
            Condition::Between(_, lo, hi) => {
                matches!(
                    compare_values(value, lo),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    compare_values(value, hi),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }
        }
    }
}

/// Reads a JSON value as a number: numbers as-is, numeric strings parsed.
pub fn as_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        JsonValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Orders two column values: numerically when both read as numbers,
/// otherwise as strings. Null compares with nothing.
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        (JsonValue::Null, _) | (_, JsonValue::Null) => None,
        _ => Some(a.to_string().cmp(&b.to_string())),
    }
}

/// Sort rank of a column value: missing and null first, then numbers
/// (including numeric strings), then everything else as text.
fn sort_rank(value: Option<&JsonValue>) -> (u8, Option<f64>) {
    match value {
        None | Some(JsonValue::Null) => (0, None),
        Some(v) => match as_number(v).filter(|n| !n.is_nan()) {
            Some(n) => (1, Some(n)),
            None => (2, None),
        },
    }
}

fn sort_text(value: &JsonValue) -> std::borrow::Cow<'_, str> {
    match value {
        JsonValue::String(s) => std::borrow::Cow::Borrowed(s),
        other => std::borrow::Cow::Owned(other.to_string()),
    }
}

/// Total order over column values for sorting rows.
///
/// Unlike [`compare_values`] every pair is ordered: nulls sort below
/// numbers, numbers below text, and `NaN` strings count as text.
pub fn sort_order(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    let (rank_a, num_a) = sort_rank(a);
    let (rank_b, num_b) = sort_rank(b);
    rank_a.cmp(&rank_b).then_with(|| match (num_a, num_b, a, b) {
        (Some(x), Some(y), _, _) => x.total_cmp(&y),
        (_, _, Some(x), Some(y)) if rank_a == 2 => sort_text(x).cmp(&sort_text(y)),
        _ => Ordering::Equal,
    })
}

/// A select/where/order/limit query against one table.
///
/// ```rust
/// use cmstags::data::{Condition, Direction, Query};
///
/// let query = Query::table("archives")
///     .filter(Condition::Gt("arcrank".into(), (-1).into()))
///     .order_by("pubdate", Direction::Desc)
///     .limit(10);
/// assert_eq!(query.limit, Some(10));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Table name.
    pub table: String,
    /// Selected columns; empty selects all.
    pub columns: Vec<String>,
    /// Conditions, all of which must hold.
    pub conditions: Vec<Condition>,
    /// Sort keys, applied in order.
    pub order: Vec<(String, Direction)>,
    /// Maximum number of rows.
    pub limit: Option<usize>,
}

impl Query {
    /// Starts a query on `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            conditions: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Restricts the returned columns.
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Adds a condition.
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Adds a sort key.
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push((column.into(), direction));
        self
    }

    /// Limits the number of rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
