// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Per-item field tokens inside list tag bodies.
//!
//! A list tag renders its body once per row, replacing every
//! `[field:NAME/]` or `[field:NAME function="CALL"/]` with the row's value.
//! `CALL` is `name(arg, ...)`; `@me` stands for the field value. Each tag
//! passes its own allow-list, and a call that is not allowed, unknown or
//! malformed yields the raw value. A field missing from the row renders as
//! the empty string.

use crate::context::{json_to_i64, json_to_text, Row};
use crate::datefmt;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;

lazy_static! {
    static ref FIELD_TOKEN: Regex =
        Regex::new(r#"\[field:([a-zA-Z0-9_]+)(?:\s+function="([^"]+)")?\s*/\]"#).unwrap();
    static ref CALL: Regex = Regex::new(r"^\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\((.*)\)\s*$").unwrap();
}

/// Placeholder for the field value inside a call.
pub const ME: &str = "@me";

/// Functions a call site may allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFunction {
    /// `date('Y-m-d', @me)` or `strftime('Y-m-d')`: format a unix timestamp
    /// or datetime string with PHP-style tokens.
    Date,
    /// `substr(start, len)` or `substring(start, len)`: characters, not bytes.
    Substr,
    /// `rand(lo, hi)`: `(value % (hi - lo + 1)) + lo`, stable per row.
    Rand,
}

impl FieldFunction {
    /// Maps a call name to a function.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "date" | "strftime" => Some(FieldFunction::Date),
            "substr" | "substring" => Some(FieldFunction::Substr),
            "rand" => Some(FieldFunction::Rand),
            _ => None,
        }
    }
}

/// Applies `[field:...]` tokens against rows using one allow-list.
#[derive(Debug, Clone, Copy)]
pub struct FieldEvaluator {
    allowed: &'static [FieldFunction],
}

impl FieldEvaluator {
    /// Creates an evaluator permitting only `allowed`.
    pub const fn new(allowed: &'static [FieldFunction]) -> Self {
        Self { allowed }
    }

    /// Renders `template` for one row.
    pub fn render(&self, template: &str, row: &Row) -> String {
        FIELD_TOKEN
            .replace_all(template, |caps: &Captures<'_>| {
                let Some(value) = row.get(&caps[1]) else {
                    return String::new();
                };
                match caps.get(2) {
                    Some(call) => self.apply(value, call.as_str()),
                    None => json_to_text(value),
                }
            })
            .into_owned()
    }

    /// Applies a call expression to `value`.
    pub fn apply(&self, value: &JsonValue, call: &str) -> String {
        let raw = json_to_text(value);
        let Some(caps) = CALL.captures(call) else {
            return raw;
        };
        let Some(function) = FieldFunction::from_name(&caps[1]) else {
            return raw;
        };
        if !self.allowed.contains(&function) {
            return raw;
        }
        let args = split_args(&caps[2]);
        let evaluated = match function {
            FieldFunction::Date => format_date(value, &args),
            FieldFunction::Substr => substr(&raw, &args),
            FieldFunction::Rand => rand(value, &args),
        };
        evaluated.unwrap_or(raw)
    }
}

/// Splits an argument list on commas outside quotes and strips the quotes.
fn split_args(list: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in list.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => quote = Some(ch),
            (None, ',') => {
                args.push(current.trim().to_string());
                current.clear();
            }
            (None, c) => current.push(c),
        }
    }
    if !current.trim().is_empty() || !args.is_empty() {
        args.push(current.trim().to_string());
    }
    args
}

/// Arguments with the `@me` placeholder removed.
fn positional(args: &[String]) -> Vec<&str> {
    args.iter()
        .map(String::as_str)
        .filter(|a| *a != ME)
        .collect()
}

fn format_date(value: &JsonValue, args: &[String]) -> Option<String> {
    let format = positional(args).first().copied()?;
    let time = datefmt::time_from_json(value)?;
    Some(datefmt::format_php(&time, format))
}

fn substr(raw: &str, args: &[String]) -> Option<String> {
    let args = positional(args);
    let start: i64 = args.first()?.parse().ok()?;
    let len: i64 = args.get(1)?.parse().ok()?;
    let chars: Vec<char> = raw.chars().collect();
    let start = start.max(0) as usize;
    if start > chars.len() {
        return Some(String::new());
    }
    let end = start.saturating_add(len.max(0) as usize).min(chars.len());
    Some(chars[start..end].iter().collect())
}

fn rand(value: &JsonValue, args: &[String]) -> Option<String> {
    let args = positional(args);
    let lo: i64 = args.first()?.parse().ok()?;
    let hi: i64 = args.get(1)?.parse().ok()?;
    let span = i128::from(hi) - i128::from(lo) + 1;
    if span <= 0 {
        return None;
    }
    let n = i128::from(json_to_i64(value)?);
    Some((n.rem_euclid(span) + i128::from(lo)).to_string())
}
