// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Tag attribute parsing.
//!
//! Attributes are `key="value"` or `key='value'` pairs with optional
//! whitespace around `=`. There are no escape sequences; anything that does
//! not fit the grammar is skipped silently.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref SINGLE_QUOTED: Regex = Regex::new(r"([a-zA-Z0-9_]+)\s*=\s*'([^']*)'").unwrap();
    static ref DOUBLE_QUOTED: Regex = Regex::new(r#"([a-zA-Z0-9_]+)\s*=\s*"([^"]*)""#).unwrap();
}

/// Attributes of one tag invocation.
///
/// Built from two independent passes over the raw attribute text: single
/// quoted pairs first, then double quoted ones, so a key present in both
/// styles keeps its double-quoted value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    values: HashMap<String, String>,
}

impl Attributes {
    /// Parses a raw attribute string such as ` row="10" titlelen='30'`.
    pub fn parse(raw: &str) -> Self {
        let mut values = HashMap::new();
        let raw = raw.trim();
        if raw.is_empty() {
            return Self { values };
        }

        for caps in SINGLE_QUOTED.captures_iter(raw) {
            values.insert(caps[1].to_string(), caps[2].to_string());
        }
        for caps in DOUBLE_QUOTED.captures_iter(raw) {
            values.insert(caps[1].to_string(), caps[2].to_string());
        }

        Self { values }
    }

    /// Returns the raw value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns the value of `key`, or `default` when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Returns the value of `key` when it is present and non-empty.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Parses `key` as a strictly positive integer, falling back to `default`
    /// when the value is missing, malformed or not positive.
    pub fn positive(&self, key: &str, default: usize) -> usize {
        self.get(key)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(default)
    }

    /// Parses `key` as an integer.
    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.trim().parse::<i64>().ok())
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over all attributes in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_quote_styles() {
        let attrs = Attributes::parse(r#"a="1" b='2'"#);
        assert_eq!(attrs.get("a"), Some("1"));
        assert_eq!(attrs.get("b"), Some("2"));

        let reversed = Attributes::parse(r#"b='2' a="1""#);
        assert_eq!(attrs, reversed);
    }

    #[test]
    fn test_double_quotes_win_ties() {
        let attrs = Attributes::parse(r#"row="5" row='9'"#);
        assert_eq!(attrs.get("row"), Some("5"));
    }

    #[test]
    fn test_whitespace_around_equals() {
        let attrs = Attributes::parse("  typeid = \"3\"   orderby\t=\t'pubdate' ");
        assert_eq!(attrs.get("typeid"), Some("3"));
        assert_eq!(attrs.get("orderby"), Some("pubdate"));
    }

    #[test]
    fn test_malformed_fragments_are_skipped() {
        let attrs = Attributes::parse(r#"bare row=10 title="ok" broken="unterminated"#);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get("title"), Some("ok"));
    }

    #[test]
    fn test_empty_and_quoted_content() {
        assert!(Attributes::parse("   ").is_empty());
        let attrs = Attributes::parse(r#"function="date('Y-m-d',@me)""#);
        assert_eq!(attrs.get("function"), Some("date('Y-m-d',@me)"));
    }

    #[test]
    fn test_typed_accessors() {
        let attrs = Attributes::parse(r#"row="0" listsize="7" ishot="-1" name="""#);
        assert_eq!(attrs.positive("row", 10), 10);
        assert_eq!(attrs.positive("listsize", 10), 7);
        assert_eq!(attrs.int("ishot"), Some(-1));
        assert_eq!(attrs.non_empty("name"), None);
        assert_eq!(attrs.get_or("missing", "dflt"), "dflt");
    }
}
