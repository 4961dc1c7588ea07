// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Render context shared by tag handlers and the generic stage.
//!
//! The context is read-only during a render. It serialises as
//!
//! ```json
//! {
//!   "Fields": {...}, "Globals": {...}, "Pagination": {...},
//!   "Category": {...}, "Request": {...}, "Lang": "en"
//! }
//! ```
//!
//! so the generic stage can reach `{{ Fields.title }}` while handlers use the
//! typed accessors below. Absent sub-trees are `None`, never a silent default.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// One record: column name to JSON value.
pub type Row = Map<String, JsonValue>;

/// Pagination state of a list page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Pagination {
    /// Current page, 1-based.
    pub current_page: u32,
    /// Total number of pages.
    pub total_pages: u32,
    /// Total number of items across all pages.
    pub total_items: u64,
    /// Whether a previous page exists; derived from `current_page` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_prev: Option<bool>,
    /// Whether a next page exists; derived from `current_page` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_next: Option<bool>,
    /// Previous page number; defaults to `current_page - 1` (at least 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_page: Option<u32>,
    /// Next page number; defaults to `current_page + 1` (at most `total_pages`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u32>,
}

impl Pagination {
    /// Creates pagination state for page `current_page` of `total_pages`.
    pub fn new(current_page: u32, total_pages: u32, total_items: u64) -> Self {
        Self {
            current_page: current_page.max(1),
            total_pages: total_pages.max(1),
            total_items,
            ..Self::default()
        }
    }

    /// Current page, at least 1.
    pub fn current(&self) -> u32 {
        self.current_page.max(1)
    }

    /// Total pages, at least 1.
    pub fn total(&self) -> u32 {
        self.total_pages.max(1)
    }

    /// Whether a previous page exists.
    pub fn has_prev(&self) -> bool {
        self.has_prev.unwrap_or(self.current() > 1)
    }

    /// Whether a next page exists.
    pub fn has_next(&self) -> bool {
        self.has_next.unwrap_or(self.current() < self.total())
    }

    /// Previous page number.
    pub fn prev(&self) -> u32 {
        self.prev_page
            .unwrap_or_else(|| self.current().saturating_sub(1).max(1))
    }

    /// Next page number.
    pub fn next(&self) -> u32 {
        self.next_page
            .unwrap_or_else(|| self.current().saturating_add(1).min(self.total()))
    }
}

/// The category a page belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Category id.
    pub id: i64,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typename: Option<String>,
    /// Any further category columns.
    #[serde(flatten)]
    pub extra: Row,
}

/// The request being served, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestInfo {
    /// Request URL (path and query) used as the base for page links.
    #[serde(rename = "URL")]
    pub url: String,
    /// HTTP method.
    #[serde(rename = "Method", default)]
    pub method: String,
}

/// Read-only data tree for a single render.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderContext {
    /// Fields of the current record (`{cms:field.NAME/}`).
    #[serde(rename = "Fields", default)]
    pub fields: Row,
    /// Site-wide values (`{cms:global.NAME/}`).
    #[serde(rename = "Globals", default)]
    pub globals: Row,
    /// Pagination of list pages.
    #[serde(rename = "Pagination", default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    /// Current category.
    #[serde(rename = "Category", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Current request.
    #[serde(rename = "Request", default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestInfo>,
    /// Current language code.
    #[serde(rename = "Lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl RenderContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field value.
    pub fn with_field(mut self, name: &str, value: impl Into<JsonValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Sets a global value.
    pub fn with_global(mut self, name: &str, value: impl Into<JsonValue>) -> Self {
        self.globals.insert(name.to_string(), value.into());
        self
    }

    /// Sets the pagination state.
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Sets the current category.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Sets the current request URL.
    pub fn with_request_url(mut self, url: impl Into<String>) -> Self {
        self.request = Some(RequestInfo {
            url: url.into(),
            method: "GET".to_string(),
        });
        self
    }

    /// Sets the language code.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Looks up a field of the current record.
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.fields.get(name)
    }

    /// Looks up a global value.
    pub fn global(&self, name: &str) -> Option<&JsonValue> {
        self.globals.get(name)
    }

    /// Pagination state, if this is a list page.
    pub fn pagination(&self) -> Option<&Pagination> {
        self.pagination.as_ref()
    }

    /// Current category, if any.
    pub fn category(&self) -> Option<&Category> {
        self.category.as_ref()
    }

    /// Request URL, if rendering for a request.
    pub fn request_url(&self) -> Option<&str> {
        self.request.as_ref().map(|r| r.url.as_str())
    }

    /// Language code, if set.
    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    /// Id of the category being displayed: `Category.id`, else the
    /// `typeid` field of the current record.
    pub fn current_category_id(&self) -> Option<i64> {
        self.category
            .as_ref()
            .map(|c| c.id)
            .or_else(|| self.fields.get("typeid").and_then(json_to_i64))
    }

    /// Resolves a dotted path such as `Fields.title` or `Globals.site.name`
    /// against the serialised context tree.
    pub fn lookup_path(&self, path: &str) -> Option<JsonValue> {
        let tree = serde_json::to_value(self).ok()?;
        let mut current = &tree;
        for part in path.split('.') {
            current = current.as_object()?.get(part)?;
        }
        Some(current.clone())
    }
}

/// Reads an integer from a JSON number or numeric string.
pub fn json_to_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        JsonValue::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Renders a JSON value as plain text: strings without quotes, null as empty.
pub fn json_to_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialises_named_subtrees() {
        let ctx = RenderContext::new()
            .with_field("title", "Hello")
            .with_global("site", "Demo")
            .with_pagination(Pagination::new(2, 5, 48))
            .with_request_url("/list/5.html");
        let tree = serde_json::to_value(&ctx).unwrap();
        assert_eq!(tree["Fields"]["title"], json!("Hello"));
        assert_eq!(tree["Globals"]["site"], json!("Demo"));
        assert_eq!(tree["Pagination"]["CurrentPage"], json!(2));
        assert_eq!(tree["Request"]["URL"], json!("/list/5.html"));
        assert!(tree.get("Category").is_none());
    }

    #[test]
    fn test_current_category_prefers_category() {
        let ctx = RenderContext::new().with_field("typeid", 4);
        assert_eq!(ctx.current_category_id(), Some(4));

        let ctx = ctx.with_category(Category {
            id: 9,
            ..Category::default()
        });
        assert_eq!(ctx.current_category_id(), Some(9));

        assert_eq!(RenderContext::new().current_category_id(), None);
    }

    #[test]
    fn test_pagination_derived_values() {
        let first = Pagination::new(1, 3, 30);
        assert!(!first.has_prev());
        assert!(first.has_next());
        assert_eq!(first.prev(), 1);
        assert_eq!(first.next(), 2);

        let last = Pagination::new(3, 3, 30);
        assert!(!last.has_next());
        assert_eq!(last.next(), 3);
    }

    #[test]
    fn test_lookup_path() {
        let ctx = RenderContext::new().with_global("site", json!({"name": "Demo"}));
        assert_eq!(ctx.lookup_path("Globals.site.name"), Some(json!("Demo")));
        assert_eq!(ctx.lookup_path("Globals.missing"), None);
    }

    #[test]
    fn test_json_helpers() {
        assert_eq!(json_to_i64(&json!("12")), Some(12));
        assert_eq!(json_to_i64(&json!(3.0)), Some(3));
        assert_eq!(json_to_text(&json!("x")), "x");
        assert_eq!(json_to_text(&json!(5)), "5");
        assert_eq!(json_to_text(&JsonValue::Null), "");
    }

    #[test]
    fn test_pagination_neighbours_stay_in_range() {
        let last = Pagination::new(u32::MAX, u32::MAX, 0);
        assert_eq!(last.next(), u32::MAX);
        assert!(!last.has_next());
        assert_eq!(last.prev(), u32::MAX - 1);

        let first = Pagination::new(0, 0, 0);
        assert_eq!((first.prev(), first.next()), (1, 1));
        assert!(!first.has_prev());
    }
}
