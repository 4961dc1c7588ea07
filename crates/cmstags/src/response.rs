// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTTP response abstraction for rendered pages.
//!
//! [`Engine::render_response`](crate::Engine::render_response) returns an
//! [`HtmlResponse`] so that an HTTP adapter (the CLI server, or any other
//! framework) can copy status, headers and body into its own response type.

use std::collections::HashMap;

/// Content type set on every rendered page.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// A platform-agnostic HTML response.
///
/// # Example
///
/// ```rust
/// use cmstags::HtmlResponse;
///
/// let page = HtmlResponse::ok("<h1>Hello</h1>");
/// assert_eq!(page.status, 200);
/// assert_eq!(page.content_type(), Some("text/html; charset=utf-8"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlResponse {
    /// HTTP status code.
    pub status: u16,
    /// HTTP headers, always including `Content-Type`.
    pub headers: HashMap<String, String>,
    /// HTML body.
    pub body: String,
}

impl HtmlResponse {
    /// Creates an HTML response with the given status.
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), HTML_CONTENT_TYPE.to_string());
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Creates a 200 OK response.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::html(200, body)
    }

    /// Creates a 404 Not Found response.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::html(404, message)
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::html(500, message)
    }

    /// Returns the `Content-Type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("Content-Type").map(String::as_str)
    }

    /// Returns true if this is a success response (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Adds a header to the response.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

impl Default for HtmlResponse {
    fn default() -> Self {
        Self::ok("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_response() {
        let resp = HtmlResponse::ok("<h1>Hello</h1>");
        assert_eq!(resp.status, 200);
        assert!(resp.is_success());
        assert_eq!(resp.body, "<h1>Hello</h1>");
        assert_eq!(resp.content_type(), Some(HTML_CONTENT_TYPE));
    }

    #[test]
    fn test_error_keeps_html_content_type() {
        let resp = HtmlResponse::not_found("Page not found");
        assert_eq!(resp.status, 404);
        assert!(!resp.is_success());
        assert_eq!(resp.content_type(), Some(HTML_CONTENT_TYPE));
    }

    #[test]
    fn test_with_header() {
        let resp = HtmlResponse::ok("test").with_header("X-Cache", "hit");
        assert_eq!(resp.headers.get("X-Cache"), Some(&"hit".to_string()));
    }
}
