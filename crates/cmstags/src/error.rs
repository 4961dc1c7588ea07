// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for the cmstags engine.
//!
//! This module defines [`TagError`], the main error enum, and [`SourceContext`]
//! for rich reporting of generic-stage failures.
//!
//! # Error Categories
//!
//! - **I/O and resolution errors**: a template or include could not be read
//! - **Render errors**: the generic `{{ }}` stage failed to compile or execute
//! - **Handler errors**: a tag handler failed; these never abort a render,
//!   the dispatcher logs them and leaves the tag text in place
//! - **Collaborator errors**: query, translation, SEO or stats services failed
//! - **Cache and configuration errors**
//!
//! Only I/O, resolution and render errors escape [`Engine::render`](crate::Engine::render).

use std::fmt;
use thiserror::Error;

/// Source context for generic-stage error messages.
///
/// Captures a snippet of the preprocessed template around the failing line,
/// so the message points at the text the generic stage actually saw.
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// All lines of the preprocessed source.
    pub lines: Vec<String>,
    /// The line number where the error occurred (1-indexed).
    pub error_line: usize,
    /// First line number of the snippet (1-indexed).
    pub snippet_start: usize,
    /// Last line number of the snippet (1-indexed).
    pub snippet_end: usize,
}

impl SourceContext {
    /// Creates a source context from source text and an error line.
    ///
    /// Captures 2 lines before and after the error line.
    pub fn from_source(source: &str, line: usize) -> Self {
        let lines: Vec<String> = source.lines().map(|l| l.to_string()).collect();
        let snippet_start = line.saturating_sub(2).max(1);
        let snippet_end = (line + 2).min(lines.len());

        Self {
            lines,
            error_line: line,
            snippet_start,
            snippet_end,
        }
    }

    /// Formats the snippet with line numbers and a marker on the error line.
    ///
    /// ```text
    ///    3 | <ul>
    ///  > 4 |   {{ Fields.title | nope }}
    ///    5 | </ul>
    /// ```
    pub fn format_snippet(&self) -> String {
        let mut result = String::new();

        for line_num in self.snippet_start..=self.snippet_end {
            if line_num == 0 || line_num > self.lines.len() {
                break;
            }
            let marker = if line_num == self.error_line { '>' } else { ' ' };
            result.push_str(&format!(
                " {} {:3} | {}\n",
                marker,
                line_num,
                self.lines[line_num - 1]
            ));
        }

        result
    }
}

impl fmt::Display for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_snippet())
    }
}

/// Helper struct for displaying optional source context.
pub struct OptSourceContextDisplay<'a>(pub &'a Option<SourceContext>);

impl fmt::Display for OptSourceContextDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ctx) => write!(f, "\n{}", ctx),
            None => Ok(()),
        }
    }
}

/// Helper trait for formatting optional source context.
pub trait AsDisplay<'a> {
    /// Wraps self for Display formatting.
    fn as_display(&'a self) -> OptSourceContextDisplay<'a>;
}

impl<'a> AsDisplay<'a> for Option<SourceContext> {
    fn as_display(&'a self) -> OptSourceContextDisplay<'a> {
        OptSourceContextDisplay(self)
    }
}

/// The main error type for cmstags operations.
#[derive(Error, Debug)]
pub enum TagError {
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A template or included file could not be found.
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// The generic stage failed to compile or execute the preprocessed text.
    #[error("Render error in {template}: {message}{}", source_context.as_display())]
    Render {
        /// Template being rendered.
        template: String,
        /// Error message from the generic stage.
        message: String,
        /// Line of the preprocessed text, if known.
        line: Option<usize>,
        /// Snippet around the failing line.
        source_context: Option<SourceContext>,
    },

    /// A tag handler could not produce its output.
    #[error("Tag '{tag}' failed: {message}")]
    Handler {
        /// Tag name.
        tag: String,
        /// Failure description.
        message: String,
    },

    /// Query collaborator failure.
    #[error("Data error: {0}")]
    Data(String),

    /// Translation, SEO or stats collaborator failure.
    #[error("Service error: {0}")]
    Service(String),

    /// Cache operation failed.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TagError {
    /// Shorthand for a handler failure.
    pub fn handler(tag: &str, message: impl Into<String>) -> Self {
        TagError::Handler {
            tag: tag.to_string(),
            message: message.into(),
        }
    }

    /// Builds a render error for `template`, attaching a snippet of the
    /// preprocessed `source` when the generic stage reported a line.
    pub fn render(template: &str, source: &str, err: &minijinja::Error) -> Self {
        let line = err.line();
        let message = match err.detail() {
            Some(detail) => format!("{}: {}", err.kind(), detail),
            None => err.kind().to_string(),
        };
        TagError::Render {
            template: template.to_string(),
            message,
            line,
            source_context: line.map(|l| SourceContext::from_source(source, l)),
        }
    }
}

impl From<minijinja::Error> for TagError {
    fn from(err: minijinja::Error) -> Self {
        TagError::Render {
            template: err.name().unwrap_or("<string>").to_string(),
            message: err.to_string(),
            line: err.line(),
            source_context: None,
        }
    }
}

impl From<toml::de::Error> for TagError {
    fn from(err: toml::de::Error) -> Self {
        TagError::Config(err.to_string())
    }
}

/// Convenience type alias for Results with [`TagError`].
pub type Result<T> = std::result::Result<T, TagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_marks_error_line() {
        let ctx = SourceContext::from_source("a\nb\nc\nd\ne\nf", 4);
        let snippet = ctx.format_snippet();
        assert!(snippet.contains(">   4 | d"));
        assert!(snippet.contains("    2 | b"));
        assert!(!snippet.contains("| a"));
    }

    #[test]
    fn test_render_error_from_minijinja() {
        let env = minijinja::Environment::new();
        let source = "line one\n{{ unclosed";
        let err = env.render_str(source, ()).unwrap_err();
        let tag_err = TagError::render("page.htm", source, &err);
        match tag_err {
            TagError::Render {
                template, line, ..
            } => {
                assert_eq!(template, "page.htm");
                assert_eq!(line, Some(2));
            }
            other => panic!("expected render error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: TagError = io_err.into();
        assert!(matches!(err, TagError::Io(_)));
        assert!(err.to_string().contains("missing"));
    }
}
