// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

// TagError::Render carries a source snippet for error reports.
#![allow(clippy::result_large_err)]

//! # cmstags
//!
//! CMS tag preprocessor and two-stage HTML template engine.
//!
//! Templates mix custom tags in a configurable namespace with ordinary
//! minijinja syntax:
//!
//! ```html
//! <ul>
//! {cms:arclist typeid="3" row="5" titlelen="30"}
//!   <li><a href="[field:arcurl/]">[field:title/]</a>
//!       [field:pubdate function="date('Y-m-d')"/]</li>
//! {/cms:arclist}
//! </ul>
//! <h1>{cms:field.title/}</h1>
//! {{ upper(Globals.site_name) }}
//! ```
//!
//! ## Pipeline
//!
//! 1. The template text is read through a [`TemplateResolver`].
//! 2. The [`Preprocessor`] expands block tags, rewrites `{cms:field.X/}` and
//!    `{cms:global.X/}` references, then expands self-closing tags. Every
//!    tag goes to the [`TagHandler`] registered under its name; an unknown
//!    tag or a failing handler leaves the tag text in place.
//! 3. The [`GenericRenderer`] evaluates `{{ }}` syntax with the function
//!    library against the [`RenderContext`]. A failure here aborts the
//!    render.
//! 4. The result is optionally stored in a [`RenderCache`] under the
//!    template name.
//!
//! ## Quick Start
//!
//! ```rust
//! use cmstags::{Engine, EngineConfig, MemoryDataSource, MemoryResolver, RenderContext, Services};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let data = MemoryDataSource::new().with_table(
//!     "arctype",
//!     vec![json!({"id": 1, "typename": "News", "reid": 0, "ishidden": 0, "sortrank": 1})],
//! );
//! let resolver = MemoryResolver::new().with_template(
//!     "nav.htm",
//!     "{cms:channel}<a href=\"[field:typeurl/]\">[field:typename/]</a>{/cms:channel}",
//! );
//! let engine = Engine::with_memory_cache(
//!     EngineConfig::default(),
//!     resolver,
//!     Services::new().with_data(Arc::new(data)),
//! )?;
//!
//! let html = engine.render_to_string("nav.htm", &RenderContext::new())?;
//! assert_eq!(html, "<a href=\"/list/1.html\">News</a>");
//! # Ok::<(), cmstags::TagError>(())
//! ```

/// Tag attribute parsing.
pub mod attributes;
/// Rendered page caching.
pub mod cache;
/// Engine configuration.
pub mod config;
/// Render context tree.
pub mod context;
/// Query collaborator.
pub mod data;
/// PHP-style date formats and durations.
pub mod datefmt;
/// Main template engine.
pub mod engine;
/// Error types and reporting.
pub mod error;
/// `[field:...]` item substitution.
pub mod fields;
/// Generic-stage function library.
pub mod functions;
/// Generic (minijinja) stage.
pub mod generic;
/// Tag recognition and dispatch.
pub mod markup;
/// In-memory template resolver for tests and embedding.
pub mod memory_resolver;
/// Tag handler table.
pub mod registry;
/// Template resolution.
pub mod resolver;
/// HTTP response abstraction.
pub mod response;
/// Translation, SEO and stats collaborators.
pub mod services;
/// Built-in tag handlers.
pub mod tags;
/// Best-effort hit counting.
pub mod telemetry;

pub use attributes::Attributes;
pub use cache::*;
pub use config::{CacheConfig, EngineConfig, TelemetryConfig};
pub use context::{Category, Pagination, RenderContext, RequestInfo, Row};
pub use data::{Condition, DataSource, Direction, MemoryDataSource, Query};
pub use engine::Engine;
pub use error::*;
pub use fields::{FieldEvaluator, FieldFunction};
pub use generic::GenericRenderer;
pub use markup::{Preprocessor, TagInvocation};
pub use memory_resolver::MemoryResolver;
pub use registry::{handler_fn, TagHandler, TagRegistry};
pub use resolver::*;
pub use response::HtmlResponse;
pub use services::*;
pub use telemetry::{Hit, HitQueue};

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod tests;
