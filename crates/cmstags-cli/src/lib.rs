// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! cmstags CLI library.
//!
//! This crate provides the command-line interface for the cmstags engine:
//! rendering a single template and serving a template directory over HTTP,
//! with a JSON fixture file standing in for the CMS database.
//!
//! # Usage
//!
//! This crate is primarily used through the `cmstags` binary:
//!
//! ```bash
//! cmstags render index.htm --fixtures fixtures.json
//! cmstags serve --port 3000
//! ```
//!
//! # Configuration
//!
//! Projects are configured via `cmstags.toml` at the project root.

/// CLI commands (render, serve).
pub mod commands;
/// Project configuration from `cmstags.toml`.
pub mod config;
/// JSON fixtures for tables, context and services.
pub mod fixtures;
