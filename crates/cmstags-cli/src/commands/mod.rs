// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! CLI command implementations.
//!
//! - `render`: Render one template to stdout
//! - `serve`: Serve templates over HTTP

/// Single template render command.
pub mod render;
/// HTTP server command.
pub mod serve;

use crate::config::Config;
use crate::fixtures::Fixtures;
use cmstags::{Engine, RenderContext};
use std::path::Path;
use tracing::info;

/// Builds the engine and base context for `config`.
///
/// `fixtures` overrides the fixture path of the configuration; without
/// either, the engine has no data collaborators and the context is empty.
pub fn build_site(
    config: &Config,
    fixtures: Option<&Path>,
) -> anyhow::Result<(Engine, RenderContext)> {
    let fixtures = match fixtures.or(config.fixtures.as_deref().map(Path::new)) {
        Some(path) => {
            info!(path = %path.display(), "loading fixtures");
            Fixtures::load(path)?
        }
        None => Fixtures::default(),
    };
    let services = fixtures.services(&config.site)?;
    let engine = Engine::from_config(config.engine.clone(), services)?;
    Ok((engine, fixtures.context))
}
