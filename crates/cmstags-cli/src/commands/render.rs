// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Render command.
//!
//! Renders one template with the fixture context and writes it to stdout.

use std::io::Write;
use std::path::Path;

use crate::commands::build_site;
use crate::config::Config;

/// Renders `template` to `out`.
pub fn render_to(
    config: &Config,
    template: &str,
    fixtures: Option<&Path>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let (engine, context) = build_site(config, fixtures)?;
    engine.render(out, template, &context)?;
    engine.flush_telemetry()?;
    Ok(())
}

/// Runs the render command.
pub fn run(config_path: &Path, template: &str, fixtures: Option<&Path>) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    render_to(&config, template, fixtures, &mut out)?;
    out.flush()?;
    Ok(())
}
