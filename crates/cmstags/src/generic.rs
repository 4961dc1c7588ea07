// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Second rendering stage.
//!
//! Compiles the preprocessed text with minijinja and evaluates it against
//! the serialised [`RenderContext`]. Any compile or execution failure is
//! returned as [`TagError::Render`]; there is no partial output.

use crate::context::RenderContext;
use crate::error::{Result, TagError};
use crate::functions;
use minijinja::{AutoEscape, Environment};

/// minijinja environment with the function library installed.
#[derive(Debug)]
pub struct GenericRenderer {
    env: Environment<'static>,
}

impl GenericRenderer {
    /// Creates a renderer; `auto_escape` turns on HTML escaping of `{{ }}`
    /// output.
    pub fn new(auto_escape: bool) -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(move |_| {
            if auto_escape {
                AutoEscape::Html
            } else {
                AutoEscape::None
            }
        });
        functions::register_functions(&mut env);
        Self { env }
    }

    /// Renders `source` under `name`.
    pub fn render(&self, name: &str, source: &str, ctx: &RenderContext) -> Result<String> {
        self.env
            .render_named_str(name, source, ctx)
            .map_err(|err| TagError::render(name, source, &err))
    }
}

impl Default for GenericRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}
