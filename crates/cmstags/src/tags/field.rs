// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `{cms:field name="..."/}` and `{cms:global name="..."/}`.
//!
//! Unlike the `{cms:field.NAME/}` shorthand, which becomes a generic-stage
//! variable, these tags produce their text during preprocessing.

use crate::attributes::Attributes;
use crate::context::{json_to_text, RenderContext};
use crate::error::{Result, TagError};
use crate::fields::{FieldEvaluator, FieldFunction};
use crate::registry::TagHandler;

const EVALUATOR: FieldEvaluator =
    FieldEvaluator::new(&[FieldFunction::Substr, FieldFunction::Date]);

/// Reads a dotted path from the context tree.
///
/// `name="Fields.title"` or `name="Category.typename"` address the tree
/// from its root; a name that does not resolve there is looked up under
/// `Fields`. An optional `function` (`substring(start,len)` or
/// `strftime('Y-m-d')`) post-processes the value. A missing value renders
/// as the empty string.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldTag;

impl TagHandler for FieldTag {
    fn handle(&self, attrs: &Attributes, _body: &str, ctx: &RenderContext) -> Result<String> {
        let name = attrs
            .non_empty("name")
            .ok_or_else(|| TagError::handler("field", "missing name attribute"))?;

        let Some(value) = ctx
            .lookup_path(name)
            .or_else(|| ctx.lookup_path(&format!("Fields.{}", name)))
        else {
            return Ok(String::new());
        };

        Ok(match attrs.non_empty("function") {
            Some(call) => EVALUATOR.apply(&value, call),
            None => json_to_text(&value),
        })
    }
}

/// Reads one entry of `Globals`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalTag;

impl TagHandler for GlobalTag {
    fn handle(&self, attrs: &Attributes, _body: &str, ctx: &RenderContext) -> Result<String> {
        let name = attrs
            .non_empty("name")
            .ok_or_else(|| TagError::handler("global", "missing name attribute"))?;
        Ok(ctx.global(name).map(json_to_text).unwrap_or_default())
    }
}
