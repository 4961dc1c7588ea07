// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `{cms:flink}`: approved friend links.

use super::render_rows;
use crate::attributes::Attributes;
use crate::context::RenderContext;
use crate::data::{Condition, DataSource, Direction, Query};
use crate::error::Result;
use crate::fields::{FieldEvaluator, FieldFunction};
use crate::registry::TagHandler;
use serde_json::Value as JsonValue;
use std::sync::Arc;

const EVALUATOR: FieldEvaluator = FieldEvaluator::new(&[FieldFunction::Substr]);

/// Lists `flink` rows with `ischeck = 1` in id order.
///
/// `typeid` (when positive) restricts the link group; `webname` is cut to
/// `titlelen` characters (24) with `...` appended when it is longer.
#[derive(Debug)]
pub struct FriendLinkTag {
    data: Arc<dyn DataSource>,
}

impl FriendLinkTag {
    /// Creates the handler.
    pub fn new(data: Arc<dyn DataSource>) -> Self {
        Self { data }
    }
}

impl TagHandler for FriendLinkTag {
    fn handle(&self, attrs: &Attributes, body: &str, _ctx: &RenderContext) -> Result<String> {
        let mut query =
            Query::table("flink").filter(Condition::Eq("ischeck".into(), JsonValue::from(1)));
        if let Some(typeid) = attrs.int("typeid").filter(|t| *t > 0) {
            query = query.filter(Condition::Eq("typeid".into(), typeid.into()));
        }
        let query = query
            .order_by("id", Direction::Asc)
            .limit(attrs.positive("row", 10));

        let titlelen = attrs.positive("titlelen", 24);
        let mut rows = self.data.fetch_many(&query)?;
        for row in &mut rows {
            if let Some(JsonValue::String(name)) = row.get_mut("webname") {
                if name.chars().count() > titlelen {
                    let mut cut: String = name.chars().take(titlelen).collect();
                    cut.push_str("...");
                    *name = cut;
                }
            }
        }
        Ok(render_rows(body, &rows, EVALUATOR))
    }
}
