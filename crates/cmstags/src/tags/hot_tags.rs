// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `{cms:tag}`: keyword cloud.

use super::render_rows;
use crate::attributes::Attributes;
use crate::context::{json_to_text, RenderContext};
use crate::data::{Condition, DataSource, Direction, Query};
use crate::error::Result;
use crate::fields::{FieldEvaluator, FieldFunction};
use crate::registry::TagHandler;
use std::sync::Arc;

const EVALUATOR: FieldEvaluator = FieldEvaluator::new(&[FieldFunction::Rand]);

/// Lists `tagindex` rows, most used first by default.
///
/// Attributes: `row` (10), `orderby` (`count`), `orderway` (`desc`) and
/// `ishot` (only applied when zero or positive). Rows gain `tagurl`; the
/// body may use `rand(lo, hi)` to pick a stable size class per tag.
#[derive(Debug)]
pub struct HotTagsTag {
    data: Arc<dyn DataSource>,
}

impl HotTagsTag {
    /// Creates the handler.
    pub fn new(data: Arc<dyn DataSource>) -> Self {
        Self { data }
    }
}

impl TagHandler for HotTagsTag {
    fn handle(&self, attrs: &Attributes, body: &str, _ctx: &RenderContext) -> Result<String> {
        let mut query = Query::table("tagindex");
        if let Some(hot) = attrs.int("ishot").filter(|h| *h >= 0) {
            query = query.filter(Condition::Eq("ishot".into(), hot.into()));
        }
        let query = query
            .order_by(
                attrs.non_empty("orderby").unwrap_or("count"),
                Direction::parse(attrs.get_or("orderway", "desc")),
            )
            .limit(attrs.positive("row", 10));

        let mut rows = self.data.fetch_many(&query)?;
        for row in &mut rows {
            let tag = row.get("tag").map(json_to_text).unwrap_or_default();
            row.insert("tagurl".into(), format!("/tag/{}.html", tag).into());
        }
        Ok(render_rows(body, &rows, EVALUATOR))
    }
}
