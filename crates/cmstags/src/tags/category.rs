// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `{cms:channel}`: category navigation.

use super::render_rows;
use crate::attributes::Attributes;
use crate::context::{json_to_i64, RenderContext};
use crate::data::{Condition, DataSource, Direction, Query};
use crate::error::Result;
use crate::fields::FieldEvaluator;
use crate::registry::TagHandler;
use serde_json::Value as JsonValue;
use std::sync::Arc;

const EVALUATOR: FieldEvaluator = FieldEvaluator::new(&[]);

/// Lists visible `arctype` rows under one parent, ordered by `sortrank`.
///
/// `typeid` selects the parent (top level when absent). The row whose id is
/// the current category gets `[field:currentstyle/]` set to the
/// `currentstyle` attribute; every other row gets the empty string.
#[derive(Debug)]
pub struct ChannelTag {
    data: Arc<dyn DataSource>,
}

impl ChannelTag {
    /// Creates the handler.
    pub fn new(data: Arc<dyn DataSource>) -> Self {
        Self { data }
    }
}

impl TagHandler for ChannelTag {
    fn handle(&self, attrs: &Attributes, body: &str, ctx: &RenderContext) -> Result<String> {
        let parent = attrs.int("typeid").unwrap_or(0);
        let query = Query::table("arctype")
            .filter(Condition::Eq("ishidden".into(), JsonValue::from(0)))
            .filter(Condition::Eq("reid".into(), parent.into()))
            .order_by("sortrank", Direction::Asc)
            .limit(attrs.positive("row", 10));
        let mut rows = self.data.fetch_many(&query)?;

        let current = ctx.current_category_id();
        let style = attrs.get_or("currentstyle", "");
        for row in &mut rows {
            let id = row.get("id").and_then(json_to_i64);
            let class = if id.is_some() && id == current { style } else { "" };
            row.insert("currentstyle".into(), class.into());
            row.insert(
                "typeurl".into(),
                format!("/list/{}.html", id.unwrap_or(0)).into(),
            );
        }
        Ok(render_rows(body, &rows, EVALUATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Category;
    use crate::data::MemoryDataSource;
    use serde_json::json;

    fn tag() -> ChannelTag {
        let data = MemoryDataSource::new().with_table(
            "arctype",
            vec![
                json!({"id": 2, "reid": 0, "ishidden": 0, "sortrank": 2, "typename": "Sports"}),
                json!({"id": 1, "reid": 0, "ishidden": 0, "sortrank": 1, "typename": "News"}),
                json!({"id": 3, "reid": 0, "ishidden": 1, "sortrank": 3, "typename": "Hidden"}),
                json!({"id": 4, "reid": 1, "ishidden": 0, "sortrank": 1, "typename": "Local"}),
            ],
        );
        ChannelTag::new(Arc::new(data))
    }

    const BODY: &str = r#"<li class="[field:currentstyle/]"><a href="[field:typeurl/]">[field:typename/]</a></li>"#;

    #[test]
    fn test_marks_current_category() {
        let ctx = RenderContext::new().with_category(Category {
            id: 1,
            ..Category::default()
        });
        let out = tag()
            .handle(&Attributes::parse(r#"currentstyle="active""#), BODY, &ctx)
            .unwrap();
        assert_eq!(
            out,
            r#"<li class="active"><a href="/list/1.html">News</a></li><li class=""><a href="/list/2.html">Sports</a></li>"#
        );
    }

    #[test]
    fn test_current_from_record_typeid() {
        let ctx = RenderContext::new().with_field("typeid", 2);
        let attrs = Attributes::parse(r#"currentstyle="on""#);
        let out = tag().handle(&attrs, "[field:id/]=[field:currentstyle/];", &ctx).unwrap();
        assert_eq!(out, "1=;2=on;");
    }

    #[test]
    fn test_children_of_parent() {
        let out = tag()
            .handle(&Attributes::parse(r#"typeid="1""#), "[field:typename/]", &RenderContext::new())
            .unwrap();
        assert_eq!(out, "Local");
    }
}
