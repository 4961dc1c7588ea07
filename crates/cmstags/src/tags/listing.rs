// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `{cms:arclist}`: article listing.
//!
//! ```html
//! {cms:arclist typeid="2,3" row="5" orderby="pubdate" titlelen="20"}
//!   <li><a href="[field:arcurl/]">[field:title/]</a> [field:pubdate function="date('Y-m-d',@me)"/]</li>
//! {/cms:arclist}
//! ```

use super::{int_list, render_rows};
use crate::attributes::Attributes;
use crate::context::{json_to_i64, RenderContext, Row};
use crate::data::{Condition, DataSource, Direction, Query};
use crate::error::Result;
use crate::fields::{FieldEvaluator, FieldFunction};
use crate::registry::TagHandler;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::warn;

const EVALUATOR: FieldEvaluator =
    FieldEvaluator::new(&[FieldFunction::Date, FieldFunction::Substr]);

/// Lists rows of `archives` with `arcrank > -1`.
///
/// Attributes: `typeid` (one id or a comma set), `idlist`, `idrange`
/// (`lo-hi`), `row` (10), `orderby` (`id`), `orderway` (`desc`) and
/// `titlelen`. Every row gains `arcurl` and `typeurl`, plus `typename` and
/// `typedir` from `arctype` and `body` from `addonarticle` when those rows
/// exist.
#[derive(Debug)]
pub struct ArcListTag {
    data: Arc<dyn DataSource>,
}

impl ArcListTag {
    /// Creates the handler.
    pub fn new(data: Arc<dyn DataSource>) -> Self {
        Self { data }
    }

    fn query(attrs: &Attributes) -> Query {
        let mut query =
            Query::table("archives").filter(Condition::Gt("arcrank".into(), JsonValue::from(-1)));

        if let Some(typeid) = attrs.non_empty("typeid") {
            if typeid.contains(',') {
                query = query.filter(Condition::In("typeid".into(), int_list(typeid)));
            } else if let Ok(id) = typeid.trim().parse::<i64>() {
                query = query.filter(Condition::Eq("typeid".into(), id.into()));
            }
        }
        if let Some(ids) = attrs.non_empty("idlist") {
            query = query.filter(Condition::In("id".into(), int_list(ids)));
        }
        if let Some((lo, hi)) = attrs.non_empty("idrange").and_then(parse_range) {
            query = query.filter(Condition::Between("id".into(), lo.into(), hi.into()));
        }

        query
            .order_by(
                attrs.non_empty("orderby").unwrap_or("id"),
                Direction::parse(attrs.get_or("orderway", "desc")),
            )
            .limit(attrs.positive("row", 10))
    }

    fn lookup(&self, table: &str, column: &str, id: i64) -> Option<Row> {
        let query = Query::table(table).filter(Condition::Eq(column.into(), id.into()));
        match self.data.fetch_one(&query) {
            Ok(row) => row,
            Err(err) => {
                warn!(table = %table, id, error = %err, "arclist join skipped");
                None
            }
        }
    }

    fn decorate(&self, row: &mut Row, titlelen: Option<usize>) {
        let id = row.get("id").and_then(json_to_i64).unwrap_or(0);
        let typeid = row.get("typeid").and_then(json_to_i64).unwrap_or(0);
        row.insert("arcurl".into(), format!("/article/{}.html", id).into());
        row.insert("typeurl".into(), format!("/list/{}.html", typeid).into());

        if let Some(category) = self.lookup("arctype", "id", typeid) {
            for column in ["typename", "typedir"] {
                if let Some(value) = category.get(column) {
                    row.insert(column.into(), value.clone());
                }
            }
        }
        if let Some(body) = self
            .lookup("addonarticle", "aid", id)
            .and_then(|addon| addon.get("body").cloned())
        {
            row.insert("body".into(), body);
        }

        if let (Some(len), Some(JsonValue::String(title))) = (titlelen, row.get_mut("title")) {
            if title.chars().count() > len {
                *title = title.chars().take(len).collect();
            }
        }
    }
}

fn parse_range(raw: &str) -> Option<(i64, i64)> {
    let (lo, hi) = raw.split_once('-')?;
    Some((lo.trim().parse().ok()?, hi.trim().parse().ok()?))
}

impl TagHandler for ArcListTag {
    fn handle(&self, attrs: &Attributes, body: &str, _ctx: &RenderContext) -> Result<String> {
        let mut rows = self.data.fetch_many(&Self::query(attrs))?;
        let titlelen = attrs.int("titlelen").filter(|l| *l > 0).map(|l| l as usize);
        for row in &mut rows {
            self.decorate(row, titlelen);
        }
        Ok(render_rows(body, &rows, EVALUATOR))
    }
}
