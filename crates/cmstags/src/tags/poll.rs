// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `{cms:vote id="N"/}`: poll form.

use crate::attributes::Attributes;
use crate::context::{json_to_i64, json_to_text, RenderContext};
use crate::data::{Condition, DataSource, Direction, Query};
use crate::error::{Result, TagError};
use crate::registry::TagHandler;
use std::fmt::Write;
use std::sync::Arc;

/// Renders a `vote` row and its `vote_option` rows as a form posting to
/// `/vote.php`. Options keep their `sortid` order; a poll with `ismore = 1`
/// uses checkboxes, any other poll radio buttons.
#[derive(Debug)]
pub struct PollTag {
    data: Arc<dyn DataSource>,
}

impl PollTag {
    /// Creates the handler.
    pub fn new(data: Arc<dyn DataSource>) -> Self {
        Self { data }
    }
}

impl TagHandler for PollTag {
    fn handle(&self, attrs: &Attributes, _body: &str, _ctx: &RenderContext) -> Result<String> {
        let id = attrs
            .int("id")
            .filter(|id| *id > 0)
            .ok_or_else(|| TagError::handler("vote", "missing or invalid id attribute"))?;

        let vote = self
            .data
            .fetch_one(&Query::table("vote").filter(Condition::Eq("id".into(), id.into())))?
            .ok_or_else(|| TagError::handler("vote", format!("poll {} not found", id)))?;
        let options = self.data.fetch_many(
            &Query::table("vote_option")
                .filter(Condition::Eq("voteid".into(), id.into()))
                .order_by("sortid", Direction::Asc),
        )?;

        let input = if vote.get("ismore").and_then(json_to_i64) == Some(1) {
            "checkbox"
        } else {
            "radio"
        };
        let title = vote.get("title").map(json_to_text).unwrap_or_default();

        let mut html = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(
            html,
            r#"<form name="voteform{id}" method="post" action="/vote.php" target="_blank">"#
        );
        let _ = writeln!(html, r#"<input type="hidden" name="id" value="{id}">"#);
        let _ = writeln!(html, r#"<div class="votetitle">{title}</div>"#);
        html.push_str("<div class=\"voteoptions\">\n");
        for option in &options {
            let value = option.get("id").and_then(json_to_i64).unwrap_or(0);
            let name = option.get("name").map(json_to_text).unwrap_or_default();
            let _ = writeln!(
                html,
                r#"<div class="voteoption"><input type="{input}" name="voteitem" value="{value}"> {name}</div>"#
            );
        }
        html.push_str("</div>\n");
        html.push_str(
            "<div class=\"votesubmit\"><input type=\"submit\" name=\"votesubmit\" value=\"Vote\"></div>\n",
        );
        html.push_str("</form>\n");
        Ok(html)
    }
}
