// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `{cms:myad id="N"/}`: one advertisement slot.

use crate::attributes::Attributes;
use crate::context::{json_to_i64, json_to_text, RenderContext, Row};
use crate::data::{Condition, DataSource, Query};
use crate::datefmt;
use crate::error::{Result, TagError};
use crate::registry::TagHandler;
use crate::telemetry::{Hit, HitQueue};
use chrono::Local;
use std::sync::Arc;

/// Renders the stored `normbody` of a `myad` row.
///
/// An ad is shown only when `ischeck` is 1 and the current time lies within
/// `[starttime, endtime]` (either bound may be absent). A shown ad queues
/// one `hits` increment on the [`HitQueue`]; the counter update happens off
/// the render path and its failure is only logged. A hidden ad renders as
/// the empty string.
#[derive(Debug)]
pub struct AdvertTag {
    data: Arc<dyn DataSource>,
    hits: Arc<HitQueue>,
}

impl AdvertTag {
    /// Creates the handler.
    pub fn new(data: Arc<dyn DataSource>, hits: Arc<HitQueue>) -> Self {
        Self { data, hits }
    }
}

/// Whether `ad` may be shown now.
pub(crate) fn is_live(ad: &Row) -> bool {
    if ad.get("ischeck").and_then(json_to_i64) != Some(1) {
        return false;
    }
    let now = Local::now();
    if let Some(start) = ad.get("starttime").and_then(datefmt::time_from_json) {
        if start > now {
            return false;
        }
    }
    if let Some(end) = ad.get("endtime").and_then(datefmt::time_from_json) {
        if end < now {
            return false;
        }
    }
    true
}

impl TagHandler for AdvertTag {
    fn handle(&self, attrs: &Attributes, _body: &str, _ctx: &RenderContext) -> Result<String> {
        let id = attrs
            .int("id")
            .filter(|id| *id > 0)
            .ok_or_else(|| TagError::handler("myad", "missing or invalid id attribute"))?;

        let query = Query::table("myad").filter(Condition::Eq("aid".into(), id.into()));
        let ad = self
            .data
            .fetch_one(&query)?
            .ok_or_else(|| TagError::handler("myad", format!("advertisement {} not found", id)))?;

        if !is_live(&ad) {
            return Ok(String::new());
        }

        self.hits.record(Hit::new("myad", "aid", id, "hits"));
        Ok(ad.get("normbody").map(json_to_text).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryDataSource;
    use serde_json::json;

    fn fixture() -> (Arc<MemoryDataSource>, AdvertTag) {
        let data = Arc::new(MemoryDataSource::new().with_table(
            "myad",
            vec![
                json!({"aid": 1, "ischeck": 1, "normbody": "<img src=\"/a.png\">", "hits": 0,
                       "starttime": "2000-01-01 00:00:00", "endtime": "2999-01-01 00:00:00"}),
                json!({"aid": 2, "ischeck": 0, "normbody": "pending", "hits": 0}),
                json!({"aid": 3, "ischeck": 1, "normbody": "future", "hits": 0,
                       "starttime": "2999-01-01 00:00:00"}),
                json!({"aid": 4, "ischeck": 1, "normbody": "expired", "hits": 0,
                       "endtime": 946_684_800}),
            ],
        ));
        let hits = Arc::new(HitQueue::new(data.clone(), 16).unwrap());
        (data.clone(), AdvertTag::new(data, hits))
    }

    fn render(tag: &AdvertTag, attrs: &str) -> Result<String> {
        tag.handle(&Attributes::parse(attrs), "", &RenderContext::new())
    }

    fn hits(data: &MemoryDataSource, aid: i64) -> i64 {
        data.rows("myad")
            .unwrap()
            .iter()
            .find(|r| r.get("aid").and_then(json_to_i64) == Some(aid))
            .and_then(|r| r.get("hits").and_then(json_to_i64))
            .unwrap()
    }

    #[test]
    fn test_live_ad_renders_and_counts_once() {
        let (data, tag) = fixture();
        assert_eq!(render(&tag, r#"id="1""#).unwrap(), r#"<img src="/a.png">"#);
        tag.hits.flush().unwrap();
        assert_eq!(hits(&data, 1), 1);
    }

    #[test]
    fn test_hidden_ads_render_empty_without_hits() {
        let (data, tag) = fixture();
        for id in [2, 3, 4] {
            assert_eq!(render(&tag, &format!(r#"id="{id}""#)).unwrap(), "");
        }
        tag.hits.flush().unwrap();
        for id in [2, 3, 4] {
            assert_eq!(hits(&data, id), 0);
        }
    }

    #[test]
    fn test_bad_id_is_error() {
        let (_, tag) = fixture();
        assert!(render(&tag, "").is_err());
        assert!(render(&tag, r#"id="0""#).is_err());
        assert!(render(&tag, r#"id="99""#).is_err());
    }
}
