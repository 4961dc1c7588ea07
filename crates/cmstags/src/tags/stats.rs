// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `{cms:stats type="site" field="archives"/}`: analytics aggregates.

use crate::attributes::Attributes;
use crate::context::{json_to_text, RenderContext};
use crate::error::{Result, TagError};
use crate::registry::TagHandler;
use crate::services::{StatsKind, StatsService};
use chrono::Local;
use std::sync::Arc;

const SECONDS_PER_DAY: i64 = 86_400;

/// Adapter over a [`StatsService`].
///
/// `type` is one of `site`, `category`, `member`, `visit`, `search` or
/// `chart`. The window covers the last `days` (30) days up to now. With a
/// `field` the single value is printed (`0` when absent); without one the
/// whole aggregate is printed as JSON.
///
/// `type="chart"` emits a container `<div>` and a script calling
/// `initChart(id, type, title, data)` with the aggregate of
/// `data_source`; `chart_type` and `data_source` are required.
#[derive(Debug)]
pub struct StatsTag {
    stats: Arc<dyn StatsService>,
}

impl StatsTag {
    /// Creates the handler.
    pub fn new(stats: Arc<dyn StatsService>) -> Self {
        Self { stats }
    }

    fn window(attrs: &Attributes) -> (i64, i64) {
        let days = attrs.positive("days", 30) as i64;
        let end = Local::now().timestamp();
        (end - days * SECONDS_PER_DAY, end)
    }

    fn chart(&self, attrs: &Attributes) -> Result<String> {
        let chart_type = attrs
            .non_empty("chart_type")
            .ok_or_else(|| TagError::handler("stats", "missing chart_type attribute"))?;
        let source = attrs
            .non_empty("data_source")
            .ok_or_else(|| TagError::handler("stats", "missing data_source attribute"))?;
        let kind = StatsKind::parse(source).ok_or_else(|| {
            TagError::handler("stats", format!("unknown data_source '{}'", source))
        })?;

        let (start, end) = Self::window(attrs);
        let data = serde_json::to_string(&self.stats.stats(kind, start, end)?)?;
        let id = attrs
            .non_empty("id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("chart_{}_{}", chart_type, source));
        let title = attrs.non_empty("title").unwrap_or("Chart");
        let width = attrs.non_empty("width").unwrap_or("100%");
        let height = attrs.non_empty("height").unwrap_or("400px");

        Ok(format!(
            "<div id=\"{id}\" style=\"width: {width}; height: {height};\"></div>\n\
             <script>\n\
             document.addEventListener('DOMContentLoaded', function() {{\n  \
             var chartData = {data};\n  \
             var chartType = '{chart_type}';\n  \
             var chartTitle = '{title}';\n  \
             var chartID = '{id}';\n  \
             initChart(chartID, chartType, chartTitle, chartData);\n\
             }});\n\
             </script>\n"
        ))
    }
}

impl TagHandler for StatsTag {
    fn handle(&self, attrs: &Attributes, body: &str, _ctx: &RenderContext) -> Result<String> {
        if !body.is_empty() {
            return Ok(body.to_string());
        }
        let kind = attrs
            .non_empty("type")
            .ok_or_else(|| TagError::handler("stats", "missing type attribute"))?;
        if kind == "chart" {
            return self.chart(attrs);
        }
        let kind = StatsKind::parse(kind)
            .ok_or_else(|| TagError::handler("stats", format!("unknown stats type '{}'", kind)))?;

        let (start, end) = Self::window(attrs);
        let row = self.stats.stats(kind, start, end)?;
        match attrs.non_empty("field") {
            Some(field) => Ok(row.get(field).map(json_to_text).unwrap_or_else(|| "0".into())),
            None => Ok(serde_json::to_string(&row)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStats;
    use serde_json::json;
    use std::sync::Mutex;

    fn tag() -> StatsTag {
        let site = json!({"archives": 120, "members": 7});
        let stats =
            MemoryStats::new().with_stats(StatsKind::Site, site.as_object().cloned().unwrap());
        StatsTag::new(Arc::new(stats))
    }

    fn render(attrs: &str) -> Result<String> {
        tag().handle(&Attributes::parse(attrs), "", &RenderContext::new())
    }

    #[test]
    fn test_single_field_and_default() {
        assert_eq!(render(r#"type="site" field="archives""#).unwrap(), "120");
        assert_eq!(render(r#"type="site" field="comments""#).unwrap(), "0");
        assert_eq!(render(r#"type="member" field="total""#).unwrap(), "0");
    }

    #[test]
    fn test_whole_row_as_json() {
        assert_eq!(
            render(r#"type="site""#).unwrap(),
            r#"{"archives":120,"members":7}"#
        );
        assert_eq!(render(r#"type="visit""#).unwrap(), "{}");
    }

    #[derive(Debug, Default)]
    struct WindowRecorder {
        seen: Mutex<Vec<(i64, i64)>>,
    }

    impl StatsService for WindowRecorder {
        fn stats(&self, _kind: StatsKind, start: i64, end: i64) -> Result<crate::context::Row> {
            self.seen.lock().unwrap().push((start, end));
            Ok(Default::default())
        }
    }

    #[test]
    fn test_days_window() {
        let recorder = Arc::new(WindowRecorder::default());
        let tag = StatsTag::new(recorder.clone());
        let ctx = RenderContext::new();
        tag.handle(&Attributes::parse(r#"type="site" days="7""#), "", &ctx).unwrap();
        tag.handle(&Attributes::parse(r#"type="site" days="-3""#), "", &ctx).unwrap();
        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].1 - seen[0].0, 7 * SECONDS_PER_DAY);
        assert_eq!(seen[1].1 - seen[1].0, 30 * SECONDS_PER_DAY);
    }

    #[test]
    fn test_chart_markup() {
        let out =
            render(r#"type="chart" chart_type="bar" data_source="site" title="Traffic""#).unwrap();
        assert!(out.starts_with(
            "<div id=\"chart_bar_site\" style=\"width: 100%; height: 400px;\"></div>\n<script>\n"
        ));
        assert!(out.contains("  var chartData = {\"archives\":120,\"members\":7};\n"));
        assert!(out.contains("  var chartType = 'bar';\n"));
        assert!(out.contains("  var chartTitle = 'Traffic';\n"));
        assert!(out.contains("  initChart(chartID, chartType, chartTitle, chartData);\n});\n"));
        assert!(out.ends_with("</script>\n"));
    }

    #[test]
    fn test_errors() {
        assert!(render("").is_err());
        assert!(render(r#"type="weather""#).is_err());
        assert!(render(r#"type="chart" data_source="site""#).is_err());
        assert!(render(r#"type="chart" chart_type="pie" data_source="weather""#).is_err());
    }

    #[test]
    fn test_block_form_passes_body_through() {
        let out = tag()
            .handle(&Attributes::default(), "kept", &RenderContext::new())
            .unwrap();
        assert_eq!(out, "kept");
    }
}
