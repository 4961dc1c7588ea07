// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Built-in tag handlers.
//!
//! | tag        | handler              | needs                |
//! |------------|----------------------|----------------------|
//! | `arclist`  | [`ArcListTag`]       | data                 |
//! | `channel`  | [`ChannelTag`]       | data                 |
//! | `tag`      | [`HotTagsTag`]       | data                 |
//! | `flink`    | [`FriendLinkTag`]    | data                 |
//! | `myad`     | [`AdvertTag`]        | data, hit queue      |
//! | `vote`     | [`PollTag`]          | data                 |
//! | `pagelist` | [`PageListTag`]      |                      |
//! | `include`  | [`IncludeTag`]       | resolver             |
//! | `field`    | [`FieldTag`]         |                      |
//! | `global`   | [`GlobalTag`]        |                      |
//! | `i18n`     | [`I18nTag`]          | translator           |
//! | `seo`      | [`SeoTag`]           | SEO service          |
//! | `stats`    | [`StatsTag`]         | stats service        |
//!
//! A tag whose collaborator is missing is not registered, so its markup is
//! left in the page with a warning.

mod advert;
mod category;
mod field;
mod friend_links;
mod hot_tags;
mod i18n;
mod include;
mod listing;
mod pagination;
mod poll;
mod seo;
mod stats;

pub use advert::AdvertTag;
pub use category::ChannelTag;
pub use field::{FieldTag, GlobalTag};
pub use friend_links::FriendLinkTag;
pub use hot_tags::HotTagsTag;
pub use i18n::I18nTag;
pub use include::IncludeTag;
pub use listing::ArcListTag;
pub use pagination::{page_url, PageListTag};
pub use poll::PollTag;
pub use seo::SeoTag;
pub use stats::StatsTag;

use crate::context::Row;
use crate::error::Result;
use crate::fields::FieldEvaluator;
use crate::registry::TagRegistry;
use crate::resolver::TemplateResolver;
use crate::services::Services;
use crate::telemetry::HitQueue;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Registers every built-in tag whose collaborators are available.
pub fn register_builtin_tags(
    registry: &TagRegistry,
    services: &Services,
    resolver: Arc<dyn TemplateResolver>,
    hits: Option<Arc<HitQueue>>,
) -> Result<()> {
    registry.register("pagelist", Arc::new(PageListTag))?;
    registry.register("include", Arc::new(IncludeTag::new(resolver)))?;
    registry.register("field", Arc::new(FieldTag))?;
    registry.register("global", Arc::new(GlobalTag))?;

    if let Some(data) = &services.data {
        registry.register("arclist", Arc::new(ArcListTag::new(data.clone())))?;
        registry.register("channel", Arc::new(ChannelTag::new(data.clone())))?;
        registry.register("tag", Arc::new(HotTagsTag::new(data.clone())))?;
        registry.register("flink", Arc::new(FriendLinkTag::new(data.clone())))?;
        registry.register("vote", Arc::new(PollTag::new(data.clone())))?;
        if let Some(hits) = hits {
            registry.register("myad", Arc::new(AdvertTag::new(data.clone(), hits)))?;
        }
    }
    if let Some(translator) = &services.translator {
        registry.register("i18n", Arc::new(I18nTag::new(translator.clone())))?;
    }
    if let Some(seo) = &services.seo {
        registry.register("seo", Arc::new(SeoTag::new(seo.clone())))?;
    }
    if let Some(stats) = &services.stats {
        registry.register("stats", Arc::new(StatsTag::new(stats.clone())))?;
    }
    Ok(())
}

/// Renders `body` once per row and concatenates the results.
pub(crate) fn render_rows(body: &str, rows: &[Row], evaluator: FieldEvaluator) -> String {
    rows.iter().map(|row| evaluator.render(body, row)).collect()
}

/// Parses a comma-separated id list, skipping entries that are not integers.
pub(crate) fn int_list(raw: &str) -> Vec<JsonValue> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .map(JsonValue::from)
        .collect()
}
