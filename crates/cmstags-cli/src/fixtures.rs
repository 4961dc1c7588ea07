// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! JSON fixtures standing in for the CMS database and services.
//!
//! ```json
//! {
//!   "tables": { "arctype": [{"id": 1, "typename": "News", "reid": 0, "ishidden": 0}] },
//!   "context": { "Globals": {"site_name": "Demo"} },
//!   "stats": { "site": {"archives": 12} },
//!   "i18n": {
//!     "default": "en",
//!     "languages": [{"code": "en", "name": "English"}],
//!     "messages": {"en": {"welcome": "Welcome, %s!"}}
//!   }
//! }
//! ```

use anyhow::{anyhow, Context};
use cmstags::{
    MemoryDataSource, MemoryStats, MemoryTranslator, RenderContext, Row, Services, SiteInfo,
    SiteSeo, StatsKind,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Parsed fixture file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    /// Tables for the in-memory data source, as an object of row arrays.
    pub tables: Option<JsonValue>,
    /// Base render context for every page.
    pub context: RenderContext,
    /// Aggregates per stats kind (`site`, `category`, ...).
    pub stats: HashMap<String, Row>,
    /// Translator data.
    pub i18n: Option<I18nFixture>,
}

/// Translator section of the fixtures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct I18nFixture {
    /// Fallback language code.
    pub default: String,
    /// Languages in segment order.
    pub languages: Vec<LanguageFixture>,
    /// Messages per language code.
    pub messages: HashMap<String, HashMap<String, String>>,
}

/// One selectable language.
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageFixture {
    /// Language code.
    pub code: String,
    /// Display name.
    pub name: String,
}

impl Fixtures {
    /// Reads a fixture file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read fixtures {}", path.display()))?;
        Self::from_json_str(&content)
    }

    /// Parses fixtures from JSON text.
    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Builds the collaborators described by the fixtures.
    ///
    /// # Errors
    ///
    /// Fails on malformed tables or an unknown stats kind.
    pub fn services(&self, site: &SiteInfo) -> anyhow::Result<Services> {
        let mut services = Services::new();
        let mut langs = Vec::new();

        if let Some(i18n) = &self.i18n {
            let default: &str = if i18n.default.is_empty() { "en" } else { &i18n.default };
            let mut translator = MemoryTranslator::new(default);
            for language in &i18n.languages {
                translator = translator.with_language(&language.code, &language.name);
                langs.push(language.code.clone());
            }
            for (lang, messages) in &i18n.messages {
                for (key, message) in messages {
                    translator = translator.with_message(lang, key, message);
                }
            }
            services = services.with_translator(Arc::new(translator));
        }

        if !self.stats.is_empty() {
            let mut stats = MemoryStats::new();
            for (kind, values) in &self.stats {
                let kind = StatsKind::parse(kind)
                    .ok_or_else(|| anyhow!("unknown stats kind '{}' in fixtures", kind))?;
                stats = stats.with_stats(kind, values.clone());
            }
            services = services.with_stats(Arc::new(stats));
        }

        let mut seo = SiteSeo::new(site.clone(), langs);
        if let Some(tables) = &self.tables {
            let data = Arc::new(MemoryDataSource::from_json(tables.clone())?);
            seo = seo.with_data(data.clone());
            services = services.with_data(data);
        }
        Ok(services.with_seo(Arc::new(seo)))
    }
}
