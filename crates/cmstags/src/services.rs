// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Read-only collaborators behind the `i18n`, `seo` and `stats` tags.
//!
//! The engine only consumes these interfaces. A tag whose service is not
//! provided is not registered, so its markup stays in the page verbatim.

use crate::context::{json_to_i64, json_to_text, Row};
use crate::data::{Condition, DataSource, Direction, Query};
use crate::datefmt;
use crate::error::Result;
use chrono::Local;
use quick_xml::escape::escape;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::error;

/// A selectable language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    /// Language code such as `en` or `zh-cn`.
    pub code: String,
    /// Display name.
    pub name: String,
}

/// Translation lookup.
pub trait Translator: Send + Sync + std::fmt::Debug {
    /// Language used when neither the tag nor the context names one.
    fn default_lang(&self) -> String;
    /// Language codes in the order block-form `i18n` segments are written.
    fn langs(&self) -> Vec<String>;
    /// Languages offered by the language selector.
    fn available_langs(&self) -> Vec<Language>;
    /// Translates `key` into `lang`, substituting `args`.
    fn translate(&self, lang: &str, key: &str, args: &[String]) -> String;
}

/// Values for the standard `<meta>` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaTags {
    /// Page title.
    pub title: String,
    /// Keywords.
    pub keywords: String,
    /// Description.
    pub description: String,
    /// Author.
    pub author: String,
    /// Generator.
    pub generator: String,
    /// Robots directive.
    pub robots: String,
    /// Viewport.
    pub viewport: String,
}

/// SEO metadata provider.
pub trait SeoService: Send + Sync + std::fmt::Debug {
    /// Completes page meta values with site defaults.
    fn meta_tags(&self, title: &str, keywords: &str, description: &str) -> MetaTags;
    /// Open Graph `(property, content)` pairs.
    fn open_graph_tags(
        &self,
        title: &str,
        description: &str,
        url: &str,
        image: &str,
    ) -> Vec<(String, String)>;
    /// Twitter card `(name, content)` pairs.
    fn twitter_card_tags(&self, title: &str, description: &str, image: &str)
        -> Vec<(String, String)>;
    /// Canonical URL of `path`.
    fn canonical_url(&self, path: &str) -> String;
    /// `(hreflang, url)` pairs for the translations of `path`.
    fn alternate_urls(&self, path: &str) -> Vec<(String, String)>;
    /// Full XML sitemap.
    fn sitemap(&self) -> Result<String>;
    /// robots.txt body.
    fn robots_txt(&self) -> String;
}

/// Aggregate families offered by a [`StatsService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsKind {
    /// Whole-site totals.
    Site,
    /// Per-category totals.
    Category,
    /// Member totals.
    Member,
    /// Visits.
    Visit,
    /// Search terms.
    Search,
}

impl StatsKind {
    /// Parses the `type`/`data_source` attribute value.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "site" => Some(StatsKind::Site),
            "category" => Some(StatsKind::Category),
            "member" => Some(StatsKind::Member),
            "visit" => Some(StatsKind::Visit),
            "search" => Some(StatsKind::Search),
            _ => None,
        }
    }
}

/// Analytics aggregates over a time window of unix seconds.
pub trait StatsService: Send + Sync + std::fmt::Debug {
    /// Returns the aggregate values of `kind` between `start` and `end`.
    fn stats(&self, kind: StatsKind, start: i64, end: i64) -> Result<Row>;
}

/// Translator backed by in-memory tables.
///
/// Messages substitute `%s` placeholders with the arguments in order; a
/// missing key translates to the key itself.
#[derive(Debug, Clone)]
pub struct MemoryTranslator {
    default_lang: String,
    languages: Vec<Language>,
    messages: HashMap<String, HashMap<String, String>>,
}

impl MemoryTranslator {
    /// Creates a translator whose fallback language is `default_lang`.
    pub fn new(default_lang: &str) -> Self {
        Self {
            default_lang: default_lang.to_string(),
            languages: Vec::new(),
            messages: HashMap::new(),
        }
    }

    /// Adds a language, in segment order.
    pub fn with_language(mut self, code: &str, name: &str) -> Self {
        self.languages.push(Language {
            code: code.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Adds one message.
    pub fn with_message(mut self, lang: &str, key: &str, message: &str) -> Self {
        self.messages
            .entry(lang.to_string())
            .or_default()
            .insert(key.to_string(), message.to_string());
        self
    }
}

impl Translator for MemoryTranslator {
    fn default_lang(&self) -> String {
        self.default_lang.clone()
    }

    fn langs(&self) -> Vec<String> {
        self.languages.iter().map(|l| l.code.clone()).collect()
    }

    fn available_langs(&self) -> Vec<Language> {
        self.languages.clone()
    }

    fn translate(&self, lang: &str, key: &str, args: &[String]) -> String {
        let lookup = |code: &str| self.messages.get(code).and_then(|m| m.get(key));
        let message = lookup(lang)
            .or_else(|| lookup(&self.default_lang))
            .map(String::as_str)
            .unwrap_or(key);

        let mut out = String::with_capacity(message.len());
        let mut args = args.iter();
        let mut rest = message;
        while let Some(pos) = rest.find("%s") {
            out.push_str(&rest[..pos]);
            match args.next() {
                Some(arg) => out.push_str(arg),
                None => out.push_str("%s"),
            }
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }
}

/// Stats service returning fixed aggregates per kind, whatever the window.
#[derive(Debug, Clone, Default)]
pub struct MemoryStats {
    values: HashMap<StatsKind, Row>,
}

impl MemoryStats {
    /// Creates a service with no aggregates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the aggregates reported for `kind`.
    pub fn with_stats(mut self, kind: StatsKind, values: Row) -> Self {
        self.values.insert(kind, values);
        self
    }
}

impl StatsService for MemoryStats {
    fn stats(&self, kind: StatsKind, _start: i64, _end: i64) -> Result<Row> {
        Ok(self.values.get(&kind).cloned().unwrap_or_default())
    }
}

/// Site identity used by [`SiteSeo`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteInfo {
    /// Site name, appended to page titles.
    pub name: String,
    /// Absolute base URL without a trailing slash.
    pub url: String,
    /// Default keywords.
    pub keywords: String,
    /// Default description.
    pub description: String,
}

/// SEO service filling gaps from [`SiteInfo`] and building the sitemap from
/// the `arctype`, `archives` and `tagindex` tables.
#[derive(Debug, Clone)]
pub struct SiteSeo {
    site: SiteInfo,
    langs: Vec<String>,
    data: Option<Arc<dyn DataSource>>,
}

impl SiteSeo {
    /// Creates the service; `langs` are the codes listed as alternates.
    pub fn new(site: SiteInfo, langs: Vec<String>) -> Self {
        Self {
            site,
            langs,
            data: None,
        }
    }

    /// Sets the tables the sitemap is built from.
    pub fn with_data(mut self, data: Arc<dyn DataSource>) -> Self {
        self.data = Some(data);
        self
    }

    fn logo(&self) -> String {
        format!("{}/static/images/logo.png", self.site.url)
    }

    fn rows(&self, query: Query) -> Vec<Row> {
        let Some(data) = &self.data else {
            return Vec::new();
        };
        data.fetch_many(&query).unwrap_or_else(|err| {
            error!(table = %query.table, error = %err, "sitemap query failed");
            Vec::new()
        })
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}

fn sitemap_url(out: &mut String, loc: &str, lastmod: &str, freq: &str, priority: &str) {
    let _ = write!(
        out,
        "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{}</changefreq>\n    <priority>{}</priority>\n  </url>\n",
        escape(loc),
        lastmod,
        freq,
        priority
    );
}

impl SeoService for SiteSeo {
    fn meta_tags(&self, title: &str, keywords: &str, description: &str) -> MetaTags {
        let title = if title.is_empty() {
            self.site.name.clone()
        } else {
            format!("{} - {}", title, self.site.name)
        };
        MetaTags {
            title,
            keywords: or_default(keywords, &self.site.keywords).to_string(),
            description: or_default(description, &self.site.description).to_string(),
            author: self.site.name.clone(),
            generator: "cmstags".to_string(),
            robots: "index,follow".to_string(),
            viewport: "width=device-width, initial-scale=1.0".to_string(),
        }
    }

    fn open_graph_tags(
        &self,
        title: &str,
        description: &str,
        url: &str,
        image: &str,
    ) -> Vec<(String, String)> {
        let logo = self.logo();
        [
            ("og:title", or_default(title, &self.site.name)),
            ("og:description", or_default(description, &self.site.description)),
            ("og:url", or_default(url, &self.site.url)),
            ("og:image", or_default(image, &logo)),
            ("og:type", "website"),
            ("og:site_name", &self.site.name),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn twitter_card_tags(
        &self,
        title: &str,
        description: &str,
        image: &str,
    ) -> Vec<(String, String)> {
        let logo = self.logo();
        let handle = format!("@{}", self.site.name);
        [
            ("twitter:title", or_default(title, &self.site.name)),
            ("twitter:description", or_default(description, &self.site.description)),
            ("twitter:image", or_default(image, &logo)),
            ("twitter:card", "summary_large_image"),
            ("twitter:site", &handle),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn canonical_url(&self, path: &str) -> String {
        format!("{}{}", self.site.url, path)
    }

    fn alternate_urls(&self, path: &str) -> Vec<(String, String)> {
        self.langs
            .iter()
            .map(|lang| (lang.clone(), format!("{}{}?lang={}", self.site.url, path, lang)))
            .collect()
    }

    fn sitemap(&self) -> Result<String> {
        let today = Local::now().format("%Y-%m-%d").to_string();
        let base = &self.site.url;
        let mut out = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        sitemap_url(&mut out, base, &today, "daily", "1.0");

        for category in self.rows(Query::table("arctype").order_by("sortrank", Direction::Asc)) {
            let id = category.get("id").and_then(json_to_i64).unwrap_or(0);
            let loc = format!("{}/list/{}.html", base, id);
            sitemap_url(&mut out, &loc, &today, "daily", "0.8");
        }

        let articles = Query::table("archives")
            .filter(Condition::Gt("arcrank".into(), JsonValue::from(-1)))
            .order_by("id", Direction::Desc)
            .limit(1000);
        for article in self.rows(articles) {
            let id = article.get("id").and_then(json_to_i64).unwrap_or(0);
            let lastmod = article
                .get("pubdate")
                .and_then(datefmt::time_from_json)
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| today.clone());
            let loc = format!("{}/article/{}.html", base, id);
            sitemap_url(&mut out, &loc, &lastmod, "weekly", "0.6");
        }

        let tags = Query::table("tagindex")
            .order_by("count", Direction::Desc)
            .limit(100);
        for tag in self.rows(tags) {
            let name = tag.get("tag").map(json_to_text).unwrap_or_default();
            let loc = format!("{}/tag/{}.html", base, name);
            sitemap_url(&mut out, &loc, &today, "weekly", "0.4");
        }

        out.push_str("</urlset>");
        Ok(out)
    }

    fn robots_txt(&self) -> String {
        format!(
            "User-agent: *\nDisallow: /member/\nDisallow: /search\nAllow: /\n\nSitemap: {}/sitemap.xml\n",
            self.site.url
        )
    }
}

/// Collaborators handed to an [`Engine`](crate::Engine).
///
/// Tags are registered only for the collaborators present: data-backed tags
/// need `data`, `i18n` needs `translator`, and so on.
#[derive(Debug, Clone, Default)]
pub struct Services {
    /// Query collaborator.
    pub data: Option<Arc<dyn DataSource>>,
    /// Translation lookup.
    pub translator: Option<Arc<dyn Translator>>,
    /// SEO metadata.
    pub seo: Option<Arc<dyn SeoService>>,
    /// Analytics aggregates.
    pub stats: Option<Arc<dyn StatsService>>,
}

impl Services {
    /// No collaborators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the query collaborator.
    pub fn with_data(mut self, data: Arc<dyn DataSource>) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets the translator.
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Sets the SEO service.
    pub fn with_seo(mut self, seo: Arc<dyn SeoService>) -> Self {
        self.seo = Some(seo);
        self
    }

    /// Sets the stats service.
    pub fn with_stats(mut self, stats: Arc<dyn StatsService>) -> Self {
        self.stats = Some(stats);
        self
    }
}
