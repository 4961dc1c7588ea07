// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `{cms:seo type="..."/}`: head metadata.

use crate::attributes::Attributes;
use crate::context::RenderContext;
use crate::error::{Result, TagError};
use crate::registry::TagHandler;
use crate::services::SeoService;
use std::sync::Arc;

/// Adapter over a [`SeoService`].
///
/// | `type`      | attributes                          | output |
/// |-------------|-------------------------------------|--------|
/// | `meta`      | `title keywords description`        | `<title>` and six `<meta name>` lines |
/// | `opengraph` | `title description url image`       | `<meta property>` lines |
/// | `twitter`   | `title description image`           | `<meta name>` lines |
/// | `canonical` | `path`                              | `<link rel="canonical">` |
/// | `alternate` | `path`                              | `<link rel="alternate" hreflang>` lines |
/// | `sitemap`   |                                     | sitemap XML |
/// | `robots`    |                                     | robots.txt |
///
/// The block form returns its body unchanged.
#[derive(Debug)]
pub struct SeoTag {
    seo: Arc<dyn SeoService>,
}

impl SeoTag {
    /// Creates the handler.
    pub fn new(seo: Arc<dyn SeoService>) -> Self {
        Self { seo }
    }

    fn meta(&self, attrs: &Attributes) -> String {
        let meta = self.seo.meta_tags(
            attrs.get_or("title", ""),
            attrs.get_or("keywords", ""),
            attrs.get_or("description", ""),
        );
        [
            format!("<title>{}</title>", meta.title),
            format!(r#"<meta name="keywords" content="{}">"#, meta.keywords),
            format!(r#"<meta name="description" content="{}">"#, meta.description),
            format!(r#"<meta name="author" content="{}">"#, meta.author),
            format!(r#"<meta name="generator" content="{}">"#, meta.generator),
            format!(r#"<meta name="robots" content="{}">"#, meta.robots),
            format!(r#"<meta name="viewport" content="{}">"#, meta.viewport),
        ]
        .join("\n")
    }
}

fn lines(pairs: Vec<(String, String)>, line: impl Fn(&str, &str) -> String) -> String {
    pairs
        .iter()
        .map(|(a, b)| line(a, b) + "\n")
        .collect()
}

impl TagHandler for SeoTag {
    fn handle(&self, attrs: &Attributes, body: &str, _ctx: &RenderContext) -> Result<String> {
        if !body.is_empty() {
            return Ok(body.to_string());
        }
        let kind = attrs
            .non_empty("type")
            .ok_or_else(|| TagError::handler("seo", "missing type attribute"))?;
        let get = |key: &str| attrs.get_or(key, "");

        Ok(match kind {
            "meta" => self.meta(attrs),
            "opengraph" => lines(
                self.seo
                    .open_graph_tags(get("title"), get("description"), get("url"), get("image")),
                |p, c| format!(r#"<meta property="{}" content="{}">"#, p, c),
            ),
            "twitter" => lines(
                self.seo
                    .twitter_card_tags(get("title"), get("description"), get("image")),
                |n, c| format!(r#"<meta name="{}" content="{}">"#, n, c),
            ),
            "canonical" => format!(
                r#"<link rel="canonical" href="{}">"#,
                self.seo.canonical_url(get("path"))
            ),
            "alternate" => lines(self.seo.alternate_urls(get("path")), |lang, url| {
                format!(r#"<link rel="alternate" hreflang="{}" href="{}">"#, lang, url)
            }),
            "sitemap" => self.seo.sitemap()?,
            "robots" => self.seo.robots_txt(),
            other => {
                return Err(TagError::handler("seo", format!("unknown seo type '{}'", other)));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MetaTags;

    #[derive(Debug)]
    struct FixedSeo;

    impl SeoService for FixedSeo {
        fn meta_tags(&self, title: &str, keywords: &str, description: &str) -> MetaTags {
            MetaTags {
                title: format!("{} - Demo", title),
                keywords: keywords.to_string(),
                description: description.to_string(),
                author: "Demo".into(),
                generator: "cmstags".into(),
                robots: "index,follow".into(),
                viewport: "width=device-width".into(),
            }
        }

        fn open_graph_tags(
            &self,
            title: &str,
            _d: &str,
            url: &str,
            _i: &str,
        ) -> Vec<(String, String)> {
            vec![("og:title".into(), title.into()), ("og:url".into(), url.into())]
        }

        fn twitter_card_tags(&self, title: &str, _d: &str, _i: &str) -> Vec<(String, String)> {
            vec![("twitter:title".into(), title.into())]
        }

        fn canonical_url(&self, path: &str) -> String {
            format!("https://demo.example{}", path)
        }

        fn alternate_urls(&self, path: &str) -> Vec<(String, String)> {
            vec![
                ("en".into(), format!("https://demo.example/en{}", path)),
                ("fr".into(), format!("https://demo.example/fr{}", path)),
            ]
        }

        fn sitemap(&self) -> Result<String> {
            Err(TagError::Service("sitemap unavailable".into()))
        }

        fn robots_txt(&self) -> String {
            "User-agent: *".into()
        }
    }

    fn render(attrs: &str) -> Result<String> {
        SeoTag::new(Arc::new(FixedSeo)).handle(&Attributes::parse(attrs), "", &RenderContext::new())
    }

    #[test]
    fn test_meta_block() {
        let out = render(r#"type="meta" title="Home" keywords="a,b""#).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "<title>Home - Demo</title>");
        assert_eq!(lines[1], r#"<meta name="keywords" content="a,b">"#);
        assert_eq!(lines[6], r#"<meta name="viewport" content="width=device-width">"#);
    }

    #[test]
    fn test_link_types() {
        assert_eq!(
            render(r#"type="canonical" path="/a.html""#).unwrap(),
            r#"<link rel="canonical" href="https://demo.example/a.html">"#
        );
        assert_eq!(
            render(r#"type="alternate" path="/a.html""#).unwrap(),
            "<link rel=\"alternate\" hreflang=\"en\" href=\"https://demo.example/en/a.html\">\n\
             <link rel=\"alternate\" hreflang=\"fr\" href=\"https://demo.example/fr/a.html\">\n"
        );
        assert_eq!(
            render(r#"type="opengraph" title="T" url="/u""#).unwrap(),
            "<meta property=\"og:title\" content=\"T\">\n<meta property=\"og:url\" content=\"/u\">\n"
        );
        assert_eq!(
            render(r#"type="twitter" title="T""#).unwrap(),
            "<meta name=\"twitter:title\" content=\"T\">\n"
        );
        assert_eq!(render(r#"type="robots""#).unwrap(), "User-agent: *");
    }

    #[test]
    fn test_errors() {
        assert!(render("").is_err());
        assert!(render(r#"type="bogus""#).is_err());
        assert!(matches!(render(r#"type="sitemap""#), Err(TagError::Service(_))));
    }

    #[test]
    fn test_block_form_passes_body_through() {
        let out = SeoTag::new(Arc::new(FixedSeo))
            .handle(&Attributes::default(), "<meta charset=\"utf-8\">", &RenderContext::new())
            .unwrap();
        assert_eq!(out, "<meta charset=\"utf-8\">");
    }
}
