// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use crate::test_support::capture_logs;
use crate::*;
use chrono::{Duration, Local};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn site_data() -> MemoryDataSource {
    MemoryDataSource::new()
        .with_table(
            "arctype",
            vec![
                json!({"id": 1, "typename": "News", "typedir": "/news", "reid": 0, "ishidden": 0, "sortrank": 1}),
                json!({"id": 2, "typename": "Sports", "typedir": "/sports", "reid": 0, "ishidden": 0, "sortrank": 2}),
                json!({"id": 3, "typename": "Hidden", "typedir": "/hidden", "reid": 0, "ishidden": 1, "sortrank": 3}),
            ],
        )
        .with_table(
            "archives",
            vec![
                json!({"id": 10, "typeid": 1, "title": "First story", "arcrank": 0, "pubdate": 1_700_000_000}),
                json!({"id": 11, "typeid": 1, "title": "Second story", "arcrank": 0, "pubdate": 1_700_100_000}),
                json!({"id": 12, "typeid": 2, "title": "Draft", "arcrank": -1, "pubdate": 1_700_200_000}),
            ],
        )
        .with_table(
            "myad",
            vec![
                json!({"aid": 1, "ischeck": 1, "normbody": "<img src=\"/ad1.png\">", "hits": 0}),
                json!({"aid": 2, "ischeck": 0, "normbody": "<img src=\"/ad2.png\">", "hits": 0}),
                json!({
                    "aid": 3,
                    "ischeck": 1,
                    "starttime": (Local::now() + Duration::days(2)).timestamp(),
                    "normbody": "<img src=\"/ad3.png\">",
                    "hits": 0
                }),
            ],
        )
}

fn engine_with(
    config: EngineConfig,
    resolver: MemoryResolver,
    data: Arc<MemoryDataSource>,
) -> Engine {
    Engine::with_memory_cache(config, resolver, Services::new().with_data(data)).unwrap()
}

fn hits(data: &MemoryDataSource, aid: i64) -> i64 {
    data.rows("myad")
        .unwrap()
        .into_iter()
        .find(|row| row.get("aid") == Some(&json!(aid)))
        .and_then(|row| row.get("hits").and_then(|v| v.as_i64()))
        .unwrap_or(-1)
}

mod dispatch_tests {
    use super::*;

    #[test]
    fn test_plain_html_passes_through_unchanged() {
        let source = "<html>\n  <body class=\"x\">{ not a tag } {cms broken</body>\n</html>\n";
        let engine = engine_with(
            EngineConfig::default(),
            MemoryResolver::new(),
            Arc::new(MemoryDataSource::new()),
        );
        assert_eq!(engine.preprocess(source, &RenderContext::new()), source);
    }

    #[test]
    fn test_every_registered_tag_is_replaced() {
        let engine = engine_with(
            EngineConfig::default(),
            MemoryResolver::new(),
            Arc::new(MemoryDataSource::new()),
        );
        for name in ["alpha", "beta"] {
            let label = name.to_string();
            engine
                .register_tag(name, handler_fn(move |attrs, body, _| {
                    Ok(format!("[{}:{}:{}]", label, attrs.get_or("attr", ""), body))
                }))
                .unwrap();
        }
        let out = engine.preprocess(
            r#"{cms:alpha attr="v"}body{/cms:alpha}|{cms:beta attr="w"}x{/cms:beta}"#,
            &RenderContext::new(),
        );
        assert_eq!(out, "[alpha:v:body]|[beta:w:x]");
    }

    #[test]
    fn test_unknown_tag_left_verbatim_with_warning() {
        let engine = engine_with(
            EngineConfig::default(),
            MemoryResolver::new(),
            Arc::new(MemoryDataSource::new()),
        );
        let (out, logs) = capture_logs(|| {
            engine.preprocess(r#"a {cms:doesnotexist a="1"/} b"#, &RenderContext::new())
        });
        assert_eq!(out, r#"a {cms:doesnotexist a="1"/} b"#);
        assert!(logs.contains("WARN"));
        assert!(logs.contains("doesnotexist"));
    }

    #[test]
    fn test_mismatched_close_uses_opening_name() {
        let engine = engine_with(
            EngineConfig::default(),
            MemoryResolver::new(),
            Arc::new(MemoryDataSource::new()),
        );
        engine
            .register_tag("foo", handler_fn(|_, body, _| Ok(format!("foo({})", body))))
            .unwrap();
        engine
            .register_tag("bar", handler_fn(|_, body, _| Ok(format!("bar({})", body))))
            .unwrap();
        let (out, logs) =
            capture_logs(|| engine.preprocess("{cms:foo}X{/cms:bar}", &RenderContext::new()));
        assert_eq!(out, "foo(X)");
        assert!(logs.contains("WARN"));
    }

    #[test]
    fn test_failing_tag_does_not_abort_page() {
        let resolver = MemoryResolver::new().with_template(
            "page.htm",
            r#"<div>{cms:myad id="999"/}</div><p>{cms:field.title/}</p>"#,
        );
        let engine = engine_with(EngineConfig::default(), resolver, Arc::new(site_data()));
        let (out, logs) = capture_logs(|| {
            engine.render_to_string("page.htm", &RenderContext::new().with_field("title", "Hi"))
        });
        assert_eq!(
            out.unwrap(),
            r#"<div>{cms:myad id="999"/}</div><p>Hi</p>"#
        );
        assert!(logs.contains("ERROR"));
    }
}

mod handler_tests {
    use super::*;
    use crate::tags::page_url;

    #[test]
    fn test_category_tree_marks_current_category() {
        let resolver = MemoryResolver::new().with_template(
            "nav.htm",
            r#"{cms:channel currentstyle="active"}<li class="[field:currentstyle/]">[field:typename/]</li>
{/cms:channel}"#,
        );
        let engine = engine_with(EngineConfig::default(), resolver, Arc::new(site_data()));
        let ctx = RenderContext::new().with_category(Category {
            id: 1,
            ..Category::default()
        });
        let html = engine.render_to_string("nav.htm", &ctx).unwrap();
        let lines: Vec<&str> = html.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"<li class="active">News</li>"#);
        assert_eq!(lines[1], r#"<li class="">Sports</li>"#);
    }

    #[test]
    fn test_listing_with_generic_stage() {
        let resolver = MemoryResolver::new().with_template(
            "list.htm",
            r#"<h1>{{ upper(Category.typename) }}</h1>{cms:arclist typeid="1" orderway="asc"}<a href="[field:arcurl/]">[field:title/]</a>{/cms:arclist}"#,
        );
        let engine = engine_with(EngineConfig::default(), resolver, Arc::new(site_data()));
        let ctx = RenderContext::new().with_category(Category {
            id: 1,
            typename: Some("News".to_string()),
            ..Category::default()
        });
        let html = engine.render_to_string("list.htm", &ctx).unwrap();
        assert_eq!(
            html,
            r#"<h1>NEWS</h1><a href="/article/10.html">First story</a><a href="/article/11.html">Second story</a>"#
        );
    }

    #[test]
    fn test_advertisement_validity_and_hits() {
        let data = Arc::new(site_data());
        let resolver = MemoryResolver::new()
            .with_template("ad1.htm", r#"{cms:myad id="1"/}"#)
            .with_template("ad2.htm", r#"[{cms:myad id="2"/}]"#)
            .with_template("ad3.htm", r#"[{cms:myad id="3"/}]"#);
        let engine = engine_with(EngineConfig::default(), resolver, data.clone());
        let ctx = RenderContext::new();

        assert_eq!(
            engine.render_to_string("ad1.htm", &ctx).unwrap(),
            r#"<img src="/ad1.png">"#
        );
        assert_eq!(engine.render_to_string("ad2.htm", &ctx).unwrap(), "[]");
        assert_eq!(engine.render_to_string("ad3.htm", &ctx).unwrap(), "[]");

        engine.flush_telemetry().unwrap();
        assert_eq!(hits(&data, 1), 1);
        assert_eq!(hits(&data, 2), 0);
        assert_eq!(hits(&data, 3), 0);

        engine.render_to_string("ad1.htm", &ctx).unwrap();
        engine.flush_telemetry().unwrap();
        assert_eq!(hits(&data, 1), 2);
        assert_eq!(engine.dropped_hits(), 0);
    }

    #[test]
    fn test_pagination_links() {
        let resolver = MemoryResolver::new()
            .with_template("list.htm", r#"{cms:pagelist listitem="pre,next"/}"#);
        let engine = engine_with(EngineConfig::default(), resolver, Arc::new(site_data()));
        let ctx = RenderContext::new()
            .with_pagination(Pagination::new(2, 4, 40))
            .with_request_url("/list/5.html");
        let html = engine.render_to_string("list.htm", &ctx).unwrap();
        assert!(html.contains(r#"<a href="/list/5.html">Prev</a>"#));
        assert!(html.contains(r#"<a href="/list/5_3.html">Next</a>"#));
        assert_eq!(page_url("/list/5.html", 3), "/list/5_3.html");
        assert_eq!(page_url("/list/5.html", 1), "/list/5.html");
    }

    #[test]
    fn test_attribute_quote_styles() {
        let attrs = Attributes::parse(r#"a="1" b='2'"#);
        assert_eq!(attrs.get("a"), Some("1"));
        assert_eq!(attrs.get("b"), Some("2"));
        let attrs = Attributes::parse(r#"b='2' a="1""#);
        assert_eq!(attrs.get("a"), Some("1"));
        assert_eq!(attrs.get("b"), Some("2"));
    }
}

mod render_tests {
    use super::*;

    #[test]
    fn test_generic_stage_error_is_fatal() {
        let resolver = MemoryResolver::new()
            .with_template("bad.htm", "<p>{cms:field.title/}</p>{{ add(1, }}");
        let engine = engine_with(EngineConfig::default(), resolver, Arc::new(site_data()));
        let err = engine
            .render_to_string("bad.htm", &RenderContext::new().with_field("title", "x"))
            .unwrap_err();
        match err {
            TagError::Render { template, .. } => assert_eq!(template, "bad.htm"),
            other => panic!("expected render error, got {:?}", other),
        }
    }

    #[test]
    fn test_field_and_global_references_are_escaped() {
        let resolver = MemoryResolver::new().with_template(
            "page.htm",
            "<title>{cms:field.title/} - {cms:global.site_name/}</title>",
        );
        let engine = engine_with(EngineConfig::default(), resolver, Arc::new(site_data()));
        let ctx = RenderContext::new()
            .with_field("title", "Fish & Chips")
            .with_global("site_name", "Demo");
        assert_eq!(
            engine.render_to_string("page.htm", &ctx).unwrap(),
            "<title>Fish &amp; Chips - Demo</title>"
        );
    }

    #[test]
    fn test_custom_namespace() {
        let resolver = MemoryResolver::new()
            .with_template("page.htm", "{site:field.title/} {cms:field.title/}");
        let engine = engine_with(
            EngineConfig::default().with_namespace("site"),
            resolver,
            Arc::new(site_data()),
        );
        let ctx = RenderContext::new().with_field("title", "Hi");
        assert_eq!(
            engine.render_to_string("page.htm", &ctx).unwrap(),
            "Hi {cms:field.title/}"
        );
    }

    #[test]
    fn test_include_from_fallback_directory() {
        let root = TempDir::new().unwrap();
        let legacy = TempDir::new().unwrap();
        fs::write(
            root.path().join("index.htm"),
            r#"{cms:include file="head.htm"/}<main>{cms:field.title/}</main>"#,
        )
        .unwrap();
        fs::write(
            legacy.path().join("head.htm"),
            "<h1>{{ Globals.site_name }}</h1>{cms:field.title/}",
        )
        .unwrap();

        let resolver = FileSystemResolver::new(root.path()).with_fallback_dirs(&[legacy.path()]);
        let engine = Engine::with_memory_cache(EngineConfig::default(), resolver, Services::new())
            .unwrap();
        let ctx = RenderContext::new()
            .with_field("title", "Body")
            .with_global("site_name", "Demo");
        assert_eq!(
            engine.render_to_string("index.htm", &ctx).unwrap(),
            "<h1>Demo</h1>{cms:field.title/}<main>Body</main>"
        );
    }
}

mod cache_tests {
    use super::*;

    /// The cache key is the template name alone: a cached page is served
    /// again even when the caller passes different data.
    #[test]
    fn test_cached_page_ignores_new_data() {
        let resolver =
            MemoryResolver::new().with_template("hello.htm", "<p>{cms:field.name/}</p>");
        let engine = engine_with(
            EngineConfig::default().with_cache(true),
            resolver,
            Arc::new(MemoryDataSource::new()),
        );

        let first = engine
            .render_to_string("hello.htm", &RenderContext::new().with_field("name", "Ada"))
            .unwrap();
        let second = engine
            .render_to_string("hello.htm", &RenderContext::new().with_field("name", "Grace"))
            .unwrap();
        assert_eq!(first, "<p>Ada</p>");
        assert_eq!(second, "<p>Ada</p>");

        engine.invalidate("hello.htm").unwrap();
        let third = engine
            .render_to_string("hello.htm", &RenderContext::new().with_field("name", "Grace"))
            .unwrap();
        assert_eq!(third, "<p>Grace</p>");
    }

    #[test]
    fn test_excluded_template_renders_fresh() {
        let resolver =
            MemoryResolver::new().with_template("search.htm", "{cms:field.q/}");
        let mut config = EngineConfig::default().with_cache(true);
        config.cache.exclude = vec!["search.htm".to_string()];
        let engine = engine_with(config, resolver, Arc::new(MemoryDataSource::new()));

        let a = engine
            .render_to_string("search.htm", &RenderContext::new().with_field("q", "rust"))
            .unwrap();
        let b = engine
            .render_to_string("search.htm", &RenderContext::new().with_field("q", "go"))
            .unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("rust", "go"));
        assert!(!engine.is_cached("search.htm"));
    }

    #[test]
    fn test_filesystem_cache_serves_after_source_change() {
        let root = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        fs::write(root.path().join("index.htm"), "v1").unwrap();

        let cache = Box::new(FileSystemCache::new(cache_dir.path(), 10).unwrap());
        let engine = Engine::new(
            EngineConfig::default().with_cache(true),
            FileSystemResolver::new(root.path()),
            cache,
            Services::new(),
        )
        .unwrap();
        assert_eq!(engine.render_to_string("index.htm", &RenderContext::new()).unwrap(), "v1");

        fs::write(root.path().join("index.htm"), "v2").unwrap();
        assert_eq!(engine.render_to_string("index.htm", &RenderContext::new()).unwrap(), "v1");
        engine.clear_cache().unwrap();
        assert_eq!(engine.render_to_string("index.htm", &RenderContext::new()).unwrap(), "v2");
    }
}
