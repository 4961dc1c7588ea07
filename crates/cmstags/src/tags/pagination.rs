// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `{cms:pagelist/}`: pagination control.

use crate::attributes::Attributes;
use crate::context::{Pagination, RenderContext};
use crate::error::{Result, TagError};
use crate::registry::TagHandler;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::Write;

lazy_static! {
    static ref PAGE_PARAM: Regex = Regex::new(r"page=\d+").unwrap();
}

/// Renders the items named by `listitem` for the context's [`Pagination`].
///
/// Items are `index`, `pre`, `pageno`, `next`, `end` and `info`
/// (default `index,pre,pageno,next,end`); unknown items are skipped.
/// `listsize` (10) bounds the window of page numbers and `liststyle`
/// (`pagelist`) is the class of the wrapping `<div>`.
///
/// Links are built from `Request.URL`, else `/list/{Category.id}.html`,
/// else `/list/0.html`; see [`page_url`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PageListTag;

/// Link to `page` derived from `base`:
///
/// - an existing `page=N` parameter is replaced,
/// - a URL with a query string gets `&page=N`,
/// - a `.html` URL becomes `_N.html` (page 1 keeps the base URL),
/// - anything else gets `?page=N`.
pub fn page_url(base: &str, page: u32) -> String {
    if base.contains("page=") {
        return PAGE_PARAM
            .replace_all(base, format!("page={}", page).as_str())
            .into_owned();
    }
    if base.contains('?') {
        return format!("{}&page={}", base, page);
    }
    if let Some(stem) = base.strip_suffix(".html") {
        if page == 1 {
            return base.to_string();
        }
        return format!("{}_{}.html", stem, page);
    }
    format!("{}?page={}", base, page)
}

fn base_url(ctx: &RenderContext) -> String {
    if let Some(url) = ctx.request_url() {
        return url.to_string();
    }
    match ctx.category() {
        Some(category) => format!("/list/{}.html", category.id),
        None => "/list/0.html".to_string(),
    }
}

/// First and last page number shown around the current page.
fn window(pagination: &Pagination, size: u32) -> (u32, u32) {
    let current = pagination.current();
    let total = pagination.total();
    let size = size.clamp(1, total);
    let start = current.saturating_sub(size / 2).max(1);
    if u64::from(start) + u64::from(size) - 1 > u64::from(total) {
        return (total - (size - 1), total);
    }
    (start, start + (size - 1))
}

fn link_or_disabled(html: &mut String, enabled: bool, href: impl FnOnce() -> String, label: &str) {
    if enabled {
        let _ = writeln!(html, r#"<a href="{}">{}</a>"#, href(), label);
    } else {
        let _ = writeln!(html, r#"<span class="disabled">{}</span>"#, label);
    }
}

impl TagHandler for PageListTag {
    fn handle(&self, attrs: &Attributes, _body: &str, ctx: &RenderContext) -> Result<String> {
        let pagination = ctx
            .pagination()
            .ok_or_else(|| TagError::handler("pagelist", "no pagination data in context"))?;
        let size = u32::try_from(attrs.positive("listsize", 10)).unwrap_or(u32::MAX);
        let items = attrs.get_or("listitem", "index,pre,pageno,next,end");
        let style = attrs.non_empty("liststyle").unwrap_or("pagelist");
        let base = base_url(ctx);
        let current = pagination.current();
        let total = pagination.total();

        let mut html = format!("<div class=\"{}\">\n", style);
        for item in items.split(',').map(str::trim) {
            match item {
                "index" => link_or_disabled(&mut html, current > 1, || page_url(&base, 1), "First"),
                "pre" => link_or_disabled(
                    &mut html,
                    pagination.has_prev(),
                    || page_url(&base, pagination.prev()),
                    "Prev",
                ),
                "pageno" => {
                    let (start, end) = window(pagination, size);
                    for page in start..=end {
                        if page == current {
                            let _ = writeln!(html, r#"<span class="current">{}</span>"#, page);
                        } else {
                            let href = page_url(&base, page);
                            let _ = writeln!(html, r#"<a href="{}">{}</a>"#, href, page);
                        }
                    }
                }
                "next" => link_or_disabled(
                    &mut html,
                    pagination.has_next(),
                    || page_url(&base, pagination.next()),
                    "Next",
                ),
                "end" => link_or_disabled(&mut html, current < total, || page_url(&base, total), "Last"),
                "info" => {
                    let _ = writeln!(
                        html,
                        r#"<span class="pageinfo"><strong>{}</strong> pages, <strong>{}</strong> items</span>"#,
                        total, pagination.total_items
                    );
                }
                _ => {}
            }
        }
        html.push_str("</div>\n");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Category;

    #[test]
    fn test_page_url_rules() {
        assert_eq!(page_url("/list/5.html", 3), "/list/5_3.html");
        assert_eq!(page_url("/list/5.html", 1), "/list/5.html");
        assert_eq!(page_url("/search?q=x&page=2", 7), "/search?q=x&page=7");
        assert_eq!(page_url("/search?q=x", 2), "/search?q=x&page=2");
        assert_eq!(page_url("/list/", 2), "/list/?page=2");
    }

    #[test]
    fn test_window_clamps_to_range() {
        assert_eq!(window(&Pagination::new(1, 20, 0), 5), (1, 5));
        assert_eq!(window(&Pagination::new(10, 20, 0), 5), (8, 12));
        assert_eq!(window(&Pagination::new(19, 20, 0), 5), (16, 20));
        assert_eq!(window(&Pagination::new(2, 3, 0), 10), (1, 3));
        assert_eq!(window(&Pagination::new(1, 3, 0), u32::MAX), (1, 3));
        assert_eq!(window(&Pagination::new(u32::MAX, u32::MAX, 0), u32::MAX), (1, u32::MAX));
        assert_eq!(window(&Pagination::new(u32::MAX, u32::MAX, 0), 4), (u32::MAX - 3, u32::MAX));
    }

    #[test]
    fn test_oversized_listsize_shows_every_page() {
        let ctx = RenderContext::new()
            .with_pagination(Pagination::new(1, 3, 30))
            .with_request_url("/list/2.html");
        for listsize in ["4294967295", "18446744073709551615", "0", "-3", "many"] {
            let html = render(&format!(r#"listsize="{}" listitem="pageno""#, listsize), &ctx);
            assert!(html.contains(r#"<span class="current">1</span>"#), "{listsize}");
            assert!(html.contains(r#"<a href="/list/2_3.html">3</a>"#), "{listsize}");
            assert!(!html.contains(">4<"), "{listsize}");
        }
    }

    #[test]
    fn test_last_possible_page_does_not_overflow() {
        let ctx = RenderContext::new()
            .with_pagination(Pagination::new(u32::MAX, u32::MAX, 0))
            .with_request_url("/list/2.html");
        let html = render(r#"listsize="3""#, &ctx);
        assert!(html.contains(r#"<span class="disabled">Next</span>"#));
        assert!(html.contains(&format!(r#"<span class="current">{}</span>"#, u32::MAX)));
    }

    fn render(attrs: &str, ctx: &RenderContext) -> String {
        PageListTag
            .handle(&Attributes::parse(attrs), "", ctx)
            .unwrap()
    }

    #[test]
    fn test_middle_page_from_category_url() {
        let ctx = RenderContext::new()
            .with_pagination(Pagination::new(2, 3, 25))
            .with_category(Category {
                id: 5,
                ..Category::default()
            });
        let html = render(r#"listitem="index,pre,pageno,next,end,info""#, &ctx);
        assert!(html.starts_with("<div class=\"pagelist\">\n"));
        assert!(html.contains(r#"<a href="/list/5.html">First</a>"#));
        assert!(html.contains(r#"<a href="/list/5.html">Prev</a>"#));
        assert!(html.contains(r#"<span class="current">2</span>"#));
        assert!(html.contains(r#"<a href="/list/5_3.html">3</a>"#));
        assert!(html.contains(r#"<a href="/list/5_3.html">Next</a>"#));
        assert!(html.contains(r#"<a href="/list/5_3.html">Last</a>"#));
        assert!(html.contains("<strong>3</strong> pages, <strong>25</strong> items"));
    }

    #[test]
    fn test_first_page_disables_backwards_links() {
        let ctx = RenderContext::new()
            .with_pagination(Pagination::new(1, 2, 10))
            .with_request_url("/search?q=rust");
        let html = render(r#"liststyle="pager""#, &ctx);
        assert!(html.starts_with("<div class=\"pager\">\n"));
        assert!(html.contains(r#"<span class="disabled">First</span>"#));
        assert!(html.contains(r#"<span class="disabled">Prev</span>"#));
        assert!(html.contains(r#"<a href="/search?q=rust&page=2">Next</a>"#));
        assert!(!html.contains("pageinfo"));
    }

    #[test]
    fn test_missing_pagination_is_error() {
        assert!(PageListTag
            .handle(&Attributes::default(), "", &RenderContext::new())
            .is_err());
    }
}
