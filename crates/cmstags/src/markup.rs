// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Custom tag preprocessor.
//!
//! Rewrites a template in four ordered passes before the generic stage sees
//! it (`cms` is the configured namespace):
//!
//! 1. Block tags `{cms:NAME ATTRS}BODY{/cms:NAME}` are dispatched to their
//!    handler and replaced by its output.
//! 2. `{cms:field.NAME/}` becomes `{{ Fields.NAME }}`.
//! 3. `{cms:global.NAME/}` becomes `{{ Globals.NAME }}`.
//! 4. Self-closing tags `{cms:NAME ATTRS/}` are dispatched with an empty body.
//!
//! # Block matching
//!
//! Block tags are paired with a stack, so nested tags of the same name
//! balance:
//!
//! - A self-closing tag never opens a block.
//! - A close tag pops back to the nearest open tag of the same name. If no
//!   open tag has that name, the innermost one is popped and a mismatch is
//!   logged; the opening name wins.
//! - A span ends when its outermost tag is closed. The whole span is handed
//!   to one handler with the raw text between the outer tags as its body.
//! - An open tag that is never closed stays as literal text and scanning
//!   resumes right after it.
//!
//! Handler output is not scanned again by the pass that produced it. Later
//! passes still run over the whole text, so a block handler may emit field
//! references or self-closing tags and they will be expanded.
//!
//! # Failure isolation
//!
//! An unknown tag is left verbatim with a warning. A failing handler leaves
//! the original tag text in place and logs an error. Neither stops the
//! remaining tags from being processed.

use crate::attributes::Attributes;
use crate::context::RenderContext;
use crate::error::{Result, TagError};
use crate::registry::TagRegistry;
use regex::{Captures, Regex};
use std::ops::Range;
use tracing::{debug, error, warn};

/// One parsed tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TagInvocation {
    /// Tag name (the opening name for blocks).
    pub name: String,
    /// Parsed attributes.
    pub attrs: Attributes,
    /// Raw body, empty for self-closing tags.
    pub body: String,
    /// True for `{ns:NAME/}`.
    pub self_closing: bool,
    /// Byte range of the whole tag in the scanned text.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Open,
    Close,
}

#[derive(Debug)]
struct Token<'a> {
    kind: TokenKind,
    name: &'a str,
    attrs: &'a str,
    start: usize,
    end: usize,
}

/// Four-pass tag rewriter for one namespace.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    namespace: String,
    block_token: Regex,
    self_closing: Regex,
    field_ref: Regex,
    global_ref: Regex,
}

impl Preprocessor {
    /// Builds the patterns for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::Config`] for an empty namespace.
    pub fn new(namespace: &str) -> Result<Self> {
        let namespace = namespace.trim();
        if namespace.is_empty() {
            return Err(TagError::Config("tag namespace must not be empty".to_string()));
        }
        let ns = regex::escape(namespace);
        let compile = |pattern: String| {
            Regex::new(&pattern)
                .map_err(|e| TagError::Config(format!("invalid tag pattern: {}", e)))
        };

        Ok(Self {
            namespace: namespace.to_string(),
            block_token: compile(format!(r"\{{(/?){ns}:([a-zA-Z0-9_]+)(\s[^}}]*?)?(/?)\}}"))?,
            self_closing: compile(format!(r"\{{{ns}:([a-zA-Z0-9_]+)(\s[^}}]*?)?/\}}"))?,
            field_ref: compile(format!(r"\{{{ns}:field\.([a-zA-Z0-9_]+)/\}}"))?,
            global_ref: compile(format!(r"\{{{ns}:global\.([a-zA-Z0-9_]+)/\}}"))?,
        })
    }

    /// The tag namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Runs all four passes.
    pub fn process(&self, text: &str, registry: &TagRegistry, ctx: &RenderContext) -> String {
        let text = self.expand_blocks(text, registry, ctx);
        let text = self.rewrite_fields(&text);
        let text = self.rewrite_globals(&text);
        self.expand_self_closing(&text, registry, ctx)
    }

    /// Pass 1: dispatches every outermost balanced block tag.
    pub fn expand_blocks(&self, text: &str, registry: &TagRegistry, ctx: &RenderContext) -> String {
        let spans = self.block_tags(text);
        if spans.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for invocation in &spans {
            out.push_str(&text[cursor..invocation.span.start]);
            let original = &text[invocation.span.clone()];
            out.push_str(&dispatch(registry, invocation, original, ctx));
            cursor = invocation.span.end;
        }
        out.push_str(&text[cursor..]);
        out
    }

    /// Pass 2: field references to generic-stage variables.
    pub fn rewrite_fields(&self, text: &str) -> String {
        self.field_ref
            .replace_all(text, |caps: &Captures<'_>| variable("Fields", &caps[1]))
            .into_owned()
    }

    /// Pass 3: global references to generic-stage variables.
    pub fn rewrite_globals(&self, text: &str) -> String {
        self.global_ref
            .replace_all(text, |caps: &Captures<'_>| variable("Globals", &caps[1]))
            .into_owned()
    }

    /// Pass 4: dispatches every self-closing tag.
    pub fn expand_self_closing(
        &self,
        text: &str,
        registry: &TagRegistry,
        ctx: &RenderContext,
    ) -> String {
        self.self_closing
            .replace_all(text, |caps: &Captures<'_>| {
                let Some(whole) = caps.get(0) else {
                    return String::new();
                };
                let invocation = TagInvocation {
                    name: caps[1].to_string(),
                    attrs: Attributes::parse(caps.get(2).map_or("", |m| m.as_str())),
                    body: String::new(),
                    self_closing: true,
                    span: whole.range(),
                };
                dispatch(registry, &invocation, whole.as_str(), ctx)
            })
            .into_owned()
    }

    /// Finds the outermost balanced block tags of `text`, in order.
    pub fn block_tags(&self, text: &str) -> Vec<TagInvocation> {
        let tokens = self.tokens(text);
        let mut spans = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];
            match token.kind {
                TokenKind::Open => stack.push(i),
                TokenKind::Close if stack.is_empty() => {
                    debug!(tag = %token.name, "stray close tag left as text");
                }
                TokenKind::Close => {
                    let root = stack[0];
                    match stack.iter().rposition(|&o| tokens[o].name == token.name) {
                        Some(pos) => stack.truncate(pos),
                        None => {
                            if let Some(top) = stack.pop() {
                                warn!(
                                    open = %tokens[top].name,
                                    close = %token.name,
                                    "mismatched close tag, using the opening name"
                                );
                            }
                        }
                    }
                    if stack.is_empty() {
                        let open = &tokens[root];
                        spans.push(TagInvocation {
                            name: open.name.to_string(),
                            attrs: Attributes::parse(open.attrs),
                            body: text[open.end..token.start].to_string(),
                            self_closing: false,
                            span: open.start..token.end,
                        });
                    }
                }
            }

            i += 1;
            if i == tokens.len() && !stack.is_empty() {
                // The outermost open tag never closed: keep it as text and
                // rescan everything after it.
                let root = stack[0];
                debug!(tag = %tokens[root].name, "unclosed block tag left as text");
                stack.clear();
                i = root + 1;
            }
        }

        spans
    }

    fn tokens<'a>(&self, text: &'a str) -> Vec<Token<'a>> {
        self.block_token
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
                let attrs = caps.get(3).map_or("", |m| m.as_str());
                let self_closing = caps.get(4).is_some_and(|m| !m.as_str().is_empty());
                if self_closing || (closing && !attrs.trim().is_empty()) {
                    return None;
                }
                Some(Token {
                    kind: if closing { TokenKind::Close } else { TokenKind::Open },
                    name: caps.get(2)?.as_str(),
                    attrs,
                    start: whole.start(),
                    end: whole.end(),
                })
            })
            .collect()
    }
}

/// Generic-stage variable for `root.name`; names that are not identifiers
/// use subscript syntax.
fn variable(root: &str, name: &str) -> String {
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{{{{ {}[\"{}\"] }}}}", root, name)
    } else {
        format!("{{{{ {}.{} }}}}", root, name)
    }
}

fn dispatch(
    registry: &TagRegistry,
    invocation: &TagInvocation,
    original: &str,
    ctx: &RenderContext,
) -> String {
    let handler = match registry.get(&invocation.name) {
        Ok(Some(handler)) => handler,
        Ok(None) => {
            warn!(tag = %invocation.name, "no handler registered for tag, leaving it in place");
            return original.to_string();
        }
        Err(err) => {
            error!(tag = %invocation.name, error = %err, "tag lookup failed, leaving tag in place");
            return original.to_string();
        }
    };
    match handler.handle(&invocation.attrs, &invocation.body, ctx) {
        Ok(output) => output,
        Err(err) => {
            error!(
                tag = %invocation.name,
                error = %err,
                "tag handler failed, leaving tag in place"
            );
            original.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::handler_fn;
    use crate::test_support::capture_logs;

    fn registry() -> TagRegistry {
        let registry = TagRegistry::new();
        registry.register("upper", handler_fn(|_, body, _| Ok(body.to_uppercase()))).unwrap();
        registry
            .register(
                "wrap",
                handler_fn(|attrs, body, _| {
                    let el = attrs.get_or("el", "div");
                    Ok(format!("<{}>{}</{}>", el, body, el))
                }),
            )
            .unwrap();
        registry
            .register("fail", handler_fn(|_, _, _| Err(TagError::handler("fail", "boom"))))
            .unwrap();
        registry
            .register(
                "emit",
                handler_fn(|_, _, _| {
                    Ok("{cms:field.title/}|{cms:upper}x{/cms:upper}".to_string())
                }),
            )
            .unwrap();
        registry
    }

    fn process(text: &str) -> String {
        Preprocessor::new("cms")
            .unwrap()
            .process(text, &registry(), &RenderContext::new())
    }

    #[test]
    fn test_text_without_tags_is_unchanged() {
        let text = "<p>{{ Fields.x }} {not:a tag} {cms} [field:id/]</p>\n";
        assert_eq!(process(text), text);
    }

    #[test]
    fn test_block_tag_replaced() {
        assert_eq!(process("a{cms:upper}hi{/cms:upper}b"), "aHIb");
        assert_eq!(process(r#"{cms:wrap el="p"}x{/cms:wrap}"#), "<p>x</p>");
    }

    #[test]
    fn test_nested_same_name_blocks_balance() {
        let pre = Preprocessor::new("cms").unwrap();
        let text = "{cms:wrap}a{cms:wrap}b{/cms:wrap}c{/cms:wrap}tail";
        let spans = pre.block_tags(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].body, "a{cms:wrap}b{/cms:wrap}c");
        assert_eq!(
            &text[spans[0].span.clone()],
            "{cms:wrap}a{cms:wrap}b{/cms:wrap}c{/cms:wrap}"
        );
    }

    #[test]
    fn test_mismatched_close_uses_opening_name() {
        let (out, logs) = capture_logs(|| process("{cms:upper}x{/cms:bar}"));
        assert_eq!(out, "X");
        assert!(logs.contains("WARN"));
        assert!(logs.contains("mismatched close tag"));
    }

    #[test]
    fn test_unknown_tags_left_verbatim_with_warning() {
        let (out, logs) = capture_logs(|| process(r#"<{cms:doesnotexist a="1"/}>"#));
        assert_eq!(out, r#"<{cms:doesnotexist a="1"/}>"#);
        assert!(logs.contains("WARN"));
        assert!(logs.contains("doesnotexist"));

        let (out, _) = capture_logs(|| process("{cms:nope}body{/cms:nope}"));
        assert_eq!(out, "{cms:nope}body{/cms:nope}");
    }

    #[test]
    fn test_handler_error_isolated() {
        let (out, logs) = capture_logs(|| {
            process("{cms:fail}x{/cms:fail}|{cms:upper}ok{/cms:upper}|{cms:fail/}")
        });
        assert_eq!(out, "{cms:fail}x{/cms:fail}|OK|{cms:fail/}");
        assert!(logs.contains("ERROR"));
        assert!(logs.contains("boom"));
    }

    #[test]
    fn test_self_closing_is_not_an_opener() {
        assert_eq!(process("{cms:upper/}{cms:upper}a{/cms:upper}"), "A");
    }

    #[test]
    fn test_unclosed_opener_stays_literal() {
        assert_eq!(process("{cms:wrap}open {cms:upper}x{/cms:upper}"), "{cms:wrap}open X");
    }

    #[test]
    fn test_stray_close_stays_literal() {
        assert_eq!(process("a{/cms:upper}b"), "a{/cms:upper}b");
    }

    #[test]
    fn test_field_and_global_references() {
        assert_eq!(
            process("{cms:field.title/} {cms:global.site_name/} {cms:field.9x/}"),
            r#"{{ Fields.title }} {{ Globals.site_name }} {{ Fields["9x"] }}"#
        );
    }

    #[test]
    fn test_block_output_not_rescanned_by_block_pass() {
        // Later passes still expand what the handler emitted.
        assert_eq!(
            process("{cms:emit}{/cms:emit}"),
            "{{ Fields.title }}|{cms:upper}x{/cms:upper}"
        );
    }

    #[test]
    fn test_custom_namespace() {
        let pre = Preprocessor::new("dede").unwrap();
        let out = pre.process(
            "{dede:upper}a{/dede:upper}{cms:upper}b{/cms:upper}",
            &registry(),
            &RenderContext::new(),
        );
        assert_eq!(out, "A{cms:upper}b{/cms:upper}");
        assert!(Preprocessor::new(" ").is_err());
    }

    #[test]
    fn test_attributes_and_body_passed() {
        let pre = Preprocessor::new("cms").unwrap();
        let spans =
            pre.block_tags(r#"{cms:arclist row='5' typeid="2"}[field:title/]{/cms:arclist}"#);
        assert_eq!(spans[0].name, "arclist");
        assert_eq!(spans[0].attrs.get("row"), Some("5"));
        assert_eq!(spans[0].attrs.get("typeid"), Some("2"));
        assert_eq!(spans[0].body, "[field:title/]");
        assert!(!spans[0].self_closing);
    }

    #[test]
    fn test_poisoned_registry_keeps_tags_verbatim() {
        let registry = std::sync::Arc::new(registry());
        let poisoner = registry.clone();
        let _ = std::thread::spawn(move || poisoner.poison_for_test()).join();

        let (out, logs) = capture_logs(|| {
            Preprocessor::new("cms").unwrap().process(
                "{cms:upper}x{/cms:upper}",
                &registry,
                &RenderContext::new(),
            )
        });
        assert_eq!(out, "{cms:upper}x{/cms:upper}");
        assert!(logs.contains("ERROR"));
        assert!(logs.contains("poisoned"));
    }
}
