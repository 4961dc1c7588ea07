// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `{cms:i18n}`: translations and the language selector.
//!
//! ```html
//! {cms:i18n key="welcome" arg1="Ada"/}
//! {cms:i18n}Hello|Bonjour|Hallo{/cms:i18n}
//! {cms:i18n mode="selector"/}
//! ```

use crate::attributes::Attributes;
use crate::context::RenderContext;
use crate::error::{Result, TagError};
use crate::registry::TagHandler;
use crate::services::Translator;
use std::sync::Arc;

/// Adapter over a [`Translator`].
///
/// The language is the `lang` attribute, else the context's `Lang`, else
/// the translator's default. The self-closing form translates `key` with
/// the arguments `arg1`, `arg2`, ... (stopping at the first gap). The block
/// form splits its body on `|` and picks the segment at the language's
/// position in [`Translator::langs`], falling back to the first segment.
#[derive(Debug)]
pub struct I18nTag {
    translator: Arc<dyn Translator>,
}

impl I18nTag {
    /// Creates the handler.
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self { translator }
    }

    fn lang(&self, attrs: &Attributes, ctx: &RenderContext) -> String {
        attrs
            .non_empty("lang")
            .or_else(|| ctx.lang())
            .map(str::to_string)
            .unwrap_or_else(|| self.translator.default_lang())
    }

    fn selector(&self, ctx: &RenderContext) -> String {
        let current = ctx
            .lang()
            .map(str::to_string)
            .unwrap_or_else(|| self.translator.default_lang());
        let mut html = String::from(r#"<div class="lang-selector">"#);
        for language in self.translator.available_langs() {
            if language.code == current {
                html.push_str(&format!(
                    r#"<span class="lang-item active">{}</span>"#,
                    language.name
                ));
            } else {
                html.push_str(&format!(
                    r#"<a href="?lang={}" class="lang-item">{}</a>"#,
                    language.code, language.name
                ));
            }
        }
        html.push_str("</div>");
        html
    }

    fn pick_segment(&self, body: &str, lang: &str) -> String {
        let parts: Vec<&str> = body.split('|').collect();
        self.translator
            .langs()
            .iter()
            .position(|l| l == lang)
            .and_then(|i| parts.get(i))
            .or_else(|| parts.first())
            .map(|s| s.to_string())
            .unwrap_or_default()
    }
}

impl TagHandler for I18nTag {
    fn handle(&self, attrs: &Attributes, body: &str, ctx: &RenderContext) -> Result<String> {
        if attrs.get("mode") == Some("selector") {
            return Ok(self.selector(ctx));
        }

        let lang = self.lang(attrs, ctx);
        if !body.is_empty() {
            return Ok(self.pick_segment(body, &lang));
        }

        let key = attrs
            .non_empty("key")
            .ok_or_else(|| TagError::handler("i18n", "missing key attribute"))?;
        let args: Vec<String> = (1..)
            .map_while(|i| attrs.get(&format!("arg{}", i)).map(str::to_string))
            .collect();
        Ok(self.translator.translate(&lang, key, &args))
    }
}
