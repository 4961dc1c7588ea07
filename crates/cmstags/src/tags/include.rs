// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `{cms:include file="head.htm"/}`: sub-template include.

use crate::attributes::Attributes;
use crate::context::RenderContext;
use crate::error::{Result, TagError};
use crate::registry::TagHandler;
use crate::resolver::TemplateResolver;
use std::sync::Arc;
use tracing::{error, info};

/// Returns the contents of `file` exactly as stored.
///
/// The file is found through [`TemplateResolver::resolve_include`], which
/// tries the template directory, the fallback directories and finally the
/// bare name. Tags inside the included text are not expanded; its
/// generic-stage syntax is evaluated with the rest of the page.
#[derive(Debug)]
pub struct IncludeTag {
    resolver: Arc<dyn TemplateResolver>,
}

impl IncludeTag {
    /// Creates the handler.
    pub fn new(resolver: Arc<dyn TemplateResolver>) -> Self {
        Self { resolver }
    }
}

impl TagHandler for IncludeTag {
    fn handle(&self, attrs: &Attributes, _body: &str, _ctx: &RenderContext) -> Result<String> {
        let file = attrs
            .non_empty("file")
            .ok_or_else(|| TagError::handler("include", "missing file attribute"))?;

        match self.resolver.resolve_include(file) {
            Ok(resolved) => {
                info!(file = %file, path = %resolved.path, "included template");
                Ok(resolved.source)
            }
            Err(err) => {
                let candidates = self.resolver.include_candidates(file);
                error!(file = %file, candidates = ?candidates, error = %err, "include not found");
                Err(TagError::handler("include", format!("cannot find included file '{}'", file)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_resolver::MemoryResolver;
    use crate::test_support::capture_logs;

    fn tag() -> IncludeTag {
        let resolver = MemoryResolver::new()
            .with_template("head.htm", "<head>{cms:arclist}x{/cms:arclist}</head>")
            .with_template("templets/foot.htm", "<footer/>");
        IncludeTag::new(Arc::new(resolver))
    }

    #[test]
    fn test_returns_raw_contents() {
        let out = tag()
            .handle(&Attributes::parse(r#"file="head.htm""#), "", &RenderContext::new())
            .unwrap();
        assert_eq!(out, "<head>{cms:arclist}x{/cms:arclist}</head>");
    }

    #[test]
    fn test_uses_fallback_directory() {
        let (out, logs) = capture_logs(|| {
            tag().handle(&Attributes::parse(r#"file="foot.htm""#), "", &RenderContext::new())
        });
        assert_eq!(out.unwrap(), "<footer/>");
        assert!(logs.contains("INFO"));
    }

    #[test]
    fn test_missing_file_logs_candidates() {
        let (out, logs) = capture_logs(|| {
            tag().handle(&Attributes::parse(r#"file="nope.htm""#), "", &RenderContext::new())
        });
        assert!(out.is_err());
        assert!(logs.contains("ERROR"));
        assert!(logs.contains("templets/nope.htm"));
        assert!(tag()
            .handle(&Attributes::default(), "", &RenderContext::new())
            .is_err());
    }
}
