// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Template engine: load, preprocess, generic render, cache.
//!
//! This module provides the [`Engine`] type that drives one render:
//!
//! 1. **Resolver**: reads the template text by name
//! 2. **Preprocessor**: expands the `{cms:...}` tags through the registry
//! 3. **Generic stage**: evaluates `{{ }}` syntax with the function library
//! 4. **Cache**: stores the final text under the template name
//!
//! # Quick Start
//!
//! ```rust
//! use cmstags::{Engine, EngineConfig, MemoryResolver, RenderContext, Services};
//!
//! let resolver = MemoryResolver::new()
//!     .with_template("hello.htm", "<h1>{cms:field.title/}</h1>");
//! let engine = Engine::with_memory_cache(EngineConfig::default(), resolver, Services::new())?;
//!
//! let ctx = RenderContext::new().with_field("title", "World");
//! assert_eq!(engine.render_to_string("hello.htm", &ctx)?, "<h1>World</h1>");
//! # Ok::<(), cmstags::TagError>(())
//! ```
//!
//! # Caching
//!
//! With `cache.enabled` a successful render is stored under
//! `template:{name}` and later renders of that name return it **without
//! looking at the context**. Exclude data-dependent templates with
//! `cache.exclude` or [`Engine::set_cache_policy`].
//!
//! # Thread Safety
//!
//! The engine is `Send + Sync` and meant to be shared behind an `Arc`.
//! Dispatch reads the tag registry under a read lock; the cache does its
//! own locking.

use crate::cache::{cache_key, CachePolicy, MemoryCache, RenderCache, RenderedPage};
use crate::config::EngineConfig;
use crate::context::RenderContext;
use crate::error::{Result, TagError};
use crate::generic::GenericRenderer;
use crate::markup::Preprocessor;
use crate::registry::{TagHandler, TagRegistry};
use crate::resolver::TemplateResolver;
use crate::response::HtmlResponse;
use crate::services::Services;
use crate::tags::register_builtin_tags;
use crate::telemetry::HitQueue;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// CMS template engine.
///
/// Owns its tag registry, so several engines in one process never share
/// handlers.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    resolver: Arc<dyn TemplateResolver>,
    cache: Box<dyn RenderCache>,
    registry: TagRegistry,
    preprocessor: Preprocessor,
    generic: GenericRenderer,
    hits: Option<Arc<HitQueue>>,
    policies: RwLock<HashMap<String, CachePolicy>>,
}

impl Engine {
    /// Creates an engine and registers the built-in tags whose
    /// collaborators are present in `services`.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace is empty or the hit counter
    /// worker cannot be started.
    pub fn new<R: TemplateResolver>(
        config: EngineConfig,
        resolver: R,
        cache: Box<dyn RenderCache>,
        services: Services,
    ) -> Result<Self> {
        let resolver: Arc<dyn TemplateResolver> = Arc::new(resolver);
        let preprocessor = Preprocessor::new(&config.namespace)?;
        let hits = match &services.data {
            Some(data) => Some(Arc::new(HitQueue::new(
                data.clone(),
                config.telemetry.queue_capacity,
            )?)),
            None => None,
        };

        let registry = TagRegistry::new();
        register_builtin_tags(&registry, &services, resolver.clone(), hits.clone())?;
        debug!(namespace = %preprocessor.namespace(), tags = ?registry.names(), "engine ready");

        Ok(Self {
            generic: GenericRenderer::new(config.auto_escape),
            config,
            resolver,
            cache,
            registry,
            preprocessor,
            hits,
            policies: RwLock::new(HashMap::new()),
        })
    }

    /// Creates an engine with an in-memory LRU cache sized by
    /// `config.cache.capacity`.
    pub fn with_memory_cache<R: TemplateResolver>(
        config: EngineConfig,
        resolver: R,
        services: Services,
    ) -> Result<Self> {
        let cache = Box::new(MemoryCache::new(config.cache.capacity));
        Self::new(config, resolver, cache, services)
    }

    /// Creates an engine reading templates from `config.template_dir`.
    #[cfg(feature = "filesystem")]
    pub fn from_config(config: EngineConfig, services: Services) -> Result<Self> {
        let resolver = crate::resolver::FileSystemResolver::from_config(&config);
        Self::with_memory_cache(config, resolver, services)
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The template resolver.
    pub fn resolver(&self) -> &Arc<dyn TemplateResolver> {
        &self.resolver
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Renders `name` and writes the result to `out`.
    ///
    /// # Errors
    ///
    /// Fails if the template cannot be read, the generic stage fails, or
    /// `out` cannot be written. Nothing is written on failure.
    pub fn render(&self, out: &mut dyn Write, name: &str, ctx: &RenderContext) -> Result<()> {
        let html = self.render_to_string(name, ctx)?;
        out.write_all(html.as_bytes())?;
        Ok(())
    }

    /// Renders `name` to a string, serving it from the cache when allowed.
    pub fn render_to_string(&self, name: &str, ctx: &RenderContext) -> Result<String> {
        let cacheable = self.is_cacheable(name);
        let key = cache_key(name);
        if cacheable {
            if let Some(page) = self.cache.get(&key)? {
                debug!(template = %name, "render cache hit");
                return Ok(page.html.clone());
            }
        }

        let template = self.resolver.resolve(name)?;
        let html = self.render_source(name, &template.source, ctx)?;

        if cacheable {
            self.cache
                .set(&key, Arc::new(RenderedPage::new(name, html.as_str())))?;
            debug!(template = %name, "render cache store");
        }
        Ok(html)
    }

    /// Renders `name` as an HTML response.
    pub fn render_response(&self, name: &str, ctx: &RenderContext) -> Result<HtmlResponse> {
        Ok(HtmlResponse::ok(self.render_to_string(name, ctx)?))
    }

    /// Runs both stages over in-memory text; the cache is not consulted.
    pub fn render_source(&self, name: &str, source: &str, ctx: &RenderContext) -> Result<String> {
        let text = self.preprocess(source, ctx);
        self.generic.render(name, &text, ctx)
    }

    /// Runs the tag preprocessor alone.
    pub fn preprocess(&self, text: &str, ctx: &RenderContext) -> String {
        self.preprocessor.process(text, &self.registry, ctx)
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Registers (or replaces) a tag handler.
    pub fn register_tag(&self, name: &str, handler: Arc<dyn TagHandler>) -> Result<()> {
        self.registry.register(name, handler)
    }

    /// Whether a handler is registered under `name`.
    pub fn has_tag(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Registered tag names, sorted.
    pub fn tag_names(&self) -> Vec<String> {
        self.registry.names()
    }

    // ========================================================================
    // Cache Management
    // ========================================================================

    /// Sets whether renders of `name` may be cached.
    pub fn set_cache_policy(&self, name: &str, policy: CachePolicy) -> Result<()> {
        let mut policies = self
            .policies
            .write()
            .map_err(|_| TagError::Cache("cache policy lock poisoned".to_string()))?;
        policies.insert(name.to_string(), policy);
        Ok(())
    }

    /// The policy applying to `name` (excluded names are [`CachePolicy::Never`]).
    pub fn cache_policy(&self, name: &str) -> CachePolicy {
        if self.config.cache.exclude.iter().any(|excluded| excluded == name) {
            return CachePolicy::Never;
        }
        self.policies
            .read()
            .ok()
            .and_then(|policies| policies.get(name).copied())
            .unwrap_or_default()
    }

    fn is_cacheable(&self, name: &str) -> bool {
        self.config.cache.enabled && self.cache_policy(name) == CachePolicy::ByName
    }

    /// Whether a rendered page for `name` is cached.
    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(&cache_key(name))
    }

    /// Drops the cached page for `name`.
    pub fn invalidate(&self, name: &str) -> Result<()> {
        debug!(template = %name, "render cache invalidate");
        self.cache.remove(&cache_key(name))
    }

    /// Drops every cached page.
    pub fn clear_cache(&self) -> Result<()> {
        self.cache.clear()
    }

    // ========================================================================
    // Telemetry
    // ========================================================================

    /// Waits until every queued hit has been applied.
    pub fn flush_telemetry(&self) -> Result<()> {
        match &self.hits {
            Some(hits) => hits.flush(),
            None => Ok(()),
        }
    }

    /// Hits dropped because the queue was full.
    pub fn dropped_hits(&self) -> u64 {
        self.hits.as_ref().map(|hits| hits.dropped()).unwrap_or(0)
    }
}
