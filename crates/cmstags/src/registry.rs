// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Tag handler table.
//!
//! Every [`Engine`](crate::Engine) owns its own registry; nothing is
//! process-global. Dispatch takes the read lock and registration the write
//! lock, so steady-state rendering only ever contends on reads.

use crate::attributes::Attributes;
use crate::context::RenderContext;
use crate::error::{Result, TagError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// One tag implementation.
///
/// `body` is the raw text between the open and close tags, empty for a
/// self-closing tag. The returned text replaces the whole tag. An error
/// leaves the tag text in place; it never aborts the page.
pub trait TagHandler: Send + Sync + std::fmt::Debug {
    /// Produces the replacement text for one invocation.
    fn handle(&self, attrs: &Attributes, body: &str, ctx: &RenderContext) -> Result<String>;
}

/// Adapter turning a closure into a [`TagHandler`].
pub struct FnHandler<F>(pub F);

/// Wraps a closure as a shareable handler.
///
/// ```rust
/// use cmstags::handler_fn;
///
/// let shout = handler_fn(|_attrs, body, _ctx| Ok(body.to_uppercase()));
/// ```
pub fn handler_fn<F>(f: F) -> Arc<dyn TagHandler>
where
    F: Fn(&Attributes, &str, &RenderContext) -> Result<String> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnHandler")
    }
}

impl<F> TagHandler for FnHandler<F>
where
    F: Fn(&Attributes, &str, &RenderContext) -> Result<String> + Send + Sync,
{
    fn handle(&self, attrs: &Attributes, body: &str, ctx: &RenderContext) -> Result<String> {
        (self.0)(attrs, body, ctx)
    }
}

/// Name to handler table.
#[derive(Debug, Default)]
pub struct TagRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn TagHandler>>>,
}

impl TagRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the handler for `name`.
    pub fn register(&self, name: &str, handler: Arc<dyn TagHandler>) -> Result<()> {
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| TagError::handler(name, "tag registry lock poisoned"))?;
        debug!(tag = %name, "registered tag handler");
        handlers.insert(name.to_string(), handler);
        Ok(())
    }

    /// Returns the handler for `name`.
    ///
    /// # Errors
    ///
    /// Fails when the registry lock is poisoned.
    pub fn get(&self, name: &str) -> Result<Option<Arc<dyn TagHandler>>> {
        let handlers = self
            .handlers
            .read()
            .map_err(|_| TagError::handler(name, "tag registry lock poisoned"))?;
        Ok(handlers.get(name).cloned())
    }

    /// Returns true if `name` has a handler.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers
            .read()
            .map(|handlers| handlers.contains_key(name))
            .unwrap_or(false)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .map(|handlers| handlers.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[cfg(test)]
impl TagRegistry {
    /// Panics while holding the write lock, leaving the lock poisoned.
    pub(crate) fn poison_for_test(&self) {
        let _guard = self.handlers.write();
        panic!("poisoning tag registry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = TagRegistry::new();
        registry.register("echo", handler_fn(|_, body, _| Ok(body.to_string()))).unwrap();

        assert!(registry.contains("echo"));
        assert!(!registry.contains("other"));
        let handler = registry.get("echo").unwrap().unwrap();
        let out = handler
            .handle(&Attributes::default(), "hi", &RenderContext::new())
            .unwrap();
        assert_eq!(out, "hi");
    }

    #[test]
    fn test_names_sorted_and_replace() {
        let registry = TagRegistry::new();
        for name in ["b", "a", "b"] {
            registry.register(name, handler_fn(|_, _, _| Ok(String::new()))).unwrap();
        }
        assert_eq!(registry.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_registries_are_independent() {
        let first = TagRegistry::new();
        let second = TagRegistry::new();
        first.register("only_first", handler_fn(|_, _, _| Ok(String::new()))).unwrap();
        assert!(!second.contains("only_first"));
    }
}
