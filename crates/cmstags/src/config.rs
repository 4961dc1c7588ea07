// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Engine configuration.
//!
//! # Example Configuration
//!
//! ```toml
//! template_dir = "templets/default"
//! namespace = "cms"
//! include_fallback_dirs = ["templets", "templates"]
//! auto_escape = true
//!
//! [cache]
//! enabled = true
//! capacity = 512
//! exclude = ["search.htm"]
//!
//! [telemetry]
//! queue_capacity = 1024
//! ```

use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root directory templates are read from (default: "templates").
    pub template_dir: String,
    /// Tag namespace: `{cms:arclist}` uses namespace "cms" (default: "cms").
    pub namespace: String,
    /// Directories the include tag tries after `template_dir`.
    pub include_fallback_dirs: Vec<String>,
    /// HTML auto-escaping of `{{ }}` output in the generic stage (default: true).
    pub auto_escape: bool,
    /// Render cache settings.
    pub cache: CacheConfig,
    /// Background hit counter settings.
    pub telemetry: TelemetryConfig,
}

/// Render cache configuration.
///
/// The cache key is the template name alone. A cached page is served for
/// every later request of that name whatever data the caller passes, so only
/// data-invariant templates should be rendered with the cache enabled.
/// List data-dependent templates in `exclude`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether rendered output is cached (default: false).
    pub enabled: bool,
    /// Maximum number of rendered pages kept in memory (default: 256).
    pub capacity: usize,
    /// Template names that are never cached.
    pub exclude: Vec<String>,
}

/// Hit counter queue configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Bounded queue size; hits beyond it are dropped (default: 1024).
    pub queue_capacity: usize,
}

fn default_template_dir() -> String {
    "templates".to_string()
}

fn default_namespace() -> String {
    "cms".to_string()
}

fn default_include_fallback_dirs() -> Vec<String> {
    vec!["templets".to_string(), "templates".to_string()]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_dir: default_template_dir(),
            namespace: default_namespace(),
            include_fallback_dirs: default_include_fallback_dirs(),
            auto_escape: true,
            cache: CacheConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: 256,
            exclude: Vec::new(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { queue_capacity: 1024 }
    }
}

impl EngineConfig {
    /// Creates the default configuration rooted at `template_dir`.
    pub fn new<P: AsRef<Path>>(template_dir: P) -> Self {
        Self {
            template_dir: template_dir.as_ref().to_string_lossy().to_string(),
            ..Self::default()
        }
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Loads a configuration file; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Enables the render cache.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache.enabled = enabled;
        self
    }

    /// Sets the tag namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}
