// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! CLI configuration.
//!
//! Configuration is loaded from `cmstags.toml` (or the `--config` path).
//!
//! # Example Configuration
//!
//! ```toml
//! fixtures = "fixtures.json"
//!
//! [engine]
//! template_dir = "templets/default"
//! namespace = "cms"
//!
//! [engine.cache]
//! enabled = true
//! exclude = ["search.htm"]
//!
//! [server]
//! port = 3000
//! host = "127.0.0.1"
//! index = "index.htm"
//!
//! [site]
//! name = "Demo"
//! url = "https://demo.example"
//! ```

use cmstags::{EngineConfig, SiteInfo};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Main configuration structure loaded from `cmstags.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine settings.
    pub engine: EngineConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Site identity for the SEO tags.
    pub site: SiteInfo,
    /// JSON fixture file with tables, context and service data.
    pub fixtures: Option<String>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server port (default: 3000).
    pub port: u16,
    /// Server host (default: "127.0.0.1").
    pub host: String,
    /// Template served for directory paths (default: "index.htm").
    pub index: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
            index: "index.htm".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`.
    ///
    /// If no configuration file exists, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
