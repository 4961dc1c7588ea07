// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use crate::error::{Result, TagError};
use crate::resolver::{validate_name, ResolvedTemplate, TemplateResolver};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Memory-based resolver that stores templates by name.
///
/// Includes try `file`, then `{dir}/file` for each fallback directory, the
/// same order the filesystem resolver uses without the root prefix.
#[derive(Debug, Clone)]
pub struct MemoryResolver {
    templates: Arc<RwLock<HashMap<String, String>>>,
    fallback_dirs: Vec<String>,
}

impl Default for MemoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryResolver {
    /// Creates an empty resolver with the default include fallbacks.
    pub fn new() -> Self {
        Self {
            templates: Arc::new(RwLock::new(HashMap::new())),
            fallback_dirs: vec!["templets".to_string(), "templates".to_string()],
        }
    }

    /// Adds a template, builder style.
    pub fn with_template(self, name: &str, content: &str) -> Self {
        self.add_template(name, content);
        self
    }

    /// Adds or replaces a template.
    pub fn add_template(&self, name: &str, content: &str) {
        if let Ok(mut templates) = self.templates.write() {
            templates.insert(name.to_string(), content.to_string());
        }
    }

    /// Removes a template.
    pub fn remove_template(&self, name: &str) {
        if let Ok(mut templates) = self.templates.write() {
            templates.remove(name);
        }
    }

    /// Removes every template.
    pub fn clear(&self) {
        if let Ok(mut templates) = self.templates.write() {
            templates.clear();
        }
    }

    fn lookup(&self, name: &str) -> Result<Option<String>> {
        let templates = self
            .templates
            .read()
            .map_err(|_| TagError::Resolution("template store lock poisoned".to_string()))?;
        Ok(templates.get(name).cloned())
    }
}

impl TemplateResolver for MemoryResolver {
    fn resolve(&self, name: &str) -> Result<ResolvedTemplate> {
        validate_name(name)?;
        match self.lookup(name)? {
            Some(source) => Ok(ResolvedTemplate {
                path: name.to_string(),
                source,
            }),
            None => Err(TagError::Resolution(format!(
                "Template '{}' not found",
                name
            ))),
        }
    }

    fn resolve_include(&self, file: &str) -> Result<ResolvedTemplate> {
        validate_name(file)?;
        for candidate in self.include_candidates(file) {
            if let Some(source) = self.lookup(&candidate)? {
                return Ok(ResolvedTemplate {
                    path: candidate,
                    source,
                });
            }
        }
        Err(TagError::Resolution(format!(
            "include '{}' not found (tried {})",
            file,
            self.include_candidates(file).join(", ")
        )))
    }

    fn include_candidates(&self, file: &str) -> Vec<String> {
        let mut candidates = vec![file.to_string()];
        candidates.extend(self.fallback_dirs.iter().map(|d| format!("{}/{}", d, file)));
        candidates
    }

    fn clone_box(&self) -> Box<dyn TemplateResolver> {
        Box::new(self.clone())
    }
}
