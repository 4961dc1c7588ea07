// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Template resource resolution.
//!
//! This module provides the [`TemplateResolver`] trait and the filesystem
//! implementation. See [`MemoryResolver`](crate::MemoryResolver) for the
//! in-memory variant used by tests.
//!
//! # Resolution Algorithm
//!
//! Page templates are read by relative name from the root directory.
//!
//! Includes try, in order:
//!
//! 1. `{root}/{file}`
//! 2. `{fallback}/{file}` for every fallback directory (`templets`, `templates`)
//! 3. `{file}` as given
//!
//! Names containing `..` or starting with `/` are rejected before any
//! candidate is touched.

use crate::error::{Result, TagError};
use std::path::{Component, Path, PathBuf};

#[cfg(feature = "filesystem")]
use std::fs;

/// Converts a Path to a normalized string with forward slashes.
#[inline]
pub fn path_to_string<P: AsRef<Path>>(path: P) -> String {
    path.as_ref().to_string_lossy().replace('\\', "/")
}

/// A resolved template with its location and source text.
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    /// Where the template was found.
    pub path: String,
    /// The raw template text.
    pub source: String,
}

/// Trait for resolving and loading templates.
///
/// Implement this trait to load templates from another store
/// (database, network, etc.).
pub trait TemplateResolver: Send + Sync + 'static {
    /// Loads a page template by name.
    fn resolve(&self, name: &str) -> Result<ResolvedTemplate>;

    /// Loads an included file, trying every include candidate in order.
    fn resolve_include(&self, file: &str) -> Result<ResolvedTemplate>;

    /// Locations `resolve_include` tries for `file`, in order.
    fn include_candidates(&self, file: &str) -> Vec<String>;

    /// Creates a boxed clone.
    fn clone_box(&self) -> Box<dyn TemplateResolver>;
}

impl std::fmt::Debug for dyn TemplateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TemplateResolver")
    }
}

impl Clone for Box<dyn TemplateResolver> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Rejects names that could leave the template roots.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TagError::Resolution("empty template name".to_string()));
    }
    let path = Path::new(name);
    let escapes = name.starts_with('/')
        || name.starts_with('\\')
        || path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(TagError::Resolution(format!(
            "'{}' escapes the template directory",
            name
        )));
    }
    Ok(())
}

/// Filesystem-based template resolver.
///
/// # Examples
///
/// ```rust,no_run
/// use cmstags::{FileSystemResolver, TemplateResolver};
///
/// let resolver = FileSystemResolver::new("./templets/default");
/// let page = resolver.resolve("index.htm").unwrap();
/// println!("{}", page.source);
/// ```
#[cfg(feature = "filesystem")]
#[derive(Debug, Clone)]
pub struct FileSystemResolver {
    /// The root directory for template resolution.
    pub root_dir: PathBuf,
    /// Directories tried for includes after the root.
    pub fallback_dirs: Vec<PathBuf>,
}

#[cfg(feature = "filesystem")]
impl FileSystemResolver {
    /// Creates a resolver rooted at `root_dir` with the default
    /// include fallbacks `templets` and `templates`.
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
            fallback_dirs: vec![PathBuf::from("templets"), PathBuf::from("templates")],
        }
    }

    /// Creates a resolver from an engine configuration.
    pub fn from_config(config: &crate::EngineConfig) -> Self {
        Self::new(&config.template_dir).with_fallback_dirs(config.include_fallback_dirs.as_slice())
    }

    /// Replaces the include fallback directories.
    pub fn with_fallback_dirs<P: AsRef<Path>>(mut self, dirs: &[P]) -> Self {
        self.fallback_dirs = dirs.iter().map(|d| d.as_ref().to_path_buf()).collect();
        self
    }

    fn candidate_paths(&self, file: &str) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(self.fallback_dirs.len() + 2);
        paths.push(self.root_dir.join(file));
        for dir in &self.fallback_dirs {
            paths.push(dir.join(file));
        }
        paths.push(PathBuf::from(file));
        paths
    }

    fn try_read_file(path: &Path) -> Result<ResolvedTemplate> {
        if !path.is_file() {
            return Err(TagError::Resolution(format!(
                "File not found: {}",
                path.display()
            )));
        }
        let source = fs::read_to_string(path)?;
        Ok(ResolvedTemplate {
            path: path_to_string(path),
            source,
        })
    }
}

#[cfg(feature = "filesystem")]
impl TemplateResolver for FileSystemResolver {
    fn resolve(&self, name: &str) -> Result<ResolvedTemplate> {
        validate_name(name)?;
        let path = self.root_dir.join(name);
        tracing::debug!(template = %name, path = %path.display(), "resolving template");
        if !path.is_file() {
            return Err(TagError::Resolution(format!(
                "Template '{}' not found in {}",
                name,
                self.root_dir.display()
            )));
        }
        // A present but unreadable file is a hard I/O error.
        let source = fs::read_to_string(&path)?;
        Ok(ResolvedTemplate {
            path: path_to_string(&path),
            source,
        })
    }

    fn resolve_include(&self, file: &str) -> Result<ResolvedTemplate> {
        validate_name(file)?;
        for path in self.candidate_paths(file) {
            if let Ok(resolved) = Self::try_read_file(&path) {
                return Ok(resolved);
            }
        }
        Err(TagError::Resolution(format!(
            "include '{}' not found (tried {})",
            file,
            self.include_candidates(file).join(", ")
        )))
    }

    fn include_candidates(&self, file: &str) -> Vec<String> {
        self.candidate_paths(file).iter().map(path_to_string).collect()
    }

    fn clone_box(&self) -> Box<dyn TemplateResolver> {
        Box::new(self.clone())
    }
}

#[cfg(all(test, feature = "filesystem"))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_resolve_relative_name() {
        let root = TempDir::new().unwrap();
        write(root.path(), "list/index.htm", "<ul></ul>");

        let resolver = FileSystemResolver::new(root.path());
        let resolved = resolver.resolve("list/index.htm").unwrap();
        assert_eq!(resolved.source, "<ul></ul>");
        assert!(resolved.path.ends_with("list/index.htm"));
    }

    #[test]
    fn test_missing_template_is_resolution_error() {
        let root = TempDir::new().unwrap();
        let resolver = FileSystemResolver::new(root.path());
        let err = resolver.resolve("nope.htm").unwrap_err();
        assert!(matches!(err, TagError::Resolution(_)));
    }

    #[test]
    fn test_include_falls_back_in_order() {
        let root = TempDir::new().unwrap();
        let legacy = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        write(legacy.path(), "head.htm", "legacy head");
        write(other.path(), "head.htm", "other head");

        let resolver = FileSystemResolver::new(root.path())
            .with_fallback_dirs(&[legacy.path(), other.path()]);
        let resolved = resolver.resolve_include("head.htm").unwrap();
        assert_eq!(resolved.source, "legacy head");

        write(root.path(), "head.htm", "root head");
        let resolved = resolver.resolve_include("head.htm").unwrap();
        assert_eq!(resolved.source, "root head");
    }

    #[test]
    fn test_include_candidates_order() {
        let resolver = FileSystemResolver::new("tpl").with_fallback_dirs(&["a", "b"]);
        assert_eq!(
            resolver.include_candidates("foot.htm"),
            vec!["tpl/foot.htm", "a/foot.htm", "b/foot.htm", "foot.htm"]
        );
    }

    #[test]
    fn test_rejects_escaping_names() {
        let root = TempDir::new().unwrap();
        let resolver = FileSystemResolver::new(root.path());
        assert!(resolver.resolve_include("../secret.txt").is_err());
        assert!(resolver.resolve_include("/etc/passwd").is_err());
        assert!(resolver.resolve("a/../../b.htm").is_err());
        assert!(validate_name("ok/name.htm").is_ok());
    }
}
