// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Render caching for finished pages.
//!
//! A cached page is stored under `template:{name}` and served for every later
//! render of that name, **whatever context the caller passes**. The key never
//! includes the input data. Only data-invariant templates belong in the
//! cache; route everything else through [`CachePolicy::Never`] or the
//! `cache.exclude` list of the configuration.
//!
//! # Cache Implementations
//!
//! - [`MemoryCache`]: In-memory LRU cache (recommended for most uses)
//! - [`FileSystemCache`]: Persistent disk cache with an LRU layer
//! - [`NoOpCache`]: Never stores anything
//!
//! # Custom Caches
//!
//! Implement the [`RenderCache`] trait to plug in another store
//! (e.g., Redis-backed, distributed, etc.).

use crate::error::{Result, TagError};
use lru::LruCache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Shared pointer to a cached page.
pub type SharedPage = Arc<RenderedPage>;

/// A fully rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Template name the page was rendered from.
    pub name: String,
    /// Final output of both stages.
    pub html: String,
    /// Hash of the output.
    pub hash: u64,
}

impl RenderedPage {
    /// Creates a page, hashing its output.
    pub fn new(name: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let mut hasher = DefaultHasher::new();
        html.hash(&mut hasher);
        Self {
            name: name.into(),
            hash: hasher.finish(),
            html,
        }
    }
}

/// Whether renders of one template may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Cache under the template name (data-independent key).
    #[default]
    ByName,
    /// Always render fresh.
    Never,
}

/// Builds the cache key for a template name.
pub fn cache_key(name: &str) -> String {
    format!("template:{}", name)
}

/// Trait for render caches.
///
/// Implementations must be safe for concurrent get/set; the engine adds no
/// locking of its own around them.
pub trait RenderCache: Send + Sync + std::fmt::Debug {
    /// Retrieves a page from the cache.
    fn get(&self, key: &str) -> Result<Option<SharedPage>>;
    /// Stores a page in the cache.
    fn set(&self, key: &str, page: SharedPage) -> Result<()>;
    /// Removes a page from the cache.
    fn remove(&self, key: &str) -> Result<()>;
    /// Clears all cached pages.
    fn clear(&self) -> Result<()>;
    /// Checks if a key exists in the cache.
    fn contains_key(&self, key: &str) -> bool;
    /// Creates a boxed clone sharing the same storage.
    fn clone_box(&self) -> Box<dyn RenderCache>;
}

impl Clone for Box<dyn RenderCache> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

fn lock_error() -> TagError {
    TagError::Cache("Failed to acquire cache lock".to_string())
}

/// In-memory LRU (Least Recently Used) cache.
///
/// # Examples
///
/// ```rust
/// use cmstags::{MemoryCache, RenderCache, RenderedPage};
/// use std::sync::Arc;
///
/// let cache = MemoryCache::new(100);
/// cache.set("template:index.htm", Arc::new(RenderedPage::new("index.htm", "<p>hi</p>"))).unwrap();
/// assert!(cache.contains_key("template:index.htm"));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryCache {
    cache: Arc<Mutex<LruCache<String, SharedPage>>>,
}

impl MemoryCache {
    /// Creates a new memory cache holding at most `capacity` pages
    /// (a capacity of zero is treated as one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }
}

impl RenderCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<SharedPage>> {
        let mut cache = self.cache.lock().map_err(|_| lock_error())?;
        Ok(cache.get(key).cloned())
    }

    fn set(&self, key: &str, page: SharedPage) -> Result<()> {
        let mut cache = self.cache.lock().map_err(|_| lock_error())?;
        cache.put(key.to_string(), page);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut cache = self.cache.lock().map_err(|_| lock_error())?;
        cache.pop(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut cache = self.cache.lock().map_err(|_| lock_error())?;
        cache.clear();
        Ok(())
    }

    fn contains_key(&self, key: &str) -> bool {
        self.cache
            .lock()
            .map(|cache| cache.contains(key))
            .unwrap_or(false)
    }

    fn clone_box(&self) -> Box<dyn RenderCache> {
        Box::new(Self {
            cache: Arc::clone(&self.cache),
        })
    }
}

/// No-op cache that never stores or retrieves anything.
#[derive(Debug, Clone, Default)]
pub struct NoOpCache;

impl NoOpCache {
    /// Creates a new no-op cache.
    pub fn new() -> Self {
        Self
    }
}

impl RenderCache for NoOpCache {
    fn get(&self, _key: &str) -> Result<Option<SharedPage>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _page: SharedPage) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn contains_key(&self, _key: &str) -> bool {
        false
    }

    fn clone_box(&self) -> Box<dyn RenderCache> {
        Box::new(NoOpCache)
    }
}

/// Persistent filesystem-backed cache with memory layer.
///
/// Each page is written as `{key}.html` next to a `{key}.meta.json` file
/// holding its key, name and hash, with the key percent-encoded in both
/// file names. A file whose recorded key differs is treated as a miss.
#[cfg(feature = "filesystem")]
#[derive(Debug)]
pub struct FileSystemCache {
    cache_dir: std::path::PathBuf,
    memory_cache: MemoryCache,
}

#[cfg(feature = "filesystem")]
impl FileSystemCache {
    /// Creates a new filesystem cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new<P: AsRef<std::path::Path>>(cache_dir: P, memory_capacity: usize) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();

        std::fs::create_dir_all(&cache_dir).map_err(|e| {
            TagError::Cache(format!("Failed to create cache directory: {}", e))
        })?;

        Ok(Self {
            cache_dir,
            memory_cache: MemoryCache::new(memory_capacity),
        })
    }

    /// Percent-encodes `key` into a file stem, so distinct keys never share
    /// a file.
    fn safe_key(key: &str) -> String {
        form_urlencoded::byte_serialize(key.as_bytes())
            .collect::<String>()
            .replace('*', "%2A")
    }

    fn page_file_path(&self, key: &str) -> std::path::PathBuf {
        self.cache_dir.join(format!("{}.html", Self::safe_key(key)))
    }

    fn metadata_file_path(&self, key: &str) -> std::path::PathBuf {
        self.cache_dir.join(format!("{}.meta.json", Self::safe_key(key)))
    }
}

#[cfg(feature = "filesystem")]
impl RenderCache for FileSystemCache {
    fn get(&self, key: &str) -> Result<Option<SharedPage>> {
        if let Some(page) = self.memory_cache.get(key)? {
            return Ok(Some(page));
        }

        let page_file = self.page_file_path(key);
        let metadata_file = self.metadata_file_path(key);
        if !page_file.exists() || !metadata_file.exists() {
            return Ok(None);
        }

        let html = std::fs::read_to_string(&page_file)
            .map_err(|e| TagError::Cache(format!("Failed to read cache file: {}", e)))?;
        let metadata_str = std::fs::read_to_string(&metadata_file)
            .map_err(|e| TagError::Cache(format!("Failed to read metadata file: {}", e)))?;
        let metadata: serde_json::Value = serde_json::from_str(&metadata_str)
            .map_err(|e| TagError::Cache(format!("Failed to parse metadata: {}", e)))?;

        if metadata["key"].as_str() != Some(key) {
            return Ok(None);
        }
        let name = metadata["name"].as_str().unwrap_or(key).to_string();
        let page = Arc::new(RenderedPage::new(name, html));

        self.memory_cache.set(key, page.clone())?;
        Ok(Some(page))
    }

    fn set(&self, key: &str, page: SharedPage) -> Result<()> {
        self.memory_cache.set(key, page.clone())?;

        std::fs::write(self.page_file_path(key), &page.html)
            .map_err(|e| TagError::Cache(format!("Failed to write cache file: {}", e)))?;

        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let metadata = serde_json::json!({
            "key": key,
            "name": page.name,
            "hash": page.hash,
            "created_at": created_at,
        });
        std::fs::write(self.metadata_file_path(key), metadata.to_string())
            .map_err(|e| TagError::Cache(format!("Failed to write metadata file: {}", e)))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.memory_cache.remove(key)?;

        for path in [self.page_file_path(key), self.metadata_file_path(key)] {
            if path.exists() {
                std::fs::remove_file(&path).map_err(|e| {
                    TagError::Cache(format!("Failed to remove cache file: {}", e))
                })?;
            }
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.memory_cache.clear()?;

        let entries = std::fs::read_dir(&self.cache_dir).map_err(|e| {
            TagError::Cache(format!("Failed to read cache directory: {}", e))
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                TagError::Cache(format!("Failed to read directory entry: {}", e))
            })?;
            let path = entry.path();
            let ours = path
                .extension()
                .map(|ext| ext == "html" || ext == "json")
                .unwrap_or(false);
            if path.is_file() && ours {
                std::fs::remove_file(&path)
                    .map_err(|e| TagError::Cache(format!("Failed to remove file: {}", e)))?;
            }
        }
        Ok(())
    }

    fn contains_key(&self, key: &str) -> bool {
        self.memory_cache.contains_key(key)
            || (self.page_file_path(key).exists() && self.metadata_file_path(key).exists())
    }

    fn clone_box(&self) -> Box<dyn RenderCache> {
        Box::new(Self {
            cache_dir: self.cache_dir.clone(),
            memory_cache: self.memory_cache.clone(),
        })
    }
}
