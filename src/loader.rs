//! Named specification lookup.
//!
//! A [`SpecificationLoader`] supplies specifications from one physical
//! source: files, embedded defaults, another format. The
//! [`SpecificationProvider`] scans its loaders in registration order and
//! memoizes every specification it loads.
//!
//! The first loader that reports a name is authoritative. Its result is
//! returned as-is, including failures; later loaders are never tried for that
//! name.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{Cache, UnlimitedCache};
use crate::error::ConfigError;
use crate::spec::Specification;

/// A source of named specifications.
pub trait SpecificationLoader: Send + Sync {
    fn has_specification(&self, name: &str) -> bool;

    /// Load the named specification.
    ///
    /// Fails with [`ConfigError::SpecificationNotFound`] if the name vanished
    /// since `has_specification`, [`ConfigError::Io`] on read failure, and
    /// [`ConfigError::SpecificationFormat`] if the source does not parse.
    fn load_specification(&self, name: &str) -> Result<Specification, ConfigError>;
}

/// Specifications held in memory, e.g. defaults compiled into the binary.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    specifications: HashMap<String, Specification>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        MemoryLoader::default()
    }

    pub fn with(mut self, name: impl Into<String>, specification: Specification) -> Self {
        self.specifications.insert(name.into(), specification);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, specification: Specification) {
        self.specifications.insert(name.into(), specification);
    }
}

impl SpecificationLoader for MemoryLoader {
    fn has_specification(&self, name: &str) -> bool {
        self.specifications.contains_key(name)
    }

    fn load_specification(&self, name: &str) -> Result<Specification, ConfigError> {
        self.specifications
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::SpecificationNotFound { name: name.into() })
    }
}

/// Resolves specifications by name through registered loaders, with a cache.
pub struct SpecificationProvider {
    loaders: Mutex<Vec<Box<dyn SpecificationLoader>>>,
    cache: Arc<dyn Cache<String, Specification>>,
}

impl SpecificationProvider {
    /// A provider over `loaders` backed by an [`UnlimitedCache`].
    pub fn new(loaders: Vec<Box<dyn SpecificationLoader>>) -> Self {
        SpecificationProvider::with_cache(loaders, Arc::new(UnlimitedCache::new()))
    }

    pub fn with_cache(
        loaders: Vec<Box<dyn SpecificationLoader>>,
        cache: Arc<dyn Cache<String, Specification>>,
    ) -> Self {
        SpecificationProvider {
            loaders: Mutex::new(loaders),
            cache,
        }
    }

    /// True if the name is cached or any loader has it.
    pub fn has_specification(&self, name: &str) -> bool {
        if self.cache.has(&name.to_string()) {
            return true;
        }
        self.loaders
            .lock()
            .iter()
            .any(|loader| loader.has_specification(name))
    }

    /// Return the cached specification, or load it through the first loader
    /// that has it.
    ///
    /// Each name is loaded at most once: misses are serialized and re-check the
    /// cache before loading.
    pub fn get_specification(&self, name: &str) -> Result<Specification, ConfigError> {
        let key = name.to_string();
        if let Some(specification) = self.cache.get(&key) {
            tracing::debug!(name, "specification cache hit");
            return Ok(specification);
        }

        let loaders = self.loaders.lock();
        if let Some(specification) = self.cache.get(&key) {
            tracing::debug!(name, "specification cache hit");
            return Ok(specification);
        }
        tracing::debug!(name, "specification cache miss");

        let Some(loader) = loaders.iter().find(|loader| loader.has_specification(name)) else {
            tracing::debug!(name, "specification not found");
            return Err(ConfigError::SpecificationNotFound { name: key });
        };
        tracing::debug!(name, "loading specification");
        let specification = loader.load_specification(name)?;
        self.cache.put(key, specification.clone());
        Ok(specification)
    }
}
