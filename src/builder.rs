use std::sync::Arc;

use crate::cache::Cache;
use crate::error::ConfigError;
use crate::factory::{AnyConfiguration, ConfigurationFactory, ConfigurationType};
use crate::file::{self, FileLoader};
use crate::loader::{SpecificationLoader, SpecificationProvider};
use crate::provider::ConfigurationProvider;
use crate::spec::Specification;
use crate::types::{Format, SearchPath};

/// Builder assembling a [`ConfigurationProvider`].
///
/// Loaders and factories are consulted in the order they are added. Caches
/// default to [`UnlimitedCache`](crate::UnlimitedCache).
///
/// ```ignore
/// let provider = ConfigurationProvider::builder()
///     .default_loaders()?
///     .loader(MemoryLoader::new().with("my_app.Defaults", defaults))
///     .factory(database_factory())
///     .build();
/// ```
#[derive(Default)]
pub struct ProviderBuilder {
    loaders: Vec<Box<dyn SpecificationLoader>>,
    factories: Vec<Box<dyn ConfigurationFactory>>,
    specification_cache: Option<Arc<dyn Cache<String, Specification>>>,
    configuration_cache: Option<Arc<dyn Cache<ConfigurationType, AnyConfiguration>>>,
    specifications: Option<Arc<SpecificationProvider>>,
}

impl ProviderBuilder {
    pub fn new() -> Self {
        ProviderBuilder::default()
    }

    /// Append a specification loader.
    pub fn loader(mut self, loader: impl SpecificationLoader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    /// Append a configuration factory.
    pub fn factory(mut self, factory: impl ConfigurationFactory + 'static) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    /// Append JSON, TOML and properties loaders over [`file::config_dir`].
    pub fn default_loaders(self) -> Result<Self, ConfigError> {
        let dir = file::config_dir()?;
        self.directory_loaders(&dir)
    }

    /// Append one loader per format over `dir`, in [`Format::ALL`] order.
    pub fn directory_loaders(mut self, dir: &std::path::Path) -> Result<Self, ConfigError> {
        for format in Format::ALL {
            self.loaders.push(Box::new(FileLoader::new(dir, format)?));
        }
        Ok(self)
    }

    /// Append a file loader for `search_path`. `app_name` is used by
    /// [`SearchPath::Platform`].
    pub fn file_loader(
        mut self,
        search_path: SearchPath,
        app_name: &str,
        format: Format,
    ) -> Result<Self, ConfigError> {
        let loader = FileLoader::from_search_path(&search_path, app_name, format)?;
        self.loaders.push(Box::new(loader));
        Ok(self)
    }

    pub fn specification_cache(mut self, cache: Arc<dyn Cache<String, Specification>>) -> Self {
        self.specification_cache = Some(cache);
        self
    }

    pub fn configuration_cache(
        mut self,
        cache: Arc<dyn Cache<ConfigurationType, AnyConfiguration>>,
    ) -> Self {
        self.configuration_cache = Some(cache);
        self
    }

    /// Share an existing specification provider instead of building one.
    ///
    /// Loaders and the specification cache set on this builder are then
    /// ignored.
    pub fn specification_provider(mut self, specifications: Arc<SpecificationProvider>) -> Self {
        self.specifications = Some(specifications);
        self
    }

    /// Build only the specification layer.
    pub fn build_specifications(self) -> SpecificationProvider {
        match self.specification_cache {
            Some(cache) => SpecificationProvider::with_cache(self.loaders, cache),
            None => SpecificationProvider::new(self.loaders),
        }
    }

    pub fn build(mut self) -> ConfigurationProvider {
        let factories = std::mem::take(&mut self.factories);
        let configuration_cache = self.configuration_cache.take();
        let specifications = match self.specifications.take() {
            Some(specifications) => specifications,
            None => Arc::new(self.build_specifications()),
        };
        match configuration_cache {
            Some(cache) => ConfigurationProvider::with_cache(factories, specifications, cache),
            None => ConfigurationProvider::new(factories, specifications),
        }
    }
}
