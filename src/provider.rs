//! Typed configuration resolution.
//!
//! [`ConfigurationProvider`] turns a requested type into a configuration
//! object:
//!
//! 1. A cached object for the type is returned as-is.
//! 2. Otherwise factories are scanned in registration order. For each factory
//!    supporting the type:
//!    - if the type's named specification exists, it is loaded and parsed by
//!      this factory, and the outcome is final;
//!    - else if the factory has a default, the default is used;
//!    - else scanning continues with the next factory.
//! 3. If nothing produced a configuration, resolution fails with
//!    [`ConfigError::ConfigurationNotFound`].
//!
//! Successful results are cached by type for the lifetime of the provider.
//! Failures are never cached.
//!
//! The factory registry is guarded by a reentrant lock: a factory may resolve
//! nested configurations through the same provider while it is being called.

use std::sync::{Arc, OnceLock};

use parking_lot::ReentrantMutex;

use crate::builder::ProviderBuilder;
use crate::cache::{Cache, UnlimitedCache};
use crate::error::ConfigError;
use crate::factory::{
    AnyConfiguration, Configuration, ConfigurationFactory, ConfigurationType, Context,
};
use crate::loader::SpecificationProvider;
use crate::spec::Specification;

static GLOBAL: OnceLock<ConfigurationProvider> = OnceLock::new();

pub struct ConfigurationProvider {
    factories: ReentrantMutex<Vec<Box<dyn ConfigurationFactory>>>,
    specifications: Arc<SpecificationProvider>,
    cache: Arc<dyn Cache<ConfigurationType, AnyConfiguration>>,
}

impl ConfigurationProvider {
    pub fn builder() -> ProviderBuilder {
        ProviderBuilder::new()
    }

    /// A provider over `factories` backed by an [`UnlimitedCache`].
    pub fn new(
        factories: Vec<Box<dyn ConfigurationFactory>>,
        specifications: Arc<SpecificationProvider>,
    ) -> Self {
        let cache: Arc<dyn Cache<ConfigurationType, AnyConfiguration>> =
            Arc::new(UnlimitedCache::new());
        ConfigurationProvider::with_cache(factories, specifications, cache)
    }

    pub fn with_cache(
        factories: Vec<Box<dyn ConfigurationFactory>>,
        specifications: Arc<SpecificationProvider>,
        cache: Arc<dyn Cache<ConfigurationType, AnyConfiguration>>,
    ) -> Self {
        ConfigurationProvider {
            factories: ReentrantMutex::new(factories),
            specifications,
            cache,
        }
    }

    /// The process-wide provider.
    ///
    /// Unless [`install_global`](Self::install_global) ran first, this builds a
    /// provider with the default file loaders and no factories.
    ///
    /// # Panics
    ///
    /// Panics if the default provider cannot be initialized (e.g. the
    /// configuration directory does not exist).
    pub fn global() -> &'static ConfigurationProvider {
        GLOBAL.get_or_init(|| match ProviderBuilder::new().default_loaders() {
            Ok(builder) => builder.build(),
            Err(e) => panic!("failed to initialize the global configuration provider: {e}"),
        })
    }

    /// Install `provider` as the process-wide provider.
    ///
    /// Returns the provider back if a global provider already exists.
    pub fn install_global(
        provider: ConfigurationProvider,
    ) -> Result<&'static ConfigurationProvider, ConfigurationProvider> {
        GLOBAL.set(provider)?;
        Ok(ConfigurationProvider::global())
    }

    pub fn specifications(&self) -> &Arc<SpecificationProvider> {
        &self.specifications
    }

    /// True if `T` is cached, or the first factory supporting `T` has a
    /// default or finds `T`'s named specification.
    pub fn has_configuration<T: Configuration>(&self) -> bool {
        self.has_configuration_type(&ConfigurationType::of::<T>())
    }

    pub fn has_configuration_type(&self, configuration_type: &ConfigurationType) -> bool {
        if self.cache.has(configuration_type) {
            return true;
        }
        let factories = self.factories.lock();
        match factories
            .iter()
            .find(|factory| factory.supports_configuration(configuration_type))
        {
            Some(factory) => {
                factory.supports_default_configuration(configuration_type)
                    || self
                        .specifications
                        .has_specification(&configuration_type.specification_name())
            }
            None => false,
        }
    }

    pub fn get_configuration<T: Configuration>(&self) -> Result<Arc<T>, ConfigError> {
        let configuration_type = ConfigurationType::of::<T>();
        let configuration = self.get_configuration_dyn(&configuration_type, None)?;
        downcast(configuration, &configuration_type)
    }

    /// Resolve `T`, passing `context` to the factory if it has to be created.
    pub fn get_configuration_with_context<T: Configuration>(
        &self,
        context: &Context,
    ) -> Result<Arc<T>, ConfigError> {
        let configuration_type = ConfigurationType::of::<T>();
        let configuration = self.get_configuration_dyn(&configuration_type, Some(context))?;
        downcast(configuration, &configuration_type)
    }

    /// Type-erased resolution; see the module docs for the algorithm.
    pub fn get_configuration_dyn(
        &self,
        configuration_type: &ConfigurationType,
        context: Option<&Context>,
    ) -> Result<AnyConfiguration, ConfigError> {
        if let Some(configuration) = self.cache.get(configuration_type) {
            tracing::debug!(%configuration_type, "configuration cache hit");
            return Ok(configuration);
        }

        let factories = self.factories.lock();
        if let Some(configuration) = self.cache.get(configuration_type) {
            tracing::debug!(%configuration_type, "configuration cache hit");
            return Ok(configuration);
        }
        tracing::debug!(%configuration_type, "configuration cache miss");

        let name = configuration_type.specification_name();
        for factory in factories
            .iter()
            .filter(|factory| factory.supports_configuration(configuration_type))
        {
            if self.specifications.has_specification(&name) {
                let specification = self.specifications.get_specification(&name)?;
                let configuration =
                    factory.create_configuration(&specification, configuration_type, context)?;
                self.cache.put(*configuration_type, Arc::clone(&configuration));
                return Ok(configuration);
            }
            if factory.supports_default_configuration(configuration_type) {
                tracing::debug!(%configuration_type, "using default configuration");
                let configuration = factory.create_default_configuration(configuration_type)?;
                self.cache.put(*configuration_type, Arc::clone(&configuration));
                return Ok(configuration);
            }
        }

        tracing::debug!(%configuration_type, "no configuration found");
        Err(ConfigError::ConfigurationNotFound {
            configuration_type: *configuration_type,
        })
    }

    /// Parse `specification` directly with the first factory supporting `T`.
    /// Nothing is looked up or cached.
    pub fn parse_configuration<T: Configuration>(
        &self,
        specification: &Specification,
    ) -> Result<Arc<T>, ConfigError> {
        let configuration_type = ConfigurationType::of::<T>();
        let configuration = self.parse_configuration_dyn(specification, &configuration_type, None)?;
        downcast(configuration, &configuration_type)
    }

    pub fn parse_configuration_with_context<T: Configuration>(
        &self,
        specification: &Specification,
        context: &Context,
    ) -> Result<Arc<T>, ConfigError> {
        let configuration_type = ConfigurationType::of::<T>();
        let configuration =
            self.parse_configuration_dyn(specification, &configuration_type, Some(context))?;
        downcast(configuration, &configuration_type)
    }

    pub fn parse_configuration_dyn(
        &self,
        specification: &Specification,
        configuration_type: &ConfigurationType,
        context: Option<&Context>,
    ) -> Result<AnyConfiguration, ConfigError> {
        let factories = self.factories.lock();
        match factories
            .iter()
            .find(|factory| factory.supports_configuration(configuration_type))
        {
            Some(factory) => {
                factory.create_configuration(specification, configuration_type, context)
            }
            None => Err(ConfigError::ConfigurationNotFound {
                configuration_type: *configuration_type,
            }),
        }
    }

    /// Look up a configuration type by its type name or specification name
    /// among the types advertised by registered factories.
    pub fn configuration_type(&self, name: &str) -> Option<ConfigurationType> {
        let factories = self.factories.lock();
        factories
            .iter()
            .flat_map(|factory| factory.configuration_types())
            .find(|configuration_type| configuration_type.matches_name(name))
    }
}

fn downcast<T: Configuration>(
    configuration: AnyConfiguration,
    configuration_type: &ConfigurationType,
) -> Result<Arc<T>, ConfigError> {
    configuration.downcast::<T>().map_err(|_| {
        ConfigError::InvalidArgument(format!(
            "factory for {configuration_type} produced a value of another type"
        ))
    })
}
