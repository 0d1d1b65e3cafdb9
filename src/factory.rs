//! Configuration types and the factories that build them.
//!
//! A [`ConfigurationFactory`] answers four questions for a requested
//! [`ConfigurationType`]: does it support the type, can it parse a
//! [`Specification`] into it, does it have a default, and what is that default.
//! Factories are registered with a [`ConfigurationProvider`](crate::ConfigurationProvider)
//! and scanned in registration order.
//!
//! Most factories bind exactly one type. [`SingleTypeFactory`] covers that
//! case from a parse function and an optional precomputed default;
//! [`ContextAwareFactory`] additionally threads a caller-supplied context
//! value into parsing.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::ConfigError;
use crate::spec::Specification;

/// Anything that can be produced by a factory and shared across threads.
pub trait Configuration: Any + Send + Sync {}

impl<T: Any + Send + Sync> Configuration for T {}

/// A type-erased configuration as stored by the provider cache.
pub type AnyConfiguration = Arc<dyn Any + Send + Sync>;

/// A caller-supplied parsing context.
pub type Context = dyn Any + Send + Sync;

/// Identity of a configuration type.
///
/// Equality and hashing use the type's [`TypeId`]; the name is for display and
/// for deriving the specification name.
#[derive(Clone, Copy)]
pub struct ConfigurationType {
    id: TypeId,
    name: &'static str,
}

impl ConfigurationType {
    pub fn of<T: Configuration>() -> Self {
        ConfigurationType {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name, e.g. `my_app::config::DatabaseConfig`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name of the specification holding this type's settings.
    ///
    /// The fully qualified type path with `::` replaced by `.`, e.g.
    /// `my_app.config.DatabaseConfig`, which is also a portable file stem.
    pub fn specification_name(&self) -> String {
        self.name.replace("::", ".")
    }

    pub fn is<T: Configuration>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// True if `name` is this type's name or specification name.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name == name || self.specification_name() == name
    }
}

impl PartialEq for ConfigurationType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConfigurationType {}

impl Hash for ConfigurationType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ConfigurationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConfigurationType").field(&self.name).finish()
    }
}

impl fmt::Display for ConfigurationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Builds configuration objects of the types it supports.
///
/// The four operations must agree: a factory that reports support for a type
/// must not refuse it later. Calling `create_*` for an unsupported type is a
/// programming error and yields [`ConfigError::InvalidArgument`].
pub trait ConfigurationFactory: Send + Sync {
    fn supports_configuration(&self, configuration_type: &ConfigurationType) -> bool;

    /// Parse `specification` into a configuration. `context` is `None` unless
    /// the caller resolved with a context; factories that do not use one
    /// ignore it.
    fn create_configuration(
        &self,
        specification: &Specification,
        configuration_type: &ConfigurationType,
        context: Option<&Context>,
    ) -> Result<AnyConfiguration, ConfigError>;

    fn supports_default_configuration(&self, configuration_type: &ConfigurationType) -> bool;

    fn create_default_configuration(
        &self,
        configuration_type: &ConfigurationType,
    ) -> Result<AnyConfiguration, ConfigError>;

    /// Types this factory advertises for lookup by name.
    fn configuration_types(&self) -> Vec<ConfigurationType> {
        Vec::new()
    }
}

/// The bound type and optional default shared by the single-type factories.
pub(crate) struct Binding<T> {
    pub(crate) default: Option<Arc<T>>,
}

impl<T: Configuration> Binding<T> {
    pub(crate) fn configuration_type(&self) -> ConfigurationType {
        ConfigurationType::of::<T>()
    }

    pub(crate) fn require(&self, requested: &ConfigurationType) -> Result<(), ConfigError> {
        if requested.is::<T>() {
            Ok(())
        } else {
            Err(ConfigError::InvalidArgument(format!(
                "factory for {} asked to create {requested}",
                self.configuration_type()
            )))
        }
    }

    pub(crate) fn default_configuration(
        &self,
        requested: &ConfigurationType,
    ) -> Result<AnyConfiguration, ConfigError> {
        self.require(requested)?;
        match &self.default {
            Some(default) => Ok(Arc::clone(default) as AnyConfiguration),
            None => Err(ConfigError::ConfigurationNotFound {
                configuration_type: *requested,
            }),
        }
    }
}

type ParseFn<T> = dyn Fn(&Specification) -> Result<T, ConfigError> + Send + Sync;

/// A factory bound to exactly one configuration type.
///
/// ```ignore
/// let factory = SingleTypeFactory::new(|spec| {
///     Ok(DatabaseConfig {
///         url: values::parse_string(spec, ["url"])?,
///     })
/// })
/// .with_default(DatabaseConfig::default());
/// ```
pub struct SingleTypeFactory<T: Configuration> {
    parse: Box<ParseFn<T>>,
    binding: Binding<T>,
}

impl<T: Configuration> SingleTypeFactory<T> {
    pub fn new<F>(parse: F) -> Self
    where
        F: Fn(&Specification) -> Result<T, ConfigError> + Send + Sync + 'static,
    {
        SingleTypeFactory {
            parse: Box::new(parse),
            binding: Binding { default: None },
        }
    }

    /// Supply the configuration used when no specification exists.
    pub fn with_default(mut self, default: T) -> Self {
        self.binding.default = Some(Arc::new(default));
        self
    }

    pub fn configuration_type(&self) -> ConfigurationType {
        self.binding.configuration_type()
    }

    /// Parse without going through the type-erased trait interface.
    pub fn parse(&self, specification: &Specification) -> Result<T, ConfigError> {
        (self.parse)(specification)
    }
}

impl<T: Configuration> ConfigurationFactory for SingleTypeFactory<T> {
    fn supports_configuration(&self, configuration_type: &ConfigurationType) -> bool {
        configuration_type.is::<T>()
    }

    fn create_configuration(
        &self,
        specification: &Specification,
        configuration_type: &ConfigurationType,
        _context: Option<&Context>,
    ) -> Result<AnyConfiguration, ConfigError> {
        self.binding.require(configuration_type)?;
        let configuration = self.parse(specification)?;
        Ok(Arc::new(configuration))
    }

    fn supports_default_configuration(&self, configuration_type: &ConfigurationType) -> bool {
        configuration_type.is::<T>() && self.binding.default.is_some()
    }

    fn create_default_configuration(
        &self,
        configuration_type: &ConfigurationType,
    ) -> Result<AnyConfiguration, ConfigError> {
        self.binding.default_configuration(configuration_type)
    }

    fn configuration_types(&self) -> Vec<ConfigurationType> {
        vec![self.configuration_type()]
    }
}

type ContextParseFn<T, C> = dyn Fn(&Specification, &C) -> Result<T, ConfigError> + Send + Sync;
type ContextSupplier<C> = dyn Fn() -> C + Send + Sync;

/// A single-type factory whose parsing takes a context of type `C`.
///
/// A context passed by the caller must be a `C`; anything else is an
/// argument error. Without a caller context the configured default-context
/// supplier is used.
pub struct ContextAwareFactory<T: Configuration, C: 'static> {
    parse: Box<ContextParseFn<T, C>>,
    default_context: Option<Box<ContextSupplier<C>>>,
    binding: Binding<T>,
}

impl<T: Configuration, C: 'static> ContextAwareFactory<T, C> {
    pub fn new<F>(parse: F) -> Self
    where
        F: Fn(&Specification, &C) -> Result<T, ConfigError> + Send + Sync + 'static,
    {
        ContextAwareFactory {
            parse: Box::new(parse),
            default_context: None,
            binding: Binding { default: None },
        }
    }

    pub fn with_default(mut self, default: T) -> Self {
        self.binding.default = Some(Arc::new(default));
        self
    }

    /// Supplier for the context used when the caller passes none.
    pub fn with_default_context<S>(mut self, supplier: S) -> Self
    where
        S: Fn() -> C + Send + Sync + 'static,
    {
        self.default_context = Some(Box::new(supplier));
        self
    }

    pub fn configuration_type(&self) -> ConfigurationType {
        self.binding.configuration_type()
    }

    fn parse_with(
        &self,
        specification: &Specification,
        context: Option<&Context>,
    ) -> Result<T, ConfigError> {
        match context {
            Some(context) => {
                let context = context.downcast_ref::<C>().ok_or_else(|| {
                    ConfigError::InvalidArgument(format!(
                        "invalid context type for {}: expected {}",
                        self.configuration_type(),
                        std::any::type_name::<C>()
                    ))
                })?;
                (self.parse)(specification, context)
            }
            None => match &self.default_context {
                Some(supplier) => (self.parse)(specification, &supplier()),
                None => Err(ConfigError::InvalidArgument(format!(
                    "no context given for {} and no default context configured",
                    self.configuration_type()
                ))),
            },
        }
    }
}

impl<T: Configuration, C: 'static> ConfigurationFactory for ContextAwareFactory<T, C> {
    fn supports_configuration(&self, configuration_type: &ConfigurationType) -> bool {
        configuration_type.is::<T>()
    }

    fn create_configuration(
        &self,
        specification: &Specification,
        configuration_type: &ConfigurationType,
        context: Option<&Context>,
    ) -> Result<AnyConfiguration, ConfigError> {
        self.binding.require(configuration_type)?;
        let configuration = self.parse_with(specification, context)?;
        Ok(Arc::new(configuration))
    }

    fn supports_default_configuration(&self, configuration_type: &ConfigurationType) -> bool {
        configuration_type.is::<T>() && self.binding.default.is_some()
    }

    fn create_default_configuration(
        &self,
        configuration_type: &ConfigurationType,
    ) -> Result<AnyConfiguration, ConfigError> {
        self.binding.default_configuration(configuration_type)
    }

    fn configuration_types(&self) -> Vec<ConfigurationType> {
        vec![self.configuration_type()]
    }
}
