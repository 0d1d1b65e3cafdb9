//! Typed configuration objects resolved from named, path-addressed
//! specifications. Register factories for your types, point at your files,
//! and ask for a type.
//!
//! ```ignore
//! let provider = ConfigurationProvider::builder()
//!     .default_loaders()?
//!     .factory(ConfiqueFactory::<DatabaseConfig>::new())
//!     .build();
//! let db: Arc<DatabaseConfig> = provider.get_configuration()?;
//! ```
//!
//! That call derives the specification name `my_app.config.DatabaseConfig`
//! from the type, looks for `my_app.config.DatabaseConfig.json`, `.toml` or
//! `.properties` in the configuration directory, parses the first one found,
//! and caches the resulting object for every later call.
//!
//! # Model
//!
//! - A [`Field`] is a path such as `database.pool.size`.
//! - A [`Setting`] pairs a field with a [`Value`].
//! - A [`Specification`] is an immutable, ordered set of settings with unique
//!   fields. Nested documents are flattened on the way in, so `{"a": {"b": 1}}`
//!   holds one setting `a.b = 1`. Prefix queries
//!   ([`settings`](Specification::settings),
//!   [`defined`](Specification::defined),
//!   [`children`](Specification::children)) walk the hierarchy.
//! - A configuration is any `Send + Sync + 'static` type. It is identified by a
//!   [`ConfigurationType`], whose [`specification
//!   name`](ConfigurationType::specification_name) is the fully qualified type
//!   path with `::` replaced by `.`.
//!
//! # Two providers
//!
//! [`SpecificationProvider`] resolves specifications by name. It scans its
//! [`SpecificationLoader`]s in registration order; the first loader that has
//! the name is authoritative, even when loading fails. Loaded specifications
//! are cached.
//!
//! [`ConfigurationProvider`] resolves configurations by type. It scans its
//! [`ConfigurationFactory`]s in registration order. The first factory
//! supporting the type parses the named specification if one exists; a
//! factory without a specification falls back to its default, and a factory
//! with neither is skipped. Results are cached by type; failures are not.
//!
//! Both providers are safe to share between threads. Each name and each type
//! is loaded at most once.
//!
//! # Factories
//!
//! - [`SingleTypeFactory`] wraps a parse function and an optional default.
//! - [`ContextAwareFactory`] also receives a caller-supplied context value.
//! - [`ConfiqueFactory`] maps settings onto a `confique` config struct, with
//!   `#[config(default)]` values, required-field checks and strict rejection
//!   of unknown settings.
//!
//! Parse functions read settings through the helpers in [`values`]:
//! strings, base-10 integers, `"true"`/`"false"` booleans, delimited lists and
//! sets, nested specifications, and nested configurations described by a
//! `type` and a `settings` sub-field.
//!
//! # Loaders
//!
//! - [`FileLoader`] reads `{dir}/{name}.json`, `.toml` or `.properties`.
//!   [`ProviderBuilder::default_loaders`] registers all three over
//!   [`config_dir`], which is `$CONFIG_DIR` or the working directory.
//! - [`MemoryLoader`] serves specifications built in code, e.g. embedded
//!   defaults via [`Specification::from_serialize`].
//!
//! Implement [`SpecificationLoader`] for any other source.
//!
//! # Error handling
//!
//! All fallible operations return [`ConfigError`]. Missing fields, malformed
//! values and unknown settings carry the specification they were found in;
//! see the [`error`] module for the full set. Enable the `rich-errors`
//! feature for `miette` diagnostics.
//!
//! # Logging
//!
//! Cache hits and misses, loader selection and default fallbacks are emitted
//! as `tracing` debug events. The crate installs no subscriber.

pub mod error;
pub mod types;
pub mod values;

mod builder;
mod cache;
mod factory;
mod field;
mod file;
mod loader;
pub mod properties;
mod provider;
mod spec;
mod typed;

#[cfg(test)]
mod fixtures;

pub use builder::ProviderBuilder;
pub use cache::{Cache, UnlimitedCache};
pub use error::{BoxError, ConfigError};
pub use factory::{
    AnyConfiguration, Configuration, ConfigurationFactory, ConfigurationType,
    ContextAwareFactory, Context, SingleTypeFactory,
};
pub use field::Field;
pub use file::{CONFIG_DIR_VAR, FileLoader, config_dir, parse_document, resolve_search_path};
pub use loader::{MemoryLoader, SpecificationLoader, SpecificationProvider};
pub use provider::ConfigurationProvider;
pub use serde_json::Value;
pub use spec::{Setting, Specification, normalize};
pub use typed::ConfiqueFactory;
pub use types::{Format, SearchPath};
