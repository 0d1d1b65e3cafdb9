//! Factories for [`confique::Config`] structs.
//!
//! A [`ConfiqueFactory`] turns a specification into a `confique` config
//! struct:
//!
//! 1. Settings are unflattened into a nested TOML table (`database.url`
//!    becomes `[database] url = ...`). `null` values are treated as absent.
//! 2. The table is deserialized into `C::Layer` (all fields optional). In
//!    strict mode, settings the layer does not consume are rejected with
//!    [`ConfigError::UnknownSettings`].
//! 3. `confique` fills `#[config(default = ...)]` values and checks that
//!    every required field is present.
//!
//! The factory has a default configuration exactly when every field of `C`
//! has a default (or is an `Option`), i.e. when `C::builder().load()` succeeds
//! with no sources.
//!
//! # String coercion
//!
//! Properties files yield only strings. With
//! [`coerce_strings(true)`](ConfiqueFactory::coerce_strings) string values are
//! parsed heuristically: `true`/`false` → bool, then integer, then float, then
//! string. A string field whose value looks like a number is then rejected;
//! use `#[config(deserialize_with = ...)]` on such fields.

use std::sync::Arc;

use confique::Config;
use serde::Deserialize;
use serde_json::Value;
use toml::Table;

use crate::error::{BoxError, ConfigError};
use crate::factory::{
    AnyConfiguration, Binding, Configuration, ConfigurationFactory, ConfigurationType, Context,
};
use crate::field::Field;
use crate::spec::Specification;

pub struct ConfiqueFactory<C: Config + Configuration> {
    binding: Binding<C>,
    strict: bool,
    coerce_strings: bool,
}

impl<C> ConfiqueFactory<C>
where
    C: Config + Configuration,
    C::Layer: for<'de> Deserialize<'de>,
{
    /// Strict mode on, string coercion off.
    pub fn new() -> Self {
        let default = match C::builder().load() {
            Ok(default) => Some(Arc::new(default)),
            Err(e) => {
                tracing::debug!(
                    configuration_type = std::any::type_name::<C>(),
                    reason = %e,
                    "no default configuration"
                );
                None
            }
        };
        ConfiqueFactory {
            binding: Binding { default },
            strict: true,
            coerce_strings: false,
        }
    }

    /// Enable or disable strict mode (default: `true`).
    /// In strict mode, settings that match no field are errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Parse string values into booleans and numbers before deserializing
    /// (default: `false`).
    pub fn coerce_strings(mut self, coerce: bool) -> Self {
        self.coerce_strings = coerce;
        self
    }

    pub fn configuration_type(&self) -> ConfigurationType {
        self.binding.configuration_type()
    }

    pub fn parse(&self, specification: &Specification) -> Result<C, ConfigError> {
        let table = unflatten(specification, self.coerce_strings)?;
        let layer = if self.strict {
            self.deserialize_strict(specification, table)?
        } else {
            toml::Value::Table(table)
                .try_into::<C::Layer>()
                .map_err(|e| invalid_specification(specification, e))?
        };

        C::builder()
            .preloaded(layer)
            .load()
            .map_err(|e| invalid_specification(specification, e))
    }

    fn deserialize_strict(
        &self,
        specification: &Specification,
        table: Table,
    ) -> Result<C::Layer, ConfigError> {
        let mut unknown: Vec<Field> = Vec::new();
        let layer: C::Layer = serde_ignored::deserialize(toml::Value::Table(table), |path| {
            let path = path.to_string();
            unknown.push(Field::parse(&path).unwrap_or_else(|| Field::new([path])));
        })
        .map_err(|e| invalid_specification(specification, e))?;

        if unknown.is_empty() {
            Ok(layer)
        } else {
            Err(ConfigError::UnknownSettings {
                specification: specification.clone(),
                fields: unknown,
            })
        }
    }
}

impl<C> Default for ConfiqueFactory<C>
where
    C: Config + Configuration,
    C::Layer: for<'de> Deserialize<'de>,
{
    fn default() -> Self {
        ConfiqueFactory::new()
    }
}

impl<C> ConfigurationFactory for ConfiqueFactory<C>
where
    C: Config + Configuration,
    C::Layer: for<'de> Deserialize<'de>,
{
    fn supports_configuration(&self, configuration_type: &ConfigurationType) -> bool {
        configuration_type.is::<C>()
    }

    fn create_configuration(
        &self,
        specification: &Specification,
        configuration_type: &ConfigurationType,
        _context: Option<&Context>,
    ) -> Result<AnyConfiguration, ConfigError> {
        self.binding.require(configuration_type)?;
        Ok(Arc::new(self.parse(specification)?))
    }

    fn supports_default_configuration(&self, configuration_type: &ConfigurationType) -> bool {
        configuration_type.is::<C>() && self.binding.default.is_some()
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

fn invalid_specification(
    specification: &Specification,
    source: impl Into<BoxError>,
) -> ConfigError {
    let source = source.into();
    ConfigError::InvalidSpecification {
        specification: specification.clone(),
        reason: source.to_string(),
        source: Some(source),
    }
}

/// Expand dotted fields into nested tables.
///
/// Fails if one setting's field runs through another setting's value, e.g.
/// both `database = 1` and `database.url = "pg://"`.
fn unflatten(specification: &Specification, coerce: bool) -> Result<Table, ConfigError> {
    let mut table = Table::new();
    for setting in specification {
        let Some(value) = to_toml(setting.value(), coerce) else {
            continue;
        };
        let conflict = || ConfigError::InvalidSpecification {
            specification: specification.clone(),
            reason: format!("setting '{}' conflicts with another setting", setting.field()),
            source: None,
        };
        let Some((leaf, parents)) = setting.field().segments().split_last() else {
            return Err(ConfigError::InvalidSpecification {
                specification: specification.clone(),
                reason: "a setting without a field cannot be mapped to a struct".into(),
                source: None,
            });
        };

        let mut current = &mut table;
        for segment in parents {
            current = current
                .entry(segment.as_str())
                .or_insert_with(|| toml::Value::Table(Table::new()))
                .as_table_mut()
                .ok_or_else(conflict)?;
        }
        if current.get(leaf).is_some_and(toml::Value::is_table) {
            return Err(conflict());
        }
        current.insert(leaf.clone(), value);
    }
    Ok(table)
}

fn to_toml(value: &Value, coerce: bool) -> Option<toml::Value> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(toml::Value::Boolean(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(toml::Value::Integer)
            .or_else(|| n.as_f64().map(toml::Value::Float)),
        Value::String(s) if coerce => Some(coerce_string(s)),
        Value::String(s) => Some(toml::Value::String(s.clone())),
        Value::Array(items) => Some(toml::Value::Array(
            items.iter().filter_map(|item| to_toml(item, coerce)).collect(),
        )),
        Value::Object(map) => Some(toml::Value::Table(
            map.iter()
                .filter_map(|(key, item)| Some((key.clone(), to_toml(item, coerce)?)))
                .collect(),
        )),
    }
}

/// Types a string the way a TOML document would have: the literals
/// `true`/`false` (as [`values::parse_bool`](crate::values::parse_bool)
/// accepts them), a base-10 integer, or a finite decimal. Anything else stays
/// a string.
fn coerce_string(s: &str) -> toml::Value {
    match s {
        "true" => toml::Value::Boolean(true),
        "false" => toml::Value::Boolean(false),
        _ => match (s.parse::<i64>(), s.parse::<f64>()) {
            (Ok(i), _) => toml::Value::Integer(i),
            (_, Ok(f)) if f.is_finite() && s.contains('.') => toml::Value::Float(f),
            _ => toml::Value::String(s.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigurationProvider;
    use crate::fixtures::test::{RequiredConfig, TestConfig, TestDbConfig};
    use crate::loader::MemoryLoader;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn spec(entries: &[(&str, Value)]) -> Specification {
        Specification::from_settings(
            entries
                .iter()
                .map(|(k, v)| (Field::parse(k).unwrap(), v.clone())),
        )
        .unwrap()
    }

    #[test]
    fn defaults_only() {
        let factory = ConfiqueFactory::<TestConfig>::new();
        let config = factory.parse(&Specification::new()).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert!(!config.debug);
        assert_eq!(config.database.pool_size, 5);
        assert_eq!(config.database.url, None);
    }

    #[test]
    fn settings_override_defaults() {
        let factory = ConfiqueFactory::<TestConfig>::new();
        let config = factory
            .parse(&spec(&[
                ("port", json!(3000)),
                ("database.url", json!("pg://")),
                ("database.pool_size", json!(20)),
            ]))
            .unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.database.url.as_deref(), Some("pg://"));
        assert_eq!(config.database.pool_size, 20);
    }

    #[test]
    fn null_is_treated_as_absent() {
        let factory = ConfiqueFactory::<TestConfig>::new();
        let config = factory
            .parse(&spec(&[("database.url", Value::Null)]))
            .unwrap();
        assert_eq!(config.database.url, None);
    }

    #[test]
    fn serialized_config_parses_back() {
        let original = TestConfig {
            host: "h".into(),
            port: 1,
            debug: true,
            database: TestDbConfig {
                url: Some("pg://".into()),
                pool_size: 2,
            },
        };
        let spec = Specification::from_serialize(&original).unwrap();
        let parsed = ConfiqueFactory::<TestConfig>::new().parse(&spec).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn strict_rejects_unknown_settings() {
        let factory = ConfiqueFactory::<TestConfig>::new();
        let result = factory.parse(&spec(&[
            ("typo", json!(1)),
            ("database.typo", json!("bad")),
            ("port", json!(1)),
        ]));
        match result {
            Err(ConfigError::UnknownSettings { fields, .. }) => {
                assert_eq!(fields.len(), 2);
                assert!(fields.contains(&Field::from(["typo"])));
                assert!(fields.contains(&Field::from(["database", "typo"])));
            }
            other => panic!("Expected UnknownSettings, got: {other:?}"),
        }
    }

    #[test]
    fn lenient_allows_unknown_settings() {
        let factory = ConfiqueFactory::<TestConfig>::new().strict(false);
        let config = factory
            .parse(&spec(&[("typo", json!(1)), ("port", json!(3000))]))
            .unwrap();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn wrong_type_is_invalid_specification() {
        let factory = ConfiqueFactory::<TestConfig>::new();
        let result = factory.parse(&spec(&[("port", json!("not a port"))]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidSpecification { .. })
        ));
    }

    #[test]
    fn strings_need_coercion() {
        let settings = spec(&[
            ("port", json!("3000")),
            ("debug", json!("true")),
            ("database.pool_size", json!("7")),
        ]);
        assert!(ConfiqueFactory::<TestConfig>::new().parse(&settings).is_err());

        let config = ConfiqueFactory::<TestConfig>::new()
            .coerce_strings(true)
            .parse(&settings)
            .unwrap();
        assert_eq!(config.port, 3000);
        assert!(config.debug);
        assert_eq!(config.database.pool_size, 7);
    }

    #[test]
    fn coerce_string_heuristic() {
        assert_eq!(coerce_string("false"), toml::Value::Boolean(false));
        assert_eq!(coerce_string("FALSE"), toml::Value::String("FALSE".into()));
        assert_eq!(coerce_string("-5"), toml::Value::Integer(-5));
        assert_eq!(coerce_string("1.5"), toml::Value::Float(1.5));
        assert_eq!(coerce_string("inf"), toml::Value::String("inf".into()));
        assert_eq!(
            coerce_string("hello world"),
            toml::Value::String("hello world".into())
        );
    }

    #[test]
    fn conflicting_fields_are_invalid() {
        let factory = ConfiqueFactory::<TestConfig>::new();
        let result = factory.parse(&spec(&[
            ("database", json!(1)),
            ("database.url", json!("pg://")),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidSpecification { .. })
        ));

        let result = factory.parse(&spec(&[
            ("database.url", json!("pg://")),
            ("database", json!(1)),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidSpecification { .. })
        ));
    }

    #[test]
    fn default_exists_when_every_field_has_one() {
        let ty = ConfigurationType::of::<TestConfig>();
        let factory = ConfiqueFactory::<TestConfig>::new();
        assert!(factory.supports_default_configuration(&ty));
        let config = factory
            .create_default_configuration(&ty)
            .unwrap()
            .downcast::<TestConfig>()
            .unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn required_field_means_no_default() {
        let ty = ConfigurationType::of::<RequiredConfig>();
        let factory = ConfiqueFactory::<RequiredConfig>::new();
        assert!(!factory.supports_default_configuration(&ty));
        match factory.parse(&Specification::new()) {
            Err(err @ ConfigError::InvalidSpecification { .. }) => {
                let cause = std::error::Error::source(&err).unwrap();
                assert!(cause.to_string().contains("token"));
            }
            other => panic!("Expected InvalidSpecification, got: {other:?}"),
        }
        let config = factory.parse(&spec(&[("token", json!("t"))])).unwrap();
        assert_eq!(config.token, "t");
        assert_eq!(config.retries, 3);
    }

    #[test]
    fn other_type_is_argument_error() {
        let factory = ConfiqueFactory::<TestConfig>::new();
        let other = ConfigurationType::of::<RequiredConfig>();
        assert!(!factory.supports_configuration(&other));
        assert!(matches!(
            factory.create_configuration(&Specification::new(), &other, None),
            Err(ConfigError::InvalidArgument(_))
        ));
    }

    #[test]
    fn resolves_from_toml_file() {
        let dir = TempDir::new().unwrap();
        let name = ConfigurationType::of::<TestConfig>().specification_name();
        fs::write(
            dir.path().join(format!("{name}.toml")),
            "host = \"filehost\"\n[database]\npool_size = 20\n",
        )
        .unwrap();
        let provider = ConfigurationProvider::builder()
            .directory_loaders(dir.path())
            .unwrap()
            .factory(ConfiqueFactory::<TestConfig>::new())
            .build();
        let config = provider.get_configuration::<TestConfig>().unwrap();
        assert_eq!(config.host, "filehost");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database.pool_size, 20);
    }

    #[test]
    fn resolves_from_properties_with_coercion() {
        let name = ConfigurationType::of::<TestConfig>().specification_name();
        let document = "port = 9000\ndebug = true\ndatabase.url = pg://props\n";
        let spec = crate::file::parse_document(&name, document, crate::Format::Properties).unwrap();
        let provider = ConfigurationProvider::builder()
            .loader(MemoryLoader::new().with(name, spec))
            .factory(ConfiqueFactory::<TestConfig>::new().coerce_strings(true))
            .build();
        let config = provider.get_configuration::<TestConfig>().unwrap();
        assert_eq!(config.port, 9000);
        assert!(config.debug);
        assert_eq!(config.database.url.as_deref(), Some("pg://props"));
    }

    #[test]
    fn falls_back_to_default_without_specification() {
        let provider = ConfigurationProvider::builder()
            .factory(ConfiqueFactory::<TestConfig>::new())
            .build();
        let config = provider.get_configuration::<TestConfig>().unwrap();
        assert_eq!(config.host, "localhost");
    }
}
