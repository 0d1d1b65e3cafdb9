//! Typed accessors over specification values.
//!
//! Every helper looks up an exact field and fails with
//! [`ConfigError::SettingNotFound`] when it is absent, or
//! [`ConfigError::InvalidSetting`] (wrapping the underlying parse failure) when
//! the value is present but malformed.
//!
//! Sources that only produce strings (properties files) and sources with
//! native types (JSON, TOML) are both accepted: integers may be written as
//! `8080` or `"8080"`, booleans as `true` or `"true"`, lists as arrays or as
//! comma-delimited strings.
//!
//! # List encoding
//!
//! A delimited list separates items with `,`. A literal comma inside an item
//! is written `\,` and a literal backslash `\\`. See [`encode_list`] and
//! [`decode_list`].

use std::collections::HashSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::error::ConfigError;
use crate::factory::{AnyConfiguration, Configuration, ConfigurationType, Context};
use crate::field::Field;
use crate::provider::ConfigurationProvider;
use crate::spec::{Specification, kind_of};

const LIST_DELIMITER: char = ',';
const LIST_ESCAPE: char = '\\';

/// A delimited list ended in the middle of an escape sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("list ends with a dangling escape character: {0:?}")]
pub struct ListDecodeError(pub String);

/// The value as text. Strings are returned as-is; anything else in its JSON
/// form.
pub fn parse_string(
    specification: &Specification,
    field: impl Into<Field>,
) -> Result<String, ConfigError> {
    match specification.value(field)? {
        Value::String(s) => Ok(s.clone()),
        other => Ok(other.to_string()),
    }
}

/// A base-10 integer, from an integral number or a string.
pub fn parse_int(
    specification: &Specification,
    field: impl Into<Field>,
) -> Result<i64, ConfigError> {
    let field = field.into();
    match specification.value(&field)? {
        Value::Number(n) => n.as_i64().ok_or_else(|| {
            ConfigError::invalid_setting(specification, field, format!("{n} is not an integer"))
        }),
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|e| ConfigError::invalid_setting_caused_by(specification, field, e)),
        other => Err(ConfigError::invalid_setting(
            specification,
            field,
            format!("expected an integer, found {}", kind_of(other)),
        )),
    }
}

/// A boolean. Strings must be exactly `"true"` or `"false"`.
pub fn parse_bool(
    specification: &Specification,
    field: impl Into<Field>,
) -> Result<bool, ConfigError> {
    let field = field.into();
    match specification.value(&field)? {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        Value::String(s) => Err(ConfigError::invalid_setting(
            specification,
            field,
            format!("expected \"true\" or \"false\", found {s:?}"),
        )),
        other => Err(ConfigError::invalid_setting(
            specification,
            field,
            format!("expected a boolean, found {}", kind_of(other)),
        )),
    }
}

/// A list of strings, from an array or a delimited string.
pub fn parse_list(
    specification: &Specification,
    field: impl Into<Field>,
) -> Result<Vec<String>, ConfigError> {
    let field = field.into();
    match specification.value(&field)? {
        Value::Array(items) => Ok(items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()),
        Value::String(s) => decode_list(s)
            .map_err(|e| ConfigError::invalid_setting_caused_by(specification, field, e)),
        scalar @ (Value::Number(_) | Value::Bool(_)) => Ok(vec![scalar.to_string()]),
        other => Err(ConfigError::invalid_setting(
            specification,
            field,
            format!("expected a list, found {}", kind_of(other)),
        )),
    }
}

/// Like [`parse_list`] with duplicates removed, keeping first occurrences.
pub fn parse_set(
    specification: &Specification,
    field: impl Into<Field>,
) -> Result<Vec<String>, ConfigError> {
    let mut seen = HashSet::new();
    let mut items = parse_list(specification, field)?;
    items.retain(|item| seen.insert(item.clone()));
    Ok(items)
}

/// Deserialize the value into any `serde` type.
pub fn parse_value<T: DeserializeOwned>(
    specification: &Specification,
    field: impl Into<Field>,
) -> Result<T, ConfigError> {
    let field = field.into();
    let value = specification.value(&field)?;
    T::deserialize(value)
        .map_err(|e| ConfigError::invalid_setting_caused_by(specification, field, e))
}

/// The settings under `field`, with the prefix stripped.
///
/// An exact setting holding a nested map is normalized into its own
/// specification; an exact setting holding anything else is invalid.
pub fn parse_specification(
    specification: &Specification,
    field: impl Into<Field>,
) -> Result<Specification, ConfigError> {
    let field = field.into();
    if let Ok(setting) = specification.setting(&field) {
        return match setting.value() {
            document @ Value::Object(_) => Specification::from_value(document)
                .map_err(|e| ConfigError::invalid_setting_caused_by(specification, field, e)),
            other => Err(ConfigError::invalid_setting(
                specification,
                field,
                format!("expected a nested specification, found {}", kind_of(other)),
            )),
        };
    }
    if specification.settings(&field).next().is_none() {
        return Err(ConfigError::SettingNotFound {
            specification: specification.clone(),
            field,
        });
    }
    Ok(specification.sub_specification(field))
}

/// Build a nested configuration described under `field`.
///
/// `field.type` names the configuration type (its type name or
/// specification name) and `field.settings` holds the settings it is parsed
/// from. Missing `settings` parse as an empty specification.
pub fn parse_configuration<T: Configuration>(
    provider: &ConfigurationProvider,
    specification: &Specification,
    field: impl Into<Field>,
) -> Result<Arc<T>, ConfigError> {
    let field = field.into();
    let (configuration_type, configuration) =
        parse_any_configuration(provider, specification, &field, None)?;
    downcast_setting(specification, field, configuration_type, configuration)
}

/// Like [`parse_configuration`], passing `context` to the factory.
pub fn parse_configuration_with_context<T: Configuration>(
    provider: &ConfigurationProvider,
    specification: &Specification,
    field: impl Into<Field>,
    context: &Context,
) -> Result<Arc<T>, ConfigError> {
    let field = field.into();
    let (configuration_type, configuration) =
        parse_any_configuration(provider, specification, &field, Some(context))?;
    downcast_setting(specification, field, configuration_type, configuration)
}

/// Build a nested configuration of whatever type `field.type` names.
pub fn parse_any_configuration(
    provider: &ConfigurationProvider,
    specification: &Specification,
    field: impl Into<Field>,
    context: Option<&Context>,
) -> Result<(ConfigurationType, AnyConfiguration), ConfigError> {
    let field = field.into();
    let type_field = field.child("type");
    let name = parse_string(specification, &type_field)?;
    let configuration_type = provider.configuration_type(&name).ok_or_else(|| {
        ConfigError::invalid_setting(
            specification,
            type_field,
            format!("unknown configuration type {name}"),
        )
    })?;

    let settings = match parse_specification(specification, field.child("settings")) {
        Ok(settings) => settings,
        Err(ConfigError::SettingNotFound { .. }) => Specification::new(),
        Err(e) => return Err(e),
    };

    match provider.parse_configuration_dyn(&settings, &configuration_type, context) {
        Ok(configuration) => Ok((configuration_type, configuration)),
        Err(e @ ConfigError::ConfigurationNotFound { .. }) => Err(
            ConfigError::invalid_setting_caused_by(specification, field, e),
        ),
        Err(e) if e.specification().is_some() => Err(ConfigError::invalid_setting_caused_by(
            specification,
            field,
            e,
        )),
        Err(e) => Err(e),
    }
}

fn downcast_setting<T: Configuration>(
    specification: &Specification,
    field: Field,
    configuration_type: ConfigurationType,
    configuration: AnyConfiguration,
) -> Result<Arc<T>, ConfigError> {
    configuration.downcast::<T>().map_err(|_| {
        ConfigError::invalid_setting(
            specification,
            field,
            format!(
                "expected a {}, found {configuration_type}",
                std::any::type_name::<T>()
            ),
        )
    })
}

/// Join items into a delimited list, escaping delimiters and backslashes.
pub fn encode_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push(LIST_DELIMITER);
        }
        for c in item.as_ref().chars() {
            if c == LIST_DELIMITER || c == LIST_ESCAPE {
                out.push(LIST_ESCAPE);
            }
            out.push(c);
        }
    }
    out
}

/// Split a delimited list. The empty string is the empty list.
///
/// A backslash makes the next character literal.
pub fn decode_list(encoded: &str) -> Result<Vec<String>, ListDecodeError> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = encoded.chars();
    while let Some(c) = chars.next() {
        match c {
            LIST_ESCAPE => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err(ListDecodeError(encoded.to_string())),
            },
            LIST_DELIMITER => items.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    items.push(current);
    Ok(items)
}
