use std::path::PathBuf;

use thiserror::Error;

use crate::factory::ConfigurationType;
use crate::field::Field;
use crate::spec::Specification;

/// Boxed underlying cause carried by format and parse failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
#[cfg_attr(feature = "rich-errors", derive(miette::Diagnostic))]
pub enum ConfigError {
    #[error("Specification not found: {name}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(specfig::specification_not_found)))]
    SpecificationNotFound { name: String },

    #[error("Specification '{name}' has an invalid format: {source}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(specfig::specification_format)))]
    SpecificationFormat { name: String, source: BoxError },

    #[error("Failed to read {path}: {source}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(specfig::io)))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No setting found: {field}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(specfig::setting_not_found)))]
    SettingNotFound {
        specification: Specification,
        field: Field,
    },

    #[error("Invalid setting '{field}': {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(specfig::invalid_setting)))]
    InvalidSetting {
        specification: Specification,
        field: Field,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Invalid specification: {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(specfig::invalid_specification)))]
    InvalidSpecification {
        specification: Specification,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Unknown settings in specification: {}", join_fields(.fields))]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(specfig::unknown_settings)))]
    UnknownSettings {
        specification: Specification,
        fields: Vec<Field>,
    },

    #[error("No configuration found for type {configuration_type}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(specfig::configuration_not_found)))]
    ConfigurationNotFound {
        configuration_type: ConfigurationType,
    },

    #[error("Invalid argument: {0}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(specfig::invalid_argument)))]
    InvalidArgument(String),
}

impl ConfigError {
    /// The specification an invalid-specification error refers to.
    pub fn specification(&self) -> Option<&Specification> {
        match self {
            ConfigError::SettingNotFound { specification, .. }
            | ConfigError::InvalidSetting { specification, .. }
            | ConfigError::InvalidSpecification { specification, .. }
            | ConfigError::UnknownSettings { specification, .. } => Some(specification),
            _ => None,
        }
    }

    pub(crate) fn invalid_setting(
        specification: &Specification,
        field: Field,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidSetting {
            specification: specification.clone(),
            field,
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn invalid_setting_caused_by(
        specification: &Specification,
        field: Field,
        source: impl Into<BoxError>,
    ) -> Self {
        let source = source.into();
        ConfigError::InvalidSetting {
            specification: specification.clone(),
            field,
            reason: source.to_string(),
            source: Some(source),
        }
    }
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
