//! File-backed specification loaders.
//!
//! A [`FileLoader`] serves the specification named `name` from
//! `{dir}/{name}.{ext}`, where the extension comes from its [`Format`]:
//!
//! - `json` and `toml` documents must have a map at the root; nested maps are
//!   flattened into dotted fields.
//! - `properties` keys are split on `.` into fields and every value is a
//!   string.
//!
//! The directory itself comes from a [`SearchPath`] or from [`config_dir`].
//! A missing file means the loader does not have the specification; only real
//! read failures surface as [`ConfigError::Io`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde_json::{Map, Number, Value};

use crate::error::{BoxError, ConfigError};
use crate::field::Field;
use crate::loader::SpecificationLoader;
use crate::properties;
use crate::spec::Specification;
use crate::types::{Format, SearchPath};

/// Environment variable naming the default configuration directory.
pub const CONFIG_DIR_VAR: &str = "CONFIG_DIR";

/// The default configuration directory: `$CONFIG_DIR` if set, otherwise the
/// current working directory. The directory must exist.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    config_dir_from(std::env::var_os(CONFIG_DIR_VAR))
}

fn config_dir_from(configured: Option<OsString>) -> Result<PathBuf, ConfigError> {
    let dir = match configured {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().map_err(|e| ConfigError::Io {
            path: PathBuf::from("."),
            source: e,
        })?,
    };
    if !dir.is_dir() {
        return Err(ConfigError::InvalidArgument(format!(
            "configuration directory {} is not an accessible directory",
            dir.display()
        )));
    }
    Ok(dir)
}

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// `app_name` is used by `SearchPath::Platform` to construct the platform-specific
/// config directory (e.g. `~/.config/{app_name}/` on Linux).
///
/// Returns `None` if the path cannot be resolved (e.g. no home directory found).
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Loads `{dir}/{name}.{ext}` files of one format.
#[derive(Debug, Clone)]
pub struct FileLoader {
    dir: PathBuf,
    format: Format,
}

impl FileLoader {
    /// Fails with [`ConfigError::InvalidArgument`] if `dir` is not a directory.
    pub fn new(dir: impl Into<PathBuf>, format: Format) -> Result<Self, ConfigError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(ConfigError::InvalidArgument(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        Ok(FileLoader { dir, format })
    }

    pub fn json(dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        FileLoader::new(dir, Format::Json)
    }

    pub fn toml(dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        FileLoader::new(dir, Format::Toml)
    }

    pub fn properties(dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        FileLoader::new(dir, Format::Properties)
    }

    pub fn from_search_path(
        search_path: &SearchPath,
        app_name: &str,
        format: Format,
    ) -> Result<Self, ConfigError> {
        let dir = resolve_search_path(search_path, app_name).ok_or_else(|| {
            ConfigError::InvalidArgument(format!("cannot resolve search path {search_path:?}"))
        })?;
        FileLoader::new(dir, format)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// The file holding the named specification.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.format.extension()))
    }
}

impl SpecificationLoader for FileLoader {
    fn has_specification(&self, name: &str) -> bool {
        let path = self.path_of(name);
        tracing::debug!(path = %path.display(), "considering specification file");
        path.is_file()
    }

    fn load_specification(&self, name: &str) -> Result<Specification, ConfigError> {
        let path = self.path_of(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::SpecificationNotFound { name: name.into() });
            }
            Err(e) => return Err(ConfigError::Io { path, source: e }),
        };
        parse_document(name, &content, self.format)
    }
}

/// Parse a document of the given format into a specification named `name`.
pub fn parse_document(
    name: &str,
    content: &str,
    format: Format,
) -> Result<Specification, ConfigError> {
    match format {
        Format::Json => {
            let document: Value =
                serde_json::from_str(content).map_err(|e| format_error(name, e))?;
            Specification::from_value(&document).map_err(|e| format_error(name, e))
        }
        Format::Toml => {
            let table: toml::Table = toml::from_str(content).map_err(|e| format_error(name, e))?;
            let document = Value::Object(table_to_json(table));
            Specification::from_value(&document).map_err(|e| format_error(name, e))
        }
        Format::Properties => {
            let entries = properties::parse(content).map_err(|e| format_error(name, e))?;
            let mut settings = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                let field = Field::parse(&key)
                    .filter(|field| !field.is_empty())
                    .ok_or_else(|| format_error(name, format!("invalid key {key:?}")))?;
                settings.push((field, Value::String(value)));
            }
            Specification::from_settings(settings).map_err(|e| format_error(name, e))
        }
    }
}

fn format_error(name: &str, source: impl Into<BoxError>) -> ConfigError {
    ConfigError::SpecificationFormat {
        name: name.into(),
        source: source.into(),
    }
}

fn table_to_json(table: toml::Table) -> Map<String, Value> {
    table
        .into_iter()
        .map(|(key, value)| (key, toml_to_json(value)))
        .collect()
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(table_to_json(table)),
    }
}
