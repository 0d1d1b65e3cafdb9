//! The settings data model: [`Setting`] and [`Specification`].
//!
//! A specification is an immutable, ordered collection of settings, each
//! addressed by a unique [`Field`]. Lookups by exact field go through an
//! index; prefix queries scan in insertion order, so [`Specification::defined`]
//! and [`Specification::children`] report fields in first-seen order.
//!
//! Specifications are cheap to clone: clones share the same storage. Derived
//! specifications ([`Specification::sub_specification`]) own fresh storage and
//! keep no reference to their source.
//!
//! # Normalization
//!
//! Parsed documents are nested maps. [`normalize`] flattens every nesting
//! level into one field path, so `{"a": {"b": 1}}` becomes the setting
//! `a.b = 1`. Arrays and scalars are leaves; empty maps produce no setting.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::ConfigError;
use crate::field::Field;

/// One `(field, value)` entry of a specification.
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    field: Field,
    value: Value,
}

impl Setting {
    pub fn new(field: impl Into<Field>, value: impl Into<Value>) -> Self {
        Setting {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_parts(self) -> (Field, Value) {
        (self.field, self.value)
    }
}

#[derive(Default)]
struct Store {
    settings: Vec<Setting>,
    index: HashMap<Field, usize>,
}

#[derive(Clone, Default)]
pub struct Specification {
    store: Arc<Store>,
}

impl Specification {
    /// An empty specification.
    pub fn new() -> Self {
        Specification::default()
    }

    /// Build a specification from `(field, value)` entries.
    ///
    /// Entries are taken by value, so later changes to the caller's data never
    /// reach the store. When a field repeats, the last value wins and the
    /// setting keeps the position of its first occurrence.
    ///
    /// Fails with [`ConfigError::InvalidArgument`] if a field is the root or
    /// has an empty segment.
    pub fn from_settings<I, F, V>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<Field>,
        V: Into<Value>,
    {
        let mut checked = Vec::new();
        for (field, value) in entries {
            let field = field.into();
            check_field(&field)?;
            checked.push((field, value.into()));
        }
        Ok(Specification::from_checked(checked))
    }

    /// Build from entries whose fields are already known to be well formed.
    fn from_checked(entries: impl IntoIterator<Item = (Field, Value)>) -> Self {
        let mut store = Store::default();
        for (field, value) in entries {
            match store.index.get(&field) {
                Some(&position) => store.settings[position].value = value,
                None => {
                    store.index.insert(field.clone(), store.settings.len());
                    store.settings.push(Setting { field, value });
                }
            }
        }
        Specification {
            store: Arc::new(store),
        }
    }

    /// Build a specification from a nested document (see [`normalize`]).
    pub fn from_value(document: &Value) -> Result<Self, ConfigError> {
        Ok(Specification::from_checked(normalize(document)?))
    }

    /// Build a specification from any serializable value, e.g. a struct holding
    /// embedded defaults. The value must serialize to a map.
    pub fn from_serialize<S: Serialize + ?Sized>(source: &S) -> Result<Self, ConfigError> {
        let document = serde_json::to_value(source)
            .map_err(|e| ConfigError::InvalidArgument(format!("not serializable: {e}")))?;
        Specification::from_value(&document)
    }

    /// Materialize a copy of `specification` into new storage.
    pub fn copy_of(specification: &Specification) -> Self {
        Specification::from_checked(specification.iter().cloned().map(Setting::into_parts))
    }

    /// Extract the settings strictly below `prefix`, with the prefix stripped
    /// from every field. A setting at `prefix` itself is left out, as are
    /// settings outside the prefix.
    pub fn sub_specification(&self, prefix: impl Into<Field>) -> Specification {
        let prefix = prefix.into();
        Specification::from_checked(self.settings(&prefix).filter_map(|setting| {
            setting
                .field
                .strip_prefix(&prefix)
                .filter(|field| !field.is_empty())
                .map(|field| (field, setting.value.clone()))
        }))
    }

    pub fn len(&self) -> usize {
        self.store.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.settings.is_empty()
    }

    /// All settings in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Setting> {
        self.store.settings.iter()
    }

    /// Settings whose field starts with `prefix`, in insertion order.
    ///
    /// Lazy; call again to restart.
    pub fn settings(&self, prefix: impl Into<Field>) -> impl Iterator<Item = &Setting> + '_ {
        let prefix = prefix.into();
        self.store
            .settings
            .iter()
            .filter(move |setting| prefix.is_prefix_of(&setting.field))
    }

    /// The distinct fields one level below `prefix` that lead to a setting,
    /// in first-seen order. A setting at `prefix` itself is not reported.
    pub fn defined(&self, prefix: impl Into<Field>) -> Vec<Field> {
        let prefix = prefix.into();
        self.children(&prefix)
            .into_iter()
            .map(|segment| prefix.child(segment))
            .collect()
    }

    /// The distinct segments one level below `prefix`, in first-seen order.
    pub fn children(&self, prefix: impl Into<Field>) -> Vec<String> {
        let prefix = prefix.into();
        let depth = prefix.len();
        let mut seen = HashSet::new();
        let mut children = Vec::new();
        for setting in self.settings(&prefix) {
            if let Some(segment) = setting.field.segment(depth)
                && seen.insert(segment)
            {
                children.push(segment.to_string());
            }
        }
        children
    }

    /// Exact field match.
    pub fn has_setting(&self, field: impl Into<Field>) -> bool {
        self.store.index.contains_key(&field.into())
    }

    pub fn setting(&self, field: impl Into<Field>) -> Result<&Setting, ConfigError> {
        let field = field.into();
        match self.store.index.get(&field) {
            Some(&position) => Ok(&self.store.settings[position]),
            None => Err(ConfigError::SettingNotFound {
                specification: self.clone(),
                field,
            }),
        }
    }

    pub fn value(&self, field: impl Into<Field>) -> Result<&Value, ConfigError> {
        self.setting(field).map(Setting::value)
    }

    /// True if both handles share the same storage.
    pub fn ptr_eq(a: &Specification, b: &Specification) -> bool {
        Arc::ptr_eq(&a.store, &b.store)
    }
}

impl PartialEq for Specification {
    fn eq(&self, other: &Self) -> bool {
        self.store.settings == other.store.settings
    }
}

impl fmt::Debug for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.iter()
                    .map(|setting| (setting.field.to_string(), &setting.value)),
            )
            .finish()
    }
}

impl<'a> IntoIterator for &'a Specification {
    type Item = &'a Setting;
    type IntoIter = std::slice::Iter<'a, Setting>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Flatten a nested document into `(field, value)` entries in document order.
///
/// The root must be a map. Every nested map contributes its keys as path
/// segments; anything else is a leaf value. Empty keys are rejected because a
/// field segment is never empty.
pub fn normalize(document: &Value) -> Result<Vec<(Field, Value)>, ConfigError> {
    let Value::Object(map) = document else {
        return Err(ConfigError::InvalidArgument(format!(
            "expected a map at the root of the document, found {}",
            kind_of(document)
        )));
    };
    let mut out = Vec::new();
    let mut path = Field::root();
    flatten_into(map, &mut path, &mut out)?;
    Ok(out)
}

fn flatten_into(
    map: &serde_json::Map<String, Value>,
    path: &mut Field,
    out: &mut Vec<(Field, Value)>,
) -> Result<(), ConfigError> {
    for (key, value) in map {
        if key.is_empty() {
            return Err(ConfigError::InvalidArgument(format!(
                "empty key under {path}"
            )));
        }
        path.push(key.as_str());
        match value {
            Value::Object(nested) => flatten_into(nested, path, out)?,
            leaf => out.push((path.clone(), leaf.clone())),
        }
        path.pop();
    }
    Ok(())
}

fn check_field(field: &Field) -> Result<(), ConfigError> {
    if field.is_empty() {
        return Err(ConfigError::InvalidArgument(
            "a setting cannot sit at the root field".into(),
        ));
    }
    if field.segments().iter().any(String::is_empty) {
        return Err(ConfigError::InvalidArgument(format!(
            "field {field} has an empty segment"
        )));
    }
    Ok(())
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a map",
    }
}
