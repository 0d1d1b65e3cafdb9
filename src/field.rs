//! Path addressing for settings.
//!
//! A [`Field`] is an ordered sequence of path segments, e.g.
//! `["database", "pool", "size"]`. Fields are compared segment by segment; a
//! field `P` is a prefix of `F` when `P`'s segments lead `F`'s. The root
//! (empty) field is a prefix of every field.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Field(Vec<String>);

impl Field {
    /// The empty field. Matches every setting when used as a prefix.
    pub fn root() -> Self {
        Field(Vec::new())
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Field(segments.into_iter().map(Into::into).collect())
    }

    /// Parse a dotted path such as `"database.pool.size"`.
    ///
    /// `""` parses to the root field. Returns `None` if any segment is empty
    /// (`"a..b"`, `".a"`, `"a."`).
    pub fn parse(dotted: &str) -> Option<Self> {
        if dotted.is_empty() {
            return Some(Field::root());
        }
        let segments: Vec<String> = dotted.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return None;
        }
        Some(Field(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn segment(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if `self` leads `other` segment by segment (equal fields included).
    pub fn is_prefix_of(&self, other: &Field) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Remove `prefix` from the front of this field.
    pub fn strip_prefix(&self, prefix: &Field) -> Option<Field> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| Field(rest.to_vec()))
    }

    /// Append all of `other`'s segments.
    pub fn join(&self, other: &Field) -> Field {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Field(segments)
    }

    /// Append a single segment.
    pub fn child(&self, segment: impl Into<String>) -> Field {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Field(segments)
    }

    pub(crate) fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    pub(crate) fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        write!(f, "{}", self.0.join("."))
    }
}

impl From<Vec<String>> for Field {
    fn from(segments: Vec<String>) -> Self {
        Field(segments)
    }
}

impl From<&[&str]> for Field {
    fn from(segments: &[&str]) -> Self {
        Field::new(segments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for Field {
    fn from(segments: [&str; N]) -> Self {
        Field::new(segments)
    }
}

impl From<&Field> for Field {
    fn from(field: &Field) -> Self {
        field.clone()
    }
}
