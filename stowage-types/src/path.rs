//! Structural addresses into the value tree.

use std::fmt;

/// One step of a path: an object field name or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(String),
    Index(usize),
}

impl Key {
    /// The field name, if this is a `Name` key.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Name(name) => Some(name),
            Key::Index(_) => None,
        }
    }

    #[must_use]
    pub fn is_name(&self) -> bool {
        matches!(self, Key::Name(_))
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => write!(f, "{name}"),
            Key::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Ordered sequence of keys from a root-level field down to a nested one.
///
/// The first segment is the root key — the only part of a path that maps to
/// a backing-store entry. An empty path addresses the root container itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Key>);

impl Path {
    #[must_use]
    pub fn new() -> Self {
        Path(Vec::new())
    }

    #[must_use]
    pub fn segments(&self) -> &[Key] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, key: Key) {
        self.0.push(key);
    }

    pub fn pop(&mut self) -> Option<Key> {
        self.0.pop()
    }

    /// A new path extended by one key.
    #[must_use]
    pub fn child(&self, key: Key) -> Path {
        let mut segments = self.0.clone();
        segments.push(key);
        Path(segments)
    }

    #[must_use]
    pub fn first(&self) -> Option<&Key> {
        self.0.first()
    }

    /// The root key this path belongs to, when the path starts at a named
    /// root field.
    #[must_use]
    pub fn root_key(&self) -> Option<&str> {
        self.0.first().and_then(Key::as_name)
    }

    /// True when `self` addresses `prefix` or something beneath it.
    #[must_use]
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }
}

impl FromIterator<Key> for Path {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl From<Vec<Key>> for Path {
    fn from(segments: Vec<Key>) -> Self {
        Path(segments)
    }
}

impl fmt::Display for Path {
    /// Renders like `foo.bar[2]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            match key {
                Key::Name(name) if i == 0 => write!(f, "{name}")?,
                Key::Name(name) => write!(f, ".{name}")?,
                Key::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
