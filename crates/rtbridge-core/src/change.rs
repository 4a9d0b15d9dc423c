//! Canonical change notifications.
//!
//! Every mutation of an observable primitive, local or remote, is described to
//! subscribers by exactly one of these values.

use crate::text::utf16_len;
use serde::{Deserialize, Serialize};

/// Kind of a string mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringChangeKind {
    /// Text was inserted
    Insert,
    /// Text was removed
    Remove,
    /// The whole text was replaced
    Set,
}

/// A single mutation of an observable string.
///
/// `start` and `end` are UTF-16 indices. For inserts and sets the range covers
/// `value` at its new position; for removals `value` is the text that occupied
/// `[start, end)` before it was removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringChange {
    /// Type of mutation
    pub kind: StringChangeKind,
    /// First affected UTF-16 index
    pub start: usize,
    /// One past the last affected UTF-16 index
    pub end: usize,
    /// Inserted, assigned, or removed text
    pub value: String,
}

impl StringChange {
    /// Describe `value` inserted at `index`.
    #[must_use]
    pub fn insert(index: usize, value: impl Into<String>) -> Self {
        Self::spanning(StringChangeKind::Insert, index, value.into())
    }

    /// Describe `removed` taken out of the text starting at `start`.
    #[must_use]
    pub fn remove(start: usize, removed: impl Into<String>) -> Self {
        Self::spanning(StringChangeKind::Remove, start, removed.into())
    }

    /// Describe the whole text being replaced with `value`.
    #[must_use]
    pub fn set(value: impl Into<String>) -> Self {
        Self::spanning(StringChangeKind::Set, 0, value.into())
    }

    fn spanning(kind: StringChangeKind, start: usize, value: String) -> Self {
        Self {
            kind,
            start,
            end: start + utf16_len(&value),
            value,
        }
    }
}

/// Kind of a map mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapChangeKind {
    /// A new key appeared
    Add,
    /// A key disappeared
    Remove,
    /// An existing key's value was replaced
    Change,
}

/// A single mutation of an observable map.
///
/// The variants carry exactly the values their kind allows, so an `Add` never
/// has an old value and a `Remove` never has a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapChange<V> {
    /// `key` was added with `value`
    Add {
        /// Affected key
        key: String,
        /// Value now stored under the key
        value: V,
    },
    /// `key` was removed; it held `old_value`
    Remove {
        /// Affected key
        key: String,
        /// Value that was stored under the key
        old_value: V,
    },
    /// `key` changed from `old_value` to `new_value`
    Change {
        /// Affected key
        key: String,
        /// Previous value
        old_value: V,
        /// Current value
        new_value: V,
    },
}

impl<V> MapChange<V> {
    /// Classify a transition of `key` from `old_value` to `new_value`.
    ///
    /// Returns `None` when neither side holds a value.
    #[must_use]
    pub fn classify(key: impl Into<String>, old_value: Option<V>, new_value: Option<V>) -> Option<Self> {
        let key = key.into();
        match (old_value, new_value) {
            (None, Some(value)) => Some(Self::Add { key, value }),
            (Some(old_value), None) => Some(Self::Remove { key, old_value }),
            (Some(old_value), Some(new_value)) => Some(Self::Change {
                key,
                old_value,
                new_value,
            }),
            (None, None) => None,
        }
    }

    /// Kind of this change.
    #[must_use]
    pub fn kind(&self) -> MapChangeKind {
        match self {
            Self::Add { .. } => MapChangeKind::Add,
            Self::Remove { .. } => MapChangeKind::Remove,
            Self::Change { .. } => MapChangeKind::Change,
        }
    }

    /// Key affected by this change.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Add { key, .. } | Self::Remove { key, .. } | Self::Change { key, .. } => key,
        }
    }

    /// Value before the change, absent for additions.
    #[must_use]
    pub fn old_value(&self) -> Option<&V> {
        match self {
            Self::Add { .. } => None,
            Self::Remove { old_value, .. } | Self::Change { old_value, .. } => Some(old_value),
        }
    }

    /// Value after the change, absent for removals.
    #[must_use]
    pub fn new_value(&self) -> Option<&V> {
        match self {
            Self::Add { value, .. } => Some(value),
            Self::Remove { .. } => None,
            Self::Change { new_value, .. } => Some(new_value),
        }
    }
}
