//! Contracts for remote replicated primitives.
//!
//! A backend supplies already-connected handles implementing these traits.
//! Handles are cheap to clone and share their underlying object; the bridge
//! never constructs them itself.
//!
//! Every mutation fires events to every registered listener on the object,
//! including listeners belonging to the session that issued it. `is_local`
//! tells the two apart.

use crate::error::RemoteError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque handle to a listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a backend-assigned identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The backend-assigned identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Text event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEventKind {
    /// `TEXT_INSERTED`
    Inserted,
    /// `TEXT_DELETED`
    Deleted,
}

/// A mutation of a remote text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEvent {
    /// Insert or delete
    pub kind: TextEventKind,
    /// UTF-16 index where the mutation starts
    pub index: usize,
    /// Inserted or deleted text
    pub text: String,
    /// Whether the receiving session issued the mutation
    pub is_local: bool,
}

/// A mutation of one key in a remote map (`VALUE_CHANGED`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueChangedEvent {
    /// Affected key
    pub property: String,
    /// Value before the mutation
    pub old_value: Option<Value>,
    /// Value after the mutation
    pub new_value: Option<Value>,
    /// Whether the receiving session issued the mutation
    pub is_local: bool,
}

/// A collaborator as reported by the backend's live session list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveCollaborator {
    /// Backend user identifier
    pub user_id: String,
    /// Session identifier
    pub session_id: String,
    /// Human-readable name
    pub display_name: String,
    /// Display color
    pub color: String,
    /// Whether this is the receiving session
    pub is_me: bool,
}

/// Collaborator event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollaboratorEventKind {
    /// `COLLABORATOR_JOINED`
    Joined,
    /// `COLLABORATOR_LEFT`
    Left,
}

/// A session joining or leaving the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorEvent {
    /// Join or leave
    pub kind: CollaboratorEventKind,
    /// The session concerned
    pub collaborator: LiveCollaborator,
}

/// Callback for text events.
pub type TextListener = Box<dyn FnMut(&TextEvent)>;

/// Callback for map value changes.
pub type ValueChangedListener = Box<dyn FnMut(&ValueChangedEvent)>;

/// Callback for collaborator join/leave.
pub type CollaboratorListener = Box<dyn FnMut(&CollaboratorEvent)>;

/// A replicated text object.
///
/// Indices are UTF-16 code units.
pub trait RemoteText {
    /// Current full text.
    fn text(&self) -> String;

    /// Replace the whole text.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the write.
    fn set_text(&self, text: &str) -> Result<(), RemoteError>;

    /// Insert `text` at `index`.
    ///
    /// # Errors
    ///
    /// Returns error if `index` is out of range or the backend rejects the write.
    fn insert_string(&self, index: usize, text: &str) -> Result<(), RemoteError>;

    /// Remove the range `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns error if the range is invalid or the backend rejects the write.
    fn remove_range(&self, start: usize, end: usize) -> Result<(), RemoteError>;

    /// Register `listener` for events of `kind`.
    fn add_listener(&self, kind: TextEventKind, listener: TextListener) -> ListenerId;

    /// Drop one registration. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);

    /// Drop every registration this handle made.
    ///
    /// The adapters never call this; they remove their own registrations by
    /// [`ListenerId`] so listeners added by the host stay in place.
    fn remove_all_event_listeners(&self);
}

/// A replicated string-keyed map of JSON values.
pub trait RemoteMap {
    /// Value stored under `key`.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key`, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the write.
    fn set(&self, key: &str, value: Value) -> Result<Option<Value>, RemoteError>;

    /// Whether `key` is present.
    fn has(&self, key: &str) -> bool;

    /// Remove `key`, returning its value.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the write.
    fn delete(&self, key: &str) -> Result<Option<Value>, RemoteError>;

    /// Remove every key.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the write.
    fn clear(&self) -> Result<(), RemoteError>;

    /// All keys.
    fn keys(&self) -> Vec<String>;

    /// All values.
    fn values(&self) -> Vec<Value>;

    /// Number of entries.
    fn size(&self) -> usize;

    /// Register `listener` for `VALUE_CHANGED` events.
    fn add_value_changed_listener(&self, listener: ValueChangedListener) -> ListenerId;

    /// Drop one registration. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);

    /// Drop every registration this handle made.
    ///
    /// The adapters never call this; they remove their own registrations by
    /// [`ListenerId`] so listeners added by the host stay in place.
    fn remove_all_event_listeners(&self);
}

/// A connected replicated document.
#[allow(async_fn_in_trait)]
pub trait RemoteDocument {
    /// Map handle type produced by this document.
    type Map: RemoteMap + Clone + 'static;

    /// Map registered on the model root under `id`.
    fn root_map(&self, id: &str) -> Option<Self::Map>;

    /// Register `map` on the model root under `id`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the write.
    fn set_root_map(&self, id: &str, map: &Self::Map) -> Result<(), RemoteError>;

    /// Create a new, empty, unregistered map.
    fn create_map(&self) -> Self::Map;

    /// The backend's authoritative list of connected sessions.
    ///
    /// # Errors
    ///
    /// Returns error if the list cannot be retrieved.
    async fn collaborators(&self) -> Result<Vec<LiveCollaborator>, RemoteError>;

    /// Register `listener` for collaborator events of `kind`.
    fn add_collaborator_listener(
        &self,
        kind: CollaboratorEventKind,
        listener: CollaboratorListener,
    ) -> ListenerId;

    /// Drop one registration. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);
}
