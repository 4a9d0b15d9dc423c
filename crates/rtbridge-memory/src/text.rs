//! Replicated text objects.

use crate::backend::{MemoryBackend, ObjectId};
use crate::registry::deliver;
use rtbridge_core::text::{byte_offset, utf16_len};
use rtbridge_core::{ListenerId, RemoteError, RemoteText, TextEvent, TextEventKind, TextListener};

/// A session's handle to a shared text.
#[derive(Clone)]
pub struct MemoryText {
    backend: MemoryBackend,
    object: ObjectId,
    session: String,
}

impl MemoryText {
    pub(crate) fn new(backend: MemoryBackend, object: ObjectId, session: &str) -> Self {
        Self {
            backend,
            object,
            session: session.to_string(),
        }
    }

    fn ensure_connected(&self) -> Result<(), RemoteError> {
        if self.backend.is_live(&self.session) {
            Ok(())
        } else {
            Err(RemoteError::Disconnected)
        }
    }

    fn fire(&self, kind: TextEventKind, index: usize, text: &str) {
        let targets = self.backend.with_state(|state| {
            let object = state.texts.entry(self.object).or_default();
            match kind {
                TextEventKind::Inserted => object.inserted.targets(),
                TextEventKind::Deleted => object.deleted.targets(),
            }
        });
        deliver(targets, |listener_session| TextEvent {
            kind,
            index,
            text: text.to_string(),
            is_local: listener_session == self.session,
        });
    }
}

impl RemoteText for MemoryText {
    fn text(&self) -> String {
        self.backend.with_state(|state| {
            state
                .texts
                .get(&self.object)
                .map(|object| object.content.clone())
                .unwrap_or_default()
        })
    }

    fn set_text(&self, text: &str) -> Result<(), RemoteError> {
        self.ensure_connected()?;
        let previous = self.backend.with_state(|state| {
            let object = state.texts.entry(self.object).or_default();
            std::mem::replace(&mut object.content, text.to_string())
        });
        tracing::debug!(session = %self.session, len = utf16_len(text), "Replaced text");

        if !previous.is_empty() {
            self.fire(TextEventKind::Deleted, 0, &previous);
        }
        if !text.is_empty() {
            self.fire(TextEventKind::Inserted, 0, text);
        }
        Ok(())
    }

    fn insert_string(&self, index: usize, text: &str) -> Result<(), RemoteError> {
        self.ensure_connected()?;
        self.backend.with_state(|state| {
            let object = state.texts.entry(self.object).or_default();
            let len = utf16_len(&object.content);
            if index > len {
                return Err(RemoteError::IndexOutOfRange { index, len });
            }
            let offset = byte_offset(&object.content, index).ok_or(RemoteError::InvalidRange {
                start: index,
                end: index,
            })?;
            object.content.insert_str(offset, text);
            Ok(())
        })?;
        tracing::debug!(session = %self.session, index, len = utf16_len(text), "Inserted text");

        if !text.is_empty() {
            self.fire(TextEventKind::Inserted, index, text);
        }
        Ok(())
    }

    fn remove_range(&self, start: usize, end: usize) -> Result<(), RemoteError> {
        self.ensure_connected()?;
        if start > end {
            return Err(RemoteError::InvalidRange { start, end });
        }
        let removed = self.backend.with_state(|state| {
            let object = state.texts.entry(self.object).or_default();
            let len = utf16_len(&object.content);
            if end > len {
                return Err(RemoteError::IndexOutOfRange { index: end, len });
            }
            let (Some(from), Some(to)) = (
                byte_offset(&object.content, start),
                byte_offset(&object.content, end),
            ) else {
                return Err(RemoteError::InvalidRange { start, end });
            };
            Ok(object.content.drain(from..to).collect::<String>())
        })?;
        tracing::debug!(session = %self.session, start, end, "Removed text");

        if !removed.is_empty() {
            self.fire(TextEventKind::Deleted, start, &removed);
        }
        Ok(())
    }

    fn add_listener(&self, kind: TextEventKind, listener: TextListener) -> ListenerId {
        self.backend.with_state(|state| {
            let id = state.allocate_listener();
            let object = state.texts.entry(self.object).or_default();
            match kind {
                TextEventKind::Inserted => object.inserted.add(id, &self.session, listener),
                TextEventKind::Deleted => object.deleted.add(id, &self.session, listener),
            }
            id
        })
    }

    fn remove_listener(&self, id: ListenerId) {
        self.backend.with_state(|state| {
            if let Some(object) = state.texts.get_mut(&self.object) {
                let removed = object.inserted.remove(id) || object.deleted.remove(id);
                if !removed {
                    tracing::trace!(%id, "Ignoring unknown text listener");
                }
            }
        });
    }

    fn remove_all_event_listeners(&self) {
        self.backend.with_state(|state| {
            if let Some(object) = state.texts.get_mut(&self.object) {
                object.inserted.remove_session(&self.session);
                object.deleted.remove_session(&self.session);
            }
        });
    }
}
