//! Shared backend state and session lifecycle.

use crate::registry::{deliver, Registry};
use crate::session::MemorySession;
use crate::text::MemoryText;
use rtbridge_core::{
    Collaborator, CollaboratorEvent, CollaboratorEventKind, ListenerId, LiveCollaborator,
    TextEvent, ValueChangedEvent,
};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use uuid::Uuid;

/// Identifier of a text or map object inside the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ObjectId(u64);

#[derive(Default)]
pub(crate) struct TextObject {
    pub(crate) content: String,
    pub(crate) inserted: Registry<TextEvent>,
    pub(crate) deleted: Registry<TextEvent>,
}

#[derive(Default)]
pub(crate) struct MapObject {
    pub(crate) entries: BTreeMap<String, Value>,
    pub(crate) listeners: Registry<ValueChangedEvent>,
}

#[derive(Default)]
pub(crate) struct BackendState {
    next_object: u64,
    next_listener: u64,
    pub(crate) texts: HashMap<ObjectId, TextObject>,
    pub(crate) maps: HashMap<ObjectId, MapObject>,
    pub(crate) named_texts: BTreeMap<String, ObjectId>,
    pub(crate) root: BTreeMap<String, ObjectId>,
    /// Live sessions in join order
    pub(crate) sessions: Vec<Collaborator>,
    pub(crate) joined: Registry<CollaboratorEvent>,
    pub(crate) left: Registry<CollaboratorEvent>,
}

impl BackendState {
    pub(crate) fn allocate_object(&mut self) -> ObjectId {
        self.next_object += 1;
        ObjectId(self.next_object)
    }

    pub(crate) fn allocate_listener(&mut self) -> ListenerId {
        self.next_listener += 1;
        ListenerId::new(self.next_listener)
    }

    fn drop_session_listeners(&mut self, session_id: &str) -> usize {
        let mut removed = self.joined.remove_session(session_id) + self.left.remove_session(session_id);
        for text in self.texts.values_mut() {
            removed += text.inserted.remove_session(session_id);
            removed += text.deleted.remove_session(session_id);
        }
        for map in self.maps.values_mut() {
            removed += map.listeners.remove_session(session_id);
        }
        removed
    }

    fn remove_session(&mut self, session_id: &str) -> Option<Collaborator> {
        let position = self
            .sessions
            .iter()
            .position(|session| session.session_id() == session_id)?;
        Some(self.sessions.remove(position))
    }
}

/// An in-memory document service shared by every simulated session.
///
/// Cloning yields another handle to the same backend.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Rc<RefCell<BackendState>>,
}

impl MemoryBackend {
    /// Create an empty backend with no sessions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a new session with the given identity.
    ///
    /// Every other live session receives `COLLABORATOR_JOINED`.
    pub fn join(&self, profile: Collaborator) -> MemorySession {
        let targets = self.with_state(|state| {
            state.sessions.push(profile.clone());
            state.joined.targets()
        });
        tracing::debug!(session_id = %profile.session_id(), user_id = %profile.user_id(), "Session joined");

        let collaborator = live_view(&profile, false);
        let others = targets
            .into_iter()
            .filter(|(session, _)| session != profile.session_id())
            .collect();
        deliver(others, |_| CollaboratorEvent {
            kind: CollaboratorEventKind::Joined,
            collaborator: collaborator.clone(),
        });

        MemorySession::new(self.clone(), profile)
    }

    /// Connect a new session under a freshly generated session id.
    pub fn join_as(
        &self,
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        color: impl Into<String>,
    ) -> MemorySession {
        let session_id = Uuid::new_v4().to_string();
        self.join(Collaborator::new(user_id, session_id, display_name, color))
    }

    /// Drop a session without notifying anyone, as if its client vanished.
    ///
    /// Whatever the session wrote to shared maps stays behind. Returns `false`
    /// if the session was not live.
    pub fn crash(&self, session_id: &str) -> bool {
        let crashed = self.with_state(|state| {
            let crashed = state.remove_session(session_id);
            if crashed.is_some() {
                state.drop_session_listeners(session_id);
            }
            crashed
        });
        if crashed.is_some() {
            tracing::debug!(session_id, "Session crashed");
        }
        crashed.is_some()
    }

    /// Identities of every live session, in join order.
    #[must_use]
    pub fn live_sessions(&self) -> Vec<Collaborator> {
        self.with_state(|state| state.sessions.clone())
    }

    pub(crate) fn leave(&self, session_id: &str) {
        let (departed, targets) = self.with_state(|state| {
            let departed = state.remove_session(session_id);
            if departed.is_some() {
                let removed = state.drop_session_listeners(session_id);
                tracing::trace!(session_id, removed, "Dropped listeners of departing session");
            }
            (departed, state.left.targets())
        });
        let Some(departed) = departed else {
            return;
        };
        tracing::debug!(session_id, "Session left");

        let collaborator = live_view(&departed, false);
        deliver(targets, |_| CollaboratorEvent {
            kind: CollaboratorEventKind::Left,
            collaborator: collaborator.clone(),
        });
    }

    pub(crate) fn is_live(&self, session_id: &str) -> bool {
        self.with_state(|state| {
            state
                .sessions
                .iter()
                .any(|session| session.session_id() == session_id)
        })
    }

    pub(crate) fn live_collaborators(&self, viewer: &str) -> Vec<LiveCollaborator> {
        self.with_state(|state| {
            state
                .sessions
                .iter()
                .map(|session| live_view(session, session.session_id() == viewer))
                .collect()
        })
    }

    pub(crate) fn text_handle(&self, id: &str, session_id: &str) -> MemoryText {
        let object = self.with_state(|state| {
            if let Some(object) = state.named_texts.get(id) {
                return *object;
            }
            let object = state.allocate_object();
            state.named_texts.insert(id.to_string(), object);
            state.texts.insert(object, TextObject::default());
            object
        });
        MemoryText::new(self.clone(), object, session_id)
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut BackendState) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }
}

fn live_view(profile: &Collaborator, is_me: bool) -> LiveCollaborator {
    LiveCollaborator {
        user_id: profile.user_id().to_string(),
        session_id: profile.session_id().to_string(),
        display_name: profile.display_name().to_string(),
        color: profile.color().to_string(),
        is_me,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtbridge_core::RemoteDocument;

    fn profile(session: &str) -> Collaborator {
        Collaborator::new(format!("user-{session}"), session, session.to_uppercase(), "#888888")
    }

    #[test]
    fn join_notifies_other_sessions_only() {
        let backend = MemoryBackend::new();
        let first = backend.join(profile("s1"));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        first.add_collaborator_listener(
            CollaboratorEventKind::Joined,
            Box::new(move |event: &CollaboratorEvent| sink.borrow_mut().push(event.collaborator.session_id.clone())),
        );

        let _second = backend.join(profile("s2"));
        assert_eq!(*seen.borrow(), vec!["s2".to_string()]);
        assert_eq!(backend.live_sessions().len(), 2);
    }

    #[test]
    fn leave_notifies_remaining_sessions() {
        let backend = MemoryBackend::new();
        let first = backend.join(profile("s1"));
        let second = backend.join(profile("s2"));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        first.add_collaborator_listener(
            CollaboratorEventKind::Left,
            Box::new(move |event: &CollaboratorEvent| sink.borrow_mut().push(event.collaborator.session_id.clone())),
        );

        second.leave();
        second.leave();
        assert_eq!(*seen.borrow(), vec!["s2".to_string()]);
        assert!(!second.is_connected());
    }

    #[test]
    fn crash_is_silent() {
        let backend = MemoryBackend::new();
        let first = backend.join(profile("s1"));
        let _doomed = backend.join(profile("s0"));

        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        first.add_collaborator_listener(
            CollaboratorEventKind::Left,
            Box::new(move |_: &CollaboratorEvent| *sink.borrow_mut() += 1),
        );

        assert!(backend.crash("s0"));
        assert!(!backend.crash("s0"));
        assert_eq!(*seen.borrow(), 0);
        assert_eq!(backend.live_sessions(), vec![profile("s1")]);
    }

    #[test]
    fn generated_session_ids_are_unique() {
        let backend = MemoryBackend::new();
        let a = backend.join_as("u", "Ada", "#111111");
        let b = backend.join_as("u", "Ada", "#111111");
        assert_ne!(a.session_id(), b.session_id());
        assert_eq!(a.profile().user_id(), b.profile().user_id());
    }
}
