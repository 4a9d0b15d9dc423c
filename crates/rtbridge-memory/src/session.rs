//! A connected client's view of the backend.

use crate::backend::{MapObject, MemoryBackend};
use crate::map::MemoryMap;
use crate::text::MemoryText;
use rtbridge_core::{
    Collaborator, CollaboratorEventKind, CollaboratorListener, ListenerId, LiveCollaborator,
    RemoteDocument, RemoteError,
};

/// One simulated client connection.
///
/// Handles obtained from a session report `is_local` for mutations made
/// through that same session.
#[derive(Clone)]
pub struct MemorySession {
    backend: MemoryBackend,
    profile: Collaborator,
}

impl MemorySession {
    pub(crate) fn new(backend: MemoryBackend, profile: Collaborator) -> Self {
        Self { backend, profile }
    }

    /// This session's id.
    #[must_use]
    pub fn session_id(&self) -> &str {
        self.profile.session_id()
    }

    /// The identity this session joined with.
    #[must_use]
    pub fn profile(&self) -> &Collaborator {
        &self.profile
    }

    /// Handle to the shared text named `id`, created empty on first use.
    #[must_use]
    pub fn text(&self, id: &str) -> MemoryText {
        self.backend.text_handle(id, self.session_id())
    }

    /// Whether the session is still in the live list.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.backend.is_live(self.session_id())
    }

    /// Disconnect cleanly; remaining sessions receive `COLLABORATOR_LEFT`.
    pub fn leave(&self) {
        self.backend.leave(self.session_id());
    }
}

impl RemoteDocument for MemorySession {
    type Map = MemoryMap;

    fn root_map(&self, id: &str) -> Option<MemoryMap> {
        let object = self
            .backend
            .with_state(|state| state.root.get(id).copied())?;
        Some(MemoryMap::new(self.backend.clone(), object, self.session_id()))
    }

    fn set_root_map(&self, id: &str, map: &MemoryMap) -> Result<(), RemoteError> {
        if !self.is_connected() {
            return Err(RemoteError::Disconnected);
        }
        self.backend.with_state(|state| {
            state.root.insert(id.to_string(), map.object());
        });
        tracing::debug!(session = %self.session_id(), id, "Registered root map");
        Ok(())
    }

    fn create_map(&self) -> MemoryMap {
        let object = self.backend.with_state(|state| {
            let object = state.allocate_object();
            state.maps.insert(object, MapObject::default());
            object
        });
        MemoryMap::new(self.backend.clone(), object, self.session_id())
    }

    async fn collaborators(&self) -> Result<Vec<LiveCollaborator>, RemoteError> {
        if !self.is_connected() {
            return Err(RemoteError::Disconnected);
        }
        Ok(self.backend.live_collaborators(self.session_id()))
    }

    fn add_collaborator_listener(
        &self,
        kind: CollaboratorEventKind,
        listener: CollaboratorListener,
    ) -> ListenerId {
        let session = self.session_id().to_string();
        self.backend.with_state(|state| {
            let id = state.allocate_listener();
            match kind {
                CollaboratorEventKind::Joined => state.joined.add(id, &session, listener),
                CollaboratorEventKind::Left => state.left.add(id, &session, listener),
            }
            id
        })
    }

    fn remove_listener(&self, id: ListenerId) {
        self.backend.with_state(|state| {
            if !state.joined.remove(id) {
                state.left.remove(id);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtbridge_core::RemoteText;

    #[test]
    fn collaborators_flag_the_viewer() {
        let backend = MemoryBackend::new();
        let alice = backend.join(Collaborator::new("u1", "s1", "Alice", "#f00"));
        let _bob = backend.join(Collaborator::new("u2", "s2", "Bob", "#0f0"));

        let live = tokio_test::block_on(alice.collaborators()).unwrap();
        assert_eq!(live.len(), 2);
        assert!(live[0].is_me);
        assert_eq!(live[0].session_id, "s1");
        assert!(!live[1].is_me);
    }

    #[test]
    fn collaborators_fail_after_leaving() {
        let backend = MemoryBackend::new();
        let alice = backend.join(Collaborator::new("u1", "s1", "Alice", "#f00"));
        alice.leave();
        assert_eq!(
            tokio_test::block_on(alice.collaborators()),
            Err(RemoteError::Disconnected)
        );
    }

    #[test]
    fn text_handles_share_content_by_name() {
        let backend = MemoryBackend::new();
        let alice = backend.join(Collaborator::new("u1", "s1", "Alice", "#f00"));
        let bob = backend.join(Collaborator::new("u2", "s2", "Bob", "#0f0"));

        alice.text("doc").insert_string(0, "shared").unwrap();
        assert_eq!(bob.text("doc").text(), "shared");
        assert_eq!(bob.text("other").text(), "");
    }
}
