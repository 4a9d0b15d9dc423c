//! Replicated map objects.

use crate::backend::{MemoryBackend, ObjectId};
use crate::registry::deliver;
use rtbridge_core::{ListenerId, RemoteError, RemoteMap, ValueChangedEvent, ValueChangedListener};
use serde_json::Value;
use std::collections::BTreeMap;

/// A session's handle to a shared map.
#[derive(Clone)]
pub struct MemoryMap {
    backend: MemoryBackend,
    object: ObjectId,
    session: String,
}

impl MemoryMap {
    pub(crate) fn new(backend: MemoryBackend, object: ObjectId, session: &str) -> Self {
        Self {
            backend,
            object,
            session: session.to_string(),
        }
    }

    pub(crate) fn object(&self) -> ObjectId {
        self.object
    }

    fn ensure_connected(&self) -> Result<(), RemoteError> {
        if self.backend.is_live(&self.session) {
            Ok(())
        } else {
            Err(RemoteError::Disconnected)
        }
    }

    fn read<R>(&self, f: impl FnOnce(&BTreeMap<String, Value>) -> R) -> R {
        self.backend.with_state(|state| {
            let object = state.maps.entry(self.object).or_default();
            f(&object.entries)
        })
    }

    fn fire(&self, key: &str, old_value: Option<Value>, new_value: Option<Value>) {
        let targets = self.backend.with_state(|state| {
            state.maps.entry(self.object).or_default().listeners.targets()
        });
        deliver(targets, |listener_session| ValueChangedEvent {
            property: key.to_string(),
            old_value: old_value.clone(),
            new_value: new_value.clone(),
            is_local: listener_session == self.session,
        });
    }
}

impl RemoteMap for MemoryMap {
    fn get(&self, key: &str) -> Option<Value> {
        self.read(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<Option<Value>, RemoteError> {
        self.ensure_connected()?;
        let previous = self.backend.with_state(|state| {
            state
                .maps
                .entry(self.object)
                .or_default()
                .entries
                .insert(key.to_string(), value.clone())
        });
        tracing::debug!(session = %self.session, key, replaced = previous.is_some(), "Set map value");

        self.fire(key, previous.clone(), Some(value));
        Ok(previous)
    }

    fn has(&self, key: &str) -> bool {
        self.read(|entries| entries.contains_key(key))
    }

    fn delete(&self, key: &str) -> Result<Option<Value>, RemoteError> {
        self.ensure_connected()?;
        let previous = self.backend.with_state(|state| {
            state.maps.entry(self.object).or_default().entries.remove(key)
        });

        if let Some(old_value) = &previous {
            tracing::debug!(session = %self.session, key, "Deleted map value");
            self.fire(key, Some(old_value.clone()), None);
        }
        Ok(previous)
    }

    fn clear(&self) -> Result<(), RemoteError> {
        self.ensure_connected()?;
        for key in self.keys() {
            self.delete(&key)?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.read(|entries| entries.keys().cloned().collect())
    }

    fn values(&self) -> Vec<Value> {
        self.read(|entries| entries.values().cloned().collect())
    }

    fn size(&self) -> usize {
        self.read(BTreeMap::len)
    }

    fn add_value_changed_listener(&self, listener: ValueChangedListener) -> ListenerId {
        self.backend.with_state(|state| {
            let id = state.allocate_listener();
            state
                .maps
                .entry(self.object)
                .or_default()
                .listeners
                .add(id, &self.session, listener);
            id
        })
    }

    fn remove_listener(&self, id: ListenerId) {
        self.backend.with_state(|state| {
            if let Some(object) = state.maps.get_mut(&self.object) {
                object.listeners.remove(id);
            }
        });
    }

    fn remove_all_event_listeners(&self) {
        self.backend.with_state(|state| {
            if let Some(object) = state.maps.get_mut(&self.object) {
                object.listeners.remove_session(&self.session);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtbridge_core::{Collaborator, RemoteDocument};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn values_are_shared_across_sessions() {
        let backend = MemoryBackend::new();
        let alice = backend.join(Collaborator::new("u1", "s1", "Alice", "#f00"));
        let bob = backend.join(Collaborator::new("u2", "s2", "Bob", "#0f0"));

        let map = alice.create_map();
        alice.set_root_map("shared", &map).unwrap();
        map.set("k", json!(1)).unwrap();

        let bob_map = bob.root_map("shared").unwrap();
        assert_eq!(bob_map.get("k"), Some(json!(1)));
        assert_eq!(bob_map.keys(), vec!["k".to_string()]);
        assert_eq!(bob_map.size(), 1);
    }

    #[test]
    fn events_carry_old_and_new_values() {
        let backend = MemoryBackend::new();
        let alice = backend.join(Collaborator::new("u1", "s1", "Alice", "#f00"));
        let bob = backend.join(Collaborator::new("u2", "s2", "Bob", "#0f0"));
        let map = alice.create_map();
        alice.set_root_map("shared", &map).unwrap();
        let bob_map = bob.root_map("shared").unwrap();

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        bob_map.add_value_changed_listener(Box::new(move |event: &ValueChangedEvent| {
            sink.borrow_mut().push(event.clone());
        }));

        map.set("k", json!("a")).unwrap();
        map.set("k", json!("b")).unwrap();
        map.delete("k").unwrap();
        map.delete("k").unwrap();

        let seen = events.borrow();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].old_value, None);
        assert_eq!(seen[1].old_value, Some(json!("a")));
        assert_eq!(seen[1].new_value, Some(json!("b")));
        assert_eq!(seen[2].new_value, None);
        assert!(seen.iter().all(|event| !event.is_local));
    }

    #[test]
    fn clear_deletes_every_key() {
        let backend = MemoryBackend::new();
        let alice = backend.join(Collaborator::new("u1", "s1", "Alice", "#f00"));
        let map = alice.create_map();
        map.set("a", json!(1)).unwrap();
        map.set("b", json!(2)).unwrap();

        let deletes = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&deletes);
        map.add_value_changed_listener(Box::new(move |event: &ValueChangedEvent| {
            if event.new_value.is_none() {
                *sink.borrow_mut() += 1;
            }
        }));

        map.clear().unwrap();
        assert_eq!(map.size(), 0);
        assert_eq!(*deletes.borrow(), 2);
    }

    #[test]
    fn remove_all_listeners_only_affects_own_session() {
        let backend = MemoryBackend::new();
        let alice = backend.join(Collaborator::new("u1", "s1", "Alice", "#f00"));
        let bob = backend.join(Collaborator::new("u2", "s2", "Bob", "#0f0"));
        let map = alice.create_map();
        alice.set_root_map("shared", &map).unwrap();
        let bob_map = bob.root_map("shared").unwrap();

        let counts = Rc::new(RefCell::new((0, 0)));
        let sink = Rc::clone(&counts);
        map.add_value_changed_listener(Box::new(move |_: &ValueChangedEvent| {
            sink.borrow_mut().0 += 1;
        }));
        let sink = Rc::clone(&counts);
        bob_map.add_value_changed_listener(Box::new(move |_: &ValueChangedEvent| {
            sink.borrow_mut().1 += 1;
        }));

        map.remove_all_event_listeners();
        bob_map.set("k", json!(1)).unwrap();

        assert_eq!(*counts.borrow(), (0, 1));
    }
}
