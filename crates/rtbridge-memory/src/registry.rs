//! Listener bookkeeping.

use rtbridge_core::ListenerId;
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) type Callback<E> = Rc<RefCell<Box<dyn FnMut(&E)>>>;

struct Entry<E> {
    id: ListenerId,
    session: String,
    callback: Callback<E>,
}

/// Listeners registered for one event type on one object.
pub(crate) struct Registry<E> {
    entries: Vec<Entry<E>>,
}

impl<E> Default for Registry<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E> Registry<E> {
    pub(crate) fn add(&mut self, id: ListenerId, session: &str, callback: Box<dyn FnMut(&E)>) {
        self.entries.push(Entry {
            id,
            session: session.to_string(),
            callback: Rc::new(RefCell::new(callback)),
        });
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub(crate) fn remove_session(&mut self, session: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.session != session);
        before - self.entries.len()
    }

    /// Snapshot of current listeners, so callbacks run without the backend borrowed.
    pub(crate) fn targets(&self) -> Vec<(String, Callback<E>)> {
        self.entries
            .iter()
            .map(|entry| (entry.session.clone(), Rc::clone(&entry.callback)))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Invoke each target with the event built for its session.
pub(crate) fn deliver<E>(targets: Vec<(String, Callback<E>)>, mut event_for: impl FnMut(&str) -> E) {
    for (session, callback) in targets {
        let event = event_for(&session);
        match callback.try_borrow_mut() {
            Ok(mut callback) => (callback)(&event),
            Err(_) => {
                tracing::warn!(session, "Skipping re-entrant listener invocation");
            }
        }
    }
}
