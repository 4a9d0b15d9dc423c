//! Observable string over a remote text handle.

use crate::contract::{Disposable, Linkable};
use crate::notify::Subscribers;
use rtbridge_core::text::{utf16_len, utf16_slice};
use rtbridge_core::translate::translate_text_event;
use rtbridge_core::{BridgeError, ListenerId, RemoteText, StringChange, TextEvent, TextEventKind};
use std::cell::RefCell;
use std::rc::Rc;
use tokio::sync::mpsc;

#[derive(Default)]
struct StringState {
    subscribers: Subscribers<StringChange>,
    listeners: Vec<ListenerId>,
    disposed: bool,
}

struct StringInner<T> {
    handle: RefCell<Option<T>>,
    state: RefCell<StringState>,
}

impl<T> StringInner<T> {
    fn on_remote_event(&self, event: &TextEvent) {
        let mut state = self.state.borrow_mut();
        if state.disposed {
            tracing::trace!(kind = ?event.kind, "Ignoring text event after dispose");
            return;
        }
        if let Some(change) = translate_text_event(event) {
            tracing::debug!(
                kind = ?change.kind,
                start = change.start,
                end = change.end,
                "Forwarding remote text change"
            );
            state.subscribers.emit(&change);
        }
    }
}

/// A host-side observable string backed by a [`RemoteText`].
///
/// The adapter keeps no copy of the text; reads go to the handle. Each
/// mutation, whether made through this adapter or by another session, is
/// delivered to subscribers exactly once.
pub struct ObservableString<T: RemoteText + Clone + 'static> {
    inner: Rc<StringInner<T>>,
}

impl<T: RemoteText + Clone + 'static> ObservableString<T> {
    /// Wrap `handle` and start listening to its text events.
    #[must_use]
    pub fn new(handle: T) -> Self {
        let inner = Rc::new(StringInner {
            handle: RefCell::new(Some(handle.clone())),
            state: RefCell::new(StringState::default()),
        });

        let listeners = [TextEventKind::Inserted, TextEventKind::Deleted]
            .into_iter()
            .map(|kind| {
                let weak = Rc::downgrade(&inner);
                handle.add_listener(
                    kind,
                    Box::new(move |event: &TextEvent| {
                        if let Some(inner) = weak.upgrade() {
                            inner.on_remote_event(event);
                        }
                    }),
                )
            })
            .collect();
        inner.state.borrow_mut().listeners = listeners;

        Self { inner }
    }

    /// Receive every subsequent change.
    ///
    /// The stream ends when the adapter is disposed.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<StringChange> {
        let mut state = self.inner.state.borrow_mut();
        if state.disposed {
            let (_, rx) = mpsc::unbounded_channel();
            return rx;
        }
        state.subscribers.subscribe()
    }

    /// Number of open subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.borrow().subscribers.len()
    }

    /// Current text.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UseAfterDispose`] after disposal.
    pub fn text(&self) -> Result<String, BridgeError> {
        Ok(self.handle()?.text())
    }

    /// Length of the text in UTF-16 code units.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UseAfterDispose`] after disposal.
    pub fn len(&self) -> Result<usize, BridgeError> {
        Ok(utf16_len(&self.text()?))
    }

    /// Whether the text is empty.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UseAfterDispose`] after disposal.
    pub fn is_empty(&self) -> Result<bool, BridgeError> {
        Ok(self.text()?.is_empty())
    }

    /// Replace the whole text with `value`.
    ///
    /// Emits a `set` change covering the new text.
    ///
    /// # Errors
    ///
    /// Returns error if disposed or if the remote handle rejects the write.
    pub fn set_text(&self, value: &str) -> Result<(), BridgeError> {
        self.handle()?.set_text(value)?;
        self.emit(&StringChange::set(value));
        Ok(())
    }

    /// Insert `value` at UTF-16 `index`.
    ///
    /// # Errors
    ///
    /// Returns error if disposed or if the remote handle rejects the index.
    pub fn insert(&self, index: usize, value: &str) -> Result<(), BridgeError> {
        self.handle()?.insert_string(index, value)?;
        self.emit(&StringChange::insert(index, value));
        Ok(())
    }

    /// Remove the UTF-16 range `[start, end)`.
    ///
    /// The emitted change carries the removed text.
    ///
    /// # Errors
    ///
    /// Returns error if disposed or if the range does not address the
    /// current text.
    pub fn remove(&self, start: usize, end: usize) -> Result<(), BridgeError> {
        let handle = self.handle()?;
        // Must be read before the text is gone.
        let current = handle.text();
        let removed = utf16_slice(&current, start, end).map(str::to_owned);

        handle.remove_range(start, end)?;
        let Some(removed) = removed else {
            return Err(BridgeError::PreconditionViolation(format!(
                "range [{start}, {end}) does not address the current text"
            )));
        };
        self.emit(&StringChange::remove(start, removed));
        Ok(())
    }

    /// Remove all text. Same as `set_text("")`.
    ///
    /// # Errors
    ///
    /// Returns error if disposed or if the remote handle rejects the write.
    pub fn clear(&self) -> Result<(), BridgeError> {
        self.set_text("")
    }

    fn handle(&self) -> Result<T, BridgeError> {
        self.inner
            .handle
            .borrow()
            .clone()
            .ok_or(BridgeError::UseAfterDispose)
    }

    fn emit(&self, change: &StringChange) {
        self.inner.state.borrow_mut().subscribers.emit(change);
    }
}

impl<T: RemoteText + Clone + 'static> Linkable for ObservableString<T> {}

impl<T: RemoteText + Clone + 'static> Disposable for ObservableString<T> {
    fn dispose(&self) {
        let Some(handle) = self.inner.handle.borrow_mut().take() else {
            return;
        };
        let listeners = {
            let mut state = self.inner.state.borrow_mut();
            state.disposed = true;
            state.subscribers.clear();
            std::mem::take(&mut state.listeners)
        };
        let count = listeners.len();
        for id in listeners {
            handle.remove_listener(id);
        }
        tracing::debug!(listeners = count, "Disposed observable string");
    }

    fn is_disposed(&self) -> bool {
        self.inner.state.borrow().disposed
    }
}
