//! Observable roster of collaborating sessions.
//!
//! The roster mirrors a shared map, keyed by session id, that every connected
//! client writes its view of the collaborator list into.
//!
//! ## Lifecycle
//!
//! ```text
//! new()                    listeners registered, join/leave queued
//!   │
//!   ▼
//! ready().await            live list read, stale entries pruned,
//!   │                      missing entries inserted, queue replayed
//!   ▼
//! join / leave / remote    add, change, remove notifications
//! map writes
//!   │
//!   ▼
//! dispose()                listeners removed, shared map cleared
//! ```

use crate::config::BridgeConfig;
use crate::contract::{Disposable, Linkable};
use crate::notify::Subscribers;
use rtbridge_core::translate::{decode_value, encode_value, translate_value_changed};
use rtbridge_core::{
    BridgeError, Collaborator, CollaboratorEvent, CollaboratorEventKind, ListenerId, MapChange,
    RemoteDocument, RemoteMap, ValueChangedEvent,
};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use tokio::sync::{mpsc, OnceCell};

/// Notification type emitted by the roster.
pub type RosterChange = MapChange<Collaborator>;

#[derive(Default)]
struct RosterState {
    subscribers: Subscribers<RosterChange>,
    map_listener: Option<ListenerId>,
    collaborator_listeners: Vec<ListenerId>,
    local: Option<Collaborator>,
    /// Join/leave events received before reconciliation finished
    pending: VecDeque<CollaboratorEvent>,
    reconciled: bool,
    disposed: bool,
}

struct RosterInner<D: RemoteDocument> {
    config: BridgeConfig,
    document: RefCell<Option<D>>,
    map: RefCell<Option<D::Map>>,
    state: RefCell<RosterState>,
    ready: OnceCell<()>,
}

impl<D: RemoteDocument + Clone + 'static> RosterInner<D> {
    fn document(&self) -> Result<D, BridgeError> {
        self.document
            .borrow()
            .clone()
            .ok_or(BridgeError::UseAfterDispose)
    }

    fn map(&self) -> Result<D::Map, BridgeError> {
        self.map.borrow().clone().ok_or(BridgeError::UseAfterDispose)
    }

    fn emit(&self, change: &RosterChange) {
        self.state.borrow_mut().subscribers.emit(change);
    }

    /// Decode a stored record, logging and discarding malformed values.
    fn decoded(key: &str, value: Value) -> Option<Collaborator> {
        match decode_value(key, value) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(error = %err, key, "Ignoring malformed collaborator record");
                None
            }
        }
    }

    async fn reconcile(&self) -> Result<(), BridgeError> {
        let document = self.document()?;
        let live = document.collaborators().await?;
        // Disposal may have happened while the live list was loading.
        let map = self.map()?;

        let live_ids: HashSet<&str> = live.iter().map(|member| member.session_id.as_str()).collect();
        let mut pruned = 0usize;
        for key in map.keys() {
            if !live_ids.contains(key.as_str()) {
                map.delete(&key)?;
                pruned += 1;
            }
        }

        let mut inserted = 0usize;
        let mut local = None;
        for member in &live {
            let record = Collaborator::from(member);
            if !map.has(&member.session_id) {
                map.set(&member.session_id, encode_value(&record)?)?;
                inserted += 1;
            }
            if member.is_me {
                local = Some(record);
            }
        }
        let local_session = local.as_ref().map(|record| record.session_id().to_string());
        self.state.borrow_mut().local = local;

        let mut replayed = 0usize;
        loop {
            let next = self.state.borrow_mut().pending.pop_front();
            let Some(event) = next else {
                break;
            };
            if let Err(err) = self.apply_collaborator_event(&event) {
                self.state.borrow_mut().pending.push_front(event);
                return Err(err);
            }
            replayed += 1;
        }
        self.state.borrow_mut().reconciled = true;

        tracing::info!(
            live = live.len(),
            pruned,
            inserted,
            replayed,
            local_session = ?local_session,
            "Collaborator roster ready"
        );
        Ok(())
    }

    fn on_collaborator_event(&self, event: &CollaboratorEvent) {
        {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            if !state.reconciled {
                tracing::debug!(
                    kind = ?event.kind,
                    session_id = %event.collaborator.session_id,
                    "Queued collaborator event until roster is ready"
                );
                state.pending.push_back(event.clone());
                return;
            }
        }

        if let Err(err) = self.apply_collaborator_event(event) {
            tracing::warn!(
                error = %err,
                kind = ?event.kind,
                session_id = %event.collaborator.session_id,
                "Failed to apply collaborator event"
            );
        }
    }

    fn apply_collaborator_event(&self, event: &CollaboratorEvent) -> Result<(), BridgeError> {
        let map = self.map()?;
        let session_id = event.collaborator.session_id.as_str();

        match event.kind {
            CollaboratorEventKind::Joined => {
                let record = Collaborator::from(&event.collaborator);
                if event.collaborator.is_me {
                    self.state.borrow_mut().local = Some(record.clone());
                }

                // A malformed stored value is invisible to subscribers, so
                // overwriting it announces an add.
                let existed = map.has(session_id);
                let previous = map
                    .get(session_id)
                    .and_then(|value| Self::decoded(session_id, value));
                if previous.as_ref() == Some(&record) {
                    tracing::trace!(session_id, "Joined collaborator already current");
                    return Ok(());
                }

                map.set(session_id, encode_value(&record)?)?;
                tracing::debug!(
                    session_id,
                    existed,
                    replaced_malformed = existed && previous.is_none(),
                    "Collaborator joined"
                );
                if let Some(change) = MapChange::classify(session_id, previous, Some(record)) {
                    self.emit(&change);
                }
            }
            CollaboratorEventKind::Left => {
                {
                    let mut state = self.state.borrow_mut();
                    if state
                        .local
                        .as_ref()
                        .is_some_and(|local| local.session_id() == session_id)
                    {
                        state.local = None;
                    }
                }

                let removed = map
                    .delete(session_id)?
                    .and_then(|value| Self::decoded(session_id, value));
                tracing::debug!(session_id, existed = removed.is_some(), "Collaborator left");
                if let Some(old_value) = removed {
                    self.emit(&MapChange::Remove {
                        key: session_id.to_string(),
                        old_value,
                    });
                }
            }
        }
        Ok(())
    }

    fn on_value_changed(&self, event: &ValueChangedEvent) {
        if self.state.borrow().disposed {
            return;
        }
        if let Some(change) = translate_value_changed::<Collaborator>(event) {
            tracing::debug!(
                key = %change.key(),
                kind = ?change.kind(),
                "Forwarding remote roster change"
            );
            self.emit(&change);
        }
    }
}

/// A host-side observable map of collaborator sessions.
///
/// Backed by the shared map registered on the document root under
/// [`BridgeConfig::roster_map_id`]. The roster holds no copy of the entries;
/// every read goes to the map.
///
/// Contents are not reliable until [`ready`](Self::ready) has completed.
pub struct CollaboratorRoster<D: RemoteDocument + Clone + 'static> {
    inner: Rc<RosterInner<D>>,
}

impl<D: RemoteDocument + Clone + 'static> CollaboratorRoster<D> {
    /// Attach to the collaborator map of `document`, creating it if missing.
    ///
    /// Returns immediately with a roster that is not yet ready.
    ///
    /// # Errors
    ///
    /// Returns error if the map has to be created and the document rejects
    /// registering it.
    pub fn new(document: D, config: BridgeConfig) -> Result<Self, BridgeError> {
        let map = if let Some(map) = document.root_map(&config.roster_map_id) {
            map
        } else {
            let map = document.create_map();
            document.set_root_map(&config.roster_map_id, &map)?;
            tracing::debug!(id = %config.roster_map_id, "Created collaborator map");
            map
        };

        let inner = Rc::new(RosterInner {
            config,
            document: RefCell::new(Some(document.clone())),
            map: RefCell::new(Some(map.clone())),
            state: RefCell::new(RosterState::default()),
            ready: OnceCell::new(),
        });

        let weak = Rc::downgrade(&inner);
        let map_listener = map.add_value_changed_listener(Box::new(move |event: &ValueChangedEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.on_value_changed(event);
            }
        }));
        let collaborator_listeners: Vec<ListenerId> = [CollaboratorEventKind::Joined, CollaboratorEventKind::Left]
            .into_iter()
            .map(|kind| {
                let weak = Rc::downgrade(&inner);
                document.add_collaborator_listener(
                    kind,
                    Box::new(move |event: &CollaboratorEvent| {
                        if let Some(inner) = weak.upgrade() {
                            inner.on_collaborator_event(event);
                        }
                    }),
                )
            })
            .collect();

        {
            let mut state = inner.state.borrow_mut();
            state.map_listener = Some(map_listener);
            state.collaborator_listeners = collaborator_listeners;
        }

        Ok(Self { inner })
    }

    /// Wait until the roster has been reconciled with the live session list.
    ///
    /// Reconciliation runs once; concurrent and later callers share its
    /// outcome. A failed attempt is retried by the next call.
    ///
    /// # Errors
    ///
    /// Returns error if the live list cannot be read, the shared map rejects
    /// an update, or the roster was disposed.
    pub async fn ready(&self) -> Result<(), BridgeError> {
        self.inner
            .ready
            .get_or_try_init(|| self.inner.reconcile())
            .await?;
        Ok(())
    }

    /// Whether reconciliation has completed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.state.borrow().reconciled
    }

    /// The record of this process's own session, once known.
    #[must_use]
    pub fn local_collaborator(&self) -> Option<Collaborator> {
        self.inner.state.borrow().local.clone()
    }

    /// Receive every subsequent change.
    ///
    /// The stream ends when the roster is disposed.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RosterChange> {
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

    /// Record stored under `session_id`.
    ///
    /// # Errors
    ///
    /// Returns error if disposed or if the stored value is malformed.
    pub fn get(&self, session_id: &str) -> Result<Option<Collaborator>, BridgeError> {
        self.inner
            .map()?
            .get(session_id)
            .map(|value| decode_value(session_id, value))
            .transpose()
    }

    /// Whether `session_id` is present.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UseAfterDispose`] after disposal.
    pub fn has(&self, session_id: &str) -> Result<bool, BridgeError> {
        Ok(self.inner.map()?.has(session_id))
    }

    /// All session ids.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UseAfterDispose`] after disposal.
    pub fn keys(&self) -> Result<Vec<String>, BridgeError> {
        Ok(self.inner.map()?.keys())
    }

    /// All well-formed records.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UseAfterDispose`] after disposal.
    pub fn values(&self) -> Result<Vec<Collaborator>, BridgeError> {
        Ok(self.entries()?.into_iter().map(|(_, record)| record).collect())
    }

    /// All well-formed `(session id, record)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UseAfterDispose`] after disposal.
    pub fn entries(&self) -> Result<Vec<(String, Collaborator)>, BridgeError> {
        let map = self.inner.map()?;
        Ok(map
            .keys()
            .into_iter()
            .filter_map(|key| {
                let record = RosterInner::<D>::decoded(&key, map.get(&key)?)?;
                Some((key, record))
            })
            .collect())
    }

    /// Number of entries.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UseAfterDispose`] after disposal.
    pub fn len(&self) -> Result<usize, BridgeError> {
        Ok(self.inner.map()?.size())
    }

    /// Whether the roster has no entries.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UseAfterDispose`] after disposal.
    pub fn is_empty(&self) -> Result<bool, BridgeError> {
        Ok(self.len()? == 0)
    }

    /// Store `record` under `session_id`, returning the previous record.
    ///
    /// Emits `add` or `change`.
    ///
    /// # Errors
    ///
    /// Returns error if disposed or if the map rejects the write.
    pub fn set(
        &self,
        session_id: &str,
        record: Collaborator,
    ) -> Result<Option<Collaborator>, BridgeError> {
        let map = self.inner.map()?;
        let previous = map
            .set(session_id, encode_value(&record)?)?
            .and_then(|value| RosterInner::<D>::decoded(session_id, value));
        if let Some(change) = MapChange::classify(session_id, previous.clone(), Some(record)) {
            self.inner.emit(&change);
        }
        Ok(previous)
    }

    /// Remove `session_id`, returning its record.
    ///
    /// Emits `remove` if an entry existed.
    ///
    /// # Errors
    ///
    /// Returns error if disposed or if the map rejects the write.
    pub fn delete(&self, session_id: &str) -> Result<Option<Collaborator>, BridgeError> {
        let map = self.inner.map()?;
        let previous = map
            .delete(session_id)?
            .and_then(|value| RosterInner::<D>::decoded(session_id, value));
        if let Some(old_value) = &previous {
            self.inner.emit(&MapChange::Remove {
                key: session_id.to_string(),
                old_value: old_value.clone(),
            });
        }
        Ok(previous)
    }

    /// Remove every entry, emitting `remove` for each.
    ///
    /// # Errors
    ///
    /// Returns error if disposed or if the map rejects a write.
    pub fn clear(&self) -> Result<(), BridgeError> {
        for key in self.keys()? {
            self.delete(&key)?;
        }
        Ok(())
    }
}

impl<D: RemoteDocument + Clone + 'static> Linkable for CollaboratorRoster<D> {}

impl<D: RemoteDocument + Clone + 'static> Disposable for CollaboratorRoster<D> {
    fn dispose(&self) {
        let inner = &self.inner;
        let (map_listener, collaborator_listeners) = {
            let mut state = inner.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.subscribers.clear();
            state.pending.clear();
            state.local = None;
            (
                state.map_listener.take(),
                std::mem::take(&mut state.collaborator_listeners),
            )
        };

        let map = inner.map.borrow_mut().take();
        let document = inner.document.borrow_mut().take();

        if let Some(map) = map {
            if let Some(id) = map_listener {
                map.remove_listener(id);
            }
            if inner.config.clear_on_dispose {
                if let Err(err) = map.clear() {
                    tracing::warn!(error = %err, "Failed to clear collaborator map on dispose");
                }
            }
        }
        if let Some(document) = document {
            for id in collaborator_listeners {
                document.remove_listener(id);
            }
        }

        tracing::info!(id = %inner.config.roster_map_id, "Disposed collaborator roster");
    }

    fn is_disposed(&self) -> bool {
        self.inner.state.borrow().disposed
    }
}
