//! # rtbridge Core
//!
//! Shared vocabulary for bridging observable host primitives to a remote,
//! replicated backend.
//!
//! This crate provides:
//! - The immutable [`Collaborator`] identity record
//! - Canonical change notifications for strings ([`StringChange`]) and maps ([`MapChange`])
//! - Stateless translation of backend events into notifications, with echo suppression
//! - The contracts a backend must satisfy ([`RemoteText`], [`RemoteMap`], [`RemoteDocument`])
//! - UTF-16 index helpers shared by adapters and backends

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod change;
pub mod collaborator;
pub mod error;
pub mod remote;
pub mod text;
pub mod translate;

pub use change::{MapChange, MapChangeKind, StringChange, StringChangeKind};
pub use collaborator::Collaborator;
pub use error::{BridgeError, RemoteError};
pub use remote::{
    CollaboratorEvent, CollaboratorEventKind, CollaboratorListener, ListenerId, LiveCollaborator,
    RemoteDocument, RemoteMap, RemoteText, TextEvent, TextEventKind, TextListener,
    ValueChangedEvent, ValueChangedListener,
};
