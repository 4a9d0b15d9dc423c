//! # rtbridge Observable Adapters
//!
//! Host-facing observable primitives kept in sync with a remote replicated
//! backend.
//!
//! - [`ObservableString`] wraps a [`RemoteText`](rtbridge_core::RemoteText)
//! - [`CollaboratorRoster`] wraps the shared collaborator map of a
//!   [`RemoteDocument`](rtbridge_core::RemoteDocument)
//!
//! Local calls push operations to the remote handle and notify subscribers
//! immediately. Remote events are translated into the same notifications,
//! except for echoes of this session's own operations, so each mutation
//! reaches a subscriber exactly once.
//!
//! Adapters are single-threaded (`!Send`) and must be driven from one event
//! loop.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod contract;
mod notify;
pub mod roster;
pub mod string;

pub use config::{BridgeConfig, ConfigError};
pub use contract::{Disposable, Linkable};
pub use roster::{CollaboratorRoster, RosterChange};
pub use string::ObservableString;
