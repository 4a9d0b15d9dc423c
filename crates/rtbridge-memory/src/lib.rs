//! # rtbridge In-Memory Backend
//!
//! A single-process stand-in for a replicated document service.
//!
//! One [`MemoryBackend`] plays the server. Each [`MemoryBackend::join`] opens a
//! [`MemorySession`], the view of one connected client. Mutations made through
//! any session's handles are applied immediately and fired to the listeners of
//! every session, with `is_local` set only for the session that issued them.
//!
//! There is no conflict resolution: operations are applied in call order.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod backend;
mod map;
mod registry;
mod session;
mod text;

pub use backend::MemoryBackend;
pub use map::MemoryMap;
pub use session::MemorySession;
pub use text::MemoryText;
