//! Collaborator identity records.

use crate::remote::LiveCollaborator;
use serde::{Deserialize, Serialize};

/// Identity of one connected collaborator session.
///
/// Records are immutable once built. `session_id` is unique within a roster;
/// the same `user_id` may appear under several sessions when one person is
/// connected from more than one place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    user_id: String,
    session_id: String,
    display_name: String,
    color: String,
}

impl Collaborator {
    /// Create a new record.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        display_name: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            display_name: display_name.into(),
            color: color.into(),
        }
    }

    /// Backend user identifier.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Session identifier, the roster key.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Human-readable name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Display color, as reported by the backend (e.g. `#4285f4`).
    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }
}

impl From<&LiveCollaborator> for Collaborator {
    fn from(live: &LiveCollaborator) -> Self {
        Self::new(
            live.user_id.clone(),
            live.session_id.clone(),
            live.display_name.clone(),
            live.color.clone(),
        )
    }
}

impl std::fmt::Display for Collaborator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}/{})", self.display_name, self.user_id, self.session_id)
    }
}
