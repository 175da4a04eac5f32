//! Participant identity and role types.
//!
//! A participant is a passive data holder: who they are, what they are called
//! and which language they read. The seat they occupy in a session carries the
//! mutable parts (role, pseudonym, history).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque chat identity of a participant.
///
/// Stable for the lifetime of a session. Ordered and hashable so it can key
/// registry indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub i64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ParticipantId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// One player's identity and locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Chat identity
    pub id: ParticipantId,

    /// Display name shown to other lobby members
    pub display_name: String,

    /// Locale tag used for every notice sent to this participant
    pub locale: String,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            locale: locale.into(),
        }
    }
}

/// Role held by a seated participant.
///
/// Every session member starts as `Lobby`. Role assignment turns the three
/// lobby seats into exactly one `Host`, one `Knight` and one `Knave`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Lobby,
    Host,
    Knight,
    Knave,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Host => "host",
            Self::Knight => "knight",
            Self::Knave => "knave",
        }
    }

    /// Knight and Knave answer the Host under pseudonyms.
    pub fn is_respondent(&self) -> bool {
        matches!(self, Self::Knight | Self::Knave)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
