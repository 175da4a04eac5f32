//! Session phase state machine.
//!
//! # State Diagram
//!
//! ```text
//! ┌──────────┐  third member joins  ┌────────────────┐
//! │  Lobby   │─────────────────────▶│ RoleAssignment │
//! └──────────┘                      └───────┬────────┘
//!                                           │ roles assigned
//!                                           ▼
//! ┌──────────┐  guess resolved      ┌────────────────┐
//! │ Finished │◀─────────────────────│   InProgress   │
//! └──────────┘  or forfeit          └────────────────┘
//! ```
//!
//! A lobby that empties is discarded by the registry rather than finished,
//! so `Lobby` has no edge to `Finished`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Waiting for the third participant
    #[default]
    Lobby,
    /// Roles and pseudonyms are being drawn
    RoleAssignment,
    /// Questions and answers are being relayed
    InProgress,
    /// Outcome decided (by guess or forfeit)
    Finished,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::RoleAssignment => "role_assignment",
            Self::InProgress => "in_progress",
            Self::Finished => "finished",
        }
    }

    /// Check if the session can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Apply an event, returning the next phase or an error.
    pub fn apply(self, event: PhaseEvent) -> Result<Self, InvalidTransition> {
        use PhaseEvent::*;
        use SessionPhase::*;

        let invalid = |reason: &'static str| InvalidTransition {
            from: self,
            event,
            reason,
        };

        match (self, event) {
            (Lobby, Fill) => Ok(RoleAssignment),
            (_, Fill) => Err(invalid("Only a lobby can fill up")),

            (RoleAssignment, Assigned) => Ok(InProgress),
            (_, Assigned) => Err(invalid("Roles are assigned once, right after the lobby fills")),

            (InProgress, Resolve) => Ok(Finished),
            (Finished, Resolve) => Err(invalid("Session already finished")),
            (_, Resolve) => Err(invalid("No game in progress")),

            (InProgress, Forfeit) => Ok(Finished),
            (Finished, Forfeit) => Err(invalid("Session already finished")),
            (_, Forfeit) => Err(invalid("Only a running game can be forfeited")),
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase transition events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    Fill,
    Assigned,
    Resolve,
    Forfeit,
}

/// Error when a phase transition is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid transition from {from} via {event:?}: {reason}")]
pub struct InvalidTransition {
    pub from: SessionPhase,
    pub event: PhaseEvent,
    pub reason: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let phase = SessionPhase::default();
        assert_eq!(phase, SessionPhase::Lobby);

        let phase = phase.apply(PhaseEvent::Fill).unwrap();
        assert_eq!(phase, SessionPhase::RoleAssignment);

        let phase = phase.apply(PhaseEvent::Assigned).unwrap();
        assert_eq!(phase, SessionPhase::InProgress);

        let phase = phase.apply(PhaseEvent::Resolve).unwrap();
        assert!(phase.is_terminal());
    }

    #[test]
    fn test_forfeit_only_from_in_progress() {
        assert_eq!(
            SessionPhase::InProgress.apply(PhaseEvent::Forfeit),
            Ok(SessionPhase::Finished)
        );
        assert!(SessionPhase::Lobby.apply(PhaseEvent::Forfeit).is_err());
        assert!(SessionPhase::Finished.apply(PhaseEvent::Forfeit).is_err());
    }

    #[test]
    fn test_finished_is_final() {
        for event in [
            PhaseEvent::Fill,
            PhaseEvent::Assigned,
            PhaseEvent::Resolve,
            PhaseEvent::Forfeit,
        ] {
            assert!(SessionPhase::Finished.apply(event).is_err());
        }
    }

    #[test]
    fn test_display() {
        let err = SessionPhase::Lobby.apply(PhaseEvent::Resolve).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid transition from lobby via Resolve: No game in progress"
        );
    }
}
