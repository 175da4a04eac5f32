//! Turn arbitration while a session is in progress.
//!
//! # Transition Table
//!
//! ```text
//! state        sender   guard            next
//! ───────────  ───────  ───────────────  ─────────────────────────────────
//! HostTurn     Host     -                RespondentsTurn (flags cleared)
//! Respondents  Knight   !knight_answered Respondents, or HostTurn if knave done
//! Respondents  Knave    !knave_answered  Respondents, or HostTurn if knight done
//! any          other    -                rejected (NotYourTurn), unchanged
//! ```
//!
//! `TurnState::advance` is the single source of truth for which role may
//! speak. A rejected message is never relayed and never recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::SessionError;
use super::notice::{keys, Author, Notice, Text};
use super::participant::{ParticipantId, Role};
use super::phase::SessionPhase;
use super::session::Session;

/// Whose move it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    #[default]
    Host,
    Respondents,
}

/// Turn flags.
///
/// While `whose_turn == Host` both answered flags are false. While
/// `whose_turn == Respondents` they record exactly who answered since the
/// last Host message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TurnState {
    pub whose_turn: Turn,
    pub knight_answered: bool,
    pub knave_answered: bool,
    /// Set by the first Host message; never cleared
    pub host_answered: bool,
}

/// Effect of an accepted message on the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Host asked; both respondents may now answer
    Asked,
    /// One respondent answered, the other is still due
    Waiting,
    /// Both respondents answered; back to the Host
    RoundComplete,
}

impl TurnState {
    /// Check if a role may send now.
    pub fn accepts(&self, role: Role) -> bool {
        match (self.whose_turn, role) {
            (Turn::Host, Role::Host) => true,
            (Turn::Respondents, Role::Knight) => !self.knight_answered,
            (Turn::Respondents, Role::Knave) => !self.knave_answered,
            _ => false,
        }
    }

    /// Apply an accepted message from `role`. Leaves the state untouched on
    /// rejection.
    pub fn advance(&mut self, role: Role) -> Result<Advance, SessionError> {
        if !self.accepts(role) {
            return Err(SessionError::NotYourTurn);
        }

        match role {
            Role::Host => {
                self.whose_turn = Turn::Respondents;
                self.knight_answered = false;
                self.knave_answered = false;
                self.host_answered = true;
                return Ok(Advance::Asked);
            }
            Role::Knight => self.knight_answered = true,
            Role::Knave => self.knave_answered = true,
            Role::Lobby => return Err(SessionError::NotYourTurn),
        }

        if self.knight_answered && self.knave_answered {
            self.whose_turn = Turn::Host;
            self.knight_answered = false;
            self.knave_answered = false;
            Ok(Advance::RoundComplete)
        } else {
            Ok(Advance::Waiting)
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "whose_turn": match self.whose_turn {
                Turn::Host => "host",
                Turn::Respondents => "respondents",
            },
            "knight_answered": self.knight_answered,
            "knave_answered": self.knave_answered,
        })
    }
}

impl Session {
    /// Relay a chat message according to the turn table.
    pub fn submit_message(
        &mut self,
        sender: ParticipantId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notice>, SessionError> {
        let role = self.role_of(sender).ok_or(SessionError::NotInSession)?;
        match self.phase {
            SessionPhase::Lobby | SessionPhase::RoleAssignment => {
                return Err(SessionError::StillInLobby {
                    members: self.member_count(),
                });
            }
            SessionPhase::Finished => return Err(SessionError::SessionAlreadyFinished),
            SessionPhase::InProgress => {}
        }

        let advance = match self.turn.advance(role) {
            Ok(advance) => advance,
            Err(err) => {
                tracing::debug!(session = %self.id, %sender, %role, "message rejected: not their turn");
                return Err(err);
            }
        };
        self.record(sender, text, now);

        let mut notices = Vec::new();
        match role {
            Role::Host => {
                let relay = Text::Relay {
                    author: Author::Host,
                    body: text.to_string(),
                };
                for respondent in [Role::Knight, Role::Knave] {
                    if let Some(seat) = self.seat_by_role(respondent) {
                        notices.extend(self.notice_to(seat.id(), relay.clone()));
                    }
                }
            }
            Role::Knight | Role::Knave => {
                let host = self.seat_by_role(Role::Host).map(|s| s.id());
                let author = Author::Pseudonym(self.pseudonym_of(role).unwrap_or_default().to_string());
                if let Some(host) = host {
                    notices.extend(self.notice_to(
                        host,
                        Text::Relay {
                            author,
                            body: text.to_string(),
                        },
                    ));
                    if advance == Advance::RoundComplete {
                        notices.extend(self.notice_to(host, Text::Key(keys::YOUR_TURN)));
                    }
                }
            }
            Role::Lobby => {}
        }

        tracing::debug!(session = %self.id, %sender, %role, ?advance, "message relayed");
        Ok(notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_initial_turn_is_host() {
        let turn = TurnState::default();
        assert_eq!(turn.whose_turn, Turn::Host);
        assert!(turn.accepts(Role::Host));
        assert!(!turn.accepts(Role::Knight));
        assert!(!turn.accepts(Role::Knave));
        assert!(!turn.accepts(Role::Lobby));
    }

    #[test]
    fn test_round() {
        let mut turn = TurnState::default();

        assert_eq!(turn.advance(Role::Host), Ok(Advance::Asked));
        assert_eq!(turn.whose_turn, Turn::Respondents);
        assert!(!turn.knight_answered && !turn.knave_answered);
        assert_eq!(turn.advance(Role::Host), Err(SessionError::NotYourTurn));

        assert_eq!(turn.advance(Role::Knight), Ok(Advance::Waiting));
        assert_eq!(turn.advance(Role::Knight), Err(SessionError::NotYourTurn));
        assert!(turn.knight_answered);

        assert_eq!(turn.advance(Role::Knave), Ok(Advance::RoundComplete));
        assert_eq!(turn.whose_turn, Turn::Host);
        assert!(!turn.knight_answered && !turn.knave_answered);
        assert!(turn.host_answered);
    }

    #[test]
    fn test_arrival_order_does_not_matter() {
        let mut a = TurnState::default();
        a.advance(Role::Host).unwrap();
        a.advance(Role::Knight).unwrap();
        a.advance(Role::Knave).unwrap();

        let mut b = TurnState::default();
        b.advance(Role::Host).unwrap();
        b.advance(Role::Knave).unwrap();
        b.advance(Role::Knight).unwrap();

        assert_eq!(a, b);
    }

    fn role() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::Lobby),
            Just(Role::Host),
            Just(Role::Knight),
            Just(Role::Knave),
        ]
    }

    proptest! {
        #[test]
        fn prop_flags_match_turn(roles in prop::collection::vec(role(), 0..64)) {
            let mut turn = TurnState::default();
            for role in roles {
                let before = turn;
                if turn.advance(role).is_err() {
                    prop_assert_eq!(turn, before);
                }
                if turn.whose_turn == Turn::Host {
                    prop_assert!(!turn.knight_answered && !turn.knave_answered);
                } else {
                    prop_assert!(!(turn.knight_answered && turn.knave_answered));
                }
            }
        }
    }
}
