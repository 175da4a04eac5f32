//! Session state.
//!
//! A session owns a fixed three-slot seat array. Participants never point back
//! at their session; the registry maps identities to session ids instead.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::SessionError;
use super::notice::{keys, Notice, Text};
use super::participant::{Participant, ParticipantId, Role};
use super::phase::{InvalidTransition, PhaseEvent, SessionPhase};
use super::turn::TurnState;

/// Participants per session.
pub const SESSION_SIZE: usize = 3;

/// Registry-assigned session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// How roles are drawn once the lobby fills. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentPolicy {
    /// The creator asks the questions; the others are split at random
    #[default]
    CreatorIsHost,
    /// Uniform random permutation of all three members
    Random,
}

impl AssignmentPolicy {
    pub fn from_random_flag(random: bool) -> Self {
        if random {
            Self::Random
        } else {
            Self::CreatorIsHost
        }
    }

    pub fn is_random(&self) -> bool {
        matches!(self, Self::Random)
    }
}

/// One relayed message, as kept for archival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub role: Role,
    pub text: String,
    /// Whole seconds since the game started
    pub offset_secs: i64,
}

/// A participant's place in a session.
#[derive(Debug, Clone)]
pub struct Seat {
    pub participant: Participant,
    pub role: Role,
    /// Only respondents carry a pseudonym
    pub pseudonym: Option<String>,
    /// Append-only
    pub history: Vec<MessageRecord>,
    pub joined_at: DateTime<Utc>,
}

impl Seat {
    fn new(participant: Participant, now: DateTime<Utc>) -> Self {
        Self {
            participant,
            role: Role::Lobby,
            pseudonym: None,
            history: Vec::new(),
            joined_at: now,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.participant.id
    }

    fn notice(&self, text: Text) -> Notice {
        Notice::new(self.participant.id, self.participant.locale.clone(), text)
    }
}

/// Per-participant numbers reported when a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    pub messages: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: i64,
}

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ending {
    /// The Host submitted a guess
    Guessed,
    /// A participant left mid-game
    Forfeited,
    /// Closed by the idle sweep
    Abandoned,
}

/// One participant's messages in a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantHistory {
    pub participant: ParticipantId,
    pub role: Role,
    pub messages: Vec<MessageRecord>,
}

/// Immutable record of a finished session handed to the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub host: ParticipantId,
    pub knight: ParticipantId,
    pub knave: ParticipantId,
    pub histories: Vec<ParticipantHistory>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub successful: bool,
    pub finished: bool,
    pub ending: Ending,
}

/// Per-game mutable state.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,

    pub phase: SessionPhase,

    pub policy: AssignmentPolicy,

    /// Fixed Host under `CreatorIsHost`; handed over if the creator leaves the lobby
    pub creator: ParticipantId,

    pub created_at: DateTime<Utc>,

    /// When roles were assigned; message offsets count from here
    pub started_at: Option<DateTime<Utc>>,

    pub ended_at: Option<DateTime<Utc>>,

    /// Last membership change or relayed message
    pub last_activity: DateTime<Utc>,

    pub turn: TurnState,

    /// True once the Host guessed the correct respondent
    pub successful: bool,

    pub ending: Option<Ending>,

    seats: [Option<Seat>; SESSION_SIZE],

    /// Respondent whose pseudonym wins the reveal; never shown before it
    correct: Option<ParticipantId>,
}

impl Session {
    /// Create a lobby with the creator as sole member.
    pub fn new(id: SessionId, creator: Participant, policy: AssignmentPolicy, now: DateTime<Utc>) -> Self {
        let creator_id = creator.id;
        Self {
            id,
            phase: SessionPhase::Lobby,
            policy,
            creator: creator_id,
            created_at: now,
            started_at: None,
            ended_at: None,
            last_activity: now,
            turn: TurnState::default(),
            successful: false,
            ending: None,
            seats: [Some(Seat::new(creator, now)), None, None],
            correct: None,
        }
    }

    /// Seat a new lobby member. Returns true once the lobby is full.
    pub fn add_member(&mut self, participant: Participant, now: DateTime<Utc>) -> Result<bool, SessionError> {
        if self.phase != SessionPhase::Lobby {
            return Err(SessionError::TargetNotInLobby);
        }
        if self.has_member(participant.id) {
            return Err(SessionError::AlreadyInSession);
        }

        let slot = self
            .seats
            .iter_mut()
            .find(|s| s.is_none())
            .ok_or(SessionError::TargetNotInLobby)?;
        *slot = Some(Seat::new(participant, now));
        self.last_activity = now;

        Ok(self.is_full())
    }

    /// Remove a member's seat.
    pub fn remove_member(&mut self, id: ParticipantId) -> Option<Seat> {
        let seat = self
            .seats
            .iter_mut()
            .find(|s| s.as_ref().is_some_and(|s| s.id() == id))?
            .take()?;

        // If the creator left, the longest-waiting member takes over
        if self.creator == id {
            if let Some(next) = self.seats().min_by_key(|s| s.joined_at) {
                self.creator = next.id();
            }
        }

        Some(seat)
    }

    pub fn member_count(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    pub fn is_full(&self) -> bool {
        self.member_count() >= SESSION_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.member_count() == 0
    }

    pub fn has_member(&self, id: ParticipantId) -> bool {
        self.seat(id).is_some()
    }

    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.seats.iter().flatten()
    }

    pub(crate) fn seats_mut(&mut self) -> impl Iterator<Item = &mut Seat> {
        self.seats.iter_mut().flatten()
    }

    pub fn member_ids(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.seats().map(Seat::id)
    }

    pub fn seat(&self, id: ParticipantId) -> Option<&Seat> {
        self.seats().find(|s| s.id() == id)
    }

    pub(crate) fn seat_mut(&mut self, id: ParticipantId) -> Option<&mut Seat> {
        self.seats_mut().find(|s| s.id() == id)
    }

    /// The seat holding a role. `Lobby` matches the first lobby seat.
    pub fn seat_by_role(&self, role: Role) -> Option<&Seat> {
        self.seats().find(|s| s.role == role)
    }

    pub fn role_of(&self, id: ParticipantId) -> Option<Role> {
        self.seat(id).map(|s| s.role)
    }

    pub fn pseudonym_of(&self, role: Role) -> Option<&str> {
        self.seat_by_role(role).and_then(|s| s.pseudonym.as_deref())
    }

    /// Respondent seat answering to a pseudonym.
    pub fn respondent_by_pseudonym(&self, pseudonym: &str) -> Option<&Seat> {
        self.seats()
            .find(|s| s.role.is_respondent() && s.pseudonym.as_deref() == Some(pseudonym))
    }

    pub(crate) fn correct_respondent(&self) -> Option<ParticipantId> {
        self.correct
    }

    pub(crate) fn set_correct_respondent(&mut self, id: ParticipantId) {
        self.correct = Some(id);
    }

    pub(crate) fn apply_phase(&mut self, event: PhaseEvent) -> Result<(), InvalidTransition> {
        self.phase = self.phase.apply(event)?;
        Ok(())
    }

    /// Append to a member's history. Offsets count from game start.
    pub(crate) fn record(&mut self, id: ParticipantId, text: &str, now: DateTime<Utc>) {
        let offset_secs = self.elapsed_secs(now);
        if let Some(seat) = self.seat_mut(id) {
            seat.history.push(MessageRecord {
                role: seat.role,
                text: text.to_string(),
                offset_secs,
            });
        }
        self.last_activity = now;
    }

    /// Mark the session finished.
    pub(crate) fn finish(&mut self, ending: Ending, successful: bool, now: DateTime<Utc>) -> Result<(), SessionError> {
        let event = match ending {
            Ending::Guessed => PhaseEvent::Resolve,
            Ending::Forfeited | Ending::Abandoned => PhaseEvent::Forfeit,
        };
        self.apply_phase(event).map_err(|err| {
            if err.from.is_terminal() {
                SessionError::SessionAlreadyFinished
            } else {
                SessionError::from(err)
            }
        })?;

        self.successful = successful;
        self.ending = Some(ending);
        self.ended_at = Some(now);
        self.last_activity = now;
        Ok(())
    }

    fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        self.started_at
            .map(|start| (now - start).num_seconds().max(0))
            .unwrap_or(0)
    }

    /// Check if nothing happened for longer than `max_idle`.
    pub fn is_idle(&self, now: DateTime<Utc>, max_idle: chrono::Duration) -> bool {
        now - self.last_activity > max_idle
    }

    pub fn statistics(&self, id: ParticipantId, now: DateTime<Utc>) -> Option<Statistics> {
        let seat = self.seat(id)?;
        let end = self.ended_at.unwrap_or(now);
        Some(Statistics {
            messages: seat.history.len(),
            started_at: self.started_at.unwrap_or(self.created_at),
            elapsed_secs: self.elapsed_secs(end),
        })
    }

    /// Statistics notice for every member.
    pub fn statistics_notices(&self, now: DateTime<Utc>) -> Vec<Notice> {
        self.seats()
            .filter_map(|seat| {
                let stats = self.statistics(seat.id(), now)?;
                Some(seat.notice(Text::template(
                    keys::STATISTICS,
                    [
                        ("messages", stats.messages.to_string()),
                        ("started", stats.started_at.format("%Y-%m-%d %H:%M").to_string()),
                        ("elapsed", stats.elapsed_secs.to_string()),
                    ],
                )))
            })
            .collect()
    }

    /// The same text for every member, optionally skipping one.
    pub fn broadcast(&self, text: &Text, except: Option<ParticipantId>) -> Vec<Notice> {
        self.seats()
            .filter(|s| Some(s.id()) != except)
            .map(|s| s.notice(text.clone()))
            .collect()
    }

    pub(crate) fn notice_to(&self, id: ParticipantId, text: Text) -> Option<Notice> {
        self.seat(id).map(|s| s.notice(text))
    }

    /// Archival record. Only available once finished with all roles seated.
    pub fn summary(&self) -> Option<SessionSummary> {
        if !self.phase.is_terminal() {
            return None;
        }

        let histories = self
            .seats()
            .map(|s| ParticipantHistory {
                participant: s.id(),
                role: s.role,
                messages: s.history.clone(),
            })
            .collect();

        Some(SessionSummary {
            session_id: self.id,
            host: self.seat_by_role(Role::Host)?.id(),
            knight: self.seat_by_role(Role::Knight)?.id(),
            knave: self.seat_by_role(Role::Knave)?.id(),
            histories,
            started_at: self.started_at?,
            ended_at: self.ended_at?,
            successful: self.successful,
            finished: true,
            ending: self.ending?,
        })
    }

    /// Client snapshot. Never reveals which respondent is correct, and never
    /// pairs a pseudonym with a chat identity.
    pub fn to_json(&self) -> serde_json::Value {
        let members: Vec<serde_json::Value> = self
            .seats()
            .map(|s| {
                serde_json::json!({
                    "display_name": s.participant.display_name,
                    "messages": s.history.len(),
                })
            })
            .collect();

        let pseudonyms: Vec<&str> = self.seats().filter_map(|s| s.pseudonym.as_deref()).collect();

        serde_json::json!({
            "session_id": self.id.to_string(),
            "phase": self.phase.as_str(),
            "random_assignment": self.policy.is_random(),
            "members": members,
            "pseudonyms": pseudonyms,
            "turn": self.turn.to_json(),
            "successful": self.successful,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn alice() -> Participant {
        Participant::new(ParticipantId(1), "Alice", "en")
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_session_new() {
        let s = Session::new(SessionId(1), alice(), AssignmentPolicy::CreatorIsHost, now());
        assert_eq!(s.phase, SessionPhase::Lobby);
        assert_eq!(s.member_count(), 1);
        assert_eq!(s.creator, ParticipantId(1));
        assert_eq!(s.role_of(ParticipantId(1)), Some(Role::Lobby));
        assert!(!s.is_full());
    }

    #[test]
    fn test_members_fill_up() {
        let mut s = Session::new(SessionId(1), alice(), AssignmentPolicy::Random, now());

        assert_eq!(s.add_member(Participant::new(ParticipantId(2), "Bob", "en"), now()), Ok(false));
        assert_eq!(
            s.add_member(Participant::new(ParticipantId(2), "Bob", "en"), now()),
            Err(SessionError::AlreadyInSession)
        );
        assert_eq!(s.add_member(Participant::new(ParticipantId(3), "Carol", "ru"), now()), Ok(true));
        assert!(s.is_full());
        assert_eq!(
            s.add_member(Participant::new(ParticipantId(4), "Dave", "en"), now()),
            Err(SessionError::TargetNotInLobby)
        );
    }

    #[test]
    fn test_creator_hand_over() {
        let t0 = now();
        let mut s = Session::new(SessionId(1), alice(), AssignmentPolicy::CreatorIsHost, t0);
        s.add_member(Participant::new(ParticipantId(2), "Bob", "en"), t0 + chrono::Duration::seconds(1))
            .unwrap();
        s.add_member(Participant::new(ParticipantId(3), "Carol", "en"), t0 + chrono::Duration::seconds(2))
            .unwrap();

        let seat = s.remove_member(ParticipantId(1)).unwrap();
        assert_eq!(seat.participant.display_name, "Alice");
        assert_eq!(s.creator, ParticipantId(2));
        assert_eq!(s.member_count(), 2);

        assert!(s.remove_member(ParticipantId(1)).is_none());
        s.remove_member(ParticipantId(2));
        s.remove_member(ParticipantId(3));
        assert!(s.is_empty());
    }

    #[test]
    fn test_record_offsets_from_start() {
        let t0 = now();
        let mut s = Session::new(SessionId(1), alice(), AssignmentPolicy::CreatorIsHost, t0);
        s.started_at = Some(t0);

        s.record(ParticipantId(1), "hello", t0 + chrono::Duration::seconds(42));
        let seat = s.seat(ParticipantId(1)).unwrap();
        assert_eq!(
            seat.history,
            vec![MessageRecord {
                role: Role::Lobby,
                text: "hello".to_string(),
                offset_secs: 42,
            }]
        );

        let stats = s
            .statistics(ParticipantId(1), t0 + chrono::Duration::seconds(60))
            .unwrap();
        assert_eq!(stats.messages, 1);
        assert_eq!(stats.elapsed_secs, 60);
        assert_eq!(stats.started_at, t0);
    }

    #[test]
    fn test_summary_requires_finished() {
        let s = Session::new(SessionId(1), alice(), AssignmentPolicy::CreatorIsHost, now());
        assert!(s.summary().is_none());
    }

    #[test]
    fn test_idle() {
        let t0 = now();
        let s = Session::new(SessionId(1), alice(), AssignmentPolicy::CreatorIsHost, t0);
        assert!(!s.is_idle(t0 + chrono::Duration::seconds(10), chrono::Duration::minutes(1)));
        assert!(s.is_idle(t0 + chrono::Duration::minutes(2), chrono::Duration::minutes(1)));
    }

    #[test]
    fn test_to_json_lobby() {
        let s = Session::new(SessionId(7), alice(), AssignmentPolicy::Random, now());
        let json = s.to_json();
        assert_eq!(json["session_id"], "session-7");
        assert_eq!(json["phase"], "lobby");
        assert_eq!(json["random_assignment"], true);
        assert_eq!(json["members"].as_array().unwrap().len(), 1);
    }
}
