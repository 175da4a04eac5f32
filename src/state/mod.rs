//! Session state for Knight & Knave.
//!
//! This module provides the core state types and the registry:
//!
//! - `participant` - Chat identities and roles
//! - `phase` - Session phase state machine
//! - `session` - Seats, histories and archival summaries
//! - `roles` - Role and pseudonym assignment
//! - `turn` - Turn controller and message relay
//! - `reveal` - Guess resolution and forfeits
//! - `registry` - Identity to session index, create/join/leave
//! - `notice` - Outbound texts, localization and delivery
//! - `archive` - Hand-off of finished sessions
//! - `command` - Inbound chat commands
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │                            SessionRegistry                             │
//! │                                                                        │
//! │  participant_id → session_id      session_id → Arc<Mutex<Session>>     │
//! │  participant_id → finished session (tombstone)                         │
//! │                                                                        │
//! │  ┌──────────────────────────────────────────────────────────────┐      │
//! │  │                      Session (per game)                      │      │
//! │  │                                                              │      │
//! │  │  Lobby ──▶ RoleAssignment ──▶ InProgress ──▶ Finished        │      │
//! │  │                                  │                           │      │
//! │  │                         TurnState: Host ⇄ Respondents        │      │
//! │  └──────────────────────────────────────────────────────────────┘      │
//! │                                                                        │
//! │  Vec<Notice> ──▶ Localizer ──▶ Notifier                                │
//! │  SessionSummary ──▶ Archive                                            │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Session operations return the notices they produce; the registry renders
//! and delivers them while it still holds the session lock, so every member
//! sees one session's notices in the order they were produced.

pub mod archive;
pub mod command;
pub mod error;
pub mod notice;
pub mod participant;
pub mod phase;
pub mod registry;
pub mod reveal;
pub mod rng;
pub mod roles;
pub mod session;
pub mod turn;

// Re-export commonly used types
pub use archive::{Archive, ArchiveError, JsonLinesArchive, MemoryArchive};
pub use command::Command;
pub use error::SessionError;
pub use notice::{
    keys, Author, Catalog, Delivery, Localizer, Notice, Notifier, RecordingNotifier, Text,
};
pub use participant::{Participant, ParticipantId, Role};
pub use phase::{InvalidTransition, PhaseEvent, SessionPhase};
pub use registry::SessionRegistry;
pub use reveal::Outcome;
pub use rng::GameRng;
pub use roles::{PseudonymGenerator, RoleAssigner};
pub use session::{
    AssignmentPolicy, Ending, MessageRecord, ParticipantHistory, Seat, Session, SessionId,
    SessionSummary, Statistics, SESSION_SIZE,
};
pub use turn::{Advance, Turn, TurnState};
