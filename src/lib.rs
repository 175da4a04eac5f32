//! Knight & Knave State Library
//!
//! This crate provides the session core for Knight & Knave, a three-player
//! chat deduction game.
//!
//! # Overview
//!
//! One participant, the Host, questions two anonymous respondents. One of
//! them is the Host's Knight, the other a Knave pretending to be the Knight.
//! The Host sees only pseudonyms and must guess which one is the Knight.
//!
//! - **Registry** - Maps chat identities to sessions and handles creating,
//!   joining and leaving lobbies.
//!
//! - **Session Phases** - Lobby, role assignment, play and resolution, with
//!   validated transitions.
//!
//! - **Turn Controller** - Host asks, both respondents answer, repeat.
//!   Messages are relayed under the sender's pseudonym.
//!
//! - **Collaborators** - Outbound text goes through a `Notifier`, strings
//!   through a `Localizer`, finished sessions to an `Archive`.
//!
//! # Design Principles
//!
//! 1. **State machines validate transitions** - Invalid phase and turn changes
//!    are rejected with clear errors and leave state untouched.
//!
//! 2. **One lock per session** - Independent sessions progress in parallel.
//!
//! 3. **No transport** - This crate is pure state, no chat API or HTTP.
//!
//! 4. **Serialization-ready** - Snapshots and summaries convert to JSON.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use knightknave_state::{
//!     GameConfig, MemoryArchive, Participant, ParticipantId, RecordingNotifier,
//!     SessionRegistry,
//! };
//!
//! let notifier = Arc::new(RecordingNotifier::new());
//! let archive = Arc::new(MemoryArchive::new());
//! let registry = SessionRegistry::new(GameConfig::default(), notifier.clone(), archive).unwrap();
//!
//! let alice = Participant::new(ParticipantId(1), "Alice", "en");
//! let bob = Participant::new(ParticipantId(2), "Bob", "en");
//! let carol = Participant::new(ParticipantId(3), "Carol", "en");
//!
//! registry.dispatch_text(&alice, "/new_game").unwrap();
//! registry.dispatch_text(&bob, "1").unwrap();
//! registry.dispatch_text(&carol, "1").unwrap();
//!
//! // Alice is the Host and asks first
//! registry.dispatch_text(&alice, "Who are you?").unwrap();
//! assert_eq!(notifier.for_participant(ParticipantId(2)).last().unwrap().text, "host: Who are you?");
//! ```

pub mod config;
pub mod state;

// Re-export everything from state module at crate root
pub use config::{ConfigError, GameConfig};
pub use state::*;
