//! Session registry.
//!
//! Maps participant identities to the session they occupy and mediates
//! creation, joining and leaving.
//!
//! # Locking
//!
//! ```text
//! index lock ──▶ session lock ──▶ rng lock
//! ```
//!
//! Locks are only ever taken in this order. Structural operations (create,
//! join, leave, idle sweep) hold the index lock while they touch a session.
//! Messages and guesses clone the session handle, release the index, and
//! work under the session lock alone, so independent sessions run in
//! parallel. A session resolved by guess is retired from the index after its
//! lock is released; any operation that reaches it in between sees
//! `Finished`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::archive::Archive;
use super::command::Command;
use super::error::SessionError;
use super::notice::{keys, Catalog, Localizer, Notice, Notifier, Text};
use super::participant::{Participant, ParticipantId};
use super::phase::SessionPhase;
use super::rng::GameRng;
use super::roles::{PseudonymGenerator, RoleAssigner};
use super::session::{AssignmentPolicy, Session, SessionId};
use crate::config::{ConfigError, GameConfig};

type SessionHandle = Arc<Mutex<Session>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct RegistryIndex {
    /// Live sessions by id
    sessions: HashMap<SessionId, SessionHandle>,

    /// Participant to the session they occupy
    members: HashMap<ParticipantId, SessionId>,

    /// Participant to the finished session they last played in, until they
    /// create or join another
    retired: HashMap<ParticipantId, SessionId>,
}

impl RegistryIndex {
    fn register(&mut self, id: ParticipantId, session_id: SessionId) {
        self.members.insert(id, session_id);
        self.retired.remove(&id);
    }

    /// Drop a session and every member still pointing at it.
    fn discard(&mut self, session_id: SessionId, members: &[ParticipantId], tombstone: bool) {
        self.sessions.remove(&session_id);
        for id in members {
            if self.members.get(id) == Some(&session_id) {
                self.members.remove(id);
                if tombstone {
                    self.retired.insert(*id, session_id);
                }
            }
        }
    }
}

/// Registry of live sessions and the collaborators they report to.
pub struct SessionRegistry {
    index: Mutex<RegistryIndex>,
    next_id: AtomicU64,
    rng: GameRng,
    assigner: RoleAssigner,
    config: GameConfig,
    localizer: Arc<dyn Localizer>,
    notifier: Arc<dyn Notifier>,
    archive: Arc<dyn Archive>,
}

impl SessionRegistry {
    /// Build a registry with the bundled string catalog.
    pub fn new(
        config: GameConfig,
        notifier: Arc<dyn Notifier>,
        archive: Arc<dyn Archive>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            index: Mutex::new(RegistryIndex::default()),
            next_id: AtomicU64::new(1),
            rng: GameRng::from_seed_option(config.rng_seed),
            assigner: RoleAssigner::new(PseudonymGenerator::from_config(&config)),
            localizer: Arc::new(Catalog::builtin(&config.default_locale)),
            config,
            notifier,
            archive,
        })
    }

    /// Replace the string catalog.
    pub fn with_localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = localizer;
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Parse one chat line and dispatch it.
    ///
    /// A bare number only means join-by-identity for a participant who is not
    /// seated anywhere; from a seated participant it is an ordinary message
    /// and keeps its exact text.
    pub fn dispatch_text(&self, sender: &Participant, text: &str) -> Result<(), SessionError> {
        let command = match Command::from_text(text) {
            Command::Join { .. } if self.is_registered(sender.id) => Command::Message {
                text: text.to_string(),
            },
            command => command,
        };
        self.dispatch(sender, command)
    }

    /// Execute a command and report any rejection to the sender.
    pub fn dispatch(&self, sender: &Participant, command: Command) -> Result<(), SessionError> {
        let name = command.name();
        let result = self.handle(sender, command);
        if let Err(err) = &result {
            tracing::debug!(participant = %sender.id, command = name, error = %err, "command rejected");
            self.deliver(vec![Notice::new(sender.id, sender.locale.clone(), err.text())]);
        }
        result
    }

    /// Execute a command, returning any rejection to the caller.
    pub fn handle(&self, sender: &Participant, command: Command) -> Result<(), SessionError> {
        match command {
            Command::Greet => {
                self.deliver(vec![Notice::new(sender.id, sender.locale.clone(), Text::Key(keys::GREETING))]);
                Ok(())
            }
            Command::WhoAmI => {
                self.deliver(vec![Notice::new(
                    sender.id,
                    sender.locale.clone(),
                    Text::template(keys::YOUR_ID, [("id", sender.id.to_string())]),
                )]);
                Ok(())
            }
            Command::CreateSession { random } => self.create_session(sender.clone(), random).map(|_| ()),
            Command::Join { target } if self.is_registered(sender.id) => {
                self.submit_message(sender.id, &target.to_string())
            }
            Command::Join { target } => self.join(sender.clone(), target).map(|_| ()),
            Command::Leave => self.leave(sender.id),
            Command::Message { text } => self.submit_message(sender.id, &text),
            Command::RequestGuess => self.request_guess(sender.id),
            Command::Guess { pseudonym } => self.submit_guess(sender.id, &pseudonym),
        }
    }

    /// Open a new lobby with the creator as its only member.
    pub fn create_session(&self, creator: Participant, random: bool) -> Result<SessionId, SessionError> {
        let mut index = lock(&self.index);
        if index.members.contains_key(&creator.id) {
            return Err(SessionError::AlreadyInSession);
        }

        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let creator_id = creator.id;
        let locale = creator.locale.clone();
        let policy = AssignmentPolicy::from_random_flag(random);
        let session = Session::new(id, creator, policy, Utc::now());

        index.sessions.insert(id, Arc::new(Mutex::new(session)));
        index.register(creator_id, id);
        drop(index);

        tracing::info!(session = %id, creator = %creator_id, ?policy, "session created");
        self.deliver(vec![Notice::new(creator_id, locale, Text::Key(keys::SESSION_CREATED))]);
        Ok(id)
    }

    /// Attach `joiner` to the lobby `target` is waiting in. The third join
    /// assigns roles before returning.
    pub fn join(&self, joiner: Participant, target: ParticipantId) -> Result<SessionId, SessionError> {
        if joiner.id == target {
            return Err(SessionError::SelfJoin);
        }

        let mut index = lock(&self.index);
        if index.members.contains_key(&joiner.id) {
            return Err(SessionError::AlreadyInSession);
        }
        let session_id = *index.members.get(&target).ok_or(SessionError::UnknownTarget)?;
        let handle = index
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(SessionError::UnknownTarget)?;

        let mut session = lock(&handle);
        let now = Utc::now();
        let joiner_id = joiner.id;
        let joiner_name = joiner.display_name.clone();
        let joiner_locale = joiner.locale.clone();
        let target_name = session
            .seat(target)
            .map(|s| s.participant.display_name.clone())
            .unwrap_or_default();

        let full = session.add_member(joiner, now)?;
        index.register(joiner_id, session_id);

        tracing::info!(
            session = %session_id,
            participant = %joiner_id,
            members = session.member_count(),
            "joined session"
        );

        let mut notices = vec![Notice::new(
            joiner_id,
            joiner_locale,
            Text::template(keys::YOU_JOINED, [("name", target_name)]),
        )];
        notices.extend(session.broadcast(
            &Text::template(keys::PLAYER_JOINED, [("name", joiner_name)]),
            Some(joiner_id),
        ));

        if full {
            match self.assigner.assign(&mut session, &self.rng, now) {
                Ok(role_notices) => notices.extend(role_notices),
                Err(err) => {
                    // Nobody may be left seated in a session that cannot start
                    let members: Vec<ParticipantId> = session.member_ids().collect();
                    index.discard(session_id, &members, false);
                    tracing::error!(session = %session_id, error = %err, "role assignment failed");
                    return Err(err);
                }
            }
        }
        drop(index);

        self.deliver(notices);
        Ok(session_id)
    }

    /// Remove a participant from their session.
    ///
    /// Leaving a lobby frees the seat (and discards an emptied lobby).
    /// Leaving a running game forfeits it for everyone.
    pub fn leave(&self, id: ParticipantId) -> Result<(), SessionError> {
        let mut index = lock(&self.index);
        let Some(session_id) = index.members.get(&id).copied() else {
            return Err(SessionError::NotInSession);
        };
        let Some(handle) = index.sessions.get(&session_id).cloned() else {
            index.members.remove(&id);
            return Err(SessionError::NotInSession);
        };

        let mut session = lock(&handle);
        let now = Utc::now();

        match session.phase {
            SessionPhase::Lobby => {
                let Some(seat) = session.remove_member(id) else {
                    index.members.remove(&id);
                    return Err(SessionError::NotInSession);
                };
                session.last_activity = now;
                index.members.remove(&id);

                let emptied = session.is_empty();
                if emptied {
                    index.sessions.remove(&session_id);
                }
                drop(index);

                tracing::info!(session = %session_id, participant = %id, emptied, "left lobby");

                let mut notices = vec![Notice::new(
                    id,
                    seat.participant.locale.clone(),
                    Text::Key(keys::YOU_LEFT),
                )];
                notices.extend(session.broadcast(
                    &Text::template(keys::PLAYER_LEFT, [("name", seat.participant.display_name)]),
                    None,
                ));
                self.deliver(notices);
                Ok(())
            }
            SessionPhase::RoleAssignment | SessionPhase::InProgress => {
                let notices = session.forfeit(Some(id), now)?;
                let members: Vec<ParticipantId> = session.member_ids().collect();
                index.discard(session_id, &members, true);
                drop(index);

                self.deliver(notices);
                self.hand_off(&session);
                Ok(())
            }
            SessionPhase::Finished => {
                // Resolved by a guess that has not retired it yet
                let members: Vec<ParticipantId> = session.member_ids().collect();
                index.discard(session_id, &members, true);
                Err(SessionError::SessionAlreadyFinished)
            }
        }
    }

    /// Relay a chat message through the turn controller.
    pub fn submit_message(&self, id: ParticipantId, text: &str) -> Result<(), SessionError> {
        let handle = self.session_handle(id)?;
        let mut session = lock(&handle);
        let notices = session.submit_message(id, text, Utc::now())?;
        self.deliver(notices);
        Ok(())
    }

    /// Send the Host the reveal prompt.
    pub fn request_guess(&self, id: ParticipantId) -> Result<(), SessionError> {
        let handle = self.session_handle(id)?;
        let mut session = lock(&handle);
        let notices = session.request_guess(id, &self.rng)?;
        self.deliver(notices);
        Ok(())
    }

    /// Resolve the session with the Host's guess.
    pub fn submit_guess(&self, id: ParticipantId, pseudonym: &str) -> Result<(), SessionError> {
        let handle = self.session_handle(id)?;
        let (session_id, members) = {
            let mut session = lock(&handle);
            let notices = session.submit_guess(id, pseudonym, Utc::now())?;
            self.deliver(notices);
            self.hand_off(&session);
            (session.id, session.member_ids().collect::<Vec<_>>())
        };

        lock(&self.index).discard(session_id, &members, true);
        Ok(())
    }

    /// Close sessions with no activity for longer than `max_idle`.
    ///
    /// Lobbies are discarded; running games are forfeited and archived.
    pub fn expire_idle(&self, now: DateTime<Utc>, max_idle: chrono::Duration) -> Vec<SessionId> {
        let mut index = lock(&self.index);
        let handles: Vec<(SessionId, SessionHandle)> = index
            .sessions
            .iter()
            .map(|(id, handle)| (*id, Arc::clone(handle)))
            .collect();

        let mut expired = Vec::new();
        for (session_id, handle) in handles {
            let mut session = lock(&handle);
            if !session.is_idle(now, max_idle) {
                continue;
            }

            let members: Vec<ParticipantId> = session.member_ids().collect();
            match session.phase {
                SessionPhase::Lobby => {
                    index.discard(session_id, &members, false);
                    tracing::info!(session = %session_id, "idle lobby closed");
                    self.deliver(session.broadcast(&Text::Key(keys::LOBBY_EXPIRED), None));
                }
                SessionPhase::RoleAssignment | SessionPhase::InProgress => match session.forfeit(None, now) {
                    Ok(notices) => {
                        index.discard(session_id, &members, true);
                        self.deliver(notices);
                        self.hand_off(&session);
                    }
                    Err(err) => {
                        tracing::warn!(session = %session_id, error = %err, "could not close idle session");
                        continue;
                    }
                },
                SessionPhase::Finished => {
                    index.discard(session_id, &members, true);
                }
            }
            expired.push(session_id);
        }

        expired
    }

    /// Apply the configured idle timeout, if any.
    pub fn sweep_idle(&self, now: DateTime<Utc>) -> Vec<SessionId> {
        match self.config.idle_timeout() {
            Some(max_idle) => self.expire_idle(now, max_idle),
            None => Vec::new(),
        }
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    /// Session a participant currently occupies.
    pub fn session_of(&self, id: ParticipantId) -> Option<SessionId> {
        lock(&self.index).members.get(&id).copied()
    }

    /// Check if a participant is registered to any session.
    pub fn is_registered(&self, id: ParticipantId) -> bool {
        lock(&self.index).members.contains_key(&id)
    }

    /// Count live sessions.
    pub fn session_count(&self) -> usize {
        lock(&self.index).sessions.len()
    }

    /// Count registered participants.
    pub fn participant_count(&self) -> usize {
        lock(&self.index).members.len()
    }

    /// Read a live session.
    pub fn inspect<R>(&self, session_id: SessionId, f: impl FnOnce(&Session) -> R) -> Option<R> {
        let handle = lock(&self.index).sessions.get(&session_id).cloned()?;
        let session = lock(&handle);
        Some(f(&session))
    }

    /// Client snapshot of a live session.
    pub fn snapshot(&self, session_id: SessionId) -> Option<serde_json::Value> {
        self.inspect(session_id, Session::to_json)
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn session_handle(&self, id: ParticipantId) -> Result<SessionHandle, SessionError> {
        let index = lock(&self.index);
        match index.members.get(&id) {
            Some(session_id) => index
                .sessions
                .get(session_id)
                .cloned()
                .ok_or(SessionError::NotInSession),
            None if index.retired.contains_key(&id) => Err(SessionError::SessionAlreadyFinished),
            None => Err(SessionError::NotInSession),
        }
    }

    fn deliver(&self, notices: Vec<Notice>) {
        for notice in notices {
            let text = notice.text.render(self.localizer.as_ref(), &notice.locale);
            self.notifier.notify(notice.to, &text, &notice.choices);
        }
    }

    /// Archive a finished session. Called once, by whoever finished it.
    fn hand_off(&self, session: &Session) {
        let Some(summary) = session.summary() else {
            tracing::warn!(session = %session.id, "finished session has no complete summary");
            return;
        };
        match self.archive.archive(summary) {
            Ok(()) => tracing::info!(session = %session.id, successful = session.successful, "session archived"),
            Err(err) => tracing::warn!(session = %session.id, error = %err, "archiving session failed"),
        }
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("index", &self.index)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
