//! Reveal and resolution.
//!
//! The Host wins iff the guessed pseudonym belongs to the respondent drawn as
//! the correct answer at role assignment. That respondent shares the Host's
//! outcome; the other respondent gets the opposite one. A session resolves
//! exactly once, by guess or by forfeit.

use chrono::{DateTime, Utc};

use super::error::SessionError;
use super::notice::{keys, Notice, Text};
use super::participant::{ParticipantId, Role};
use super::phase::SessionPhase;
use super::rng::GameRng;
use super::session::{Ending, Session};

/// Win or lose, per participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Lose,
}

impl Outcome {
    fn from_win(win: bool) -> Self {
        if win {
            Self::Win
        } else {
            Self::Lose
        }
    }

    fn opposite(self) -> Self {
        match self {
            Self::Win => Self::Lose,
            Self::Lose => Self::Win,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Win => keys::OUTCOME_WIN,
            Self::Lose => keys::OUTCOME_LOSE,
        }
    }
}

impl Session {
    /// Host-only guard shared by the reveal prompt and the guess.
    fn ensure_host(&self, id: ParticipantId) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Finished => Err(SessionError::SessionAlreadyFinished),
            SessionPhase::InProgress if self.role_of(id) == Some(Role::Host) => Ok(()),
            _ if !self.has_member(id) => Err(SessionError::NotInSession),
            _ => Err(SessionError::NotAHost),
        }
    }

    /// Offer the Host both pseudonyms to choose from. Does not resolve.
    pub fn request_guess(&mut self, host: ParticipantId, rng: &GameRng) -> Result<Vec<Notice>, SessionError> {
        self.ensure_host(host)?;

        let mut choices: Vec<String> = self
            .seats()
            .filter_map(|s| s.pseudonym.clone())
            .collect();
        choices.sort();
        rng.shuffle(&mut choices);

        let mut notices = Vec::new();
        notices.extend(
            self.notice_to(host, Text::Key(keys::REVEAL_PROMPT))
                .map(|n| n.with_choices(choices)),
        );
        notices.extend(self.broadcast(&Text::Key(keys::HOST_DECIDING), Some(host)));
        Ok(notices)
    }

    /// Resolve the game with the Host's guess.
    pub fn submit_guess(
        &mut self,
        host: ParticipantId,
        pseudonym: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notice>, SessionError> {
        self.ensure_host(host)?;

        let guessed = self
            .respondent_by_pseudonym(pseudonym.trim())
            .map(|s| s.id())
            .ok_or(SessionError::UnknownPseudonym)?;
        let correct = self
            .correct_respondent()
            .ok_or(SessionError::UnknownPseudonym)?;

        let host_outcome = Outcome::from_win(guessed == correct);
        self.finish(Ending::Guessed, host_outcome == Outcome::Win, now)?;

        tracing::info!(
            session = %self.id,
            successful = self.successful,
            "session resolved by guess"
        );

        let mut notices: Vec<Notice> = self
            .seats()
            .filter_map(|seat| {
                let outcome = match seat.role {
                    Role::Host => host_outcome,
                    _ if seat.id() == correct => host_outcome,
                    _ => host_outcome.opposite(),
                };
                self.notice_to(seat.id(), Text::Key(outcome.key()))
            })
            .collect();
        notices.extend(self.statistics_notices(now));
        Ok(notices)
    }

    /// End a running game without a guess. `leaver` is the participant whose
    /// departure caused it, `None` for an abandoned game.
    pub fn forfeit(&mut self, leaver: Option<ParticipantId>, now: DateTime<Utc>) -> Result<Vec<Notice>, SessionError> {
        let ending = if leaver.is_some() {
            Ending::Forfeited
        } else {
            Ending::Abandoned
        };
        self.finish(ending, false, now)?;

        tracing::info!(session = %self.id, ?leaver, ?ending, "session forfeited");

        let text = match leaver.and_then(|id| self.seat(id)) {
            Some(seat) => Text::template(
                keys::FORFEIT,
                [("name", seat.participant.display_name.clone())],
            ),
            None => Text::Key(keys::IDLE_FORFEIT),
        };

        let mut notices = self.broadcast(&text, None);
        notices.extend(self.statistics_notices(now));
        Ok(notices)
    }
}
