//! User-visible session errors.

use super::notice::{keys, Text};
use super::phase::InvalidTransition;

/// Errors returned to the participant whose command was rejected.
///
/// None of these affect any session other than the one implicated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Already registered in a session")]
    AlreadyInSession,

    #[error("No session is registered for that participant")]
    UnknownTarget,

    #[error("Target session is no longer in its lobby")]
    TargetNotInLobby,

    #[error("Cannot join your own session")]
    SelfJoin,

    #[error("Not in a session")]
    NotInSession,

    #[error("Still waiting in the lobby ({members} of 3)")]
    StillInLobby { members: usize },

    #[error("It's not your turn")]
    NotYourTurn,

    #[error("Only the host can do that")]
    NotAHost,

    #[error("Guess does not name either respondent")]
    UnknownPseudonym,

    #[error("Session already finished")]
    SessionAlreadyFinished,

    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

impl SessionError {
    /// Localization key used to report this error to the participant.
    pub fn key(&self) -> &'static str {
        match self {
            Self::AlreadyInSession => keys::ERR_ALREADY_IN_SESSION,
            Self::UnknownTarget => keys::ERR_UNKNOWN_TARGET,
            Self::TargetNotInLobby => keys::ERR_TARGET_NOT_IN_LOBBY,
            Self::SelfJoin => keys::ERR_SELF_JOIN,
            Self::NotInSession => keys::ERR_NOT_IN_SESSION,
            Self::StillInLobby { .. } => keys::WAITING_FOR_OTHERS,
            Self::NotYourTurn => keys::ERR_NOT_YOUR_TURN,
            Self::NotAHost => keys::ERR_NOT_A_HOST,
            Self::UnknownPseudonym => keys::ERR_UNKNOWN_PSEUDONYM,
            Self::SessionAlreadyFinished => keys::ERR_SESSION_FINISHED,
            Self::Transition(_) => keys::ERR_INTERNAL,
        }
    }

    /// Text shown to the participant.
    pub fn text(&self) -> Text {
        match self {
            Self::StillInLobby { members } => {
                Text::template(self.key(), [("members", members.to_string())])
            }
            _ => Text::Key(self.key()),
        }
    }
}
