//! Commands accepted from the chat transport.

use super::participant::ParticipantId;

/// One inbound event, addressed to the core by the sender's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Welcome text
    Greet,
    /// Report the sender's own identity
    WhoAmI,
    CreateSession { random: bool },
    Join { target: ParticipantId },
    Leave,
    Message { text: String },
    /// Host asks for the reveal prompt
    RequestGuess,
    Guess { pseudonym: String },
}

impl Command {
    /// Map chat text to a command.
    ///
    /// A bare integer is a join-by-identity request; anything that is not a
    /// known slash command is a game message. The registry treats a number
    /// from a seated participant as a message instead.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (trimmed, ""),
        };

        match head {
            "/start" => Self::Greet,
            "/get_my_id" => Self::WhoAmI,
            "/new_game" => Self::CreateSession { random: false },
            "/new_random_game" => Self::CreateSession { random: true },
            "/exit_lobby" => Self::Leave,
            "/answer" => Self::RequestGuess,
            "/guess" if !rest.is_empty() => Self::Guess {
                pseudonym: rest.to_string(),
            },
            _ => match trimmed.parse::<i64>() {
                Ok(id) => Self::Join {
                    target: ParticipantId(id),
                },
                Err(_) => Self::Message {
                    text: text.to_string(),
                },
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Greet => "greet",
            Self::WhoAmI => "who_am_i",
            Self::CreateSession { .. } => "create_session",
            Self::Join { .. } => "join",
            Self::Leave => "leave",
            Self::Message { .. } => "message",
            Self::RequestGuess => "request_guess",
            Self::Guess { .. } => "guess",
        }
    }
}
