//! Outgoing notices and the collaborators that localize and deliver them.
//!
//! Session logic never talks to a transport. It produces [`Notice`] values
//! carrying symbolic keys; the registry renders them through a [`Localizer`]
//! and hands the result to a [`Notifier`].

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::participant::ParticipantId;

/// Localization keys requested by the core.
pub mod keys {
    pub const GREETING: &str = "greeting";
    pub const YOUR_ID: &str = "your_id";
    pub const SESSION_CREATED: &str = "session_created";
    pub const YOU_JOINED: &str = "you_joined";
    pub const PLAYER_JOINED: &str = "player_joined";
    pub const PLAYER_LEFT: &str = "player_left";
    pub const YOU_LEFT: &str = "you_left";
    pub const WAITING_FOR_OTHERS: &str = "waiting_for_others";
    pub const ROLE_HOST: &str = "role_host";
    pub const ROLE_KNIGHT: &str = "role_knight";
    pub const ROLE_KNAVE: &str = "role_knave";
    pub const HOST_LABEL: &str = "host_label";
    pub const YOUR_TURN: &str = "your_turn";
    pub const REVEAL_PROMPT: &str = "reveal_prompt";
    pub const HOST_DECIDING: &str = "host_deciding";
    pub const OUTCOME_WIN: &str = "outcome_win";
    pub const OUTCOME_LOSE: &str = "outcome_lose";
    pub const FORFEIT: &str = "forfeit";
    pub const IDLE_FORFEIT: &str = "idle_forfeit";
    pub const LOBBY_EXPIRED: &str = "lobby_expired";
    pub const STATISTICS: &str = "statistics";

    pub const ERR_ALREADY_IN_SESSION: &str = "err_already_in_session";
    pub const ERR_UNKNOWN_TARGET: &str = "err_unknown_target";
    pub const ERR_TARGET_NOT_IN_LOBBY: &str = "err_target_not_in_lobby";
    pub const ERR_SELF_JOIN: &str = "err_self_join";
    pub const ERR_NOT_IN_SESSION: &str = "err_not_in_session";
    pub const ERR_NOT_YOUR_TURN: &str = "err_not_your_turn";
    pub const ERR_NOT_A_HOST: &str = "err_not_a_host";
    pub const ERR_UNKNOWN_PSEUDONYM: &str = "err_unknown_pseudonym";
    pub const ERR_SESSION_FINISHED: &str = "err_session_finished";
    pub const ERR_INTERNAL: &str = "err_internal";
}

/// Who a relayed chat line is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Author {
    /// The Host, shown with the localized host label
    Host,
    /// A respondent, shown under their pseudonym
    Pseudonym(String),
}

/// Symbolic content of a notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Text {
    /// A plain localized string
    Key(&'static str),
    /// A localized template whose `{name}` placeholders are filled in
    Template {
        key: &'static str,
        args: Vec<(&'static str, String)>,
    },
    /// A participant's message relayed verbatim behind an attribution prefix
    Relay { author: Author, body: String },
}

impl Text {
    pub fn template(key: &'static str, args: impl IntoIterator<Item = (&'static str, String)>) -> Self {
        Self::Template {
            key,
            args: args.into_iter().collect(),
        }
    }

    /// The localization key behind this text, if any.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Self::Key(key) | Self::Template { key, .. } => Some(key),
            Self::Relay { .. } => None,
        }
    }

    /// Render for one locale.
    pub fn render(&self, localizer: &dyn Localizer, locale: &str) -> String {
        match self {
            Self::Key(key) => localizer.localize(locale, key),
            Self::Template { key, args } => {
                let mut text = localizer.localize(locale, key);
                for (name, value) in args {
                    text = text.replace(&format!("{{{}}}", name), value);
                }
                text
            }
            Self::Relay { author, body } => {
                let label = match author {
                    Author::Host => localizer.localize(locale, keys::HOST_LABEL),
                    Author::Pseudonym(name) => name.clone(),
                };
                format!("{}: {}", label, body)
            }
        }
    }
}

/// A message for one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub to: ParticipantId,
    pub locale: String,
    pub text: Text,
    /// Reply options offered alongside the text (e.g. the reveal keyboard)
    pub choices: Vec<String>,
}

impl Notice {
    pub fn new(to: ParticipantId, locale: impl Into<String>, text: Text) -> Self {
        Self {
            to,
            locale: locale.into(),
            text,
            choices: Vec::new(),
        }
    }

    pub fn with_choices(mut self, choices: Vec<String>) -> Self {
        self.choices = choices;
        self
    }
}

/// Looks up user-facing strings.
pub trait Localizer: Send + Sync {
    fn localize(&self, locale: &str, key: &str) -> String;
}

/// Delivers rendered text to one participant.
///
/// Called while the owning session is locked; implementations must not call
/// back into the registry.
pub trait Notifier: Send + Sync {
    fn notify(&self, to: ParticipantId, text: &str, choices: &[String]);
}

/// JSON-backed string catalog: `{"en": {"key": "text"}, ...}`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    dict: HashMap<String, HashMap<String, String>>,
    default_locale: String,
}

impl Catalog {
    pub fn from_json(json: &str, default_locale: impl Into<String>) -> Result<Self, serde_json::Error> {
        Ok(Self {
            dict: serde_json::from_str(json)?,
            default_locale: default_locale.into(),
        })
    }

    /// English and Russian strings bundled with the crate.
    pub fn builtin(default_locale: &str) -> Self {
        match Self::from_json(include_str!("../../assets/locales.json"), default_locale) {
            Ok(catalog) => {
                if !catalog.supports(default_locale) {
                    tracing::warn!(locale = default_locale, "no bundled strings for the default locale");
                }
                catalog
            }
            Err(err) => {
                tracing::error!("bundled locale catalog is invalid: {}", err);
                Self {
                    dict: HashMap::new(),
                    default_locale: default_locale.to_string(),
                }
            }
        }
    }

    /// Check if a locale has its own strings.
    pub fn supports(&self, locale: &str) -> bool {
        self.dict.contains_key(locale)
    }
}

impl Localizer for Catalog {
    fn localize(&self, locale: &str, key: &str) -> String {
        let table = self
            .dict
            .get(locale)
            .or_else(|| self.dict.get(&self.default_locale));

        match table.and_then(|t| t.get(key)) {
            Some(text) => text.clone(),
            None => key.to_string(),
        }
    }
}

/// A notice as handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: ParticipantId,
    pub text: String,
    pub choices: Vec<String>,
}

/// Notifier that keeps every delivery in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All deliveries so far, in order.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.lock().clone()
    }

    /// Deliveries addressed to one participant.
    pub fn for_participant(&self, id: ParticipantId) -> Vec<Delivery> {
        self.lock().iter().filter(|d| d.to == id).cloned().collect()
    }

    /// Drain the recorded deliveries.
    pub fn take(&self) -> Vec<Delivery> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Delivery>> {
        self.deliveries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, to: ParticipantId, text: &str, choices: &[String]) {
        self.lock().push(Delivery {
            to,
            text: text.to_string(),
            choices: choices.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        Catalog::from_json(
            r#"{
                "en": {"host_label": "host", "you_joined": "You joined {name}'s game"},
                "ru": {"host_label": "ведущий"}
            }"#,
            "en",
        )
        .unwrap()
    }

    #[test]
    fn test_catalog_fallbacks() {
        let c = catalog();
        assert_eq!(c.localize("ru", "host_label"), "ведущий");
        // Unsupported locale falls back to the default one
        assert_eq!(c.localize("de", "host_label"), "host");
        // Missing key in a supported locale falls back to the key
        assert_eq!(c.localize("ru", "you_joined"), "you_joined");
        assert!(c.supports("ru"));
        assert!(!c.supports("de"));
    }

    #[test]
    fn test_render_template_and_relay() {
        let c = catalog();
        let text = Text::template(keys::YOU_JOINED, [("name", "Alice".to_string())]);
        assert_eq!(text.render(&c, "en"), "You joined Alice's game");
        assert_eq!(text.key(), Some(keys::YOU_JOINED));

        let relay = Text::Relay {
            author: Author::Host,
            body: "Q1".to_string(),
        };
        assert_eq!(relay.render(&c, "ru"), "ведущий: Q1");
        assert_eq!(relay.key(), None);

        let relay = Text::Relay {
            author: Author::Pseudonym("Silver Otter".to_string()),
            body: "A2".to_string(),
        };
        assert_eq!(relay.render(&c, "en"), "Silver Otter: A2");
    }

    #[test]
    fn test_builtin_catalog_covers_core_keys() {
        let c = Catalog::builtin("en");
        assert!(c.supports("en"));
        assert!(c.supports("ru"));
        for key in [
            keys::GREETING,
            keys::ROLE_HOST,
            keys::OUTCOME_WIN,
            keys::STATISTICS,
            keys::ERR_NOT_YOUR_TURN,
            keys::ERR_SESSION_FINISHED,
        ] {
            assert_ne!(c.localize("en", key), key, "missing english text for {}", key);
            assert_ne!(c.localize("ru", key), key, "missing russian text for {}", key);
        }
    }

    #[test]
    fn test_recording_notifier() {
        let n = RecordingNotifier::new();
        n.notify(ParticipantId(1), "hi", &[]);
        n.notify(ParticipantId(2), "pick", &["a".to_string(), "b".to_string()]);

        assert_eq!(n.len(), 2);
        assert_eq!(n.for_participant(ParticipantId(2))[0].choices, vec!["a", "b"]);
        assert_eq!(n.take().len(), 2);
        assert!(n.is_empty());
    }
}
