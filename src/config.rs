//! Game configuration.
//!
//! Loaded from JSON by the hosting process. Every field has a default, so an
//! empty object is a valid configuration.

use serde::{Deserialize, Serialize};

/// Errors raised for unusable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("pseudonym pools must yield at least two distinct names")]
    PseudonymPoolTooSmall,

    #[error("default locale must not be empty")]
    EmptyLocale,

    #[error("idle timeout must be positive")]
    ZeroIdleTimeout,
}

/// Runtime settings for the session core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Locale used when a participant's own locale has no strings
    pub default_locale: String,

    /// Fixed seed for reproducible draws; entropy when absent
    pub rng_seed: Option<u64>,

    /// First word of generated pseudonyms
    pub pseudonym_adjectives: Vec<String>,

    /// Second word of generated pseudonyms
    pub pseudonym_nouns: Vec<String>,

    /// Inactivity after which `sweep_idle` closes a session; disabled when absent
    pub idle_timeout_secs: Option<u64>,
}

const ADJECTIVES: &[&str] = &[
    "Amber", "Brave", "Crimson", "Dusky", "Eager", "Fickle", "Gentle", "Hollow", "Ivory",
    "Jolly", "Keen", "Lucky", "Misty", "Noble", "Oaken", "Proud", "Quiet", "Rusty", "Silver",
    "Tawny", "Umber", "Velvet", "Wily", "Young",
];

const NOUNS: &[&str] = &[
    "Badger", "Crane", "Falcon", "Fox", "Hare", "Heron", "Lynx", "Magpie", "Marten", "Otter",
    "Owl", "Raven", "Robin", "Stag", "Swan", "Toad", "Weasel", "Wolf", "Wren",
];

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
            rng_seed: None,
            pseudonym_adjectives: ADJECTIVES.iter().map(|s| s.to_string()).collect(),
            pseudonym_nouns: NOUNS.iter().map(|s| s.to_string()).collect(),
            idle_timeout_secs: None,
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_locale.trim().is_empty() {
            return Err(ConfigError::EmptyLocale);
        }
        if self.distinct_pseudonyms() < 2 {
            return Err(ConfigError::PseudonymPoolTooSmall);
        }
        if self.idle_timeout_secs == Some(0) {
            return Err(ConfigError::ZeroIdleTimeout);
        }
        Ok(())
    }

    /// Inactivity limit for the idle sweep.
    pub fn idle_timeout(&self) -> Option<chrono::Duration> {
        self.idle_timeout_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(chrono::Duration::seconds)
    }

    fn distinct_pseudonyms(&self) -> usize {
        let adjectives: std::collections::HashSet<_> = self.pseudonym_adjectives.iter().collect();
        let nouns: std::collections::HashSet<_> = self.pseudonym_nouns.iter().collect();
        adjectives.len() * nouns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config = GameConfig::from_json("{}").unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.idle_timeout(), None);
    }

    #[test]
    fn test_overrides() {
        let config = GameConfig::from_json(
            r#"{"default_locale": "ru", "rng_seed": 42, "idle_timeout_secs": 600}"#,
        )
        .unwrap();
        assert_eq!(config.default_locale, "ru");
        assert_eq!(config.rng_seed, Some(42));
        assert_eq!(config.idle_timeout(), Some(chrono::Duration::minutes(10)));
    }

    #[test]
    fn test_rejects_single_name_pool() {
        let result = GameConfig::from_json(
            r#"{"pseudonym_adjectives": ["Red", "Red"], "pseudonym_nouns": ["Fox"]}"#,
        );
        assert!(matches!(result, Err(ConfigError::PseudonymPoolTooSmall)));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            GameConfig::from_json(r#"{"default_locale": " "}"#),
            Err(ConfigError::EmptyLocale)
        ));
        assert!(matches!(
            GameConfig::from_json(r#"{"idle_timeout_secs": 0}"#),
            Err(ConfigError::ZeroIdleTimeout)
        ));
        assert!(matches!(
            GameConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
