//! Process configuration resolved from the environment at startup.

use derive_getters::Getters;
use derive_more::{Display, Error};
use tracing::{debug, info, instrument};

const DEFAULT_MAX_PLAYERS: u32 = 2;
const DEFAULT_CHOICES: &str = "Cooperate,Defect";
const DEFAULT_DB_FILE: &str = "standoff.db";

/// Error raised for invalid or missing configuration values.
#[derive(Debug, Clone, Display, Error)]
#[display("configuration error: {message}")]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    /// Creates a new configuration error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The finite set of move strings accepted at the request boundary.
///
/// Resolved once from configuration; the stores treat choices as opaque
/// strings and this set is only consulted where requests enter the system.
#[derive(Debug, Clone, Getters)]
pub struct ChoiceSet {
    values: Vec<String>,
}

impl ChoiceSet {
    /// Parses a comma-separated list, dropping surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if no non-empty entry remains.
    #[instrument(skip(raw), fields(raw = %raw))]
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let values: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();

        if values.is_empty() {
            return Err(ConfigError::new(format!(
                "CHOICES must name at least one move, got '{}'",
                raw
            )));
        }

        debug!(count = values.len(), "parsed choice set");
        Ok(Self { values })
    }

    /// Whether `choice` is a permitted move string.
    pub fn contains(&self, choice: &str) -> bool {
        self.values.iter().any(|value| value == choice)
    }
}

impl std::fmt::Display for ChoiceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.values.join(", "))
    }
}

/// Read-only process configuration for the game server.
#[derive(Debug, Clone, Getters)]
pub struct GameConfig {
    /// Maximum participants per session.
    max_players: u32,
    /// Permitted move strings.
    choices: ChoiceSet,
    /// SQLite database location.
    database_url: String,
}

impl GameConfig {
    /// Creates a configuration from already-resolved values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `max_players` is zero.
    pub fn new(
        max_players: u32,
        choices: ChoiceSet,
        database_url: String,
    ) -> Result<Self, ConfigError> {
        if max_players == 0 {
            return Err(ConfigError::new("MAX_PLAYERS must be at least 1"));
        }
        Ok(Self {
            max_players,
            choices,
            database_url,
        })
    }

    /// Loads configuration from `MAX_PLAYERS`, `CHOICES`, and
    /// `GAME_DB_FILE`, falling back to a two-player Cooperate/Defect game
    /// on a local database file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a non-numeric or zero `MAX_PLAYERS` or
    /// an empty `CHOICES` list.
    #[instrument]
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_players = match std::env::var("MAX_PLAYERS") {
            Ok(raw) => raw.trim().parse::<u32>().map_err(|_| {
                ConfigError::new(format!(
                    "MAX_PLAYERS must be a positive integer, got '{}'",
                    raw
                ))
            })?,
            Err(_) => DEFAULT_MAX_PLAYERS,
        };

        let raw_choices =
            std::env::var("CHOICES").unwrap_or_else(|_| DEFAULT_CHOICES.to_string());
        let choices = ChoiceSet::parse(&raw_choices)?;

        let database_url =
            std::env::var("GAME_DB_FILE").unwrap_or_else(|_| DEFAULT_DB_FILE.to_string());

        let config = Self::new(max_players, choices, database_url)?;
        info!(
            max_players = config.max_players,
            choices = %config.choices,
            database_url = %config.database_url,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Replaces the database location (command-line override).
    pub fn with_database_url(mut self, database_url: String) -> Self {
        self.database_url = database_url;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice_set_trims_entries() {
        let choices = ChoiceSet::parse("Rock, Paper ,Scissors").expect("Parse failed");
        assert!(choices.contains("Rock"));
        assert!(choices.contains("Paper"));
        assert!(choices.contains("Scissors"));
        assert!(!choices.contains("Lizard"));
    }

    #[test]
    fn test_parse_empty_choice_set_fails() {
        assert!(ChoiceSet::parse("").is_err());
        assert!(ChoiceSet::parse(" , ,").is_err());
    }

    #[test]
    fn test_choice_set_display_lists_all() {
        let choices = ChoiceSet::parse("Cooperate,Defect").expect("Parse failed");
        assert_eq!(choices.to_string(), "Cooperate, Defect");
    }

    #[test]
    fn test_zero_max_players_rejected() {
        let choices = ChoiceSet::parse("Cooperate,Defect").expect("Parse failed");
        let result = GameConfig::new(0, choices, "game.db".to_string());
        assert!(result.is_err(), "Zero max players should fail");
    }
}
