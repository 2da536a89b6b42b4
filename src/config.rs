use std::env;

use crate::error::ConfigError;
use crate::relay::game::{GameOptions, ScoreScope};

/// Represents the configuration settings for the typerace server.
///
/// Values start from [`RaceConfig::default`], are overridden by `APP_*`
/// environment variables (a `.env` file is loaded first by the binary) and
/// finally by command line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceConfig {
    /// Possible values are "production" or "development".
    pub app_environment: String,

    /// The address the server binds to.
    pub app_host: String,

    /// The port the server listens on.
    pub app_port: u16,

    /// The origin allowed to open cross-origin requests. `*` allows any.
    pub app_origin: String,

    /// Who receives score updates.
    pub score_scope: ScoreScope,

    /// The highest winning score a room may be created with.
    pub max_winning_score: usize,
}

impl Default for RaceConfig {
    fn default() -> Self {
        RaceConfig {
            app_environment: "development".to_string(),
            app_host: "0.0.0.0".to_string(),
            app_port: 7000,
            app_origin: "*".to_string(),
            score_scope: ScoreScope::default(),
            max_winning_score: GameOptions::DEFAULT_MAX_WINNING_SCORE,
        }
    }
}

impl RaceConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        RaceConfig::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Unset keys keep their default. Set keys that fail to parse are an
    /// error rather than silently falling back. `PORT` is read when
    /// `APP_PORT` is unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RaceConfig::default();

        if let Some(value) = lookup("APP_ENVIRONMENT") {
            config.app_environment = value;
        }
        if let Some(value) = lookup("APP_HOST") {
            config.app_host = value;
        }
        let port = lookup("APP_PORT")
            .map(|value| ("APP_PORT", value))
            .or_else(|| lookup("PORT").map(|value| ("PORT", value)));
        if let Some((key, value)) = port {
            config.app_port = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value })?;
        }
        if let Some(value) = lookup("APP_ORIGIN") {
            config.app_origin = value;
        }
        if let Some(value) = lookup("APP_SCORE_SCOPE") {
            config.score_scope = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "APP_SCORE_SCOPE",
                value,
            })?;
        }
        if let Some(value) = lookup("APP_MAX_WINNING_SCORE") {
            config.max_winning_score = match value.trim().parse::<usize>() {
                Ok(max) if max > 0 => max,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "APP_MAX_WINNING_SCORE",
                        value,
                    })
                }
            };
        }

        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.app_host, self.app_port)
    }

    pub fn game_options(&self) -> GameOptions {
        GameOptions {
            score_scope: self.score_scope,
            max_winning_score: self.max_winning_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RaceConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, RaceConfig::default());
        assert_eq!(config.listen_addr(), "0.0.0.0:7000");
        assert_eq!(config.game_options(), GameOptions::default());
    }

    #[test]
    fn test_overrides() {
        let config = RaceConfig::from_lookup(lookup(&[
            ("APP_HOST", "127.0.0.1"),
            ("APP_PORT", "9001"),
            ("APP_ORIGIN", "http://localhost:3000"),
            ("APP_SCORE_SCOPE", "room"),
            ("APP_MAX_WINNING_SCORE", "25"),
        ]))
        .unwrap();

        assert_eq!(config.listen_addr(), "127.0.0.1:9001");
        assert_eq!(config.app_origin, "http://localhost:3000");
        assert_eq!(
            config.game_options(),
            GameOptions {
                score_scope: ScoreScope::Room,
                max_winning_score: 25,
            }
        );
    }

    #[test]
    fn test_port_fallback() {
        let config = RaceConfig::from_lookup(lookup(&[("PORT", "8080")])).unwrap();
        assert_eq!(config.app_port, 8080);

        let config =
            RaceConfig::from_lookup(lookup(&[("PORT", "8080"), ("APP_PORT", "9001")])).unwrap();
        assert_eq!(config.app_port, 9001);

        assert_eq!(
            RaceConfig::from_lookup(lookup(&[("PORT", "http")])),
            Err(ConfigError::InvalidValue {
                key: "PORT",
                value: "http".to_string(),
            })
        );
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            RaceConfig::from_lookup(lookup(&[("APP_PORT", "seven")])),
            Err(ConfigError::InvalidValue {
                key: "APP_PORT",
                value: "seven".to_string(),
            })
        );
        assert!(RaceConfig::from_lookup(lookup(&[("APP_SCORE_SCOPE", "galaxy")])).is_err());
        assert!(RaceConfig::from_lookup(lookup(&[("APP_MAX_WINNING_SCORE", "0")])).is_err());
    }
}
