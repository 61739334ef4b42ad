use {
    crate::{
        session::{OpenOptions, DEFAULT_IDLE_RESET, DEFAULT_POLL_INTERVAL},
        settings::Settings,
    },
    std::{env, path::PathBuf, str::FromStr, time::Duration},
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in .env or passed as the first argument")]
    MissingVariable(String),

    #[error("invalid value for {0}")]
    InvalidValue(String),
}

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub log_path: PathBuf,
    pub tail: bool,
    pub poll_interval: Duration,
    pub pet_names: Vec<String>,
    pub normalize_skill_names: bool,
    pub idle_reset: Duration,
    pub rust_log: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `COMBATFLOW_LOG_PATH` (required unless `cli_path` is given)
    /// - `COMBATFLOW_TAIL` (default: true)
    /// - `COMBATFLOW_POLL_INTERVAL_MS` (default: 100)
    /// - `COMBATFLOW_PET_NAMES` (comma-separated, default: empty)
    /// - `COMBATFLOW_NORMALIZE_SKILLS` (default: false)
    /// - `COMBATFLOW_IDLE_RESET_SECS` (default: 10)
    pub fn from_env(cli_path: Option<String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok(), cli_path)
    }

    pub fn from_lookup<F>(lookup: F, cli_path: Option<String>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_path = cli_path
            .or_else(|| lookup("COMBATFLOW_LOG_PATH"))
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingVariable("COMBATFLOW_LOG_PATH".to_string()))?;

        let pet_names = lookup("COMBATFLOW_PET_NAMES")
            .map(|s| {
                s.split(',')
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            log_path,
            tail: parse_var(&lookup, "COMBATFLOW_TAIL")?.unwrap_or(true),
            poll_interval: parse_var(&lookup, "COMBATFLOW_POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            pet_names,
            normalize_skill_names: parse_var(&lookup, "COMBATFLOW_NORMALIZE_SKILLS")?
                .unwrap_or(false),
            idle_reset: parse_var(&lookup, "COMBATFLOW_IDLE_RESET_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_IDLE_RESET),
            rust_log: lookup("RUST_LOG"),
        })
    }

    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            tail: self.tail,
            poll_interval: self.poll_interval,
            idle_reset: self.idle_reset,
            ..OpenOptions::default()
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            pet_names: self.pet_names.clone(),
            normalize_skill_names: self.normalize_skill_names,
        }
    }
}

/// Unset or blank is `None`; anything unparseable is an error
fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup(&[("COMBATFLOW_LOG_PATH", "/tmp/combat.log")]), None)
                .unwrap();

        assert_eq!(config.log_path, PathBuf::from("/tmp/combat.log"));
        assert!(config.tail);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert!(config.pet_names.is_empty());
        assert!(!config.normalize_skill_names);
        assert_eq!(config.idle_reset, Duration::from_secs(10));
    }

    #[test]
    fn test_cli_path_wins_and_values_parse() {
        let config = Config::from_lookup(
            lookup(&[
                ("COMBATFLOW_LOG_PATH", "/tmp/ignored.log"),
                ("COMBATFLOW_TAIL", "false"),
                ("COMBATFLOW_POLL_INTERVAL_MS", "250"),
                ("COMBATFLOW_PET_NAMES", "Wolf, Fluffy Bear ,,"),
                ("COMBATFLOW_NORMALIZE_SKILLS", "true"),
            ]),
            Some("/tmp/chosen.log".to_string()),
        )
        .unwrap();

        assert_eq!(config.log_path, PathBuf::from("/tmp/chosen.log"));
        assert!(!config.open_options().tail);
        assert_eq!(config.open_options().poll_interval, Duration::from_millis(250));
        assert_eq!(config.settings().pet_names, vec!["Wolf", "Fluffy Bear"]);
        assert!(config.settings().normalize_skill_names);
    }

    #[test]
    fn test_missing_path_and_invalid_values() {
        let err = Config::from_lookup(lookup(&[]), None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable(ref key) if key == "COMBATFLOW_LOG_PATH"));

        let err = Config::from_lookup(
            lookup(&[
                ("COMBATFLOW_LOG_PATH", "/tmp/combat.log"),
                ("COMBATFLOW_POLL_INTERVAL_MS", "fast"),
            ]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "COMBATFLOW_POLL_INTERVAL_MS"));
    }
}
