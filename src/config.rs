//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Runtime configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// Port for the REST server.
    pub http_port: u16,
    /// User the terminal walkthrough runs as.
    pub user_id: String,
    /// Persist the session snapshot after every transition.
    /// When false only the completed profile is saved.
    pub autosave: bool,
    /// Whether tips start out visible.
    pub show_tips: bool,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/fithero-onboarding.db"),
            http_port: 8080,
            user_id: "default".to_string(),
            autosave: true,
            show_tips: false,
        }
    }
}

impl OnboardingConfig {
    /// Build config from `FITHERO_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_path = lookup("FITHERO_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let http_port = match lookup("FITHERO_HTTP_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "FITHERO_HTTP_PORT".to_string(),
                message: e.to_string(),
            })?,
            None => defaults.http_port,
        };

        let user_id = lookup("FITHERO_USER_ID")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.user_id);

        let autosave = match lookup("FITHERO_AUTOSAVE") {
            Some(raw) => parse_bool("FITHERO_AUTOSAVE", &raw)?,
            None => defaults.autosave,
        };

        let show_tips = match lookup("FITHERO_SHOW_TIPS") {
            Some(raw) => parse_bool("FITHERO_SHOW_TIPS", &raw)?,
            None => defaults.show_tips,
        };

        Ok(Self {
            db_path,
            http_port,
            user_id,
            autosave,
            show_tips,
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = OnboardingConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.user_id, "default");
        assert!(config.autosave);
        assert!(!config.show_tips);
        assert_eq!(config.db_path, PathBuf::from("./data/fithero-onboarding.db"));
    }

    #[test]
    fn reads_overrides() {
        let config = OnboardingConfig::from_lookup(lookup_from(&[
            ("FITHERO_DB_PATH", "/tmp/x.db"),
            ("FITHERO_HTTP_PORT", "9090"),
            ("FITHERO_USER_ID", "alice"),
            ("FITHERO_AUTOSAVE", "off"),
            ("FITHERO_SHOW_TIPS", "yes"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.user_id, "alice");
        assert!(!config.autosave);
        assert!(config.show_tips);
    }

    #[test]
    fn blank_user_id_falls_back() {
        let config =
            OnboardingConfig::from_lookup(lookup_from(&[("FITHERO_USER_ID", "   ")])).unwrap();
        assert_eq!(config.user_id, "default");
    }

    #[test]
    fn rejects_bad_port() {
        let err = OnboardingConfig::from_lookup(lookup_from(&[("FITHERO_HTTP_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("FITHERO_HTTP_PORT"));
    }

    #[test]
    fn rejects_bad_bool() {
        let err = OnboardingConfig::from_lookup(lookup_from(&[("FITHERO_AUTOSAVE", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("FITHERO_AUTOSAVE"));
    }
}
