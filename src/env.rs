//! Runtime environment resolution.
//!
//! Flags and identifiers come from process configuration. Resolution never
//! fails: anything absent or malformed falls back to an empty string / false.

use serde::Deserialize;

/// Build mode the page was shipped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    Development,
    Production,
    Test,
    /// No mode configured; none of the mode predicates hold.
    #[default]
    #[serde(other)]
    Unspecified,
}

impl RuntimeMode {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => RuntimeMode::Development,
            "production" | "prod" => RuntimeMode::Production,
            "test" => RuntimeMode::Test,
            _ => RuntimeMode::Unspecified,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeMode::Development => "development",
            RuntimeMode::Production => "production",
            RuntimeMode::Test => "test",
            RuntimeMode::Unspecified => "unspecified",
        }
    }
}

/// Resolved analytics configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub mode: RuntimeMode,
    /// Backend account identifier (`G-XXXX`). Empty when unset.
    pub measurement_id: String,
    /// Enables developer-facing debug logging.
    pub debug: bool,
    pub app_version: String,
    pub section_tracking: bool,
    pub engagement_tracking: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::Unspecified,
            measurement_id: String::new(),
            debug: false,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            section_tracking: true,
            engagement_tracking: true,
        }
    }
}

impl Environment {
    /// Resolve from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            mode: lookup("APP_ENV")
                .map(|v| RuntimeMode::parse(&v))
                .unwrap_or_default(),
            measurement_id: lookup("GA_MEASUREMENT_ID")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            debug: lookup("ANALYTICS_DEBUG").map_or(false, |v| parse_flag(&v).unwrap_or(false)),
            app_version: lookup("APP_VERSION")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.app_version),
            section_tracking: lookup("ENABLE_SECTION_TRACKING")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.section_tracking),
            engagement_tracking: lookup("ENABLE_ENGAGEMENT_TRACKING")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.engagement_tracking),
        }
    }

    pub fn is_development(&self) -> bool {
        self.mode == RuntimeMode::Development
    }

    pub fn is_production(&self) -> bool {
        self.mode == RuntimeMode::Production
    }

    pub fn is_test(&self) -> bool {
        self.mode == RuntimeMode::Test
    }

    pub fn has_measurement_id(&self) -> bool {
        !self.measurement_id.is_empty()
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(pairs: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_empty_configuration() {
        let env = resolve(&[]);
        assert!(!env.is_development());
        assert!(!env.is_production());
        assert!(!env.is_test());
        assert_eq!(env.measurement_id, "");
        assert!(!env.debug);
        assert!(env.section_tracking);
    }

    #[test]
    fn test_production_configuration() {
        let env = resolve(&[
            ("APP_ENV", "Production"),
            ("GA_MEASUREMENT_ID", " G-ABC123 "),
            ("ANALYTICS_DEBUG", "on"),
            ("APP_VERSION", "3.1.0"),
            ("ENABLE_ENGAGEMENT_TRACKING", "false"),
        ]);
        assert!(env.is_production());
        assert_eq!(env.measurement_id, "G-ABC123");
        assert!(env.debug);
        assert_eq!(env.app_version, "3.1.0");
        assert!(!env.engagement_tracking);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let env = resolve(&[
            ("APP_ENV", "staging"),
            ("ANALYTICS_DEBUG", "maybe"),
            ("ENABLE_SECTION_TRACKING", "sometimes"),
        ]);
        assert_eq!(env.mode, RuntimeMode::Unspecified);
        assert!(!env.debug);
        assert!(env.section_tracking);
    }

    #[test]
    fn test_deserialize_from_json() {
        let env: Environment =
            serde_json::from_str(r#"{"mode":"test","measurement_id":"G-1"}"#).unwrap();
        assert!(env.is_test());
        assert_eq!(env.measurement_id, "G-1");
        assert!(env.engagement_tracking);
    }
}
