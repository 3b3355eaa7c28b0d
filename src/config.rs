//! Configuration management

use std::{path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache behaviour
    pub coalescing: CoalescingConfig,
    /// Demonstration harness
    pub harness: HarnessConfig,
}

/// Coalescing cache configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoalescingConfig {
    /// Wait before each refresh so concurrent callers can pile up (0 disables)
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
}

/// Demonstration harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Concurrent worker threads
    pub workers: usize,
    /// Add-then-read rounds per worker
    pub rounds: usize,
    /// Delay used by the delayed coalescing run
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            workers: 100,
            rounds: 10,
            delay: Duration::from_millis(1),
        }
    }
}

impl Config {
    /// Load configuration from an optional YAML file, then `ZEROTIME_` env vars
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (ZEROTIME_ prefix, __ for nesting)
        figment = figment.merge(Env::prefixed("ZEROTIME_").split("__"));

        Self::from_figment(&figment)
    }

    /// Extract and validate configuration from an assembled figment
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject settings the harness cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.harness.workers == 0 {
            return Err(Error::Config("harness.workers must be > 0".to_string()));
        }
        if self.harness.rounds == 0 {
            return Err(Error::Config("harness.rounds must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s", "250ms")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Raw duration as written in YAML or the environment
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        /// Bare number of seconds (env vars arrive as integers)
        Secs(u64),
        /// Human-readable string
        Text(String),
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms") or bare seconds
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the value cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawDuration::deserialize(deserializer)? {
            RawDuration::Secs(secs) => Ok(Duration::from_secs(secs)),
            RawDuration::Text(s) => parse(&s).map_err(serde::de::Error::custom),
        }
    }

    /// Parse "100ms", "30s", "5m" or a bare number of seconds
    ///
    /// # Errors
    ///
    /// Returns a message if the numeric part is invalid or the duration overflows.
    pub fn parse(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let number = |n: &str| {
            n.trim()
                .parse::<u64>()
                .map_err(|e| format!("invalid duration {s:?}: {e}"))
        };

        // "ms" first, or "100ms" would be read as "100m" + "s"
        if let Some(ms) = s.strip_suffix("ms") {
            number(ms).map(Duration::from_millis)
        } else if let Some(secs) = s.strip_suffix('s') {
            number(secs).map(Duration::from_secs)
        } else if let Some(mins) = s.strip_suffix('m') {
            number(mins)?
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or_else(|| format!("duration {s:?} is too large"))
        } else {
            number(s).map(Duration::from_secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use figment::providers::Serialized;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.coalescing.delay, Duration::ZERO);
        assert_eq!(config.harness.workers, 100);
        assert_eq!(config.harness.rounds, 10);
        assert_eq!(config.harness.delay, Duration::from_millis(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let yaml = r#"
coalescing:
  delay: 5ms
harness:
  workers: 8
  rounds: 3
  delay: 2s
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.coalescing.delay, Duration::from_millis(5));
        assert_eq!(config.harness.workers, 8);
        assert_eq!(config.harness.rounds, 3);
        assert_eq!(config.harness.delay, Duration::from_secs(2));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("harness:\n  workers: 4\n").unwrap();
        assert_eq!(config.harness.workers, 4);
        assert_eq!(config.harness.rounds, 10);
        assert_eq!(config.coalescing, CoalescingConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zerotime.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "coalescing:\n  delay: 250ms\nharness:\n  rounds: 2").unwrap();
        drop(f);

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.coalescing.delay, Duration::from_millis(250));
        assert_eq!(config.harness.rounds, 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/zerotime.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.harness.workers = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_rounds() {
        let mut config = Config::default();
        config.harness.rounds = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_duration_parsing() {
        use humantime_serde::parse;

        assert_eq!(parse("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse("7").unwrap(), Duration::from_secs(7));
        assert!(parse("fast").is_err());
    }

    #[test]
    fn test_duration_parsing_rejects_overflowing_minutes() {
        let err = humantime_serde::parse("307445734561825861m").unwrap_err();
        assert!(err.contains("too large"));
    }

    #[test]
    fn test_yaml_accepts_bare_seconds() {
        let config: Config = serde_yaml::from_str("harness:\n  delay: 7\n").unwrap();
        assert_eq!(config.harness.delay, Duration::from_secs(7));
    }

    #[test]
    fn test_figment_accepts_integer_delay() {
        // Env values such as ZEROTIME_HARNESS__DELAY=7 reach serde as integers.
        let figment = Figment::new().merge(Serialized::default("harness.delay", 7_u64));
        let config = Config::from_figment(&figment).unwrap();
        assert_eq!(config.harness.delay, Duration::from_secs(7));
    }

    #[test]
    fn test_duration_serializes_back() {
        let config = Config::default();
        let yaml = config.to_yaml().unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, config);
    }
}
