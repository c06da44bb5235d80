#![forbid(unsafe_code)]

//! Runtime configuration.
//!
//! Loaded from TOML, then optionally overridden from `FWEB_*` environment
//! variables. Durations are written as fractional seconds:
//!
//! ```toml
//! message_history_length = 500
//! reconnect_timeout = 5.0
//! binding_refresh_interval = 0.25
//! ```
//!
//! # Invariants
//!
//! 1. Every interval and timeout is strictly positive after [`Config::validate`].
//! 2. A shared client ignores `message_history_length` and keeps no history.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "FWEB_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Delivered frames retained per private client for replay.
    pub message_history_length: usize,
    /// Grace period before a disconnected client is deleted.
    #[serde(with = "seconds")]
    pub reconnect_timeout: Duration,
    /// Period of the polled-link refresh pass.
    #[serde(with = "seconds")]
    pub binding_refresh_interval: Duration,
    /// A refresh pass slower than this logs a warning.
    #[serde(with = "seconds")]
    pub max_propagation_time: Duration,
    /// Default wait of `Client::connected`.
    #[serde(with = "seconds")]
    pub connect_timeout: Duration,
    /// Default wait for a script response.
    #[serde(with = "seconds")]
    pub script_timeout: Duration,
    /// Longest sleep of a client's outbox loop between wake-ups.
    #[serde(with = "seconds")]
    pub outbox_idle_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            message_history_length: 1000,
            reconnect_timeout: Duration::from_secs(3),
            binding_refresh_interval: Duration::from_millis(100),
            max_propagation_time: Duration::from_millis(10),
            connect_timeout: Duration::from_secs(3),
            script_timeout: Duration::from_secs(1),
            outbox_idle_interval: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(|err| Error::config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|err| Error::config(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Apply `FWEB_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(std::env::vars())
    }

    /// Apply overrides from explicit `(name, value)` pairs.
    ///
    /// Names are matched case-insensitively after stripping [`ENV_PREFIX`];
    /// unrelated names are ignored.
    pub fn with_overrides<I, K, V>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in vars {
            let Some(key) = name.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();
            match key.to_ascii_lowercase().as_str() {
                "message_history_length" => {
                    self.message_history_length = value.parse().map_err(|_| {
                        Error::config(format!("{name} must be an integer, got `{value}`", name = name.as_ref()))
                    })?;
                }
                "reconnect_timeout" => self.reconnect_timeout = parse_seconds(name.as_ref(), value)?,
                "binding_refresh_interval" => {
                    self.binding_refresh_interval = parse_seconds(name.as_ref(), value)?;
                }
                "max_propagation_time" => {
                    self.max_propagation_time = parse_seconds(name.as_ref(), value)?;
                }
                "connect_timeout" => self.connect_timeout = parse_seconds(name.as_ref(), value)?,
                "script_timeout" => self.script_timeout = parse_seconds(name.as_ref(), value)?,
                "outbox_idle_interval" => {
                    self.outbox_idle_interval = parse_seconds(name.as_ref(), value)?;
                }
                _ => {}
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("reconnect_timeout", self.reconnect_timeout),
            ("binding_refresh_interval", self.binding_refresh_interval),
            ("max_propagation_time", self.max_propagation_time),
            ("connect_timeout", self.connect_timeout),
            ("script_timeout", self.script_timeout),
            ("outbox_idle_interval", self.outbox_idle_interval),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(Error::config(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}

fn parse_seconds(name: &str, value: &str) -> Result<Duration> {
    let secs: f64 = value
        .parse()
        .map_err(|_| Error::config(format!("{name} must be a number of seconds, got `{value}`")))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| Error::config(format!("{name} must be a non-negative number of seconds")))
}

mod seconds {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.message_history_length, 1000);
        assert_eq!(config.binding_refresh_interval, Duration::from_millis(100));
    }

    #[test]
    fn toml_overrides_selected_fields() {
        let config = Config::from_toml_str(
            "message_history_length = 10\nreconnect_timeout = 0.5\n",
        )
        .unwrap();
        assert_eq!(config.message_history_length, 10);
        assert_eq!(config.reconnect_timeout, Duration::from_millis(500));
        assert_eq!(config.script_timeout, Duration::from_secs(1));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml_str("histroy = 3").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = Config::from_toml_str("binding_refresh_interval = 0.0").unwrap_err();
        assert!(err.to_string().contains("binding_refresh_interval"));
    }

    #[test]
    fn env_style_overrides() {
        let config = Config::default()
            .with_overrides([
                ("FWEB_SCRIPT_TIMEOUT", "2.5"),
                ("FWEB_MESSAGE_HISTORY_LENGTH", "7"),
                ("PATH", "/usr/bin"),
            ])
            .unwrap();
        assert_eq!(config.script_timeout, Duration::from_millis(2500));
        assert_eq!(config.message_history_length, 7);
    }

    #[test]
    fn bad_env_value_is_reported() {
        let err = Config::default()
            .with_overrides([("FWEB_CONNECT_TIMEOUT", "soon")])
            .unwrap_err();
        assert!(err.to_string().contains("FWEB_CONNECT_TIMEOUT"));
    }
}
