//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use brass_core::Credentials;
use brass_framework::BotSettings;
use serde::{Deserialize, Serialize};

/// Environment variable consulted when no token is configured.
pub const TOKEN_ENV: &str = "BOT_TOKEN";
/// Environment variable consulted when no application id is configured.
pub const APPLICATION_ID_ENV: &str = "BOT_ID";

/// Root configuration structure.
///
/// Bot settings (`prefix`, `owners`, `beta`, `theme`, `dispatch`) sit at the
/// top level of the file; credentials and logging have their own sections.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrassConfig {
    #[serde(flatten)]
    pub bot: BotSettings,

    /// Credentials used for slash command registration.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Credentials
// =============================================================================

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
}

impl CredentialsConfig {
    /// Resolves credentials, falling back to `BOT_TOKEN` and `BOT_ID`.
    ///
    /// Returns `None` unless both parts are present and non-empty.
    pub fn resolve(&self) -> Option<Credentials> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Like [`resolve`](Self::resolve) with a custom environment lookup.
    pub fn resolve_with<F>(&self, lookup: F) -> Option<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |configured: &Option<String>, env: &str| {
            configured
                .clone()
                .or_else(|| lookup(env))
                .filter(|value| !value.trim().is_empty())
        };
        Some(Credentials {
            token: pick(&self.token, TOKEN_ENV)?,
            application_id: pick(&self.application_id, APPLICATION_ID_ENV)?,
        })
    }
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("application_id", &self.application_id)
            .finish()
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Span lifecycle events to log.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    /// Log file for `output = "file"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Per-target levels, e.g. `brass_framework = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::default(),
            filters: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to compact otherwise.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Log file rotation for `output = "file"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_fall_back_to_environment() {
        let env = |key: &str| match key {
            TOKEN_ENV => Some("env-token".to_string()),
            APPLICATION_ID_ENV => Some("123".to_string()),
            _ => None,
        };

        let configured = CredentialsConfig {
            token: Some("file-token".into()),
            application_id: None,
        };
        let resolved = configured.resolve_with(env).unwrap();
        assert_eq!(resolved.token, "file-token");
        assert_eq!(resolved.application_id, "123");

        assert!(CredentialsConfig::default().resolve_with(|_| None).is_none());
        let blank = CredentialsConfig {
            token: Some("  ".into()),
            application_id: Some("1".into()),
        };
        assert!(blank.resolve_with(|_| None).is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let credentials = CredentialsConfig {
            token: Some("secret".into()),
            application_id: Some("1".into()),
        };
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
