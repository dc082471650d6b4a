mod llm;
mod reconnect;
mod server;
mod session;
mod stt;
mod tenant;
mod tools;
mod tts;

pub use llm::*;
pub use reconnect::*;
pub use server::*;
pub use session::*;
pub use stt::*;
pub use tenant::*;
pub use tools::*;
pub use tts::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregated configuration for `rc-gateway` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub stt: SttConfig,
    #[serde(default)]
    pub tts: TtsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub tenant: TenantConfig,
}

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        for (field, endpoint) in [
            ("stt.endpoint", &self.stt.endpoint),
            ("tts.endpoint", &self.tts.endpoint),
        ] {
            if endpoint.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: field.into(),
                    message: "endpoint must not be empty".into(),
                });
            } else if !endpoint.starts_with("ws://") && !endpoint.starts_with("wss://") {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: field.into(),
                    message: format!(
                        "endpoint must start with ws:// or wss:// (got \"{endpoint}\")"
                    ),
                });
            }
        }

        if self.llm.endpoint.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.endpoint".into(),
                message: "endpoint must not be empty".into(),
            });
        } else if !self.llm.endpoint.starts_with("http://") && !self.llm.endpoint.starts_with("https://") {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.endpoint".into(),
                message: format!(
                    "endpoint must start with http:// or https:// (got \"{}\")",
                    self.llm.endpoint
                ),
            });
        }

        if self.tools.max_calls_per_turn == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "tools.max_calls_per_turn".into(),
                message: "tool calls are disabled; the engine will never invoke a tool".into(),
            });
        }

        if self.session.debounce_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "session.debounce_ms".into(),
                message: "zero debounce disables utterance coalescing".into(),
            });
        }

        if self.session.farewell_phrases.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "session.farewell_phrases".into(),
                message: "no farewell phrases configured; calls will rely solely on the idle guard".into(),
            });
        }

        errors
    }
}
