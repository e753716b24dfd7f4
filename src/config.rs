//! Configuration management for the highlight service

use serde::Deserialize;
use std::env;
use thiserror::Error;

use crate::html::HighlightConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub highlight: HighlightConfig,
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of loaded documents kept in memory
    pub max_documents: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            highlight: HighlightConfig::default(),
            sessions: SessionConfig { max_documents: 64 },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            highlight: HighlightConfig {
                marker_class: env::var("HIGHLIGHT_MARKER_CLASS")
                    .unwrap_or(defaults.highlight.marker_class),
                marker_tag: env::var("HIGHLIGHT_MARKER_TAG").unwrap_or(defaults.highlight.marker_tag),
            },
            sessions: SessionConfig {
                max_documents: parse_var("MAX_DOCUMENTS", defaults.sessions.max_documents)?,
            },
        })
    }

    /// Socket address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    let Ok(value) = env::var(var) else {
        return Ok(default);
    };
    let parsed: Result<T, _> = value.trim().parse();
    parsed.map_err(|_| ConfigError::InvalidValue { var, value })
}
