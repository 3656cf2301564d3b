//! Tracing / logging initialisation helpers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log level per component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Global default level: "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
    /// Override per component: crate name → level
    #[serde(default)]
    pub components: BTreeMap<String, String>,
    /// Emit JSON structured logs (true) or human-readable text (false)
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: BTreeMap::new(),
            json: false,
        }
    }
}

/// Errors from [`init_tracing`].
#[derive(Debug, Error)]
pub enum TracingInitError {
    #[error("Invalid log directives '{directives}': {reason}")]
    InvalidDirectives { directives: String, reason: String },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialised,
}

/// Build the filter directive string: `"info,chunkwise_core=debug"` etc.
pub fn build_directives(config: &LogConfig) -> String {
    let mut directives = config.level.clone();
    for (component, level) in &config.components {
        directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
    }
    directives
}

/// Initialise tracing with the given log config.
/// Should be called once at application startup. Records go to stderr so
/// they never interleave with command output on stdout.
pub fn init_tracing(config: &LogConfig) -> Result<(), TracingInitError> {
    let directives = build_directives(config);
    let filter =
        EnvFilter::try_new(&directives).map_err(|e| TracingInitError::InvalidDirectives {
            directives: directives.clone(),
            reason: e.to_string(),
        })?;

    let result = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|_| TracingInitError::AlreadyInitialised)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_include_components() {
        let mut config = LogConfig::default();
        config
            .components
            .insert("chunkwise-core".into(), "debug".into());
        config.components.insert("chunkwise-cli".into(), "warn".into());
        assert_eq!(
            build_directives(&config),
            "info,chunkwise_cli=warn,chunkwise_core=debug"
        );
    }

    #[test]
    fn deserialize_defaults() {
        let config: LogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn invalid_directives_rejected() {
        let config = LogConfig {
            level: "info,chunkwise_core=notalevel".into(),
            ..LogConfig::default()
        };
        assert!(matches!(
            init_tracing(&config),
            Err(TracingInitError::InvalidDirectives { .. })
        ));
    }
}
