//! CLI configuration: YAML file, then environment, then flags.

use std::path::Path;

use anyhow::{Context, Result};
use chunkwise_core::ChunkerConfig;
use chunkwise_observability::LogConfig;
use serde::Deserialize;

pub const ENV_CHUNK_SIZE: &str = "CHUNKWISE_CHUNK_SIZE";
pub const ENV_LOG: &str = "CHUNKWISE_LOG";

/// Contents of a `--config` YAML file.
///
/// ```yaml
/// chunker:
///   chunk_size: 200
/// log:
///   level: info
///   components:
///     chunkwise-core: debug
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub chunker: ChunkerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl CliConfig {
    /// Load from `path`, or defaults when no file was given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file '{}'", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config file '{}'", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.chunker.validate()?;
        Ok(config)
    }

    /// Apply `CHUNKWISE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(ENV_CHUNK_SIZE) {
            let size: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_CHUNK_SIZE}='{raw}' is not a chunk size"))?;
            let chunker = ChunkerConfig::with_chunk_size(size);
            chunker.validate()?;
            self.chunker = chunker;
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.log.level = level;
        }
        Ok(())
    }

    /// Apply command-line flags, which win over everything else.
    pub fn apply_flags(&mut self, chunk_size: Option<usize>, verbose: bool) -> Result<()> {
        if let Some(size) = chunk_size {
            let chunker = ChunkerConfig::with_chunk_size(size);
            chunker.validate()?;
            self.chunker = chunker;
        }
        if verbose {
            self.log.level = "debug".into();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkwise_core::DEFAULT_CHUNK_SIZE;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = CliConfig::from_yaml("{}").unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.chunker.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn yaml_sections_parse() {
        let config = CliConfig::from_yaml(
            "chunker:\n  chunk_size: 200\nlog:\n  level: warn\n  components:\n    chunkwise-core: debug\n",
        )
        .unwrap();
        assert_eq!(config.chunker.chunk_size, 200);
        assert_eq!(config.log.level, "warn");
        assert_eq!(config.log.components["chunkwise-core"], "debug");
    }

    #[test]
    fn zero_chunk_size_in_file_rejected() {
        assert!(CliConfig::from_yaml("chunker:\n  chunk_size: 0\n").is_err());
    }

    #[test]
    fn precedence_flag_over_env_over_file() {
        let mut config = CliConfig::from_yaml("chunker:\n  chunk_size: 10\n").unwrap();
        config
            .apply_env_from(env(&[(ENV_CHUNK_SIZE, "20"), (ENV_LOG, "trace")]))
            .unwrap();
        assert_eq!(config.chunker.chunk_size, 20);
        assert_eq!(config.log.level, "trace");

        config.apply_flags(Some(30), false).unwrap();
        assert_eq!(config.chunker.chunk_size, 30);
        assert_eq!(config.log.level, "trace");

        config.apply_flags(None, true).unwrap();
        assert_eq!(config.chunker.chunk_size, 30);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn bad_env_values_rejected() {
        let mut config = CliConfig::default();
        assert!(config
            .apply_env_from(env(&[(ENV_CHUNK_SIZE, "lots")]))
            .is_err());
        assert!(config.apply_env_from(env(&[(ENV_CHUNK_SIZE, "0")])).is_err());
        assert_eq!(config, CliConfig::default());
    }
}
