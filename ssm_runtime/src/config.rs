//! Runtime configuration.
//!
//! Loads from `$SSM_CONFIG_PATH` or `./ssm.toml`. A missing file means
//! defaults. Precedence: CLI flags > env vars > config file > defaults.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub log: LogConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Which sections the `replay` command prints.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub show_trace: bool,
    pub show_threads: bool,
    pub show_chain: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            show_trace: true,
            show_threads: false,
            show_chain: true,
        }
    }
}

impl RuntimeConfig {
    /// Load with precedence env vars > file > defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let env = |key: &str| std::env::var(key).ok();
        let mut config = Self::load_from(Self::config_path_with(env))?;
        config.apply_overrides(env);
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    /// Resolve config path using a custom env resolver (for testing).
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("SSM_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("ssm.toml"))
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function so tests need not touch the process env.
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(level) = env("SSM_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Some(json) = env("SSM_LOG_JSON") {
            self.log.json = matches!(json.as_str(), "1" | "true" | "yes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolver(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let c = RuntimeConfig::default();
        assert_eq!(c.log.level, "info");
        assert!(!c.log.json);
        assert!(c.output.show_trace);
        assert!(!c.output.show_threads);
        assert!(c.output.show_chain);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = RuntimeConfig::from_toml("[output]\nshow_chain = false\n").unwrap();
        assert!(!c.output.show_chain);
        assert!(c.output.show_trace);
        assert_eq!(c.log.level, "info");
    }

    #[test]
    fn bad_toml_is_error() {
        assert!(RuntimeConfig::from_toml("[log\nlevel=").is_err());
    }

    #[test]
    fn env_overrides_file() {
        let mut c = RuntimeConfig::from_toml("[log]\nlevel = \"warn\"\n").unwrap();
        c.apply_overrides(resolver(&[("SSM_LOG_LEVEL", "debug"), ("SSM_LOG_JSON", "true")]));
        assert_eq!(c.log.level, "debug");
        assert!(c.log.json);
    }

    #[test]
    fn config_path_resolution() {
        assert_eq!(
            RuntimeConfig::config_path_with(resolver(&[])),
            PathBuf::from("ssm.toml")
        );
        assert_eq!(
            RuntimeConfig::config_path_with(resolver(&[("SSM_CONFIG_PATH", "/etc/ssm.toml")])),
            PathBuf::from("/etc/ssm.toml")
        );
    }

    #[test]
    fn missing_file_gives_defaults() {
        let c = RuntimeConfig::load_from(PathBuf::from("/nonexistent/ssm/ssm.toml")).unwrap();
        assert_eq!(c, RuntimeConfig::default());
    }
}
