use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
    #[serde(default = "default_collect_timeout_ms")]
    pub collect_timeout_ms: u64,
    #[serde(default = "default_top_processes")]
    pub top_processes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            reply_delay_ms: default_reply_delay_ms(),
            collect_timeout_ms: default_collect_timeout_ms(),
            top_processes: default_top_processes(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("config validation failed: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Validation(
                "listen must not be empty".to_string(),
            ));
        }
        if SocketAddr::from_str(&self.listen).is_err() {
            return Err(ConfigError::Validation(
                "listen must be a valid host:port address".to_string(),
            ));
        }
        if self.collect_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "collect_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.top_processes == 0 {
            return Err(ConfigError::Validation(
                "top_processes must be >= 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn default_listen() -> String {
    "0.0.0.0:3000".to_string()
}

const fn default_reply_delay_ms() -> u64 {
    1000
}

const fn default_collect_timeout_ms() -> u64 {
    2000
}

const fn default_top_processes() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default()
            .validate()
            .expect("default config must validate");
    }

    #[test]
    fn default_listen_uses_port_3000() {
        assert_eq!(Config::default().listen, "0.0.0.0:3000");
    }

    #[test]
    fn rejects_unparseable_listen() {
        let mut cfg = Config::default();
        cfg.listen = "not-an-address".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_collect_timeout() {
        let mut cfg = Config::default();
        cfg.collect_timeout_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn example_yaml_parses_to_defaults() {
        let cfg: Config =
            serde_yaml::from_str(Config::example_yaml()).expect("example yaml must parse");
        cfg.validate().expect("example yaml must validate");
        assert_eq!(cfg.reply_delay_ms, 1000);
        assert_eq!(cfg.collect_timeout_ms, 2000);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: Config = serde_yaml::from_str("listen: \"127.0.0.1:3000\"").unwrap();
        assert_eq!(cfg.reply_delay_ms, 1000);
        assert_eq!(cfg.top_processes, 10);
    }
}
