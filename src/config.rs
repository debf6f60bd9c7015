//! Startup configuration. One explicit struct, read from the
//! environment once and validated before anything opens a socket or a
//! database.

use std::net::SocketAddr;
use std::path::PathBuf;

pub const APP_NAME: &str = "Cardion";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when `CARDION_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "cardion=info,tower_http=warn"
}

/// Default database location under the platform data directory.
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cardion")
        .join("cardion.db")
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub predictor: PredictorConfig,
}

/// Which transport reaches the external predictor, plus the single
/// timeout bound both transports share.
#[derive(Debug, Clone)]
pub enum PredictorConfig {
    Http { url: String, timeout_secs: u64 },
    Subprocess { command: String, timeout_secs: u64 },
}

impl PredictorConfig {
    pub fn timeout_secs(&self) -> u64 {
        match self {
            PredictorConfig::Http { timeout_secs, .. } => *timeout_secs,
            PredictorConfig::Subprocess { timeout_secs, .. } => *timeout_secs,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

const DEFAULT_BIND: &str = "0.0.0.0:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

impl AppConfig {
    /// Read and validate configuration from process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but with an injectable source, so tests do
    /// not mutate process-global environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw = get("CARDION_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr: SocketAddr = bind_raw.parse().map_err(|e| ConfigError::Invalid {
            name: "CARDION_BIND",
            reason: format!("{e} (got \"{bind_raw}\")"),
        })?;

        let database_path = get("CARDION_DB")
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let timeout_secs = match get("CARDION_PREDICTOR_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT_SECS,
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
                    name: "CARDION_PREDICTOR_TIMEOUT_SECS",
                    reason: format!("expected an integer, got \"{raw}\""),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        name: "CARDION_PREDICTOR_TIMEOUT_SECS",
                        reason: "must be at least 1".into(),
                    });
                }
                secs
            }
        };

        let mode = get("CARDION_PREDICTOR_MODE").unwrap_or_else(|| "http".to_string());
        let predictor = match mode.as_str() {
            "http" => {
                let url = get("CARDION_PREDICTOR_URL")
                    .ok_or(ConfigError::Missing("CARDION_PREDICTOR_URL"))?;
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ConfigError::Invalid {
                        name: "CARDION_PREDICTOR_URL",
                        reason: format!("expected an http(s) URL, got \"{url}\""),
                    });
                }
                PredictorConfig::Http { url, timeout_secs }
            }
            "subprocess" => {
                let command = get("CARDION_PREDICTOR_CMD")
                    .ok_or(ConfigError::Missing("CARDION_PREDICTOR_CMD"))?;
                if command.trim().is_empty() {
                    return Err(ConfigError::Invalid {
                        name: "CARDION_PREDICTOR_CMD",
                        reason: "must not be empty".into(),
                    });
                }
                PredictorConfig::Subprocess {
                    command,
                    timeout_secs,
                }
            }
            other => {
                return Err(ConfigError::Invalid {
                    name: "CARDION_PREDICTOR_MODE",
                    reason: format!("expected \"http\" or \"subprocess\", got \"{other}\""),
                })
            }
        };

        Ok(AppConfig {
            bind_addr,
            database_path,
            predictor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn http_mode_with_defaults() {
        let config = AppConfig::from_lookup(lookup(&[(
            "CARDION_PREDICTOR_URL",
            "http://127.0.0.1:8000/predict",
        )]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.predictor.timeout_secs(), 60);
        assert!(matches!(config.predictor, PredictorConfig::Http { .. }));
    }

    #[test]
    fn http_mode_requires_url() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CARDION_PREDICTOR_URL")));
    }

    #[test]
    fn rejects_non_http_url() {
        let err = AppConfig::from_lookup(lookup(&[("CARDION_PREDICTOR_URL", "ftp://x")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "CARDION_PREDICTOR_URL",
                ..
            }
        ));
    }

    #[test]
    fn subprocess_mode_requires_command() {
        let err = AppConfig::from_lookup(lookup(&[("CARDION_PREDICTOR_MODE", "subprocess")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CARDION_PREDICTOR_CMD")));

        let config = AppConfig::from_lookup(lookup(&[
            ("CARDION_PREDICTOR_MODE", "subprocess"),
            ("CARDION_PREDICTOR_CMD", "python3 ml/predict.py"),
        ]))
        .unwrap();
        assert!(matches!(
            config.predictor,
            PredictorConfig::Subprocess { .. }
        ));
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = AppConfig::from_lookup(lookup(&[("CARDION_PREDICTOR_MODE", "grpc")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "CARDION_PREDICTOR_MODE",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = AppConfig::from_lookup(lookup(&[
            ("CARDION_PREDICTOR_URL", "http://x/predict"),
            ("CARDION_PREDICTOR_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "CARDION_PREDICTOR_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn rejects_bad_bind_addr() {
        let err = AppConfig::from_lookup(lookup(&[
            ("CARDION_BIND", "not-an-addr"),
            ("CARDION_PREDICTOR_URL", "http://x/predict"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "CARDION_BIND", .. }));
    }

    #[test]
    fn custom_timeout_applies_to_predictor() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CARDION_PREDICTOR_URL", "https://predictor.internal/predict"),
            ("CARDION_PREDICTOR_TIMEOUT_SECS", "120"),
        ]))
        .unwrap();
        assert_eq!(config.predictor.timeout_secs(), 120);
    }
}
