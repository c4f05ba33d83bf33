use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::tracker::DEFAULT_COMPLETION_THRESHOLD;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

/// Knobs the engine itself reads.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub completion_threshold: f64,
    pub certificate_code_prefix: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            certificate_code_prefix: "CERT".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub log_filter: String,
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub catalog_file: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub renderer_url: Option<String>,
    pub engine: EngineSettings,
}

impl Config {
    /// Read configuration from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = parse_or(&get, "STORAGE_BACKEND", StorageBackend::Postgres)?;
        let database_url = get("DATABASE_URL").filter(|s| !s.is_empty());
        if backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let completion_threshold: f64 =
            parse_or(&get, "WATCH_COMPLETION_THRESHOLD", DEFAULT_COMPLETION_THRESHOLD)?;
        if !(completion_threshold > 0.0 && completion_threshold <= 1.0) {
            return Err(ConfigError::Invalid {
                var: "WATCH_COMPLETION_THRESHOLD",
                reason: "must be in (0, 1]".into(),
            });
        }

        let prefix = get("CERTIFICATE_CODE_PREFIX").unwrap_or_else(|| "CERT".into());
        if prefix.is_empty() || prefix.len() > 12 || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::Invalid {
                var: "CERTIFICATE_CODE_PREFIX",
                reason: "expected 1-12 ASCII letters or digits".into(),
            });
        }

        Ok(Self {
            port: parse_or(&get, "PORT", 8081)?,
            log_filter: get("RUST_LOG")
                .unwrap_or_else(|| "course_progress=info,axum=info".into()),
            backend,
            database_url,
            max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            catalog_file: get("CATALOG_FILE").map(PathBuf::from),
            data_dir: PathBuf::from(get("DATA_DIR").unwrap_or_else(|| "./data".into())),
            renderer_url: get("CERTIFICATE_RENDERER_URL").filter(|s| !s.is_empty()),
            engine: EngineSettings {
                completion_threshold,
                certificate_code_prefix: prefix,
            },
        })
    }
}

fn parse_or<F, T>(get: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
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
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn memory_backend_defaults() {
        let cfg = Config::from_lookup(lookup(&[("STORAGE_BACKEND", "memory")])).unwrap();
        assert_eq!(cfg.backend, StorageBackend::Memory);
        assert_eq!(cfg.port, 8081);
        assert_eq!(cfg.engine, EngineSettings::default());
        assert!(cfg.renderer_url.is_none());
    }

    #[test]
    fn postgres_requires_database_url() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));

        let cfg = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/lms")]))
            .unwrap();
        assert_eq!(cfg.backend, StorageBackend::Postgres);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        for bad in ["0", "1.5", "-0.2", "abc"] {
            let err = Config::from_lookup(lookup(&[
                ("STORAGE_BACKEND", "memory"),
                ("WATCH_COMPLETION_THRESHOLD", bad),
            ]))
            .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::Invalid { var: "WATCH_COMPLETION_THRESHOLD", .. }
            ));
        }
    }

    #[test]
    fn rejects_bad_port_and_prefix() {
        let err = Config::from_lookup(lookup(&[("STORAGE_BACKEND", "memory"), ("PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));

        let err = Config::from_lookup(lookup(&[
            ("STORAGE_BACKEND", "memory"),
            ("CERTIFICATE_CODE_PREFIX", "NO-DASH"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "CERTIFICATE_CODE_PREFIX", .. }));
    }
}
