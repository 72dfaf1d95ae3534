//! Runtime configuration from the environment.

use std::path::PathBuf;

use anyhow::Context;
use study_core::DEFAULT_QUEUE_LIMIT;

/// Server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub queue_limit: usize,
    pub algorithm: String,
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(value) => value
                .parse()
                .with_context(|| format!("PORT must be a port number, got {value:?}"))?,
            None => 3000,
        };
        let queue_limit = match lookup("QUEUE_LIMIT") {
            Some(value) => value
                .parse()
                .with_context(|| format!("QUEUE_LIMIT must be a positive integer, got {value:?}"))?,
            None => DEFAULT_QUEUE_LIMIT,
        };

        Ok(Self {
            database_path: lookup("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_database_path),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            queue_limit,
            algorithm: lookup("STUDY_ALGORITHM").unwrap_or_else(|| "ladder".to_string()),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_database_path() -> PathBuf {
    // Use app data directory for production, fallback to current dir
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("study-drill")
        .join("study.db")
}
