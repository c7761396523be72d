use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that must not reach production.
pub const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "db" => Ok(StoreBackend::Sqlite),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => bail!("unknown ad store '{}', expected 'sqlite' or 'memory'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub ad_store: StoreBackend,
    pub fetch_timeout: Duration,
    pub header_title: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            host: get("AVITOLOG_HOST", "0.0.0.0"),
            port: parse("AVITOLOG_PORT", &get("AVITOLOG_PORT", "8000"))?,
            db_path: get("AVITOLOG_DB_PATH", "avitolog.db").into(),
            jwt_secret: get("AVITOLOG_JWT_SECRET", "dev-secret-change-me"),
            token_ttl: token_ttl(parse(
                "AVITOLOG_TOKEN_TTL_MINUTES",
                &get("AVITOLOG_TOKEN_TTL_MINUTES", "1440"),
            )?)?,
            ad_store: parse("AVITOLOG_AD_STORE", &get("AVITOLOG_AD_STORE", "sqlite"))?,
            fetch_timeout: Duration::from_secs(parse(
                "AVITOLOG_FETCH_TIMEOUT_SECS",
                &get("AVITOLOG_FETCH_TIMEOUT_SECS", "6"),
            )?),
            header_title: lookup("AVITOLOG_HEADER_TITLE")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        })
    }

    pub fn has_placeholder_secret(&self) -> bool {
        self.jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }
}

/// One year.
const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

fn token_ttl(minutes: i64) -> Result<chrono::Duration> {
    if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&minutes) {
        bail!("AVITOLOG_TOKEN_TTL_MINUTES must be between 1 and {MAX_TOKEN_TTL_MINUTES}, got {minutes}");
    }
    chrono::TimeDelta::try_minutes(minutes).context("AVITOLOG_TOKEN_TTL_MINUTES out of range")
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("invalid {key}={value:?}"))
}
