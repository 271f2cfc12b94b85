//! Service configuration
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | DATABASE_URL | (required) | PostgreSQL connection string |
//! | PORT | 8083 | HTTP listen port |
//! | DB_MAX_CONNECTIONS | 10 | Pool size |
//! | NATS_URL | (unset) | Event bus; events are dropped when unset |
//! | EVENT_SUBJECT_PREFIX | opensase.network | Prefix of published subjects |

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub nats_url: Option<String>,
    pub event_subject_prefix: String,
}

impl Config {
    /// Read configuration from the environment (after `.env` has been loaded).
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8083),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS").ok().and_then(|p| p.parse().ok()).unwrap_or(10),
            nats_url: std::env::var("NATS_URL").ok().filter(|u| !u.trim().is_empty()),
            event_subject_prefix: std::env::var("EVENT_SUBJECT_PREFIX").unwrap_or_else(|_| "opensase.network".into()),
        })
    }

    pub fn listen_addr(&self) -> String { format!("0.0.0.0:{}", self.port) }
}
