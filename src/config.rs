//! Environment configuration.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key. May be empty at startup; classification fails
    /// with a configuration error once a message actually needs it.
    pub gemini_api_key: String,
    /// Postgres connection string. Absent selects the in-memory store.
    pub database_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            database_url: env::var("POSTGRES_URL")
                .or_else(|_| env::var("DATABASE_URL"))
                .ok(),
        }
    }
}
