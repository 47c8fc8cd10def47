//! Finance Chat Agent
//!
//! A personal finance assistant built around a conversational
//! transaction pipeline:
//! - Classifies free-text messages into structured intents via Gemini
//! - Records transactions against a deduplicated category catalog
//! - Builds filtered income/expense summaries
//! - Persists to Postgres, with an in-memory store for tests and demos
//!
//! PIPELINE:
//! MESSAGE → CLASSIFY (cached agent) → DISPATCH → {RESOLVE, QUERY} → REPLY

pub mod agent;
pub mod catalog;
pub mod chat;
pub mod classifier;
pub mod config;
pub mod error;
pub mod gemini;
pub mod models;
pub mod seed;
pub mod store;
pub mod summary;

pub use error::Result;

// Re-export common types
pub use chat::ChatService;
pub use models::*;
