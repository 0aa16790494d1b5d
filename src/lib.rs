//! Spaced repetition flashcards: SM-2 scheduling, daily quotas and review
//! sessions over pluggable card and quota stores.

pub mod config;
pub mod flashcards;

pub use config::{AppConfig, ConfigError, ReviewConfig};
pub use flashcards::{
    CardStore, FlashcardError, FlashcardStorage, QuotaStore, SessionManager, SessionStatus,
};
