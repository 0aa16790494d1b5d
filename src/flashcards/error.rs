//! Error types for scheduling, stores and review sessions

use thiserror::Error;
use uuid::Uuid;

use super::session::SessionStatus;

/// Failure reported by a card store or quota persistence backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Deck not found: {0}")]
    DeckNotFound(Uuid),

    #[error("Card not found: {0}")]
    CardNotFound(Uuid),

    #[error("No review to revert for card {0}")]
    NothingToRevert(Uuid),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum FlashcardError {
    #[error("Invalid quality {0}: must be between 0 and 5")]
    InvalidQuality(i32),

    #[error("Invalid rating {0}: must be between 1 and 4")]
    InvalidRating(i32),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Session is not active (status: {0:?})")]
    SessionNotActive(SessionStatus),

    #[error("Card {actual} is not the current card (expected {expected})")]
    NotCurrentCard { expected: Uuid, actual: Uuid },
}

pub type Result<T> = std::result::Result<T, FlashcardError>;
