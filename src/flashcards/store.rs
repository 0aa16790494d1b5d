//! Collaborator interfaces a review session depends on.
//!
//! Both traits are async because real backends sit behind a network or a
//! disk. A session awaits every call before applying the next transition.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use super::error::StoreResult;
use super::models::{Card, DeckConfig, MemoryState, QuotaState};

/// Source of truth for cards and their memory state.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Cards of a deck that may be due for review.
    ///
    /// Implementations may return more than what is due; the session applies
    /// its own clock to pick candidates.
    async fn fetch_due_cards(&self, deck_id: Uuid) -> StoreResult<Vec<Card>>;

    async fn fetch_card(&self, card_id: Uuid) -> StoreResult<Card>;

    /// Store a reviewed memory state, remembering the previous one.
    async fn persist_review(&self, card_id: Uuid, memory: &MemoryState) -> StoreResult<Card>;

    /// Compensating update: restore the state from before the last review.
    async fn revert_review(&self, card_id: Uuid) -> StoreResult<Card>;

    async fn fetch_deck(&self, deck_id: Uuid) -> StoreResult<DeckConfig>;
}

/// Durable key-value storage for daily quota counters.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn get(&self, deck_id: Uuid, day: NaiveDate) -> StoreResult<Option<QuotaState>>;

    async fn put(&self, deck_id: Uuid, day: NaiveDate, quota: &QuotaState) -> StoreResult<()>;

    async fn remove(&self, deck_id: Uuid, day: NaiveDate) -> StoreResult<()>;

    /// Every day a window is stored under for the deck, in any order
    async fn days(&self, deck_id: Uuid) -> StoreResult<Vec<NaiveDate>>;
}
