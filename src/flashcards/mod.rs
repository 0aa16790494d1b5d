//! Flashcard and spaced repetition system
//!
//! This module provides:
//! - Deck and card storage backed by JSON files
//! - SM-2 derived scheduling
//! - Daily review and learn quotas per deck
//! - Review sessions with undo

pub mod algorithm;
pub mod clock;
pub mod error;
pub mod models;
pub mod quota;
pub mod session;
pub mod storage;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{FlashcardError, Result, StoreError, StoreResult};
pub use models::*;
pub use quota::{FileQuotaStore, InMemoryQuotaStore, QuotaSlot};
pub use session::{QueueComposition, RatingOutcome, SessionManager, SessionOptions, SessionStatus};
pub use storage::FlashcardStorage;
pub use store::{CardStore, QuotaStore};
