//! Storage operations for flashcards
//!
//! Directory structure:
//! ```text
//! {data-dir}/
//! ├── decks.json           # Array of all decks
//! ├── cards/
//! │   └── {card-id}.json   # Individual card files
//! ├── states/
//! │   └── {card-id}.json   # Card memory state
//! └── history/
//!     └── {card-id}.json   # Review records, newest last
//! ```

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::error::{StoreError, StoreResult};
use super::models::*;
use super::store::CardStore;

/// Storage manager for flashcard operations
pub struct FlashcardStorage {
    base_path: PathBuf,
}

impl FlashcardStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn cards_dir(&self) -> PathBuf {
        self.base_path.join("cards")
    }

    fn states_dir(&self) -> PathBuf {
        self.base_path.join("states")
    }

    fn history_dir(&self) -> PathBuf {
        self.base_path.join("history")
    }

    fn decks_path(&self) -> PathBuf {
        self.base_path.join("decks.json")
    }

    fn card_path(&self, card_id: Uuid) -> PathBuf {
        self.cards_dir().join(format!("{}.json", card_id))
    }

    fn state_path(&self, card_id: Uuid) -> PathBuf {
        self.states_dir().join(format!("{}.json", card_id))
    }

    fn history_path(&self, card_id: Uuid) -> PathBuf {
        self.history_dir().join(format!("{}.json", card_id))
    }

    /// Initialize the storage directories
    pub fn init(&self) -> StoreResult<()> {
        fs::create_dir_all(self.cards_dir())?;
        fs::create_dir_all(self.states_dir())?;
        fs::create_dir_all(self.history_dir())?;

        let decks_path = self.decks_path();
        if !decks_path.exists() {
            let empty_decks: Vec<Deck> = Vec::new();
            fs::write(&decks_path, serde_json::to_string_pretty(&empty_decks)?)?;
        }

        Ok(())
    }

    // ==================== Deck Operations ====================

    pub fn list_decks(&self) -> StoreResult<Vec<Deck>> {
        let decks_path = self.decks_path();
        if !decks_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&decks_path)?;
        let decks: Vec<Deck> = serde_json::from_str(&content)?;
        Ok(decks)
    }

    pub fn get_deck(&self, deck_id: Uuid) -> StoreResult<Deck> {
        self.list_decks()?
            .into_iter()
            .find(|d| d.id == deck_id)
            .ok_or(StoreError::DeckNotFound(deck_id))
    }

    pub fn create_deck(
        &self,
        name: String,
        description: Option<String>,
        review_cap: u32,
        learn_cap: u32,
    ) -> StoreResult<Deck> {
        self.init()?;

        let mut deck = Deck::new(name);
        deck.description = description;
        deck.review_cards_per_session = review_cap;
        deck.learn_cards_per_session = learn_cap;

        let mut decks = self.list_decks()?;
        decks.push(deck.clone());
        self.save_decks(&decks)?;

        log::info!("Created deck {} ({})", deck.name, deck.id);
        Ok(deck)
    }

    pub fn update_deck(&self, deck: &Deck) -> StoreResult<()> {
        let mut decks = self.list_decks()?;
        let pos = decks
            .iter()
            .position(|d| d.id == deck.id)
            .ok_or(StoreError::DeckNotFound(deck.id))?;

        decks[pos] = deck.clone();
        self.save_decks(&decks)
    }

    /// Delete a deck and all its cards
    pub fn delete_deck(&self, deck_id: Uuid) -> StoreResult<()> {
        for card in self.list_cards(deck_id)? {
            self.remove_card_files(card.id)?;
        }

        let mut decks = self.list_decks()?;
        decks.retain(|d| d.id != deck_id);
        self.save_decks(&decks)
    }

    fn save_decks(&self, decks: &[Deck]) -> StoreResult<()> {
        fs::write(self.decks_path(), serde_json::to_string_pretty(decks)?)?;
        Ok(())
    }

    fn update_deck_card_count(&self, deck_id: Uuid) -> StoreResult<()> {
        let cards = self.list_cards(deck_id)?;
        let mut deck = self.get_deck(deck_id)?;
        deck.card_count = cards.len();
        deck.updated_at = Utc::now();
        self.update_deck(&deck)
    }

    /// Session settings for a deck, including its earliest upcoming review
    pub fn deck_config(&self, deck_id: Uuid) -> StoreResult<DeckConfig> {
        let deck = self.get_deck(deck_id)?;
        let next_review_at = self
            .list_deck_cards(deck_id)?
            .iter()
            .filter(|card| !card.flashcard.is_suspended)
            .map(|card| card.memory.next_review_at)
            .min();

        Ok(DeckConfig {
            deck_id,
            review_cap_per_session: deck.review_cards_per_session,
            learn_cap_per_session: deck.learn_cards_per_session,
            next_review_at,
        })
    }

    // ==================== Card Operations ====================

    /// List all cards in a deck, in insertion order
    pub fn list_cards(&self, deck_id: Uuid) -> StoreResult<Vec<Flashcard>> {
        let cards_dir = self.cards_dir();
        if !cards_dir.exists() {
            return Ok(Vec::new());
        }

        let mut cards = Vec::new();
        for entry in fs::read_dir(&cards_dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                let content = fs::read_to_string(&path)?;
                let card: Flashcard = serde_json::from_str(&content)?;
                if card.deck_id == deck_id {
                    cards.push(card);
                }
            }
        }

        cards.sort_by(|a, b| a.position.cmp(&b.position));
        Ok(cards)
    }

    /// All cards of a deck together with their memory state
    pub fn list_deck_cards(&self, deck_id: Uuid) -> StoreResult<Vec<Card>> {
        self.list_cards(deck_id)?
            .into_iter()
            .map(|flashcard| {
                let memory = self.get_memory_state(flashcard.id)?;
                Ok(Card::new(flashcard, memory))
            })
            .collect()
    }

    pub fn get_card(&self, card_id: Uuid) -> StoreResult<Flashcard> {
        let card_path = self.card_path(card_id);
        if !card_path.exists() {
            return Err(StoreError::CardNotFound(card_id));
        }

        let content = fs::read_to_string(&card_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_card(&self, card_id: Uuid) -> StoreResult<Card> {
        let flashcard = self.get_card(card_id)?;
        let memory = self.get_memory_state(card_id)?;
        Ok(Card::new(flashcard, memory))
    }

    pub fn create_card(
        &self,
        deck_id: Uuid,
        front: String,
        back: String,
        hint: Option<String>,
    ) -> StoreResult<Card> {
        self.init()?;
        // Fail before writing anything if the deck is missing
        self.get_deck(deck_id)?;

        let position = self.list_cards(deck_id)?.len() as i32;

        let mut flashcard = Flashcard::new(deck_id, front, back);
        flashcard.position = position;
        flashcard.hint = hint;

        fs::write(
            self.card_path(flashcard.id),
            serde_json::to_string_pretty(&flashcard)?,
        )?;

        let memory = MemoryState::new(flashcard.created_at);
        self.update_memory_state(flashcard.id, &memory)?;

        self.update_deck_card_count(deck_id)?;

        Ok(Card::new(flashcard, memory))
    }

    pub fn update_card(&self, card: &Flashcard) -> StoreResult<()> {
        let card_path = self.card_path(card.id);
        if !card_path.exists() {
            return Err(StoreError::CardNotFound(card.id));
        }

        fs::write(&card_path, serde_json::to_string_pretty(card)?)?;
        Ok(())
    }

    /// Suspended cards stay in the deck but are never offered for review
    pub fn set_suspended(&self, card_id: Uuid, suspended: bool) -> StoreResult<Flashcard> {
        let mut card = self.get_card(card_id)?;
        card.is_suspended = suspended;
        card.updated_at = Utc::now();
        self.update_card(&card)?;
        Ok(card)
    }

    pub fn delete_card(&self, card_id: Uuid) -> StoreResult<()> {
        let deck_id = self.get_card(card_id)?.deck_id;
        self.remove_card_files(card_id)?;
        self.update_deck_card_count(deck_id)
    }

    fn remove_card_files(&self, card_id: Uuid) -> StoreResult<()> {
        for path in [
            self.card_path(card_id),
            self.state_path(card_id),
            self.history_path(card_id),
        ] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    // ==================== State Operations ====================

    /// Get the memory state for a card; cards without one are brand new
    pub fn get_memory_state(&self, card_id: Uuid) -> StoreResult<MemoryState> {
        let state_path = self.state_path(card_id);
        if !state_path.exists() {
            let created_at = self.get_card(card_id)?.created_at;
            return Ok(MemoryState::new(created_at));
        }

        let content = fs::read_to_string(&state_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn update_memory_state(&self, card_id: Uuid, memory: &MemoryState) -> StoreResult<()> {
        fs::create_dir_all(self.states_dir())?;
        fs::write(self.state_path(card_id), serde_json::to_string_pretty(memory)?)?;
        Ok(())
    }

    // ==================== Review Operations ====================

    pub fn review_history(&self, card_id: Uuid) -> StoreResult<Vec<ReviewRecord>> {
        let history_path = self.history_path(card_id);
        if !history_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&history_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save_history(&self, card_id: Uuid, history: &[ReviewRecord]) -> StoreResult<()> {
        fs::create_dir_all(self.history_dir())?;
        fs::write(self.history_path(card_id), serde_json::to_string_pretty(history)?)?;
        Ok(())
    }

    /// Apply a reviewed memory state and log the one it replaces.
    ///
    /// The state is written first. If the history cannot be saved the old
    /// state is put back, so history and state never disagree.
    pub fn record_review(&self, card_id: Uuid, memory: &MemoryState) -> StoreResult<Card> {
        let flashcard = self.get_card(card_id)?;
        let previous = self.get_memory_state(card_id)?;
        let mut history = self.review_history(card_id)?;

        self.update_memory_state(card_id, memory)?;

        history.push(ReviewRecord::new(card_id, previous.clone(), memory.clone()));
        if let Err(err) = self.save_history(card_id, &history) {
            if let Err(rollback_err) = self.update_memory_state(card_id, &previous) {
                log::error!("Card {} state left ahead of its history: {}", card_id, rollback_err);
            }
            return Err(err);
        }

        Ok(Card::new(flashcard, memory.clone()))
    }

    /// Undo the most recent review of a card.
    ///
    /// The history is shortened first and restored if the state write fails.
    pub fn revert_last_review(&self, card_id: Uuid) -> StoreResult<Card> {
        let flashcard = self.get_card(card_id)?;
        let mut history = self.review_history(card_id)?;
        let record = history.pop().ok_or(StoreError::NothingToRevert(card_id))?;

        self.save_history(card_id, &history)?;

        if let Err(err) = self.update_memory_state(card_id, &record.previous) {
            history.push(record);
            if let Err(rollback_err) = self.save_history(card_id, &history) {
                log::error!("Card {} lost its last review record: {}", card_id, rollback_err);
            }
            return Err(err);
        }

        Ok(Card::new(flashcard, record.previous))
    }
}

#[async_trait]
impl CardStore for FlashcardStorage {
    /// Every active card of the deck, earliest due first
    async fn fetch_due_cards(&self, deck_id: Uuid) -> StoreResult<Vec<Card>> {
        let mut cards: Vec<Card> = self
            .list_deck_cards(deck_id)?
            .into_iter()
            .filter(|card| !card.flashcard.is_suspended)
            .collect();
        cards.sort_by(|a, b| a.memory.next_review_at.cmp(&b.memory.next_review_at));
        Ok(cards)
    }

    async fn fetch_card(&self, card_id: Uuid) -> StoreResult<Card> {
        self.load_card(card_id)
    }

    async fn persist_review(&self, card_id: Uuid, memory: &MemoryState) -> StoreResult<Card> {
        self.record_review(card_id, memory)
    }

    async fn revert_review(&self, card_id: Uuid) -> StoreResult<Card> {
        self.revert_last_review(card_id)
    }

    async fn fetch_deck(&self, deck_id: Uuid) -> StoreResult<DeckConfig> {
        self.deck_config(deck_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcards::algorithm::calculate_next_review;
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_storage() -> (FlashcardStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FlashcardStorage::new(temp_dir.path().to_path_buf());
        storage.init().unwrap();
        (storage, temp_dir)
    }

    fn create_deck(storage: &FlashcardStorage) -> Deck {
        storage
            .create_deck("Spanish".to_string(), None, DEFAULT_REVIEW_CAP, DEFAULT_LEARN_CAP)
            .unwrap()
    }

    #[test]
    fn test_create_deck_and_cards() {
        let (storage, _temp) = create_test_storage();
        let deck = create_deck(&storage);

        let first = storage
            .create_card(deck.id, "hola".into(), "hello".into(), None)
            .unwrap();
        storage
            .create_card(deck.id, "adiós".into(), "goodbye".into(), Some("farewell".into()))
            .unwrap();

        let cards = storage.list_cards(deck.id).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].id, first.id());
        assert_eq!(cards[1].hint.as_deref(), Some("farewell"));
        assert_eq!(storage.get_deck(deck.id).unwrap().card_count, 2);

        assert_eq!(first.memory.repetitions, 0);
        assert_eq!(first.memory.stage, LearningStage::New);
    }

    #[test]
    fn test_create_card_in_missing_deck() {
        let (storage, _temp) = create_test_storage();
        let missing = Uuid::new_v4();

        let result = storage.create_card(missing, "q".into(), "a".into(), None);
        assert!(matches!(result, Err(StoreError::DeckNotFound(id)) if id == missing));
    }

    #[test]
    fn test_record_and_revert_review() {
        let (storage, _temp) = create_test_storage();
        let deck = create_deck(&storage);
        let card = storage
            .create_card(deck.id, "uno".into(), "one".into(), None)
            .unwrap();

        let reviewed = calculate_next_review(&card.memory, 4, &Utc::now()).unwrap();
        let stored = storage.record_review(card.id(), &reviewed).unwrap();
        assert_eq!(stored.memory, reviewed);
        assert_eq!(storage.review_history(card.id()).unwrap().len(), 1);

        let reverted = storage.revert_last_review(card.id()).unwrap();
        assert_eq!(reverted.memory, card.memory);
        assert_eq!(storage.get_memory_state(card.id()).unwrap(), card.memory);
        assert!(storage.review_history(card.id()).unwrap().is_empty());
    }

    #[test]
    fn test_revert_without_history() {
        let (storage, _temp) = create_test_storage();
        let deck = create_deck(&storage);
        let card = storage
            .create_card(deck.id, "dos".into(), "two".into(), None)
            .unwrap();

        let result = storage.revert_last_review(card.id());
        assert!(matches!(result, Err(StoreError::NothingToRevert(id)) if id == card.id()));
    }

    #[test]
    fn test_deck_config_reports_earliest_review() {
        let (storage, _temp) = create_test_storage();
        let deck = create_deck(&storage);
        let early = storage
            .create_card(deck.id, "tres".into(), "three".into(), None)
            .unwrap();
        let late = storage
            .create_card(deck.id, "cuatro".into(), "four".into(), None)
            .unwrap();

        let soon = Utc::now() + Duration::hours(2);
        let later = Utc::now() + Duration::days(3);
        storage
            .update_memory_state(early.id(), &MemoryState { next_review_at: soon, ..early.memory.clone() })
            .unwrap();
        storage
            .update_memory_state(late.id(), &MemoryState { next_review_at: later, ..late.memory.clone() })
            .unwrap();

        let config = storage.deck_config(deck.id).unwrap();
        assert_eq!(config.next_review_at, Some(soon));
        assert_eq!(config.review_cap_per_session, DEFAULT_REVIEW_CAP);
        assert_eq!(config.learn_cap_per_session, DEFAULT_LEARN_CAP);
    }

    #[tokio::test]
    async fn test_fetch_due_cards_skips_suspended() {
        let (storage, _temp) = create_test_storage();
        let deck = create_deck(&storage);
        let kept = storage
            .create_card(deck.id, "cinco".into(), "five".into(), None)
            .unwrap();
        let suspended = storage
            .create_card(deck.id, "seis".into(), "six".into(), None)
            .unwrap();
        storage.set_suspended(suspended.id(), true).unwrap();

        let cards = storage.fetch_due_cards(deck.id).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id(), kept.id());
    }

    /// Swap a storage subdirectory for a plain file so writes below it fail
    fn block_dir(storage: &FlashcardStorage, name: &str) -> PathBuf {
        let dir = storage.base_path.join(name);
        let parked = storage.base_path.join(format!("{}.parked", name));
        fs::rename(&dir, &parked).unwrap();
        fs::write(&dir, "").unwrap();
        parked
    }

    fn unblock_dir(storage: &FlashcardStorage, name: &str, parked: PathBuf) {
        let dir = storage.base_path.join(name);
        fs::remove_file(&dir).unwrap();
        fs::rename(parked, dir).unwrap();
    }

    #[test]
    fn test_failed_history_write_keeps_state() {
        let (storage, _temp) = create_test_storage();
        let deck = create_deck(&storage);
        let card = storage
            .create_card(deck.id, "ocho".into(), "eight".into(), None)
            .unwrap();
        let s0 = card.memory.clone();
        let s1 = calculate_next_review(&s0, 4, &Utc::now()).unwrap();
        storage.record_review(card.id(), &s1).unwrap();

        let parked = block_dir(&storage, "history");
        let s2 = calculate_next_review(&s1, 5, &Utc::now()).unwrap();
        assert!(storage.record_review(card.id(), &s2).is_err());
        assert_eq!(storage.get_memory_state(card.id()).unwrap(), s1);
        unblock_dir(&storage, "history", parked);

        // A retry leaves exactly one record per applied review
        storage.record_review(card.id(), &s2).unwrap();
        assert_eq!(storage.review_history(card.id()).unwrap().len(), 2);
        assert_eq!(storage.revert_last_review(card.id()).unwrap().memory, s1);
        assert_eq!(storage.revert_last_review(card.id()).unwrap().memory, s0);
    }

    #[test]
    fn test_failed_state_write_keeps_history() {
        let (storage, _temp) = create_test_storage();
        let deck = create_deck(&storage);
        let card = storage
            .create_card(deck.id, "nueve".into(), "nine".into(), None)
            .unwrap();
        let s1 = calculate_next_review(&card.memory, 4, &Utc::now()).unwrap();
        storage.record_review(card.id(), &s1).unwrap();

        let parked = block_dir(&storage, "states");
        assert!(storage.revert_last_review(card.id()).is_err());
        assert_eq!(storage.review_history(card.id()).unwrap().len(), 1);
        unblock_dir(&storage, "states", parked);

        assert_eq!(storage.get_memory_state(card.id()).unwrap(), s1);
        assert_eq!(storage.revert_last_review(card.id()).unwrap().memory, card.memory);
    }

    #[test]
    fn test_delete_card_updates_deck() {
        let (storage, _temp) = create_test_storage();
        let deck = create_deck(&storage);
        let kept = storage
            .create_card(deck.id, "diez".into(), "ten".into(), None)
            .unwrap();
        let gone = storage
            .create_card(deck.id, "once".into(), "eleven".into(), None)
            .unwrap();
        let reviewed = calculate_next_review(&gone.memory, 4, &Utc::now()).unwrap();
        storage.record_review(gone.id(), &reviewed).unwrap();

        storage.delete_card(gone.id()).unwrap();

        let cards = storage.list_cards(deck.id).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, kept.id());
        assert_eq!(storage.get_deck(deck.id).unwrap().card_count, 1);
        assert!(storage.review_history(gone.id()).unwrap().is_empty());
        assert!(matches!(
            storage.delete_card(gone.id()),
            Err(StoreError::CardNotFound(_))
        ));
    }

    #[test]
    fn test_delete_deck_removes_cards() {
        let (storage, _temp) = create_test_storage();
        let deck = create_deck(&storage);
        let card = storage
            .create_card(deck.id, "siete".into(), "seven".into(), None)
            .unwrap();

        storage.delete_deck(deck.id).unwrap();

        assert!(storage.list_decks().unwrap().is_empty());
        assert!(matches!(
            storage.get_card(card.id()),
            Err(StoreError::CardNotFound(_))
        ));
    }
}
