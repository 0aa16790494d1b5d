use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use cardwise::config::AppConfig;
use cardwise::flashcards::{
    Card, Deck, FileQuotaStore, Flashcard, FlashcardStorage, SessionManager, SystemClock,
};

/// Shared application state for CLI commands
pub struct App {
    pub config: AppConfig,
    pub storage: Arc<FlashcardStorage>,
    pub quotas: Arc<FileQuotaStore>,
}

impl App {
    /// Initialize from the config file and its data directory
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = AppConfig::load_or_default(config_path).context("Failed to load config")?;

        let storage = FlashcardStorage::new(config.data_dir.clone());
        storage.init().context("Failed to initialize card storage")?;

        let quotas = FileQuotaStore::new(config.data_dir.clone())
            .context("Failed to initialize quota storage")?;

        Ok(Self {
            config,
            storage: Arc::new(storage),
            quotas: Arc::new(quotas),
        })
    }

    /// Find a deck by name (case-insensitive prefix match)
    pub fn find_deck(&self, name: &str) -> Result<Deck> {
        let decks = self.list_decks()?;
        let name_lower = name.to_lowercase();

        // Exact match first
        if let Some(deck) = decks.iter().find(|d| d.name.to_lowercase() == name_lower) {
            return Ok(deck.clone());
        }

        let matches: Vec<&Deck> = decks.iter()
            .filter(|d| d.name.to_lowercase().starts_with(&name_lower))
            .collect();

        match matches.len() {
            0 => bail!("No deck matching '{}'. Available decks:\n{}", name,
                decks.iter().map(|d| format!("  - {}", d.name)).collect::<Vec<_>>().join("\n")),
            1 => Ok(matches[0].clone()),
            _ => bail!("Ambiguous deck name '{}'. Matches:\n{}", name,
                matches.iter().map(|d| format!("  - {}", d.name)).collect::<Vec<_>>().join("\n")),
        }
    }

    pub fn list_decks(&self) -> Result<Vec<Deck>> {
        self.storage.list_decks().context("Failed to list decks")
    }

    /// Create a deck, taking caps from config when not given
    pub fn create_deck(
        &self,
        name: String,
        description: Option<String>,
        review_cap: Option<u32>,
        learn_cap: Option<u32>,
    ) -> Result<Deck> {
        let review = &self.config.review;
        self.storage
            .create_deck(
                name,
                description,
                review_cap.unwrap_or(review.default_review_cap),
                learn_cap.unwrap_or(review.default_learn_cap),
            )
            .context("Failed to create deck")
    }

    pub fn list_cards(&self, deck_id: Uuid) -> Result<Vec<Card>> {
        self.storage.list_deck_cards(deck_id).context("Failed to list cards")
    }

    pub fn create_card(
        &self,
        deck_id: Uuid,
        front: String,
        back: String,
        hint: Option<String>,
    ) -> Result<Card> {
        self.storage
            .create_card(deck_id, front, back, hint)
            .context("Failed to create card")
    }

    pub fn set_suspended(&self, card_id: Uuid, suspended: bool) -> Result<Flashcard> {
        self.storage
            .set_suspended(card_id, suspended)
            .context("Failed to update card")
    }

    /// Delete a card, returning it as it was
    pub fn delete_card(&self, card_id: Uuid) -> Result<Flashcard> {
        let card = self.storage.get_card(card_id).context("Card not found")?;
        self.storage.delete_card(card_id).context("Failed to delete card")?;
        Ok(card)
    }

    /// Start a review session for a deck against the wall clock
    pub fn session(&self, deck_id: Uuid, lookahead_days: u32) -> SessionManager<SystemClock> {
        SessionManager::new(deck_id, self.storage.clone(), self.quotas.clone(), SystemClock)
            .with_options(self.config.review.session_options(lookahead_days))
    }
}
