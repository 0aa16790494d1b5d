//! Review session orchestration
//!
//! A session picks the due cards of one deck, trims them to what is left of
//! the day's quota and walks through them one rating at a time:
//!
//! ```text
//! Loading ──load──▶ Active ──rate…──▶ Completed ──review_again──▶ Active | AllCaughtUp
//!    │                                      ▲
//!    └──────────────load──▶ AllCaughtUp ────┘ (undo returns to Active)
//! ```
//!
//! Every rating pushes a snapshot so it can be undone. Undo also asks the
//! card store to revert the persisted review, and only touches local state
//! once the store agrees.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::algorithm::{self, IntervalPreview};
use super::clock::{Clock, SystemClock};
use super::error::{FlashcardError, Result};
use super::models::{Card, DeckConfig, QuotaState, Rating, RatingTally};
use super::quota::{self, QuotaSlot};
use super::store::{CardStore, QuotaStore};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    /// Due cards not loaded yet, or the last load failed
    Loading,
    /// A card is waiting for a rating
    Active,
    /// Every queued card has been rated
    Completed,
    /// Nothing due, or today's caps are used up
    AllCaughtUp,
}

/// How the queue splits between review and new cards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueComposition {
    pub review_cards: usize,
    pub new_cards: usize,
}

impl QueueComposition {
    pub fn total(&self) -> usize {
        self.review_cards + self.new_cards
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
    /// Also offer cards that fall due within this many days ("custom study")
    #[serde(default)]
    pub lookahead_days: u32,
    /// Cap on remembered ratings; `None` keeps every rating of the session
    #[serde(default)]
    pub max_undo_depth: Option<usize>,
}

/// Result of a successful rating
#[derive(Debug, Clone)]
pub struct RatingOutcome {
    /// The card as the store now has it
    pub card: Card,
    pub status: SessionStatus,
}

#[derive(Debug, Clone)]
struct UndoSnapshot {
    card_id: Uuid,
    queue: Vec<Card>,
    cursor: usize,
    tally: RatingTally,
    quota: QuotaSlot,
    composition: QueueComposition,
}

/// Pick and order the cards a session will show.
///
/// Candidates due by `due_before` are split into review cards (seen before)
/// and new cards, each trimmed to what the quota still allows. Review cards
/// always come first. Store order is kept within each group.
pub fn compose_queue(
    candidates: Vec<Card>,
    due_before: DateTime<Utc>,
    quota: &QuotaState,
    deck: &DeckConfig,
) -> (Vec<Card>, QueueComposition) {
    let (mut review, mut new): (Vec<Card>, Vec<Card>) = candidates
        .into_iter()
        .filter(|card| card.is_due(due_before))
        .partition(|card| !card.is_new());

    review.truncate(quota.remaining_review(deck.review_cap()) as usize);
    new.truncate(quota.remaining_learn(deck.learn_cap()) as usize);

    let composition = QueueComposition {
        review_cards: review.len(),
        new_cards: new.len(),
    };
    review.extend(new);
    (review, composition)
}

/// Drives one review session for a deck
pub struct SessionManager<C: Clock = SystemClock> {
    deck_id: Uuid,
    cards: Arc<dyn CardStore>,
    quotas: Arc<dyn QuotaStore>,
    clock: C,
    options: SessionOptions,
    status: SessionStatus,
    deck: Option<DeckConfig>,
    queue: Vec<Card>,
    cursor: usize,
    tally: RatingTally,
    quota: Option<QuotaSlot>,
    composition: QueueComposition,
    undo_stack: Vec<UndoSnapshot>,
}

impl<C: Clock> SessionManager<C> {
    pub fn new(
        deck_id: Uuid,
        cards: Arc<dyn CardStore>,
        quotas: Arc<dyn QuotaStore>,
        clock: C,
    ) -> Self {
        Self {
            deck_id,
            cards,
            quotas,
            clock,
            options: SessionOptions::default(),
            status: SessionStatus::Loading,
            deck: None,
            queue: Vec::new(),
            cursor: 0,
            tally: RatingTally::default(),
            quota: None,
            composition: QueueComposition::default(),
            undo_stack: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    // ==================== Loading ====================

    /// Select due cards and build the queue.
    ///
    /// On failure the session stays in `Loading` and keeps nothing from the
    /// attempt, so calling it again is safe.
    pub async fn load(&mut self) -> Result<SessionStatus> {
        self.status = SessionStatus::Loading;

        let now = self.clock.now();
        let slot = quota::load_or_reset(self.quotas.as_ref(), self.deck_id, &now).await?;
        let deck = self.cards.fetch_deck(self.deck_id).await?;
        let candidates = self.cards.fetch_due_cards(self.deck_id).await?;

        let due_before = self.due_horizon(&now);
        let (queue, composition) = compose_queue(candidates, due_before, &slot.state, &deck);

        log::info!(
            "Loaded deck {}: {} review and {} new cards ({} reviewed, {} learned today)",
            self.deck_id,
            composition.review_cards,
            composition.new_cards,
            slot.state.reviewed_count,
            slot.state.learned_count
        );

        self.status = if queue.is_empty() {
            SessionStatus::AllCaughtUp
        } else {
            SessionStatus::Active
        };
        self.deck = Some(deck);
        self.quota = Some(slot);
        self.queue = queue;
        self.cursor = 0;
        self.composition = composition;

        Ok(self.status)
    }

    /// Run due-card selection again once the queue is finished
    pub async fn review_again(&mut self) -> Result<SessionStatus> {
        match self.status {
            SessionStatus::Completed | SessionStatus::AllCaughtUp => self.load().await,
            status => Err(FlashcardError::SessionNotActive(status)),
        }
    }

    fn due_horizon(&self, now: &DateTime<C::Tz>) -> DateTime<Utc> {
        now.with_timezone(&Utc) + Duration::days(i64::from(self.options.lookahead_days))
    }

    // ==================== Rating ====================

    /// Rate the current card.
    ///
    /// Nothing local changes unless both the card and the quota were
    /// persisted. When the quota write fails the card review is reverted in
    /// the store before the error is returned.
    pub async fn submit_rating(&mut self, card_id: Uuid, rating: Rating) -> Result<RatingOutcome> {
        if self.status != SessionStatus::Active {
            return Err(FlashcardError::SessionNotActive(self.status));
        }
        let (card, slot) = match (self.queue.get(self.cursor), self.quota) {
            (Some(card), Some(slot)) => (card.clone(), slot),
            _ => return Err(FlashcardError::SessionNotActive(self.status)),
        };
        if card.id() != card_id {
            return Err(FlashcardError::NotCurrentCard {
                expected: card.id(),
                actual: card_id,
            });
        }

        let snapshot = UndoSnapshot {
            card_id,
            queue: self.queue.clone(),
            cursor: self.cursor,
            tally: self.tally,
            quota: slot,
            composition: self.composition,
        };

        let now = self.clock.now();
        let memory = algorithm::calculate_for_rating(&card.memory, rating, &now)?;
        let updated = self.cards.persist_review(card_id, &memory).await?;

        let mut next_slot = slot;
        next_slot.state.record(card.is_new());
        if let Err(err) = self
            .quotas
            .put(self.deck_id, next_slot.day, &next_slot.state)
            .await
        {
            log::warn!("Failed to save quota for deck {}: {}", self.deck_id, err);
            if let Err(revert_err) = self.cards.revert_review(card_id).await {
                log::error!(
                    "Card {} keeps its new review after a quota failure: {}",
                    card_id,
                    revert_err
                );
            }
            return Err(err.into());
        }

        self.quota = Some(next_slot);
        self.tally.record(rating);
        self.cursor += 1;
        self.push_undo(snapshot);

        log::debug!(
            "Rated card {} {} (interval {} days, stage {})",
            card_id,
            rating,
            memory.interval_days,
            memory.stage
        );

        if self.cursor >= self.queue.len() {
            self.status = SessionStatus::Completed;
            log::info!(
                "Finished deck {}: {} cards rated this session",
                self.deck_id,
                self.tally.total()
            );
        }

        Ok(RatingOutcome {
            card: updated,
            status: self.status,
        })
    }

    /// Interval each rating would give the current card, without saving anything
    pub fn preview_intervals(&self) -> Result<Vec<IntervalPreview>> {
        let card = self
            .current_card()
            .ok_or(FlashcardError::SessionNotActive(self.status))?;
        algorithm::preview_intervals(&card.memory, &self.clock.now())
    }

    fn push_undo(&mut self, snapshot: UndoSnapshot) {
        let limit = self.options.max_undo_depth.unwrap_or(usize::MAX);
        if limit == 0 {
            return;
        }
        if self.undo_stack.len() >= limit {
            self.undo_stack.remove(0);
        }
        self.undo_stack.push(snapshot);
    }

    // ==================== Undo ====================

    /// Roll back the most recent rating.
    ///
    /// Returns the card as restored by the store, or `None` when there is
    /// nothing to undo. If the store refuses, local state and the undo entry
    /// are left as they were so the call can be retried.
    pub async fn undo(&mut self) -> Result<Option<Card>> {
        let (card_id, restored_quota) = match self.undo_stack.last() {
            Some(snapshot) => (snapshot.card_id, snapshot.quota),
            None => return Ok(None),
        };

        self.quotas
            .put(self.deck_id, restored_quota.day, &restored_quota.state)
            .await?;

        let reverted = match self.cards.revert_review(card_id).await {
            Ok(card) => card,
            Err(err) => {
                if let Some(current) = self.quota {
                    if let Err(put_err) =
                        self.quotas.put(self.deck_id, current.day, &current.state).await
                    {
                        log::error!(
                            "Quota for deck {} left at its pre-undo value: {}",
                            self.deck_id,
                            put_err
                        );
                    }
                }
                return Err(err.into());
            }
        };

        let Some(snapshot) = self.undo_stack.pop() else {
            return Ok(None);
        };
        self.queue = snapshot.queue;
        self.cursor = snapshot.cursor;
        self.tally = snapshot.tally;
        self.quota = Some(snapshot.quota);
        self.composition = snapshot.composition;
        self.status = if self.cursor < self.queue.len() {
            SessionStatus::Active
        } else {
            SessionStatus::Completed
        };

        log::info!("Undid last rating of card {}", card_id);
        Ok(Some(reverted))
    }

    // ==================== Accessors ====================

    pub fn deck_id(&self) -> Uuid {
        self.deck_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The card waiting for a rating
    pub fn current_card(&self) -> Option<&Card> {
        if self.status == SessionStatus::Active {
            self.queue.get(self.cursor)
        } else {
            None
        }
    }

    pub fn queue(&self) -> &[Card] {
        &self.queue
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Share of the queue already rated, 0-100
    pub fn progress_percent(&self) -> u32 {
        if self.queue.is_empty() {
            return 0;
        }
        ((self.cursor * 100) / self.queue.len()) as u32
    }

    pub fn tally(&self) -> RatingTally {
        self.tally
    }

    pub fn quota(&self) -> Option<QuotaState> {
        self.quota.map(|slot| slot.state)
    }

    pub fn composition(&self) -> QueueComposition {
        self.composition
    }

    pub fn deck_config(&self) -> Option<&DeckConfig> {
        self.deck.as_ref()
    }

    /// Earliest upcoming review of the deck, reported when all caught up
    pub fn next_review_at(&self) -> Option<DateTime<Utc>> {
        if self.status != SessionStatus::AllCaughtUp {
            return None;
        }
        self.deck.as_ref().and_then(|deck| deck.next_review_at)
    }

    /// Human-readable hint for the all-caught-up screen
    pub fn caught_up_message(&self) -> Option<String> {
        let next = self.next_review_at()?;
        Some(algorithm::describe_next_review(
            next,
            self.clock.now().with_timezone(&Utc),
        ))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
}
