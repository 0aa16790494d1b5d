//! Data models for the flashcard system

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::FlashcardError;

/// Starting ease factor for a freshly created card
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Default number of review cards offered per day
pub const DEFAULT_REVIEW_CAP: u32 = 10;

/// Default number of new cards offered per day
pub const DEFAULT_LEARN_CAP: u32 = 20;

/// Length of a quota counting window
pub const QUOTA_WINDOW_HOURS: i64 = 24;

/// A deck is a named collection of flashcards with its own daily caps
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub card_count: usize,
    #[serde(default = "default_review_cap")]
    pub review_cards_per_session: u32,
    #[serde(default = "default_learn_cap")]
    pub learn_cards_per_session: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_review_cap() -> u32 {
    DEFAULT_REVIEW_CAP
}

fn default_learn_cap() -> u32 {
    DEFAULT_LEARN_CAP
}

impl Deck {
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description: None,
            card_count: 0,
            review_cards_per_session: default_review_cap(),
            learn_cards_per_session: default_learn_cap(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-deck settings consumed by a review session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckConfig {
    pub deck_id: Uuid,
    pub review_cap_per_session: u32,
    pub learn_cap_per_session: u32,
    /// Earliest upcoming due time across the deck's cards
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review_at: Option<DateTime<Utc>>,
}

impl DeckConfig {
    pub fn new(deck_id: Uuid) -> Self {
        Self {
            deck_id,
            review_cap_per_session: DEFAULT_REVIEW_CAP,
            learn_cap_per_session: DEFAULT_LEARN_CAP,
            next_review_at: None,
        }
    }

    /// Zero caps fall back to the defaults
    pub fn review_cap(&self) -> u32 {
        if self.review_cap_per_session == 0 {
            DEFAULT_REVIEW_CAP
        } else {
            self.review_cap_per_session
        }
    }

    pub fn learn_cap(&self) -> u32 {
        if self.learn_cap_per_session == 0 {
            DEFAULT_LEARN_CAP
        } else {
            self.learn_cap_per_session
        }
    }
}

/// Stage of a card in the spaced repetition system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum LearningStage {
    /// Never reviewed
    #[default]
    New,
    /// In initial learning phase
    Learning,
    /// Regular spaced review
    Review,
    /// Failed and re-learning
    Relearning,
}

impl fmt::Display for LearningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Review => "review",
            Self::Relearning => "relearning",
        };
        f.write_str(name)
    }
}

/// Spaced repetition memory of a single card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryState {
    /// SM-2 ease factor, never below 1.3
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
    /// Current interval in days; 0 means the card comes back the same day
    #[serde(default)]
    pub interval_days: u32,
    /// Consecutive successful recalls since creation or the last failure
    #[serde(default)]
    pub repetitions: u32,
    #[serde(default)]
    pub stage: LearningStage,
    pub next_review_at: DateTime<Utc>,
}

fn default_ease_factor() -> f64 {
    DEFAULT_EASE_FACTOR
}

impl MemoryState {
    /// Initial state of a newly created card, due immediately
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            ease_factor: DEFAULT_EASE_FACTOR,
            interval_days: 0,
            repetitions: 0,
            stage: LearningStage::New,
            next_review_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }

    /// Whether the card counts against the learn cap rather than the review cap
    pub fn is_new(&self) -> bool {
        self.repetitions == 0
    }
}

/// A flashcard with question (front) and answer (back)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: Uuid,
    pub deck_id: Uuid,
    pub front: String,
    pub back: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default)]
    pub is_suspended: bool,
    #[serde(default)]
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flashcard {
    pub fn new(deck_id: Uuid, front: String, back: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            deck_id,
            front,
            back,
            hint: None,
            is_suspended: false,
            position: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A card with its current memory state, the unit a review session works on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub flashcard: Flashcard,
    pub memory: MemoryState,
}

impl Card {
    pub fn new(flashcard: Flashcard, memory: MemoryState) -> Self {
        Self { flashcard, memory }
    }

    pub fn id(&self) -> Uuid {
        self.flashcard.id
    }

    pub fn deck_id(&self) -> Uuid {
        self.flashcard.deck_id
    }

    pub fn is_new(&self) -> bool {
        self.memory.is_new()
    }

    /// Candidate for a session whose horizon is `due_before`
    pub fn is_due(&self, due_before: DateTime<Utc>) -> bool {
        !self.flashcard.is_suspended && self.memory.is_due(due_before)
    }
}

/// Four-button rating surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn value(self) -> i32 {
        self as i32
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Again => "Again",
            Self::Hard => "Hard",
            Self::Good => "Good",
            Self::Easy => "Easy",
        }
    }
}

impl TryFrom<i32> for Rating {
    type Error = FlashcardError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Again),
            2 => Ok(Self::Hard),
            3 => Ok(Self::Good),
            4 => Ok(Self::Easy),
            other => Err(FlashcardError::InvalidRating(other)),
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Count of each rating given during a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingTally {
    pub again: u32,
    pub hard: u32,
    pub good: u32,
    pub easy: u32,
}

impl RatingTally {
    pub fn record(&mut self, rating: Rating) {
        match rating {
            Rating::Again => self.again += 1,
            Rating::Hard => self.hard += 1,
            Rating::Good => self.good += 1,
            Rating::Easy => self.easy += 1,
        }
    }

    pub fn get(&self, rating: Rating) -> u32 {
        match rating {
            Rating::Again => self.again,
            Rating::Hard => self.hard,
            Rating::Good => self.good,
            Rating::Easy => self.easy,
        }
    }

    pub fn total(&self) -> u32 {
        self.again + self.hard + self.good + self.easy
    }
}

/// Daily progress against a deck's caps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    #[serde(default)]
    pub reviewed_count: u32,
    #[serde(default)]
    pub learned_count: u32,
    /// When the counting window opened
    pub date_stamp: DateTime<Utc>,
}

impl QuotaState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            reviewed_count: 0,
            learned_count: 0,
            date_stamp: now,
        }
    }

    /// More than 24 hours since the window opened.
    ///
    /// Exactly 24 hours still counts as open. The web reviewer this scheduler
    /// came from reset at `>= 24h`; the strict comparison is intentional.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.date_stamp > Duration::hours(QUOTA_WINDOW_HOURS)
    }

    pub fn remaining_review(&self, cap: u32) -> u32 {
        cap.saturating_sub(self.reviewed_count)
    }

    pub fn remaining_learn(&self, cap: u32) -> u32 {
        cap.saturating_sub(self.learned_count)
    }

    /// Count one rated card; `was_new` is judged on the state before rating
    pub fn record(&mut self, was_new: bool) {
        if was_new {
            self.learned_count += 1;
        } else {
            self.reviewed_count += 1;
        }
    }
}

/// A record of a single review, kept so the store can undo it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub id: Uuid,
    pub card_id: Uuid,
    /// Memory state before the review was applied
    pub previous: MemoryState,
    /// Memory state the review produced
    pub applied: MemoryState,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewRecord {
    pub fn new(card_id: Uuid, previous: MemoryState, applied: MemoryState) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id,
            previous,
            applied,
            reviewed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rating_from_value() {
        assert_eq!(Rating::try_from(1).unwrap(), Rating::Again);
        assert_eq!(Rating::try_from(4).unwrap(), Rating::Easy);
        assert!(matches!(
            Rating::try_from(0),
            Err(FlashcardError::InvalidRating(0))
        ));
        assert!(matches!(
            Rating::try_from(5),
            Err(FlashcardError::InvalidRating(5))
        ));
    }

    #[test]
    fn test_quota_expiry_is_strictly_after_window() {
        let stamp = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let quota = QuotaState::new(stamp);

        assert!(!quota.is_expired(stamp + Duration::hours(24)));
        assert!(quota.is_expired(stamp + Duration::hours(24) + Duration::seconds(1)));
        assert!(quota.is_expired(stamp + Duration::hours(30)));
    }

    #[test]
    fn test_quota_remaining_never_negative() {
        let mut quota = QuotaState::new(Utc::now());
        quota.reviewed_count = 12;
        quota.learned_count = 20;

        assert_eq!(quota.remaining_review(10), 0);
        assert_eq!(quota.remaining_learn(20), 0);
        assert_eq!(quota.remaining_learn(25), 5);
    }

    #[test]
    fn test_quota_record_by_card_kind() {
        let mut quota = QuotaState::new(Utc::now());
        quota.record(true);
        quota.record(false);
        quota.record(false);

        assert_eq!(quota.learned_count, 1);
        assert_eq!(quota.reviewed_count, 2);
    }

    #[test]
    fn test_deck_config_zero_caps_use_defaults() {
        let mut config = DeckConfig::new(Uuid::new_v4());
        config.review_cap_per_session = 0;
        config.learn_cap_per_session = 5;

        assert_eq!(config.review_cap(), DEFAULT_REVIEW_CAP);
        assert_eq!(config.learn_cap(), 5);
    }

    #[test]
    fn test_suspended_card_is_never_due() {
        let now = Utc::now();
        let mut flashcard = Flashcard::new(Uuid::new_v4(), "Q".into(), "A".into());
        flashcard.is_suspended = true;
        let card = Card::new(flashcard, MemoryState::new(now));

        assert!(!card.is_due(now));
    }

    #[test]
    fn test_rating_tally() {
        let mut tally = RatingTally::default();
        tally.record(Rating::Good);
        tally.record(Rating::Good);
        tally.record(Rating::Again);

        assert_eq!(tally.get(Rating::Good), 2);
        assert_eq!(tally.get(Rating::Again), 1);
        assert_eq!(tally.get(Rating::Easy), 0);
        assert_eq!(tally.total(), 3);
    }
}
