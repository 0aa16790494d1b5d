//! Daily quota counters per deck
//!
//! A counting window opens the first time a deck is studied and stays open
//! for 24 hours, even across midnight. Each window is stored under the local
//! day it opened on.
//!
//! ```text
//! {data-dir}/quotas.json   # { "{deck-id}/{yyyy-mm-dd}": QuotaState }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use super::error::StoreResult;
use super::models::QuotaState;
use super::store::QuotaStore;

/// How many days before today may still hold an open window
const LOOKBACK_DAYS: u64 = 2;

/// The quota window a session counts against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSlot {
    /// Key day the window is stored under
    pub day: NaiveDate,
    pub state: QuotaState,
}

/// Find the open window for a deck, or start a new one.
///
/// When no open window is left, every expired window of the deck is removed
/// and a zeroed window stamped `now` is stored under today.
pub async fn load_or_reset<Tz: TimeZone>(
    store: &dyn QuotaStore,
    deck_id: Uuid,
    now: &DateTime<Tz>,
) -> StoreResult<QuotaSlot> {
    let today = now.date_naive();
    let now_utc = now.with_timezone(&Utc);

    for back in 0..=LOOKBACK_DAYS {
        let Some(day) = today.checked_sub_days(Days::new(back)) else {
            break;
        };
        let Some(state) = store.get(deck_id, day).await? else {
            continue;
        };

        if state.is_expired(now_utc) {
            log::info!(
                "Quota window for deck {} opened at {} has expired, resetting",
                deck_id,
                state.date_stamp
            );
            break;
        }

        log::debug!(
            "Using quota window {} for deck {}: {} reviewed, {} learned",
            day,
            deck_id,
            state.reviewed_count,
            state.learned_count
        );
        return Ok(QuotaSlot { day, state });
    }

    prune_expired(store, deck_id, now_utc).await?;

    let state = QuotaState::new(now_utc);
    store.put(deck_id, today, &state).await?;
    Ok(QuotaSlot { day: today, state })
}

/// Drop every window of the deck that closed before `now`
async fn prune_expired(
    store: &dyn QuotaStore,
    deck_id: Uuid,
    now: DateTime<Utc>,
) -> StoreResult<usize> {
    let mut removed = 0;
    for day in store.days(deck_id).await? {
        let expired = store
            .get(deck_id, day)
            .await?
            .map_or(false, |state| state.is_expired(now));
        if expired {
            store.remove(deck_id, day).await?;
            removed += 1;
        }
    }

    if removed > 0 {
        log::debug!("Removed {} expired quota windows for deck {}", removed, deck_id);
    }
    Ok(removed)
}

const DAY_FORMAT: &str = "%Y-%m-%d";

fn quota_key(deck_id: Uuid, day: NaiveDate) -> String {
    format!("{}/{}", deck_id, day.format(DAY_FORMAT))
}

/// Quota counters kept in a single JSON file
pub struct FileQuotaStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileQuotaStore {
    /// Create a new quota store under `data_dir`
    pub fn new(data_dir: PathBuf) -> StoreResult<Self> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            path: data_dir.join("quotas.json"),
            write_lock: Mutex::new(()),
        })
    }

    fn load_all(&self) -> StoreResult<BTreeMap<String, QuotaState>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save_all(&self, quotas: &BTreeMap<String, QuotaState>) -> StoreResult<()> {
        fs::write(&self.path, serde_json::to_string_pretty(quotas)?)?;
        Ok(())
    }

    fn update<F>(&self, apply: F) -> StoreResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, QuotaState>),
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut quotas = self.load_all()?;
        apply(&mut quotas);
        self.save_all(&quotas)
    }
}

#[async_trait]
impl QuotaStore for FileQuotaStore {
    async fn get(&self, deck_id: Uuid, day: NaiveDate) -> StoreResult<Option<QuotaState>> {
        Ok(self.load_all()?.get(&quota_key(deck_id, day)).copied())
    }

    async fn put(&self, deck_id: Uuid, day: NaiveDate, quota: &QuotaState) -> StoreResult<()> {
        let quota = *quota;
        self.update(|quotas| {
            quotas.insert(quota_key(deck_id, day), quota);
        })
    }

    async fn remove(&self, deck_id: Uuid, day: NaiveDate) -> StoreResult<()> {
        self.update(|quotas| {
            quotas.remove(&quota_key(deck_id, day));
        })
    }

    async fn days(&self, deck_id: Uuid) -> StoreResult<Vec<NaiveDate>> {
        let prefix = format!("{}/", deck_id);
        Ok(self
            .load_all()?
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|day| NaiveDate::parse_from_str(day, DAY_FORMAT).ok())
            .collect())
    }
}

/// Process-local quota counters, lost on exit
#[derive(Debug, Default)]
pub struct InMemoryQuotaStore {
    quotas: Mutex<HashMap<(Uuid, NaiveDate), QuotaState>>,
}

impl InMemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.quotas.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl QuotaStore for InMemoryQuotaStore {
    async fn get(&self, deck_id: Uuid, day: NaiveDate) -> StoreResult<Option<QuotaState>> {
        let quotas = self.quotas.lock().unwrap_or_else(|e| e.into_inner());
        Ok(quotas.get(&(deck_id, day)).copied())
    }

    async fn put(&self, deck_id: Uuid, day: NaiveDate, quota: &QuotaState) -> StoreResult<()> {
        let mut quotas = self.quotas.lock().unwrap_or_else(|e| e.into_inner());
        quotas.insert((deck_id, day), *quota);
        Ok(())
    }

    async fn remove(&self, deck_id: Uuid, day: NaiveDate) -> StoreResult<()> {
        let mut quotas = self.quotas.lock().unwrap_or_else(|e| e.into_inner());
        quotas.remove(&(deck_id, day));
        Ok(())
    }

    async fn days(&self, deck_id: Uuid) -> StoreResult<Vec<NaiveDate>> {
        let quotas = self.quotas.lock().unwrap_or_else(|e| e.into_inner());
        Ok(quotas
            .keys()
            .filter(|(deck, _)| *deck == deck_id)
            .map(|(_, day)| *day)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};
    use tempfile::TempDir;

    fn at(day: u32, hour: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, day, hour, 0, 0)
            .unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[tokio::test]
    async fn test_first_load_opens_window_today() {
        let store = InMemoryQuotaStore::new();
        let deck_id = Uuid::new_v4();
        let now = at(10, 9);

        let slot = load_or_reset(&store, deck_id, &now).await.unwrap();

        assert_eq!(slot.day, date(10));
        assert_eq!(slot.state, QuotaState::new(now.with_timezone(&Utc)));
        assert_eq!(store.get(deck_id, date(10)).await.unwrap(), Some(slot.state));
    }

    #[tokio::test]
    async fn test_window_survives_midnight_within_24_hours() {
        let store = InMemoryQuotaStore::new();
        let deck_id = Uuid::new_v4();
        let opened = at(9, 22).with_timezone(&Utc);
        let quota = QuotaState {
            reviewed_count: 4,
            learned_count: 7,
            date_stamp: opened,
        };
        store.put(deck_id, date(9), &quota).await.unwrap();

        let slot = load_or_reset(&store, deck_id, &at(10, 8)).await.unwrap();

        assert_eq!(slot.day, date(9));
        assert_eq!(slot.state, quota);
        assert!(store.get(deck_id, date(10)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_window_older_than_24_hours_resets() {
        let store = InMemoryQuotaStore::new();
        let deck_id = Uuid::new_v4();
        let now = at(10, 12);
        let stale = QuotaState {
            reviewed_count: 8,
            learned_count: 20,
            date_stamp: (now - Duration::hours(30)).with_timezone(&Utc),
        };
        store.put(deck_id, date(9), &stale).await.unwrap();

        let slot = load_or_reset(&store, deck_id, &now).await.unwrap();

        assert_eq!(slot.day, date(10));
        assert_eq!(slot.state.reviewed_count, 0);
        assert_eq!(slot.state.learned_count, 0);
        assert_eq!(slot.state.date_stamp, now.with_timezone(&Utc));
        assert!(store.get(deck_id, date(9)).await.unwrap().is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_removes_windows_left_by_study_gaps() {
        let store = InMemoryQuotaStore::new();
        let deck_id = Uuid::new_v4();
        let other_deck = Uuid::new_v4();
        load_or_reset(&store, other_deck, &at(1, 9)).await.unwrap();

        let mut slot = load_or_reset(&store, deck_id, &at(1, 9)).await.unwrap();
        for week in 1..5 {
            slot = load_or_reset(&store, deck_id, &at(1 + week * 7, 9)).await.unwrap();
        }

        assert_eq!(slot.day, date(29));
        assert_eq!(store.days(deck_id).await.unwrap(), vec![date(29)]);
        // Windows of other decks are left alone
        assert_eq!(store.days(other_deck).await.unwrap(), vec![date(1)]);
    }

    #[tokio::test]
    async fn test_windows_are_per_deck() {
        let store = InMemoryQuotaStore::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let now = at(10, 9);

        let mut slot = load_or_reset(&store, first, &now).await.unwrap();
        slot.state.record(false);
        store.put(first, slot.day, &slot.state).await.unwrap();

        let other = load_or_reset(&store, second, &now).await.unwrap();
        assert_eq!(other.state.reviewed_count, 0);
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        let deck_id = Uuid::new_v4();
        let quota = QuotaState {
            reviewed_count: 3,
            learned_count: 1,
            date_stamp: at(10, 9).with_timezone(&Utc),
        };

        {
            let store = FileQuotaStore::new(temp.path().to_path_buf()).unwrap();
            store.put(deck_id, date(10), &quota).await.unwrap();
        }

        let store = FileQuotaStore::new(temp.path().to_path_buf()).unwrap();
        assert_eq!(store.get(deck_id, date(10)).await.unwrap(), Some(quota));
        assert!(store.get(deck_id, date(11)).await.unwrap().is_none());

        store.put(Uuid::new_v4(), date(11), &quota).await.unwrap();
        assert_eq!(store.days(deck_id).await.unwrap(), vec![date(10)]);

        store.remove(deck_id, date(10)).await.unwrap();
        assert!(store.get(deck_id, date(10)).await.unwrap().is_none());
        assert!(store.days(deck_id).await.unwrap().is_empty());
    }
}
