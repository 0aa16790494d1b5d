//! SM-2 Spaced Repetition Algorithm
//!
//! Variant of the SuperMemo 2 algorithm used for every card review.
//!
//! Quality ratings (0-5):
//! - 0: Complete blackout, no recall
//! - 1: Incorrect, but upon seeing answer, remembered
//! - 2: Incorrect, but answer seemed easy to recall
//! - 3: Correct response with serious difficulty
//! - 4: Correct response after hesitation
//! - 5: Perfect response with no hesitation
//!
//! Differences from textbook SM-2: a failed card is re-offered after ten
//! minutes instead of one day, the second successful interval is 3 days
//! instead of 6, and every multi-day interval lands on local midnight.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::error::{FlashcardError, Result};
use super::models::{LearningStage, MemoryState, Rating};

/// Minimum ease factor allowed
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Highest quality on the SM-2 scale
pub const MAX_QUALITY: i32 = 5;

/// Lowest quality that counts as a successful recall
pub const PASSING_QUALITY: i32 = 3;

/// Interval after the second consecutive success
pub const SECOND_INTERVAL_DAYS: u32 = 3;

/// Delay before a failed card is offered again
pub const RELEARN_DELAY_MINUTES: i64 = 10;

/// Calculate the memory state that results from reviewing a card
///
/// # Arguments
/// * `state` - Current memory state (left untouched)
/// * `quality` - Quality rating (0-5)
/// * `now` - Review instant; its timezone decides where midnight is
///
/// # Errors
/// `FlashcardError::InvalidQuality` when `quality` is outside 0..=5.
pub fn calculate_next_review<Tz: TimeZone>(
    state: &MemoryState,
    quality: i32,
    now: &DateTime<Tz>,
) -> Result<MemoryState> {
    if !(0..=MAX_QUALITY).contains(&quality) {
        return Err(FlashcardError::InvalidQuality(quality));
    }

    // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), applied on pass and fail
    let miss = f64::from(MAX_QUALITY - quality);
    let ease_factor = (state.ease_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR);

    let (interval_days, repetitions, stage) = if quality < PASSING_QUALITY {
        (0, 0, LearningStage::Relearning)
    } else {
        let (interval, stage) = match state.repetitions {
            0 => (1, LearningStage::Learning),
            1 => (SECOND_INTERVAL_DAYS, LearningStage::Learning),
            _ => (
                (f64::from(state.interval_days) * ease_factor).round() as u32,
                LearningStage::Review,
            ),
        };
        (interval, state.repetitions + 1, stage)
    };

    Ok(MemoryState {
        ease_factor,
        interval_days,
        repetitions,
        stage,
        next_review_at: next_review_date(now, interval_days),
    })
}

/// Schedule a card from a button rating rather than a raw quality
pub fn calculate_for_rating<Tz: TimeZone>(
    state: &MemoryState,
    rating: Rating,
    now: &DateTime<Tz>,
) -> Result<MemoryState> {
    calculate_next_review(state, ui_rating_to_quality(rating.value()), now)
}

/// When a card with the given interval becomes due again
///
/// Intraday intervals are an exact ten-minute offset; anything longer moves
/// forward by calendar days and snaps to midnight in `now`'s timezone.
pub fn next_review_date<Tz: TimeZone>(now: &DateTime<Tz>, interval_days: u32) -> DateTime<Utc> {
    if interval_days == 0 {
        return (now.clone() + Duration::minutes(RELEARN_DELAY_MINUTES)).with_timezone(&Utc);
    }

    let date = now
        .date_naive()
        .checked_add_days(Days::new(u64::from(interval_days)))
        .unwrap_or(NaiveDate::MAX);
    local_midnight(&now.timezone(), date)
}

/// Start of `date` in `tz`
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    // Midnight itself may not exist on a DST switch day
    (0..3)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// Map UI rating (1-4: Again, Hard, Good, Easy) to SM-2 quality (0-5)
pub fn ui_rating_to_quality(rating: i32) -> i32 {
    match rating {
        1 => 0, // Again -> complete blackout
        2 => 3, // Hard -> correct with difficulty
        3 => 4, // Good -> correct after hesitation
        4 => 5, // Easy -> perfect
        _ => 3,
    }
}

/// Interval a rating would produce, for display next to its button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalPreview {
    pub rating: Rating,
    pub interval_days: u32,
    pub label: String,
}

/// Calculate the preview intervals for each rating
///
/// Pure: nothing is persisted, and the same state and `now` always give the
/// same answer as a real review would.
pub fn preview_intervals<Tz: TimeZone>(
    state: &MemoryState,
    now: &DateTime<Tz>,
) -> Result<Vec<IntervalPreview>> {
    Rating::ALL
        .iter()
        .map(|&rating| {
            calculate_for_rating(state, rating, now).map(|next| IntervalPreview {
                rating,
                interval_days: next.interval_days,
                label: format_interval(next.interval_days),
            })
        })
        .collect()
}

/// Format an interval in days the way the rating buttons show it
pub fn format_interval(days: u32) -> String {
    match days {
        0 => format!("{} min", RELEARN_DELAY_MINUTES),
        1 => "1 day".to_string(),
        n => format!("{} days", n),
    }
}

/// Message shown when nothing is left to review
pub fn describe_next_review(next: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = next - now;
    if diff <= Duration::zero() {
        return "You have cards due now!".to_string();
    }

    let minutes = diff.num_minutes();
    if minutes < 60 {
        return format!("Next review in {} minutes", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("Next review in {} hours", hours);
    }

    format!("Next review in {} days", hours / 24)
}
