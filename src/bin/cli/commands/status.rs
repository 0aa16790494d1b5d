use anyhow::{Context, Result};

use cardwise::flashcards::{DeckConfig, QuotaState, SessionStatus};

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

/// Today's counts against the caps the session actually applies
fn quota_summary(quota: &QuotaState, config: &DeckConfig) -> String {
    format!(
        "{}/{} reviewed, {}/{} learned",
        quota.reviewed_count,
        config.review_cap(),
        quota.learned_count,
        config.learn_cap()
    )
}

pub async fn run(app: &App, deck_name: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let deck = app.find_deck(deck_name)?;
    let mut session = app.session(deck.id, 0);
    let status = session.load().await.context("Failed to load due cards")?;

    let composition = session.composition();
    let quota = session.quota();
    let config = session
        .deck_config()
        .cloned()
        .unwrap_or_else(|| DeckConfig::new(deck.id));

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "deckId": deck.id.to_string(),
                "deckName": deck.name,
                "status": status,
                "composition": composition,
                "quota": quota,
                "reviewCap": config.review_cap(),
                "learnCap": config.learn_cap(),
                "nextReviewAt": session.next_review_at(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{}", paint(&deck.name, Color::BOLD, use_color));
            println!(
                "  Due now: {} review, {} new",
                composition.review_cards, composition.new_cards
            );
            if let Some(quota) = quota {
                println!("  Today: {}", quota_summary(&quota, &config));
            }
            if status == SessionStatus::AllCaughtUp {
                let message = session
                    .caught_up_message()
                    .unwrap_or_else(|| "No cards scheduled".to_string());
                println!("  All caught up. {}", message);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_quota_summary_uses_effective_caps() {
        let mut quota = QuotaState::new(Utc::now());
        quota.reviewed_count = 4;
        quota.learned_count = 2;
        let mut config = DeckConfig::new(Uuid::new_v4());
        config.review_cap_per_session = 0;
        config.learn_cap_per_session = 5;

        assert_eq!(quota_summary(&quota, &config), "4/10 reviewed, 2/5 learned");
    }
}
