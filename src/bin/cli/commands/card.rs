use anyhow::Result;
use chrono::{Local, Utc};
use uuid::Uuid;

use cardwise::flashcards::algorithm::format_interval;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run_add(
    app: &App,
    deck_name: &str,
    front: String,
    back: String,
    hint: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let deck = app.find_deck(deck_name)?;
    let card = app.create_card(deck.id, front, back, hint)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&card)?);
        }
        OutputFormat::Plain => {
            println!("Added card to deck \"{}\"", deck.name);
            println!("  ID: {}", card.id());
        }
    }

    Ok(())
}

pub fn run_list(app: &App, deck_name: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let deck = app.find_deck(deck_name)?;
    let cards = app.list_cards(deck.id)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&cards)?);
        }
        OutputFormat::Plain => {
            if cards.is_empty() {
                println!("(no cards in \"{}\")", deck.name);
            }
            let now = Utc::now();
            for card in &cards {
                let due = if card.flashcard.is_suspended {
                    paint("suspended", Color::GRAY, use_color)
                } else if card.memory.is_due(now) {
                    paint("due", Color::GREEN, use_color)
                } else {
                    card.memory
                        .next_review_at
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M")
                        .to_string()
                };
                println!(
                    "{}  {}  [{}, {}, ef {:.2}]  {}",
                    paint(&card.id().to_string()[..8], Color::DIM, use_color),
                    card.flashcard.front,
                    card.memory.stage,
                    format_interval(card.memory.interval_days),
                    card.memory.ease_factor,
                    due
                );
            }
        }
    }

    Ok(())
}

pub fn run_delete(app: &App, card_id: Uuid) -> Result<()> {
    let card = app.delete_card(card_id)?;
    println!("Deleted card \"{}\"", card.front);
    Ok(())
}

pub fn run_suspend(app: &App, card_id: Uuid, suspended: bool) -> Result<()> {
    let card = app.set_suspended(card_id, suspended)?;
    let verb = if suspended { "Suspended" } else { "Unsuspended" };
    println!("{} card \"{}\"", verb, card.front);
    Ok(())
}
