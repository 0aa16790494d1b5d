use anyhow::Result;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run_list(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let decks = app.list_decks()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&decks)?);
        }
        OutputFormat::Plain => {
            if decks.is_empty() {
                println!("(no decks)");
            }
            for deck in &decks {
                println!(
                    "{} ({} cards, {} review / {} new per day)",
                    paint(&deck.name, Color::BOLD, use_color),
                    deck.card_count,
                    deck.review_cards_per_session,
                    deck.learn_cards_per_session
                );
                if let Some(description) = &deck.description {
                    println!("    {}", paint(description, Color::GRAY, use_color));
                }
            }
        }
    }

    Ok(())
}

pub fn run_create(
    app: &App,
    name: String,
    description: Option<String>,
    review_cap: Option<u32>,
    learn_cap: Option<u32>,
    format: &OutputFormat,
) -> Result<()> {
    let deck = app.create_deck(name, description, review_cap, learn_cap)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&deck)?);
        }
        OutputFormat::Plain => {
            println!("Created deck \"{}\"", deck.name);
            println!(
                "  Daily caps: {} review, {} new",
                deck.review_cards_per_session, deck.learn_cards_per_session
            );
            println!("  ID: {}", deck.id);
        }
    }

    Ok(())
}
