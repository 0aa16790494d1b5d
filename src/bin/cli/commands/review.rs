use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use cardwise::flashcards::{Rating, SessionManager, SessionStatus, SystemClock};

use crate::app::App;
use crate::render::terminal::{
    paint, render_back, render_front, render_previews, render_progress, render_tally, Color,
};

/// What the user typed at a prompt
enum Input {
    Rate(Rating),
    Show,
    Undo,
    Again,
    Quit,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    match line.trim() {
        "s" | "" => Input::Show,
        "u" => Input::Undo,
        "r" => Input::Again,
        "q" => Input::Quit,
        other => match other.parse::<i32>().map(Rating::try_from) {
            Ok(Ok(rating)) => Input::Rate(rating),
            _ => Input::Unknown,
        },
    }
}

/// Read one line; `None` on end of input
fn prompt(text: &str) -> Result<Option<String>> {
    print!("{} ", text);
    io::stdout().flush()?;

    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    Ok(if read == 0 { None } else { Some(line) })
}

pub async fn run(app: &App, deck_name: &str, ahead: u32, use_color: bool) -> Result<()> {
    let deck = app.find_deck(deck_name)?;
    let mut session = app.session(deck.id, ahead);
    session.load().await.context("Failed to load due cards")?;

    println!(
        "{} ({} review, {} new)",
        paint(&deck.name, Color::BOLD, use_color),
        session.composition().review_cards,
        session.composition().new_cards
    );

    let mut answer_shown = false;
    loop {
        let line = match session.status() {
            SessionStatus::Active => {
                let Some(card) = session.current_card() else { break };
                println!();
                println!(
                    "{}",
                    paint(
                        &render_progress(session.cursor(), session.queue().len(), session.progress_percent()),
                        Color::GRAY,
                        use_color
                    )
                );
                println!("{}", render_front(card, use_color));
                if answer_shown {
                    println!("{}", render_back(card, use_color));
                    println!("{}", render_previews(&session.preview_intervals()?, use_color));
                    prompt("Rate 1-4, u undo, q quit:")?
                } else {
                    prompt("s show answer, u undo, q quit:")?
                }
            }
            SessionStatus::Completed => {
                println!();
                println!("{}", paint("Session complete!", Color::GREEN, use_color));
                println!("{}", render_tally(&session.tally(), use_color));
                prompt("r review again, u undo, q quit:")?
            }
            SessionStatus::AllCaughtUp => {
                let message = session
                    .caught_up_message()
                    .unwrap_or_else(|| "No cards scheduled".to_string());
                println!();
                println!("All caught up! {}", message);
                if !session.can_undo() {
                    break;
                }
                prompt("r check again, u undo, q quit:")?
            }
            SessionStatus::Loading => break,
        };

        let Some(line) = line else { break };
        match parse_input(&line) {
            Input::Quit => break,
            Input::Show => answer_shown = session.status() == SessionStatus::Active,
            Input::Rate(rating) => {
                if rate(&mut session, rating, answer_shown, use_color).await {
                    answer_shown = false;
                }
            }
            Input::Undo => match session.undo().await {
                Ok(Some(card)) => {
                    println!("Undid rating of \"{}\"", card.flashcard.front);
                    answer_shown = false;
                }
                Ok(None) => println!("Nothing to undo"),
                Err(err) => eprintln!("{}", paint(&format!("Undo failed: {}", err), Color::RED, use_color)),
            },
            Input::Again => {
                if let Err(err) = session.review_again().await {
                    eprintln!("{}", paint(&format!("{}", err), Color::RED, use_color));
                }
            }
            Input::Unknown => println!("Unrecognized input"),
        }
    }

    Ok(())
}

/// Submit a rating for the current card; true when it was accepted
async fn rate(
    session: &mut SessionManager<SystemClock>,
    rating: Rating,
    answer_shown: bool,
    use_color: bool,
) -> bool {
    if !answer_shown {
        println!("Show the answer first (s)");
        return false;
    }
    let Some(card_id) = session.current_card().map(|card| card.id()) else {
        return false;
    };

    match session.submit_rating(card_id, rating).await {
        Ok(outcome) => {
            log::debug!("Card {} next due {}", card_id, outcome.card.memory.next_review_at);
            true
        }
        Err(err) => {
            eprintln!("{}", paint(&format!("Rating not saved: {}", err), Color::RED, use_color));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert!(matches!(parse_input("3\n"), Input::Rate(Rating::Good)));
        assert!(matches!(parse_input("1"), Input::Rate(Rating::Again)));
        assert!(matches!(parse_input("5"), Input::Unknown));
        assert!(matches!(parse_input("u"), Input::Undo));
        assert!(matches!(parse_input(" q "), Input::Quit));
        assert!(matches!(parse_input("\n"), Input::Show));
        assert!(matches!(parse_input("x"), Input::Unknown));
    }
}
