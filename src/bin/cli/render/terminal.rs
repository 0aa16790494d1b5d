use cardwise::flashcards::algorithm::IntervalPreview;
use cardwise::flashcards::{Card, Rating, RatingTally};

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Wrap `text` in `color` when colors are on
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

fn rating_color(rating: Rating) -> &'static str {
    match rating {
        Rating::Again => Color::RED,
        Rating::Hard => Color::YELLOW,
        Rating::Good => Color::GREEN,
        Rating::Easy => Color::BLUE,
    }
}

/// Question side, with the hint dimmed below it
pub fn render_front(card: &Card, use_color: bool) -> String {
    let mut lines = vec![paint(&card.flashcard.front, Color::BOLD, use_color)];
    if let Some(hint) = &card.flashcard.hint {
        lines.push(paint(&format!("Hint: {}", hint), Color::GRAY, use_color));
    }
    lines.join("\n")
}

pub fn render_back(card: &Card, use_color: bool) -> String {
    paint(&card.flashcard.back, Color::CYAN, use_color)
}

/// One line of rating buttons: "1 Again (10 min)  2 Hard (1 day) ..."
pub fn render_previews(previews: &[IntervalPreview], use_color: bool) -> String {
    previews
        .iter()
        .map(|p| {
            let button = format!("{} {}", p.rating.value(), p.rating.label());
            format!("{} ({})", paint(&button, rating_color(p.rating), use_color), p.label)
        })
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn render_tally(tally: &RatingTally, use_color: bool) -> String {
    Rating::ALL
        .iter()
        .map(|rating| {
            let count = format!("{}: {}", rating.label(), tally.get(*rating));
            paint(&count, rating_color(*rating), use_color)
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// Text progress bar, e.g. "[#####-----] 3/6"
pub fn render_progress(done: usize, total: usize, percent: u32) -> String {
    const WIDTH: usize = 20;
    let filled = (percent as usize * WIDTH) / 100;
    format!(
        "[{}{}] {}/{}",
        "#".repeat(filled),
        "-".repeat(WIDTH - filled.min(WIDTH)),
        done,
        total
    )
}
