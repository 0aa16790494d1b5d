mod app;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cardwise-cli", about = "Spaced repetition flashcards in the terminal", version)]
struct Cli {
    /// Use a specific config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Deck management
    #[command(subcommand)]
    Deck(DeckCommand),

    /// Card management
    #[command(subcommand)]
    Card(CardCommand),

    /// Show what is due today in a deck
    Status {
        /// Deck name (case-insensitive prefix match)
        deck: String,
    },

    /// Review due cards interactively
    Review {
        /// Deck name (case-insensitive prefix match)
        deck: String,
        /// Also study cards due within this many days
        #[arg(long, default_value = "0")]
        ahead: u32,
    },
}

#[derive(Subcommand)]
enum DeckCommand {
    /// List decks with card counts
    List,

    /// Create a new deck
    Create {
        /// Deck name
        name: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
        /// Review cards per day (default from config)
        #[arg(long)]
        review_cap: Option<u32>,
        /// New cards per day (default from config)
        #[arg(long)]
        learn_cap: Option<u32>,
    },
}

#[derive(Subcommand)]
enum CardCommand {
    /// Add a card to a deck
    Add {
        /// Deck name (case-insensitive prefix match)
        deck: String,
        /// Question side
        front: String,
        /// Answer side
        back: String,
        /// Hint shown before the answer
        #[arg(long)]
        hint: Option<String>,
    },

    /// List cards in a deck with their schedule
    List {
        /// Deck name (case-insensitive prefix match)
        deck: String,
    },

    /// Exclude a card from reviews
    Suspend {
        /// Card ID
        id: uuid::Uuid,
    },

    /// Return a suspended card to reviews
    Unsuspend {
        /// Card ID
        id: uuid::Uuid,
    },

    /// Delete a card with its schedule and review history
    Delete {
        /// Card ID
        id: uuid::Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();
    let app = app::App::new(cli.config.as_deref())?;

    match cli.command {
        Command::Deck(DeckCommand::List) => {
            commands::deck::run_list(&app, &cli.format, use_color)?;
        }
        Command::Deck(DeckCommand::Create { name, description, review_cap, learn_cap }) => {
            commands::deck::run_create(
                &app,
                name,
                description,
                review_cap,
                learn_cap,
                &cli.format,
            )?;
        }
        Command::Card(CardCommand::Add { deck, front, back, hint }) => {
            commands::card::run_add(&app, &deck, front, back, hint, &cli.format)?;
        }
        Command::Card(CardCommand::List { deck }) => {
            commands::card::run_list(&app, &deck, &cli.format, use_color)?;
        }
        Command::Card(CardCommand::Suspend { id }) => {
            commands::card::run_suspend(&app, id, true)?;
        }
        Command::Card(CardCommand::Unsuspend { id }) => {
            commands::card::run_suspend(&app, id, false)?;
        }
        Command::Card(CardCommand::Delete { id }) => {
            commands::card::run_delete(&app, id)?;
        }
        Command::Status { deck } => {
            commands::status::run(&app, &deck, &cli.format, use_color).await?;
        }
        Command::Review { deck, ahead } => {
            commands::review::run(&app, &deck, ahead, use_color).await?;
        }
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
