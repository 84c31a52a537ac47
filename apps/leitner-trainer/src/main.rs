//! Leitner Trainer - Spaced repetition flashcards using Leitner boxes.

mod app;
mod config;
mod csv_io;
mod db;
mod session;
mod ui;

use anyhow::{bail, Context};
use app::App;
use clap::{Parser, Subcommand};
use config::Config;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use db::Database;
use leitner_core::{Deck, Library};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "leitner-trainer", about = "Leitner-box flashcards in the terminal", version)]
struct Cli {
    /// Use a specific database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Launch the interactive TUI (default)
    Tui,

    /// List decks with card and due counts
    Decks,

    /// Show deck statistics
    Stats {
        /// Deck id or name (case-insensitive prefix match); all decks if omitted
        deck: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Import a CSV file as a new deck
    Import {
        /// CSV file with a `front` column
        file: PathBuf,
        /// Deck name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Deck description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Export a deck as CSV
    Export {
        /// Deck id or name (case-insensitive prefix match)
        deck: String,
        /// Output file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show the configuration in use
    Config {
        /// Write the current configuration to the config file
        #[arg(long)]
        write: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, config_error) = config_or_default(Config::load());
    let interactive = matches!(cli.command, None | Some(Command::Tui));
    init_logging(&config, interactive);
    if let Some(err) = config_error {
        tracing::warn!(error = %err, "ignoring malformed config file");
    }

    let db_path = cli
        .db
        .clone()
        .or_else(|| config.db_path())
        .context("could not determine a data directory; pass --db")?;

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => run_tui(open_library(&db_path)?, config),
        Command::Decks => list_decks(&open_library(&db_path)?),
        Command::Stats { deck, json } => show_stats(&open_library(&db_path)?, &config, deck.as_deref(), json),
        Command::Import {
            file,
            name,
            description,
        } => import(&mut open_library(&db_path)?, &file, name, &description),
        Command::Export { deck, output } => export(&open_library(&db_path)?, &deck, output.as_deref()),
        Command::Config { write } => show_config(&config, &db_path, write),
    }
}

/// Fall back to defaults on a bad config file, keeping the error to log once logging is up.
fn config_or_default(loaded: Result<Config, toml::de::Error>) -> (Config, Option<toml::de::Error>) {
    match loaded {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    }
}

/// The TUI owns the terminal, so it logs to a file; commands log to stderr.
fn init_logging(config: &Config, interactive: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if !interactive {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_ansi(false),
            )
            .with(filter)
            .init();
        return;
    }

    let Some(file) = Config::log_path().and_then(|path| open_log_file(&path)) else {
        return;
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn open_log_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

fn open_library(path: &Path) -> anyhow::Result<Library<Database>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(Library::new(db))
}

fn run_tui(library: Library<Database>, config: Config) -> anyhow::Result<()> {
    let mut app = App::new(library, config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        tracing::error!(error = %err, "terminal UI failed");
    }
    result
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    while !app.quit {
        terminal.draw(|f| ui::draw(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                app.handle_key(key);
            }
        }
    }
    Ok(())
}

/// Find a deck by id, exact name, or unique case-insensitive name prefix.
fn find_deck<'a>(decks: &'a [Deck], query: &str) -> anyhow::Result<&'a Deck> {
    if let Some(deck) = decks.iter().find(|d| d.id.to_string() == query) {
        return Ok(deck);
    }

    let needle = query.to_lowercase();
    if let Some(deck) = decks.iter().find(|d| d.name.to_lowercase() == needle) {
        return Ok(deck);
    }

    let matches: Vec<&Deck> = decks
        .iter()
        .filter(|d| d.name.to_lowercase().starts_with(&needle))
        .collect();
    match matches.as_slice() {
        [deck] => Ok(*deck),
        [] => bail!("no deck matches '{query}'"),
        many => {
            let names: Vec<&str> = many.iter().map(|d| d.name.as_str()).collect();
            bail!("'{query}' matches several decks: {}", names.join(", "))
        }
    }
}

fn list_decks(library: &Library<Database>) -> anyhow::Result<()> {
    let now = app::system_clock();
    let decks = library.decks()?;
    if decks.is_empty() {
        println!("No decks.");
        return Ok(());
    }
    for deck in &decks {
        println!(
            "{}  {:<24} {:>5} cards {:>5} due",
            deck.id,
            deck.name,
            deck.len(),
            leitner_core::due_count(deck, now)
        );
    }
    Ok(())
}

fn show_stats(library: &Library<Database>, config: &Config, query: Option<&str>, json: bool) -> anyhow::Result<()> {
    let now = app::system_clock();
    let decks = library.decks()?;
    let selected: Vec<&Deck> = match query {
        Some(q) => vec![find_deck(&decks, q)?],
        None => decks.iter().collect(),
    };

    if json {
        let stats: Vec<_> = selected.iter().map(|d| leitner_core::deck_stats(d)).collect();
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    for deck in selected {
        let stats = leitner_core::deck_stats(deck);
        let last = if stats.has_been_studied() {
            ui::format_date(stats.last_studied, &config.display.date_format)
        } else {
            "never".to_string()
        };
        println!("{}", deck.name);
        println!(
            "  total {}  new {}  learning {}  review {}  known {}",
            stats.total_cards, stats.new_cards, stats.learning_cards, stats.review_cards, stats.known_cards
        );
        println!(
            "  due now {}  known {:.0}%  last studied {}",
            leitner_core::due_count(deck, now),
            stats.known_ratio() * 100.0,
            last
        );
        let boxes: Vec<String> = leitner_core::box_distribution(deck)
            .iter()
            .enumerate()
            .map(|(b, n)| format!("{b}:{n}"))
            .collect();
        println!("  boxes {}", boxes.join(" "));
    }
    Ok(())
}

fn import(library: &mut Library<Database>, file: &Path, name: Option<String>, description: &str) -> anyhow::Result<()> {
    let name = name
        .or_else(|| file.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "Imported".to_string());
    let reader = File::open(file).with_context(|| format!("failed to open {}", file.display()))?;
    let deck = csv_io::import_deck(reader, &name, description, app::system_clock())?;
    library.save_deck(&deck)?;
    println!("Imported {} cards into '{}' ({})", deck.len(), deck.name, deck.id);
    Ok(())
}

fn export(library: &Library<Database>, query: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let decks = library.decks()?;
    let deck = find_deck(&decks, query)?;
    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
            csv_io::export_deck(deck, file)?;
            eprintln!("Exported {} cards to {}", deck.len(), path.display());
        }
        None => csv_io::export_deck(deck, io::stdout().lock())?,
    }
    Ok(())
}

fn show_config(config: &Config, db_path: &Path, write: bool) -> anyhow::Result<()> {
    if write {
        config.save()?;
    }
    if let Some(path) = Config::config_path() {
        println!("# config: {}", path.display());
    }
    println!("# database: {}", db_path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
