//! Application state and logic.

use crate::config::Config;
use crate::csv_io;
use crate::db::{Database, DbError};
use crate::session::Session;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use leitner_core::{
    deck_stats, due_cards, due_count, next_due, Card, CardId, Deck, DeckId, DeckStats, Library, LibraryError,
    Rating, Section, Timestamp,
};
use std::collections::HashMap;
use std::fmt::Display;
use std::fs::File;
use std::path::Path;

pub type AppResult<T> = Result<T, LibraryError<DbError>>;

/// Source of "now" in milliseconds.
pub type Clock = fn() -> Timestamp;

pub fn system_clock() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

pub struct App {
    pub library: Library<Database>,
    pub config: Config,
    pub clock: Clock,
    pub view: View,
    pub decks: Vec<Deck>,
    pub selected_deck: usize,
    pub deck_stats: HashMap<DeckId, DeckStats>,
    pub due_counts: HashMap<DeckId, usize>,
    pub session: Option<Session>,
    pub current_card: Option<Card>,
    pub selected_card: usize,
    pub editing: bool,
    pub input_buffer: String,
    pub input_field: InputField,
    pub draft: Draft,
    pub pending_delete: Option<PendingDelete>,
    pub message: Option<String>,
    pub show_help: bool,
    pub quit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    DeckList,
    Study,
    Dashboard,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    None,
    DeckName,
    DeckDescription,
    /// Section index of the card being written.
    Section(usize),
    ImportPath,
    ExportPath,
}

/// Values collected across several input prompts.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub deck_name: String,
    /// Deck being renamed, `None` when creating one.
    pub renaming: Option<DeckId>,
    /// Card being edited, `None` when adding one.
    pub card: Option<CardId>,
    pub sections: Vec<String>,
    /// Existing content used to prefill section prompts.
    pub original: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingDelete {
    Deck(DeckId),
    Card(DeckId, CardId),
}

impl App {
    pub fn new(library: Library<Database>, config: Config) -> AppResult<Self> {
        Self::with_clock(library, config, system_clock)
    }

    pub fn with_clock(library: Library<Database>, config: Config, clock: Clock) -> AppResult<Self> {
        let mut app = Self {
            library,
            config,
            clock,
            view: View::DeckList,
            decks: Vec::new(),
            selected_deck: 0,
            deck_stats: HashMap::new(),
            due_counts: HashMap::new(),
            session: None,
            current_card: None,
            selected_card: 0,
            editing: false,
            input_buffer: String::new(),
            input_field: InputField::None,
            draft: Draft::default(),
            pending_delete: None,
            message: None,
            show_help: false,
            quit: false,
        };

        app.refresh_decks()?;
        Ok(app)
    }

    pub fn now(&self) -> Timestamp {
        (self.clock)()
    }

    pub fn refresh_decks(&mut self) -> AppResult<()> {
        self.decks = self.library.decks()?;
        self.recompute_stats();
        if self.selected_deck >= self.decks.len() {
            self.selected_deck = self.decks.len().saturating_sub(1);
        }
        Ok(())
    }

    fn recompute_stats(&mut self) {
        let now = self.now();
        self.deck_stats = self.decks.iter().map(|d| (d.id, deck_stats(d))).collect();
        self.due_counts = self.decks.iter().map(|d| (d.id, due_count(d, now))).collect();
    }

    /// Reload one deck from storage after it changed.
    fn reload_deck(&mut self, deck_id: DeckId) -> AppResult<()> {
        let fresh = self.library.deck(deck_id)?;
        match (self.decks.iter().position(|d| d.id == deck_id), fresh) {
            (Some(i), Some(deck)) => self.decks[i] = deck,
            (Some(i), None) => {
                self.decks.remove(i);
            }
            (None, Some(deck)) => self.decks.push(deck),
            (None, None) => {}
        }
        self.recompute_stats();
        Ok(())
    }

    pub fn selected_deck(&self) -> Option<&Deck> {
        self.decks.get(self.selected_deck)
    }

    pub fn selected_card(&self) -> Option<&Card> {
        self.selected_deck().and_then(|d| d.cards().get(self.selected_card))
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.message = None;

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit = true;
            return;
        }

        if self.show_help {
            self.show_help = false;
            return;
        }

        if let Some(pending) = self.pending_delete.take() {
            if key.code == KeyCode::Char('y') {
                self.confirm_delete(pending);
            } else {
                self.message = Some("Cancelled".to_string());
            }
            return;
        }

        if self.editing {
            self.handle_edit_key(key);
            return;
        }

        match self.view {
            View::DeckList => self.handle_deck_list_key(key),
            View::Study => self.handle_study_key(key),
            View::Dashboard => self.handle_dashboard_key(key),
            View::Editor => self.handle_editor_key(key),
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.stop_editing(),
            KeyCode::Enter => self.finish_editing(),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => self.input_buffer.push(c),
            _ => {}
        }
    }

    fn handle_deck_list_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.decks.is_empty() {
                    self.selected_deck = (self.selected_deck + 1).min(self.decks.len() - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_deck = self.selected_deck.saturating_sub(1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.start_study(),
            KeyCode::Char('a') => {
                self.draft = Draft::default();
                self.start_editing(InputField::DeckName, String::new());
            }
            KeyCode::Char('r') => {
                if let Some(deck) = self.selected_deck() {
                    let (id, name) = (deck.id, deck.name.clone());
                    self.draft = Draft {
                        renaming: Some(id),
                        ..Draft::default()
                    };
                    self.start_editing(InputField::DeckName, name);
                }
            }
            KeyCode::Char('e') | KeyCode::Char('b') => {
                if self.selected_deck().is_some() {
                    self.selected_card = 0;
                    self.view = View::Editor;
                }
            }
            KeyCode::Char('d') => {
                if let Some((id, name)) = self.selected_deck().map(|d| (d.id, d.name.clone())) {
                    self.message = Some(format!("Delete deck '{name}' and all its cards? (y/n)"));
                    self.pending_delete = Some(PendingDelete::Deck(id));
                }
            }
            KeyCode::Char('s') => self.view = View::Dashboard,
            KeyCode::Char('i') => self.start_editing(InputField::ImportPath, String::new()),
            KeyCode::Char('x') => {
                if let Some(deck) = self.selected_deck() {
                    let suggestion = format!("{}.csv", deck.name);
                    self.start_editing(InputField::ExportPath, suggestion);
                }
            }
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('q') => self.quit = true,
            _ => {}
        }
    }

    fn handle_study_key(&mut self, key: KeyEvent) {
        let Some(session) = &mut self.session else {
            self.view = View::DeckList;
            return;
        };

        if session.is_complete() {
            if key.code == KeyCode::Char('r') {
                let deck_id = session.deck_id;
                self.end_session();
                if let Some(i) = self.decks.iter().position(|d| d.id == deck_id) {
                    self.selected_deck = i;
                }
                self.start_study();
            } else {
                self.end_session();
            }
            return;
        }

        let section_count = self.current_card.as_ref().map_or(0, |c| c.sections().len());

        match key.code {
            KeyCode::Char(' ') | KeyCode::Enter => {
                if !session.reveal_next(section_count) {
                    self.message = Some("Rate the card: 1 Again, 2 Hard, 3 Good".to_string());
                }
            }
            KeyCode::Char(c @ '1'..='3') => match Rating::from_key(c) {
                Some(rating) if session.can_rate(section_count) => self.answer(rating),
                _ => self.message = Some("Reveal every section before rating".to_string()),
            },
            KeyCode::Char('q') | KeyCode::Esc => self.end_session(),
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.decks.is_empty() {
                    self.selected_deck = (self.selected_deck + 1).min(self.decks.len() - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_deck = self.selected_deck.saturating_sub(1);
            }
            KeyCode::Char('q') | KeyCode::Esc => self.view = View::DeckList,
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let card_count = self.selected_deck().map_or(0, Deck::len);

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if card_count > 0 {
                    self.selected_card = (self.selected_card + 1).min(card_count - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_card = self.selected_card.saturating_sub(1);
            }
            KeyCode::Char('a') => {
                self.draft = Draft::default();
                self.start_editing(InputField::Section(0), String::new());
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(card) = self.selected_card() {
                    let original: Vec<String> = card.sections().iter().map(|s| s.content.clone()).collect();
                    let first = original.first().cloned().unwrap_or_default();
                    self.draft = Draft {
                        card: Some(card.id),
                        original,
                        ..Draft::default()
                    };
                    self.start_editing(InputField::Section(0), first);
                }
            }
            KeyCode::Char('d') => {
                let target = self
                    .selected_card()
                    .map(|c| (c.deck_id, c.id, c.prompt().to_string()));
                if let Some((deck_id, card_id, prompt)) = target {
                    self.message = Some(format!("Delete card '{prompt}'? (y/n)"));
                    self.pending_delete = Some(PendingDelete::Card(deck_id, card_id));
                }
            }
            KeyCode::Char('q') | KeyCode::Esc => self.view = View::DeckList,
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn start_editing(&mut self, field: InputField, prefill: String) {
        self.editing = true;
        self.input_field = field;
        self.input_buffer = prefill;
    }

    fn stop_editing(&mut self) {
        self.editing = false;
        self.input_buffer.clear();
        self.input_field = InputField::None;
    }

    fn finish_editing(&mut self) {
        let input = self.input_buffer.trim().to_string();

        match self.input_field {
            InputField::DeckName => {
                if input.is_empty() {
                    self.message = Some("Deck name cannot be empty".to_string());
                } else {
                    self.draft.deck_name = input;
                    let description = self
                        .draft
                        .renaming
                        .and_then(|id| self.decks.iter().find(|d| d.id == id))
                        .map(|d| d.description.clone())
                        .unwrap_or_default();
                    self.start_editing(InputField::DeckDescription, description);
                    return;
                }
            }
            InputField::DeckDescription => self.save_deck_draft(&input),
            InputField::Section(index) => {
                if !input.is_empty() {
                    self.draft.sections.push(input);
                    let next = self.draft.original.get(index + 1).cloned().unwrap_or_default();
                    self.start_editing(InputField::Section(index + 1), next);
                    return;
                }
                if index == 0 {
                    self.message = Some("Card discarded".to_string());
                } else {
                    self.save_card_draft();
                }
            }
            InputField::ImportPath => {
                if !input.is_empty() {
                    self.import_csv(Path::new(&input));
                }
            }
            InputField::ExportPath => {
                if !input.is_empty() {
                    self.export_csv(Path::new(&input));
                }
            }
            InputField::None => {}
        }
        self.stop_editing();
    }

    fn save_deck_draft(&mut self, description: &str) {
        let now = self.now();
        let name = std::mem::take(&mut self.draft.deck_name);

        let result = match self.draft.renaming {
            Some(id) => self.library.update_deck(id, &name, description, now).map(|d| d.map(|d| d.id)),
            None => self.library.create_deck(&name, description, now).map(|d| Some(d.id)),
        };

        match result {
            Ok(Some(id)) => {
                self.message = Some(if self.draft.renaming.is_some() {
                    "Deck updated".to_string()
                } else {
                    "Deck created".to_string()
                });
                if let Err(e) = self.refresh_decks() {
                    self.report("Failed to reload decks", e);
                }
                if let Some(i) = self.decks.iter().position(|d| d.id == id) {
                    self.selected_deck = i;
                }
            }
            Ok(None) => self.message = Some("Deck no longer exists".to_string()),
            Err(e) => self.report("Failed to save deck", e),
        }
    }

    fn save_card_draft(&mut self) {
        let Some(deck_id) = self.selected_deck().map(|d| d.id) else {
            return;
        };
        let now = self.now();
        let sections: Vec<Section> = std::mem::take(&mut self.draft.sections)
            .into_iter()
            .map(Section::new)
            .collect();

        let result = match self.draft.card {
            Some(card_id) => self.library.update_card_sections(deck_id, card_id, sections, now),
            None => self.library.create_card(deck_id, sections, now),
        };

        match result {
            Ok(Some(card)) => {
                let edited = self.draft.card.is_some();
                self.message = Some(if edited { "Card updated" } else { "Card created" }.to_string());
                if let Err(e) = self.reload_deck(deck_id) {
                    self.report("Failed to reload deck", e);
                }
                if let Some(i) = self
                    .selected_deck()
                    .and_then(|d| d.cards().iter().position(|c| c.id == card.id))
                {
                    self.selected_card = i;
                }
            }
            Ok(None) => self.message = Some("Card or deck no longer exists".to_string()),
            Err(e) => self.report("Failed to save card", e),
        }
    }

    fn confirm_delete(&mut self, pending: PendingDelete) {
        match pending {
            PendingDelete::Deck(id) => match self.library.delete_deck(id) {
                Ok(_) => {
                    self.message = Some("Deck deleted".to_string());
                    if let Err(e) = self.refresh_decks() {
                        self.report("Failed to reload decks", e);
                    }
                }
                Err(e) => self.report("Failed to delete deck", e),
            },
            PendingDelete::Card(deck_id, card_id) => {
                let now = self.now();
                match self.library.delete_card(deck_id, card_id, now) {
                    Ok(_) => {
                        self.message = Some("Card deleted".to_string());
                        if let Err(e) = self.reload_deck(deck_id) {
                            self.report("Failed to reload deck", e);
                        }
                        let count = self.selected_deck().map_or(0, Deck::len);
                        self.selected_card = self.selected_card.min(count.saturating_sub(1));
                    }
                    Err(e) => self.report("Failed to delete card", e),
                }
            }
        }
    }

    pub fn import_csv(&mut self, path: &Path) {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Imported".to_string());
        let now = self.now();

        let deck = match File::open(path)
            .map_err(csv_io::CsvError::from)
            .and_then(|f| csv_io::import_deck(f, &name, "", now))
        {
            Ok(deck) => deck,
            Err(e) => return self.report("Import failed", e),
        };

        if let Err(e) = self.library.save_deck(&deck) {
            return self.report("Import failed", e);
        }
        self.message = Some(format!("Imported {} cards into '{}'", deck.len(), deck.name));
        let id = deck.id;
        if let Err(e) = self.refresh_decks() {
            self.report("Failed to reload decks", e);
        }
        if let Some(i) = self.decks.iter().position(|d| d.id == id) {
            self.selected_deck = i;
        }
    }

    pub fn export_csv(&mut self, path: &Path) {
        let Some(deck) = self.selected_deck() else {
            return;
        };
        let count = deck.len();
        let result = File::create(path)
            .map_err(csv_io::CsvError::from)
            .and_then(|f| csv_io::export_deck(deck, f));

        match result {
            Ok(()) => self.message = Some(format!("Exported {count} cards to {}", path.display())),
            Err(e) => self.report("Export failed", e),
        }
    }

    fn start_study(&mut self) {
        let Some(deck) = self.selected_deck() else {
            return;
        };
        let now = self.now();
        let deck_id = deck.id;

        let mut queue: Vec<CardId> = due_cards(deck, now).iter().map(|c| c.id).collect();
        if let Some(limit) = self.config.study.review_limit {
            queue.truncate(limit);
        }

        if queue.is_empty() {
            let message = match next_due(deck, now) {
                Some(at) => format!(
                    "No cards due. Next review {}",
                    crate::ui::format_date(at, &self.config.display.date_format)
                ),
                None => "No cards to study!".to_string(),
            };
            self.message = Some(message);
            return;
        }

        tracing::info!(deck = %deck_id, cards = queue.len(), "starting study session");
        self.session = Some(Session::new(deck_id, queue, now));
        self.view = View::Study;
        self.load_current_card();
    }

    fn load_current_card(&mut self) {
        let Some(session) = &mut self.session else { return };
        let card = session.current_card().and_then(|card_id| {
            self.decks
                .iter()
                .find(|d| d.id == session.deck_id)
                .and_then(|d| d.card(card_id))
                .cloned()
        });

        if let Some(card) = &card {
            if self.config.study.reveal_all {
                session.reveal_all(card.sections().len());
            }
        }
        self.current_card = card;
    }

    fn answer(&mut self, rating: Rating) {
        let (Some(session), Some(card)) = (&self.session, &self.current_card) else {
            return;
        };
        let (deck_id, card_id) = (session.deck_id, card.id);
        let now = self.now();

        match self.library.rate_card(deck_id, card_id, rating, now) {
            Ok(Some(_)) => {
                if let Some(session) = &mut self.session {
                    session.record(rating);
                }
                if let Err(e) = self.reload_deck(deck_id) {
                    self.report("Failed to reload deck", e);
                }
            }
            Ok(None) => {
                // Deleted elsewhere; move past it without counting a rating.
                if let Some(session) = &mut self.session {
                    session.skip();
                }
                self.message = Some("Card no longer exists".to_string());
            }
            // Card stays current so the rating can be retried.
            Err(e) => return self.report("Failed to save rating", e),
        }
        self.load_current_card();
    }

    fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(
                deck = %session.deck_id,
                reviewed = session.completed(),
                total = session.total_cards(),
                elapsed_ms = self.now() - session.started_at,
                "ended study session"
            );
        }
        self.current_card = None;
        self.view = View::DeckList;
        if let Err(e) = self.refresh_decks() {
            self.report("Failed to reload decks", e);
        }
    }

    fn report(&mut self, context: &str, err: impl Display) {
        tracing::error!(error = %err, "{context}");
        self.message = Some(format!("{context}: {err}"));
    }
}
