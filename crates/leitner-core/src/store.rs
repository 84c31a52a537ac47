//! Persistence seam.

use crate::models::{Deck, DeckId};
use std::convert::Infallible;

/// Whole-deck storage keyed by deck id.
///
/// Decks are read and written as complete values. Implementations must make
/// sure a `get_deck` / `save_deck` pair for one deck is not interleaved with
/// another writer.
pub trait DeckStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load a deck with all its cards. `Ok(None)` if it does not exist.
    fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, Self::Error>;

    /// Insert or replace a deck and all its cards.
    fn save_deck(&mut self, deck: &Deck) -> Result<(), Self::Error>;

    /// All decks in creation order.
    fn list_decks(&self) -> Result<Vec<Deck>, Self::Error>;

    /// Remove a deck and its cards. Returns whether it existed.
    fn delete_deck(&mut self, id: DeckId) -> Result<bool, Self::Error>;
}

/// In-process store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    decks: Vec<Deck>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeckStore for MemoryStore {
    type Error = Infallible;

    fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, Infallible> {
        Ok(self.decks.iter().find(|d| d.id == id).cloned())
    }

    fn save_deck(&mut self, deck: &Deck) -> Result<(), Infallible> {
        match self.decks.iter_mut().find(|d| d.id == deck.id) {
            Some(existing) => *existing = deck.clone(),
            None => self.decks.push(deck.clone()),
        }
        Ok(())
    }

    fn list_decks(&self) -> Result<Vec<Deck>, Infallible> {
        Ok(self.decks.clone())
    }

    fn delete_deck(&mut self, id: DeckId) -> Result<bool, Infallible> {
        let before = self.decks.len();
        self.decks.retain(|d| d.id != id);
        Ok(self.decks.len() != before)
    }
}
