//! Deck operations over a [`DeckStore`].
//!
//! Each operation is one read-modify-write of a single deck. A deck or card
//! that does not exist is reported as `None` / `false`, never as an error.

use crate::algorithm::apply_rating;
use crate::error::CoreError;
use crate::models::{Card, CardId, Deck, DeckId, Rating, Section, Timestamp};
use crate::queue;
use crate::stats::{deck_stats, DeckStats};
use crate::store::DeckStore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError<E: std::error::Error + 'static> {
    #[error("storage error: {0}")]
    Store(#[source] E),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type LibraryResult<T, E> = Result<T, LibraryError<E>>;

/// Deck collection backed by a store.
pub struct Library<S> {
    store: S,
}

impl<S: DeckStore> Library<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    // Deck operations

    pub fn decks(&self) -> LibraryResult<Vec<Deck>, S::Error> {
        self.store.list_decks().map_err(LibraryError::Store)
    }

    pub fn deck(&self, id: DeckId) -> LibraryResult<Option<Deck>, S::Error> {
        self.store.get_deck(id).map_err(LibraryError::Store)
    }

    pub fn create_deck(&mut self, name: &str, description: &str, now: Timestamp) -> LibraryResult<Deck, S::Error> {
        let deck = Deck::new(name, description, now);
        self.save(&deck)?;
        tracing::info!(deck = %deck.id, name, "created deck");
        Ok(deck)
    }

    /// Persist a deck built elsewhere (e.g. by an importer).
    pub fn save_deck(&mut self, deck: &Deck) -> LibraryResult<(), S::Error> {
        self.save(deck)
    }

    pub fn update_deck(
        &mut self,
        id: DeckId,
        name: &str,
        description: &str,
        now: Timestamp,
    ) -> LibraryResult<Option<Deck>, S::Error> {
        let Some(mut deck) = self.deck(id)? else {
            return Ok(None);
        };
        deck.rename(name, description, now);
        self.save(&deck)?;
        Ok(Some(deck))
    }

    pub fn delete_deck(&mut self, id: DeckId) -> LibraryResult<bool, S::Error> {
        let deleted = self.store.delete_deck(id).map_err(LibraryError::Store)?;
        if deleted {
            tracing::info!(deck = %id, "deleted deck");
        }
        Ok(deleted)
    }

    // Card operations

    pub fn create_card(
        &mut self,
        deck_id: DeckId,
        sections: Vec<Section>,
        now: Timestamp,
    ) -> LibraryResult<Option<Card>, S::Error> {
        let Some(mut deck) = self.deck(deck_id)? else {
            return Ok(None);
        };
        let card = deck.add_card(sections, now)?.clone();
        self.save(&deck)?;
        tracing::debug!(deck = %deck_id, card = %card.id, "created card");
        Ok(Some(card))
    }

    /// Replace a card's sections without touching its schedule.
    pub fn update_card_sections(
        &mut self,
        deck_id: DeckId,
        card_id: CardId,
        sections: Vec<Section>,
        now: Timestamp,
    ) -> LibraryResult<Option<Card>, S::Error> {
        let Some(mut deck) = self.deck(deck_id)? else {
            return Ok(None);
        };
        let Some(card) = deck.edit_card(card_id, sections, now)?.cloned() else {
            return Ok(None);
        };
        self.save(&deck)?;
        Ok(Some(card))
    }

    pub fn delete_card(&mut self, deck_id: DeckId, card_id: CardId, now: Timestamp) -> LibraryResult<bool, S::Error> {
        let Some(mut deck) = self.deck(deck_id)? else {
            return Ok(false);
        };
        if deck.remove_card(card_id, now).is_none() {
            return Ok(false);
        }
        self.save(&deck)?;
        tracing::debug!(deck = %deck_id, card = %card_id, "deleted card");
        Ok(true)
    }

    /// Record a rating and persist the rescheduled card.
    pub fn rate_card(
        &mut self,
        deck_id: DeckId,
        card_id: CardId,
        rating: Rating,
        now: Timestamp,
    ) -> LibraryResult<Option<Card>, S::Error> {
        let Some(mut deck) = self.deck(deck_id)? else {
            return Ok(None);
        };
        let Some(card) = deck.card(card_id) else {
            return Ok(None);
        };

        let rated = apply_rating(card, rating, now);
        tracing::debug!(
            card = %card_id,
            rating = rating.name(),
            from_box = card.leitner_box(),
            to_box = rated.leitner_box(),
            status = rated.status().name(),
            "rated card"
        );
        deck.replace_card(rated.clone(), now);
        self.save(&deck)?;
        Ok(Some(rated))
    }

    // Queries

    /// Cards due at `now`, in deck order. Empty if the deck does not exist.
    pub fn due_cards(&self, deck_id: DeckId, now: Timestamp) -> LibraryResult<Vec<Card>, S::Error> {
        Ok(self
            .deck(deck_id)?
            .map(|deck| queue::due_cards(&deck, now).into_iter().cloned().collect())
            .unwrap_or_default())
    }

    pub fn deck_stats(&self, deck_id: DeckId) -> LibraryResult<Option<DeckStats>, S::Error> {
        Ok(self.deck(deck_id)?.map(|deck| deck_stats(&deck)))
    }

    fn save(&mut self, deck: &Deck) -> LibraryResult<(), S::Error> {
        self.store.save_deck(deck).map_err(LibraryError::Store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardStatus, DAY_MS};
    use crate::store::MemoryStore;
    use uuid::Uuid;

    fn library() -> Library<MemoryStore> {
        Library::new(MemoryStore::new())
    }

    fn sections(items: &[&str]) -> Vec<Section> {
        items.iter().copied().map(Section::from).collect()
    }

    #[test]
    fn test_deck_lifecycle() {
        let mut lib = library();
        let deck = lib.create_deck("French", "Vocabulary", 10).unwrap();
        assert_eq!(lib.decks().unwrap().len(), 1);

        let renamed = lib.update_deck(deck.id, "Français", "Vocab", 20).unwrap().unwrap();
        assert_eq!(renamed.name, "Français");
        assert_eq!(renamed.updated_at(), 20);
        assert!(lib.update_deck(Uuid::new_v4(), "x", "", 30).unwrap().is_none());

        let card = lib.create_card(deck.id, sections(&["chat", "cat"]), 40).unwrap().unwrap();
        assert_eq!(lib.due_cards(deck.id, 40).unwrap().len(), 1);

        assert!(lib.delete_deck(deck.id).unwrap());
        assert!(!lib.delete_deck(deck.id).unwrap());
        assert!(lib.deck(deck.id).unwrap().is_none());
        assert!(lib.due_cards(deck.id, 40).unwrap().is_empty());
        assert!(lib.rate_card(deck.id, card.id, Rating::Good, 50).unwrap().is_none());
        assert!(lib.decks().unwrap().iter().all(|d| d.card(card.id).is_none()));
    }

    #[test]
    fn test_card_lifecycle() {
        let mut lib = library();
        let deck = lib.create_deck("Test", "", 0).unwrap();

        let card = lib.create_card(deck.id, sections(&["Q", "A"]), 100).unwrap().unwrap();
        assert_eq!(card.next_review(), 100);
        assert!(lib.create_card(Uuid::new_v4(), sections(&["Q"]), 100).unwrap().is_none());
        assert!(matches!(
            lib.create_card(deck.id, Vec::new(), 100),
            Err(LibraryError::Core(CoreError::EmptySections))
        ));

        let rated = lib.rate_card(deck.id, card.id, Rating::Good, 200).unwrap().unwrap();
        let edited = lib
            .update_card_sections(deck.id, card.id, sections(&["Q2", "A2"]), 300)
            .unwrap()
            .unwrap();
        assert_eq!(edited.schedule(), rated.schedule());
        assert_eq!(edited.prompt(), "Q2");

        assert!(lib.delete_card(deck.id, card.id, 400).unwrap());
        assert!(!lib.delete_card(deck.id, card.id, 400).unwrap());
        assert!(lib.deck(deck.id).unwrap().unwrap().is_empty());
    }

    #[test]
    fn test_rate_card_persists() {
        let mut lib = library();
        let deck = lib.create_deck("Test", "", 0).unwrap();
        let card = lib.create_card(deck.id, sections(&["Q", "A"]), 0).unwrap().unwrap();

        let rated = lib.rate_card(deck.id, card.id, Rating::Good, 1000).unwrap().unwrap();
        assert_eq!(rated.leitner_box(), 1);
        assert_eq!(rated.status(), CardStatus::Learning);

        let stored = lib.deck(deck.id).unwrap().unwrap();
        assert_eq!(stored.card(card.id), Some(&rated));
        assert_eq!(stored.updated_at(), 1000);
        assert!(lib.due_cards(deck.id, 1000).unwrap().is_empty());
        assert_eq!(lib.due_cards(deck.id, 1000 + 2 * DAY_MS).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_lookups_are_absent() {
        let mut lib = library();
        let deck = lib.create_deck("Test", "", 0).unwrap();
        assert!(lib.rate_card(deck.id, Uuid::new_v4(), Rating::Good, 1).unwrap().is_none());
        assert!(lib.rate_card(Uuid::new_v4(), Uuid::new_v4(), Rating::Good, 1).unwrap().is_none());
        assert!(lib.due_cards(Uuid::new_v4(), 1).unwrap().is_empty());
        assert!(lib.deck_stats(Uuid::new_v4()).unwrap().is_none());
        assert_eq!(lib.deck_stats(deck.id).unwrap().unwrap().total_cards, 0);
    }
}
