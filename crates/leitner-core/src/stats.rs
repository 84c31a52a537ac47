//! Deck statistics.

use crate::algorithm::LEITNER_INTERVALS;
use crate::models::{CardStatus, Deck, DeckId, Timestamp, NEVER};
use serde::Serialize;

/// Status counts for a deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckStats {
    pub deck_id: DeckId,
    /// Total cards.
    pub total_cards: usize,
    /// Never promoted or demoted.
    pub new_cards: usize,
    /// Cards in learning.
    pub learning_cards: usize,
    /// Cards in review.
    pub review_cards: usize,
    /// Cards in the top box.
    pub known_cards: usize,
    /// Latest rating time across the deck, or [`NEVER`].
    pub last_studied: Timestamp,
}

impl DeckStats {
    /// Count for one status.
    pub fn count(&self, status: CardStatus) -> usize {
        match status {
            CardStatus::New => self.new_cards,
            CardStatus::Learning => self.learning_cards,
            CardStatus::Review => self.review_cards,
            CardStatus::Known => self.known_cards,
        }
    }

    /// Share of the deck that is known, 0.0 for an empty deck.
    pub fn known_ratio(&self) -> f64 {
        if self.total_cards == 0 {
            0.0
        } else {
            self.known_cards as f64 / self.total_cards as f64
        }
    }

    pub fn has_been_studied(&self) -> bool {
        self.last_studied != NEVER
    }
}

/// Reduce a deck into status counts.
pub fn deck_stats(deck: &Deck) -> DeckStats {
    let mut stats = DeckStats {
        deck_id: deck.id,
        total_cards: deck.len(),
        new_cards: 0,
        learning_cards: 0,
        review_cards: 0,
        known_cards: 0,
        last_studied: NEVER,
    };

    for card in deck.cards() {
        match card.status() {
            CardStatus::New => stats.new_cards += 1,
            CardStatus::Learning => stats.learning_cards += 1,
            CardStatus::Review => stats.review_cards += 1,
            CardStatus::Known => stats.known_cards += 1,
        }
        stats.last_studied = stats.last_studied.max(card.last_reviewed());
    }

    stats
}

/// Number of cards in each box.
pub fn box_distribution(deck: &Deck) -> [usize; LEITNER_INTERVALS.len()] {
    let mut counts = [0; LEITNER_INTERVALS.len()];
    for card in deck.cards() {
        counts[usize::from(card.leitner_box())] += 1;
    }
    counts
}
