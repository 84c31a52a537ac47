//! Study session state.

use leitner_core::{CardId, DeckId, Rating, Timestamp};

/// One pass over a deck's due queue.
#[derive(Debug, Clone)]
pub struct Session {
    /// Deck being studied.
    pub deck_id: DeckId,
    /// Due cards, in deck order.
    pub queue: Vec<CardId>,
    /// Current card index.
    pub current_index: usize,
    /// Sections of the current card on screen.
    pub revealed: usize,
    /// Ratings given this session, indexed like [`Rating::ALL`].
    pub tally: [usize; 3],
    /// When session started.
    pub started_at: Timestamp,
}

impl Session {
    /// Create a new session.
    pub fn new(deck_id: DeckId, queue: Vec<CardId>, started_at: Timestamp) -> Self {
        Self {
            deck_id,
            queue,
            current_index: 0,
            revealed: 1,
            tally: [0; 3],
            started_at,
        }
    }

    /// Get current card ID.
    pub fn current_card(&self) -> Option<CardId> {
        self.queue.get(self.current_index).copied()
    }

    /// Check if session is complete.
    pub fn is_complete(&self) -> bool {
        self.current_index >= self.queue.len()
    }

    pub fn total_cards(&self) -> usize {
        self.queue.len()
    }

    pub fn completed(&self) -> usize {
        self.current_index.min(self.queue.len())
    }

    /// Completion in whole percent.
    pub fn percent(&self) -> usize {
        self.completed() * 100 / self.queue.len().max(1)
    }

    /// Show one more section. Returns false once everything is visible.
    pub fn reveal_next(&mut self, section_count: usize) -> bool {
        if self.revealed < section_count {
            self.revealed += 1;
            true
        } else {
            false
        }
    }

    pub fn reveal_all(&mut self, section_count: usize) {
        self.revealed = self.revealed.max(section_count);
    }

    /// Ratings are only taken once the whole card is visible.
    pub fn can_rate(&self, section_count: usize) -> bool {
        !self.is_complete() && self.revealed >= section_count
    }

    /// Record a response and move to the next card.
    pub fn record(&mut self, rating: Rating) {
        let slot = Rating::ALL.iter().position(|r| *r == rating).unwrap_or(0);
        self.tally[slot] += 1;
        self.current_index += 1;
        self.revealed = 1;
    }

    /// Move past the current card without recording a rating.
    pub fn skip(&mut self) {
        if !self.is_complete() {
            self.current_index += 1;
        }
        self.revealed = 1;
    }

    pub fn count(&self, rating: Rating) -> usize {
        Rating::ALL
            .iter()
            .position(|r| *r == rating)
            .map_or(0, |i| self.tally[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_session_walks_queue() {
        let cards = vec![Uuid::new_v4(), Uuid::new_v4()];
        let mut session = Session::new(Uuid::new_v4(), cards.clone(), 0);

        assert_eq!(session.current_card(), Some(cards[0]));
        assert!(!session.is_complete());
        assert_eq!(session.percent(), 0);

        session.record(Rating::Good);
        assert_eq!(session.current_card(), Some(cards[1]));
        assert_eq!(session.percent(), 50);

        session.record(Rating::Again);
        assert!(session.is_complete());
        assert_eq!(session.current_card(), None);
        assert_eq!(session.completed(), 2);
        assert_eq!(session.count(Rating::Good), 1);
        assert_eq!(session.count(Rating::Again), 1);
        assert_eq!(session.count(Rating::Hard), 0);
    }

    #[test]
    fn test_progressive_reveal() {
        let mut session = Session::new(Uuid::new_v4(), vec![Uuid::new_v4(), Uuid::new_v4()], 0);
        assert!(!session.can_rate(3));
        assert!(session.reveal_next(3));
        assert!(!session.can_rate(3));
        assert!(session.reveal_next(3));
        assert!(session.can_rate(3));
        assert!(!session.reveal_next(3));

        session.record(Rating::Hard);
        assert_eq!(session.revealed, 1);
        assert!(session.can_rate(1));

        session.reveal_all(4);
        assert_eq!(session.revealed, 4);
    }

    #[test]
    fn test_skip_does_not_tally() {
        let cards = vec![Uuid::new_v4(), Uuid::new_v4()];
        let mut session = Session::new(Uuid::new_v4(), cards.clone(), 0);
        session.reveal_next(2);
        session.skip();
        assert_eq!(session.current_card(), Some(cards[1]));
        assert_eq!(session.revealed, 1);
        assert!(Rating::ALL.iter().all(|r| session.count(*r) == 0));

        session.skip();
        session.skip();
        assert!(session.is_complete());
        assert_eq!(session.completed(), 2);
    }

    #[test]
    fn test_empty_session() {
        let session = Session::new(Uuid::new_v4(), Vec::new(), 0);
        assert!(session.is_complete());
        assert!(!session.can_rate(1));
        assert_eq!(session.percent(), 0);
    }
}
