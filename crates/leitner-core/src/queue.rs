//! Due-card selection.

use crate::models::{Card, Deck, Timestamp};

/// Whether a card may be studied at `now`.
pub fn is_due(card: &Card, now: Timestamp) -> bool {
    card.next_review() <= now
}

/// Cards eligible for study at `now`, in deck order.
pub fn due_cards(deck: &Deck, now: Timestamp) -> Vec<&Card> {
    deck.cards().iter().filter(|c| is_due(c, now)).collect()
}

pub fn due_count(deck: &Deck, now: Timestamp) -> usize {
    deck.cards().iter().filter(|c| is_due(c, now)).count()
}

/// Earliest review time still in the future, if any.
pub fn next_due(deck: &Deck, now: Timestamp) -> Option<Timestamp> {
    deck.cards()
        .iter()
        .map(Card::next_review)
        .filter(|&t| t > now)
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::apply_rating;
    use crate::models::{Rating, Section, DAY_MS};

    fn deck_with_due_times(times: &[i64]) -> Deck {
        let mut deck = Deck::new("Test", "", 0);
        for &t in times {
            deck.add_card(vec![Section::new(format!("card {t}"))], t).unwrap();
        }
        deck
    }

    #[test]
    fn test_due_selection_keeps_order() {
        let deck = deck_with_due_times(&[500, 1500, 2500]);
        let due = due_cards(&deck, 2000);
        let prompts: Vec<&str> = due.iter().map(|c| c.prompt()).collect();
        assert_eq!(prompts, vec!["card 500", "card 1500"]);
        assert_eq!(due_count(&deck, 2000), 2);
    }

    #[test]
    fn test_due_boundary_is_inclusive() {
        let deck = deck_with_due_times(&[2000]);
        assert_eq!(due_cards(&deck, 2000).len(), 1);
        assert!(due_cards(&deck, 1999).is_empty());
    }

    #[test]
    fn test_due_selection_is_repeatable() {
        let deck = deck_with_due_times(&[3000, 100, 2000, 50]);
        let first: Vec<_> = due_cards(&deck, 2000).iter().map(|c| c.id).collect();
        let second: Vec<_> = due_cards(&deck, 2000).iter().map(|c| c.id).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_next_due() {
        let mut deck = deck_with_due_times(&[100]);
        assert_eq!(next_due(&deck, 200), None);

        let rated = apply_rating(&deck.cards()[0], Rating::Good, 200);
        deck.replace_card(rated, 200);
        assert_eq!(next_due(&deck, 200), Some(200 + 2 * DAY_MS));
        assert!(due_cards(&deck, 200).is_empty());
    }

    #[test]
    fn test_empty_deck() {
        let deck = Deck::new("Empty", "", 0);
        assert!(due_cards(&deck, i64::MAX).is_empty());
        assert_eq!(next_due(&deck, 0), None);
    }
}
