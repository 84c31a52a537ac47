//! Leitner box scheduling.
//!
//! A card sits in one of six boxes. AGAIN sends it back to box 0, HARD keeps it
//! where it is, GOOD moves it up one box. Each box has a fixed review interval.

use crate::models::{Card, CardStatus, Rating, Schedule, Timestamp, DAY_MS, TOP_BOX};

/// Days until the next review, indexed by box.
pub const LEITNER_INTERVALS: [u32; 6] = [1, 2, 4, 7, 14, 30];

/// Highest box index.
pub const MAX_BOX: u8 = TOP_BOX;

/// Box a card moves to after being rated.
pub fn next_box(current: u8, rating: Rating) -> u8 {
    match rating {
        Rating::Again => 0,
        Rating::Hard => current.min(MAX_BOX),
        Rating::Good => current.saturating_add(1).min(MAX_BOX),
    }
}

/// Review interval in days for a box index. Indices past the table reuse its last value.
pub fn review_interval(leitner_box: i64) -> u32 {
    if leitner_box < 0 {
        return 0;
    }
    let last = LEITNER_INTERVALS[LEITNER_INTERVALS.len() - 1];
    usize::try_from(leitner_box)
        .ok()
        .and_then(|i| LEITNER_INTERVALS.get(i).copied())
        .unwrap_or(last)
}

/// Status after a rating.
///
/// HARD never reclassifies, so a NEW card rated HARD stays NEW.
fn next_status(current: CardStatus, new_box: u8, rating: Rating) -> CardStatus {
    match rating {
        Rating::Good => {
            let mut status = if new_box >= 2 {
                CardStatus::Review
            } else {
                CardStatus::Learning
            };
            if new_box >= MAX_BOX {
                status = CardStatus::Known;
            }
            status
        }
        Rating::Again => CardStatus::Learning,
        Rating::Hard => current,
    }
}

/// Apply a rating to a card, returning the rescheduled copy.
pub fn apply_rating(card: &Card, rating: Rating, now: Timestamp) -> Card {
    let new_box = next_box(card.leitner_box(), rating);
    let days = review_interval(i64::from(new_box));

    let schedule = Schedule {
        status: next_status(card.status(), new_box, rating),
        leitner_box: new_box,
        last_reviewed: now,
        next_review: now.saturating_add(i64::from(days) * DAY_MS),
    };

    card.rescheduled(schedule, now)
}

/// Interval in days each rating would give this card.
pub fn preview_intervals(card: &Card) -> [(Rating, u32); 3] {
    Rating::ALL.map(|rating| {
        let days = review_interval(i64::from(next_box(card.leitner_box(), rating)));
        (rating, days)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Section, NEVER};
    use uuid::Uuid;

    fn card_in(leitner_box: u8, status: CardStatus) -> Card {
        let schedule = Schedule {
            status,
            leitner_box,
            last_reviewed: NEVER,
            next_review: 0,
        };
        Card::restore(
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![Section::new("front"), Section::new("back")],
            schedule,
            0,
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_next_box() {
        assert_eq!(next_box(3, Rating::Again), 0);
        assert_eq!(next_box(3, Rating::Hard), 3);
        assert_eq!(next_box(2, Rating::Good), 3);
        assert_eq!(next_box(5, Rating::Good), 5);
        assert_eq!(next_box(0, Rating::Hard), 0);
    }

    #[test]
    fn test_out_of_range_box_is_clamped() {
        assert_eq!(next_box(9, Rating::Hard), 5);
        assert_eq!(next_box(u8::MAX, Rating::Good), 5);
    }

    #[test]
    fn test_review_interval() {
        assert_eq!(review_interval(0), 1);
        assert_eq!(review_interval(3), 7);
        assert_eq!(review_interval(5), 30);
        assert_eq!(review_interval(6), 30);
        assert_eq!(review_interval(-1), 0);
    }

    #[test]
    fn test_good_from_new() {
        let card = card_in(0, CardStatus::New);
        let rated = apply_rating(&card, Rating::Good, 1000);
        assert_eq!(rated.leitner_box(), 1);
        assert_eq!(rated.status(), CardStatus::Learning);
        assert_eq!(rated.next_review(), 1000 + 2 * DAY_MS);
        assert_eq!(rated.last_reviewed(), 1000);
        assert_eq!(rated.updated_at(), 1000);
    }

    #[test]
    fn test_good_into_top_box_is_known() {
        let card = card_in(4, CardStatus::Review);
        let rated = apply_rating(&card, Rating::Good, 5000);
        assert_eq!(rated.leitner_box(), 5);
        assert_eq!(rated.status(), CardStatus::Known);
        assert_eq!(rated.next_review(), 5000 + 30 * DAY_MS);
    }

    #[test]
    fn test_again_demotes() {
        let card = card_in(3, CardStatus::Review);
        let rated = apply_rating(&card, Rating::Again, 2000);
        assert_eq!(rated.leitner_box(), 0);
        assert_eq!(rated.status(), CardStatus::Learning);
        assert_eq!(rated.next_review(), 2000 + DAY_MS);
    }

    #[test]
    fn test_hard_keeps_status() {
        let card = card_in(1, CardStatus::New);
        let rated = apply_rating(&card, Rating::Hard, 3000);
        assert_eq!(rated.leitner_box(), 1);
        assert_eq!(rated.status(), CardStatus::New);
        assert_eq!(rated.next_review(), 3000 + 2 * DAY_MS);
    }

    #[test]
    fn test_apply_rating_leaves_input_untouched() {
        let card = card_in(2, CardStatus::Review);
        let snapshot = card.clone();
        let rated = apply_rating(&card, Rating::Good, 7000);
        assert_eq!(card, snapshot);
        assert_eq!(rated.id, card.id);
        assert_eq!(rated.deck_id, card.deck_id);
        assert_eq!(rated.sections(), card.sections());
        assert_eq!(rated.created_at, card.created_at);
    }

    #[test]
    fn test_next_review_saturates_at_end_of_time() {
        let card = card_in(4, CardStatus::Review);
        let now = i64::MAX - DAY_MS;
        let rated = apply_rating(&card, Rating::Good, now);
        assert_eq!(rated.next_review(), i64::MAX);
        assert_eq!(rated.last_reviewed(), now);
        assert_eq!(rated.status(), CardStatus::Known);
    }

    #[test]
    fn test_preview_intervals() {
        let card = card_in(2, CardStatus::Review);
        assert_eq!(
            preview_intervals(&card),
            [(Rating::Again, 1), (Rating::Hard, 4), (Rating::Good, 7)]
        );
    }
}
