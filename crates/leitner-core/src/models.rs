//! Card and deck state.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Unique identifiers.
pub type DeckId = Uuid;
pub type CardId = Uuid;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// `last_reviewed` of a card that has never been rated.
pub const NEVER: Timestamp = 0;

/// One day in milliseconds.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Highest Leitner box index.
pub(crate) const TOP_BOX: u8 = 5;

/// A block of card content.
///
/// Section 0 is the prompt; the rest are revealed one at a time while studying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub content: String,
}

impl Section {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl From<&str> for Section {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for Section {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

/// Mastery tier of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    /// Never promoted or demoted.
    #[default]
    New,
    /// Low boxes, or just failed.
    Learning,
    /// Box 2 and up.
    Review,
    /// Top box.
    Known,
}

impl CardStatus {
    pub const ALL: [CardStatus; 4] = [Self::New, Self::Learning, Self::Review, Self::Known];

    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Learning => "Learning",
            Self::Review => "Review",
            Self::Known => "Known",
        }
    }

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Review => "review",
            Self::Known => "known",
        }
    }

    /// Parse the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "learning" => Some(Self::Learning),
            "review" => Some(Self::Review),
            "known" => Some(Self::Known),
            _ => None,
        }
    }
}

/// Recall quality reported after studying a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    /// Failed recall.
    Again,
    /// Marginal recall.
    Hard,
    /// Successful recall.
    Good,
}

impl Rating {
    pub const ALL: [Rating; 3] = [Self::Again, Self::Hard, Self::Good];

    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Again => "Again",
            Self::Hard => "Hard",
            Self::Good => "Good",
        }
    }

    /// Get associated key.
    pub fn key(&self) -> char {
        match self {
            Self::Again => '1',
            Self::Hard => '2',
            Self::Good => '3',
        }
    }

    /// Look up a rating by its key.
    pub fn from_key(key: char) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.key() == key)
    }
}

impl TryFrom<i64> for Rating {
    type Error = CoreError;

    fn try_from(value: i64) -> CoreResult<Self> {
        match value {
            0 => Ok(Self::Again),
            1 => Ok(Self::Hard),
            2 => Ok(Self::Good),
            other => Err(CoreError::InvalidRating(other)),
        }
    }
}

/// Scheduling state of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub status: CardStatus,
    #[serde(rename = "box", deserialize_with = "clamped_box")]
    pub leitner_box: u8,
    pub last_reviewed: Timestamp,
    pub next_review: Timestamp,
}

impl Schedule {
    /// Schedule of a card created at `now`: box 0, due immediately.
    pub fn fresh(now: Timestamp) -> Self {
        Self {
            status: CardStatus::New,
            leitner_box: 0,
            last_reviewed: NEVER,
            next_review: now,
        }
    }

    /// Build a schedule from a raw stored box index, clamping it into range.
    pub fn from_raw(status: CardStatus, raw_box: i64, last_reviewed: Timestamp, next_review: Timestamp) -> Self {
        Self {
            status,
            leitner_box: clamp_box(raw_box),
            last_reviewed,
            next_review,
        }
    }
}

pub(crate) fn clamp_box(raw: i64) -> u8 {
    raw.clamp(0, i64::from(TOP_BOX)) as u8
}

fn clamped_box<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    i64::deserialize(deserializer).map(clamp_box)
}

/// A flashcard.
///
/// Scheduling fields have no setters: a card only gets a new [`Schedule`]
/// through [`crate::algorithm::apply_rating`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Unique identifier.
    pub id: CardId,
    /// Owning deck.
    pub deck_id: DeckId,
    sections: Vec<Section>,
    #[serde(flatten)]
    schedule: Schedule,
    /// When created.
    pub created_at: Timestamp,
    updated_at: Timestamp,
}

impl Card {
    /// Create a new card, due at `now`.
    pub fn new(deck_id: DeckId, sections: Vec<Section>, now: Timestamp) -> CoreResult<Self> {
        if sections.is_empty() {
            return Err(CoreError::EmptySections);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            deck_id,
            sections,
            schedule: Schedule::fresh(now),
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild a card from persisted fields.
    pub fn restore(
        id: CardId,
        deck_id: DeckId,
        sections: Vec<Section>,
        schedule: Schedule,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> CoreResult<Self> {
        if sections.is_empty() {
            return Err(CoreError::EmptySections);
        }
        let schedule = Schedule {
            leitner_box: schedule.leitner_box.min(TOP_BOX),
            ..schedule
        };
        Ok(Self {
            id,
            deck_id,
            sections,
            schedule,
            created_at,
            updated_at,
        })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// First section's content.
    pub fn prompt(&self) -> &str {
        self.sections.first().map_or("", |s| s.content.as_str())
    }

    /// Replace the content. Scheduling state is untouched.
    pub fn set_sections(&mut self, sections: Vec<Section>, now: Timestamp) -> CoreResult<()> {
        if sections.is_empty() {
            return Err(CoreError::EmptySections);
        }
        self.sections = sections;
        self.updated_at = now;
        Ok(())
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn status(&self) -> CardStatus {
        self.schedule.status
    }

    pub fn leitner_box(&self) -> u8 {
        self.schedule.leitner_box
    }

    pub fn last_reviewed(&self) -> Timestamp {
        self.schedule.last_reviewed
    }

    pub fn next_review(&self) -> Timestamp {
        self.schedule.next_review
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn has_been_reviewed(&self) -> bool {
        self.schedule.last_reviewed != NEVER
    }

    pub(crate) fn rescheduled(&self, schedule: Schedule, now: Timestamp) -> Self {
        Self {
            schedule,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// A flashcard deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    /// Unique identifier.
    pub id: DeckId,
    /// Deck name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    cards: Vec<Card>,
    /// When created.
    pub created_at: Timestamp,
    updated_at: Timestamp,
}

impl Deck {
    /// Create an empty deck.
    pub fn new(name: impl Into<String>, description: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            cards: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a deck from persisted fields.
    pub fn restore(
        id: DeckId,
        name: String,
        description: String,
        cards: Vec<Card>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name,
            description,
            cards,
            created_at,
            updated_at,
        }
    }

    /// Cards in insertion order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Change name and description.
    pub fn rename(&mut self, name: impl Into<String>, description: impl Into<String>, now: Timestamp) {
        self.name = name.into();
        self.description = description.into();
        self.updated_at = now;
    }

    /// Append a new card.
    pub fn add_card(&mut self, sections: Vec<Section>, now: Timestamp) -> CoreResult<&Card> {
        let card = Card::new(self.id, sections, now)?;
        self.cards.push(card);
        self.updated_at = now;
        Ok(&self.cards[self.cards.len() - 1])
    }

    /// Replace a card's content. Returns `None` if the card is not in this deck.
    pub fn edit_card(&mut self, card_id: CardId, sections: Vec<Section>, now: Timestamp) -> CoreResult<Option<&Card>> {
        let Some(index) = self.position(card_id) else {
            return Ok(None);
        };
        self.cards[index].set_sections(sections, now)?;
        self.updated_at = now;
        Ok(Some(&self.cards[index]))
    }

    /// Swap in a new value for a card with the same id, keeping its position.
    pub fn replace_card(&mut self, card: Card, now: Timestamp) -> bool {
        match self.position(card.id) {
            Some(index) => {
                self.cards[index] = card;
                self.updated_at = now;
                true
            }
            None => false,
        }
    }

    pub fn remove_card(&mut self, card_id: CardId, now: Timestamp) -> Option<Card> {
        let index = self.position(card_id)?;
        self.updated_at = now;
        Some(self.cards.remove(index))
    }

    fn position(&self, card_id: CardId) -> Option<usize> {
        self.cards.iter().position(|c| c.id == card_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections(items: &[&str]) -> Vec<Section> {
        items.iter().copied().map(Section::from).collect()
    }

    #[test]
    fn test_card_creation() {
        let deck_id = Uuid::new_v4();
        let card = Card::new(deck_id, sections(&["What is 2+2?", "4"]), 1_000).unwrap();
        assert_eq!(card.prompt(), "What is 2+2?");
        assert_eq!(card.status(), CardStatus::New);
        assert_eq!(card.leitner_box(), 0);
        assert_eq!(card.last_reviewed(), NEVER);
        assert_eq!(card.next_review(), 1_000);
        assert_eq!(card.created_at, card.updated_at());
        assert!(!card.has_been_reviewed());
    }

    #[test]
    fn test_card_requires_a_section() {
        let result = Card::new(Uuid::new_v4(), Vec::new(), 0);
        assert_eq!(result.unwrap_err(), CoreError::EmptySections);
    }

    #[test]
    fn test_set_sections_keeps_schedule() {
        let mut card = Card::new(Uuid::new_v4(), sections(&["Q"]), 100).unwrap();
        let before = card.schedule();
        card.set_sections(sections(&["Q2", "A2", "extra"]), 900).unwrap();
        assert_eq!(card.schedule(), before);
        assert_eq!(card.sections().len(), 3);
        assert_eq!(card.updated_at(), 900);
        assert_eq!(card.created_at, 100);

        assert!(card.set_sections(Vec::new(), 1_000).is_err());
        assert_eq!(card.prompt(), "Q2");
    }

    #[test]
    fn test_restore_clamps_box() {
        let schedule = Schedule {
            status: CardStatus::Known,
            leitner_box: 9,
            last_reviewed: 5,
            next_review: 6,
        };
        let card = Card::restore(Uuid::new_v4(), Uuid::new_v4(), sections(&["Q"]), schedule, 1, 2).unwrap();
        assert_eq!(card.leitner_box(), 5);
        assert_eq!(Schedule::from_raw(CardStatus::New, -3, 0, 0).leitner_box, 0);
    }

    #[test]
    fn test_rating_conversion() {
        assert_eq!(Rating::try_from(0), Ok(Rating::Again));
        assert_eq!(Rating::try_from(1), Ok(Rating::Hard));
        assert_eq!(Rating::try_from(2), Ok(Rating::Good));
        assert_eq!(Rating::try_from(3), Err(CoreError::InvalidRating(3)));
        assert_eq!(Rating::try_from(-1), Err(CoreError::InvalidRating(-1)));
        assert_eq!(Rating::from_key('3'), Some(Rating::Good));
        assert_eq!(Rating::from_key('4'), None);
    }

    #[test]
    fn test_status_storage_names() {
        for status in CardStatus::ALL {
            assert_eq!(CardStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CardStatus::parse("relearning"), None);
    }

    #[test]
    fn test_card_json_layout() {
        let card = Card::new(Uuid::new_v4(), sections(&["front", "back"]), 42).unwrap();
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["status"], "new");
        assert_eq!(json["box"], 0);
        assert_eq!(json["lastReviewed"], 0);
        assert_eq!(json["nextReview"], 42);
        assert_eq!(json["sections"][1]["content"], "back");

        let mut raw = json.clone();
        raw["box"] = serde_json::json!(12);
        let parsed: Card = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.leitner_box(), 5);
    }

    #[test]
    fn test_deck_card_operations() {
        let mut deck = Deck::new("Spanish", "Basics", 10);
        let first = deck.add_card(sections(&["hola", "hello"]), 20).unwrap().id;
        let second = deck.add_card(sections(&["adiós", "goodbye"]), 30).unwrap().id;
        assert_eq!(deck.len(), 2);
        assert_eq!(deck.updated_at(), 30);
        assert_eq!(deck.cards()[0].id, first);

        let edited = deck.edit_card(second, sections(&["adiós", "bye"]), 40).unwrap();
        assert_eq!(edited.map(|c| c.sections()[1].content.as_str()), Some("bye"));
        assert!(deck.edit_card(Uuid::new_v4(), sections(&["x"]), 50).unwrap().is_none());

        let removed = deck.remove_card(first, 60).unwrap();
        assert_eq!(removed.id, first);
        assert_eq!(deck.len(), 1);
        assert!(deck.remove_card(first, 70).is_none());
        assert_eq!(deck.updated_at(), 60);
    }
}
