//! Leitner-box scheduling engine.
//!
//! This crate holds everything that decides *when* a card is studied:
//! - Card and deck state ([`models`])
//! - The box policy and the review transition ([`algorithm`])
//! - Due-card selection ([`queue`]) and deck statistics ([`stats`])
//! - The persistence seam ([`store`]) and deck operations built on it ([`library`])
//!
//! Nothing here reads a clock or touches the filesystem. Every time-sensitive
//! operation takes `now` as a millisecond [`Timestamp`].

pub mod algorithm;
pub mod error;
pub mod library;
pub mod models;
pub mod queue;
pub mod stats;
pub mod store;

// Re-exports
pub use algorithm::{apply_rating, next_box, preview_intervals, review_interval, LEITNER_INTERVALS, MAX_BOX};
pub use error::{CoreError, CoreResult};
pub use library::{Library, LibraryError};
pub use models::{
    Card, CardId, CardStatus, Deck, DeckId, Rating, Schedule, Section, Timestamp, DAY_MS, NEVER,
};
pub use queue::{due_cards, due_count, is_due, next_due};
pub use stats::{box_distribution, deck_stats, DeckStats};
pub use store::{DeckStore, MemoryStore};
