//! SQLite deck storage.

use leitner_core::{Card, CardStatus, Deck, DeckId, DeckStore, Schedule, Section};
use rusqlite::{params, Connection, Result as SqlResult};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

pub type DbResult<T> = Result<T, DbError>;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    pub fn in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> DbResult<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS decks (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                deck_id TEXT NOT NULL REFERENCES decks(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                sections TEXT NOT NULL,
                status TEXT NOT NULL,
                box INTEGER NOT NULL,
                last_reviewed INTEGER NOT NULL,
                next_review INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck_id, position);
            "#,
        )?;
        Ok(())
    }

    fn load_cards(&self, deck_id: DeckId) -> DbResult<Vec<Card>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM cards WHERE deck_id = ?1 ORDER BY position")?;
        let rows = stmt
            .query_map(params![deck_id.to_string()], |row| parse_card_row(row))?
            .collect::<SqlResult<Vec<_>>>()?;
        rows.into_iter().map(CardRow::into_card).collect()
    }

    fn load_deck(&self, row: DeckRow) -> DbResult<Deck> {
        let id = parse_id(&row.id)?;
        let cards = self.load_cards(id)?;
        Ok(Deck::restore(id, row.name, row.description, cards, row.created_at, row.updated_at))
    }
}

impl DeckStore for Database {
    type Error = DbError;

    fn get_deck(&self, id: DeckId) -> DbResult<Option<Deck>> {
        let mut stmt = self.conn.prepare("SELECT * FROM decks WHERE id = ?1")?;
        let row = stmt.query_row(params![id.to_string()], |row| parse_deck_row(row));

        match row {
            Ok(r) => Ok(Some(self.load_deck(r)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_deck(&mut self, deck: &Deck) -> DbResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO decks (id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name, description = excluded.description,
                updated_at = excluded.updated_at",
            params![
                deck.id.to_string(),
                deck.name,
                deck.description,
                deck.created_at,
                deck.updated_at(),
            ],
        )?;
        tx.execute("DELETE FROM cards WHERE deck_id = ?1", params![deck.id.to_string()])?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO cards (id, deck_id, position, sections, status, box,
                                    last_reviewed, next_review, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for (position, card) in deck.cards().iter().enumerate() {
                let schedule = card.schedule();
                insert.execute(params![
                    card.id.to_string(),
                    card.deck_id.to_string(),
                    position as i64,
                    serde_json::to_string(card.sections())?,
                    schedule.status.as_str(),
                    i64::from(schedule.leitner_box),
                    schedule.last_reviewed,
                    schedule.next_review,
                    card.created_at,
                    card.updated_at(),
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!(deck = %deck.id, cards = deck.len(), "saved deck");
        Ok(())
    }

    fn list_decks(&self) -> DbResult<Vec<Deck>> {
        let mut stmt = self.conn.prepare("SELECT * FROM decks ORDER BY created_at, rowid")?;
        let rows = stmt
            .query_map([], |row| parse_deck_row(row))?
            .collect::<SqlResult<Vec<_>>>()?;
        rows.into_iter().map(|r| self.load_deck(r)).collect()
    }

    fn delete_deck(&mut self, id: DeckId) -> DbResult<bool> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM cards WHERE deck_id = ?1", params![id.to_string()])?;
        let deleted = tx.execute("DELETE FROM decks WHERE id = ?1", params![id.to_string()])?;
        tx.commit()?;
        Ok(deleted > 0)
    }
}

struct DeckRow {
    id: String,
    name: String,
    description: String,
    created_at: i64,
    updated_at: i64,
}

struct CardRow {
    id: String,
    deck_id: String,
    sections: String,
    status: String,
    leitner_box: i64,
    last_reviewed: i64,
    next_review: i64,
    created_at: i64,
    updated_at: i64,
}

impl CardRow {
    fn into_card(self) -> DbResult<Card> {
        let sections: Vec<Section> = serde_json::from_str(&self.sections)?;
        let status = CardStatus::parse(&self.status)
            .ok_or_else(|| DbError::InvalidRecord(format!("unknown status '{}'", self.status)))?;
        let schedule = Schedule::from_raw(status, self.leitner_box, self.last_reviewed, self.next_review);

        Card::restore(
            parse_id(&self.id)?,
            parse_id(&self.deck_id)?,
            sections,
            schedule,
            self.created_at,
            self.updated_at,
        )
        .map_err(|e| DbError::InvalidRecord(format!("card {}: {e}", self.id)))
    }
}

fn parse_id(s: &str) -> DbResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DbError::InvalidRecord(format!("bad id '{s}': {e}")))
}

fn parse_deck_row(row: &rusqlite::Row) -> SqlResult<DeckRow> {
    Ok(DeckRow {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_card_row(row: &rusqlite::Row) -> SqlResult<CardRow> {
    Ok(CardRow {
        id: row.get("id")?,
        deck_id: row.get("deck_id")?,
        sections: row.get("sections")?,
        status: row.get("status")?,
        leitner_box: row.get("box")?,
        last_reviewed: row.get("last_reviewed")?,
        next_review: row.get("next_review")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
