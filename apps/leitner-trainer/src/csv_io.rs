//! CSV import and export.
//!
//! Column layout: `front` is section 0, `back` the next one, then
//! `section1`, `section2`, ... in numeric order.

use leitner_core::{CoreError, Deck, Section, Timestamp};
use std::io::{Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing 'front' column")]
    MissingFrontColumn,
    #[error(transparent)]
    Card(#[from] CoreError),
}

pub type CsvResult<T> = Result<T, CsvError>;

/// Column positions for the section fields of one file.
struct ColumnMap {
    front: usize,
    back: Option<usize>,
    /// (N, column) for every `sectionN` header, sorted by N.
    extra: Vec<(u32, usize)>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> CsvResult<Self> {
        let mut front = None;
        let mut back = None;
        let mut extra = Vec::new();

        for (i, header) in headers.iter().enumerate() {
            let header = header.trim();
            match header {
                "front" => front = Some(i),
                "back" => back = Some(i),
                _ => {
                    if let Some(n) = header.strip_prefix("section").and_then(|n| n.parse::<u32>().ok()) {
                        if n >= 1 {
                            extra.push((n, i));
                        }
                    }
                }
            }
        }
        extra.sort_by_key(|&(n, _)| n);

        Ok(Self {
            front: front.ok_or(CsvError::MissingFrontColumn)?,
            back,
            extra,
        })
    }

    fn sections(&self, record: &csv::StringRecord) -> Option<Vec<Section>> {
        let front = record.get(self.front).filter(|s| !s.is_empty())?;

        let mut sections = vec![Section::new(front)];
        let rest = self.back.into_iter().chain(self.extra.iter().map(|&(_, col)| col));
        for col in rest {
            if let Some(content) = record.get(col).filter(|s| !s.is_empty()) {
                sections.push(Section::new(content));
            }
        }
        Some(sections)
    }
}

/// Build a new deck from CSV rows. Rows with no `front` are skipped.
pub fn import_deck<R: Read>(reader: R, name: &str, description: &str, now: Timestamp) -> CsvResult<Deck> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns = ColumnMap::from_headers(reader.headers()?)?;
    let mut deck = Deck::new(name, description, now);
    let mut skipped = 0usize;

    for (row, result) in reader.records().enumerate() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        match columns.sections(&record) {
            Some(sections) => {
                deck.add_card(sections, now)?;
            }
            None => {
                skipped += 1;
                tracing::warn!(row = row + 2, "skipping CSV row without a front");
            }
        }
    }

    tracing::info!(deck = %deck.id, cards = deck.len(), skipped, "imported deck from CSV");
    Ok(deck)
}

/// Header row for a deck: wide enough for its largest card.
fn export_headers(deck: &Deck) -> Vec<String> {
    let widest = deck.cards().iter().map(|c| c.sections().len()).max().unwrap_or(0).max(2);
    (0..widest).map(column_name).collect()
}

fn column_name(index: usize) -> String {
    match index {
        0 => "front".to_string(),
        1 => "back".to_string(),
        n => format!("section{}", n - 1),
    }
}

/// Write a deck's cards as CSV, one row per card.
pub fn export_deck<W: Write>(deck: &Deck, writer: W) -> CsvResult<()> {
    let headers = export_headers(deck);
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(&headers)?;

    for card in deck.cards() {
        let row = (0..headers.len()).map(|i| card.sections().get(i).map_or("", |s| s.content.as_str()));
        writer.write_record(row)?;
    }

    writer.flush()?;
    tracing::info!(deck = %deck.id, cards = deck.len(), "exported deck to CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leitner_core::CardStatus;

    fn contents(deck: &Deck) -> Vec<Vec<String>> {
        deck.cards()
            .iter()
            .map(|c| c.sections().iter().map(|s| s.content.clone()).collect())
            .collect()
    }

    #[test]
    fn test_import_maps_columns_to_sections() {
        let data = "front,back,section1,section2\nQ1,A1,extra1,extra2\nQ2,A2,,\n";
        let deck = import_deck(data.as_bytes(), "Imported", "From CSV", 500).unwrap();

        assert_eq!(deck.name, "Imported");
        assert_eq!(
            contents(&deck),
            vec![vec!["Q1", "A1", "extra1", "extra2"], vec!["Q2", "A2"]]
        );
        assert!(deck.cards().iter().all(|c| c.status() == CardStatus::New && c.next_review() == 500));
    }

    #[test]
    fn test_import_skips_rows_without_front() {
        let data = "front,back\n,orphan\nQ,A\n\n";
        let deck = import_deck(data.as_bytes(), "D", "", 0).unwrap();
        assert_eq!(contents(&deck), vec![vec!["Q", "A"]]);
    }

    #[test]
    fn test_import_orders_sections_numerically() {
        let data = "section10,front,section2,back\nten,Q,two,A\n";
        let deck = import_deck(data.as_bytes(), "D", "", 0).unwrap();
        assert_eq!(contents(&deck), vec![vec!["Q", "A", "two", "ten"]]);
    }

    #[test]
    fn test_import_front_only() {
        let data = "front\nlonely\n";
        let deck = import_deck(data.as_bytes(), "D", "", 0).unwrap();
        assert_eq!(contents(&deck), vec![vec!["lonely"]]);
    }

    #[test]
    fn test_import_requires_front_column() {
        let data = "question,answer\nQ,A\n";
        let result = import_deck(data.as_bytes(), "D", "", 0);
        assert!(matches!(result, Err(CsvError::MissingFrontColumn)));
    }

    #[test]
    fn test_export_layout() {
        let mut deck = Deck::new("D", "", 0);
        deck.add_card(vec!["Q1".into(), "A1".into()], 0).unwrap();
        deck.add_card(vec!["Q2".into(), "A2".into(), "more, with comma".into()], 0).unwrap();

        let mut out = Vec::new();
        export_deck(&deck, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "front,back,section1\nQ1,A1,\nQ2,A2,\"more, with comma\"\n");
    }

    #[test]
    fn test_export_then_import_keeps_content() {
        let mut deck = Deck::new("D", "", 0);
        deck.add_card(vec!["one".into()], 0).unwrap();
        deck.add_card(vec!["two".into(), "2".into(), "II".into()], 0).unwrap();

        let file = tempfile::NamedTempFile::new().unwrap();
        export_deck(&deck, file.reopen().unwrap()).unwrap();
        let imported = import_deck(file.reopen().unwrap(), "copy", "", 0).unwrap();
        assert_eq!(contents(&imported), contents(&deck));
    }
}
