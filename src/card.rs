use std::fs::File;
use std::io::{BufReader, Read};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// A single card as it sits in a deck or hand.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Card {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Kept as a raw JSON number so integer and fractional costs survive a save untouched.
    pub cost: serde_json::Number,
    /// Anything else stored on the card, written back untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A card template from the catalog, along with how many copies go into every fresh deck.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct CatalogEntry {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub cost: serde_json::Number,
    pub count: usize,
}

impl CatalogEntry {
    pub fn card(&self) -> Card {
        Card {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            cost: self.cost.clone(),
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let entries: Vec<CatalogEntry> =
            serde_json::from_reader(reader).context("error deserializing card catalog")?;
        Ok(Self::new(entries))
    }

    pub fn from_json_file<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Debug,
    {
        let file = File::open(&path).with_context(|| format!("error opening file {:?}", path))?;
        let reader = BufReader::new(file);
        Self::from_reader(reader).with_context(|| format!("error loading catalog {:?}", path))
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Number of cards in a freshly built deck.
    pub fn deck_size(&self) -> usize {
        self.entries.iter().map(|entry| entry.count).sum()
    }

    /// Builds a full deck: each entry's copies in catalog order, without the `count` field.
    pub fn build_deck(&self) -> Vec<Card> {
        let mut deck = Vec::with_capacity(self.deck_size());
        for entry in &self.entries {
            let card = entry.card();
            deck.extend(std::iter::repeat(card).take(entry.count));
        }
        deck
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn entry(id: i64, count: usize) -> CatalogEntry {
        CatalogEntry {
            id,
            title: format!("Card {}", id),
            description: format!("Does thing number {}", id),
            cost: serde_json::Number::from(id * 10),
            count,
        }
    }

    /// Two copies of card 1 and one of card 2.
    pub fn small_catalog() -> Catalog {
        Catalog::new(vec![entry(1, 2), entry(2, 1)])
    }

    #[test]
    fn builds_copies_in_catalog_order() {
        let deck = small_catalog().build_deck();
        let ids: Vec<i64> = deck.iter().map(|card| card.id).collect();
        assert_eq!(ids, vec![1, 1, 2]);
        assert_eq!(small_catalog().deck_size(), 3);
    }

    #[test]
    fn zero_count_entries_are_skipped() {
        let catalog = Catalog::new(vec![entry(1, 0), entry(2, 3)]);
        assert_eq!(catalog.build_deck().len(), 3);
        assert!(catalog.build_deck().iter().all(|card| card.id == 2));
    }

    #[test]
    fn parses_catalog_and_drops_count() {
        let input = r#"[
            {"id": 7, "title": "Curse", "description": "Stay put", "cost": 2, "count": 2},
            {"id": 8, "title": "Veto", "description": "Skip a question", "cost": 1.5, "count": 1}
        ]"#;
        let catalog = Catalog::from_reader(input.as_bytes()).unwrap();
        assert_eq!(catalog.deck_size(), 3);

        let deck = serde_json::to_value(catalog.build_deck()).unwrap();
        assert_eq!(
            deck[0],
            serde_json::json!({"id": 7, "title": "Curse", "description": "Stay put", "cost": 2})
        );
        assert_eq!(deck[2]["cost"], serde_json::json!(1.5));
        assert!(deck[0].get("count").is_none());
    }

    #[test]
    fn rejects_malformed_catalog() {
        let input = r#"[{"id": "seven", "title": "Curse"}]"#;
        assert!(Catalog::from_reader(input.as_bytes()).is_err());
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Catalog::from_json_file(dir.path().join("cards.json"));
        assert!(result.is_err());
    }
}
