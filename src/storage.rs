use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::card::Card;

/// A player's stored state.
///
/// `deck` and `hand` are `None` when the stored record lacks them, and stay absent on write.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct PlayerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck: Option<Vec<Card>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<Card>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PlayerRecord {
    pub fn new(deck: Vec<Card>) -> Self {
        Self {
            deck: Some(deck),
            hand: Some(Vec::new()),
            extra: serde_json::Map::new(),
        }
    }
}

/// Every player's record, keyed by lowercased username.
pub type PlayerDocument = BTreeMap<String, PlayerRecord>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Player {0} does not exist")]
    NotFound(String),
    #[error("Player document {path:?} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Player document {path:?} holds unexpected data: {source}")]
    Invalid {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Error accessing player document {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Error encoding player document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable home of the player document.
///
/// `load` returns an empty document when nothing has been stored yet,
/// [`StoreError::Corrupt`] when the stored text is not JSON at all and
/// [`StoreError::Invalid`] when it is JSON of the wrong shape.
pub trait DocumentStore {
    fn load(&self) -> Result<PlayerDocument, StoreError>;
    fn save(&self, players: &PlayerDocument) -> Result<(), StoreError>;
}

/// Parses stored text. Blank text is an empty document.
pub fn parse_document(path: &Path, content: &str) -> Result<PlayerDocument, StoreError> {
    if content.trim().is_empty() {
        return Ok(PlayerDocument::new());
    }

    serde_json::from_str(content).map_err(|source| {
        let path = path.to_path_buf();
        match source.classify() {
            Category::Data => StoreError::Invalid { path, source },
            _ => StoreError::Corrupt { path, source },
        }
    })
}

/// Keeps the document as a single pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self) -> Result<PlayerDocument, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("{:?} does not exist yet, starting empty", self.path);
                return Ok(PlayerDocument::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        parse_document(&self.path, &content)
    }

    fn save(&self, players: &PlayerDocument) -> Result<(), StoreError> {
        let mut file = NamedTempFile::new_in(self.directory()).map_err(|e| self.io_error(e))?;

        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut file, formatter);
        players.serialize(&mut serializer)?;

        file.flush().map_err(|e| self.io_error(e))?;
        file.as_file().sync_all().map_err(|e| self.io_error(e))?;
        file.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        log::trace!("Wrote {} players to {:?}", players.len(), self.path);
        Ok(())
    }
}
