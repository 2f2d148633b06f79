//! The persisted `{book, chapter}` reading pointer.

use crate::library::Library;
use crate::storage::Storage;
use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};

pub const SESSION_KEY: &str = "readalong_session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub book: String,
    #[serde(deserialize_with = "chapter_number")]
    pub chapter: u32,
}

/// Older sessions stored the chapter as a string.
fn chapter_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u32),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl Session {
    pub fn new(book: impl Into<String>, chapter: u32) -> Self {
        Self {
            book: book.into(),
            chapter,
        }
    }

    pub fn load(storage: &dyn Storage) -> Option<Self> {
        let raw = storage.get(SESSION_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Ignoring unreadable session {:?}: {}", raw, e);
                None
            }
        }
    }

    pub fn save(&self, storage: &mut dyn Storage) -> Result<()> {
        let raw = serde_json::to_string(self)?;
        storage.set(SESSION_KEY, &raw)
    }

    /// Whether this session still points at existing data.
    pub fn is_valid_for(&self, library: &Library) -> bool {
        library.contains(&self.book, self.chapter)
    }
}

/// Where to start reading: the saved session when it still resolves, else
/// the first chapter of the first book. `None` only for an empty library.
pub fn starting_position(storage: &dyn Storage, library: &Library) -> Option<(String, u32)> {
    if let Some(session) = Session::load(storage) {
        if session.is_valid_for(library) {
            return Some((session.book, session.chapter));
        }
        debug!(
            "Saved session {} {} no longer exists, starting from the beginning",
            session.book, session.chapter
        );
    }

    let book = library.first_book()?;
    Some((book.name().to_string(), book.first_chapter().unwrap_or(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{Book, Chapter};
    use crate::storage::MemoryStorage;

    fn library(names: &[&str]) -> Library {
        names
            .iter()
            .map(|name| {
                let mut book = Book::new(*name);
                for n in 1..=5 {
                    book.insert_chapter(n, [(1, "v")].into_iter().collect::<Chapter>());
                }
                book
            })
            .collect()
    }

    #[test]
    fn test_round_trip_restores_position() {
        let mut storage = MemoryStorage::new();
        Session::new("Genesis", 3).save(&mut storage).unwrap();

        let library = library(&["Exodus", "Genesis"]);
        assert_eq!(
            starting_position(&storage, &library),
            Some(("Genesis".to_string(), 3))
        );
    }

    #[test]
    fn test_missing_book_falls_back_to_first_book() {
        let mut storage = MemoryStorage::new();
        Session::new("Genesis", 3).save(&mut storage).unwrap();

        let library = library(&["Matthew", "Mark"]);
        assert_eq!(
            starting_position(&storage, &library),
            Some(("Matthew".to_string(), 1))
        );
    }

    #[test]
    fn test_missing_chapter_is_ignored() {
        let mut storage = MemoryStorage::new();
        Session::new("Mark", 40).save(&mut storage).unwrap();

        let library = library(&["Matthew", "Mark"]);
        assert_eq!(
            starting_position(&storage, &library),
            Some(("Matthew".to_string(), 1))
        );
    }

    #[test]
    fn test_string_chapter_is_accepted() {
        let mut storage = MemoryStorage::new();
        storage.set(SESSION_KEY, r#"{"book":"Mark","chapter":"4"}"#).unwrap();
        assert_eq!(Session::load(&storage), Some(Session::new("Mark", 4)));
    }

    #[test]
    fn test_garbage_session_is_ignored() {
        let mut storage = MemoryStorage::new();
        storage.set(SESSION_KEY, "{").unwrap();
        assert_eq!(Session::load(&storage), None);
        assert_eq!(starting_position(&storage, &Library::new()), None);
    }
}
