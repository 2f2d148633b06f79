use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// One chapter: verse number -> verse text, iterated in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chapter {
    verses: BTreeMap<u32, String>,
}

impl Chapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, number: u32, text: impl Into<String>) {
        self.verses.insert(number, text.into());
    }

    pub fn verse(&self, number: u32) -> Option<&str> {
        self.verses.get(&number).map(String::as_str)
    }

    pub fn verses(&self) -> impl Iterator<Item = (u32, &str)> {
        self.verses.iter().map(|(n, t)| (*n, t.as_str()))
    }

    pub fn last_verse(&self) -> Option<u32> {
        self.verses.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(u32, S)> for Chapter {
    fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
        Self {
            verses: iter.into_iter().map(|(n, t)| (n, t.into())).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    name: String,
    chapters: BTreeMap<u32, Chapter>,
}

impl Book {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chapters: BTreeMap::new(),
        }
    }

    pub fn with_chapter(mut self, number: u32, chapter: Chapter) -> Self {
        self.insert_chapter(number, chapter);
        self
    }

    pub fn insert_chapter(&mut self, number: u32, chapter: Chapter) {
        self.chapters.insert(number, chapter);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chapter(&self, number: u32) -> Option<&Chapter> {
        self.chapters.get(&number)
    }

    pub fn contains(&self, number: u32) -> bool {
        self.chapters.contains_key(&number)
    }

    /// Chapters in ascending numeric order.
    pub fn chapters(&self) -> impl Iterator<Item = (u32, &Chapter)> {
        self.chapters.iter().map(|(n, c)| (*n, c))
    }

    pub fn chapter_numbers(&self) -> Vec<u32> {
        self.chapters.keys().copied().collect()
    }

    pub fn first_chapter(&self) -> Option<u32> {
        self.chapters.keys().next().copied()
    }

    pub fn next_chapter(&self, after: u32) -> Option<u32> {
        self.chapters.range(after.saturating_add(1)..).next().map(|(n, _)| *n)
    }

    pub fn previous_chapter(&self, before: u32) -> Option<u32> {
        self.chapters.range(..before).next_back().map(|(n, _)| *n)
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }
}

/// The full scripture dataset. Books keep the order they had in the source
/// document; that order drives "next book" during read-along.
#[derive(Debug, Clone, Default)]
pub struct Library {
    books: Vec<Book>,
    index: HashMap<String, usize>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a book. A second book with an existing name replaces the first
    /// in place, so the original position is kept.
    pub fn push_book(&mut self, book: Book) {
        match self.index.get(book.name()) {
            Some(&i) => self.books[i] = book,
            None => {
                self.index.insert(book.name().to_string(), self.books.len());
                self.books.push(book);
            }
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ParseError> {
        let document: RawDocument = serde_json::from_str(json).map_err(ParseError::Json)?;
        document.into_library()
    }

    pub fn book(&self, name: &str) -> Option<&Book> {
        self.index.get(name).map(|&i| &self.books[i])
    }

    pub fn book_at(&self, position: usize) -> Option<&Book> {
        self.books.get(position)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn book_names(&self) -> Vec<String> {
        self.books.iter().map(|b| b.name.clone()).collect()
    }

    pub fn first_book(&self) -> Option<&Book> {
        self.books.first()
    }

    /// The book after `name` in library order.
    pub fn next_book(&self, name: &str) -> Option<&Book> {
        self.position(name).and_then(|i| self.books.get(i + 1))
    }

    pub fn contains(&self, book: &str, chapter: u32) -> bool {
        self.book(book).is_some_and(|b| b.contains(chapter))
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn verse_count(&self) -> usize {
        self.books
            .iter()
            .flat_map(|b| b.chapters.values())
            .map(Chapter::len)
            .sum()
    }
}

impl FromIterator<Book> for Library {
    fn from_iter<I: IntoIterator<Item = Book>>(iter: I) -> Self {
        let mut library = Library::new();
        for book in iter {
            library.push_book(book);
        }
        library
    }
}

#[derive(Debug)]
pub enum ParseError {
    Json(serde_json::Error),
    InvalidNumber { book: String, key: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Json(e) => write!(f, "malformed library document: {e}"),
            ParseError::InvalidNumber { book, key } => {
                write!(f, "book {book:?} has an invalid chapter or verse number {key:?}")
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Json(e) => Some(e),
            ParseError::InvalidNumber { .. } => None,
        }
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Deserialize)]
struct RawDocument {
    books: RawBooks,
}

/// `{"books": {"Name": {...}}}` from the bundled dataset, or the list form
/// written by the conversion tool.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBooks {
    Keyed(OrderedBooks),
    Listed(Vec<ListedBook>),
}

#[derive(Deserialize)]
struct KeyedBook {
    #[serde(default)]
    chapters: HashMap<String, HashMap<String, String>>,
}

#[derive(Deserialize)]
struct ListedBook {
    name: String,
    #[serde(default)]
    chapters: Vec<ListedChapter>,
}

#[derive(Deserialize)]
struct ListedChapter {
    chapter: u32,
    #[serde(default)]
    verses: Vec<String>,
}

/// JSON object of books with document order preserved.
struct OrderedBooks(Vec<(String, KeyedBook)>);

impl<'de> Deserialize<'de> for OrderedBooks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = OrderedBooks;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of book names to books")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut books = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, book)) = map.next_entry::<String, KeyedBook>()? {
                    books.push((name, book));
                }
                Ok(OrderedBooks(books))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

fn parse_number(book: &str, key: &str) -> Result<u32, ParseError> {
    match key.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ParseError::InvalidNumber {
            book: book.to_string(),
            key: key.to_string(),
        }),
    }
}

impl RawDocument {
    fn into_library(self) -> Result<Library, ParseError> {
        let mut library = Library::new();
        match self.books {
            RawBooks::Keyed(OrderedBooks(books)) => {
                for (name, raw) in books {
                    let mut book = Book::new(name.as_str());
                    for (chapter_key, verses) in raw.chapters {
                        let chapter_number = parse_number(&name, &chapter_key)?;
                        let mut chapter = Chapter::new();
                        for (verse_key, text) in verses {
                            chapter.insert(parse_number(&name, &verse_key)?, text);
                        }
                        book.insert_chapter(chapter_number, chapter);
                    }
                    library.push_book(book);
                }
            }
            RawBooks::Listed(books) => {
                for raw in books {
                    let mut book = Book::new(raw.name.as_str());
                    for listed in raw.chapters {
                        if listed.chapter == 0 {
                            return Err(ParseError::InvalidNumber {
                                book: raw.name.clone(),
                                key: "0".to_string(),
                            });
                        }
                        let chapter = (1u32..).zip(listed.verses).collect();
                        book.insert_chapter(listed.chapter, chapter);
                    }
                    library.push_book(book);
                }
            }
        }
        Ok(library)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYED: &str = r#"{
        "books": {
            "Genesis": {"chapters": {"10": {"1": "g10"}, "2": {"2": "b", "1": "a"}, "1": {"1": "g1"}}},
            "Exodus": {"chapters": {"1": {"1": "e1"}}},
            "Aardvark": {"chapters": {}}
        }
    }"#;

    #[test]
    fn test_keyed_document_keeps_book_order() {
        let library = Library::from_json_str(KEYED).unwrap();
        assert_eq!(library.book_names(), vec!["Genesis", "Exodus", "Aardvark"]);
    }

    #[test]
    fn test_chapters_and_verses_sort_numerically() {
        let library = Library::from_json_str(KEYED).unwrap();
        let genesis = library.book("Genesis").unwrap();
        assert_eq!(genesis.chapter_numbers(), vec![1, 2, 10]);
        let verses: Vec<_> = genesis.chapter(2).unwrap().verses().collect();
        assert_eq!(verses, vec![(1, "a"), (2, "b")]);
    }

    #[test]
    fn test_listed_document() {
        let json = r#"{"books": [
            {"name": "Ruth", "abbr": "", "chapters": [{"chapter": 1, "verses": ["one", "two"]}]},
            {"name": "Esther", "chapters": []}
        ]}"#;
        let library = Library::from_json_str(json).unwrap();
        assert_eq!(library.book_names(), vec!["Ruth", "Esther"]);
        assert_eq!(library.book("Ruth").unwrap().chapter(1).unwrap().verse(2), Some("two"));
        assert_eq!(library.book("Esther").unwrap().chapter_count(), 0);
    }

    #[test]
    fn test_invalid_chapter_key_is_rejected() {
        let json = r#"{"books": {"Jonah": {"chapters": {"one": {"1": "x"}}}}}"#;
        match Library::from_json_str(json) {
            Err(ParseError::InvalidNumber { book, key }) => {
                assert_eq!(book, "Jonah");
                assert_eq!(key, "one");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_zero_verse_key_is_rejected() {
        let json = r#"{"books": {"Jonah": {"chapters": {"1": {"0": "x"}}}}}"#;
        assert!(Library::from_json_str(json).is_err());
    }

    #[test]
    fn test_navigation_helpers() {
        let library = Library::from_json_str(KEYED).unwrap();
        assert_eq!(library.next_book("Genesis").unwrap().name(), "Exodus");
        assert!(library.next_book("Aardvark").is_none());
        assert!(library.next_book("Missing").is_none());

        let genesis = library.book("Genesis").unwrap();
        assert_eq!(genesis.next_chapter(2), Some(10));
        assert_eq!(genesis.next_chapter(10), None);
        assert_eq!(genesis.previous_chapter(10), Some(2));
        assert_eq!(genesis.previous_chapter(1), None);
        assert!(library.contains("Exodus", 1));
        assert!(!library.contains("Exodus", 2));
        assert_eq!(library.verse_count(), 5);
    }

    #[test]
    fn test_duplicate_book_replaces_in_place() {
        let library: Library = vec![
            Book::new("A"),
            Book::new("B"),
            Book::new("A").with_chapter(1, Chapter::new()),
        ]
        .into_iter()
        .collect();
        assert_eq!(library.book_names(), vec!["A", "B"]);
        assert!(library.contains("A", 1));
    }
}
