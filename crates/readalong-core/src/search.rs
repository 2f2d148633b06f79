use crate::library::Library;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Keep verses containing at least one term.
    Any,
    /// Keep verses containing every term.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub terms: Vec<String>,
    pub mode: MatchMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    pub score: usize,
}

impl SearchHit {
    pub fn reference(&self) -> String {
        format!("{} {}:{}", self.book, self.chapter, self.verse)
    }
}

fn or_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+OR\s+").expect("static regex"))
}

fn and_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+AND\s+").expect("static regex"))
}

impl Query {
    /// Parse `faith OR love`, `faith AND hope`, or a single phrase.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let (parts, mode): (Vec<&str>, MatchMode) = if or_separator().is_match(input) {
            (or_separator().split(input).collect(), MatchMode::Any)
        } else if and_separator().is_match(input) {
            (and_separator().split(input).collect(), MatchMode::All)
        } else {
            (vec![input], MatchMode::Any)
        };

        let terms = parts
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        Self { terms, mode }
    }

    fn score(&self, text: &str) -> Option<usize> {
        let text = text.to_lowercase();
        let score = self.terms.iter().filter(|t| text.contains(t.as_str())).count();
        let keep = match self.mode {
            MatchMode::Any => score > 0,
            MatchMode::All => score == self.terms.len(),
        };
        keep.then_some(score)
    }
}

impl Library {
    /// Keyword search across every verse. Hits are ordered by score, then by
    /// library position.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let query = Query::parse(query);
        if query.terms.is_empty() {
            return Vec::new();
        }

        // Iteration is already in library order, so a stable sort on score
        // keeps book/chapter/verse order among equal scores.
        let mut hits: Vec<SearchHit> = Vec::new();
        for book in self.books() {
            for (chapter_number, chapter) in book.chapters() {
                for (verse_number, text) in chapter.verses() {
                    if let Some(score) = query.score(text) {
                        hits.push(SearchHit {
                            book: book.name().to_string(),
                            chapter: chapter_number,
                            verse: verse_number,
                            text: text.to_string(),
                            score,
                        });
                    }
                }
            }
        }

        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(limit);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{Book, Chapter};

    fn library() -> Library {
        vec![
            Book::new("John").with_chapter(
                3,
                [(16, "For God so loved the world"), (17, "not to condemn the world")]
                    .into_iter()
                    .collect::<Chapter>(),
            ),
            Book::new("Hebrews").with_chapter(
                11,
                [(1, "Now faith is the substance of things hoped for")]
                    .into_iter()
                    .collect::<Chapter>(),
            ),
            Book::new("1 Corinthians").with_chapter(
                13,
                [(13, "And now abideth faith, hope, charity, but love is the greatest")]
                    .into_iter()
                    .collect::<Chapter>(),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_parse_modes() {
        let q = Query::parse("faith OR love");
        assert_eq!(q.mode, MatchMode::Any);
        assert_eq!(q.terms, vec!["faith", "love"]);

        let q = Query::parse("Faith and Hope");
        assert_eq!(q.mode, MatchMode::All);
        assert_eq!(q.terms, vec!["faith", "hope"]);

        let q = Query::parse("  the world ");
        assert_eq!(q.mode, MatchMode::Any);
        assert_eq!(q.terms, vec!["the world"]);
    }

    #[test]
    fn test_or_search_ranks_by_score() {
        let hits = library().search("faith OR love", 10);
        assert_eq!(hits.len(), 3);
        // Only 1 Corinthians matches both terms.
        assert_eq!(hits[0].reference(), "1 Corinthians 13:13");
        assert_eq!(hits[0].score, 2);
        assert_eq!(hits[1].reference(), "John 3:16");
        assert_eq!(hits[2].reference(), "Hebrews 11:1");
    }

    #[test]
    fn test_and_search_requires_every_term() {
        let hits = library().search("faith AND hope", 10);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.score == 2));
    }

    #[test]
    fn test_limit_and_empty_query() {
        assert_eq!(library().search("world", 1).len(), 1);
        assert!(library().search("   ", 10).is_empty());
    }
}
