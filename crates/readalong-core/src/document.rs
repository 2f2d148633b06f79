//! Book layout: one book turned into fixed-width rows with chapter sections.

use crate::library::Book;
use textwrap::Options;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    /// Usable text width in terminal columns.
    pub columns: u16,
    pub line_height: f64,
}

/// A position in the text that survives re-layout. Verse 0 is the heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Anchor {
    pub chapter: u32,
    pub verse: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Spacer,
    Heading {
        chapter: u32,
        title: String,
    },
    Verse {
        chapter: u32,
        verse: u32,
        /// Set on the first row of a verse, where the number is printed.
        first: bool,
        text: String,
    },
    EndMarker {
        title: String,
    },
}

impl Row {
    pub fn anchor(&self) -> Option<Anchor> {
        match self {
            Row::Heading { chapter, .. } => Some(Anchor { chapter: *chapter, verse: 0 }),
            Row::Verse { chapter, verse, .. } => Some(Anchor { chapter: *chapter, verse: *verse }),
            Row::Spacer | Row::EndMarker { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section {
    pub chapter: u32,
    /// Offset of the section's first row, in units.
    pub top: f64,
}

/// The laid-out form of one book. Offsets are final once `render` returns.
#[derive(Debug, Clone)]
pub struct Document {
    book: String,
    rows: Vec<Row>,
    sections: Vec<Section>,
    gutter: usize,
    line_height: f64,
}

impl Document {
    /// Lay out every chapter in ascending order, each as spacer, heading,
    /// spacer, then its verses, followed by an end-of-book marker.
    pub fn render(book: &Book, params: LayoutParams) -> Self {
        let gutter = book
            .chapters()
            .filter_map(|(_, c)| c.last_verse())
            .max()
            .map_or(1, |n| n.to_string().len());
        // Verse number, one space, then text.
        let text_width = (params.columns as usize).saturating_sub(gutter + 1).max(1);
        let options = Options::new(text_width).break_words(true);

        let mut rows = Vec::new();
        let mut sections = Vec::new();

        for (chapter_number, chapter) in book.chapters() {
            sections.push(Section {
                chapter: chapter_number,
                top: rows.len() as f64 * params.line_height,
            });
            rows.push(Row::Spacer);
            rows.push(Row::Heading {
                chapter: chapter_number,
                title: format!("{} {}", book.name(), chapter_number),
            });
            rows.push(Row::Spacer);

            for (verse_number, text) in chapter.verses() {
                let lines = textwrap::wrap(text, &options);
                if lines.is_empty() {
                    rows.push(Row::Verse {
                        chapter: chapter_number,
                        verse: verse_number,
                        first: true,
                        text: String::new(),
                    });
                }
                for (i, line) in lines.into_iter().enumerate() {
                    rows.push(Row::Verse {
                        chapter: chapter_number,
                        verse: verse_number,
                        first: i == 0,
                        text: line.into_owned(),
                    });
                }
            }
        }

        rows.push(Row::Spacer);
        rows.push(Row::Spacer);
        rows.push(Row::EndMarker {
            title: format!("~ end of {} ~", book.name()),
        });
        rows.push(Row::Spacer);
        rows.push(Row::Spacer);

        Self {
            book: book.name().to_string(),
            rows,
            sections,
            gutter,
            line_height: params.line_height,
        }
    }

    pub fn book(&self) -> &str {
        &self.book
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Width of the verse-number column.
    pub fn gutter(&self) -> usize {
        self.gutter
    }

    pub fn line_height(&self) -> f64 {
        self.line_height
    }

    pub fn scroll_height(&self) -> f64 {
        self.rows.len() as f64 * self.line_height
    }

    pub fn section_top(&self, chapter: u32) -> Option<f64> {
        self.sections.iter().find(|s| s.chapter == chapter).map(|s| s.top)
    }

    /// Row index containing `offset`.
    pub fn row_at(&self, offset: f64) -> usize {
        if offset <= 0.0 || self.line_height <= 0.0 {
            return 0;
        }
        ((offset / self.line_height).floor() as usize).min(self.rows.len().saturating_sub(1))
    }

    /// First anchored row at or below `offset`, else the last one above it.
    pub fn anchor_at(&self, offset: f64) -> Option<Anchor> {
        let start = self.row_at(offset);
        self.rows[start..]
            .iter()
            .find_map(Row::anchor)
            .or_else(|| self.rows[..start].iter().rev().find_map(Row::anchor))
    }

    /// Offset of the first row belonging to `anchor`.
    pub fn offset_of(&self, anchor: Anchor) -> Option<f64> {
        self.rows
            .iter()
            .position(|r| r.anchor() == Some(anchor))
            .map(|i| i as f64 * self.line_height)
    }

    /// Chapter of the deepest section whose top is at or above `line`.
    pub fn chapter_above(&self, line: f64) -> Option<u32> {
        deepest_section_above(&self.sections, line).map(|s| s.chapter)
    }

    /// Display width of a row once the verse gutter is added.
    pub fn row_width(&self, row: &Row) -> usize {
        match row {
            Row::Spacer => 0,
            Row::Heading { title, .. } | Row::EndMarker { title } => title.width(),
            Row::Verse { text, .. } => self.gutter + 1 + text.width(),
        }
    }
}

/// Scan sections bottom-up and return the first whose top is at or above
/// `line`.
pub fn deepest_section_above(sections: &[Section], line: f64) -> Option<&Section> {
    sections.iter().rev().find(|s| s.top <= line)
}
