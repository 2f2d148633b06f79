use crate::document::{Document, LayoutParams};

/// The scroll container: the rendered document plus where it is scrolled to.
///
/// Offsets behave like a browser's `scrollTop`: writes are clamped to
/// `0..=scroll_height - client_height`, reads return the clamped value.
#[derive(Debug, Clone)]
pub struct Viewport {
    document: Option<Document>,
    scroll_top: f64,
    columns: u16,
    rows: u16,
    line_height: f64,
}

impl Viewport {
    pub fn new(columns: u16, rows: u16, line_height: f64) -> Self {
        Self {
            document: None,
            scroll_top: 0.0,
            columns,
            rows,
            line_height,
        }
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Swap in a freshly rendered document. Like replacing a container's
    /// contents, this resets the offset to the top.
    pub fn replace_document(&mut self, document: Document) {
        self.document = Some(document);
        self.scroll_top = 0.0;
    }

    pub fn layout_params(&self) -> LayoutParams {
        LayoutParams {
            columns: self.columns,
            line_height: self.line_height,
        }
    }

    pub fn columns(&self) -> u16 {
        self.columns
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn line_height(&self) -> f64 {
        self.line_height
    }

    /// Returns true when the width changed, meaning the document must be
    /// laid out again.
    pub fn resize(&mut self, columns: u16, rows: u16) -> bool {
        let width_changed = columns != self.columns;
        self.columns = columns;
        self.rows = rows;
        self.scroll_top = self.clamp(self.scroll_top);
        width_changed
    }

    pub fn client_height(&self) -> f64 {
        f64::from(self.rows) * self.line_height
    }

    pub fn scroll_height(&self) -> f64 {
        self.document.as_ref().map_or(0.0, Document::scroll_height)
    }

    pub fn max_scroll(&self) -> f64 {
        (self.scroll_height() - self.client_height()).max(0.0)
    }

    pub fn clamp(&self, offset: f64) -> f64 {
        if offset.is_nan() {
            return 0.0;
        }
        offset.clamp(0.0, self.max_scroll())
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn set_scroll_top(&mut self, offset: f64) {
        self.scroll_top = self.clamp(offset);
    }

    pub fn scroll_by(&mut self, delta: f64) {
        self.set_scroll_top(self.scroll_top + delta);
    }

    /// Whether the bottom edge is within `tolerance` of the content end.
    pub fn at_end(&self, tolerance: f64) -> bool {
        self.document.is_some()
            && self.scroll_top + self.client_height() >= self.scroll_height() - tolerance
    }

    /// First document row drawn at the top of the viewport.
    pub fn first_visible_row(&self) -> usize {
        self.document
            .as_ref()
            .map_or(0, |d| d.row_at(self.scroll_top))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{Book, Chapter};

    fn viewport_with_rows(verses: u32) -> Viewport {
        let chapter: Chapter = (1..=verses).map(|n| (n, "text")).collect();
        let book = Book::new("Test").with_chapter(1, chapter);
        let mut viewport = Viewport::new(40, 10, 24.0);
        let doc = Document::render(&book, viewport.layout_params());
        viewport.replace_document(doc);
        viewport
    }

    #[test]
    fn test_offsets_clamp_like_scroll_top() {
        let mut viewport = viewport_with_rows(50);
        let max = viewport.max_scroll();
        assert!(max > 0.0);

        viewport.set_scroll_top(-30.0);
        assert_eq!(viewport.scroll_top(), 0.0);
        viewport.set_scroll_top(max + 500.0);
        assert_eq!(viewport.scroll_top(), max);
        assert!(viewport.at_end(5.0));

        viewport.scroll_by(-48.0);
        assert_eq!(viewport.scroll_top(), max - 48.0);
        assert!(!viewport.at_end(5.0));
    }

    #[test]
    fn test_short_document_cannot_scroll() {
        let mut viewport = viewport_with_rows(1);
        viewport.set_scroll_top(100.0);
        assert_eq!(viewport.scroll_top(), 0.0);
        assert!(viewport.at_end(5.0));
    }

    #[test]
    fn test_empty_viewport_is_never_at_end() {
        let viewport = Viewport::new(40, 10, 24.0);
        assert!(!viewport.at_end(5.0));
        assert_eq!(viewport.max_scroll(), 0.0);
    }

    #[test]
    fn test_replace_document_resets_offset() {
        let mut viewport = viewport_with_rows(50);
        viewport.set_scroll_top(240.0);
        assert_eq!(viewport.first_visible_row(), 10);
        let doc = viewport.document().unwrap().clone();
        viewport.replace_document(doc);
        assert_eq!(viewport.scroll_top(), 0.0);
    }

    #[test]
    fn test_resize_reports_width_change_and_reclamps() {
        let mut viewport = viewport_with_rows(50);
        viewport.set_scroll_top(viewport.max_scroll());
        assert!(!viewport.resize(40, 20));
        assert_eq!(viewport.scroll_top(), viewport.max_scroll());
        assert!(viewport.resize(60, 20));
    }
}
