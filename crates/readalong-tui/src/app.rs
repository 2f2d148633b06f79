use log::{info, warn};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use readalong_core::{Config, Navigator, SearchHit};
use std::path::PathBuf;
use std::time::{Duration, Instant};

const SEARCH_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Read,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing into the chapter field or the search box, depending on screen.
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Books,
    Content,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub navigator: Navigator,

    /// Set when the library could not be loaded. Navigation is disabled.
    pub load_error: Option<String>,

    // Controls
    pub book_state: ListState,
    pub chapter_input: String,
    synced: Option<(String, u32)>,

    // Search state
    pub search_input: String,
    pub search_results: Vec<SearchHit>,
    pub search_state: ListState,

    // Layout (for mouse hit-testing)
    pub nav_area: Option<Rect>,
    pub content_area: Option<Rect>,

    /// Where speed changes are written back. None disables saving.
    config_path: Option<PathBuf>,
    origin: Instant,
}

impl App {
    pub fn new(navigator: Navigator, config_path: Option<PathBuf>) -> Self {
        let mut app = Self {
            should_quit: false,
            screen: Screen::Read,
            input_mode: InputMode::Normal,
            focus: FocusPane::Content,
            navigator,
            load_error: None,
            book_state: ListState::default(),
            chapter_input: String::new(),
            synced: None,
            search_input: String::new(),
            search_results: Vec::new(),
            search_state: ListState::default(),
            nav_area: None,
            content_area: None,
            config_path,
            origin: Instant::now(),
        };
        app.sync_controls();
        app
    }

    pub fn with_load_error(mut self, message: impl Into<String>) -> Self {
        self.load_error = Some(message.into());
        self
    }

    /// Time since startup, the navigator's clock.
    pub fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    /// The wall-clock instant the navigator next needs to run, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.navigator.next_deadline().map(|d| self.origin + d)
    }

    pub fn run_due(&mut self) {
        let now = self.now();
        self.navigator.run_due(now);
        self.sync_controls();
    }

    /// Point the book list and chapter field at the navigator's position
    /// whenever that position changes. Edits in progress are left alone,
    /// and so is the book list while it has focus.
    pub fn sync_controls(&mut self) {
        let current = match (self.navigator.book(), self.navigator.chapter()) {
            (Some(book), Some(chapter)) => Some((book.to_string(), chapter)),
            _ => None,
        };
        if current == self.synced {
            return;
        }
        if let Some((book, chapter)) = &current {
            if self.focus != FocusPane::Books {
                self.book_state.select(self.navigator.library().position(book));
            }
            let editing_chapter = self.screen == Screen::Read && self.input_mode == InputMode::Editing;
            if !editing_chapter {
                self.chapter_input = chapter.to_string();
            }
        }
        self.synced = current;
    }

    pub fn can_navigate(&self) -> bool {
        self.load_error.is_none() && !self.navigator.library().is_empty()
    }

    // Autoscroll

    pub fn toggle_autoscroll(&mut self) {
        if !self.can_navigate() {
            return;
        }
        let now = self.now();
        self.navigator.toggle(now);
    }

    pub fn stop_autoscroll(&mut self) {
        self.navigator.stop();
    }

    pub fn faster(&mut self) {
        self.navigator.faster();
        self.save_speed();
    }

    pub fn slower(&mut self) {
        self.navigator.slower();
        self.save_speed();
    }

    fn save_speed(&self) {
        let Some(path) = &self.config_path else {
            return;
        };
        if let Err(e) = Config::save_speed(path, self.navigator.speed()) {
            warn!("Failed to save speed: {:#}", e);
        }
    }

    // Loading and jumps

    /// Load the highlighted book at the chapter typed in the chapter field.
    /// An unparseable chapter falls back to 1.
    pub fn load_selected(&mut self) {
        if !self.can_navigate() {
            return;
        }
        let Some(book) = self.selected_book() else {
            return;
        };
        let chapter = self.chapter_input.trim().parse::<u32>().unwrap_or(1);
        info!("Loading {} {}", book, chapter);
        let now = self.now();
        self.navigator.load(&book, chapter, now);
        self.sync_controls();
    }

    pub fn edit_chapter(&mut self) {
        self.input_mode = InputMode::Editing;
        self.chapter_input.clear();
    }

    pub fn submit_chapter(&mut self) {
        self.input_mode = InputMode::Normal;
        self.load_selected();
    }

    pub fn cancel_chapter_edit(&mut self) {
        self.input_mode = InputMode::Normal;
        self.chapter_input = self
            .navigator
            .chapter()
            .map(|c| c.to_string())
            .unwrap_or_default();
    }

    pub fn next_chapter(&mut self) {
        let now = self.now();
        self.navigator.next_chapter(now);
        self.sync_controls();
    }

    pub fn previous_chapter(&mut self) {
        let now = self.now();
        self.navigator.previous_chapter(now);
        self.sync_controls();
    }

    pub fn restart_book(&mut self) {
        let now = self.now();
        self.navigator.restart(now);
        self.sync_controls();
    }

    // Manual scrolling

    pub fn scroll_rows(&mut self, rows: i32) {
        self.navigator.scroll_rows(rows);
        self.sync_controls();
    }

    pub fn scroll_pages(&mut self, pages: f64) {
        self.navigator.scroll_pages(pages);
        self.sync_controls();
    }

    pub fn scroll_to_top(&mut self) {
        self.navigator.scroll_to_top();
        self.sync_controls();
    }

    pub fn scroll_to_bottom(&mut self) {
        self.navigator.scroll_to_bottom();
        self.sync_controls();
    }

    // Book list

    pub fn selected_book(&self) -> Option<String> {
        let i = self.book_state.selected()?;
        self.navigator.library().book_at(i).map(|b| b.name().to_string())
    }

    pub fn nav_down(&mut self) {
        let len = self.navigator.library().len();
        if len > 0 {
            let i = self.book_state.selected().unwrap_or(0);
            self.book_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn nav_up(&mut self) {
        let i = self.book_state.selected().unwrap_or(0);
        self.book_state.select(Some(i.saturating_sub(1)));
    }

    pub fn nav_first(&mut self) {
        if !self.navigator.library().is_empty() {
            self.book_state.select(Some(0));
        }
    }

    pub fn nav_last(&mut self) {
        let len = self.navigator.library().len();
        if len > 0 {
            self.book_state.select(Some(len - 1));
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Books => FocusPane::Content,
            FocusPane::Content => FocusPane::Books,
        };
    }

    // Search

    pub fn open_search(&mut self) {
        self.screen = Screen::Search;
        self.input_mode = InputMode::Editing;
    }

    pub fn close_search(&mut self) {
        self.screen = Screen::Read;
        self.input_mode = InputMode::Normal;
        self.search_input.clear();
        self.search_results.clear();
        self.search_state.select(None);
    }

    pub fn perform_search(&mut self) {
        if self.search_input.trim().is_empty() {
            return;
        }
        self.search_results = self.navigator.library().search(&self.search_input, SEARCH_LIMIT);
        info!("Search {:?} found {} verses", self.search_input, self.search_results.len());
        self.search_state
            .select(if self.search_results.is_empty() { None } else { Some(0) });
    }

    pub fn search_nav_down(&mut self) {
        let len = self.search_results.len();
        if len > 0 {
            let i = self.search_state.selected().unwrap_or(0);
            self.search_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn search_nav_up(&mut self) {
        let i = self.search_state.selected().unwrap_or(0);
        self.search_state.select(Some(i.saturating_sub(1)));
    }

    pub fn selected_hit(&self) -> Option<&SearchHit> {
        self.search_state.selected().and_then(|i| self.search_results.get(i))
    }

    /// Load the chapter of the highlighted hit and go back to reading.
    pub fn open_selected_hit(&mut self) {
        let Some((book, chapter)) = self.selected_hit().map(|h| (h.book.clone(), h.chapter)) else {
            return;
        };
        let now = self.now();
        self.navigator.load(&book, chapter, now);
        self.close_search();
        self.focus = FocusPane::Content;
        self.sync_controls();
    }

    // Title helpers

    pub fn content_title(&self) -> String {
        match (self.navigator.book(), self.navigator.chapter()) {
            (Some(book), Some(chapter)) => format!("{} {}", book, chapter),
            (Some(book), None) => book.to_string(),
            _ => "Read Along".to_string(),
        }
    }
}
