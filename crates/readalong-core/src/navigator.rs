//! Reading position, jumps, and the autoscroll loop.
//!
//! The navigator owns every piece of mutable reading state. Front-ends call
//! its methods from input handlers and hand it control whenever
//! [`Navigator::next_deadline`] passes, via [`Navigator::run_due`]. Nothing
//! here blocks or sleeps.

use crate::document::Document;
use crate::library::{Book, Library};
use crate::schedule::{TaskId, TaskKind, TaskQueue};
use crate::session::{self, Session};
use crate::settings::{self, NavigatorSettings};
use crate::storage::Storage;
use crate::viewport::Viewport;
use log::{debug, info, warn};
use std::time::Duration;

const DEFAULT_COLUMNS: u16 = 80;
const DEFAULT_ROWS: u16 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpMode {
    /// Set the offset directly. Used right after a render.
    Instant,
    /// Ease toward the target over a few frames.
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    Idle,
    Running,
}

#[derive(Debug)]
struct PendingAdvance {
    task: TaskId,
    book: String,
}

/// State of one running autoscroll loop.
#[derive(Debug)]
struct Autoscroll {
    frame: TaskId,
    last_tick: Duration,
    tracked: f64,
    last_scan: Option<Duration>,
    advance: Option<PendingAdvance>,
}

#[derive(Debug)]
struct Animation {
    frame: TaskId,
    from: f64,
    to: f64,
    started: Duration,
}

pub struct Navigator {
    library: Library,
    settings: NavigatorSettings,
    viewport: Viewport,
    storage: Box<dyn Storage>,
    tasks: TaskQueue,
    book: Option<String>,
    chapter: Option<u32>,
    speed: f64,
    autoscroll: Option<Autoscroll>,
    animation: Option<Animation>,
}

impl Navigator {
    pub fn new(library: Library, settings: NavigatorSettings, storage: Box<dyn Storage>) -> Self {
        let viewport = Viewport::new(DEFAULT_COLUMNS, DEFAULT_ROWS, settings.line_height);
        Self {
            library,
            settings,
            viewport,
            storage,
            tasks: TaskQueue::new(),
            book: None,
            chapter: None,
            speed: settings::DEFAULT_SPEED,
            autoscroll: None,
            animation: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn settings(&self) -> &NavigatorSettings {
        &self.settings
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn document(&self) -> Option<&Document> {
        self.viewport.document()
    }

    pub fn book(&self) -> Option<&str> {
        self.book.as_deref()
    }

    pub fn chapter(&self) -> Option<u32> {
        self.chapter
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn state(&self) -> ScrollState {
        if self.autoscroll.is_some() {
            ScrollState::Running
        } else {
            ScrollState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.autoscroll.is_some()
    }

    pub fn advance_pending(&self) -> bool {
        self.autoscroll.as_ref().is_some_and(|a| a.advance.is_some())
    }

    /// The loop's own idea of the offset, before clamping.
    pub fn tracked_offset(&self) -> Option<f64> {
        self.autoscroll.as_ref().map(|a| a.tracked)
    }

    pub fn pending_frames(&self) -> usize {
        self.tasks.pending(TaskKind::Frame)
    }

    pub fn pending_timers(&self) -> usize {
        self.tasks.pending(TaskKind::Timer)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.tasks.next_deadline()
    }

    // ------------------------------------------------------------------
    // Rendering and jumps
    // ------------------------------------------------------------------

    /// Restore the saved session, or start at the beginning of the library.
    pub fn restore(&mut self) -> bool {
        match session::starting_position(&*self.storage, &self.library) {
            Some((book, chapter)) => self.render(&book, chapter),
            None => false,
        }
    }

    /// Replace the document with `book_name` and jump instantly to
    /// `chapter` (or the book's first chapter when it has no such chapter).
    /// Returns false when the book does not exist.
    pub fn render(&mut self, book_name: &str, chapter: u32) -> bool {
        let Some(book) = self.library.book(book_name) else {
            debug!("Render skipped, no book named {:?}", book_name);
            return false;
        };
        let target = if book.contains(chapter) {
            Some(chapter)
        } else {
            book.first_chapter()
        };
        let document = Document::render(book, self.viewport.layout_params());

        // An advance scheduled for the old book must not block the new one.
        if self.book.as_deref() != Some(book_name) {
            self.cancel_advance();
        }
        self.cancel_animation();
        self.viewport.replace_document(document);
        self.book = Some(book_name.to_string());
        self.chapter = None;
        info!("Rendered {}", book_name);

        if let Some(chapter) = target {
            self.jump_instant(chapter);
        }
        true
    }

    /// Scroll so `chapter`'s section sits `jump_offset` below the top.
    /// No-op (returns false) when the chapter has no section.
    pub fn jump(&mut self, chapter: u32, mode: JumpMode, now: Duration) -> bool {
        // A running loop would fight an animation, so jumps there are instant.
        let mode = if self.is_running() { JumpMode::Instant } else { mode };
        match mode {
            JumpMode::Instant => self.jump_instant(chapter),
            JumpMode::Smooth => {
                let Some(target) = self.chapter_target(chapter) else {
                    return false;
                };
                self.cancel_animation();
                let from = self.viewport.scroll_top();
                if (target - from).abs() >= 1.0 && !self.settings.smooth_scroll.is_zero() {
                    let frame = self.tasks.request_frame(now, self.settings.nominal_frame);
                    self.animation = Some(Animation {
                        frame,
                        from,
                        to: target,
                        started: now,
                    });
                } else {
                    self.viewport.set_scroll_top(target);
                }
                self.set_chapter(chapter, true);
                true
            }
        }
    }

    fn jump_instant(&mut self, chapter: u32) -> bool {
        let Some(target) = self.chapter_target(chapter) else {
            return false;
        };
        self.cancel_animation();
        self.viewport.set_scroll_top(target);
        if let Some(run) = self.autoscroll.as_mut() {
            run.tracked = self.viewport.scroll_top();
        }
        self.set_chapter(chapter, true);
        true
    }

    fn chapter_target(&self, chapter: u32) -> Option<f64> {
        let top = self.viewport.document()?.section_top(chapter)?;
        Some(self.viewport.clamp(top - self.settings.jump_offset))
    }

    /// The load action: stop autoscroll, then jump within the current book
    /// or render a different one.
    pub fn load(&mut self, book: &str, chapter: u32, now: Duration) -> bool {
        self.stop();
        if self.book.as_deref() == Some(book) {
            self.jump(chapter, JumpMode::Smooth, now)
        } else {
            self.render(book, chapter)
        }
    }

    pub fn next_chapter(&mut self, now: Duration) -> bool {
        match self.neighbour_chapter(|book, c| book.next_chapter(c)) {
            Some(chapter) => self.jump(chapter, JumpMode::Smooth, now),
            None => false,
        }
    }

    pub fn previous_chapter(&mut self, now: Duration) -> bool {
        match self.neighbour_chapter(|book, c| book.previous_chapter(c)) {
            Some(chapter) => self.jump(chapter, JumpMode::Smooth, now),
            None => false,
        }
    }

    /// Back to the first chapter of the current book.
    pub fn restart(&mut self, now: Duration) -> bool {
        let first = self
            .book
            .as_deref()
            .and_then(|b| self.library.book(b))
            .and_then(|b| b.first_chapter());
        match first {
            Some(chapter) => self.jump(chapter, JumpMode::Smooth, now),
            None => false,
        }
    }

    fn neighbour_chapter(&self, pick: impl Fn(&Book, u32) -> Option<u32>) -> Option<u32> {
        let book = self.library.book(self.book.as_deref()?)?;
        pick(book, self.chapter?)
    }

    // ------------------------------------------------------------------
    // Manual scrolling and resizing
    // ------------------------------------------------------------------

    /// A user scroll by `delta` units. While idle the chapter indicator
    /// follows; while running the loop picks the new offset up itself.
    pub fn scroll_by(&mut self, delta: f64) {
        self.cancel_animation();
        self.viewport.scroll_by(delta);
        if !self.is_running() {
            self.follow_manual_scroll();
        }
    }

    pub fn scroll_rows(&mut self, rows: i32) {
        self.scroll_by(f64::from(rows) * self.settings.line_height);
    }

    /// Scroll by a fraction of the viewport height (1.0 is a full page).
    pub fn scroll_pages(&mut self, pages: f64) {
        let rows = (f64::from(self.viewport.rows()) * pages).trunc() as i32;
        self.scroll_rows(rows);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_by(-self.viewport.scroll_top());
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_by(self.viewport.max_scroll() - self.viewport.scroll_top());
    }

    /// Adopt the first section (top-down) whose top is within the margin of
    /// the offset; failing that, the deepest one above offset + margin.
    /// Does not persist.
    fn follow_manual_scroll(&mut self) {
        let Some(document) = self.viewport.document() else {
            return;
        };
        let offset = self.viewport.scroll_top();
        let margin = self.settings.manual_scroll_margin;
        let chapter = document
            .sections()
            .iter()
            .find(|s| (s.top - offset).abs() <= margin)
            .map(|s| s.chapter)
            .or_else(|| document.chapter_above(offset + margin));

        if let Some(chapter) = chapter {
            self.set_chapter(chapter, false);
        }
    }

    /// The content area changed size. A width change lays the book out again
    /// and keeps the verse that was at the top in view.
    pub fn resize(&mut self, columns: u16, rows: u16) {
        if columns == self.viewport.columns() && rows == self.viewport.rows() {
            return;
        }
        // The verse nearest the top, and how far below the top it starts.
        let anchor = self.viewport.document().and_then(|d| {
            let offset = self.viewport.scroll_top();
            let anchor = d.anchor_at(offset)?;
            Some((anchor, (d.offset_of(anchor)? - offset).max(0.0)))
        });

        if self.viewport.resize(columns, rows) {
            let book = self.book.as_deref().and_then(|b| self.library.book(b));
            if let Some(book) = book {
                let document = Document::render(book, self.viewport.layout_params());
                let offset = anchor.and_then(|(a, lead)| document.offset_of(a).map(|o| o - lead));
                self.cancel_animation();
                self.viewport.replace_document(document);
                if let Some(offset) = offset {
                    self.viewport.set_scroll_top(offset);
                }
                debug!("Re-laid out for {} columns", columns);
            }
        }

        if let Some(run) = self.autoscroll.as_mut() {
            run.tracked = self.viewport.scroll_top();
        }
    }

    // ------------------------------------------------------------------
    // Autoscroll
    // ------------------------------------------------------------------

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = settings::clamp_speed(speed);
    }

    pub fn faster(&mut self) {
        self.speed = settings::step_speed(self.speed, 1);
    }

    pub fn slower(&mut self) {
        self.speed = settings::step_speed(self.speed, -1);
    }

    /// Begin autoscrolling, replacing any loop already running. Returns false
    /// when there is nothing rendered to scroll.
    pub fn start(&mut self, now: Duration) -> bool {
        self.stop();
        if self.viewport.document().is_none() {
            return false;
        }
        self.finish_animation();

        let frame = self.tasks.request_frame(now, self.settings.nominal_frame);
        self.autoscroll = Some(Autoscroll {
            frame,
            last_tick: now,
            tracked: self.viewport.scroll_top(),
            last_scan: None,
            advance: None,
        });
        info!("Autoscroll started at speed {:.1}", self.speed);
        true
    }

    /// Stop autoscrolling and cancel its frame and any pending book advance.
    /// Idempotent.
    pub fn stop(&mut self) -> bool {
        let Some(run) = self.autoscroll.take() else {
            return false;
        };
        self.tasks.cancel(run.frame);
        if let Some(advance) = run.advance {
            self.tasks.cancel(advance.task);
        }
        info!("Autoscroll stopped");
        true
    }

    pub fn toggle(&mut self, now: Duration) -> bool {
        if self.is_running() {
            self.stop();
            false
        } else {
            self.start(now)
        }
    }

    /// Run every task due at `now`.
    pub fn run_due(&mut self, now: Duration) {
        for (task, kind) in self.tasks.take_due(now) {
            match kind {
                TaskKind::Frame => self.on_frame(task, now),
                TaskKind::Timer => self.on_timer(task, now),
            }
        }
    }

    fn on_frame(&mut self, task: TaskId, now: Duration) {
        if self.autoscroll.as_ref().is_some_and(|a| a.frame == task) {
            self.tick(now);
        } else if self.animation.as_ref().is_some_and(|a| a.frame == task) {
            self.step_animation(now);
        }
    }

    fn tick(&mut self, now: Duration) {
        let nominal = self.settings.nominal_frame;
        let velocity = self.settings.base_rate * self.speed;
        let tolerance = self.settings.resync_tolerance;
        let scan_interval = self.settings.chapter_scan_interval;

        let Some(run) = self.autoscroll.as_mut() else {
            return;
        };

        let mut dt = now.saturating_sub(run.last_tick);
        if dt > self.settings.max_frame_gap {
            dt = nominal;
        }
        run.last_tick = now;

        let actual = self.viewport.scroll_top();
        if (actual - run.tracked).abs() > tolerance {
            debug!("Manual scroll detected, resyncing {:.1} -> {:.1}", run.tracked, actual);
            run.tracked = actual;
        }

        run.tracked += velocity * (dt.as_secs_f64() / nominal.as_secs_f64());
        self.viewport.set_scroll_top(run.tracked);

        let scan_due = run
            .last_scan
            .map_or(true, |last| now.saturating_sub(last) >= scan_interval);
        if scan_due {
            run.last_scan = Some(now);
        }
        let reached_end = run.advance.is_none() && self.viewport.at_end(self.settings.end_tolerance);

        if scan_due {
            self.track_chapter();
        }
        if reached_end {
            self.schedule_advance(now);
        }

        let frame = self.tasks.request_frame(now, nominal);
        if let Some(run) = self.autoscroll.as_mut() {
            run.frame = frame;
        }
    }

    fn track_chapter(&mut self) {
        let line = self.viewport.scroll_top() + self.settings.lookahead;
        let chapter = self.viewport.document().and_then(|d| d.chapter_above(line));
        if let Some(chapter) = chapter {
            if self.chapter != Some(chapter) {
                info!("Autoscroll entered chapter {}", chapter);
                self.set_chapter(chapter, true);
            }
        }
    }

    fn schedule_advance(&mut self, now: Duration) {
        let Some(book) = self.book.clone() else {
            return;
        };
        let task = self.tasks.set_timeout(now, self.settings.advance_delay);
        if let Some(run) = self.autoscroll.as_mut() {
            debug!("End of {} reached, advancing in {:?}", book, self.settings.advance_delay);
            run.advance = Some(PendingAdvance { task, book });
        }
    }

    fn cancel_advance(&mut self) {
        if let Some(advance) = self.autoscroll.as_mut().and_then(|a| a.advance.take()) {
            self.tasks.cancel(advance.task);
        }
    }

    fn on_timer(&mut self, task: TaskId, now: Duration) {
        let scheduled_book = match self.autoscroll.as_ref().and_then(|a| a.advance.as_ref()) {
            Some(advance) if advance.task == task => advance.book.clone(),
            _ => {
                debug!("Ignoring stale timer");
                return;
            }
        };
        if self.book.as_deref() != Some(scheduled_book.as_str()) {
            debug!("Book changed since advance was scheduled, ignoring");
            if let Some(run) = self.autoscroll.as_mut() {
                run.advance = None;
            }
            return;
        }

        let next = self.library.next_book(&scheduled_book).map(|b| b.name().to_string());
        match next {
            Some(next) => {
                info!("Advancing from {} to {}", scheduled_book, next);
                self.render(&next, 1);
                if let Some(run) = self.autoscroll.as_mut() {
                    run.tracked = 0.0;
                    run.last_tick = now;
                    run.advance = None;
                }
            }
            None => {
                info!("Reached the end of the library");
                self.stop();
            }
        }
    }

    // ------------------------------------------------------------------
    // Smooth jumps
    // ------------------------------------------------------------------

    fn step_animation(&mut self, now: Duration) {
        let duration = self.settings.smooth_scroll.as_secs_f64();
        let Some(animation) = self.animation.as_mut() else {
            return;
        };
        let t = (now.saturating_sub(animation.started).as_secs_f64() / duration).min(1.0);
        let eased = 1.0 - (1.0 - t).powi(3);
        self.viewport
            .set_scroll_top(animation.from + (animation.to - animation.from) * eased);

        if t < 1.0 {
            animation.frame = self.tasks.request_frame(now, self.settings.nominal_frame);
        } else {
            self.animation = None;
        }
    }

    fn cancel_animation(&mut self) {
        if let Some(animation) = self.animation.take() {
            self.tasks.cancel(animation.frame);
        }
    }

    fn finish_animation(&mut self) {
        if let Some(animation) = self.animation.take() {
            self.tasks.cancel(animation.frame);
            self.viewport.set_scroll_top(animation.to);
        }
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    fn set_chapter(&mut self, chapter: u32, persist: bool) {
        self.chapter = Some(chapter);
        if persist {
            self.persist();
        }
    }

    fn persist(&mut self) {
        let (Some(book), Some(chapter)) = (self.book.as_deref(), self.chapter) else {
            return;
        };
        if let Err(e) = Session::new(book, chapter).save(&mut *self.storage) {
            warn!("Failed to save session: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::Chapter;
    use crate::session::SESSION_KEY;
    use crate::storage::MemoryStorage;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Storage that can be inspected after being moved into the navigator.
    #[derive(Clone, Default)]
    struct SharedStorage(Rc<RefCell<MemoryStorage>>);

    impl Storage for SharedStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.0.borrow().get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
            self.0.borrow_mut().set(key, value)
        }
    }

    impl SharedStorage {
        fn session(&self) -> Option<Session> {
            Session::load(&*self.0.borrow())
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn book(name: &str, chapters: u32, verses: u32) -> Book {
        let mut book = Book::new(name);
        for c in 1..=chapters {
            let chapter: Chapter = (1..=verses).map(|v| (v, format!("{name} {c}:{v}"))).collect();
            book.insert_chapter(c, chapter);
        }
        book
    }

    fn navigator_with(books: Vec<Book>) -> (Navigator, SharedStorage) {
        let storage = SharedStorage::default();
        let mut nav = Navigator::new(
            books.into_iter().collect(),
            NavigatorSettings::default(),
            Box::new(storage.clone()),
        );
        nav.resize(60, 10);
        (nav, storage)
    }

    fn navigator() -> (Navigator, SharedStorage) {
        navigator_with(vec![book("Genesis", 5, 30), book("Exodus", 3, 30)])
    }

    /// Drive frames every `step` until `until`.
    fn run_frames(nav: &mut Navigator, from: u64, until: u64, step: u64) {
        let mut t = from;
        while t < until {
            t += step;
            nav.run_due(ms(t));
        }
    }

    #[test]
    fn test_instant_jump_puts_every_section_near_top() {
        let (mut nav, storage) = navigator();
        assert!(nav.render("Genesis", 1));
        let sections = nav.document().unwrap().sections().to_vec();
        for section in sections {
            assert!(nav.jump(section.chapter, JumpMode::Instant, ms(0)));
            let offset = nav.viewport().scroll_top();
            if section.top - 20.0 <= nav.viewport().max_scroll() && section.top >= 20.0 {
                assert_eq!(section.top - offset, 20.0);
            }
            assert_eq!(nav.chapter(), Some(section.chapter));
            assert_eq!(storage.session(), Some(Session::new("Genesis", section.chapter)));
        }
    }

    #[test]
    fn test_jump_to_missing_chapter_is_noop() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 2);
        let before = nav.viewport().scroll_top();
        assert!(!nav.jump(99, JumpMode::Instant, ms(0)));
        assert!(!nav.jump(99, JumpMode::Smooth, ms(0)));
        assert_eq!(nav.viewport().scroll_top(), before);
        assert_eq!(nav.chapter(), Some(2));
    }

    #[test]
    fn test_smooth_jump_animates_to_target() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 1);
        let target = nav.document().unwrap().section_top(3).unwrap() - 20.0;

        assert!(nav.jump(3, JumpMode::Smooth, ms(0)));
        assert_eq!(nav.chapter(), Some(3));
        assert_eq!(nav.viewport().scroll_top(), 0.0);
        assert_eq!(nav.pending_frames(), 1);

        nav.run_due(ms(100));
        let midway = nav.viewport().scroll_top();
        assert!(midway > 0.0 && midway < target);

        run_frames(&mut nav, 100, 500, 20);
        assert_eq!(nav.viewport().scroll_top(), target);
        assert_eq!(nav.pending_frames(), 0);
    }

    #[test]
    fn test_manual_scroll_cancels_animation() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 1);
        nav.jump(4, JumpMode::Smooth, ms(0));
        nav.scroll_rows(1);
        assert_eq!(nav.pending_frames(), 0);
        assert_eq!(nav.viewport().scroll_top(), 24.0);
    }

    #[test]
    fn test_render_missing_book_is_noop() {
        let (mut nav, storage) = navigator();
        assert!(!nav.render("Leviticus", 1));
        assert!(nav.document().is_none());
        assert_eq!(nav.book(), None);
        assert_eq!(storage.session(), None);
    }

    #[test]
    fn test_render_missing_chapter_lands_on_first() {
        let (mut nav, _) = navigator();
        assert!(nav.render("Exodus", 40));
        assert_eq!(nav.book(), Some("Exodus"));
        assert_eq!(nav.chapter(), Some(1));
        assert_eq!(nav.viewport().scroll_top(), 0.0);
    }

    #[test]
    fn test_load_same_book_jumps_other_book_renders() {
        let (mut nav, storage) = navigator();
        nav.render("Genesis", 1);
        nav.start(ms(0));

        assert!(nav.load("Genesis", 3, ms(10)));
        assert!(!nav.is_running());
        assert_eq!(nav.book(), Some("Genesis"));
        assert_eq!(nav.chapter(), Some(3));

        assert!(nav.load("Exodus", 2, ms(20)));
        assert_eq!(nav.book(), Some("Exodus"));
        assert_eq!(nav.chapter(), Some(2));
        assert_eq!(storage.session(), Some(Session::new("Exodus", 2)));
    }

    #[test]
    fn test_start_then_stop_leaves_no_residue() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 2);
        let before = nav.viewport().scroll_top();

        assert!(nav.start(ms(0)));
        assert_eq!(nav.state(), ScrollState::Running);
        assert_eq!(nav.pending_frames(), 1);
        assert!(nav.stop());

        assert_eq!(nav.state(), ScrollState::Idle);
        assert_eq!(nav.pending_frames(), 0);
        assert_eq!(nav.next_deadline(), None);
        nav.run_due(ms(1000));
        assert_eq!(nav.viewport().scroll_top(), before);
        assert!(!nav.stop());
    }

    #[test]
    fn test_start_replaces_running_loop() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 1);
        nav.start(ms(0));
        nav.start(ms(5));
        assert_eq!(nav.pending_frames(), 1);
    }

    #[test]
    fn test_start_without_document_fails() {
        let (mut nav, _) = navigator();
        assert!(!nav.start(ms(0)));
        assert!(!nav.is_running());
    }

    #[test]
    fn test_offset_grows_linearly_with_time_and_speed() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 1);
        nav.set_speed(2.0);
        nav.start(ms(0));

        run_frames(&mut nav, 0, 1000, 20);
        let expected = 0.5 * 2.0 * (1000.0 / 16.67);
        let tracked = nav.tracked_offset().unwrap();
        assert!((tracked - expected).abs() < 1e-9, "tracked {tracked}, expected {expected}");
        assert_eq!(nav.viewport().scroll_top(), tracked);
    }

    #[test]
    fn test_speed_is_read_every_tick() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 1);
        nav.start(ms(0));
        run_frames(&mut nav, 0, 500, 20);
        nav.set_speed(3.0);
        run_frames(&mut nav, 500, 1000, 20);

        let expected = 0.5 * 1.0 * (500.0 / 16.67) + 0.5 * 3.0 * (500.0 / 16.67);
        assert!((nav.tracked_offset().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_long_gap_counts_as_one_frame() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 1);
        nav.start(ms(0));
        nav.run_due(ms(5000));
        let expected = 0.5;
        assert!((nav.tracked_offset().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_manual_scroll_while_running_is_adopted() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 1);
        nav.start(ms(0));
        run_frames(&mut nav, 0, 100, 20);
        let before = nav.tracked_offset().unwrap();

        nav.scroll_rows(10);
        nav.run_due(ms(120));
        let tracked = nav.tracked_offset().unwrap();
        assert!(tracked > before + 200.0);
        assert_eq!(nav.viewport().scroll_top(), tracked);
    }

    #[test]
    fn test_small_drift_is_not_resynced() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 2);
        nav.start(ms(0));
        run_frames(&mut nav, 0, 100, 20);
        let before = nav.tracked_offset().unwrap();

        // Below the tolerance: the loop keeps its own offset.
        nav.viewport.set_scroll_top(before + 10.0);
        nav.run_due(ms(120));
        let step = 0.5 * (20.0 / 16.67);
        assert!((nav.tracked_offset().unwrap() - (before + step)).abs() < 1e-9);
    }

    #[test]
    fn test_autoscroll_tracks_and_persists_chapter() {
        let (mut nav, storage) = navigator();
        nav.render("Genesis", 1);
        let chapter_two = nav.document().unwrap().section_top(2).unwrap();
        // Park just before chapter 2 enters the lookahead line.
        nav.viewport.set_scroll_top(chapter_two - 121.0);
        nav.set_speed(5.0);
        nav.start(ms(0));

        run_frames(&mut nav, 0, 400, 20);
        assert_eq!(nav.chapter(), Some(2));
        assert_eq!(storage.session(), Some(Session::new("Genesis", 2)));
    }

    #[test]
    fn test_end_of_book_advances_once_to_next_book() {
        let (mut nav, storage) = navigator();
        nav.render("Genesis", 5);
        nav.scroll_to_bottom();
        nav.start(ms(0));

        nav.run_due(ms(20));
        assert!(nav.advance_pending());
        assert_eq!(nav.pending_timers(), 1);

        // Further frames at the bottom must not schedule a second advance.
        run_frames(&mut nav, 20, 1000, 20);
        assert_eq!(nav.pending_timers(), 1);
        assert_eq!(nav.book(), Some("Genesis"));

        run_frames(&mut nav, 1000, 2040, 20);
        assert_eq!(nav.book(), Some("Exodus"));
        assert_eq!(nav.chapter(), Some(1));
        assert!(!nav.advance_pending());
        assert!(nav.is_running());
        assert_eq!(storage.session(), Some(Session::new("Exodus", 1)));
        assert_eq!(nav.pending_timers(), 0);

        // Tracked offset restarted from zero on the new book.
        assert!(nav.tracked_offset().unwrap() < 5.0);
    }

    #[test]
    fn test_end_of_last_book_stops() {
        let (mut nav, _) = navigator();
        nav.render("Exodus", 3);
        nav.scroll_to_bottom();
        nav.start(ms(0));
        run_frames(&mut nav, 0, 2100, 20);

        assert_eq!(nav.state(), ScrollState::Idle);
        assert_eq!(nav.book(), Some("Exodus"));
        assert_eq!(nav.pending_frames(), 0);
        assert_eq!(nav.pending_timers(), 0);
    }

    #[test]
    fn test_stop_cancels_pending_advance() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 5);
        nav.scroll_to_bottom();
        nav.start(ms(0));
        nav.run_due(ms(20));
        assert!(nav.advance_pending());

        nav.stop();
        assert_eq!(nav.pending_timers(), 0);
        nav.run_due(ms(5000));
        assert_eq!(nav.book(), Some("Genesis"));
    }

    #[test]
    fn test_restart_does_not_resurrect_old_advance() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 5);
        nav.scroll_to_bottom();
        nav.start(ms(0));
        nav.run_due(ms(20));

        // Stop and immediately restart from the top: the old advance is gone.
        nav.load("Genesis", 1, ms(30));
        nav.run_due(ms(700));
        nav.start(ms(700));
        run_frames(&mut nav, 700, 2500, 20);
        assert_eq!(nav.book(), Some("Genesis"));
    }

    #[test]
    fn test_render_other_book_drops_pending_advance() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 5);
        nav.scroll_to_bottom();
        nav.start(ms(0));
        nav.run_due(ms(20));
        assert!(nav.advance_pending());

        nav.render("Exodus", 1);
        assert!(!nav.advance_pending());
        assert_eq!(nav.pending_timers(), 0);

        run_frames(&mut nav, 20, 2100, 20);
        assert_eq!(nav.book(), Some("Exodus"));
        assert!(nav.is_running());
        assert!(!nav.advance_pending());
    }

    #[test]
    fn test_end_of_rendered_book_schedules_its_own_advance() {
        let (mut nav, _) = navigator_with(vec![
            book("Genesis", 2, 30),
            book("Exodus", 2, 30),
            book("Leviticus", 2, 30),
        ]);
        nav.render("Genesis", 2);
        nav.scroll_to_bottom();
        nav.start(ms(0));
        nav.run_due(ms(20));
        assert!(nav.advance_pending());

        // Switch books while the old advance is still waiting.
        nav.render("Exodus", 2);
        nav.scroll_to_bottom();
        nav.run_due(ms(40));
        assert!(nav.advance_pending());

        run_frames(&mut nav, 40, 2100, 20);
        assert_eq!(nav.book(), Some("Leviticus"));
        assert!(nav.is_running());
    }

    #[test]
    fn test_set_speed_keeps_fractional_factor() {
        let (mut nav, _) = navigator();
        nav.set_speed(1.25);
        assert_eq!(nav.speed(), 1.25);
        nav.faster();
        assert_eq!(nav.speed(), 1.4);
    }

    #[test]
    fn test_manual_scroll_updates_chapter_without_persisting() {
        let (mut nav, storage) = navigator();
        nav.render("Genesis", 1);
        let chapter_three = nav.document().unwrap().section_top(3).unwrap();

        nav.scroll_by(chapter_three - 48.0);
        assert_eq!(nav.chapter(), Some(3));
        assert_eq!(storage.session(), Some(Session::new("Genesis", 1)));

        // Deep inside chapter 3, no heading near the top: deepest one above.
        nav.scroll_by(240.0);
        assert_eq!(nav.chapter(), Some(3));
    }

    #[test]
    fn test_manual_scroll_prefers_first_heading_in_window() {
        // One-verse chapters put several headings inside the margin.
        let (mut nav, _) = navigator_with(vec![book("Obadiah", 8, 1)]);
        nav.render("Obadiah", 1);
        let sections = nav.document().unwrap().sections().to_vec();
        let offset = sections[1].top - 24.0;
        assert!(sections[1].top <= offset + 100.0);
        assert!(offset <= nav.viewport().max_scroll());

        nav.scroll_to_top();
        nav.scroll_by(offset);
        assert_eq!(nav.viewport().scroll_top(), offset);
        assert_eq!(nav.chapter(), Some(sections[0].chapter));
    }

    #[test]
    fn test_next_previous_and_restart() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 4);
        assert!(nav.next_chapter(ms(0)));
        assert_eq!(nav.chapter(), Some(5));
        assert!(!nav.next_chapter(ms(0)));
        assert!(nav.previous_chapter(ms(0)));
        assert_eq!(nav.chapter(), Some(4));
        assert!(nav.restart(ms(0)));
        assert_eq!(nav.chapter(), Some(1));
        assert!(!nav.previous_chapter(ms(0)));
    }

    #[test]
    fn test_restore_uses_saved_session() {
        let storage = SharedStorage::default();
        Session::new("Exodus", 2).save(&mut storage.clone()).unwrap();
        let mut nav = Navigator::new(
            vec![book("Genesis", 2, 5), book("Exodus", 2, 5)].into_iter().collect(),
            NavigatorSettings::default(),
            Box::new(storage.clone()),
        );
        assert!(nav.restore());
        assert_eq!(nav.book(), Some("Exodus"));
        assert_eq!(nav.chapter(), Some(2));
    }

    #[test]
    fn test_restore_ignores_stale_session() {
        let storage = SharedStorage::default();
        storage
            .clone()
            .set(SESSION_KEY, r#"{"book":"Genesis","chapter":3}"#)
            .unwrap();
        let mut nav = Navigator::new(
            vec![book("Matthew", 2, 5)].into_iter().collect(),
            NavigatorSettings::default(),
            Box::new(storage),
        );
        assert!(nav.restore());
        assert_eq!(nav.book(), Some("Matthew"));
        assert_eq!(nav.chapter(), Some(1));
    }

    #[test]
    fn test_resize_keeps_verse_in_view() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 3);
        let anchor = nav
            .document()
            .unwrap()
            .anchor_at(nav.viewport().scroll_top())
            .unwrap();

        nav.resize(30, 10);
        let doc = nav.document().unwrap();
        assert_eq!(doc.anchor_at(nav.viewport().scroll_top()), Some(anchor));
    }

    #[test]
    fn test_resize_at_top_stays_at_top() {
        let (mut nav, _) = navigator();
        nav.render("Genesis", 1);
        assert_eq!(nav.viewport().scroll_top(), 0.0);
        nav.resize(40, 10);
        assert_eq!(nav.viewport().scroll_top(), 0.0);
    }
}
