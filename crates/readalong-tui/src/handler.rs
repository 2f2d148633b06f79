use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, FocusPane, InputMode, Screen};
use crate::tui::AppEvent;

const WHEEL_ROWS: i32 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        // The next draw picks up the new size
        AppEvent::Resize(_, _) => {}
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match (app.screen, app.input_mode) {
        (Screen::Read, InputMode::Normal) => handle_read_normal(app, key),
        (Screen::Read, InputMode::Editing) => handle_chapter_editing(app, key),
        (Screen::Search, InputMode::Normal) => handle_search_normal(app, key),
        (Screen::Search, InputMode::Editing) => handle_search_editing(app, key),
    }
}

fn handle_read_normal(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Autoscroll
        KeyCode::Char(' ') => app.toggle_autoscroll(),
        KeyCode::Esc => app.stop_autoscroll(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.faster(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.slower(),

        // Page scroll
        KeyCode::Char('d') if ctrl => app.scroll_pages(0.5),
        KeyCode::Char('u') if ctrl => app.scroll_pages(-0.5),
        KeyCode::PageDown => app.scroll_pages(1.0),
        KeyCode::PageUp => app.scroll_pages(-1.0),

        // Navigation within the focused pane
        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Books => app.nav_down(),
            FocusPane::Content => app.scroll_rows(1),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Books => app.nav_up(),
            FocusPane::Content => app.scroll_rows(-1),
        },
        KeyCode::Char('g') | KeyCode::Home => match app.focus {
            FocusPane::Books => app.nav_first(),
            FocusPane::Content => app.scroll_to_top(),
        },
        KeyCode::Char('G') | KeyCode::End => match app.focus {
            FocusPane::Books => app.nav_last(),
            FocusPane::Content => app.scroll_to_bottom(),
        },
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Enter => {
            if app.focus == FocusPane::Books {
                app.load_selected();
                app.focus = FocusPane::Content;
            }
        }

        // Chapters
        KeyCode::Char(':') => {
            if app.can_navigate() {
                app.edit_chapter();
            }
        }
        KeyCode::Char('n') => app.next_chapter(),
        KeyCode::Char('p') => app.previous_chapter(),
        KeyCode::Char('r') => app.restart_book(),

        KeyCode::Char('/') => {
            if app.can_navigate() {
                app.open_search();
            }
        }
        _ => {}
    }
}

fn handle_chapter_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_chapter_edit(),
        KeyCode::Enter => app.submit_chapter(),
        KeyCode::Backspace => {
            app.chapter_input.pop();
        }
        KeyCode::Char(c) if c.is_ascii_digit() => app.chapter_input.push(c),
        _ => {}
    }
}

fn handle_search_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc => app.close_search(),
        KeyCode::Char('j') | KeyCode::Down => app.search_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.search_nav_up(),
        KeyCode::Enter => app.open_selected_hit(),
        KeyCode::Char('/') | KeyCode::Char('i') => app.input_mode = InputMode::Editing,
        _ => {}
    }
}

fn handle_search_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            if app.search_results.is_empty() {
                app.close_search();
            } else {
                app.input_mode = InputMode::Normal;
            }
        }
        KeyCode::Enter => {
            app.perform_search();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            app.search_input.pop();
        }
        KeyCode::Char(c) => app.search_input.push(c),
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_nav = app.nav_area.is_some_and(|r| point_in_rect(x, y, r));
    let in_content = app.content_area.is_some_and(|r| point_in_rect(x, y, r));

    let rows = match mouse.kind {
        MouseEventKind::ScrollDown => WHEEL_ROWS,
        MouseEventKind::ScrollUp => -WHEEL_ROWS,
        _ => return,
    };

    match app.screen {
        Screen::Read => {
            if in_content {
                app.scroll_rows(rows);
            } else if in_nav {
                if rows > 0 {
                    app.nav_down();
                } else {
                    app.nav_up();
                }
            }
        }
        Screen::Search => {
            if rows > 0 {
                app.search_nav_down();
            } else {
                app.search_nav_up();
            }
        }
    }
}
