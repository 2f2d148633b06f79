use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
};
use readalong_core::{Document, Row};
use crate::app::{App, FocusPane, InputMode, Screen};

const NAV_WIDTH: u16 = 30;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Read => render_read_screen(app, frame, body_area),
        Screen::Search => render_search_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let nav = &app.navigator;
    let position = match (nav.book(), nav.chapter()) {
        (Some(book), Some(chapter)) => format!(" {} {} ", book, chapter),
        _ => String::new(),
    };

    let (state_text, state_style) = if nav.advance_pending() {
        (" NEXT BOOK ", Style::default().bg(Color::Magenta).fg(Color::White).bold())
    } else if nav.is_running() {
        (" RUNNING ", Style::default().bg(Color::Green).fg(Color::Black).bold())
    } else {
        (" IDLE ", Style::default().fg(Color::Gray))
    };

    let title = Line::from(vec![
        Span::styled(" Read Along ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(position, Style::default().fg(Color::White)),
        Span::styled(format!(" {:.1}x ", nav.speed()), Style::default().fg(Color::Yellow)),
        Span::styled(state_text, state_style),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match (app.screen, app.input_mode) {
        (Screen::Read, InputMode::Normal) => " READ ",
        (Screen::Read, InputMode::Editing) => " CHAPTER ",
        (Screen::Search, _) => " SEARCH ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let hints: Vec<Span> = match (app.screen, app.input_mode) {
        (Screen::Read, InputMode::Normal) => {
            let mut hints = vec![
                hint("Space", if app.navigator.is_running() { "stop" } else { "play" }),
                hint("+/-", "speed"),
            ];
            if app.focus == FocusPane::Books {
                hints.extend([hint("j/k", "book"), hint("Enter", "load")]);
            } else {
                hints.extend([hint("j/k", "scroll"), hint("PgUp/PgDn", "page")]);
            }
            hints.extend([
                hint(":", "chapter"),
                hint("n/p", "next/prev"),
                hint("r", "restart"),
                hint("Tab", "focus"),
                hint("/", "search"),
                hint("q", "quit"),
            ]);
            hints.into_iter().flatten().collect()
        }
        (Screen::Read, InputMode::Editing) => [hint("0-9", "chapter"), hint("Enter", "load"), hint("Esc", "cancel")]
            .into_iter()
            .flatten()
            .collect(),
        (Screen::Search, InputMode::Normal) => [
            hint("j/k", "nav"),
            hint("Enter", "read"),
            hint("i", "edit"),
            hint("Esc", "back"),
        ]
        .into_iter()
        .flatten()
        .collect(),
        (Screen::Search, InputMode::Editing) => [hint("Enter", "search"), hint("Esc", "cancel")]
            .into_iter()
            .flatten()
            .collect(),
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_read_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    // Split into navigation (left) and content (right)
    let [nav_area, content_area] = Layout::horizontal([
        Constraint::Length(NAV_WIDTH),
        Constraint::Min(0),
    ])
    .areas(area);

    // Store areas for mouse hit-testing
    app.nav_area = Some(nav_area);
    app.content_area = Some(content_area);

    render_navigation(app, frame, nav_area);
    render_content(app, frame, content_area);
}

fn render_navigation(app: &mut App, frame: &mut Frame, area: Rect) {
    let [books_area, chapter_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    let nav_focused = app.focus == FocusPane::Books;
    let border_color = if nav_focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Books ({}) ", app.navigator.library().len()));

    let items: Vec<ListItem> = app
        .navigator
        .library()
        .books()
        .iter()
        .map(|b| ListItem::new(format!(" {} ", b.name())))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, books_area, &mut app.book_state);

    // Chapter field
    let editing = app.screen == Screen::Read && app.input_mode == InputMode::Editing;
    let chapter_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(" Chapter ");
    let chapter = Paragraph::new(app.chapter_input.as_str())
        .style(Style::default().fg(Color::Cyan))
        .block(chapter_block);
    frame.render_widget(chapter, chapter_area);

    if editing {
        frame.set_cursor_position((
            chapter_area.x + app.chapter_input.len() as u16 + 1,
            chapter_area.y + 1,
        ));
    }
}

fn render_content(app: &mut App, frame: &mut Frame, area: Rect) {
    let content_focused = app.focus == FocusPane::Content;
    let border_color = if content_focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", app.content_title()));

    let inner_area = block.inner(area);

    if let Some(error) = &app.load_error {
        let message = Paragraph::new(Text::from(vec![
            Line::from(Span::styled("Could not load the library", Style::default().fg(Color::Red).bold())),
            Line::default(),
            Line::from(Span::styled(error.as_str(), Style::default().fg(Color::Red))),
        ]))
        .wrap(Wrap { trim: true })
        .block(block);
        frame.render_widget(message, area);
        return;
    }

    // Lay out against the real pane size before reading offsets
    app.navigator.resize(inner_area.width, inner_area.height);

    let viewport = app.navigator.viewport();
    let Some(document) = viewport.document() else {
        let placeholder = Paragraph::new("Select a book to start reading")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    };

    let first = viewport.first_visible_row();
    let visible = usize::from(inner_area.height);
    let lines: Vec<Line> = document
        .rows()
        .iter()
        .skip(first)
        .take(visible)
        .map(|row| row_line(document, row))
        .collect();

    let total_rows = document.rows().len();
    frame.render_widget(Paragraph::new(lines).block(block), area);

    // Render scrollbar
    if total_rows > visible {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));

        let mut scrollbar_state = ScrollbarState::new(total_rows.saturating_sub(visible))
            .position(first);

        frame.render_stateful_widget(
            scrollbar,
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn row_line<'a>(document: &Document, row: &'a Row) -> Line<'a> {
    match row {
        Row::Spacer => Line::default(),
        Row::Heading { title, .. } => {
            Line::from(Span::styled(title.as_str(), Style::default().fg(Color::Cyan).bold()))
        }
        Row::Verse { verse, first, text, .. } => {
            let gutter = document.gutter();
            let number = if *first {
                format!("{:>gutter$} ", verse)
            } else {
                " ".repeat(gutter + 1)
            };
            Line::from(vec![
                Span::styled(number, Style::default().fg(Color::Yellow).bold()),
                Span::raw(text.as_str()),
            ])
        }
        Row::EndMarker { title } => Line::from(Span::styled(
            title.as_str(),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
        .centered(),
    }
}

fn render_search_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    // Layout: search input at top, results below split into list and preview
    let [input_area, results_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    app.nav_area = None;
    app.content_area = None;

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(
            if app.input_mode == InputMode::Editing {
                Color::Yellow
            } else {
                Color::DarkGray
            },
        ))
        .title(" Search (use OR / AND to combine words) ");

    let input = Paragraph::new(app.search_input.as_str())
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, input_area);

    // Show cursor when editing
    if app.input_mode == InputMode::Editing {
        frame.set_cursor_position((
            input_area.x + unicode_width::UnicodeWidthStr::width(app.search_input.as_str()) as u16 + 1,
            input_area.y + 1,
        ));
    }

    let [list_area, preview_area] = Layout::horizontal([
        Constraint::Percentage(40),
        Constraint::Percentage(60),
    ])
    .areas(results_area);

    let results_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Results ({}) ", app.search_results.len()));

    let items: Vec<ListItem> = app
        .search_results
        .iter()
        .map(|hit| ListItem::new(format!(" {} ", hit.reference())))
        .collect();

    let list = List::new(items)
        .block(results_block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, list_area, &mut app.search_state);

    let preview_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Preview ");

    let preview_text = match app.selected_hit() {
        Some(hit) => Text::from(vec![
            Line::from(Span::styled(hit.reference(), Style::default().fg(Color::Yellow).bold())),
            Line::default(),
            Line::from(hit.text.as_str()),
        ]),
        None if app.search_input.is_empty() => Text::from("Type a word or phrase and press Enter"),
        None => Text::from("No verses found"),
    };

    let preview = Paragraph::new(preview_text)
        .block(preview_block)
        .wrap(Wrap { trim: true });

    frame.render_widget(preview, preview_area);
}
