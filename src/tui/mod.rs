pub mod event;
pub mod theme;
pub mod views;
pub mod widgets;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::ExecutableCommand;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Tabs};

use crate::cli::SortColumn;
use crate::error::ViewerError;
use crate::identity::UserDirectory;
use crate::model::RingState;
use crate::resolve::ResolutionCache;
use crate::state::{SharedWindow, WindowSnapshot};

use self::event::{Input, InputPump};
use self::theme::Theme;
use self::views::{View, ViewContext};
use self::widgets::{format_bytes, format_duration, format_rate};

const MIN_COLS: u16 = 80;
const MIN_ROWS: u16 = 24;
const PAGE_ROWS: usize = 20;

/// TUI application state.
pub struct App {
    pub current_view: View,
    pub sort_column: SortColumn,
    pub sort_ascending: bool,
    pub scroll_position: usize,
    /// Rows in the current view as of the last refresh.
    pub row_count: usize,
    pub should_quit: bool,
    pub show_help: bool,
    pub theme: Theme,
}

impl App {
    pub fn new(sort_column: SortColumn, no_color: bool) -> Self {
        let no_color = no_color || std::env::var("NO_COLOR").is_ok();
        Self {
            current_view: View::Users,
            sort_column,
            sort_ascending: sort_column == SortColumn::User,
            scroll_position: 0,
            row_count: 0,
            should_quit: false,
            show_help: false,
            theme: Theme::new(no_color),
        }
    }

    fn switch_view(&mut self, view: View) {
        self.current_view = view;
        self.scroll_position = 0;
    }

    /// Record the current view's row count and keep the selection on a row.
    pub fn set_row_count(&mut self, rows: usize) {
        self.row_count = rows;
        self.scroll_position = self.scroll_position.min(self.last_row());
    }

    fn last_row(&self) -> usize {
        self.row_count.saturating_sub(1)
    }

    fn scroll_down(&mut self, by: usize) {
        self.scroll_position = self.scroll_position.saturating_add(by).min(self.last_row());
    }
}

/// Shared inputs the dashboard reads on every refresh.
pub struct Dashboard<'a> {
    pub window: &'a SharedWindow,
    pub names: &'a ResolutionCache,
    pub users: &'a UserDirectory,
}

/// Run the interactive TUI event loop.
///
/// This takes ownership of the terminal and runs until the user quits or
/// `shutdown` is set. The published window is reloaded on every refresh.
pub fn run_tui(
    dashboard: Dashboard<'_>,
    refresh: Duration,
    sort_column: SortColumn,
    no_color: bool,
    shutdown: &AtomicBool,
) -> Result<(), ViewerError> {
    // Check terminal size before entering alternate screen.
    let (cols, rows) = crossterm::terminal::size().map_err(|e| {
        ViewerError::Tui(io::Error::other(format!("cannot query terminal size: {e}")))
    })?;
    if cols < MIN_COLS || rows < MIN_ROWS {
        return Err(ViewerError::Tui(io::Error::other(format!(
            "terminal too small ({cols}x{rows}), minimum {MIN_COLS}x{MIN_ROWS}"
        ))));
    }

    enable_raw_mode().map_err(ViewerError::Tui)?;
    io::stdout()
        .execute(EnterAlternateScreen)
        .map_err(ViewerError::Tui)?;

    let backend = ratatui::backend::CrosstermBackend::new(io::stdout());
    let result = Terminal::new(backend)
        .map_err(ViewerError::Tui)
        .and_then(|mut terminal| {
            let mut app = App::new(sort_column, no_color);
            let events = InputPump::start(refresh).map_err(ViewerError::Tui)?;
            run_event_loop(&mut terminal, &mut app, &events, &dashboard, shutdown)
        });

    // Restore terminal regardless of success/failure.
    let _ = disable_raw_mode();
    let _ = io::stdout().execute(LeaveAlternateScreen);

    result
}

fn run_event_loop(
    terminal: &mut Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &InputPump,
    dashboard: &Dashboard<'_>,
    shutdown: &AtomicBool,
) -> Result<(), ViewerError> {
    loop {
        let snapshot = dashboard.window.load();
        app.set_row_count(app.current_view.row_count(snapshot.total()));
        terminal
            .draw(|frame| render(frame, app, &snapshot, dashboard))
            .map_err(ViewerError::Tui)?;

        if app.should_quit {
            return Ok(());
        }

        match events.next() {
            Ok(Input::Key(key)) => handle_key(app, key),
            Ok(Input::Resized) => {}
            Ok(Input::Refresh) => app.should_quit |= shutdown.load(Ordering::Relaxed),
            Err(_) => app.should_quit = true,
        }
    }
}

fn handle_key(app: &mut App, key: crossterm::event::KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        KeyCode::Tab => app.switch_view(app.current_view.next()),
        KeyCode::BackTab => app.switch_view(app.current_view.prev()),
        KeyCode::Char(c @ '1'..='3') => {
            if let Some(view) = View::from_index(c as usize - '1' as usize) {
                app.switch_view(view);
            }
        }

        KeyCode::Char('s') => {
            app.sort_column = match app.sort_column {
                SortColumn::Usage => SortColumn::User,
                SortColumn::User => SortColumn::Reads,
                SortColumn::Reads => SortColumn::Writes,
                SortColumn::Writes => SortColumn::Usage,
            };
            app.sort_ascending = app.sort_column == SortColumn::User;
        }
        KeyCode::Char('S') => {
            app.sort_ascending = !app.sort_ascending;
        }

        KeyCode::Up => {
            app.scroll_position = app.scroll_position.saturating_sub(1);
        }
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => {
            app.scroll_position = app.scroll_position.saturating_sub(PAGE_ROWS);
        }
        KeyCode::PageDown => app.scroll_down(PAGE_ROWS),
        KeyCode::Home => app.scroll_position = 0,
        KeyCode::End => app.scroll_position = app.last_row(),

        KeyCode::Char('?') => app.show_help = !app.show_help,
        KeyCode::Esc => app.show_help = false,

        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame, app: &App, snapshot: &WindowSnapshot, dashboard: &Dashboard<'_>) {
    let size = frame.area();

    if size.width < MIN_COLS || size.height < MIN_ROWS {
        let msg = format!(
            "Terminal too small ({0}x{1}). Minimum: {MIN_COLS}x{MIN_ROWS}. Please resize.",
            size.width, size.height
        );
        let paragraph = Paragraph::new(msg)
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title("nfs-traffic-viewer"));
        frame.render_widget(paragraph, size);
        return;
    }

    // Layout: tab bar (3 lines) + window status (1 line) + content (rest).
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(10),
        ])
        .split(size);

    render_tabs(frame, chunks[0], app);
    frame.render_widget(Paragraph::new(status_line(snapshot, app)), chunks[1]);

    let ctx = ViewContext {
        total: snapshot.total(),
        names: dashboard.names,
        users: dashboard.users,
        theme: &app.theme,
        sort: app.sort_column,
        ascending: app.sort_ascending,
        selected: app.scroll_position,
    };
    match app.current_view {
        View::Users => views::users::render(frame, chunks[2], &ctx),
        View::Clients => views::clients::render(frame, chunks[2], &ctx),
        View::Files => views::files::render(frame, chunks[2], &ctx),
    }

    if app.show_help {
        render_help_overlay(frame, size);
    }
}

fn status_line(snapshot: &WindowSnapshot, app: &App) -> String {
    let fill = match snapshot.state {
        RingState::Empty => "empty",
        RingState::Filling => "filling",
        RingState::Full => "full",
    };
    let covered = snapshot.covered();
    let usage = snapshot.total().usage();
    let rate = if covered.is_zero() {
        0.0
    } else {
        usage as f64 / covered.as_secs_f64()
    };
    format!(
        " window {fill} {}/{} ({} of {}) | total {} | avg {} | sort {:?} {}",
        snapshot.buckets,
        snapshot.capacity,
        format_duration(covered),
        format_duration(snapshot.horizon()),
        format_bytes(usage),
        format_rate(rate),
        app.sort_column,
        if app.sort_ascending { "asc" } else { "desc" },
    )
}

fn render_tabs(frame: &mut ratatui::Frame, area: Rect, app: &App) {
    let titles: Vec<Line<'_>> = View::ALL
        .iter()
        .map(|v| Line::from(Span::styled(v.title(), app.theme.tab_style(*v == app.current_view))))
        .collect();

    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(" nfs-traffic-viewer "))
        .select(app.current_view.index())
        .highlight_style(app.theme.tab_style(true))
        .divider(Span::raw(" | "));

    frame.render_widget(tabs, area);
}

fn render_help_overlay(frame: &mut ratatui::Frame, area: Rect) {
    let help_width = 50u16.min(area.width.saturating_sub(4));
    let help_height = 18u16.min(area.height.saturating_sub(4));
    let x = (area.width.saturating_sub(help_width)) / 2;
    let y = (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default()
                .add_modifier(Modifier::BOLD)
                .fg(Color::Yellow),
        )),
        Line::from(""),
        Line::from("  q / Ctrl-C    Quit"),
        Line::from("  Tab           Next view"),
        Line::from("  Shift-Tab     Previous view"),
        Line::from("  1-3           Jump to view"),
        Line::from("  s             Cycle sort column"),
        Line::from("  S             Reverse sort"),
        Line::from("  Up/Down       Navigate rows"),
        Line::from("  PgUp/PgDn     Page scroll"),
        Line::from("  Home/End      Jump to top/bottom"),
        Line::from("  ?             Toggle this help"),
        Line::from(""),
        Line::from(Span::styled(
            "Press ? or Esc to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .style(Style::default().bg(Color::Black)),
    );

    frame.render_widget(Clear, help_area);
    frame.render_widget(help, help_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn keys_switch_views_and_reset_scroll() {
        let mut app = App::new(SortColumn::Usage, true);
        app.set_row_count(10);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.scroll_position, 2);
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.current_view, View::Files);
        assert_eq!(app.scroll_position, 0);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.current_view, View::Users);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.current_view, View::Files);
    }

    #[test]
    fn end_then_up_moves_selection() {
        let mut app = App::new(SortColumn::Usage, true);
        app.set_row_count(5);
        press(&mut app, KeyCode::End);
        assert_eq!(app.scroll_position, 4);
        press(&mut app, KeyCode::Up);
        assert_eq!(views::clamp_selected(app.scroll_position, 5), Some(3));
    }

    #[test]
    fn scrolling_stays_within_rows() {
        let mut app = App::new(SortColumn::Usage, true);
        app.set_row_count(3);
        for _ in 0..10 {
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(app.scroll_position, 2);
        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.scroll_position, 2);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.scroll_position, 1);
        press(&mut app, KeyCode::PageUp);
        assert_eq!(app.scroll_position, 0);
    }

    #[test]
    fn shrinking_view_pulls_selection_back() {
        let mut app = App::new(SortColumn::Usage, true);
        app.set_row_count(50);
        press(&mut app, KeyCode::End);
        assert_eq!(app.scroll_position, 49);
        app.set_row_count(4);
        assert_eq!(app.scroll_position, 3);
        app.set_row_count(0);
        assert_eq!(app.scroll_position, 0);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.scroll_position, 0);
    }

    #[test]
    fn sort_cycle_and_reverse() {
        let mut app = App::new(SortColumn::Usage, true);
        assert!(!app.sort_ascending);
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.sort_column, SortColumn::User);
        assert!(app.sort_ascending);
        press(&mut app, KeyCode::Char('S'));
        assert!(!app.sort_ascending);
    }

    #[test]
    fn quit_and_help() {
        let mut app = App::new(SortColumn::Usage, true);
        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);
        press(&mut app, KeyCode::Esc);
        assert!(!app.show_help);
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn status_line_reports_fill() {
        let app = App::new(SortColumn::Usage, true);
        let snap = WindowSnapshot::empty(900, Duration::from_secs(1));
        let line = status_line(&snap, &app);
        assert!(line.contains("window empty 0/900"));
        assert!(line.contains("of 15m"));
    }
}
