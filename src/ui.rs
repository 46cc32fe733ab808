use anyhow::Result;
use asset_overview::{
    build_overview, AssetFilter, AssetKey, AssetRecord, Overview, SectionKind,
};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Overview,
    Catalog,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Overview => Page::Catalog,
            Page::Catalog => Page::Overview,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Overview => "Overview",
            Page::Catalog => "Catalog",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
}

pub struct App {
    pub records: Vec<AssetRecord>,
    pub recent_keys: Vec<AssetKey>,
    pub recent_limit: usize,
    pub overview: Overview,
    pub current_page: Page,
    pub focused_section: usize,
    pub section_states: Vec<TableState>,
    pub filter: AssetFilter,
    pub filtered: Vec<AssetRecord>,
    pub catalog_state: TableState,
    pub input_mode: InputMode,
    pub search_input: String,
    /// Visits made in this session, flushed to the store by the caller.
    pub pending_visits: Vec<AssetKey>,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(records: Vec<AssetRecord>, recent_keys: Vec<AssetKey>, recent_limit: usize) -> Result<Self> {
        let overview = build_overview(&records, &recent_keys, &Local::now(), recent_limit)?;

        let section_states = overview
            .sections
            .iter()
            .map(|section| {
                let mut state = TableState::default();
                if !section.items.is_empty() {
                    state.select(Some(0));
                }
                state
            })
            .collect();

        let mut app = Self {
            filtered: Vec::new(),
            records,
            recent_keys,
            recent_limit,
            overview,
            current_page: Page::Overview,
            focused_section: 0,
            section_states,
            filter: AssetFilter::default(),
            catalog_state: TableState::default(),
            input_mode: InputMode::Normal,
            search_input: String::new(),
            pending_visits: Vec::new(),
            status_message: None,
        };
        app.apply_filter(AssetFilter::default());
        Ok(app)
    }

    pub fn focused_kind(&self) -> SectionKind {
        SectionKind::ALL[self.focused_section]
    }

    pub fn next_section(&mut self) {
        self.focused_section = (self.focused_section + 1) % SectionKind::ALL.len();
    }

    pub fn previous_section(&mut self) {
        let len = SectionKind::ALL.len();
        self.focused_section = (self.focused_section + len - 1) % len;
    }

    pub fn apply_filter(&mut self, filter: AssetFilter) {
        self.filtered = filter.apply(&self.records).into_iter().cloned().collect();
        self.filter = filter;

        // Reset selection to first item
        if !self.filtered.is_empty() {
            self.catalog_state.select(Some(0));
        } else {
            self.catalog_state.select(None);
        }
    }

    pub fn clear_filter(&mut self) {
        self.apply_filter(AssetFilter::default());
    }

    /// Follow the deep link of the selected entry in the focused section.
    pub fn open_selected_entry(&mut self) {
        let section = &self.overview.sections[self.focused_section];
        let selected = self.section_states[self.focused_section]
            .selected()
            .and_then(|i| section.items.get(i));

        let Some(href) = selected.map(|item| item.href.clone()) else {
            return;
        };

        match AssetFilter::from_link(&href) {
            Ok(filter) => {
                self.apply_filter(filter);
                self.current_page = Page::Catalog;
                self.status_message = None;
            }
            Err(e) => {
                tracing::warn!(href = %href, error = %e, "could not open dashboard link");
                self.status_message = Some(format!("Could not open link: {}", e));
            }
        }
    }

    pub fn start_search(&mut self) {
        self.input_mode = InputMode::Search;
        self.search_input.clear();
    }

    pub fn cancel_search(&mut self) {
        self.input_mode = InputMode::Normal;
        self.search_input.clear();
    }

    pub fn submit_search(&mut self) {
        self.input_mode = InputMode::Normal;
        let query = self.search_input.trim();
        let filter = AssetFilter {
            search: if query.is_empty() {
                None
            } else {
                Some(query.to_string())
            },
            ..AssetFilter::default()
        };
        self.apply_filter(filter);
        self.current_page = Page::Catalog;
    }

    pub fn selected_asset(&self) -> Option<&AssetRecord> {
        self.catalog_state.selected().and_then(|i| self.filtered.get(i))
    }

    /// Mark the selected catalog asset as visited and refresh "recently visited".
    pub fn visit_selected(&mut self) {
        let Some(key) = self.selected_asset().map(|r| r.key.clone()) else {
            return;
        };

        self.recent_keys.retain(|k| k != &key);
        self.recent_keys.insert(0, key.clone());
        self.recent_keys.truncate(self.recent_limit);
        self.overview.recently_visited = asset_overview::overview::recently_visited(
            &self.records,
            &self.recent_keys,
            self.recent_limit,
        );
        self.status_message = Some(format!("Visited {}", key));
        self.pending_visits.push(key);
    }

    fn selection_len(&self) -> usize {
        match self.current_page {
            Page::Overview => self.overview.sections[self.focused_section].items.len(),
            Page::Catalog => self.filtered.len(),
        }
    }

    fn selection_state(&mut self) -> &mut TableState {
        match self.current_page {
            Page::Overview => &mut self.section_states[self.focused_section],
            Page::Catalog => &mut self.catalog_state,
        }
    }

    pub fn next(&mut self) {
        let len = self.selection_len();
        if len == 0 {
            return;
        }
        let state = self.selection_state();
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.selection_len();
        if len == 0 {
            return;
        }
        let state = self.selection_state();
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if app.input_mode == InputMode::Search {
            match key.code {
                KeyCode::Enter => app.submit_search(),
                KeyCode::Esc => app.cancel_search(),
                KeyCode::Backspace => {
                    app.search_input.pop();
                }
                KeyCode::Char(c) => app.search_input.push(c),
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Char('/') => app.start_search(),
            KeyCode::Tab | KeyCode::BackTab => app.current_page = app.current_page.next(),
            KeyCode::Char('c') => {
                app.clear_filter();
                app.current_page = Page::Catalog;
            }
            KeyCode::Right | KeyCode::Char('l') if app.current_page == Page::Overview => {
                app.next_section()
            }
            KeyCode::Left | KeyCode::Char('h') if app.current_page == Page::Overview => {
                app.previous_section()
            }
            KeyCode::Enter => match app.current_page {
                Page::Overview => app.open_selected_entry(),
                Page::Catalog => app.visit_selected(),
            },
            KeyCode::Down | KeyCode::Char('j') => app.next(),
            KeyCode::Up | KeyCode::Char('k') => app.previous(),
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Greeting + navigation
            Constraint::Length(3), // Search box
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_search_box(f, chunks[1], app);

    match app.current_page {
        Page::Overview => render_overview(f, chunks[2], app),
        Page::Catalog => render_catalog(f, chunks[2], app),
    }

    render_status_bar(f, chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            app.overview.greeting,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
    ];

    for (i, page) in [Page::Overview, Page::Catalog].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        spans.push(Span::styled(page.title().to_string(), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Assets: {}", app.overview.total_assets),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_search_box(f: &mut Frame, area: Rect, app: &App) {
    let (text, style) = match app.input_mode {
        InputMode::Search => (
            format!("{}█", app.search_input),
            Style::default().fg(Color::Yellow),
        ),
        InputMode::Normal => (
            "Press / to search assets".to_string(),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ),
    };

    let search = Paragraph::new(Span::styled(text, style)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Search "),
    );

    f.render_widget(search, area);
}

fn render_overview(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(app.overview.recently_visited.len().clamp(1, 5) as u16 + 2),
            Constraint::Percentage(50),
            Constraint::Percentage(50),
        ])
        .split(area);

    render_recently_visited(f, rows[0], app);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);

    let areas = [top[0], top[1], bottom[0], bottom[1]];
    for (index, area) in areas.into_iter().enumerate() {
        render_section(f, area, app, index);
    }
}

fn render_recently_visited(f: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line> = if app.overview.recently_visited.is_empty() {
        vec![Line::from(Span::styled(
            "  No recently visited assets",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))]
    } else {
        app.overview
            .recently_visited
            .iter()
            .map(|recent| Line::from(vec![Span::raw("  "), Span::styled(recent.label.clone(), Style::default().fg(Color::Green))]))
            .collect()
    };

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Recently visited "),
    );

    f.render_widget(paragraph, area);
}

fn render_section(f: &mut Frame, area: Rect, app: &mut App, index: usize) {
    let focused = app.focused_section == index;
    let section = &app.overview.sections[index];

    let rows = section.items.iter().map(|item| {
        let mut label = truncate(&item.label, 40);
        if let Some(caption) = &item.caption {
            label = format!("{} ({})", label, truncate(caption, 24));
        }
        Row::new(vec![
            Cell::from(label),
            Cell::from(format!("{}", item.count)).style(Style::default().fg(Color::Cyan)),
        ])
    });

    let border = if focused { Color::Yellow } else { Color::White };
    let table = Table::new(rows, [Constraint::Min(10), Constraint::Length(8)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(format!(" {} ({}) ", section.title, section.items.len())),
        )
        .highlight_style(if focused {
            Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        })
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.section_states[index]);
}

fn render_catalog(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Asset", "Owners", "Compute kind", "Group", "Code location"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.filtered.iter().map(|record| {
        let cells = match &record.definition {
            Some(def) => vec![
                Cell::from(truncate(&record.key.to_user_string(), 40)),
                Cell::from(truncate(
                    &def.owners.iter().map(|o| o.identifier()).collect::<Vec<_>>().join(", "),
                    30,
                )),
                Cell::from(def.compute_kind().unwrap_or("-").to_string()),
                Cell::from(def.group_name().unwrap_or("-").to_string()),
                Cell::from(def.repository.to_human_string()),
            ],
            None => vec![
                Cell::from(truncate(&record.key.to_user_string(), 40)),
                Cell::from("(no definition)").style(Style::default().fg(Color::DarkGray)),
            ],
        };
        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(42),
            Constraint::Length(32),
            Constraint::Length(14),
            Constraint::Length(18),
            Constraint::Min(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" Assets - {} ", app.filter.describe())),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.catalog_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    if let Some(message) = &app.status_message {
        status_spans.push(Span::styled(format!(" {} ", message), Style::default().fg(Color::Green)));
        status_spans.push(Span::raw(" | "));
    }

    if app.current_page == Page::Overview {
        status_spans.push(Span::styled(
            format!(" {} ", app.focused_kind().title()),
            Style::default().fg(Color::Cyan),
        ));
        status_spans.push(Span::raw("| "));
    }

    if app.current_page == Page::Catalog {
        status_spans.push(Span::styled(
            format!(" {} of {} ", app.filtered.len(), app.records.len()),
            Style::default().fg(Color::Cyan),
        ));
        if !app.filter.is_empty() {
            status_spans.push(Span::raw(" ("));
            status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" clear) "));
        }
        status_spans.push(Span::raw("| "));
    }

    let hints: &[(&str, &str)] = match app.current_page {
        Page::Overview => &[("←/→", " Section | "), ("↑/↓", " Nav | "), ("Enter", " Open | ")],
        Page::Catalog => &[("↑/↓", " Nav | "), ("Enter", " Visit | ")],
    };
    for (key, label) in hints {
        status_spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(*label));
    }
    status_spans.push(Span::styled("/", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Search | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(Line::from(status_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset_overview::{AssetDefinition, Owner, RepoAddress};

    fn sample_app() -> App {
        let records = vec![
            AssetRecord::new(
                AssetKey::new(["warehouse", "orders"]),
                Some(AssetDefinition {
                    owners: vec![Owner::user("a@x.com")],
                    compute_kind: Some("pandas".to_string()),
                    group_name: Some("g1".to_string()),
                    repository: RepoAddress::new("R", "L"),
                }),
            ),
            AssetRecord::new(
                AssetKey::new(["warehouse", "customers"]),
                Some(AssetDefinition {
                    owners: vec![Owner::team("data")],
                    compute_kind: Some("dbt".to_string()),
                    group_name: None,
                    repository: RepoAddress::new("R", "L"),
                }),
            ),
            AssetRecord::new(AssetKey::new(["external", "feed"]), None),
        ];
        App::new(records, vec![AssetKey::new(["external", "feed"])], 5).unwrap()
    }

    #[test]
    fn test_new_app_starts_on_overview() {
        let app = sample_app();
        assert_eq!(app.current_page, Page::Overview);
        assert_eq!(app.filtered.len(), 3);
        assert_eq!(app.overview.recently_visited.len(), 1);
        assert_eq!(app.focused_kind(), SectionKind::Owners);
    }

    #[test]
    fn test_open_selected_owner_filters_catalog() {
        let mut app = sample_app();
        app.next(); // a@x.com -> data

        app.open_selected_entry();

        assert_eq!(app.current_page, Page::Catalog);
        assert_eq!(app.filter.owner.as_deref(), Some("data"));
        assert_eq!(app.filtered.len(), 1);
        assert_eq!(app.filtered[0].key, AssetKey::new(["warehouse", "customers"]));
    }

    #[test]
    fn test_open_selected_code_location() {
        let mut app = sample_app();
        app.previous_section(); // wraps to code locations

        assert_eq!(app.focused_kind(), SectionKind::CodeLocations);
        app.open_selected_entry();
        assert_eq!(app.filtered.len(), 2);
    }

    #[test]
    fn test_search_and_clear() {
        let mut app = sample_app();
        app.start_search();
        app.search_input.push_str("FEED");
        app.submit_search();

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.current_page, Page::Catalog);
        assert_eq!(app.filtered.len(), 1);

        app.clear_filter();
        assert_eq!(app.filtered.len(), 3);
        assert!(app.filter.is_empty());
    }

    #[test]
    fn test_visit_moves_asset_to_front() {
        let mut app = sample_app();
        app.current_page = Page::Catalog;

        app.visit_selected();

        let labels: Vec<&str> = app
            .overview
            .recently_visited
            .iter()
            .map(|r| r.label.as_str())
            .collect();
        assert_eq!(labels, vec!["warehouse/orders", "external/feed"]);
        assert_eq!(app.pending_visits, vec![AssetKey::new(["warehouse", "orders"])]);
    }

    #[test]
    fn test_visits_keep_recent_list_within_limit() {
        let mut app = sample_app();
        app.recent_limit = 2;
        app.current_page = Page::Catalog;

        for _ in 0..3 {
            app.visit_selected();
            app.next();
        }

        assert_eq!(app.recent_keys.len(), 2);
        assert_eq!(app.overview.recently_visited.len(), 2);
        assert_eq!(app.pending_visits.len(), 3);
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = sample_app();
        app.current_page = Page::Catalog;

        app.previous();
        assert_eq!(app.catalog_state.selected(), Some(2));
        app.next();
        assert_eq!(app.catalog_state.selected(), Some(0));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }
}
