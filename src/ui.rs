// 🖥️ Terminal dashboard - overview, company list and company detail pages

use anyhow::Result;
use company_insights::aggregator::unique_by_id;
use company_insights::classifier::classify;
use company_insights::config::InsightsConfig;
use company_insights::loader::{load_datasets, Datasets, LoadOptions};
use company_insights::render::{stage_legend, RenderContext};
use company_insights::format::CurrencyFormat;
use company_insights::report::{
    CompanyDetailReport, CompanySummary, Counterparty, DashboardReport, MISSING,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        block::{Position, Title},
        Axis, BarChart, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table,
        TableState,
    },
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Overview,
    Companies,
    Detail,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Overview => Page::Companies,
            Page::Companies => Page::Detail,
            Page::Detail => Page::Overview,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Overview => Page::Detail,
            Page::Companies => Page::Overview,
            Page::Detail => Page::Companies,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Overview => "Overview",
            Page::Companies => "Companies",
            Page::Detail => "Company Detail",
        }
    }
}

pub struct App {
    pub config: InsightsConfig,
    pub data: Datasets,
    pub dashboard: DashboardReport,
    pub detail: Option<CompanyDetailReport>,
    /// Distinct companies, classified, in file order
    pub companies: Vec<CompanySummary>,
    pub state: TableState,
    pub current_page: Page,
    pub render: RenderContext,
    pub status: Option<String>,
}

impl App {
    pub fn new(config: InsightsConfig, data: Datasets) -> Self {
        let mut render = RenderContext::new(config.currency.clone());
        let dashboard = DashboardReport::from_datasets(&data, &config.limits);
        render.render_dashboard(&dashboard);

        let mut app = Self {
            companies: Vec::new(),
            dashboard,
            detail: None,
            state: TableState::default(),
            current_page: Page::Overview,
            render,
            status: None,
            config,
            data,
        };
        app.sync_companies();
        app
    }

    /// Rebuild every report from the loaded data and re-mount the charts.
    /// The current page does not change.
    fn refresh(&mut self) {
        self.dashboard = DashboardReport::from_datasets(&self.data, &self.config.limits);
        self.render.render_dashboard(&self.dashboard);
        self.sync_companies();

        if let Some(id) = self.detail.as_ref().map(|d| d.id.clone()) {
            self.mount_detail(&id);
        }
    }

    /// Company list and selection from the loaded data.
    fn sync_companies(&mut self) {
        let classified = classify(&self.data.companies);
        self.companies = unique_by_id(&classified)
            .into_iter()
            .map(CompanySummary::from)
            .collect();

        if self.companies.is_empty() {
            self.state.select(None);
        } else {
            let i = self.state.selected().unwrap_or(0).min(self.companies.len() - 1);
            self.state.select(Some(i));
        }
    }

    /// Re-read both files from disk. On failure the previous data stays.
    pub fn reload(&mut self) {
        let options = LoadOptions::with_delimiter(self.config.delimiter);
        match load_datasets(&self.config.data, &options) {
            Ok(data) => {
                self.data = data;
                self.refresh();
                self.status = Some(format!(
                    "Reloaded {} companies, {} transactions",
                    self.data.companies.len(),
                    self.data.transactions.len()
                ));
            }
            Err(e) => {
                log::warn!("Reload failed: {}", e);
                self.status = Some(format!("Reload failed: {}", e));
            }
        }
    }

    pub fn open_detail(&mut self, id: &str) {
        self.mount_detail(id);
        self.current_page = Page::Detail;
    }

    fn mount_detail(&mut self, id: &str) {
        let report = CompanyDetailReport::from_datasets(id, &self.data, &self.config.limits);
        self.render.render_detail(&report);
        self.detail = Some(report);
    }

    pub fn open_selected(&mut self) {
        if let Some(id) = self.selected_company().map(|c| c.id.clone()) {
            self.open_detail(&id);
        }
    }

    pub fn selected_company(&self) -> Option<&CompanySummary> {
        self.state.selected().and_then(|i| self.companies.get(i))
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.companies.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.companies.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.companies.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + 20).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.state.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        self.state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('r') => app.reload(),
                KeyCode::Enter if app.current_page == Page::Companies => app.open_selected(),
                KeyCode::Backspace if app.current_page == Page::Detail => {
                    app.current_page = Page::Companies;
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.state.select(Some(0)),
                KeyCode::End => {
                    if !app.companies.is_empty() {
                        app.state.select(Some(app.companies.len() - 1));
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Overview => render_overview(f, chunks[1], app),
        Page::Companies => render_companies(f, chunks[1], app),
        Page::Detail => render_detail(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn header_style() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

fn stage_color(stage: &str) -> Color {
    match stage {
        "Decline" => Color::Red,
        "Startup" => Color::Cyan,
        "Expansion" => Color::Yellow,
        "Mature" => Color::Green,
        _ => Color::White,
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Overview, Page::Companies, Page::Detail];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    let kpis = &app.dashboard.kpis;
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Companies: {}", kpis.total_companies),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("At risk: {}", kpis.at_risk),
        Style::default().fg(Color::Red),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Growth: {}", kpis.growth_label),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_overview(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    // Lifecycle stages
    if let Some(chart) = app.render.stages.current() {
        let bars: Vec<(&str, u64)> = chart
            .series
            .iter()
            .map(|p| (p.label.as_str(), p.value.max(0.0) as u64))
            .collect();
        let legend = stage_legend(&app.dashboard).join("  ");
        let widget = BarChart::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", chart.title))
                    .title(Title::from(legend).position(Position::Bottom)),
            )
            .bar_width(11)
            .bar_gap(2)
            .bar_style(Style::default().fg(Color::Cyan))
            .value_style(Style::default().fg(Color::Black).bg(Color::Cyan))
            .data(bars.as_slice());
        f.render_widget(widget, charts[0]);
    }

    // Volume by transaction type
    if let Some(chart) = app.render.volume.current() {
        let currency = &app.render.currency;
        let header = Row::new(["Type", "Total"].iter().map(|h| Cell::from(*h).style(header_style())))
            .style(Style::default().bg(Color::DarkGray));
        let rows = chart.series.iter().map(|p| {
            let color = if p.value < 0.0 { Color::Red } else { Color::Green };
            Row::new(vec![
                Cell::from(truncate(&p.label, 24)),
                Cell::from(currency.format(Some(p.value))).style(Style::default().fg(color)),
            ])
        });
        let table = Table::new(rows, [Constraint::Length(26), Constraint::Min(18)])
            .header(header)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", chart.title)),
            );
        f.render_widget(table, charts[1]);
    }

    // Featured companies, two columns
    let featured = &app.dashboard.featured;
    let half = (featured.len() + 1) / 2;
    let mut lines = vec![Line::from("")];
    for i in 0..half {
        let mut spans = vec![Span::raw("  🏢 ")];
        spans.push(company_span(&featured[i * 2]));
        if let Some(right) = featured.get(i * 2 + 1) {
            spans.push(Span::raw("    🏢 "));
            spans.push(company_span(right));
        }
        lines.push(Line::from(spans));
    }

    let list = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Companies "),
    );
    f.render_widget(list, rows[1]);
}

fn company_span(company: &CompanySummary) -> Span<'static> {
    Span::styled(
        format!(
            "{:<20} {:<30}",
            truncate(&company.id, 20),
            truncate(company.sector.as_deref().unwrap_or(MISSING), 30)
        ),
        Style::default().fg(Color::White),
    )
}

fn render_companies(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Company", "Sector", "Stage"]
        .iter()
        .map(|h| Cell::from(*h).style(header_style()));

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.companies.iter().map(|c| {
        let stage = c.lifecycle.map(|s| s.label()).unwrap_or(MISSING);
        Row::new(vec![
            Cell::from(c.id.clone()),
            Cell::from(truncate(c.sector.as_deref().unwrap_or(MISSING), 48)),
            Cell::from(stage).style(Style::default().fg(stage_color(stage))),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(22),
            Constraint::Length(50),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Companies "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail(f: &mut Frame, area: Rect, app: &App) {
    let report = match &app.detail {
        Some(r) => r,
        None => {
            let empty = Paragraph::new("  No company selected. Pick one on the Companies page.")
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Yellow))
                        .title(" Company Detail "),
                );
            f.render_widget(empty, area);
            return;
        }
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Percentage(50),
            Constraint::Min(0),
        ])
        .split(area);

    let currency = &app.render.currency;
    let cards = report.cards(currency);
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let card_lines = vec![
        Line::from(vec![
            Span::styled(format!("  {} ", report.id), header_style()),
            Span::raw(format!("  CNAE: {}", cards.sector)),
        ]),
        Line::from(vec![
            Span::styled("  Balance: ", label),
            Span::raw(cards.balance),
            Span::styled("   Avg net flow: ", label),
            Span::raw(cards.average_net_flow),
            Span::styled("   Stage: ", label),
            Span::styled(cards.lifecycle.clone(), Style::default().fg(stage_color(&cards.lifecycle))),
        ]),
    ];
    f.render_widget(
        Paragraph::new(card_lines).block(Block::default().borders(Borders::ALL)),
        rows[0],
    );

    if let Some(chart) = app.render.net_flow.current() {
        let points: Vec<(f64, f64)> = chart
            .series
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, p.value))
            .collect();
        let x_labels: Vec<Span> = match (chart.series.first(), chart.series.last()) {
            (Some(first), Some(last)) => vec![Span::raw(first.label.clone()), Span::raw(last.label.clone())],
            _ => vec![],
        };
        let (min, max) = (chart.min_value(), chart.max_value());
        let dataset = Dataset::default()
            .name("Net flow")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Red))
            .data(&points);
        let widget = Chart::new(vec![dataset])
            .block(Block::default().borders(Borders::ALL).title(format!(" {} ", chart.title)))
            .x_axis(
                Axis::default()
                    .bounds([0.0, (points.len().max(2) - 1) as f64])
                    .labels(x_labels),
            )
            .y_axis(
                Axis::default()
                    .bounds([min, max.max(min + 1.0)])
                    .labels(vec![
                        Span::raw(currency.format(Some(min))),
                        Span::raw(currency.format(Some(max))),
                    ]),
            );
        f.render_widget(widget, rows[1]);
    }

    let tables = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[2]);

    let rel_header = Row::new(
        ["Counterparty", "Name", "Total", "Negated"]
            .iter()
            .map(|h| Cell::from(*h).style(header_style())),
    )
    .style(Style::default().bg(Color::DarkGray));
    let rel_rows = report.counterparties.iter().map(|c| {
        let [id, name, total, negated] = relationship_cells(c, currency);
        Row::new(vec![
            Cell::from(id),
            Cell::from(name),
            Cell::from(total).style(Style::default().fg(Color::Green)),
            Cell::from(negated).style(Style::default().fg(Color::Red)),
        ])
    });
    let rel = Table::new(
        rel_rows,
        [
            Constraint::Length(20),
            Constraint::Length(6),
            Constraint::Length(18),
            Constraint::Min(18),
        ],
    )
    .header(rel_header)
    .block(Block::default().borders(Borders::ALL).title(" Main relationships "));
    f.render_widget(rel, tables[0]);

    let sim_header = Row::new(["Company", "Stage"].iter().map(|h| Cell::from(*h).style(header_style())))
        .style(Style::default().bg(Color::DarkGray));
    let sim_rows = report.similar.iter().map(|c| {
        let stage = c.lifecycle.map(|s| s.label()).unwrap_or(MISSING);
        Row::new(vec![
            Cell::from(c.id.clone()),
            Cell::from(stage).style(Style::default().fg(stage_color(stage))),
        ])
    });
    let sim = Table::new(sim_rows, [Constraint::Length(20), Constraint::Length(12)])
        .header(sim_header)
        .block(Block::default().borders(Borders::ALL).title(" Similar companies "));
    f.render_widget(sim, tables[1]);
}

/// Relationship row: identifier, name placeholder, total and negated total.
fn relationship_cells(counterparty: &Counterparty, currency: &CurrencyFormat) -> [String; 4] {
    [
        counterparty.id.clone(),
        MISSING.to_string(),
        currency.format(Some(counterparty.total)),
        currency.format(Some(-counterparty.total)),
    ]
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.companies.len();

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(status) = &app.status {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(status.clone(), Style::default().fg(Color::Green)));
    }

    for (key, action) in [
        ("Enter", " Open"),
        ("Tab", " Page"),
        ("↑/↓", " Nav"),
        ("r", " Reload"),
    ] {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(action));
    }
    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
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
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
