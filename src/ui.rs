use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, BarChart, Block, Borders, Cell, Chart as LineChart, Dataset, GraphType, Paragraph, Row,
        Table, TableState, Wrap,
    },
    Frame, Terminal,
};
use spendalyzer::analysis::{run_analysis, AnalysisContext, AnalysisRequest, AnalysisType, MAX_RANKED, MIN_RANKED};
use spendalyzer::charts::{Bar, Chart, ChartBody, Series};
use spendalyzer::{Config, TransactionTable, ZipLookup};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Data,
    Analyses,
    Charts,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Data => Page::Analyses,
            Page::Analyses => Page::Charts,
            Page::Charts => Page::Data,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Data => Page::Charts,
            Page::Analyses => Page::Data,
            Page::Charts => Page::Analyses,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Data => "Data",
            Page::Analyses => "Analyses",
            Page::Charts => "Charts",
        }
    }
}

pub struct App {
    pub table: TransactionTable,
    pub state: TableState,
    pub current_page: Page,
    pub analysis_state: TableState,
    pub ranked: usize,
    pub zipcode: Option<String>,
    pub charts: Vec<Chart>,
    pub chart_index: usize,
    pub error: Option<String>,
    config: Config,
    zips: ZipLookup,
    training: Option<TransactionTable>,
}

impl App {
    pub fn new(
        table: TransactionTable,
        config: Config,
        zips: ZipLookup,
        training: Option<TransactionTable>,
        zipcode: Option<String>,
    ) -> Self {
        let mut state = TableState::default();
        if !table.is_empty() {
            state.select(Some(0));
        }

        let mut analysis_state = TableState::default();
        analysis_state.select(Some(0));

        Self {
            ranked: config.analysis.ranked.clamp(MIN_RANKED, MAX_RANKED),
            table,
            state,
            current_page: Page::Data,
            analysis_state,
            zipcode,
            charts: Vec::new(),
            chart_index: 0,
            error: None,
            config,
            zips,
            training,
        }
    }

    pub fn selected_analysis(&self) -> AnalysisType {
        let all = AnalysisType::all();
        all[self.analysis_state.selected().unwrap_or(0) % all.len()]
    }

    /// Run the highlighted analysis and switch to the chart page.
    pub fn run_selected(&mut self) {
        let request = AnalysisRequest {
            analysis: self.selected_analysis(),
            ranked: self.ranked,
            zipcode: self.zipcode.clone(),
        };
        let ctx = AnalysisContext::new(&self.config, &self.zips, self.training.as_ref());

        match run_analysis(&self.table, &request, &ctx) {
            Ok(charts) => {
                self.charts = charts;
                self.chart_index = 0;
                self.error = None;
                self.current_page = Page::Charts;
            }
            Err(e) => {
                tracing::warn!(error = %e, "analysis failed");
                self.error = Some(e.to_string());
            }
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn more_ranked(&mut self) {
        self.ranked = (self.ranked + 1).min(MAX_RANKED);
    }

    pub fn fewer_ranked(&mut self) {
        self.ranked = self.ranked.saturating_sub(1).max(MIN_RANKED);
    }

    pub fn next(&mut self) {
        match self.current_page {
            Page::Data => step(&mut self.state, self.table.len(), 1),
            Page::Analyses => step(&mut self.analysis_state, AnalysisType::all().len(), 1),
            Page::Charts => {
                if !self.charts.is_empty() {
                    self.chart_index = (self.chart_index + 1) % self.charts.len();
                }
            }
        }
    }

    pub fn previous(&mut self) {
        match self.current_page {
            Page::Data => step(&mut self.state, self.table.len(), -1),
            Page::Analyses => step(&mut self.analysis_state, AnalysisType::all().len(), -1),
            Page::Charts => {
                if !self.charts.is_empty() {
                    self.chart_index = (self.chart_index + self.charts.len() - 1) % self.charts.len();
                }
            }
        }
    }

    pub fn page_down(&mut self) {
        let len = self.table.len();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map(|i| (i + 20).min(len - 1)).unwrap_or(0);
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.state.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        self.state.select(Some(i));
    }
}

/// Move a wrapping selection by one row.
fn step(state: &mut TableState, len: usize, delta: isize) {
    if len == 0 {
        return;
    }
    let i = match state.selected() {
        Some(i) if delta > 0 => (i + 1) % len,
        Some(i) => (i + len - 1) % len,
        None => 0,
    };
    state.select(Some(i));
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

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
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
                KeyCode::Enter if app.current_page == Page::Analyses => app.run_selected(),
                KeyCode::Char('+') | KeyCode::Char('=') => app.more_ranked(),
                KeyCode::Char('-') => app.fewer_ranked(),
                KeyCode::Down | KeyCode::Char('j') | KeyCode::Right | KeyCode::Char('l') => app.next(),
                KeyCode::Up | KeyCode::Char('k') | KeyCode::Left | KeyCode::Char('h') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.state.select(Some(0)),
                KeyCode::End => {
                    if !app.table.is_empty() {
                        app.state.select(Some(app.table.len() - 1));
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
        Page::Data => render_table(f, chunks[1], app),
        Page::Analyses => render_analyses(f, chunks[1], app),
        Page::Charts => render_chart_page(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Data, Page::Analyses, Page::Charts];

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

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(app.table.filename.clone(), Style::default().fg(Color::White)));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Rows: {}", app.table.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Top/Bottom N: {}", app.ranked),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[String]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(h.clone()).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let titles: Vec<String> = ["Date", "Description", "Amount", "City/State", "Zip Code", "Category"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let rows = app.table.iter().map(|tx| {
        let color = if tx.amount < 0.0 { Color::Green } else { Color::Red };
        Row::new(vec![
            Cell::from(tx.date.format("%Y-%m-%d").to_string()),
            Cell::from(truncate(&tx.description, 30)),
            Cell::from(format!("{:.2}", tx.amount)).style(Style::default().fg(color)),
            Cell::from(truncate(&tx.city_state, 20)),
            Cell::from(tx.zip_code.clone()),
            Cell::from(truncate(&tx.category, 20)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(32),
            Constraint::Length(12),
            Constraint::Length(22),
            Constraint::Length(10),
            Constraint::Length(22),
        ],
    )
    .header(header_row(&titles))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Transactions "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_analyses(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = AnalysisType::all().into_iter().map(|t| Row::new(vec![Cell::from(t.name())]));

    let mut title = " Choose an analysis (Enter to run) ".to_string();
    if let Some(err) = &app.error {
        title = format!(" {} ", err);
    }

    let table = Table::new(rows, [Constraint::Min(40)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(title),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.analysis_state);
}

fn render_chart_page(f: &mut Frame, area: Rect, app: &App) {
    let Some(chart) = app.charts.get(app.chart_index) else {
        let hint = Paragraph::new("No charts yet. Pick an analysis on the Analyses page.")
            .block(Block::default().borders(Borders::ALL).title(" Charts "));
        f.render_widget(hint, area);
        return;
    };

    let title = format!(" {} ({}/{}) ", chart.title, app.chart_index + 1, app.charts.len());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title);

    match &chart.body {
        ChartBody::Bar { bars, .. } | ChartBody::Pie { slices: bars } => {
            let data = bar_data(bars);
            let refs: Vec<(&str, u64)> = data.iter().map(|(label, v)| (label.as_str(), *v)).collect();
            let widget = BarChart::default()
                .block(block)
                .data(refs.as_slice())
                .bar_width(12)
                .bar_gap(2)
                .bar_style(Style::default().fg(hex_color(bars.first().map(|b| b.color.as_str()).unwrap_or(""))))
                .value_style(Style::default().fg(Color::Black).bg(Color::White));
            f.render_widget(widget, area);
        }
        ChartBody::Line { series, x_label, y_label } => {
            let points: Vec<Vec<(f64, f64)>> = series.iter().map(line_data).collect();
            let (x_bounds, y_bounds) = bounds(&points);
            let datasets = series
                .iter()
                .zip(&points)
                .map(|(s, data)| {
                    Dataset::default()
                        .name(s.name.clone())
                        .marker(symbols::Marker::Braille)
                        .graph_type(GraphType::Line)
                        .style(Style::default().fg(hex_color(&s.color)))
                        .data(data)
                })
                .collect();

            let widget = LineChart::new(datasets)
                .block(block)
                .x_axis(
                    Axis::default()
                        .title(x_label.clone())
                        .bounds(x_bounds)
                        .labels(vec![Span::raw(day_label(x_bounds[0])), Span::raw(day_label(x_bounds[1]))]),
                )
                .y_axis(
                    Axis::default()
                        .title(y_label.clone())
                        .bounds(y_bounds)
                        .labels(vec![
                            Span::raw(format!("{:.0}", y_bounds[0])),
                            Span::raw(format!("{:.0}", y_bounds[1])),
                        ]),
                );
            f.render_widget(widget, area);
        }
        ChartBody::Table { header, rows, notes, .. } => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(notes_height(notes))])
                .split(area);

            let widths: Vec<Constraint> = header
                .iter()
                .map(|_| Constraint::Ratio(1, header.len().max(1) as u32))
                .collect();
            let body = rows
                .iter()
                .map(|r| Row::new(r.iter().map(|c| Cell::from(c.clone())).collect::<Vec<_>>()));
            let table = Table::new(body, widths).header(header_row(header)).block(block);
            f.render_widget(table, chunks[0]);

            let notes = Paragraph::new(notes.join("\n\n")).wrap(Wrap { trim: false });
            f.render_widget(notes, chunks[1]);
        }
        _ => {
            // the block already shows the title line
            let skip = usize::from(!chart.title.is_empty());
            let text: Vec<Line> = chart.summary().into_iter().skip(skip).map(Line::from).collect();
            let widget = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
            f.render_widget(widget, area);
        }
    }
}

fn notes_height(notes: &[String]) -> u16 {
    let lines: usize = notes.iter().map(|n| n.lines().count() + 1).sum();
    lines.min(12) as u16
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = match app.current_page {
        Page::Data => {
            let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
            vec![Span::styled(
                format!(" Row: {}/{} ", selected, app.table.len()),
                Style::default().fg(Color::Cyan),
            )]
        }
        Page::Analyses => vec![Span::styled(
            format!(" {} ", app.selected_analysis().name()),
            Style::default().fg(Color::Cyan),
        )],
        Page::Charts => vec![Span::styled(
            format!(" Chart: {}/{} ", (app.chart_index + 1).min(app.charts.len()), app.charts.len()),
            Style::default().fg(Color::Cyan),
        )],
    };

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Run | "));
    status_spans.push(Span::styled("+/-", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Rankings | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
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
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// "#004c6d" → RGB; anything else falls back to white.
fn hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 {
        return Color::White;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::White,
    }
}

/// Bar heights must be unsigned; negative totals draw as empty bars.
fn bar_data(bars: &[Bar]) -> Vec<(String, u64)> {
    bars.iter()
        .map(|b| (truncate(&b.label, 12), b.value.max(0.0).round() as u64))
        .collect()
}

/// Dates become day numbers so series with different dates share an axis.
fn line_data(series: &Series) -> Vec<(f64, f64)> {
    series
        .points
        .iter()
        .filter_map(|p| {
            NaiveDate::parse_from_str(&p.x, "%Y-%m-%d")
                .ok()
                .map(|d| (d.num_days_from_ce() as f64, p.y))
        })
        .collect()
}

fn bounds(series: &[Vec<(f64, f64)>]) -> ([f64; 2], [f64; 2]) {
    let mut x = [f64::MAX, f64::MIN];
    let mut y = [0.0_f64, f64::MIN];
    for (px, py) in series.iter().flatten() {
        x = [x[0].min(*px), x[1].max(*px)];
        y = [y[0].min(*py), y[1].max(*py)];
    }
    if x[0] > x[1] {
        return ([0.0, 1.0], [0.0, 1.0]);
    }
    if x[0] == x[1] {
        x[1] += 1.0;
    }
    if y[1] <= y[0] {
        y[1] = y[0] + 1.0;
    }
    (x, y)
}

fn day_label(day: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(day as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use spendalyzer::charts::Point;

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color("#004c6d"), Color::Rgb(0x00, 0x4c, 0x6d));
        assert_eq!(hex_color("nope"), Color::White);
    }

    #[test]
    fn test_bar_data_clamps_negative() {
        let bars = vec![
            Bar { label: "Refunds".to_string(), value: -20.0, color: "#004c6d".to_string() },
            Bar { label: "Groceries".to_string(), value: 120.4, color: "#155b79".to_string() },
        ];
        assert_eq!(bar_data(&bars), vec![("Refunds".to_string(), 0), ("Groceries".to_string(), 120)]);
    }

    #[test]
    fn test_line_data_and_bounds() {
        let series = Series {
            name: "Dining".to_string(),
            color: "#9f1853".to_string(),
            points: vec![
                Point { x: "2023-01-01".to_string(), y: 10.0, label: None },
                Point { x: "2023-01-03".to_string(), y: 30.0, label: None },
            ],
        };
        let data = line_data(&series);
        assert_eq!(data[1].0 - data[0].0, 2.0);

        let (x, y) = bounds(&[data]);
        assert_eq!(x[1] - x[0], 2.0);
        assert_eq!(y, [0.0, 30.0]);
        assert_eq!(day_label(x[0]), "2023-01-01");
    }

    #[test]
    fn test_page_cycle() {
        assert_eq!(Page::Data.next().next().next(), Page::Data);
        assert_eq!(Page::Data.previous(), Page::Charts);
    }
}
