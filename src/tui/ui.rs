//! Terminal UI for the watch dashboard
//!
//! Layout: header, two card rows, a page of charts, footer. Charts draw the
//! series as a line, matched incidents as red scatter points and orphan
//! incidents as vertical lines.

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};
use std::str::FromStr;

use crate::correlation::Correlator;
use crate::dashboard::{
    default_charts, CardStatus, ChartSpec, ChartView, DashboardCards, DashboardSnapshot, MetricCard,
};

/// Charts shown side by side on one page
pub const CHARTS_PER_PAGE: usize = 2;

/// Application state for the watch dashboard
pub struct WatchApp {
    pub snapshot: Option<DashboardSnapshot>,
    pub charts: Vec<ChartView>,
    pub cards: Option<DashboardCards>,
    pub last_update: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub page: usize,
    pub source_url: String,
    specs: Vec<ChartSpec>,
    correlator: Correlator,
}

impl WatchApp {
    pub fn new(source_url: String, correlator: Correlator) -> Self {
        Self {
            snapshot: None,
            charts: Vec::new(),
            cards: None,
            last_update: None,
            error_message: None,
            page: 0,
            source_url,
            specs: default_charts(),
            correlator,
        }
    }

    /// Replace the data and rebuild every chart
    pub fn apply_snapshot(&mut self, snapshot: DashboardSnapshot) {
        self.charts = snapshot.charts(&self.specs, &self.correlator);
        self.cards = snapshot.cards();
        self.snapshot = Some(snapshot);
        self.last_update = Some(Utc::now());
        self.error_message = None;
    }

    pub fn page_count(&self) -> usize {
        self.specs.len().div_ceil(CHARTS_PER_PAGE).max(1)
    }

    /// Handle keyboard input, returning true to quit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return true,
            KeyCode::Right | KeyCode::Char('l') => {
                self.page = (self.page + 1) % self.page_count();
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.page = (self.page + self.page_count() - 1) % self.page_count();
            }
            _ => {}
        }
        false
    }

    /// Render the UI
    pub fn render(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(4), // Cards
                Constraint::Min(10),   // Charts
                Constraint::Length(4), // Footer
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_cards(f, chunks[1]);
        self.render_charts(f, chunks[2]);
        self.render_footer(f, chunks[3]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let last_update = self
            .last_update
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "Never".to_string());

        let title = vec![
            Line::from(vec![
                Span::styled(
                    "GPU Metrics Dashboard",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  |  Source: "),
                Span::styled(self.source_url.as_str(), Style::default().fg(Color::Yellow)),
                Span::raw("  |  Last update: "),
                Span::styled(last_update, Style::default().fg(Color::Green)),
            ]),
            Line::from(Span::styled(
                format!(
                    "Press 'q' to quit | 'r' to refresh | '←/→' to page charts ({}/{})",
                    self.page + 1,
                    self.page_count()
                ),
                Style::default().fg(Color::DarkGray),
            )),
        ];

        let paragraph = Paragraph::new(title).block(Block::default().borders(Borders::ALL));
        f.render_widget(paragraph, area);
    }

    fn render_cards(&self, f: &mut Frame, area: Rect) {
        let lines = match &self.cards {
            Some(cards) => vec![card_line(&cards.critical), card_line(&cards.health)],
            None => vec![Line::from(Span::styled(
                "No metric samples yet",
                Style::default().fg(Color::DarkGray),
            ))],
        };

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Latest"),
        );
        f.render_widget(paragraph, area);
    }

    fn render_charts(&self, f: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, CHARTS_PER_PAGE as u32); CHARTS_PER_PAGE])
            .split(area);

        let start = self.page * CHARTS_PER_PAGE;
        for (slot, column) in columns.iter().enumerate() {
            match self.charts.get(start + slot) {
                Some(view) => render_chart(f, *column, view),
                None if slot == 0 => {
                    let paragraph = Paragraph::new("Waiting for data...")
                        .block(Block::default().borders(Borders::ALL));
                    f.render_widget(paragraph, *column);
                }
                None => {}
            }
        }
    }

    fn render_footer(&self, f: &mut Frame, area: Rect) {
        let content = if let Some(error) = &self.error_message {
            vec![
                Line::from(Span::styled(
                    format!("Error: {}", error),
                    Style::default().fg(Color::Red),
                )),
                Line::from(Span::styled(
                    "(retrying on next interval...)",
                    Style::default().fg(Color::Yellow),
                )),
            ]
        } else if let Some(snapshot) = &self.snapshot {
            let incident_errors: usize = snapshot.errors.iter().map(|g| g.count).sum();
            let latest_incident = snapshot
                .errors
                .last()
                .map(|g| g.label())
                .unwrap_or_else(|| "none".to_string());

            vec![Line::from(vec![
                Span::styled("Samples: ", Style::default().fg(Color::Cyan)),
                Span::raw(format_number(snapshot.metrics.len() as u64)),
                Span::raw("  |  "),
                Span::styled("Incidents: ", Style::default().fg(Color::Cyan)),
                Span::styled(
                    format!(
                        "{} ({} errors fetched)",
                        snapshot.errors.len(),
                        format_number(incident_errors as u64)
                    ),
                    if snapshot.errors.is_empty() {
                        Style::default().fg(Color::Green)
                    } else {
                        Style::default().fg(Color::Red)
                    },
                ),
                Span::raw("  |  "),
                Span::styled("Latest incident: ", Style::default().fg(Color::Cyan)),
                Span::raw(latest_incident),
                Span::raw("  |  "),
                Span::styled("Completed: ", Style::default().fg(Color::Cyan)),
                Span::raw(format_number(snapshot.total_requests.max(0) as u64)),
            ])]
        } else {
            vec![Line::from(Span::styled(
                "Waiting for the first snapshot...",
                Style::default().fg(Color::Yellow),
            ))]
        };

        let paragraph = Paragraph::new(content).block(Block::default().borders(Borders::ALL));
        f.render_widget(paragraph, area);
    }
}

fn card_line(cards: &[MetricCard]) -> Line<'static> {
    let mut spans = Vec::new();
    for (i, card) in cards.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  |  "));
        }
        spans.push(Span::styled(
            format!("{}: ", card.title),
            Style::default().fg(Color::Cyan),
        ));
        spans.push(Span::styled(
            card.display_value(),
            Style::default()
                .fg(status_color(card.status))
                .add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

fn status_color(status: CardStatus) -> Color {
    match status {
        CardStatus::Normal => Color::Green,
        CardStatus::Warning => Color::Yellow,
        CardStatus::Critical => Color::Red,
    }
}

fn x_of(t: DateTime<Utc>) -> f64 {
    t.timestamp_millis() as f64 / 1000.0
}

/// Plot data for a chart: (line, incident points, orphan x positions)
fn chart_data(view: &ChartView) -> (Vec<(f64, f64)>, Vec<(f64, f64)>, Vec<f64>) {
    let line = view.points.iter().map(|p| (x_of(p.timestamp), p.value)).collect();
    let incidents = view
        .incident_points()
        .map(|p| (x_of(p.timestamp), p.value))
        .collect();
    let orphans = view
        .orphans
        .iter()
        .map(|o| x_of(o.group.representative_time))
        .collect();
    (line, incidents, orphans)
}

/// Axis bounds: x spans points and orphans, y uses the fixed domain if any
fn chart_bounds(view: &ChartView, line: &[(f64, f64)], orphans: &[f64]) -> ([f64; 2], [f64; 2]) {
    let xs = line.iter().map(|(x, _)| *x).chain(orphans.iter().copied());
    let (x_min, x_max) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
        (lo.min(x), hi.max(x))
    });
    let x = if x_min.is_finite() {
        [x_min, if x_max > x_min { x_max } else { x_min + 1.0 }]
    } else {
        [0.0, 1.0]
    };

    let y = match view.spec.y_domain {
        Some((lo, hi)) => [lo, hi],
        None => {
            let hi = line.iter().map(|(_, y)| *y).fold(0.0, f64::max);
            [0.0, if hi > 0.0 { hi * 1.1 } else { 1.0 }]
        }
    };

    (x, y)
}

fn time_label(x: f64) -> String {
    DateTime::from_timestamp_millis((x * 1000.0) as i64)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

fn render_chart(f: &mut Frame, area: Rect, view: &ChartView) {
    let color = Color::from_str(&view.spec.color).unwrap_or(Color::Cyan);
    let (line, incidents, orphans) = chart_data(view);
    let (x_bounds, y_bounds) = chart_bounds(view, &line, &orphans);

    let orphan_lines: Vec<[(f64, f64); 2]> = orphans
        .iter()
        .map(|&x| [(x, y_bounds[0]), (x, y_bounds[1])])
        .collect();

    let mut datasets = vec![
        Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(color))
            .data(&line),
        Dataset::default()
            .name("incident")
            .marker(Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
            .data(&incidents),
    ];
    for segment in &orphan_lines {
        datasets.push(
            Dataset::default()
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Magenta))
                .data(segment),
        );
    }

    let unit = view.spec.unit.as_deref().unwrap_or("");
    let title = match line.last() {
        Some((_, latest)) => format!(" {}  {:.2}{} ", view.spec.title, latest, unit),
        None => format!(" {}  (no data) ", view.spec.title),
    };

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds(x_bounds)
                .labels(vec![
                    Span::raw(time_label(x_bounds[0])),
                    Span::raw(time_label(x_bounds[1])),
                ]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds(y_bounds)
                .labels(vec![
                    Span::raw(format!("{:.0}", y_bounds[0])),
                    Span::raw(format!("{:.0}", y_bounds[1])),
                ]),
        );

    f.render_widget(chart, area);
}

/// Format number with thousand separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let len = s.len();

    for (i, c) in s.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result
}
