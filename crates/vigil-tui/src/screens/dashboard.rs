//! Dashboard screen — system overview, the home screen.
//!
//! Layout:
//! ┌─ Database ────┐  ┌─ Interactions ──────────────────┐
//! │ counter totals │  │ timeline sparkline              │
//! │ 24h activity   │  └─────────────────────────────────┘
//! └───────────────┘  ┌─ Per Platform ──────────────────┐
//! ┌─ Services ────┐  │ distribution bars               │
//! │ vault / brain  │  └─────────────────────────────────┘
//! │ health badges  │  ┌─ Sentiment ─────────────────────┐
//! └───────────────┘  └─────────────────────────────────┘

use std::sync::Arc;
use std::time::Instant;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::symbols;
use ratatui::widgets::{
    Axis, Bar, BarChart, BarGroup, Block, BorderType, Borders, Chart, Dataset, GraphType,
    Paragraph,
};
use tokio::sync::mpsc::UnboundedSender;

use vigil_core::DashboardSnapshot;

use crate::action::Action;
use crate::charts::{self, ChartKind, ChartSurface};
use crate::component::Component;
use crate::theme;
use crate::widgets::badge::{Badge, badge_span};

/// Dashboard screen state.
pub struct DashboardScreen {
    focused: bool,
    snapshot: Arc<DashboardSnapshot>,
    charts: ChartSurface,
    /// Tracks when we last received a state update (for the title bar).
    last_data_update: Option<Instant>,
}

impl DashboardScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            snapshot: Arc::new(DashboardSnapshot::default()),
            charts: ChartSurface::new(),
            last_data_update: None,
        }
    }

    /// Format the data age as a human-readable string for the title bar.
    fn refresh_age_str(&self) -> String {
        match self.last_data_update {
            Some(t) => {
                let secs = t.elapsed().as_secs();
                if secs < 5 {
                    "just now".into()
                } else if secs < 60 {
                    format!("{secs}s ago")
                } else {
                    format!("{}m ago", secs / 60)
                }
            }
            None => "no data".into(),
        }
    }

    /// Rebind chart models from the sections this snapshot carries.
    /// Absent sections keep their previously bound model.
    fn rebind_charts(&mut self) {
        if let Some(ref stats) = self.snapshot.platform_stats {
            self.charts
                .bind(ChartKind::PlatformDistribution, charts::distribution_model(stats));
        }
        if let Some(ref timeline) = self.snapshot.timeline {
            self.charts
                .bind(ChartKind::Timeline, charts::timeline_model(timeline));
        }
        if let Some(ref sentiment) = self.snapshot.sentiment {
            self.charts
                .bind(ChartKind::Sentiment, charts::sentiment_model(sentiment));
        }
    }

    /// Render the Database panel (top-left).
    fn render_database(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Database ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());

        let inner = block.inner(area);
        frame.render_widget(block, area);

        // `None` renders as a dash, never as zero.
        let fmt = |v: Option<u64>| v.map_or_else(|| "─".into(), |v| v.to_string());
        let db = self.snapshot.database;
        let activity = self.snapshot.recent_activity;

        let lines = vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("  Users         ", Style::default().fg(theme::DIM_WHITE)),
                Span::styled(
                    fmt(db.map(|d| d.users)),
                    Style::default()
                        .fg(theme::ACCENT_BLUE)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::styled("  Interactions  ", Style::default().fg(theme::DIM_WHITE)),
                Span::styled(
                    fmt(db.map(|d| d.interactions)),
                    Style::default()
                        .fg(theme::TEAL)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::styled("  Memories      ", Style::default().fg(theme::DIM_WHITE)),
                Span::styled(
                    fmt(db.map(|d| d.memories)),
                    Style::default()
                        .fg(theme::MAGENTA)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "  Last 24h",
                Style::default().fg(theme::ACCENT_BLUE),
            )),
            Line::from(vec![
                Span::styled("    Interactions ", Style::default().fg(theme::DIM_WHITE)),
                Span::styled(
                    fmt(activity.map(|a| a.interactions_24h)),
                    Style::default().fg(theme::DIM_WHITE),
                ),
            ]),
            Line::from(vec![
                Span::styled("    Active users ", Style::default().fg(theme::DIM_WHITE)),
                Span::styled(
                    fmt(activity.map(|a| a.active_users_24h)),
                    Style::default().fg(theme::DIM_WHITE),
                ),
            ]),
        ];

        frame.render_widget(Paragraph::new(lines), inner);
    }

    /// Render the Services panel (bottom-left): vault and brain badges.
    fn render_services(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Services ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut lines = vec![Line::from("")];
        for (name, status) in [
            ("Vault", self.snapshot.vault.as_ref()),
            ("Brain", self.snapshot.brain.as_ref()),
        ] {
            let badge = Badge::classify(status);
            lines.push(Line::from(vec![
                Span::raw("  "),
                badge_span(status),
                Span::styled(
                    format!(" {name:<6}"),
                    Style::default().fg(theme::DIM_WHITE),
                ),
                Span::styled(badge.label(), Style::default().fg(badge.color())),
            ]));
            // Show the error detail under a failed badge.
            if badge == Badge::Failed {
                if let Some(err) = status.and_then(|s| s.error.as_deref()) {
                    let detail: String = err.chars().take(24).collect();
                    lines.push(Line::from(Span::styled(
                        format!("      {detail}"),
                        Style::default().fg(theme::ERROR_RED),
                    )));
                }
            }
        }

        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("  r ", theme::key_hint_key()),
            Span::styled("refresh  ", theme::key_hint()),
            Span::styled("v ", theme::key_hint_key()),
            Span::styled("sync vault", theme::key_hint()),
        ]));
        lines.push(Line::from(vec![
            Span::styled("  m ", theme::key_hint_key()),
            Span::styled("memory   ", theme::key_hint()),
            Span::styled("e ", theme::key_hint_key()),
            Span::styled("export", theme::key_hint()),
        ]));

        frame.render_widget(Paragraph::new(lines), inner);
    }

    /// Render the Interactions timeline as a connected line (top-right).
    fn render_timeline(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Interactions ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let model = self.charts.get(ChartKind::Timeline);
        let Some(model) = model.filter(|m| !m.is_empty()) else {
            frame.render_widget(
                Paragraph::new("  No timeline data").style(theme::key_hint()),
                inner,
            );
            return;
        };

        #[allow(clippy::cast_precision_loss)]
        let points: Vec<(f64, f64)> = model
            .values
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, v as f64))
            .collect();
        #[allow(clippy::cast_precision_loss)]
        let x_max = (points.len().saturating_sub(1)).max(1) as f64;
        #[allow(clippy::cast_precision_loss)]
        let y_max = model.max_value().max(1) as f64;

        let dataset = Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(theme::TEAL))
            .data(&points);

        let x_labels: Vec<Span> = model
            .labels
            .first()
            .zip(model.labels.last())
            .map(|(first, last)| {
                vec![
                    Span::styled(first.clone(), theme::key_hint()),
                    Span::styled(last.clone(), theme::key_hint()),
                ]
            })
            .unwrap_or_default();

        let chart = Chart::new(vec![dataset])
            .x_axis(
                Axis::default()
                    .bounds([0.0, x_max])
                    .labels(x_labels)
                    .style(Style::default().fg(theme::BORDER_GRAY)),
            )
            .y_axis(
                Axis::default()
                    .bounds([0.0, y_max])
                    .labels(vec![
                        Span::styled("0", theme::key_hint()),
                        Span::styled(model.max_value().to_string(), theme::key_hint()),
                    ])
                    .style(Style::default().fg(theme::BORDER_GRAY)),
            );
        frame.render_widget(chart, inner);
    }

    /// Render the per-platform distribution bar chart (mid-right).
    fn render_distribution(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Per Platform ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(model) = self.charts.get(ChartKind::PlatformDistribution) else {
            frame.render_widget(
                Paragraph::new("  No platform data").style(theme::key_hint()),
                inner,
            );
            return;
        };

        let bars: Vec<Bar> = model
            .labels
            .iter()
            .zip(&model.values)
            .enumerate()
            .map(|(i, (label, &value))| {
                let color = theme::CHART_SERIES[i % theme::CHART_SERIES.len()];
                Bar::default()
                    .label(Line::from(label.clone()))
                    .value(value)
                    .style(Style::default().fg(color))
            })
            .collect();

        let chart = BarChart::default()
            .data(BarGroup::default().bars(&bars))
            .bar_width(9)
            .bar_gap(1);
        frame.render_widget(chart, inner);
    }

    /// Render the sentiment split (bottom-right).
    fn render_sentiment(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Sentiment ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(model) = self.charts.get(ChartKind::Sentiment) else {
            frame.render_widget(
                Paragraph::new("  No sentiment data").style(theme::key_hint()),
                inner,
            );
            return;
        };

        let total = model.total().max(1);
        let colors = [theme::SUCCESS_GREEN, theme::AMBER, theme::ERROR_RED];
        let bar_width = usize::from(inner.width.saturating_sub(26));

        let lines: Vec<Line> = model
            .labels
            .iter()
            .zip(&model.values)
            .zip(colors)
            .map(|((label, &value), color)| {
                let bar: String = "█".repeat(scaled_width(value, total, bar_width));
                Line::from(vec![
                    Span::styled(
                        format!("  {label:<9}"),
                        Style::default().fg(theme::DIM_WHITE),
                    ),
                    Span::styled(bar, Style::default().fg(color)),
                    Span::styled(format!(" {value}"), Style::default().fg(color)),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), inner);
    }
}

impl Component for DashboardScreen {
    fn init(&mut self, _action_tx: UnboundedSender<Action>) -> Result<()> {
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('v') => Some(Action::SyncVault),
            KeyCode::Char('m') => Some(Action::OpenMemoryInput),
            KeyCode::Char('e') => Some(Action::ExportAnalytics { days: 7 }),
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::StateUpdated(snapshot) = action {
            self.snapshot = Arc::clone(snapshot);
            self.last_data_update = Some(Instant::now());
            self.rebind_charts();
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let refresh_str = self.refresh_age_str();
        let title_line = Line::from(vec![
            Span::styled(" Vigil Dashboard ", theme::title_style()),
            Span::styled(
                format!(" [{refresh_str}] "),
                Style::default().fg(theme::BORDER_GRAY),
            ),
        ]);

        let block = Block::default()
            .title(title_line)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });

        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.width < 40 || inner.height < 10 {
            // Minimal mode — just show a summary line
            let interactions = self
                .snapshot
                .database
                .map_or_else(|| "─".into(), |d| d.interactions.to_string());
            let summary = format!(
                "Interactions: {interactions} │ Platforms: {}",
                self.snapshot.platforms.len()
            );
            frame.render_widget(Paragraph::new(summary).style(theme::table_row()), inner);
            return;
        }

        // Two-column layout: left (counters/services) | right (charts)
        let left_width = 26u16.min(inner.width / 3);
        let columns =
            Layout::horizontal([Constraint::Length(left_width), Constraint::Min(30)]).split(inner);

        let left = Layout::vertical([Constraint::Length(11), Constraint::Min(8)]).split(columns[0]);
        self.render_database(frame, left[0]);
        self.render_services(frame, left[1]);

        let right = Layout::vertical([
            Constraint::Length(7), // Timeline
            Constraint::Min(8),   // Distribution
            Constraint::Length(5), // Sentiment
        ])
        .split(columns[1]);

        self.render_timeline(frame, right[0]);
        self.render_distribution(frame, right[1]);
        self.render_sentiment(frame, right[2]);
    }

    fn focused(&self) -> bool {
        self.focused
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &str {
        "Dashboard"
    }
}

/// Proportional bar fill for one category out of `total`.
///
/// The product is computed in u128 so counters near u64::MAX cannot
/// overflow, and the result never exceeds the available width.
fn scaled_width(value: u64, total: u64, width: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let filled = u128::from(value) * (width as u128) / u128::from(total);
    usize::try_from(filled).unwrap_or(width).min(width)
}
