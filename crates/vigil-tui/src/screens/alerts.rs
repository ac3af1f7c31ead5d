//! Alerts screen — rolling log of backend alerts.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use tokio::sync::mpsc::UnboundedSender;

use vigil_core::{Alert, AlertLevel};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

/// Alerts kept in the log before the oldest are dropped.
const MAX_ALERTS: usize = 200;

/// Alerts screen state.
pub struct AlertsScreen {
    focused: bool,
    alerts: Vec<Alert>,
    /// Lines scrolled up from the tail. 0 = follow newest.
    scroll_back: usize,
}

impl AlertsScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            alerts: Vec::new(),
            scroll_back: 0,
        }
    }

    fn level_color(level: AlertLevel) -> ratatui::style::Color {
        match level {
            AlertLevel::Info => theme::ACCENT_BLUE,
            AlertLevel::Warning => theme::AMBER,
            AlertLevel::Danger => theme::ERROR_RED,
        }
    }
}

impl Component for AlertsScreen {
    fn init(&mut self, _action_tx: UnboundedSender<Action>) -> Result<()> {
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Action::ScrollUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::ScrollDown),
            KeyCode::Char('c') => Some(Action::ClearAlerts),
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::AlertReceived(alert) => {
                self.alerts.push(alert.clone());
                if self.alerts.len() > MAX_ALERTS {
                    self.alerts.remove(0);
                }
            }
            Action::ClearAlerts => {
                self.alerts.clear();
                self.scroll_back = 0;
            }
            Action::ScrollUp => {
                self.scroll_back = (self.scroll_back + 1).min(self.alerts.len());
            }
            Action::ScrollDown => {
                self.scroll_back = self.scroll_back.saturating_sub(1);
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let title = format!(" Alerts ({}) ", self.alerts.len());
        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });

        let inner = block.inner(area);
        frame.render_widget(block, area);

        if self.alerts.is_empty() {
            frame.render_widget(
                Paragraph::new("  No alerts").style(theme::key_hint()),
                inner,
            );
            return;
        }

        let max_rows = inner.height.saturating_sub(1) as usize;
        let visible: Vec<_> = self
            .alerts
            .iter()
            .rev()
            .skip(self.scroll_back)
            .take(max_rows)
            .collect();

        let mut lines = Vec::with_capacity(visible.len() + 1);
        for alert in visible {
            let time_str = alert.received_at.format("%H:%M:%S").to_string();
            let color = Self::level_color(alert.level);
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {time_str}  "),
                    Style::default().fg(theme::BORDER_GRAY),
                ),
                Span::styled("▪ ", Style::default().fg(color)),
                Span::styled(alert.message.clone(), Style::default().fg(color)),
            ]));
        }

        lines.push(Line::from(vec![
            Span::styled("  j/k ", theme::key_hint_key()),
            Span::styled("scroll  ", theme::key_hint()),
            Span::styled("c ", theme::key_hint_key()),
            Span::styled("clear", theme::key_hint()),
        ]));

        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn focused(&self) -> bool {
        self.focused
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &str {
        "Alerts"
    }
}
