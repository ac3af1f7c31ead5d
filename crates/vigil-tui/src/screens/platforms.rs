//! Platforms screen — per-adapter state with optimistic toggling.
//!
//! Space/Enter flips the selected platform. A toggle in flight marks the
//! platform pending: repeated presses are ignored until the request
//! settles, and `ToggleFinished` always clears the marker, so a platform
//! can never get stuck un-toggleable.

use std::collections::HashSet;
use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use tokio::sync::mpsc::UnboundedSender;

use vigil_core::{ComponentStatus, DashboardSnapshot};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::badge::badge_span;

/// Platforms screen state.
pub struct PlatformsScreen {
    focused: bool,
    snapshot: Arc<DashboardSnapshot>,
    selected: usize,
    /// Platforms with a toggle request in the air.
    pending: HashSet<String>,
}

impl PlatformsScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            snapshot: Arc::new(DashboardSnapshot::default()),
            selected: 0,
            pending: HashSet::new(),
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.snapshot.platforms.len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    /// Build the toggle action for the selected platform, unless one is
    /// already in flight for it.
    fn toggle_selected(&mut self) -> Option<Action> {
        let (name, status) = self.snapshot.platforms.get_index(self.selected)?;
        if self.pending.contains(name) {
            tracing::debug!(platform = %name, "toggle already pending; ignoring");
            return None;
        }
        self.pending.insert(name.clone());
        Some(Action::TogglePlatform {
            name: name.clone(),
            active: !status.active,
        })
    }
}

impl Component for PlatformsScreen {
    fn init(&mut self, _action_tx: UnboundedSender<Action>) -> Result<()> {
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Action::ScrollUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::ScrollDown),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected(),
            KeyCode::Char('r') => Some(Action::Refresh),
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::StateUpdated(snapshot) => {
                self.snapshot = Arc::clone(snapshot);
                self.clamp_selection();
            }
            Action::ScrollUp => {
                self.selected = self.selected.saturating_sub(1);
            }
            Action::ScrollDown => {
                self.selected += 1;
                self.clamp_selection();
            }
            Action::ToggleFinished { name, .. } => {
                self.pending.remove(name);
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Platforms ")
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

        if self.snapshot.platforms.is_empty() {
            frame.render_widget(
                Paragraph::new("  No platforms reported").style(theme::key_hint()),
                inner,
            );
            return;
        }

        let mut lines = vec![Line::from("")];
        for (i, (name, status)) in self.snapshot.platforms.iter().enumerate() {
            // Adapter connectivity maps onto the shared badge shape.
            let health = ComponentStatus {
                connected: status.connected,
                error: None,
            };

            let row_style = if i == self.selected && self.focused {
                theme::table_selected()
            } else {
                theme::table_row()
            };
            let active_label = if status.active { "active" } else { "inactive" };
            let active_style = if status.active {
                Style::default().fg(theme::SUCCESS_GREEN)
            } else {
                Style::default().fg(theme::BORDER_GRAY)
            };
            let pending_marker = if self.pending.contains(name) {
                Span::styled(" …", Style::default().fg(theme::AMBER))
            } else {
                Span::raw("")
            };

            lines.push(Line::from(vec![
                Span::styled(if i == self.selected { " ▶ " } else { "   " }, row_style),
                badge_span(Some(&health)),
                Span::styled(format!(" {name:<14}"), row_style),
                Span::styled(format!("{active_label:<9}"), active_style),
                pending_marker,
            ]));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("  Space ", theme::key_hint_key()),
            Span::styled("toggle  ", theme::key_hint()),
            Span::styled("j/k ", theme::key_hint_key()),
            Span::styled("select  ", theme::key_hint()),
            Span::styled("r ", theme::key_hint_key()),
            Span::styled("refresh", theme::key_hint()),
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
        "Platforms"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::PlatformStatus;

    fn screen_with_platforms() -> PlatformsScreen {
        let mut screen = PlatformsScreen::new();
        let mut snapshot = DashboardSnapshot::default();
        snapshot.platforms.insert(
            "telegram".into(),
            PlatformStatus {
                active: true,
                connected: Some(true),
            },
        );
        snapshot.platforms.insert(
            "discord".into(),
            PlatformStatus {
                active: false,
                connected: Some(false),
            },
        );
        screen.snapshot = Arc::new(snapshot);
        screen
    }

    #[test]
    fn toggle_flips_the_selected_platform() {
        let mut screen = screen_with_platforms();
        let action = screen.toggle_selected().expect("toggle action");
        match action {
            Action::TogglePlatform { name, active } => {
                assert_eq!(name, "telegram");
                assert!(!active);
            }
            other => panic!("wrong action: {other:?}"),
        }
    }

    #[test]
    fn repeated_toggles_coalesce_until_the_request_settles() {
        let mut screen = screen_with_platforms();
        assert!(screen.toggle_selected().is_some());
        // Second press while pending: ignored.
        assert!(screen.toggle_selected().is_none());

        // Settling always clears the marker, even on failure.
        screen
            .update(&Action::ToggleFinished {
                name: "telegram".into(),
                error: Some("backend rejected".into()),
            })
            .expect("update");
        assert!(screen.toggle_selected().is_some());
    }

    #[test]
    fn selection_clamps_when_the_platform_list_shrinks() {
        let mut screen = screen_with_platforms();
        screen.selected = 1;

        let mut snapshot = DashboardSnapshot::default();
        snapshot.platforms.insert(
            "telegram".into(),
            PlatformStatus {
                active: true,
                connected: None,
            },
        );
        screen
            .update(&Action::StateUpdated(Arc::new(snapshot)))
            .expect("update");
        assert_eq!(screen.selected, 0);
    }
}
