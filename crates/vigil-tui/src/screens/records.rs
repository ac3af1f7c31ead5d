//! Records screen — paged backend tables (interactions, users, memories).
//!
//! Rows are fetched on demand, never via the mirror: each view loads the
//! first time it is shown and again on 'r'. A fetch in flight marks the
//! view loading so repeated requests coalesce, and the completion action
//! always clears the marker.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use tokio::sync::mpsc::UnboundedSender;

use vigil_core::{InteractionRecord, MemoryRecord, UserRecord};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

/// Which backend table the screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordView {
    Interactions,
    Users,
    Memories,
}

impl RecordView {
    const ALL: [RecordView; 3] = [Self::Interactions, Self::Users, Self::Memories];

    pub fn label(self) -> &'static str {
        match self {
            Self::Interactions => "Interactions",
            Self::Users => "Users",
            Self::Memories => "Memories",
        }
    }

    fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&v| v == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|&v| v == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Fetched rows for one view.
#[derive(Debug, Clone)]
pub enum RecordRows {
    Interactions(Vec<InteractionRecord>),
    Users(Vec<UserRecord>),
    Memories(Vec<MemoryRecord>),
}

/// Records screen state.
pub struct RecordsScreen {
    focused: bool,
    view: RecordView,
    interactions: Option<Vec<InteractionRecord>>,
    users: Option<Vec<UserRecord>>,
    memories: Option<Vec<MemoryRecord>>,
    /// View with a fetch in the air, if any.
    loading: Option<RecordView>,
    scroll: usize,
    action_tx: Option<UnboundedSender<Action>>,
}

impl RecordsScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            view: RecordView::Interactions,
            interactions: None,
            users: None,
            memories: None,
            loading: None,
            scroll: 0,
            action_tx: None,
        }
    }

    fn has_rows(&self, view: RecordView) -> bool {
        match view {
            RecordView::Interactions => self.interactions.is_some(),
            RecordView::Users => self.users.is_some(),
            RecordView::Memories => self.memories.is_some(),
        }
    }

    fn row_count(&self) -> usize {
        match self.view {
            RecordView::Interactions => self.interactions.as_ref().map_or(0, Vec::len),
            RecordView::Users => self.users.as_ref().map_or(0, Vec::len),
            RecordView::Memories => self.memories.as_ref().map_or(0, Vec::len),
        }
    }

    /// Request a fetch for `view` unless one is already in flight.
    fn request_load(&mut self, view: RecordView) {
        if self.loading == Some(view) {
            tracing::debug!(view = view.label(), "record fetch already pending; ignoring");
            return;
        }
        if let Some(tx) = &self.action_tx {
            self.loading = Some(view);
            let _ = tx.send(Action::LoadRecords(view));
        }
    }

    fn switch_view(&mut self, view: RecordView) {
        self.view = view;
        self.scroll = 0;
        if !self.has_rows(view) {
            self.request_load(view);
        }
    }

    fn clamp_scroll(&mut self) {
        let len = self.row_count();
        if len == 0 {
            self.scroll = 0;
        } else if self.scroll >= len {
            self.scroll = len - 1;
        }
    }

    fn render_rows(&self, lines: &mut Vec<Line>, max_rows: usize) {
        match self.view {
            RecordView::Interactions => {
                let Some(rows) = &self.interactions else { return };
                lines.push(header_line("  time   platform   user            message"));
                for row in rows.iter().skip(self.scroll).take(max_rows) {
                    lines.push(interaction_line(row));
                }
            }
            RecordView::Users => {
                let Some(rows) = &self.users else { return };
                lines.push(header_line("  platform   user               msgs   last seen"));
                for row in rows.iter().skip(self.scroll).take(max_rows) {
                    lines.push(user_line(row));
                }
            }
            RecordView::Memories => {
                let Some(rows) = &self.memories else { return };
                lines.push(header_line("  type          conf   content"));
                for row in rows.iter().skip(self.scroll).take(max_rows) {
                    lines.push(memory_line(row));
                }
            }
        }
    }
}

impl Component for RecordsScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => return Ok(Some(Action::ScrollUp)),
            KeyCode::Down | KeyCode::Char('j') => return Ok(Some(Action::ScrollDown)),
            KeyCode::Left | KeyCode::Char('h') => self.switch_view(self.view.prev()),
            KeyCode::Right | KeyCode::Char('l') => self.switch_view(self.view.next()),
            KeyCode::Char('r') => self.request_load(self.view),
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::RecordsLoaded { view, rows, .. } => {
                if self.loading == Some(*view) {
                    self.loading = None;
                }
                match rows {
                    Some(RecordRows::Interactions(rows)) => {
                        self.interactions = Some(rows.clone());
                    }
                    Some(RecordRows::Users(rows)) => self.users = Some(rows.clone()),
                    Some(RecordRows::Memories(rows)) => self.memories = Some(rows.clone()),
                    None => {}
                }
                self.clamp_scroll();
            }
            Action::ScrollUp => {
                self.scroll = self.scroll.saturating_sub(1);
            }
            Action::ScrollDown => {
                self.scroll += 1;
                self.clamp_scroll();
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Records ")
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

        // View selector
        let mut selector = vec![Span::raw(" ")];
        for view in RecordView::ALL {
            let style = if view == self.view {
                theme::tab_active()
            } else {
                theme::tab_inactive()
            };
            selector.push(Span::styled(format!(" {} ", view.label()), style));
            selector.push(Span::raw(" "));
        }
        let mut lines = vec![Line::from(selector), Line::from("")];

        if self.loading == Some(self.view) && !self.has_rows(self.view) {
            lines.push(Line::from(Span::styled("  Loading…", theme::key_hint())));
        } else if self.has_rows(self.view) && self.row_count() == 0 {
            lines.push(Line::from(Span::styled("  No records", theme::key_hint())));
        } else if !self.has_rows(self.view) {
            lines.push(Line::from(Span::styled(
                "  Not loaded — press r",
                theme::key_hint(),
            )));
        } else {
            let max_rows = usize::from(inner.height.saturating_sub(5));
            self.render_rows(&mut lines, max_rows);
        }

        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("  h/l ", theme::key_hint_key()),
            Span::styled("view  ", theme::key_hint()),
            Span::styled("j/k ", theme::key_hint_key()),
            Span::styled("scroll  ", theme::key_hint()),
            Span::styled("r ", theme::key_hint_key()),
            Span::styled("reload", theme::key_hint()),
        ]));

        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn focused(&self) -> bool {
        self.focused
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        // First visit loads the initial view.
        if focused && !self.has_rows(self.view) {
            self.request_load(self.view);
        }
    }

    fn id(&self) -> &str {
        "Records"
    }
}

fn header_line(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_owned(),
        Style::default().fg(theme::ACCENT_BLUE),
    ))
}

fn interaction_line(row: &InteractionRecord) -> Line<'static> {
    let time = row
        .timestamp
        .map_or_else(|| "--:--".into(), |t| t.format("%H:%M").to_string());
    let platform = row.platform.as_deref().unwrap_or("-");
    let user = row.username.as_deref().unwrap_or("-");
    let message = row.message.as_deref().unwrap_or("");
    Line::from(Span::styled(
        format!(
            "  {time:<6} {platform:<10} {user:<15} {}",
            truncate(message, 48)
        ),
        theme::table_row(),
    ))
}

fn user_line(row: &UserRecord) -> Line<'static> {
    let platform = row.platform.as_deref().unwrap_or("-");
    let user = row
        .username
        .as_deref()
        .or_else(|| row.platform_id.as_deref())
        .unwrap_or("-");
    let count = row.interaction_count.unwrap_or(0);
    let last = row
        .last_interaction
        .map_or_else(|| "never".into(), |t| t.format("%Y-%m-%d %H:%M").to_string());
    Line::from(Span::styled(
        format!("  {platform:<10} {user:<18} {count:<6} {last}"),
        theme::table_row(),
    ))
}

fn memory_line(row: &MemoryRecord) -> Line<'static> {
    let kind = row.memory_type.as_deref().unwrap_or("-");
    let confidence = row
        .confidence
        .map_or_else(|| "  - ".into(), |c| format!("{c:.2}"));
    let content = row.content.as_deref().unwrap_or("");
    Line::from(Span::styled(
        format!("  {kind:<13} {confidence:<6} {}", truncate(content, 52)),
        theme::table_row(),
    ))
}

/// Clip to `max` characters with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_owned()
    } else {
        let clipped: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{clipped}…")
    }
}
