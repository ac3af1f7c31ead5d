//! Application core — event loop, screen management, action dispatch.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Tabs},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vigil_core::{AlertLevel, Monitor, NewMemory};

use crate::action::Action;
use crate::component::Component;
use crate::data_bridge::run_data_bridge;
use crate::event::{Event, EventReader};
use crate::notify::{Notification, NotificationLevel, NotificationQueue};
use crate::screen::ScreenId;
use crate::screens::{RecordRows, RecordView, create_screens};
use crate::theme;
use crate::tui::Tui;

/// Memory types offered by the input overlay, cycled with Tab.
const MEMORY_TYPES: [&str; 3] = ["manual", "insight", "observation"];

/// How long danger-level alert toasts stay visible.
const DANGER_ALERT_TTL: Duration = Duration::from_secs(10);

/// In-progress state of the memory input overlay.
struct MemoryDraft {
    content: String,
    type_index: usize,
}

impl MemoryDraft {
    fn memory_type(&self) -> &'static str {
        MEMORY_TYPES[self.type_index]
    }
}

/// Connection status as seen by the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Top-level application state and event loop.
pub struct App {
    /// Handle to the monitor; commands clone it into spawned tasks.
    monitor: Monitor,
    /// Current active screen.
    active_screen: ScreenId,
    /// Previous screen for GoBack.
    previous_screen: Option<ScreenId>,
    /// All screen components, keyed by ScreenId.
    screens: HashMap<ScreenId, Box<dyn Component>>,
    /// Whether the app should keep running.
    running: bool,
    /// Connection status indicator.
    connection_status: ConnectionStatus,
    /// Help overlay visibility.
    help_visible: bool,
    /// Memory input overlay state; `Some` while the overlay is open.
    memory_input: Option<MemoryDraft>,
    /// A vault sync is in flight; further requests are ignored until
    /// the completion action re-enables the control.
    vault_sync_pending: bool,
    /// Toast notifications.
    notifications: NotificationQueue,
    /// Cancels the data bridge on shutdown.
    bridge_cancel: CancellationToken,
    /// Action sender — components can dispatch actions through this.
    action_tx: mpsc::UnboundedSender<Action>,
    /// Action receiver — main loop drains this.
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(monitor: Monitor) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let screens: HashMap<ScreenId, Box<dyn Component>> =
            create_screens().into_iter().collect();

        Self {
            monitor,
            active_screen: ScreenId::Dashboard,
            previous_screen: None,
            screens,
            running: true,
            connection_status: ConnectionStatus::default(),
            help_visible: false,
            memory_input: None,
            vault_sync_pending: false,
            notifications: NotificationQueue::default(),
            bridge_cancel: CancellationToken::new(),
            action_tx,
            action_rx,
        }
    }

    /// Initialize all screen components with the action sender.
    fn init_screens(&mut self) -> Result<()> {
        for screen in self.screens.values_mut() {
            screen.init(self.action_tx.clone())?;
        }
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }
        Ok(())
    }

    /// Run the main event loop. This is the heart of the TUI.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.init_screens()?;

        // Bridge monitor state into the action channel.
        let bridge = tokio::spawn(run_data_bridge(
            self.monitor.clone(),
            self.action_tx.clone(),
            self.bridge_cancel.clone(),
        ));

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!("TUI event loop started");

        while self.running {
            // 1. Wait for the next event
            let Some(event) = events.next().await else {
                break;
            };

            // 2. Map event → action(s)
            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => {
                    self.action_tx.send(Action::Resize(w, h))?;
                }
                Event::Tick => {
                    self.action_tx.send(Action::Tick)?;
                }
                Event::Render => {
                    self.action_tx.send(Action::Render)?;
                }
            }

            // 3. Drain and process all queued actions
            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        events.stop();
        self.bridge_cancel.cancel();
        let _ = bridge.await;
        info!("TUI event loop ended");
        Ok(())
    }

    /// Map a key event to an action. Global keys are handled here;
    /// screen-specific keys are delegated to the active screen component.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        // The memory overlay swallows everything while open.
        if self.memory_input.is_some() {
            return Ok(self.handle_memory_input_key(key));
        }

        if self.help_visible {
            // In help mode, Esc or ? closes help
            return match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Ok(Some(Action::ToggleHelp)),
                _ => Ok(None),
            };
        }

        // Global keybindings
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => return Ok(Some(Action::Quit)),
            (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),

            (KeyModifiers::NONE, KeyCode::Char('?')) => return Ok(Some(Action::ToggleHelp)),

            // Dismiss the oldest toast
            (KeyModifiers::NONE, KeyCode::Char('x')) => {
                return Ok(Some(Action::DismissNotification));
            }

            // Screen navigation via number keys
            (KeyModifiers::NONE, KeyCode::Char(c @ '1'..='4')) => {
                let n = c as u8 - b'0';
                if let Some(screen) = ScreenId::from_number(n) {
                    return Ok(Some(Action::SwitchScreen(screen)));
                }
            }

            // Tab / Shift+Tab for screen cycling
            (KeyModifiers::NONE, KeyCode::Tab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.next())));
            }
            (KeyModifiers::SHIFT, KeyCode::BackTab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.prev())));
            }

            // Esc — context-dependent back
            (KeyModifiers::NONE, KeyCode::Esc) => return Ok(Some(Action::GoBack)),

            _ => {}
        }

        // Delegate to active screen component
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_key_event(key);
        }

        Ok(None)
    }

    /// Key handling while the memory input overlay is open.
    fn handle_memory_input_key(&mut self, key: KeyEvent) -> Option<Action> {
        let draft = self.memory_input.as_mut()?;
        match key.code {
            KeyCode::Esc => Some(Action::CloseMemoryInput),
            KeyCode::Tab => {
                draft.type_index = (draft.type_index + 1) % MEMORY_TYPES.len();
                None
            }
            KeyCode::Enter => {
                let content = draft.content.trim().to_owned();
                if content.is_empty() {
                    None
                } else {
                    Some(Action::SubmitMemory {
                        content,
                        memory_type: draft.memory_type().to_owned(),
                    })
                }
            }
            KeyCode::Backspace => {
                draft.content.pop();
                None
            }
            KeyCode::Char(c) => {
                draft.content.push(c);
                None
            }
            _ => None,
        }
    }

    /// Process a single action — update app state and propagate to components.
    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => {
                self.running = false;
            }

            Action::SwitchScreen(target) => {
                if *target != self.active_screen {
                    debug!("switching screen: {} → {}", self.active_screen, target);
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(false);
                    }
                    self.previous_screen = Some(self.active_screen);
                    self.active_screen = *target;
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(true);
                    }
                }
            }

            Action::GoBack => {
                if let Some(prev) = self.previous_screen.take() {
                    self.action_tx.send(Action::SwitchScreen(prev))?;
                }
            }

            Action::ToggleHelp => {
                self.help_visible = !self.help_visible;
            }

            Action::Connected => {
                self.connection_status = ConnectionStatus::Connected;
            }
            Action::Connecting => {
                self.connection_status = ConnectionStatus::Connecting;
            }
            Action::Disconnected(reason) => {
                warn!(reason = %reason, "connection lost");
                self.connection_status = ConnectionStatus::Disconnected;
            }

            // ── Commands: spawn against the monitor ───────────────
            Action::Refresh => self.spawn_refresh(),
            Action::TogglePlatform { name, active } => self.spawn_toggle(name.clone(), *active),
            Action::SyncVault => {
                if !self.vault_sync_pending {
                    self.vault_sync_pending = true;
                    self.spawn_vault_sync();
                }
            }
            Action::SubmitMemory {
                content,
                memory_type,
            } => {
                self.memory_input = None;
                self.spawn_memory_create(content.clone(), memory_type.clone());
            }
            Action::ExportAnalytics { days } => self.spawn_export(*days),
            Action::LoadRecords(view) => self.spawn_load_records(*view),

            // ── Command completions → toasts ──────────────────────
            Action::ToggleFinished { name, error } => {
                let note = match error {
                    None => Notification::success(format!("Platform '{name}' toggled")),
                    Some(e) => Notification::error(format!("Toggle '{name}' failed: {e}")),
                };
                self.notifications.push(note, Instant::now());
                self.broadcast(action)?;
            }
            Action::VaultSyncFinished { error } => {
                // Settling always re-enables the control, success or not.
                self.vault_sync_pending = false;
                let note = match error {
                    None => Notification::success("Vault sync triggered"),
                    Some(e) => Notification::error(format!("Vault sync failed: {e}")),
                };
                self.notifications.push(note, Instant::now());
            }
            Action::MemoryCreateFinished { error } => {
                let note = match error {
                    None => Notification::success("Memory stored"),
                    Some(e) => Notification::error(format!("Memory create failed: {e}")),
                };
                self.notifications.push(note, Instant::now());
            }
            Action::ExportFinished { path, error } => {
                let note = match (path, error) {
                    (Some(path), None) => Notification::success(format!("Exported to {path}")),
                    (_, Some(e)) => Notification::error(format!("Export failed: {e}")),
                    (None, None) => Notification::info("Export finished"),
                };
                self.notifications.push(note, Instant::now());
            }

            Action::RecordsLoaded { error, .. } => {
                if let Some(e) = error {
                    self.notifications
                        .push(Notification::error(format!("Record fetch failed: {e}")), Instant::now());
                }
                self.broadcast(action)?;
            }

            Action::OpenMemoryInput => {
                self.memory_input = Some(MemoryDraft {
                    content: String::new(),
                    type_index: 0,
                });
            }
            Action::CloseMemoryInput => {
                self.memory_input = None;
            }

            Action::Notify(notification) => {
                self.notifications.push(notification.clone(), Instant::now());
            }
            Action::DismissNotification => {
                let _ = self.notifications.dismiss_oldest();
            }

            Action::AlertReceived(alert) => {
                // Danger alerts linger longer than the toast default.
                match alert.level {
                    AlertLevel::Info => {
                        self.notifications
                            .push(Notification::info(alert.message.clone()), Instant::now());
                    }
                    AlertLevel::Warning => {
                        self.notifications
                            .push(Notification::warning(alert.message.clone()), Instant::now());
                    }
                    AlertLevel::Danger => {
                        self.notifications.push_with_ttl(
                            Notification::error(alert.message.clone()),
                            Instant::now(),
                            DANGER_ALERT_TTL,
                        );
                    }
                }
                self.broadcast(action)?;
            }

            Action::Tick => {
                self.notifications.prune(Instant::now());
            }

            // State updates matter to every screen, visible or not.
            Action::StateUpdated(_) => self.broadcast(action)?,

            // Render is handled in the main loop, not here
            Action::Render | Action::Resize(..) => {}

            // Propagate everything else to the active screen
            other => {
                if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                    if let Some(follow_up) = screen.update(other)? {
                        self.action_tx.send(follow_up)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Propagate one action to every screen.
    fn broadcast(&mut self, action: &Action) -> Result<()> {
        for screen in self.screens.values_mut() {
            if let Some(follow_up) = screen.update(action)? {
                self.action_tx.send(follow_up)?;
            }
        }
        Ok(())
    }

    // ── Command tasks ─────────────────────────────────────────────

    fn spawn_refresh(&self) {
        let monitor = self.monitor.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = monitor.refresh().await {
                let _ = tx.send(Action::Notify(Notification::error(format!(
                    "Refresh failed: {e}"
                ))));
            }
        });
    }

    fn spawn_toggle(&self, name: String, active: bool) {
        let monitor = self.monitor.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let error = monitor
                .toggle_platform(&name, active)
                .await
                .err()
                .map(|e| e.to_string());
            // Always settles, so the pending marker always clears.
            let _ = tx.send(Action::ToggleFinished { name, error });
        });
    }

    fn spawn_vault_sync(&self) {
        let monitor = self.monitor.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let error = monitor.sync_vault().await.err().map(|e| e.to_string());
            let _ = tx.send(Action::VaultSyncFinished { error });
        });
    }

    fn spawn_memory_create(&self, content: String, memory_type: String) {
        let monitor = self.monitor.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let memory = NewMemory {
                content,
                memory_type,
                confidence: 1.0,
            };
            let error = monitor
                .create_memory(&memory)
                .await
                .err()
                .map(|e| e.to_string());
            let _ = tx.send(Action::MemoryCreateFinished { error });
        });
    }

    fn spawn_load_records(&self, view: RecordView) {
        let monitor = self.monitor.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = match view {
                RecordView::Interactions => monitor
                    .interactions(1)
                    .await
                    .map(|p| RecordRows::Interactions(p.interactions)),
                RecordView::Users => monitor.users(1).await.map(|p| RecordRows::Users(p.users)),
                RecordView::Memories => monitor
                    .memories(1)
                    .await
                    .map(|p| RecordRows::Memories(p.memories)),
            };
            let action = match result {
                Ok(rows) => Action::RecordsLoaded {
                    view,
                    rows: Some(rows),
                    error: None,
                },
                Err(e) => Action::RecordsLoaded {
                    view,
                    rows: None,
                    error: Some(e.to_string()),
                },
            };
            let _ = tx.send(action);
        });
    }

    fn spawn_export(&self, days: u32) {
        let monitor = self.monitor.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = async {
                let report = monitor.export_analytics(days).await?;
                let path = format!("vigil-analytics-{}.json", Utc::now().format("%Y-%m-%d"));
                tokio::fs::write(&path, serde_json::to_vec_pretty(&report)?)
                    .await
                    .map_err(color_eyre::eyre::Report::from)?;
                Ok::<String, color_eyre::eyre::Report>(path)
            }
            .await;

            let action = match result {
                Ok(path) => Action::ExportFinished {
                    path: Some(path),
                    error: None,
                },
                Err(e) => Action::ExportFinished {
                    path: None,
                    error: Some(e.to_string()),
                },
            };
            let _ = tx.send(action);
        });
    }

    // ── Rendering ─────────────────────────────────────────────────

    /// Render the full application frame.
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        // Layout: [screen content] [tab bar] [status bar]
        let layout = Layout::vertical([
            Constraint::Min(1),    // Screen content
            Constraint::Length(1), // Tab bar
            Constraint::Length(1), // Status bar
        ])
        .split(area);

        if let Some(screen) = self.screens.get(&self.active_screen) {
            screen.render(frame, layout[0]);
        }

        self.render_tab_bar(frame, layout[1]);
        self.render_status_bar(frame, layout[2]);
        self.render_notifications(frame, area);

        if let Some(ref draft) = self.memory_input {
            self.render_memory_overlay(frame, area, draft);
        }
        if self.help_visible {
            self.render_help_overlay(frame, area);
        }
    }

    /// Render the bottom tab bar showing all screens.
    fn render_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = ScreenId::ALL
            .iter()
            .map(|&id| {
                let style = if id == self.active_screen {
                    theme::tab_active()
                } else {
                    theme::tab_inactive()
                };
                Line::from(Span::styled(
                    format!(" {} {} ", id.number(), id.label()),
                    style,
                ))
            })
            .collect();

        let tabs = Tabs::new(titles)
            .divider(Span::styled(" ", theme::key_hint()))
            .select(
                ScreenId::ALL
                    .iter()
                    .position(|&s| s == self.active_screen)
                    .unwrap_or(0),
            );

        frame.render_widget(tabs, area);
    }

    /// Render the bottom status bar with connection status and key hints.
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let connection_indicator = match self.connection_status {
            ConnectionStatus::Connected => {
                Span::styled("● live", Style::default().fg(theme::SUCCESS_GREEN))
            }
            ConnectionStatus::Disconnected => Span::styled(
                "○ polling only",
                Style::default().fg(theme::ERROR_RED),
            ),
            ConnectionStatus::Connecting => {
                Span::styled("◐ connecting", Style::default().fg(theme::AMBER))
            }
        };

        let hints = Span::styled(" │ ? help  x dismiss  q quit", theme::key_hint());

        let line = Line::from(vec![Span::raw(" "), connection_indicator, hints]);
        frame.render_widget(Paragraph::new(line), area);
    }

    /// Render toast notifications stacked in the top-right corner.
    fn render_notifications(&self, frame: &mut Frame, area: Rect) {
        for (i, notification) in self.notifications.visible().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let y = area.y + i as u16;
            if y >= area.y + area.height.saturating_sub(2) {
                break;
            }

            let color = match notification.level {
                NotificationLevel::Info => theme::ACCENT_BLUE,
                NotificationLevel::Success => theme::SUCCESS_GREEN,
                NotificationLevel::Warning => theme::AMBER,
                NotificationLevel::Error => theme::ERROR_RED,
            };
            let text = format!(" {} ", notification.message);
            #[allow(clippy::cast_possible_truncation)]
            let width = (text.chars().count() as u16).min(area.width);
            let toast_area = Rect::new(area.x + area.width.saturating_sub(width), y, width, 1);

            frame.render_widget(
                Paragraph::new(text).style(Style::default().fg(theme::BG_DARK).bg(color)),
                toast_area,
            );
        }
    }

    /// Render the memory input overlay centered on screen.
    fn render_memory_overlay(&self, frame: &mut Frame, area: Rect, draft: &MemoryDraft) {
        let width = 56u16.min(area.width.saturating_sub(4));
        let height = 6u16;
        let x = (area.width.saturating_sub(width)) / 2;
        let y = (area.height.saturating_sub(height)) / 2;
        let overlay = Rect::new(area.x + x, area.y + y, width, height.min(area.height));

        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            overlay,
        );

        let block = Block::default()
            .title(" New Memory ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(overlay);
        frame.render_widget(block, overlay);

        let visible: String = draft
            .content
            .chars()
            .rev()
            .take(usize::from(inner.width.saturating_sub(4)))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let lines = vec![
            Line::from(vec![
                Span::styled(" > ", Style::default().fg(theme::ACCENT_BLUE)),
                Span::styled(visible, Style::default().fg(theme::DIM_WHITE)),
                Span::styled("▏", Style::default().fg(theme::MAGENTA)),
            ]),
            Line::from(vec![
                Span::styled("   Type: ", theme::key_hint()),
                Span::styled(draft.memory_type(), Style::default().fg(theme::AMBER)),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "  Enter save   Tab type   Esc cancel",
                theme::key_hint(),
            )),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
    }

    /// Render the help overlay centered on screen.
    fn render_help_overlay(&self, frame: &mut Frame, area: Rect) {
        let help_width = 54u16.min(area.width.saturating_sub(4));
        let help_height = 16u16.min(area.height.saturating_sub(4));

        let x = (area.width.saturating_sub(help_width)) / 2;
        let y = (area.height.saturating_sub(help_height)) / 2;
        let help_area = Rect::new(area.x + x, area.y + y, help_width, help_height);

        // Clear the background
        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            help_area,
        );

        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());

        let inner = block.inner(help_area);
        frame.render_widget(block, help_area);

        let hint = |k: &str, v: &str| {
            Line::from(vec![
                Span::styled(format!("  {k:<10}"), theme::key_hint_key()),
                Span::styled(v.to_owned(), theme::key_hint()),
            ])
        };

        let help_text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Navigation",
                Style::default().fg(theme::ACCENT_BLUE),
            )),
            hint("1-4", "Jump to screen"),
            hint("Tab", "Next screen"),
            hint("j/k ↑/↓", "Move up/down"),
            hint("h/l", "Record view"),
            hint("Esc", "Back / close"),
            Line::from(""),
            Line::from(Span::styled(
                "  Commands",
                Style::default().fg(theme::ACCENT_BLUE),
            )),
            hint("r", "Refresh now"),
            hint("Space", "Toggle platform"),
            hint("v", "Sync vault"),
            hint("m", "New memory"),
            hint("e", "Export analytics"),
            hint("q", "Quit"),
        ];

        frame.render_widget(Paragraph::new(help_text), inner);
    }
}
