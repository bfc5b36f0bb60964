//! LogPanel component: collapsible status/log viewer.
//!
//! Shows one line (most recent entry) when collapsed; expands to a full
//! panel with its own scroll state.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_muted, style_secondary},
    widgets::pane_chrome::pane_chrome_borders,
};

pub struct LogPanel {
    pub expanded: bool,
    pub scroll: usize,
    last_log_count: usize,
}

impl LogPanel {
    pub fn new() -> Self {
        Self {
            expanded: false,
            scroll: 0,
            last_log_count: 0,
        }
    }

    pub fn toggle(&mut self) {
        self.expanded = !self.expanded;
        if self.expanded {
            self.scroll = usize::MAX;
        }
    }
}

impl Default for LogPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for LogPanel {
    fn id(&self) -> ComponentId {
        ComponentId::LogPanel
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if !self.expanded {
            return vec![];
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            KeyCode::Home | KeyCode::Char('g') => self.scroll = 0,
            KeyCode::End | KeyCode::Char('G') => self.scroll = usize::MAX,
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if *action == Action::ToggleLogs {
            self.toggle();
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        if area.height == 0 {
            return;
        }
        frame.render_widget(Clear, area);

        if !self.expanded || area.height <= 1 {
            let last = state.last_log().unwrap_or("(no messages)");
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(" log ", style_muted()),
                    Span::styled(last, style_secondary()),
                ])),
                area,
            );
            return;
        }

        let block = pane_chrome_borders("log", focused, None, Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let height = inner.height as usize;
        let log_count = state.logs.len();
        let max_scroll = log_count.saturating_sub(height);

        // Stick to the bottom when new lines arrive and we were already there.
        if log_count > self.last_log_count {
            if self.scroll >= max_scroll.saturating_sub(1) {
                self.scroll = usize::MAX;
            }
            self.last_log_count = log_count;
        }
        self.scroll = self.scroll.min(max_scroll);

        if state.logs.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no messages yet", style_muted())),
                inner,
            );
            return;
        }

        let lines: Vec<Line> = state
            .logs
            .iter()
            .skip(self.scroll)
            .take(height)
            .map(|msg| Line::from(vec![Span::raw("  "), Span::styled(msg.as_str(), style_muted())]))
            .collect();
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }
}
