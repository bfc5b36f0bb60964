//! SearchInput: wraps tui-input as the catalog search bar.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_MUTED, C_SEARCH_BG, C_SEARCH_FG};

#[derive(Debug, PartialEq)]
pub enum SearchAction {
    /// Enter with a non-blank query.
    Submit(String),
    Cancelled,
    Edited,
}

pub struct SearchInput {
    input: Input,
    active: bool,
    placeholder: String,
}

impl SearchInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            active: false,
            placeholder: placeholder.into(),
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    /// Esc clears the text first and closes on a second press. The query
    /// stays in the box after Enter so it can be refined.
    pub fn handle_key(&mut self, key: KeyEvent) -> SearchAction {
        match key.code {
            KeyCode::Esc => {
                if self.input.value().is_empty() {
                    self.deactivate();
                    SearchAction::Cancelled
                } else {
                    self.input = Input::default();
                    SearchAction::Edited
                }
            }
            KeyCode::Enter => {
                let query = self.input.value().trim().to_string();
                if query.is_empty() {
                    return SearchAction::Edited;
                }
                self.deactivate();
                SearchAction::Submit(query)
            }
            _ => {
                self.input.handle_event(&Event::Key(key));
                SearchAction::Edited
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(4) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled(
                format!("/ {}", self.placeholder),
                Style::default().fg(C_MUTED),
            )
        } else {
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(format!("/ {}", visible), Style::default().fg(C_SEARCH_FG))
        };

        frame.render_widget(
            Paragraph::new(Line::from(display)).style(Style::default().bg(C_SEARCH_BG)),
            area,
        );

        if self.active && area.width > 0 {
            let cursor_x = area.x + 2 + self.input.visual_cursor().saturating_sub(scroll) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }
}

impl Default for SearchInput {
    fn default() -> Self {
        Self::new("search songs...")
    }
}
