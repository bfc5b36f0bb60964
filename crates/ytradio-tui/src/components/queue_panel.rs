//! QueuePanel component: current radio song and what follows it.
//!
//! Hidden unless the persisted `queue_visible` flag is set. Focus only
//! matters for scrolling.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_muted, style_playing, style_secondary, C_ARTIST, C_BADGE_RADIO, C_NUMBER_HINT},
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        text::truncate,
    },
};

pub struct QueuePanel {
    scroll: usize,
}

impl QueuePanel {
    pub fn new() -> Self {
        Self { scroll: 0 }
    }
}

impl Default for QueuePanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for QueuePanel {
    fn id(&self) -> ComponentId {
        ComponentId::Queue
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => vec![Action::SelectUp(1)],
            KeyCode::Down | KeyCode::Char('j') => vec![Action::SelectDown(1)],
            KeyCode::Home | KeyCode::Char('g') => vec![Action::SelectFirst],
            KeyCode::End | KeyCode::Char('G') => vec![Action::SelectLast],
            _ => vec![],
        }
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        let len = state.view.radio.queue.len();
        match action {
            Action::SelectUp(n) => self.scroll = self.scroll.saturating_sub(*n),
            Action::SelectDown(n) => self.scroll = (self.scroll + n).min(len.saturating_sub(1)),
            Action::SelectFirst => self.scroll = 0,
            Action::SelectLast => self.scroll = len.saturating_sub(1),
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let radio = &state.view.radio;
        let count = format!("{} queued", radio.queue.len());
        let badge = radio.active.then(|| Badge {
            text: count.as_str(),
            color: C_BADGE_RADIO,
        });
        let block = pane_chrome("radio queue", focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        if !radio.active {
            frame.render_widget(
                Paragraph::new(Span::styled("  radio off · R starts one", style_muted())),
                inner,
            );
            return;
        }

        let width = inner.width.saturating_sub(6) as usize;
        let mut lines = Vec::with_capacity(inner.height as usize);
        if let Some(current) = &radio.current_song {
            lines.push(Line::from(vec![
                Span::styled("  ▶ ", style_playing()),
                Span::styled(truncate(&current.display_name(), width), style_playing()),
            ]));
        }
        if let Some(seed) = &radio.seed_song {
            lines.push(Line::from(Span::styled(
                format!("    from {}", truncate(&seed.title, width.saturating_sub(5))),
                style_secondary(),
            )));
        }

        let room = (inner.height as usize).saturating_sub(lines.len());
        self.scroll = self.scroll.min(radio.queue.len().saturating_sub(room));
        for (i, song) in radio.queue.iter().enumerate().skip(self.scroll).take(room) {
            lines.push(Line::from(vec![
                Span::styled(format!("{:>3} ", i + 1), Style::default().fg(C_NUMBER_HINT)),
                Span::raw(truncate(&song.title, width / 2)),
                Span::styled(
                    format!("  {}", truncate(&song.artist, width / 2)),
                    Style::default().fg(C_ARTIST),
                ),
            ]));
        }
        if radio.queue.is_empty() {
            lines.push(Line::from(Span::styled(
                "    queue empty · n fetches more",
                style_muted(),
            )));
        }
        frame.render_widget(Paragraph::new(lines), inner);
    }
}
