//! Transient status messages stacked in the top-right corner.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::theme::{C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_SUCCESS, C_TOAST_WARNING};

const MAX_VISIBLE: usize = 4;
const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    fn lifetime(self) -> Duration {
        match self {
            Level::Info | Level::Success => Duration::from_secs(3),
            Level::Warning => Duration::from_secs(4),
            Level::Error => Duration::from_secs(6),
        }
    }

    fn look(self) -> (Color, &'static str) {
        match self {
            Level::Info => (C_TOAST_INFO, "·"),
            Level::Success => (C_TOAST_SUCCESS, "✓"),
            Level::Warning => (C_TOAST_WARNING, "!"),
            Level::Error => (C_TOAST_ERROR, "✗"),
        }
    }
}

struct Toast {
    text: String,
    level: Level,
    expires: Instant,
}

#[derive(Default)]
pub struct ToastManager {
    toasts: VecDeque<Toast>,
    /// Text and frame of the "operation in flight" indicator.
    spinner: Option<(String, usize)>,
}

impl ToastManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn show(&mut self, text: impl Into<String>, level: Level) {
        let text = text.into();
        // Same text again just refreshes its timer.
        self.toasts.retain(|t| t.text != text);
        self.toasts.push_back(Toast {
            text,
            level,
            expires: Instant::now() + level.lifetime(),
        });
        if self.toasts.len() > MAX_VISIBLE {
            self.toasts.pop_front();
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.show(text, Level::Info);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.show(text, Level::Success);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.show(text, Level::Warning);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.show(text, Level::Error);
    }

    pub fn spinner(&mut self, text: impl Into<String>) {
        self.spinner = Some((text.into(), 0));
    }

    pub fn dismiss_spinner(&mut self) {
        self.spinner = None;
    }

    /// Called on every UI tick.
    pub fn tick(&mut self) {
        self.expire(Instant::now());
        if let Some((_, frame)) = &mut self.spinner {
            *frame = (*frame + 1) % SPINNER_FRAMES.len();
        }
    }

    fn expire(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires > now);
    }

    /// Lines to render, top to bottom: the spinner, then the newest toasts.
    fn lines(&self) -> Vec<(Color, String)> {
        let spinner = self.spinner.iter().map(|(text, frame)| {
            (C_TOAST_INFO, format!(" {} {} ", SPINNER_FRAMES[*frame], text))
        });
        let toasts = self.toasts.iter().rev().map(|t| {
            let (color, icon) = t.level.look();
            (color, format!(" {} {} ", icon, t.text))
        });
        spinner.chain(toasts).collect()
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let max_width = (area.width / 2).clamp(30, 60).min(area.width);
        let rows = area.height.saturating_sub(1) as usize;
        for (i, (color, text)) in self.lines().into_iter().take(rows).enumerate() {
            let width = (text.chars().count() as u16).min(max_width);
            let line = Rect {
                x: area.x + area.width.saturating_sub(width + 1),
                y: area.y + 1 + i as u16,
                width,
                height: 1,
            };
            frame.render_widget(Clear, line);
            frame.render_widget(
                Paragraph::new(text)
                    .style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
                line,
            );
        }
    }
}
