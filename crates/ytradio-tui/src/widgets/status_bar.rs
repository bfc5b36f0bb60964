//! Status bar: bottom line with input mode, radio indicator and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use ytradio_core::Phase;

use crate::theme::{C_ADVANCING, C_MODE_NORMAL, C_MODE_SEARCH, C_MUTED, C_PLAYING};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Search,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Search => "SEARCH",
        }
    }

    pub fn color(self) -> ratatui::style::Color {
        match self {
            Self::Normal => C_MODE_NORMAL,
            Self::Search => C_MODE_SEARCH,
        }
    }
}

fn keys_hint(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Normal => {
            " / search  ↑↓/jk select  Enter play  R radio  n next  ^r stop radio  Q queue  r disconnect  p resume  ^s stop all  L logs  ? help  q quit"
        }
        InputMode::Search => " type a query  Enter search  Esc clear+close",
    }
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode, phase: Phase) {
    let mut spans = vec![Span::styled(
        format!(" {} ", mode.label()),
        Style::default()
            .fg(mode.color())
            .add_modifier(Modifier::BOLD),
    )];

    let bulb = match phase {
        Phase::Idle => None,
        Phase::Playing => Some(C_PLAYING),
        Phase::Advancing => Some(C_ADVANCING),
    };
    if let Some(color) = bulb {
        spans.push(Span::styled(
            "●",
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    }

    spans.push(Span::styled(keys_hint(mode), Style::default().fg(C_MUTED)));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
