//! Colors and shared styles.

use ratatui::style::{Color, Modifier, Style};

// ── Base text ─────────────────────────────────────────────────────────────────

pub const C_BG: Color = Color::Rgb(16, 16, 22);
pub const C_PRIMARY: Color = Color::Rgb(214, 214, 228);
pub const C_SECONDARY: Color = Color::Rgb(120, 120, 142);
pub const C_MUTED: Color = Color::Rgb(74, 74, 92);
pub const C_ACCENT: Color = Color::Rgb(240, 86, 86);
pub const C_NUMBER_HINT: Color = Color::Rgb(92, 92, 118);

// ── Song fields ───────────────────────────────────────────────────────────────

pub const C_ARTIST: Color = Color::Rgb(104, 164, 134);
pub const C_DURATION: Color = Color::Rgb(86, 142, 204);

// ── Radio phase ───────────────────────────────────────────────────────────────

pub const C_PLAYING: Color = Color::Rgb(84, 204, 124);
pub const C_ADVANCING: Color = Color::Rgb(250, 180, 84);
pub const C_BADGE_RADIO: Color = Color::Rgb(184, 124, 224);

// ── Panes and input ───────────────────────────────────────────────────────────

pub const C_PANEL_BORDER: Color = Color::Rgb(42, 42, 56);
pub const C_SEARCH_BG: Color = Color::Rgb(22, 22, 34);
pub const C_SEARCH_FG: Color = Color::Rgb(250, 200, 84);
pub const C_MODE_NORMAL: Color = C_SECONDARY;
pub const C_MODE_SEARCH: Color = C_SEARCH_FG;

const C_FOCUS: Color = Color::Rgb(124, 104, 204);
const C_SELECTION_BG: Color = Color::Rgb(30, 30, 44);

// ── Toasts ────────────────────────────────────────────────────────────────────

pub const C_TOAST_INFO: Color = C_DURATION;
pub const C_TOAST_SUCCESS: Color = C_PLAYING;
pub const C_TOAST_WARNING: Color = C_ADVANCING;
pub const C_TOAST_ERROR: Color = C_ACCENT;

pub fn style_secondary() -> Style {
    Style::default().fg(C_SECONDARY)
}

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}

pub fn style_playing() -> Style {
    Style::default().fg(C_PLAYING).add_modifier(Modifier::BOLD)
}

/// Highlighted row; bold only in the focused pane.
pub fn style_selected() -> Style {
    Style::default().bg(C_SELECTION_BG).fg(C_PRIMARY)
}

pub fn style_selected_focused() -> Style {
    style_selected().add_modifier(Modifier::BOLD)
}

pub fn style_focused_border() -> Style {
    Style::default().fg(C_FOCUS)
}

pub fn style_unfocused_border() -> Style {
    Style::default().fg(C_PANEL_BORDER)
}
