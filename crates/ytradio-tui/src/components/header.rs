//! Header: one-row top bar: app name, now playing, radio badge.
//!
//! Not focusable.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use ytradio_core::Phase;

use crate::{
    app_state::AppState,
    theme::{style_muted, C_ACCENT, C_ADVANCING, C_ARTIST, C_BADGE_RADIO, C_PLAYING, C_PRIMARY},
};

pub fn draw(frame: &mut Frame, area: Rect, state: &AppState) {
    let view = &state.view;
    let mut spans = vec![Span::styled(
        " ytradio ",
        Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
    )];

    match &view.now_playing {
        Some(song) => {
            spans.push(Span::styled("▶ ", Style::default().fg(C_PLAYING)));
            spans.push(Span::styled(
                song.title.clone(),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(
                format!("  {}", song.artist),
                Style::default().fg(C_ARTIST),
            ));
            if let Some(d) = &song.duration {
                spans.push(Span::styled(format!("  {}", d), style_muted()));
            }
        }
        None => match &view.last_played {
            Some(song) if view.resumable || !view.radio.active => {
                spans.push(Span::styled(
                    format!("■ last: {}  (p resumes)", song.display_name()),
                    style_muted(),
                ));
            }
            _ => spans.push(Span::styled("■ nothing playing", style_muted())),
        },
    }

    let badge = match state.phase {
        Phase::Idle if view.resumable => Some(("RADIO PARKED", C_ADVANCING)),
        Phase::Idle => None,
        Phase::Playing => Some(("RADIO", C_BADGE_RADIO)),
        Phase::Advancing => Some(("RADIO ›› NEXT", C_ADVANCING)),
    };
    if let Some((label, color)) = badge {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!(" {} ", label),
            Style::default().fg(color).add_modifier(Modifier::BOLD | Modifier::REVERSED),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
