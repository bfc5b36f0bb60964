//! HelpOverlay: centered popup with the keyboard shortcut reference.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::theme::{C_MUTED, C_PANEL_BORDER, C_PRIMARY, C_SECONDARY};

pub struct HelpOverlay {
    pub visible: bool,
}

impl HelpOverlay {
    pub fn new() -> Self {
        Self { visible: false }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if !self.visible {
            return;
        }

        let popup = centered_rect(64, 26, area);
        let lines: Vec<Line> = vec![
            Line::from(Span::styled(
                " keyboard shortcuts",
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            section(" search & play"),
            help_row("/  or  s", "open the search bar"),
            help_row("enter", "run search / play highlighted song"),
            help_row("esc", "clear search text, then close the bar"),
            Line::from(""),
            section(" radio"),
            help_row("R", "start radio from highlighted song"),
            help_row("n", "skip to next radio song"),
            help_row("ctrl+r", "stop radio"),
            help_row("Q", "show / hide the radio queue"),
            Line::from(""),
            section(" session"),
            help_row("r", "disconnect (music keeps playing)"),
            help_row("p", "resume last song or radio"),
            help_row("ctrl+s", "stop all music"),
            help_row("q / esc / ctrl+c", "quit (music keeps playing)"),
            Line::from(""),
            section(" panes"),
            help_row("↑ / ↓  or  j / k", "move selection / scroll"),
            help_row("tab / shift-tab", "focus next / previous pane"),
            help_row("L", "toggle log panel"),
            help_row("?", "toggle this help"),
            Line::from(""),
            Line::from(Span::styled(" press any key to close", Style::default().fg(C_MUTED))),
        ];

        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(C_PANEL_BORDER))
                        .style(Style::default().bg(ratatui::style::Color::Rgb(18, 18, 26))),
                )
                .wrap(Wrap { trim: false }),
            popup,
        );
    }
}

impl Default for HelpOverlay {
    fn default() -> Self {
        Self::new()
    }
}

fn section(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        title,
        Style::default().fg(C_MUTED).add_modifier(Modifier::BOLD),
    ))
}

fn help_row<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw(" "),
        Span::styled(
            format!("{:<18}", key),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(desc, Style::default().fg(C_SECONDARY)),
    ])
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1])[1]
}
