//! ResultsList component: search bar plus the songs the last search found.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use ytradio_core::Song;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{
        style_muted, style_playing, style_selected, style_selected_focused, C_ARTIST, C_DURATION,
        C_SECONDARY,
    },
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
        search_input::{SearchAction, SearchInput},
        text::fit,
    },
};

const PAGE: usize = 10;

pub struct ResultsList {
    list: ScrollableList<Song>,
    pub search: SearchInput,
}

impl ResultsList {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(),
            search: SearchInput::default(),
        }
    }

    pub fn set_results(&mut self, songs: Vec<Song>) {
        self.list.set_items(songs);
    }

    pub fn selected_song(&self) -> Option<&Song> {
        self.list.selected_item()
    }

    /// Keys while the search bar has the cursor.
    pub fn handle_search_key(&mut self, key: KeyEvent) -> Vec<Action> {
        match self.search.handle_key(key) {
            SearchAction::Submit(query) => vec![Action::CloseSearch, Action::Search(query)],
            SearchAction::Cancelled => vec![Action::CloseSearch],
            SearchAction::Edited => vec![],
        }
    }

    fn draw_rows(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let height = area.height as usize;
        if self.list.is_empty() {
            let hint = if state.searching {
                "  searching…".to_string()
            } else if let Some(q) = &state.last_query {
                format!("  no songs found for \"{}\"", q)
            } else {
                "  press / to search YouTube Music".to_string()
            };
            frame.render_widget(Paragraph::new(Span::styled(hint, style_muted())), area);
            return;
        }

        self.list.ensure_visible(height);
        let playing_id = state.view.now_playing.as_ref().map(|s| s.video_id.as_str());
        let width = area.width as usize;
        let title_w = width.saturating_sub(4) * 55 / 100;
        let dur_w = 7;
        let artist_w = width.saturating_sub(4 + title_w + dur_w);

        let lines: Vec<Line> = self
            .list
            .visible_items(height)
            .map(|(idx, song)| {
                let is_selected = idx == self.list.selected;
                let is_playing = playing_id == Some(song.video_id.as_str());
                let marker = if is_playing { " ▶ " } else { "   " };
                let title_style = if is_playing {
                    style_playing()
                } else {
                    Style::default()
                };
                let line = Line::from(vec![
                    Span::styled(marker, style_playing()),
                    Span::styled(fit(&song.title, title_w), title_style),
                    Span::raw(" "),
                    Span::styled(fit(&song.artist, artist_w), Style::default().fg(C_ARTIST)),
                    Span::styled(
                        format!("{:>7}", song.duration.as_deref().unwrap_or("")),
                        Style::default().fg(C_DURATION),
                    ),
                ]);
                match (is_selected, focused) {
                    (true, true) => line.style(style_selected_focused()),
                    (true, false) => line.style(style_selected()),
                    _ => line,
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), area);
    }
}

impl Default for ResultsList {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ResultsList {
    fn id(&self) -> ComponentId {
        ComponentId::Results
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => vec![Action::SelectUp(1)],
            KeyCode::Down | KeyCode::Char('j') => vec![Action::SelectDown(1)],
            KeyCode::PageUp => vec![Action::SelectUp(PAGE)],
            KeyCode::PageDown => vec![Action::SelectDown(PAGE)],
            KeyCode::Home | KeyCode::Char('g') => vec![Action::SelectFirst],
            KeyCode::End | KeyCode::Char('G') => vec![Action::SelectLast],
            KeyCode::Enter => vec![Action::PlaySelection],
            _ => vec![],
        }
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        match action {
            Action::OpenSearch => self.search.activate(),
            Action::CloseSearch => self.search.deactivate(),
            Action::SelectUp(n) => self.list.select_up(*n),
            Action::SelectDown(n) => self.list.select_down(*n),
            Action::SelectFirst => self.list.select_first(),
            Action::SelectLast => self.list.select_last(),
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let count = format!("{} songs", self.list.len());
        let badge = (!self.list.is_empty()).then(|| Badge {
            text: count.as_str(),
            color: C_SECONDARY,
        });
        let block = pane_chrome("search", focused || self.search.is_active(), badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(inner);
        self.search.draw(frame, rows[0]);
        self.draw_rows(frame, rows[1], focused, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn results() -> ResultsList {
        let mut r = ResultsList::new();
        r.set_results(vec![
            Song::new("One", "A", "id1"),
            Song::new("Two", "B", "id2"),
        ]);
        r
    }

    #[test]
    fn test_navigation_moves_selection() {
        let mut r = results();
        let state = AppState::default();
        for action in r.handle_key(key(KeyCode::Char('j')), &state) {
            r.on_action(&action, &state);
        }
        assert_eq!(r.selected_song().map(|s| s.video_id.as_str()), Some("id2"));
        assert_eq!(
            r.handle_key(key(KeyCode::Enter), &state),
            vec![Action::PlaySelection]
        );
    }

    #[test]
    fn test_search_submit_closes_bar() {
        let mut r = results();
        r.on_action(&Action::OpenSearch, &AppState::default());
        r.handle_search_key(key(KeyCode::Char('x')));
        assert_eq!(
            r.handle_search_key(key(KeyCode::Enter)),
            vec![Action::CloseSearch, Action::Search("x".into())]
        );
    }
}
