//! App: the terminal event loop.
//!
//! Architecture:
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks
//!   (terminal input, captured log lines, orchestrator results, search results).
//! - The loop draws a frame, then awaits the next message, view change or tick.
//! - Key handling produces `Vec<Action>`; `dispatch` applies each Action.
//! - Orchestrator operations run on spawned tasks so a slow catalog fetch never
//!   freezes the UI. The radio state itself is read from the orchestrator's
//!   watch channel, never by locking the session.

use std::future::Future;
use std::io;
use std::time::Duration;

use anyhow::anyhow;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use ytradio_core::{Outcome, PlaybackEvent, RadioOrchestrator, RadioView, Song};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::{
        header, help_overlay::HelpOverlay, log_panel::LogPanel, queue_panel::QueuePanel,
        results_list::ResultsList,
    },
    focus::FocusRing,
    widgets::{
        status_bar::{self, InputMode},
        toast::ToastManager,
    },
};

// ── Internal event bus ────────────────────────────────────────────────────────

/// Who triggered an orchestrator operation.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Source {
    Key,
    /// A key whose operation put up the spinner toast.
    KeyWithSpinner,
    /// The player monitor reporting a finished track.
    Player,
}

enum AppMessage {
    Event(Event),
    Outcome(Outcome, Source),
    SearchDone {
        query: String,
        result: Result<Vec<Song>, String>,
    },
    Log(String),
}

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

pub struct App {
    orchestrator: RadioOrchestrator,
    search_limit: usize,
    resume_on_start: bool,

    state: AppState,
    results: ResultsList,
    queue: QueuePanel,
    log_panel: LogPanel,
    help: HelpOverlay,
    toast: ToastManager,
    focus: FocusRing,

    tx: mpsc::Sender<AppMessage>,
    rx: Option<mpsc::Receiver<AppMessage>>,
    /// Quit requested; waiting for the orchestrator to save.
    quitting: bool,
    should_quit: bool,
}

impl App {
    pub fn new(orchestrator: RadioOrchestrator, search_limit: usize, resume_on_start: bool) -> Self {
        let (tx, rx) = mpsc::channel(1024);
        Self {
            orchestrator,
            search_limit,
            resume_on_start,
            state: AppState::default(),
            results: ResultsList::new(),
            queue: QueuePanel::new(),
            log_panel: LogPanel::new(),
            help: HelpOverlay::new(),
            toast: ToastManager::new(),
            focus: FocusRing::default(),
            tx,
            rx: Some(rx),
            quitting: false,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(
        mut self,
        events_rx: mpsc::Receiver<PlaybackEvent>,
        log_rx: broadcast::Receiver<String>,
    ) -> anyhow::Result<()> {
        let rx = self
            .rx
            .take()
            .ok_or_else(|| anyhow!("event loop already started"))?;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        debug!("run(): terminal ready, size={:?}", terminal.size());

        self.spawn_input_reader();
        self.spawn_log_forwarder(log_rx);
        self.spawn_playback_pump(events_rx);

        let result = self.event_loop(&mut terminal, rx).await;

        // ── Teardown ──────────────────────────────────────────────────────────
        restore_terminal();
        terminal.show_cursor()?;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Tui,
        mut rx: mpsc::Receiver<AppMessage>,
    ) -> anyhow::Result<()> {
        let mut view_rx = self.orchestrator.subscribe();
        let initial = view_rx.borrow_and_update().clone();
        self.sync_view(initial);

        self.state.push_log("ytradio started");
        if self.resume_on_start {
            self.dispatch(Action::Resume).await;
        }

        // Toast expiry + spinner animation + phase refresh.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    self.handle_message(msg).await;
                    // Drain whatever else queued up before drawing again.
                    while let Ok(next) = rx.try_recv() {
                        self.handle_message(next).await;
                        if self.should_quit {
                            break;
                        }
                    }
                    needs_redraw = true;
                }

                changed = view_rx.changed() => {
                    if changed.is_err() {
                        warn!("orchestrator view channel closed");
                        break;
                    }
                    let view = view_rx.borrow_and_update().clone();
                    self.sync_view(view);
                    needs_redraw = true;
                }

                _ = ui_tick.tick() => {
                    self.toast.tick();
                    self.state.phase = self.orchestrator.phase();
                    needs_redraw = true;
                }
            }
        }
        Ok(())
    }

    // ── Background tasks ──────────────────────────────────────────────────────

    fn spawn_input_reader(&self) {
        let tx = self.tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });
    }

    fn spawn_log_forwarder(&self, mut log_rx: broadcast::Receiver<String>) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            loop {
                match log_rx.recv().await {
                    Ok(line) => {
                        if tx.send(AppMessage::Log(line)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        let _ = tx
                            .send(AppMessage::Log(format!("({} log lines skipped)", n)))
                            .await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Hands each finished track to the orchestrator. Each hand-off runs on its
    /// own task so a skip racing the end of a track meets the advance guard
    /// instead of queueing behind it.
    fn spawn_playback_pump(&self, mut events_rx: mpsc::Receiver<PlaybackEvent>) {
        let orchestrator = self.orchestrator.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let PlaybackEvent::Finished {
                    id,
                    origin,
                    song,
                    success,
                } = event;
                debug!(
                    "playback {} ({:?}) of {} ended, success={}",
                    id, origin, song.video_id, success
                );
                let orchestrator = orchestrator.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let outcome = orchestrator.on_playback_finished(id, origin).await;
                    let _ = tx.send(AppMessage::Outcome(outcome, Source::Player)).await;
                });
            }
            debug!("playback event channel closed");
        });
    }

    /// Run one orchestrator operation off the UI task and report its outcome.
    fn spawn_op<F, Fut>(&mut self, spinner: Option<String>, op: F)
    where
        F: FnOnce(RadioOrchestrator) -> Fut + Send + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        let source = match spinner {
            Some(msg) => {
                self.toast.spinner(msg);
                Source::KeyWithSpinner
            }
            None => Source::Key,
        };
        let orchestrator = self.orchestrator.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = op(orchestrator).await;
            let _ = tx.send(AppMessage::Outcome(outcome, source)).await;
        });
    }

    // ── Message handler ───────────────────────────────────────────────────────

    async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                if key.kind == KeyEventKind::Release {
                    return;
                }
                for action in self.handle_key(key) {
                    self.dispatch(action).await;
                }
            }
            AppMessage::Event(_) => {}
            AppMessage::Outcome(outcome, source) => self.report(outcome, source),
            AppMessage::SearchDone { query, result } => {
                self.state.searching = false;
                self.toast.dismiss_spinner();
                match result {
                    Ok(songs) => {
                        info!("search {:?}: {} songs", query, songs.len());
                        if songs.is_empty() {
                            self.toast.warning(format!("No songs found for \"{}\"", query));
                        } else {
                            self.toast.info(format!("{} songs", songs.len()));
                        }
                        self.results.set_results(songs);
                    }
                    Err(e) => {
                        warn!("search {:?} failed: {}", query, e);
                        self.toast.error(format!("Search failed: {}", e));
                    }
                }
            }
            AppMessage::Log(line) => self.state.push_log(line),
        }
    }

    fn report(&mut self, outcome: Outcome, source: Source) {
        if source == Source::KeyWithSpinner {
            self.toast.dismiss_spinner();
        }
        if outcome == Outcome::Saved && self.quitting {
            info!("quit: {}", outcome);
            self.should_quit = true;
            return;
        }
        // A finish that lost the race to a skip, or arrived for a stale
        // playback, is nothing the user needs to see.
        if source == Source::Player
            && matches!(outcome, Outcome::Ignored | Outcome::AlreadyAdvancing)
        {
            return;
        }
        if outcome == Outcome::Ignored {
            return;
        }

        let text = outcome.to_string();
        self.state
            .push_log(format!("{} {}", chrono::Local::now().format("%H:%M:%S"), text));
        if outcome.is_error() {
            self.toast.error(text);
        } else if outcome.is_warning() {
            self.toast.warning(text);
        } else {
            self.toast.success(text);
        }
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if self.help.visible {
            return vec![Action::ToggleHelp];
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return vec![Action::Quit];
        }
        if self.state.input_mode == InputMode::Search {
            return self.results.handle_search_key(key);
        }
        if let Some(action) = global_action(key) {
            return vec![action];
        }

        let s = &self.state;
        match self.focus.current() {
            Some(ComponentId::Results) => self.results.handle_key(key, s),
            Some(ComponentId::Queue) => self.queue.handle_key(key, s),
            Some(ComponentId::LogPanel) => self.log_panel.handle_key(key, s),
            None => vec![],
        }
    }

    async fn dispatch(&mut self, action: Action) {
        debug!("dispatch: {:?}", action);
        match action {
            // ── Playback ──────────────────────────────────────────────────────
            Action::PlaySelection => match self.results.selected_song().cloned() {
                Some(song) => self.play(song),
                None => self.toast.warning("Search for a song first"),
            },
            Action::PlaySong(song) => self.play(song),
            Action::StartRadioFromSelection => match self.results.selected_song().cloned() {
                Some(song) => self.start_radio(song),
                None => self.toast.warning("Highlight a song to start a radio from"),
            },
            Action::StartRadio(song) => self.start_radio(song),
            Action::Next => self.spawn_op(Some("Next song…".into()), |o| async move {
                o.manual_next().await
            }),
            Action::StopRadio => self.spawn_op(None, |o| async move { o.stop_radio().await }),
            Action::Disconnect => self.spawn_op(None, |o| async move { o.disconnect().await }),
            Action::Resume => self.spawn_op(Some("Resuming…".into()), |o| async move {
                o.resume().await
            }),
            Action::StopAll => self.spawn_op(None, |o| async move { o.stop_all().await }),

            // ── Navigation ────────────────────────────────────────────────────
            Action::FocusNext | Action::FocusPrev => {
                if action == Action::FocusNext {
                    self.focus.next();
                } else {
                    self.focus.prev();
                }
            }
            Action::SelectUp(_) | Action::SelectDown(_) | Action::SelectFirst | Action::SelectLast => {
                let s = &self.state;
                match self.focus.current() {
                    Some(ComponentId::Results) => self.results.on_action(&action, s),
                    Some(ComponentId::Queue) => self.queue.on_action(&action, s),
                    _ => vec![],
                };
            }

            // ── Search ────────────────────────────────────────────────────────
            Action::OpenSearch => {
                self.state.input_mode = InputMode::Search;
                self.results.on_action(&action, &self.state);
            }
            Action::CloseSearch => {
                self.state.input_mode = InputMode::Normal;
                self.results.on_action(&action, &self.state);
            }
            Action::Search(query) => self.search(query),

            // ── UI toggles ────────────────────────────────────────────────────
            Action::ToggleQueue => {
                self.spawn_op(None, |o| async move { o.toggle_queue_visible().await })
            }
            Action::ToggleLogs => {
                self.log_panel.on_action(&action, &self.state);
                self.sync_focus();
            }
            Action::ToggleHelp => self.help.toggle(),

            // ── System ────────────────────────────────────────────────────────
            // Saving waits for any advance in flight, so it runs off the loop.
            // A second quit leaves without waiting.
            Action::Quit if self.quitting => {
                warn!("quit: leaving before the session was saved");
                self.should_quit = true;
            }
            Action::Quit => {
                self.quitting = true;
                self.spawn_op(Some("Saving session…".into()), |o| async move { o.quit().await });
            }
            Action::Noop => {}
        }
    }

    fn play(&mut self, song: Song) {
        let label = format!("Starting {}…", song.title);
        self.spawn_op(Some(label), move |o| async move { o.play_song(song).await });
    }

    fn start_radio(&mut self, seed: Song) {
        let label = format!("Starting radio from {}…", seed.title);
        self.spawn_op(Some(label), move |o| async move { o.start_radio(seed).await });
    }

    fn search(&mut self, query: String) {
        self.state.searching = true;
        self.state.last_query = Some(query.clone());
        self.results.set_results(Vec::new());
        self.toast.spinner(format!("Searching \"{}\"…", query));
        self.focus.set_items(self.focus_items());

        let orchestrator = self.orchestrator.clone();
        let tx = self.tx.clone();
        let limit = self.search_limit;
        tokio::spawn(async move {
            let result = orchestrator
                .search(&query, limit)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(AppMessage::SearchDone { query, result }).await;
        });
    }

    // ── State sync ────────────────────────────────────────────────────────────

    fn sync_view(&mut self, view: RadioView) {
        self.state.view = view;
        self.state.phase = self.orchestrator.phase();
        self.sync_focus();
    }

    fn focus_items(&self) -> Vec<ComponentId> {
        let mut items = vec![ComponentId::Results];
        if self.state.view.radio.queue_visible {
            items.push(ComponentId::Queue);
        }
        if self.log_panel.expanded {
            items.push(ComponentId::LogPanel);
        }
        items
    }

    fn sync_focus(&mut self) {
        let items = self.focus_items();
        self.focus.set_items(items);
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        use crate::theme::C_BG;
        use ratatui::widgets::Block;

        let area = frame.area();
        frame.render_widget(
            Block::default().style(ratatui::style::Style::default().bg(C_BG)),
            area,
        );

        let log_h = if self.log_panel.expanded { 10 } else { 1 };
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(log_h),
                Constraint::Length(1),
            ])
            .split(area);

        header::draw(frame, outer[0], &self.state);

        let body = outer[1];
        if self.state.view.radio.queue_visible {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(body);
            let results_focused = self.focus.is_focused(ComponentId::Results);
            let queue_focused = self.focus.is_focused(ComponentId::Queue);
            self.results.draw(frame, cols[0], results_focused, &self.state);
            self.queue.draw(frame, cols[1], queue_focused, &self.state);
        } else {
            let focused = self.focus.is_focused(ComponentId::Results);
            self.results.draw(frame, body, focused, &self.state);
        }

        let log_focused = self.focus.is_focused(ComponentId::LogPanel);
        self.log_panel.draw(frame, outer[2], log_focused, &self.state);

        status_bar::draw_keys_bar(frame, outer[3], self.state.input_mode, self.state.phase);

        self.help.draw(frame, area);
        self.toast.draw(frame, area);
    }
}

/// Leave raw mode and the alternate screen. Safe to call more than once.
pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// Keys that mean the same thing whichever pane has focus (outside the
/// search bar).
fn global_action(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            KeyCode::Char('r') => Some(Action::StopRadio),
            KeyCode::Char('s') => Some(Action::StopAll),
            _ => None,
        };
    }
    let action = match key.code {
        KeyCode::Char('/') | KeyCode::Char('s') => Action::OpenSearch,
        KeyCode::Char('R') => Action::StartRadioFromSelection,
        KeyCode::Char('n') => Action::Next,
        KeyCode::Char('Q') => Action::ToggleQueue,
        KeyCode::Char('r') => Action::Disconnect,
        KeyCode::Char('p') => Action::Resume,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('L') => Action::ToggleLogs,
        KeyCode::Char('?') => Action::ToggleHelp,
        KeyCode::Tab => Action::FocusNext,
        KeyCode::BackTab => Action::FocusPrev,
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_control_bindings() {
        let ctrl = KeyModifiers::CONTROL;
        assert_eq!(global_action(key(KeyCode::Char('r'), ctrl)), Some(Action::StopRadio));
        assert_eq!(global_action(key(KeyCode::Char('s'), ctrl)), Some(Action::StopAll));
        assert_eq!(global_action(key(KeyCode::Char('c'), ctrl)), Some(Action::Quit));
        assert_eq!(global_action(key(KeyCode::Char('n'), ctrl)), None);
    }

    #[test]
    fn test_plain_and_shifted_bindings() {
        let none = KeyModifiers::NONE;
        let shift = KeyModifiers::SHIFT;
        assert_eq!(global_action(key(KeyCode::Char('r'), none)), Some(Action::Disconnect));
        assert_eq!(
            global_action(key(KeyCode::Char('R'), shift)),
            Some(Action::StartRadioFromSelection)
        );
        assert_eq!(global_action(key(KeyCode::Char('Q'), shift)), Some(Action::ToggleQueue));
        assert_eq!(global_action(key(KeyCode::Char('s'), none)), Some(Action::OpenSearch));
        assert_eq!(global_action(key(KeyCode::Char('/'), none)), Some(Action::OpenSearch));
        assert_eq!(global_action(key(KeyCode::Char('p'), none)), Some(Action::Resume));
        assert_eq!(global_action(key(KeyCode::Esc, none)), Some(Action::Quit));
    }

    #[test]
    fn test_list_keys_fall_through() {
        let none = KeyModifiers::NONE;
        assert_eq!(global_action(key(KeyCode::Char('j'), none)), None);
        assert_eq!(global_action(key(KeyCode::Enter, none)), None);
    }

    mod quit {
        use super::*;
        use std::sync::Arc;

        use async_trait::async_trait;
        use tokio::sync::Notify;
        use ytradio_core::{
            CatalogProvider, FetchError, PlaybackId, PlaybackOrigin, Player, SpawnError, StateStore,
        };

        /// Keeps `related_songs` open until released, so the radio start
        /// holds the session.
        struct HeldCatalog {
            entered: Notify,
            release: Notify,
        }

        #[async_trait]
        impl CatalogProvider for HeldCatalog {
            async fn related_songs(&self, _seed: &str, _limit: usize) -> Result<Vec<Song>, FetchError> {
                self.entered.notify_one();
                self.release.notified().await;
                Ok(vec![Song::new("Next", "Artist", "next")])
            }

            async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Song>, FetchError> {
                Ok(Vec::new())
            }
        }

        struct SilentPlayer;

        #[async_trait]
        impl Player for SilentPlayer {
            async fn play(&self, _song: &Song, _origin: PlaybackOrigin) -> Result<PlaybackId, SpawnError> {
                Ok(PlaybackId(1))
            }

            fn disconnect_current(&self) -> Option<PlaybackId> {
                None
            }

            async fn terminate_all(&self) -> usize {
                0
            }
        }

        async fn busy_app(
            dir: &tempfile::TempDir,
        ) -> (App, Arc<HeldCatalog>, mpsc::Receiver<AppMessage>) {
            let catalog = Arc::new(HeldCatalog {
                entered: Notify::new(),
                release: Notify::new(),
            });
            let orchestrator = RadioOrchestrator::new(
                catalog.clone(),
                Arc::new(SilentPlayer),
                StateStore::new(dir.path().join("state.json")),
            );
            let mut app = App::new(orchestrator, 10, false);
            let rx = app.rx.take().unwrap();
            app.start_radio(Song::new("Seed", "Artist", "seed"));
            catalog.entered.notified().await;
            (app, catalog, rx)
        }

        #[tokio::test]
        async fn test_quit_does_not_block_on_busy_session() {
            let dir = tempfile::tempdir().unwrap();
            let (mut app, catalog, mut rx) = busy_app(&dir).await;

            tokio::time::timeout(Duration::from_millis(200), app.dispatch(Action::Quit))
                .await
                .expect("quit held up the event loop");
            assert!(!app.should_quit);

            catalog.release.notify_one();
            while !app.should_quit {
                let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                    .await
                    .expect("no outcome arrived")
                    .expect("message channel closed");
                app.handle_message(msg).await;
            }

            let saved = StateStore::new(dir.path().join("state.json"))
                .load()
                .await
                .unwrap();
            assert!(saved.was_radio_active_when_disconnected);
        }

        #[tokio::test]
        async fn test_second_quit_leaves_immediately() {
            let dir = tempfile::tempdir().unwrap();
            let (mut app, catalog, _rx) = busy_app(&dir).await;

            app.dispatch(Action::Quit).await;
            assert!(!app.should_quit);
            app.dispatch(Action::Quit).await;
            assert!(app.should_quit);

            catalog.release.notify_one();
        }
    }
}
