//! Action enum: all user-initiated intents.

use ytradio_core::Song;

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Results,
    Queue,
    LogPanel,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Playback ─────────────────────────────────────────────────────────────
    PlaySong(Song),
    StartRadio(Song),
    /// Radio start from whatever row is highlighted in the results list.
    StartRadioFromSelection,
    /// Play whatever row is highlighted in the results list.
    PlaySelection,
    Next,
    StopRadio,
    Disconnect,
    Resume,
    StopAll,

    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    SelectUp(usize),
    SelectDown(usize),
    SelectFirst,
    SelectLast,

    // ── Search ───────────────────────────────────────────────────────────────
    OpenSearch,
    CloseSearch,
    Search(String),

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleQueue,
    ToggleLogs,
    ToggleHelp,

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
    Noop,
}
