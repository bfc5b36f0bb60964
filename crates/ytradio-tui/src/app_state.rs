//! AppState: shared read-only data passed to all components during render/event.
//!
//! The App event-loop is the only thing that writes to AppState.

use std::collections::VecDeque;

use ytradio_core::{Phase, RadioView};

use crate::widgets::status_bar::InputMode;

/// Oldest lines are dropped past this.
pub const MAX_LOG_LINES: usize = 500;

#[derive(Debug, Default)]
pub struct AppState {
    /// Latest snapshot published by the orchestrator.
    pub view: RadioView,
    pub phase: Phase,
    pub input_mode: InputMode,
    /// A search request is in flight.
    pub searching: bool,
    pub last_query: Option<String>,
    /// Status messages and captured WARN/ERROR log lines, oldest first.
    pub logs: VecDeque<String>,
}

impl AppState {
    pub fn push_log(&mut self, line: impl Into<String>) {
        self.logs.push_back(line.into());
        while self.logs.len() > MAX_LOG_LINES {
            self.logs.pop_front();
        }
    }

    pub fn last_log(&self) -> Option<&str> {
        self.logs.back().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_capped() {
        let mut state = AppState::default();
        for i in 0..MAX_LOG_LINES + 10 {
            state.push_log(format!("line {i}"));
        }
        assert_eq!(state.logs.len(), MAX_LOG_LINES);
        assert_eq!(state.logs.front().map(String::as_str), Some("line 10"));
        assert_eq!(state.last_log(), Some(format!("line {}", MAX_LOG_LINES + 9).as_str()));
    }
}
