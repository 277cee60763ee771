//! User-facing output sinks.
//!
//! Steps report progress through [`Ui`] rather than printing directly, so
//! the same pipeline can write to a terminal or be captured in tests.

use parking_lot::Mutex;

/// Output sink for progress messages.
///
/// Implementations must be `Sync`: the command runner forwards subprocess
/// output from reader threads.
pub trait Ui: Send + Sync {
    /// Announce a new phase of work.
    fn say(&self, message: &str);

    /// Detail line, e.g. forwarded subprocess stdout.
    fn message(&self, message: &str);

    /// Error line, e.g. forwarded subprocess stderr.
    fn error(&self, message: &str);
}

/// Terminal UI prefixing every line with a component name.
#[derive(Debug, Clone)]
pub struct ConsoleUi {
    prefix: String,
}

impl ConsoleUi {
    /// Create a console UI for the named component (e.g. "lume.cli").
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Ui for ConsoleUi {
    fn say(&self, message: &str) {
        println!("==> {}: {}", self.prefix, message);
    }

    fn message(&self, message: &str) {
        println!("    {}: {}", self.prefix, message);
    }

    fn error(&self, message: &str) {
        eprintln!("==> {}: {}", self.prefix, message);
    }
}

/// UI that discards everything, for machine-readable output modes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullUi;

impl Ui for NullUi {
    fn say(&self, _message: &str) {}

    fn message(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}

/// Kind of a recorded UI line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiLevel {
    /// From [`Ui::say`].
    Say,
    /// From [`Ui::message`].
    Message,
    /// From [`Ui::error`].
    Error,
}

/// UI that keeps every line in memory.
#[derive(Debug, Default)]
pub struct RecordingUi {
    lines: Mutex<Vec<(UiLevel, String)>>,
}

impl RecordingUi {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded lines in order.
    pub fn lines(&self) -> Vec<(UiLevel, String)> {
        self.lines.lock().clone()
    }

    /// Recorded lines of one level.
    pub fn lines_at(&self, level: UiLevel) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn push(&self, level: UiLevel, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}

impl Ui for RecordingUi {
    fn say(&self, message: &str) {
        self.push(UiLevel::Say, message);
    }

    fn message(&self, message: &str) {
        self.push(UiLevel::Message, message);
    }

    fn error(&self, message: &str) {
        self.push(UiLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_ui_keeps_order_and_levels() {
        let ui = RecordingUi::new();
        ui.say("Creating virtual machine...");
        ui.message("downloading");
        ui.error("warning: slow mirror");

        assert_eq!(ui.lines().len(), 3);
        assert_eq!(ui.lines()[0], (UiLevel::Say, "Creating virtual machine...".into()));
        assert_eq!(ui.lines_at(UiLevel::Message), vec!["downloading"]);
        assert_eq!(ui.lines_at(UiLevel::Error), vec!["warning: slow mirror"]);
    }
}
