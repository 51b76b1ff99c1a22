//! Command-description events emitted by a pass.

use parking_lot::Mutex;
use tracing::info;

/// Receives user-facing progress messages.
pub trait PassObserver: Send + Sync {
    /// A command is about to run. `highlight` names the tool, for example
    /// `"automoc"`.
    fn command_description(&self, highlight: &str, message: &str);
}

/// Forwards events to `tracing` at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl PassObserver for TracingObserver {
    fn command_description(&self, highlight: &str, message: &str) {
        info!(tool = highlight, "{message}");
    }
}

/// Keeps every event, for tests and embedding front ends.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(String, String)>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events so far as `(highlight, message)` pairs.
    pub fn events(&self) -> Vec<(String, String)> {
        self.events.lock().clone()
    }
}

impl PassObserver for RecordingObserver {
    fn command_description(&self, highlight: &str, message: &str) {
        self.events
            .lock()
            .push((highlight.to_string(), message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let observer = RecordingObserver::new();
        observer.command_description("automoc", "first");
        observer.command_description("automoc", "second");
        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], ("automoc".to_string(), "second".to_string()));
    }
}
