use std::io::{self, Write};

use parking_lot::Mutex;
use tracing::{info, warn};

/// Toast-style sink for mutation outcomes. Calls are fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify_success(&self, message: &str);
    fn notify_failure(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Failure(String),
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Notification::Success(message) | Notification::Failure(message) => message,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Notification::Failure(_))
    }
}

/// Emits notifications as tracing events only.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_success(&self, message: &str) {
        info!(message, "notification");
    }

    fn notify_failure(&self, message: &str) {
        warn!(message, "failure notification");
    }
}

/// Prints notifications for the command line: successes on stdout, failures
/// on stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify_success(&self, message: &str) {
        info!(message, "notification");
        let _ = writeln!(io::stdout().lock(), "{message}");
    }

    fn notify_failure(&self, message: &str) {
        warn!(message, "failure notification");
        let _ = writeln!(io::stderr().lock(), "error: {message}");
    }
}

/// Keeps every notification in order of emission.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.seen
            .lock()
            .iter()
            .filter(|n| n.is_failure())
            .map(|n| n.message().to_string())
            .collect()
    }

    pub fn successes(&self) -> Vec<String> {
        self.seen
            .lock()
            .iter()
            .filter(|n| !n.is_failure())
            .map(|n| n.message().to_string())
            .collect()
    }

    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify_success(&self, message: &str) {
        self.seen.lock().push(Notification::Success(message.to_string()));
    }

    fn notify_failure(&self, message: &str) {
        self.seen.lock().push(Notification::Failure(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_splits_by_kind() {
        let notifier = RecordingNotifier::new();
        notifier.notify_success("Task completed!");
        notifier.notify_failure("Failed to toggle task");
        notifier.notify_success("Task reopened");

        assert_eq!(notifier.successes(), vec!["Task completed!", "Task reopened"]);
        assert_eq!(notifier.failures(), vec!["Failed to toggle task"]);
        assert_eq!(notifier.notifications().len(), 3);

        notifier.clear();
        assert!(notifier.notifications().is_empty());
    }
}
