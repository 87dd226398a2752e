use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info};

/// Observer for crawl progress.
///
/// Purely informational: the engine never reads anything back from it.
pub trait CrawlEvents: Send + Sync {
    fn event(&self, context: &str, event: &str, message: &str);
    fn error_event(&self, context: &str, event: &str, message: &str);
}

/// Forwards every event to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvents;

impl CrawlEvents for TracingEvents {
    fn event(&self, context: &str, event: &str, message: &str) {
        info!(context, event, "{}", message);
    }

    fn error_event(&self, context: &str, event: &str, message: &str) {
        error!(context, event, "{}", message);
    }
}

/// Whether a recorded event was informational or an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub level: EventLevel,
    pub context: String,
    pub event: String,
    pub message: String,
}

/// Keeps every event in memory; handy for tests and post-run summaries
#[derive(Debug, Default, Clone)]
pub struct RecordingEvents {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages of every event with the given name
    pub fn messages(&self, event: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|recorded| recorded.event == event)
            .map(|recorded| recorded.message)
            .collect()
    }

    fn push(&self, level: EventLevel, context: &str, event: &str, message: &str) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent {
                level,
                context: context.to_string(),
                event: event.to_string(),
                message: message.to_string(),
            });
    }
}

impl CrawlEvents for RecordingEvents {
    fn event(&self, context: &str, event: &str, message: &str) {
        self.push(EventLevel::Info, context, event, message);
    }

    fn error_event(&self, context: &str, event: &str, message: &str) {
        self.push(EventLevel::Error, context, event, message);
    }
}
