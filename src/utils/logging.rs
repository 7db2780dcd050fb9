//! Event sinks for planner diagnostics
//!
//! `LogSink` forwards to the `log` facade so the binary decides where output
//! goes. `NullSink` drops everything and `RecordingSink` keeps events in
//! memory for assertions.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use log::Level;

use crate::common::{EventSink, SharedSink};

/// Formats and sends an event to a sink only when the sink wants it.
macro_rules! emit {
    ($sink:expr, $target:expr, $level:expr, $($arg:tt)+) => {{
        let sink: &dyn $crate::common::EventSink = &*$sink;
        if sink.enabled($target, $level) {
            sink.record($target, $level, format_args!($($arg)+));
        }
    }};
}

/// Forwards events to whatever logger is installed behind the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LogSink {
    pub fn shared() -> SharedSink {
        Arc::new(LogSink)
    }
}

impl EventSink for LogSink {
    fn record(&self, target: &'static str, level: Level, message: fmt::Arguments<'_>) {
        log::log!(target: target, level, "{}", message);
    }

    fn enabled(&self, target: &'static str, level: Level) -> bool {
        log::log_enabled!(target: target, level)
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NullSink {
    pub fn shared() -> SharedSink {
        Arc::new(NullSink)
    }
}

impl EventSink for NullSink {
    fn record(&self, _target: &'static str, _level: Level, _message: fmt::Arguments<'_>) {}

    fn enabled(&self, _target: &'static str, _level: Level) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub target: &'static str,
    pub level: Level,
    pub message: String,
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.level == level)
            .count()
    }

    /// True if some event at `level` mentions `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }
}

impl EventSink for RecordingSink {
    fn record(&self, target: &'static str, level: Level, message: fmt::Arguments<'_>) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent {
                target,
                level,
                message: message.to_string(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_captures_events() {
        let sink = RecordingSink::new();
        let shared: SharedSink = sink.clone();
        emit!(shared, "warehouse_rrt::test", Level::Warn, "blocked at {}", 42);
        emit!(shared, "warehouse_rrt::test", Level::Info, "done");

        assert_eq!(sink.count(Level::Warn), 1);
        assert!(sink.contains(Level::Warn, "blocked at 42"));
        assert_eq!(sink.events()[1].target, "warehouse_rrt::test");
    }

    #[test]
    fn test_null_sink_skips_formatting() {
        let sink = NullSink::shared();
        assert!(!sink.enabled("warehouse_rrt::test", Level::Error));
        emit!(sink, "warehouse_rrt::test", Level::Error, "ignored");
    }
}
