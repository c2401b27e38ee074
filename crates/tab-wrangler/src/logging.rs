//! A tracing layer that keeps recent log events in memory so a UI can show
//! what the engine has been doing ("wrangled 3 tabs", "host could not close
//! tab 12", ...).
//!
//! The [`LogBuffer`] has its own mutex, separate from the engine lock, so
//! logging from inside a tick never contends with readers of the buffer.

use std::sync::{Arc, Mutex};

use chrono::Local;
use serde::Serialize;
use tracing::Subscriber;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::registry::LookupSpan;

/// Lines kept before the buffer is trimmed.
pub const MAX_LOG_LINES: usize = 1000;
/// Lines kept after a trim.
pub const LOG_TRIM_TO: usize = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Self::Trace,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Info,
            tracing::Level::WARN => Self::Warn,
            tracing::Level::ERROR => Self::Error,
        }
    }
}

/// One captured log event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    /// Local wall-clock time, `HH:MM:SS`.
    pub time: String,
    pub level: LogLevel,
    pub message: String,
}

/// Shared buffer of captured log lines, oldest first.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<LogLine>>>);

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last `n` lines without removing them.
    pub fn recent(&self, n: usize) -> Vec<LogLine> {
        let buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        let start = buf.len().saturating_sub(n);
        buf.get(start..).map(<[LogLine]>::to_vec).unwrap_or_default()
    }

    /// Take every pending line.
    pub fn drain(&self) -> Vec<LogLine> {
        let mut buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *buf)
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, line: LogLine) {
        let mut buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        buf.push(line);
        if buf.len() > MAX_LOG_LINES {
            let trim_to = buf.len() - LOG_TRIM_TO;
            buf.drain(..trim_to);
        }
    }
}

/// A [`tracing_subscriber::Layer`] that writes events into a [`LogBuffer`].
pub struct CaptureLayer {
    buffer: LogBuffer,
}

impl CaptureLayer {
    /// Create the layer and the buffer it fills.
    pub fn new() -> (Self, LogBuffer) {
        let buffer = LogBuffer::new();
        (
            Self {
                buffer: buffer.clone(),
            },
            buffer,
        )
    }
}

impl<S: Subscriber + for<'a> LookupSpan<'a>> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let mut message = visitor.message;
        if !visitor.fields.is_empty() {
            let extras: Vec<String> = visitor
                .fields
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            if message.is_empty() {
                message = extras.join(" ");
            } else {
                message = format!("{message} {{{}}}", extras.join(", "));
            }
        }

        self.buffer.push(LogLine {
            time: Local::now().format("%H:%M:%S").to_string(),
            level: LogLevel::from(event.metadata().level()),
            message,
        });
    }
}

/// Extracts the message and any extra fields from a tracing event.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let raw = format!("{value:?}");
        if field.name() == "message" {
            self.message = raw;
        } else {
            self.fields.push((field.name().to_string(), raw));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(f: impl FnOnce()) -> LogBuffer {
        let (layer, buffer) = CaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);
        buffer
    }

    #[test]
    fn captures_message_and_level() {
        let buffer = capture(|| {
            tracing::info!("Wrangled tab {}", 7);
            tracing::warn!(tab = 3, "Host could not close tab");
        });

        let lines = buffer.drain();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].level, LogLevel::Info);
        assert_eq!(lines[0].message, "Wrangled tab 7");
        assert_eq!(lines[1].level, LogLevel::Warn);
        assert_eq!(lines[1].message, "Host could not close tab {tab=3}");
        assert!(buffer.is_empty());
    }

    #[test]
    fn recent_keeps_lines() {
        let buffer = capture(|| {
            for i in 0..5 {
                tracing::debug!("line {i}");
            }
        });
        let recent = buffer.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].message, "line 4");
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.recent(50).len(), 5);
    }

    #[test]
    fn buffer_is_bounded() {
        let buffer = LogBuffer::new();
        for i in 0..=MAX_LOG_LINES {
            buffer.push(LogLine {
                time: String::new(),
                level: LogLevel::Info,
                message: i.to_string(),
            });
        }
        assert_eq!(buffer.len(), LOG_TRIM_TO);
        assert_eq!(buffer.recent(1)[0].message, MAX_LOG_LINES.to_string());
    }
}
