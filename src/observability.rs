//! Observability sink - structured event log for dispatches and tool invocations
//!
//! The sink is constructed once at start-up and cloned into every component that
//! records events. Recording is a non-blocking channel send; a single background
//! task drains the channel into an [`EventWriter`]. [`SinkGuard::shutdown`] is the
//! flush point: every event recorded before it is written before it returns.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::id::now_secs_f64;

/// A single observability event
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// One gateway dispatch (or transport-level rejection)
    Request {
        timestamp: f64,
        action: String,
        data: Option<Value>,
        latency_ms: Option<f64>,
        success: bool,
        error: Option<String>,
    },
    /// One tool execution inside the invocation envelope
    ToolInvocation {
        timestamp: f64,
        tool_name: String,
        latency_ms: f64,
        success: bool,
        error: Option<String>,
    },
}

impl Event {
    /// A successful request event
    pub fn request(action: impl Into<String>, latency_ms: f64) -> Self {
        Self::Request {
            timestamp: now_secs_f64(),
            action: action.into(),
            data: None,
            latency_ms: Some(latency_ms),
            success: true,
            error: None,
        }
    }

    /// A successful tool invocation event
    pub fn tool_invocation(tool_name: impl Into<String>, latency_ms: f64) -> Self {
        Self::ToolInvocation {
            timestamp: now_secs_f64(),
            tool_name: tool_name.into(),
            latency_ms,
            success: true,
            error: None,
        }
    }

    /// Attach request data (ignored for tool invocations)
    pub fn with_data(mut self, value: Value) -> Self {
        if let Self::Request { data, .. } = &mut self {
            *data = Some(value);
        }
        self
    }

    /// Mark the event as failed with the given message
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        match &mut self {
            Self::Request { success, error, .. } | Self::ToolInvocation { success, error, .. } => {
                *success = false;
                *error = Some(message.into());
            }
        }
        self
    }

    pub fn success(&self) -> bool {
        match self {
            Self::Request { success, .. } | Self::ToolInvocation { success, .. } => *success,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Request { error, .. } | Self::ToolInvocation { error, .. } => error.as_deref(),
        }
    }
}

/// Destination for drained events
pub trait EventWriter: Send + 'static {
    fn write(&mut self, event: &Event);

    /// Called once after the last event, before the drain task exits
    fn flush(&mut self) {}
}

/// Emits events as structured `tracing` records (forwarded to the log backend)
#[derive(Debug, Default)]
pub struct LogWriter;

impl EventWriter for LogWriter {
    fn write(&mut self, event: &Event) {
        match event {
            Event::Request {
                action,
                data,
                latency_ms,
                success,
                error,
                ..
            } => {
                if *success {
                    tracing::info!(action = %action, latency_ms = ?latency_ms, data = ?data, "Request processed");
                } else {
                    tracing::error!(
                        action = %action,
                        latency_ms = ?latency_ms,
                        data = ?data,
                        error = ?error,
                        "Request failed"
                    );
                }
            }
            Event::ToolInvocation {
                tool_name,
                latency_ms,
                success,
                error,
                ..
            } => {
                if *success {
                    tracing::info!(tool_name = %tool_name, latency_ms = *latency_ms, "Tool invocation completed");
                } else {
                    tracing::error!(
                        tool_name = %tool_name,
                        latency_ms = *latency_ms,
                        error = ?error,
                        "Tool invocation failed"
                    );
                }
            }
        }
    }
}

/// Keeps every event in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events written so far
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl EventWriter for MemoryWriter {
    fn write(&mut self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[derive(Debug)]
enum Message {
    Event(Event),
    Shutdown,
}

/// Cheap, cloneable handle used to record events
#[derive(Debug, Clone)]
pub struct ObservabilitySink {
    tx: Option<mpsc::UnboundedSender<Message>>,
}

impl ObservabilitySink {
    /// Spawn the drain task on the current tokio runtime
    pub fn spawn<W: EventWriter>(mut writer: W) -> (Self, SinkGuard) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        let join = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    Message::Event(event) => writer.write(&event),
                    Message::Shutdown => break,
                }
            }
            writer.flush();
        });

        let sink = Self { tx: Some(tx.clone()) };
        (sink, SinkGuard { tx, join })
    }

    /// A sink that drops every event (no runtime required)
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Record an event; never blocks and never fails
    pub fn record(&self, event: Event) {
        if let Some(tx) = &self.tx {
            // Receiver gone means the sink was shut down; the event is dropped
            let _ = tx.send(Message::Event(event));
        }
    }
}

/// Owns the drain task; shut it down once at process exit
#[derive(Debug)]
pub struct SinkGuard {
    tx: mpsc::UnboundedSender<Message>,
    join: JoinHandle<()>,
}

impl SinkGuard {
    /// Write all queued events, then stop the drain task
    pub async fn shutdown(self) {
        let _ = self.tx.send(Message::Shutdown);
        if let Err(e) = self.join.await {
            log::warn!("Observability drain task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_debug() {
        assert_eq!(format!("{:?}", Message::Shutdown), "Shutdown");
        let message = format!("{:?}", Message::Event(Event::request("list_tools", 1.0)));
        assert!(message.starts_with("Event(Request {"));
    }

    #[test]
    fn test_request_event_defaults() {
        let event = Event::request("list_tools", 1.5);
        assert!(event.success());
        assert!(event.error().is_none());
        match event {
            Event::Request { action, latency_ms, .. } => {
                assert_eq!(action, "list_tools");
                assert_eq!(latency_ms, Some(1.5));
            }
            _ => panic!("Expected request event"),
        }
    }

    #[test]
    fn test_with_error_marks_failure() {
        let event = Event::tool_invocation("search", 0.2).with_error("InvalidInput: Query parameter is required");
        assert!(!event.success());
        assert_eq!(event.error(), Some("InvalidInput: Query parameter is required"));
    }

    #[test]
    fn test_with_data_only_applies_to_requests() {
        let event = Event::request("list_tools", 1.0).with_data(serde_json::json!({"tool_count": 3}));
        match event {
            Event::Request { data, .. } => assert_eq!(data.unwrap()["tool_count"], 3),
            _ => panic!("Expected request event"),
        }

        let event = Event::tool_invocation("search", 1.0).with_data(serde_json::json!({"x": 1}));
        assert!(matches!(event, Event::ToolInvocation { .. }));
    }

    #[test]
    fn test_event_serialization_tag() {
        let json = serde_json::to_value(Event::tool_invocation("database", 2.0)).unwrap();
        assert_eq!(json["event"], "tool_invocation");
        assert_eq!(json["tool_name"], "database");
        assert_eq!(json["success"], true);
    }

    #[test]
    fn test_disabled_sink_accepts_events() {
        let sink = ObservabilitySink::disabled();
        assert!(!sink.is_enabled());
        sink.record(Event::request("list_tools", 1.0));
    }

    #[tokio::test]
    async fn test_shutdown_flushes_all_events() {
        let writer = MemoryWriter::new();
        let (sink, guard) = ObservabilitySink::spawn(writer.clone());

        for i in 0..50 {
            sink.record(Event::tool_invocation(format!("tool_{}", i), i as f64));
        }
        guard.shutdown().await;

        let events = writer.events();
        assert_eq!(events.len(), 50);
        assert!(matches!(&events[49], Event::ToolInvocation { tool_name, .. } if tool_name == "tool_49"));
    }

    #[tokio::test]
    async fn test_record_after_shutdown_is_dropped() {
        let writer = MemoryWriter::new();
        let (sink, guard) = ObservabilitySink::spawn(writer.clone());
        guard.shutdown().await;

        sink.record(Event::request("late", 1.0));
        assert!(writer.events().is_empty());
    }

    #[tokio::test]
    async fn test_log_writer_handles_both_kinds() {
        let (sink, guard) = ObservabilitySink::spawn(LogWriter);
        sink.record(Event::request("invoke_tool", 3.0));
        sink.record(Event::tool_invocation("file_ops", 1.0).with_error("InvalidInput: bad"));
        guard.shutdown().await;
    }
}
