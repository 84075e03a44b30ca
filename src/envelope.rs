//! Invocation envelope - timing, fault classification and event recording around tool calls
//!
//! [`timed`] is the scoped-timing primitive every layer uses; [`InvocationEnvelope`]
//! applies it to a single tool execution and turns the outcome into a [`ToolResponse`].

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;
use crate::observability::{Event, ObservabilitySink};
use crate::tools::{Parameters, Tool, ToolError};

/// Milliseconds elapsed since `start`
pub fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Await `future`, returning its output and the wall-clock latency in milliseconds
pub async fn timed<F: Future>(future: F) -> (F::Output, f64) {
    let start = Instant::now();
    let output = future.await;
    (output, elapsed_ms(start))
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Outcome of one tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub tool_name: String,
    pub success: bool,
    /// Present iff `success`
    pub result: Option<Value>,
    /// Present iff not `success`, formatted as `<ErrorKind>: <detail>`
    pub error: Option<String>,
    /// Duration of `execute` only
    pub latency_ms: f64,
    pub request_id: String,
}

impl ToolResponse {
    pub fn success(tool_name: impl Into<String>, result: Value, latency_ms: f64, request_id: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            result: Some(result),
            error: None,
            latency_ms,
            request_id: request_id.into(),
        }
    }

    pub fn failure(
        tool_name: impl Into<String>,
        error: impl Into<String>,
        latency_ms: f64,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            result: None,
            error: Some(error.into()),
            latency_ms,
            request_id: request_id.into(),
        }
    }
}

/// Wraps tool execution with timing, an optional timeout and a panic guard
#[derive(Debug, Clone)]
pub struct InvocationEnvelope {
    sink: ObservabilitySink,
    timeout: Option<Duration>,
}

impl InvocationEnvelope {
    pub fn new(sink: ObservabilitySink) -> Self {
        Self { sink, timeout: None }
    }

    /// Fail executions that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Execute `tool` and build its response; never fails
    pub async fn invoke(&self, tool: &dyn Tool, parameters: &Parameters, request_id: impl Into<String>) -> ToolResponse {
        let request_id = request_id.into();
        let tool_name = tool.name().to_string();

        let (outcome, latency_ms) = timed(self.run(tool, parameters)).await;

        match outcome {
            Ok(result) => {
                self.sink.record(Event::tool_invocation(&tool_name, latency_ms));
                ToolResponse::success(tool_name, result, latency_ms, request_id)
            }
            Err(error) => {
                log::debug!("Tool {} failed after {:.3}ms: {}", tool_name, latency_ms, error);
                self.sink
                    .record(Event::tool_invocation(&tool_name, latency_ms).with_error(&error));
                ToolResponse::failure(tool_name, error, latency_ms, request_id)
            }
        }
    }

    async fn run(&self, tool: &dyn Tool, parameters: &Parameters) -> Result<Value, String> {
        let guarded = AssertUnwindSafe(tool.execute(parameters)).catch_unwind();

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let err = ToolError::execution(format!("tool execution timed out after {}ms", limit.as_millis()));
                    return Err(err.to_string());
                }
            },
            None => guarded.await,
        };

        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => Err(err.to_string()),
            Err(payload) => {
                let err = GatewayError::Internal(format!("tool panicked: {}", panic_message(payload.as_ref())));
                Err(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemoryWriter;
    use crate::tools::{DatabaseTool, FileOpsTool, SearchTool, ToolKind, ToolSchema};
    use async_trait::async_trait;
    use serde_json::json;

    fn params(value: Value) -> Parameters {
        serde_json::from_value(value).unwrap()
    }

    struct SlowTool {
        schema: ToolSchema,
        delay: Duration,
    }

    #[async_trait]
    impl Tool for SlowTool {
        fn schema(&self) -> &ToolSchema {
            &self.schema
        }

        async fn execute(&self, _parameters: &Parameters) -> Result<Value, ToolError> {
            tokio::time::sleep(self.delay).await;
            Ok(json!({"slept_ms": self.delay.as_millis() as u64}))
        }
    }

    struct PanickingTool {
        schema: ToolSchema,
    }

    #[async_trait]
    impl Tool for PanickingTool {
        fn schema(&self) -> &ToolSchema {
            &self.schema
        }

        async fn execute(&self, _parameters: &Parameters) -> Result<Value, ToolError> {
            panic!("boom");
        }
    }

    #[tokio::test]
    async fn test_timed_measures_latency() {
        let (value, latency_ms) = timed(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            7
        })
        .await;
        assert_eq!(value, 7);
        assert!(latency_ms >= 20.0);
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let envelope = InvocationEnvelope::new(ObservabilitySink::disabled());
        let response = envelope
            .invoke(&SearchTool::new(), &params(json!({"query": "test", "limit": 5})), "req-1")
            .await;

        assert!(response.success);
        assert!(response.error.is_none());
        assert_eq!(response.tool_name, "search");
        assert_eq!(response.request_id, "req-1");
        assert_eq!(response.result.as_ref().unwrap()["count"], 5);
        assert!(response.latency_ms > 0.0);
    }

    #[tokio::test]
    async fn test_invoke_classifies_invalid_input() {
        let envelope = InvocationEnvelope::new(ObservabilitySink::disabled());
        let response = envelope.invoke(&SearchTool::new(), &params(json!({})), "req-2").await;

        assert!(!response.success);
        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert!(error.starts_with("InvalidInput: "));
        assert!(error.contains("Query parameter is required"));
        assert!(response.latency_ms > 0.0);
    }

    #[tokio::test]
    async fn test_invoke_database_and_file_ops() {
        let envelope = InvocationEnvelope::new(ObservabilitySink::disabled());

        let response = envelope
            .invoke(&DatabaseTool::new(), &params(json!({"operation": "query", "table": "users"})), "db")
            .await;
        assert!(response.success);
        assert_eq!(response.result.unwrap()["affected_rows"], 5);

        let response = envelope
            .invoke(&FileOpsTool::new(), &params(json!({"operation": "write", "path": "/tmp/x"})), "fs")
            .await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("Content parameter is required"));
    }

    #[tokio::test]
    async fn test_invoke_times_out() {
        let tool = SlowTool {
            schema: ToolSchema::new("slow", ToolKind::Search, "Sleeps"),
            delay: Duration::from_millis(500),
        };
        let envelope =
            InvocationEnvelope::new(ObservabilitySink::disabled()).with_timeout(Duration::from_millis(20));

        let response = envelope.invoke(&tool, &Parameters::new(), "slow-1").await;
        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some("ExecutionError: tool execution timed out after 20ms")
        );
        assert!(response.latency_ms < 500.0);
    }

    #[tokio::test]
    async fn test_invoke_catches_panics() {
        let tool = PanickingTool {
            schema: ToolSchema::new("panics", ToolKind::Database, "Always panics"),
        };
        let envelope = InvocationEnvelope::new(ObservabilitySink::disabled());

        let response = envelope.invoke(&tool, &Parameters::new(), "p-1").await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("InternalError: tool panicked: boom"));
    }

    #[tokio::test]
    async fn test_invoke_records_one_event_per_call() {
        let writer = MemoryWriter::new();
        let (sink, guard) = ObservabilitySink::spawn(writer.clone());
        let envelope = InvocationEnvelope::new(sink);

        envelope
            .invoke(&SearchTool::new(), &params(json!({"query": "ok"})), "a")
            .await;
        envelope.invoke(&SearchTool::new(), &params(json!({})), "b").await;
        guard.shutdown().await;

        let events = writer.events();
        assert_eq!(events.len(), 2);
        assert!(events[0].success());
        assert!(!events[1].success());
        assert!(events[1].error().unwrap().starts_with("InvalidInput"));
        assert!(matches!(&events[0], Event::ToolInvocation { tool_name, .. } if tool_name == "search"));
    }

    #[test]
    fn test_tool_response_serialization() {
        let response = ToolResponse::failure("search", "InvalidInput: x", 1.25, "rid");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["result"].is_null());
        assert_eq!(json["error"], "InvalidInput: x");
        assert_eq!(json["request_id"], "rid");
        assert_eq!(json["latency_ms"], 1.25);
    }
}
