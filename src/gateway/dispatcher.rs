//! Gateway dispatcher - interprets an action and routes it to the registry and envelope

use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::envelope::{InvocationEnvelope, elapsed_ms, panic_message};
use crate::error::{GatewayError, Result};
use crate::id::resolve_request_id;
use crate::observability::{Event, ObservabilitySink};
use crate::tools::{Parameters, ToolRegistry};

/// Outer request envelope posted to `/mcp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub action: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl GatewayRequest {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            data: None,
        }
    }

    pub fn list_tools() -> Self {
        Self::new(Action::ListTools.as_str())
    }

    pub fn invoke_tool(tool_name: impl Into<String>, parameters: Value) -> Self {
        Self::new(Action::InvokeTool.as_str()).with_data(json!({
            "tool_name": tool_name.into(),
            "parameters": parameters
        }))
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Outer response envelope; `latency_ms` covers the whole dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub latency_ms: f64,
}

impl GatewayResponse {
    pub fn ok(data: Value, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
        }
    }

    pub fn failed(error: impl Into<String>, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            latency_ms,
        }
    }
}

/// Actions understood by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListTools,
    InvokeTool,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListTools => "list_tools",
            Self::InvokeTool => "invoke_tool",
        }
    }
}

impl FromStr for Action {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "list_tools" => Ok(Self::ListTools),
            "invoke_tool" => Ok(Self::InvokeTool),
            other => Err(GatewayError::BadRequest(format!("Unknown action: {}", other))),
        }
    }
}

/// Payload of an `invoke_tool` action
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolRequest {
    pub tool_name: String,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// A request refused at the transport level (400/404)
#[derive(Debug)]
pub struct Rejection {
    pub error: GatewayError,
    /// Time spent before the request was refused
    pub latency_ms: f64,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} after {:.3}ms", self.error, self.latency_ms)
    }
}

impl std::error::Error for Rejection {}

enum Outcome {
    /// Response data plus a summary for the event log
    Completed { data: Value, summary: Value },
    /// Handled fault: 200 with `success=false`
    Faulted(GatewayError),
    /// Transport-level rejection (400/404)
    Rejected(GatewayError),
}

/// Single entry point for gateway requests
pub struct Gateway {
    registry: ToolRegistry,
    envelope: InvocationEnvelope,
    sink: ObservabilitySink,
}

impl Gateway {
    pub fn new(registry: ToolRegistry, sink: ObservabilitySink) -> Self {
        Self {
            registry,
            envelope: InvocationEnvelope::new(sink.clone()),
            sink,
        }
    }

    /// Bound every tool execution by `timeout`
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.envelope = self.envelope.with_timeout(timeout);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn sink(&self) -> &ObservabilitySink {
        &self.sink
    }

    /// Parse a raw request body and dispatch it
    ///
    /// A body that is not a JSON object with a string `action` is a `BadRequest`.
    pub async fn dispatch_bytes(&self, body: &[u8]) -> std::result::Result<GatewayResponse, Rejection> {
        let start = Instant::now();
        match serde_json::from_slice::<GatewayRequest>(body) {
            Ok(request) => self.dispatch_from(start, request).await,
            Err(e) => {
                let error = GatewayError::BadRequest(format!("Malformed request body: {}", e));
                let latency_ms = elapsed_ms(start);
                self.sink
                    .record(Event::request("malformed_request", latency_ms).with_error(error.to_string()));
                Err(Rejection { error, latency_ms })
            }
        }
    }

    /// Dispatch a parsed request
    ///
    /// Returns `Err` only for `BadRequest` and `NotFound`; every other failure is
    /// folded into a `success=false` response.
    pub async fn dispatch(&self, request: GatewayRequest) -> std::result::Result<GatewayResponse, Rejection> {
        self.dispatch_from(Instant::now(), request).await
    }

    async fn dispatch_from(
        &self,
        start: Instant,
        request: GatewayRequest,
    ) -> std::result::Result<GatewayResponse, Rejection> {
        let action = request.action.clone();

        let outcome = match AssertUnwindSafe(self.route(request)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => Outcome::Faulted(GatewayError::Internal(panic_message(payload.as_ref()))),
        };
        let latency_ms = elapsed_ms(start);

        match outcome {
            Outcome::Completed { data, summary } => {
                self.sink.record(Event::request(&action, latency_ms).with_data(summary));
                Ok(GatewayResponse::ok(data, latency_ms))
            }
            Outcome::Faulted(err) => {
                let message = err.to_string();
                log::error!("Dispatch of {} failed after {:.3}ms: {}", action, latency_ms, message);
                self.sink.record(Event::request(&action, latency_ms).with_error(&message));
                Ok(GatewayResponse::failed(message, latency_ms))
            }
            Outcome::Rejected(err) => {
                log::warn!("Rejected {} request after {:.3}ms: {}", action, latency_ms, err);
                self.sink.record(
                    Event::request(&action, latency_ms)
                        .with_data(json!({"code": err.code()}))
                        .with_error(err.detail()),
                );
                Err(Rejection { error: err, latency_ms })
            }
        }
    }

    async fn route(&self, request: GatewayRequest) -> Outcome {
        if matches!(&request.data, Some(data) if !data.is_object() && !data.is_null()) {
            return Outcome::Rejected(GatewayError::BadRequest(
                "Malformed request body: data must be an object".to_string(),
            ));
        }

        match request.action.parse::<Action>() {
            Ok(Action::ListTools) => self.list_tools(),
            Ok(Action::InvokeTool) => self.invoke_tool(request.data).await,
            Err(err) => Outcome::Rejected(err),
        }
    }

    fn list_tools(&self) -> Outcome {
        let tools = self.registry.list();
        let summary = json!({"tool_count": tools.len()});
        match serde_json::to_value(&tools) {
            Ok(tools) => Outcome::Completed {
                data: json!({"tools": tools}),
                summary,
            },
            Err(e) => Outcome::Faulted(GatewayError::Internal(e.to_string())),
        }
    }

    async fn invoke_tool(&self, data: Option<Value>) -> Outcome {
        let fields = match data {
            Some(Value::Object(fields)) if !fields.is_empty() => fields,
            _ => return Outcome::Rejected(GatewayError::BadRequest("Missing tool invocation data".to_string())),
        };

        let request: ToolRequest = match serde_json::from_value(Value::Object(fields)) {
            Ok(request) => request,
            Err(e) => {
                return Outcome::Faulted(GatewayError::InvalidInput(format!("Invalid tool invocation data: {}", e)));
            }
        };

        let Some(tool) = self.registry.get(&request.tool_name) else {
            return Outcome::Rejected(GatewayError::NotFound(format!("Tool '{}' not found", request.tool_name)));
        };

        let request_id = resolve_request_id(request.request_id);
        let response = self
            .envelope
            .invoke(tool.as_ref(), &request.parameters, request_id)
            .await;

        let summary = json!({
            "tool_name": response.tool_name,
            "tool_success": response.success
        });
        match serde_json::to_value(&response) {
            Ok(data) => Outcome::Completed { data, summary },
            Err(e) => Outcome::Faulted(GatewayError::Internal(e.to_string())),
        }
    }
}
