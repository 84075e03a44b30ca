//! Backend deployments the comparator can reach

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::timed;
use crate::error::{GatewayError, Result};

/// The two candidate deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    Ec2,
    Lambda,
}

impl BackendId {
    pub const ALL: [BackendId; 2] = [BackendId::Ec2, BackendId::Lambda];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ec2 => "ec2",
            Self::Lambda => "lambda",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendId {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ec2" => Ok(Self::Ec2),
            "lambda" => Ok(Self::Lambda),
            other => Err(GatewayError::BadRequest(format!(
                "Unknown backend: {} (expected ec2 or lambda)",
                other
            ))),
        }
    }
}

/// Whatever the backend answered, regardless of status
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    pub status: u16,
    /// Decoded JSON body, or why the body could not be decoded
    pub body: std::result::Result<Value, String>,
}

impl BackendReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self { status, body: Ok(body) }
    }

    pub fn undecodable(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            body: Err(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A deployment reachable with a gateway request payload
#[async_trait]
pub trait Backend: Send + Sync {
    fn id(&self) -> BackendId;

    /// Send `payload` once. Only failures to get any reply are errors.
    async fn call(&self, payload: &Value) -> Result<BackendReply>;
}

/// Result of one call against one backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendResult {
    pub backend_id: BackendId,
    pub success: bool,
    pub latency_ms: f64,
    /// HTTP status, when a reply was received
    pub status: Option<u16>,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl BackendResult {
    pub fn succeeded(backend_id: BackendId, latency_ms: f64, status: u16, result: Value) -> Self {
        Self {
            backend_id,
            success: true,
            latency_ms,
            status: Some(status),
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(backend_id: BackendId, latency_ms: f64, status: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            backend_id,
            success: false,
            latency_ms,
            status,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Call `backend` once and classify the outcome; never fails
pub async fn measure(backend: &dyn Backend, payload: &Value) -> BackendResult {
    let id = backend.id();
    let (outcome, latency_ms) = timed(backend.call(payload)).await;

    match outcome {
        Ok(reply) => {
            let status = reply.status;
            let err = match (reply.is_success(), reply.body) {
                (true, Ok(body)) => return BackendResult::succeeded(id, latency_ms, status, body),
                (true, Err(reason)) => GatewayError::Transport(reason),
                (false, Ok(body)) => GatewayError::Transport(format!("HTTP {}: {}", status, body)),
                (false, Err(reason)) => GatewayError::Transport(format!("HTTP {}: {}", status, reason)),
            };
            log::debug!("{} answered {} after {:.3}ms: {}", id, status, latency_ms, err);
            BackendResult::failed(id, latency_ms, Some(status), err.to_string())
        }
        Err(err) => {
            log::debug!("{} call failed after {:.3}ms: {}", id, latency_ms, err);
            BackendResult::failed(id, latency_ms, None, err.to_string())
        }
    }
}

/// A gateway deployment reached over HTTP at `<base_url>/mcp`
#[derive(Debug, Clone)]
pub struct HttpBackend {
    id: BackendId,
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(id: BackendId, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(id, base_url, client, timeout))
    }

    /// Share an existing client; `timeout` is applied per request
    pub fn with_client(id: BackendId, base_url: &str, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            id,
            endpoint: format!("{}/mcp", base_url.trim_end_matches('/')),
            client,
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Transport(format!(
                "request to {} timed out after {}ms",
                self.endpoint,
                self.timeout.as_millis()
            ))
        } else if err.is_connect() {
            GatewayError::Transport(format!("connection to {} failed: {}", self.endpoint, err))
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    async fn call(&self, payload: &Value) -> Result<BackendReply> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        let reply = match serde_json::from_str(&text) {
            Ok(body) => BackendReply::json(status, body),
            Err(e) => BackendReply::undecodable(status, format!("invalid JSON from {}: {}", self.endpoint, e)),
        };
        Ok(reply)
    }
}
