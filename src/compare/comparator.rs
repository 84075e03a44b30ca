//! Dual-backend comparator - route to one backend or race both

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::backend::{Backend, BackendId, BackendResult, HttpBackend, measure};
use crate::config::BackendsConfig;
use crate::error::{GatewayError, Result};
use crate::gateway::GatewayResponse;
use crate::observability::{Event, ObservabilitySink};

/// Result of racing the same payload against every configured backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    /// One entry per backend, ec2 first
    pub results: Vec<BackendResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faster_backend: Option<BackendId>,
}

impl ComparisonOutcome {
    pub fn result(&self, id: BackendId) -> Option<&BackendResult> {
        self.results.iter().find(|r| r.backend_id == id)
    }

    /// Error strings of every failed backend
    pub fn errors(&self) -> Vec<&str> {
        self.results.iter().filter_map(|r| r.error.as_deref()).collect()
    }
}

/// Successful result with strictly lowest latency; ties keep the earlier entry
pub fn pick_faster(results: &[BackendResult]) -> Option<BackendId> {
    results
        .iter()
        .filter(|r| r.success)
        .fold(None::<&BackendResult>, |best, r| match best {
            Some(b) if b.latency_ms <= r.latency_ms => Some(b),
            _ => Some(r),
        })
        .map(|r| r.backend_id)
}

pub struct Comparator {
    backends: Vec<Arc<dyn Backend>>,
    sink: ObservabilitySink,
}

impl Comparator {
    /// Backends are ordered ec2 first; a repeated id keeps the last one given
    pub fn new(backends: Vec<Arc<dyn Backend>>) -> Self {
        let mut ordered: Vec<Arc<dyn Backend>> = Vec::with_capacity(backends.len());
        for backend in backends {
            ordered.retain(|b| b.id() != backend.id());
            ordered.push(backend);
        }
        ordered.sort_by_key(|b| b.id());
        Self {
            backends: ordered,
            sink: ObservabilitySink::disabled(),
        }
    }

    /// HTTP backends for every configured URL; errors when none is set
    pub fn from_config(config: &BackendsConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let mut backends: Vec<Arc<dyn Backend>> = Vec::new();
        for id in BackendId::ALL {
            if let Some(url) = config.url(id) {
                log::debug!("Configured {} backend at {}", id, url);
                backends.push(Arc::new(HttpBackend::with_client(id, url, client.clone(), timeout)));
            }
        }

        if backends.is_empty() {
            return Err(GatewayError::Config("No backends configured".to_string()));
        }
        Ok(Self::new(backends))
    }

    pub fn with_sink(mut self, sink: ObservabilitySink) -> Self {
        self.sink = sink;
        self
    }

    pub fn backend_ids(&self) -> Vec<BackendId> {
        self.backends.iter().map(|b| b.id()).collect()
    }

    pub fn backend(&self, id: BackendId) -> Option<&Arc<dyn Backend>> {
        self.backends.iter().find(|b| b.id() == id)
    }

    /// Send `payload` to one backend; transport failures become `success=false`
    pub async fn route(&self, payload: &Value, id: BackendId) -> Result<GatewayResponse> {
        let backend = self
            .backend(id)
            .ok_or_else(|| GatewayError::NotFound(format!("Backend '{}' is not configured", id)))?;

        let result = measure(backend.as_ref(), payload).await;
        let latency_ms = result.latency_ms;

        let mut event = Event::request("route", latency_ms).with_data(json!({
            "backend": id,
            "status": result.status
        }));
        if let Some(error) = &result.error {
            event = event.with_error(error);
        }
        self.sink.record(event);

        let error = result.error.clone();
        let data = serde_json::to_value(&result)?;
        Ok(GatewayResponse {
            success: result.success,
            data: Some(data),
            error,
            latency_ms,
        })
    }

    /// Send `payload` to every backend concurrently and pick the faster one
    pub async fn compare(&self, payload: &Value) -> ComparisonOutcome {
        let calls = self.backends.iter().map(|b| measure(b.as_ref(), payload));
        let results = join_all(calls).await;
        let faster_backend = pick_faster(&results);

        let latencies: Vec<Value> = results
            .iter()
            .map(|r| json!({"backend": r.backend_id, "latency_ms": r.latency_ms, "success": r.success}))
            .collect();
        let wall_ms = results.iter().map(|r| r.latency_ms).fold(0.0, f64::max);
        let mut event = Event::request("compare", wall_ms).with_data(json!({
            "faster_backend": faster_backend,
            "results": latencies
        }));
        if faster_backend.is_none() {
            event = event.with_error("All backends failed");
        }
        self.sink.record(event);

        match faster_backend {
            Some(id) => log::info!("Faster backend: {}", id),
            None => log::warn!("No backend succeeded"),
        }

        ComparisonOutcome {
            results,
            faster_backend,
        }
    }
}
