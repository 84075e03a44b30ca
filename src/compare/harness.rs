//! Batch harness - drive many requests at each deployment and summarize them

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::backend::{Backend, BackendId, BackendResult, measure};
use super::stats::{DeploymentSummary, LatencyStats};
use crate::error::Result;
use crate::id::now_secs_f64;

/// Progress is logged every this many requests
const PROGRESS_EVERY: usize = 10;

/// Payloads cycled through by the harness
pub fn representative_payloads() -> Vec<Value> {
    vec![
        json!({"action": "list_tools"}),
        json!({
            "action": "invoke_tool",
            "data": {
                "tool_name": "search",
                "parameters": {"query": "test query", "limit": 5}
            }
        }),
        json!({
            "action": "invoke_tool",
            "data": {
                "tool_name": "database",
                "parameters": {"operation": "query", "table": "users"}
            }
        }),
        json!({
            "action": "invoke_tool",
            "data": {
                "tool_name": "file_ops",
                "parameters": {"operation": "list", "path": "/tmp"}
            }
        }),
    ]
}

/// Raw results of one deployment's run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRun {
    pub backend_id: BackendId,
    pub results: Vec<BackendResult>,
}

impl DeploymentRun {
    /// Latencies of successful requests, in request order
    pub fn latencies(&self) -> Vec<f64> {
        self.results.iter().filter(|r| r.success).map(|r| r.latency_ms).collect()
    }

    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    pub fn summary(&self) -> DeploymentSummary {
        DeploymentSummary::from_latencies(&self.latencies(), self.failures())
    }
}

/// Head-to-head figures, present only when both deployments had successes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadToHead {
    /// lambda mean minus ec2 mean
    pub latency_difference_ms: f64,
    /// Difference relative to the ec2 mean, in percent
    pub latency_difference_percent: f64,
    pub reliability_ec2: f64,
    pub reliability_lambda: f64,
    pub faster_deployment: BackendId,
}

impl HeadToHead {
    pub fn between(ec2: &LatencyStats, lambda: &LatencyStats) -> Self {
        let difference = lambda.latency_mean_ms - ec2.latency_mean_ms;
        let percent = if ec2.latency_mean_ms > 0.0 {
            difference / ec2.latency_mean_ms * 100.0
        } else {
            0.0
        };
        let faster_deployment = if ec2.latency_mean_ms < lambda.latency_mean_ms {
            BackendId::Ec2
        } else {
            BackendId::Lambda
        };
        Self {
            latency_difference_ms: difference,
            latency_difference_percent: percent,
            reliability_ec2: ec2.success_rate,
            reliability_lambda: lambda.success_rate,
            faster_deployment,
        }
    }
}

/// Persisted comparison report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchReport {
    /// Unix seconds when the report was built
    pub timestamp: f64,
    pub ec2: DeploymentSummary,
    pub lambda: DeploymentSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faster_backend: Option<BackendId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<HeadToHead>,
    pub runs: Vec<DeploymentRun>,
}

impl BenchReport {
    /// Summarize runs; a deployment without a run counts as having no successes
    pub fn from_runs(runs: Vec<DeploymentRun>) -> Self {
        let summary_for = |id: BackendId| {
            runs.iter()
                .find(|run| run.backend_id == id)
                .map(DeploymentRun::summary)
                .unwrap_or_else(|| DeploymentSummary::from_latencies(&[], 0))
        };
        let ec2 = summary_for(BackendId::Ec2);
        let lambda = summary_for(BackendId::Lambda);

        let comparison = match (ec2.stats(), lambda.stats()) {
            (Some(e), Some(l)) => Some(HeadToHead::between(e, l)),
            _ => None,
        };
        let faster_backend = match (ec2.stats(), lambda.stats()) {
            (Some(_), Some(_)) => comparison.as_ref().map(|c| c.faster_deployment),
            (Some(_), None) => Some(BackendId::Ec2),
            (None, Some(_)) => Some(BackendId::Lambda),
            (None, None) => None,
        };

        Self {
            timestamp: now_secs_f64(),
            ec2,
            lambda,
            faster_backend,
            comparison,
            runs,
        }
    }

    pub fn summary(&self, id: BackendId) -> &DeploymentSummary {
        match id {
            BackendId::Ec2 => &self.ec2,
            BackendId::Lambda => &self.lambda,
        }
    }

    /// Write as pretty JSON, creating parent directories
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Report written to {}", path.display());
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Plain-text rendering of the summaries and head-to-head
    pub fn render(&self) -> String {
        let mut out = String::new();
        for id in BackendId::ALL {
            let _ = writeln!(out, "{}:", id.as_str().to_uppercase());
            match self.summary(id) {
                DeploymentSummary::Measured(s) => {
                    let _ = writeln!(
                        out,
                        "  Requests:     {}/{} ({:.1}% success)",
                        s.requests_successful, s.requests_total, s.success_rate
                    );
                    let _ = writeln!(out, "  Mean:         {:.2}ms", s.latency_mean_ms);
                    let _ = writeln!(out, "  Median:       {:.2}ms", s.latency_median_ms);
                    let _ = writeln!(out, "  Min/Max:      {:.2}ms / {:.2}ms", s.latency_min_ms, s.latency_max_ms);
                    let _ = writeln!(out, "  P95/P99:      {:.2}ms / {:.2}ms", s.latency_p95_ms, s.latency_p99_ms);
                    let _ = writeln!(out, "  Std dev:      {:.2}ms", s.latency_stddev_ms);
                }
                DeploymentSummary::Unavailable { error, total_errors } => {
                    let _ = writeln!(out, "  {} ({} errors)", error, total_errors);
                }
            }
        }

        if let Some(c) = &self.comparison {
            let _ = writeln!(out, "Comparison:");
            let _ = writeln!(
                out,
                "  Latency difference: {:+.2}ms ({:+.1}%)",
                c.latency_difference_ms, c.latency_difference_percent
            );
            let _ = writeln!(
                out,
                "  Reliability:        ec2 {:.1}% / lambda {:.1}%",
                c.reliability_ec2, c.reliability_lambda
            );
        }
        match self.faster_backend {
            Some(id) => {
                let _ = writeln!(out, "Faster deployment: {}", id);
            }
            None => {
                let _ = writeln!(out, "No deployment succeeded");
            }
        }
        out
    }
}

/// Sends `requests` payloads to each deployment in turn
#[derive(Debug, Clone)]
pub struct BenchHarness {
    requests: usize,
    delay: Duration,
    payloads: Vec<Value>,
}

impl BenchHarness {
    pub fn new(requests: usize) -> Self {
        Self {
            requests,
            delay: Duration::ZERO,
            payloads: representative_payloads(),
        }
    }

    /// Pause between successive requests to the same deployment
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Run every request against one deployment, sequentially
    pub async fn run_deployment(&self, backend: &dyn Backend) -> DeploymentRun {
        let id = backend.id();
        log::info!("Testing {} deployment with {} requests", id, self.requests);

        let mut results = Vec::with_capacity(self.requests);
        for (n, payload) in self.payloads.iter().cycle().take(self.requests).enumerate() {
            if n > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            results.push(measure(backend, payload).await);

            let done = n + 1;
            if done % PROGRESS_EVERY == 0 {
                log::info!("  {}: completed {}/{} requests", id, done, self.requests);
            }
        }

        DeploymentRun { backend_id: id, results }
    }

    /// Run each deployment in order (no interleaving) and build the report
    pub async fn run(&self, backends: &[Arc<dyn Backend>]) -> BenchReport {
        let mut runs = Vec::with_capacity(backends.len());
        for backend in backends {
            runs.push(self.run_deployment(backend.as_ref()).await);
        }
        BenchReport::from_runs(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::BackendReply;
    use crate::error::GatewayError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every payload; fails every `fail_every`-th call when set
    struct RecordingBackend {
        id: BackendId,
        seen: Mutex<Vec<Value>>,
        fail_every: Option<usize>,
    }

    impl RecordingBackend {
        fn new(id: BackendId, fail_every: Option<usize>) -> Self {
            Self {
                id,
                seen: Mutex::new(Vec::new()),
                fail_every,
            }
        }
    }

    #[async_trait]
    impl Backend for RecordingBackend {
        fn id(&self) -> BackendId {
            self.id
        }

        async fn call(&self, payload: &Value) -> Result<BackendReply> {
            let count = {
                let mut seen = self.seen.lock().unwrap();
                seen.push(payload.clone());
                seen.len()
            };
            if self.fail_every.is_some_and(|k| count % k == 0) {
                return Err(GatewayError::Transport("dropped".to_string()));
            }
            Ok(BackendReply::json(200, json!({"success": true})))
        }
    }

    fn stats(mean: f64, success_rate: f64) -> LatencyStats {
        LatencyStats {
            requests_total: 10,
            requests_successful: 10,
            requests_failed: 0,
            success_rate,
            latency_mean_ms: mean,
            latency_median_ms: mean,
            latency_min_ms: mean,
            latency_max_ms: mean,
            latency_p95_ms: mean,
            latency_p99_ms: mean,
            latency_stddev_ms: 0.0,
        }
    }

    #[test]
    fn test_representative_payloads() {
        let payloads = representative_payloads();
        assert_eq!(payloads.len(), 4);
        assert_eq!(payloads[0]["action"], "list_tools");
        assert_eq!(payloads[1]["data"]["parameters"]["query"], "test query");
        assert_eq!(payloads[2]["data"]["tool_name"], "database");
        assert_eq!(payloads[3]["data"]["parameters"]["path"], "/tmp");
    }

    #[tokio::test]
    async fn test_run_deployment_cycles_payloads() {
        let backend = RecordingBackend::new(BackendId::Ec2, None);
        let run = BenchHarness::new(6).run_deployment(&backend).await;

        assert_eq!(run.results.len(), 6);
        let seen = backend.seen.lock().unwrap();
        let payloads = representative_payloads();
        assert_eq!(seen[0], payloads[0]);
        assert_eq!(seen[3], payloads[3]);
        assert_eq!(seen[4], payloads[0]);
        assert_eq!(seen[5], payloads[1]);
    }

    #[tokio::test]
    async fn test_run_counts_failures() {
        let ec2: Arc<dyn Backend> = Arc::new(RecordingBackend::new(BackendId::Ec2, Some(4)));
        let lambda: Arc<dyn Backend> = Arc::new(RecordingBackend::new(BackendId::Lambda, Some(1)));

        let report = BenchHarness::new(8).run(&[ec2, lambda]).await;

        let ec2_stats = report.ec2.stats().unwrap();
        assert_eq!(ec2_stats.requests_total, 8);
        assert_eq!(ec2_stats.requests_failed, 2);
        assert!((ec2_stats.success_rate - 75.0).abs() < 1e-9);

        assert_eq!(
            report.lambda,
            DeploymentSummary::Unavailable {
                error: "No successful requests".to_string(),
                total_errors: 8
            }
        );
        assert!(report.comparison.is_none());
        assert_eq!(report.faster_backend, Some(BackendId::Ec2));
    }

    #[tokio::test]
    async fn test_delay_between_requests() {
        let backend = RecordingBackend::new(BackendId::Lambda, None);
        let harness = BenchHarness::new(3).with_delay(Duration::from_millis(30));

        let start = std::time::Instant::now();
        harness.run_deployment(&backend).await;
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_head_to_head() {
        let c = HeadToHead::between(&stats(100.0, 100.0), &stats(150.0, 90.0));
        assert!((c.latency_difference_ms - 50.0).abs() < 1e-9);
        assert!((c.latency_difference_percent - 50.0).abs() < 1e-9);
        assert_eq!(c.reliability_lambda, 90.0);
        assert_eq!(c.faster_deployment, BackendId::Ec2);

        let c = HeadToHead::between(&stats(100.0, 100.0), &stats(100.0, 100.0));
        assert_eq!(c.faster_deployment, BackendId::Lambda);
    }

    #[test]
    fn test_report_without_runs() {
        let report = BenchReport::from_runs(Vec::new());
        assert!(report.faster_backend.is_none());
        assert!(report.comparison.is_none());
        assert!(report.render().contains("No deployment succeeded"));
    }

    #[tokio::test]
    async fn test_report_round_trip_through_file() {
        let ec2: Arc<dyn Backend> = Arc::new(RecordingBackend::new(BackendId::Ec2, None));
        let lambda: Arc<dyn Backend> = Arc::new(RecordingBackend::new(BackendId::Lambda, None));
        let report = BenchHarness::new(4).run(&[ec2, lambda]).await;
        assert!(report.comparison.is_some());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("comparison_report.json");
        report.write_to(&path).unwrap();

        let parsed = BenchReport::read_from(&path).unwrap();
        assert_eq!(parsed.runs.len(), 2);
        assert_eq!(parsed.runs[1].results.len(), 4);
        assert_eq!(parsed.faster_backend, report.faster_backend);
        assert_eq!(parsed.ec2.stats().unwrap().requests_total, 4);
        assert!(parsed.comparison.is_some());
        assert!(parsed.render().contains("EC2:"));
    }
}
