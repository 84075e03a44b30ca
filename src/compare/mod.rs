//! Compare - route requests to backend deployments and measure them
//!
//! - `backend`: deployment identity and the HTTP client for one deployment
//! - `comparator`: single-backend routing and the concurrent two-backend race
//! - `stats`: latency statistics over a run
//! - `harness`: batch runs and the persisted report

mod backend;
mod comparator;
mod harness;
mod stats;

pub use backend::{Backend, BackendId, BackendReply, BackendResult, HttpBackend, measure};
pub use comparator::{Comparator, ComparisonOutcome, pick_faster};
pub use harness::{BenchHarness, BenchReport, DeploymentRun, HeadToHead, representative_payloads};
pub use stats::{DeploymentSummary, LatencyStats, exclusive_quantile, mean, median, sample_stddev};
