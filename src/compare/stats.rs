//! Latency statistics for a deployment run

use serde::{Deserialize, Serialize};

/// Summary statistics over the successful requests of one deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub requests_total: usize,
    pub requests_successful: usize,
    pub requests_failed: usize,
    /// Percent of requests that succeeded
    pub success_rate: f64,
    pub latency_mean_ms: f64,
    pub latency_median_ms: f64,
    pub latency_min_ms: f64,
    pub latency_max_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
    pub latency_stddev_ms: f64,
}

impl LatencyStats {
    /// Statistics over `latencies` (successful requests only); `None` when empty
    pub fn compute(latencies: &[f64], failures: usize) -> Option<Self> {
        if latencies.is_empty() {
            return None;
        }

        let mut sorted = latencies.to_vec();
        sorted.sort_by(f64::total_cmp);

        let successful = sorted.len();
        let total = successful + failures;
        let max = sorted[successful - 1];

        let p95 = if successful >= 20 { exclusive_quantile(&sorted, 20, 19) } else { max };
        let p99 = if successful >= 100 { exclusive_quantile(&sorted, 100, 99) } else { max };

        Some(Self {
            requests_total: total,
            requests_successful: successful,
            requests_failed: failures,
            success_rate: successful as f64 / total as f64 * 100.0,
            latency_mean_ms: mean(&sorted),
            latency_median_ms: median(&sorted),
            latency_min_ms: sorted[0],
            latency_max_ms: max,
            latency_p95_ms: p95,
            latency_p99_ms: p99,
            latency_stddev_ms: sample_stddev(&sorted),
        })
    }
}

/// What a deployment contributes to the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeploymentSummary {
    Measured(LatencyStats),
    Unavailable { error: String, total_errors: usize },
}

impl DeploymentSummary {
    pub fn from_latencies(latencies: &[f64], failures: usize) -> Self {
        match LatencyStats::compute(latencies, failures) {
            Some(stats) => Self::Measured(stats),
            None => Self::Unavailable {
                error: "No successful requests".to_string(),
                total_errors: failures,
            },
        }
    }

    pub fn stats(&self) -> Option<&LatencyStats> {
        match self {
            Self::Measured(stats) => Some(stats),
            Self::Unavailable { .. } => None,
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of an ascending slice
pub fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// Sample standard deviation (n - 1 denominator); 0 below two samples
pub fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Cut point `i` of `n` equal-probability groups, exclusive method
///
/// Positions are taken over `len + 1` slots and linearly interpolated between
/// neighbouring samples. `sorted` must be ascending.
pub fn exclusive_quantile(sorted: &[f64], n: usize, i: usize) -> f64 {
    let len = sorted.len();
    match len {
        0 => return 0.0,
        1 => return sorted[0],
        _ => {}
    }

    let (n, i, m) = (n as i64, i as i64, len as i64 + 1);
    let j = (i * m / n).clamp(1, len as i64 - 1);
    let delta = i * m - j * n;
    let lower = sorted[(j - 1) as usize];
    let upper = sorted[j as usize];
    (lower * (n - delta) as f64 + upper * delta as f64) / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn one_to(n: usize) -> Vec<f64> {
        (1..=n).map(|v| v as f64).collect()
    }

    #[test]
    fn test_stats_one_to_twenty() {
        let stats = LatencyStats::compute(&one_to(20), 0).unwrap();
        assert_eq!(stats.requests_total, 20);
        assert!(approx(stats.success_rate, 100.0));
        assert!(approx(stats.latency_mean_ms, 10.5));
        assert!(approx(stats.latency_median_ms, 10.5));
        assert!(approx(stats.latency_min_ms, 1.0));
        assert!(approx(stats.latency_max_ms, 20.0));
        assert!(approx(stats.latency_p95_ms, 19.95));
        // fewer than 100 samples
        assert!(approx(stats.latency_p99_ms, 20.0));
        assert!(approx(stats.latency_stddev_ms, 35f64.sqrt()));
    }

    #[test]
    fn test_p99_with_hundred_samples() {
        let stats = LatencyStats::compute(&one_to(100), 0).unwrap();
        assert!(approx(stats.latency_p99_ms, 99.99));
        assert!(approx(stats.latency_p95_ms, 95.95));
    }

    #[test]
    fn test_small_sample_percentiles_fall_back_to_max() {
        let stats = LatencyStats::compute(&[3.0, 1.0, 2.0], 1).unwrap();
        assert!(approx(stats.latency_p95_ms, 3.0));
        assert!(approx(stats.latency_p99_ms, 3.0));
        assert!(approx(stats.latency_median_ms, 2.0));
        assert_eq!(stats.requests_total, 4);
        assert_eq!(stats.requests_failed, 1);
        assert!(approx(stats.success_rate, 75.0));
    }

    #[test]
    fn test_single_sample_stddev_is_zero() {
        let stats = LatencyStats::compute(&[42.0], 0).unwrap();
        assert!(approx(stats.latency_stddev_ms, 0.0));
        assert!(approx(stats.latency_mean_ms, 42.0));
    }

    #[test]
    fn test_exclusive_quantile_clamps() {
        let sorted = [10.0, 20.0];
        // i*m/n rounds to 0 and is clamped up to the first pair
        assert!(approx(exclusive_quantile(&sorted, 100, 1), 0.3));
        assert!(approx(exclusive_quantile(&[5.0], 20, 19), 5.0));
    }

    #[test]
    fn test_summary_without_successes() {
        let summary = DeploymentSummary::from_latencies(&[], 7);
        assert!(summary.stats().is_none());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["error"], "No successful requests");
        assert_eq!(json["total_errors"], 7);

        let parsed: DeploymentSummary = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, summary);
    }

    #[test]
    fn test_summary_parses_back_as_measured() {
        let summary = DeploymentSummary::from_latencies(&one_to(5), 0);
        let json = serde_json::to_string(&summary).unwrap();
        let parsed: DeploymentSummary = serde_json::from_str(&json).unwrap();
        let stats = parsed.stats().unwrap();
        assert_eq!(stats.requests_total, 5);
        assert!(approx(stats.latency_median_ms, 3.0));
        assert!(approx(stats.latency_stddev_ms, 2.5f64.sqrt()));
    }
}
