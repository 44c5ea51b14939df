use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use shared::types::Denial;

/// Per-outcome counters for gate decisions.
///
/// Every denial class has its own counter, so a burst of forged-but-well-formed
/// tokens (`InvalidSignature`) stays distinguishable from clients sending
/// garbage (`MalformedCredential`).
#[derive(Clone, Debug)]
pub struct GateMetrics {
    inner: Arc<GateMetricsInner>,
}

#[derive(Debug)]
struct GateMetricsInner {
    allowed: AtomicU64,
    /// Indexed by `denial_index`.
    denied: [AtomicU64; 7],
    start_time: Instant,
}

fn denial_index(denial: Denial) -> usize {
    match denial {
        Denial::MissingCredential => 0,
        Denial::MalformedCredential => 1,
        Denial::InvalidSignature => 2,
        Denial::Expired => 3,
        Denial::SessionNotFound => 4,
        Denial::EndpointNotRecognized => 5,
        Denial::AccessDenied => 6,
    }
}

impl GateMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GateMetricsInner {
                allowed: AtomicU64::new(0),
                denied: Default::default(),
                start_time: Instant::now(),
            }),
        }
    }

    pub fn record_allowed(&self) {
        self.inner.allowed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_denied(&self, denial: Denial) {
        self.inner.denied[denial_index(denial)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn denied(&self, denial: Denial) -> u64 {
        self.inner.denied[denial_index(denial)].load(Ordering::Relaxed)
    }

    pub fn allowed(&self) -> u64 {
        self.inner.allowed.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.inner.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let denied = Denial::ALL
            .iter()
            .map(|d| DenialCount {
                code: d.code(),
                count: self.denied(*d),
            })
            .collect::<Vec<_>>();

        MetricsSnapshot {
            allowed: self.allowed(),
            denied_total: denied.iter().map(|d| d.count).sum(),
            denied,
            uptime_secs: self.uptime().as_secs(),
        }
    }
}

impl Default for GateMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialCount {
    pub code: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub allowed: u64,
    pub denied_total: u64,
    pub denied: Vec<DenialCount>,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_kept_per_denial_class() {
        let metrics = GateMetrics::new();
        metrics.record_denied(Denial::InvalidSignature);
        metrics.record_denied(Denial::InvalidSignature);
        metrics.record_denied(Denial::MalformedCredential);
        metrics.record_allowed();

        assert_eq!(metrics.denied(Denial::InvalidSignature), 2);
        assert_eq!(metrics.denied(Denial::MalformedCredential), 1);
        assert_eq!(metrics.denied(Denial::Expired), 0);
        assert_eq!(metrics.allowed(), 1);
    }

    #[test]
    fn snapshot_lists_every_class() {
        let metrics = GateMetrics::new();
        metrics.record_denied(Denial::AccessDenied);

        let snap = metrics.snapshot();
        assert_eq!(snap.denied.len(), Denial::ALL.len());
        assert_eq!(snap.denied_total, 1);
        assert!(
            snap.denied
                .iter()
                .any(|d| d.code == "ACCESS_DENIED" && d.count == 1)
        );
    }

    #[test]
    fn clones_share_counters() {
        let a = GateMetrics::new();
        let b = a.clone();
        b.record_allowed();
        assert_eq!(a.allowed(), 1);
    }
}
