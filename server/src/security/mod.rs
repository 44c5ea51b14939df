/// Decision counters for the gate.
pub mod metrics;

pub use metrics::{GateMetrics, MetricsSnapshot};
