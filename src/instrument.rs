//! Explicit stage timing.
//!
//! Replaces implicit decorator-style wrapping: callers hand a label and a
//! closure to [`timed`], which logs the elapsed wall time and returns the
//! closure's value together with a serializable timing record.

use log::info;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Timing entry for a single pipeline stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

impl StageTiming {
    pub fn new(label: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            label: label.into(),
            elapsed_ms,
        }
    }
}

/// Run `f`, logging its duration under `label`.
pub fn timed<T>(label: &str, f: impl FnOnce() -> T) -> (T, StageTiming) {
    info!("{label} started");
    let start = Instant::now();
    let value = f();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    info!("{label} finished in {elapsed_ms:.1} ms");
    (value, StageTiming::new(label, elapsed_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_returns_the_closure_value() {
        let (value, timing) = timed("unit", || 41 + 1);
        assert_eq!(value, 42);
        assert_eq!(timing.label, "unit");
        assert!(timing.elapsed_ms >= 0.0);
    }
}
