//! Per-run metrics for the triage pipeline.
//!
//! Collected in memory by the orchestrator and emitted once as a structured
//! `info` event when the run finishes. Nothing is written to disk.

use std::time::{Duration, Instant};

/// Pipeline stage timed by [`RunMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classify,
    Resolve,
    Write,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classify => write!(f, "classify"),
            Self::Resolve => write!(f, "resolve"),
            Self::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StageRecord {
    pub stage: Stage,
    pub duration: Duration,
}

/// In-memory metrics for one pipeline run.
#[derive(Debug)]
pub struct RunMetrics {
    started: Instant,
    stages: Vec<StageRecord>,
    writes: u32,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            stages: Vec::new(),
            writes: 0,
        }
    }

    pub fn record_stage(&mut self, stage: Stage, duration: Duration) {
        self.stages.push(StageRecord { stage, duration });
    }

    /// Count one backend write attempt (create or comment).
    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn writes(&self) -> u32 {
        self.writes
    }

    pub fn stages(&self) -> &[StageRecord] {
        &self.stages
    }

    fn stage_ms(&self, stage: Stage) -> u64 {
        self.stages
            .iter()
            .filter(|r| r.stage == stage)
            .map(|r| r.duration.as_millis() as u64)
            .sum()
    }

    /// Emit the run summary.
    pub fn finish(self, outcome: &str) {
        tracing::info!(
            outcome,
            writes = self.writes,
            classify_ms = self.stage_ms(Stage::Classify),
            resolve_ms = self.stage_ms(Stage::Resolve),
            write_ms = self.stage_ms(Stage::Write),
            total_ms = self.started.elapsed().as_millis() as u64,
            "triage run finished"
        );
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_durations_are_summed_per_stage() {
        let mut metrics = RunMetrics::new();
        metrics.record_stage(Stage::Classify, Duration::from_millis(40));
        metrics.record_stage(Stage::Resolve, Duration::from_millis(25));
        metrics.record_stage(Stage::Classify, Duration::from_millis(10));

        assert_eq!(metrics.stage_ms(Stage::Classify), 50);
        assert_eq!(metrics.stage_ms(Stage::Write), 0);
        assert_eq!(metrics.stages().len(), 3);
    }

    #[test]
    fn writes_are_counted() {
        let mut metrics = RunMetrics::default();
        assert_eq!(metrics.writes(), 0);
        metrics.record_write();
        assert_eq!(metrics.writes(), 1);
    }
}
