//! Timing and quality summaries for sequential vs. multi-process runs.

use std::fmt;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::objective::ObjectiveKind;
use crate::sa::RunOutcome;

/// One timed run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunReport {
    /// "sequential" or "parallel".
    pub label: String,
    pub objective: ObjectiveKind,
    pub dimension: usize,
    /// Number of processes that took part (1 for the baseline).
    pub participants: usize,
    pub elapsed: Duration,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn new(
        label: impl Into<String>,
        objective: ObjectiveKind,
        participants: usize,
        elapsed: Duration,
        outcome: RunOutcome,
    ) -> Self {
        Self {
            label: label.into(),
            objective,
            dimension: outcome.best.len(),
            participants,
            elapsed,
            outcome,
        }
    }

    /// Distance of the best vector to the objective's known minimizer.
    pub fn quality(&self) -> f64 {
        self.objective.distance_to_minimum(&self.outcome.best)
    }
}

/// Baseline and multi-process run of the same objective.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Comparison {
    pub objective: ObjectiveKind,
    pub dimension: usize,
    pub participants: usize,
    pub sequential: Option<RunReport>,
    pub parallel: RunReport,
}

impl Comparison {
    pub fn new(sequential: Option<RunReport>, parallel: RunReport) -> Self {
        Self {
            objective: parallel.objective,
            dimension: parallel.dimension,
            participants: parallel.participants,
            sequential,
            parallel,
        }
    }

    /// Sequential time over parallel time, when both are known and the
    /// parallel run took measurable time.
    pub fn speedup(&self) -> Option<f64> {
        let sequential = self.sequential.as_ref()?.elapsed.as_secs_f64();
        let parallel = self.parallel.elapsed.as_secs_f64();
        (parallel > 0.0).then(|| sequential / parallel)
    }
}

fn write_run(f: &mut fmt::Formatter<'_>, heading: &str, report: &RunReport) -> fmt::Result {
    writeln!(
        f,
        "{heading} {}ms, {}: {}",
        report.elapsed.as_millis(),
        report.objective.metric_label(),
        report.quality()
    )
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Testing {} ===", self.objective.title())?;
        writeln!(
            f,
            "n = {}, processes = {}",
            self.dimension, self.participants
        )?;
        if let Some(sequential) = &self.sequential {
            write_run(f, "Sequential execution time:", sequential)?;
        }
        write_run(f, "Parallel execution time:  ", &self.parallel)?;
        if let Some(speedup) = self.speedup() {
            writeln!(f, "Speedup: {speedup:.3}x")?;
        }
        Ok(())
    }
}
