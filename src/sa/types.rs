//! Core trait for objectives and the result of an annealing run.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A continuous objective over `n`-dimensional vectors. Lower is better.
///
/// The objective must be separable into contiguous index blocks: summing
/// [`evaluate_partial`](Objective::evaluate_partial) over any partition of
/// `[0, n)` must equal [`evaluate_full`](Objective::evaluate_full) up to
/// floating-point summation order. Objectives built from fixed-width groups
/// of coordinates attribute each group to the block holding its first index,
/// so a block must be able to read up to `group_width() - 1` coordinates past
/// its end; the multi-process runner aligns blocks to `group_width()` so that
/// never happens.
///
/// # Examples
///
/// ```
/// use u_shm_anneal::sa::Objective;
///
/// struct Abs;
///
/// impl Objective for Abs {
///     fn name(&self) -> &str {
///         "abs"
///     }
///
///     fn evaluate_partial(&self, x: &[f64], start: usize, end: usize) -> f64 {
///         x[start..end].iter().map(|v| v.abs()).sum()
///     }
///
///     fn starting_point(&self, n: usize) -> Vec<f64> {
///         vec![1.0; n]
///     }
/// }
///
/// assert_eq!(Abs.evaluate_full(&[1.0, -2.0]), 3.0);
/// ```
pub trait Objective: Send + Sync {
    /// Short name used in logs, reports and region names.
    fn name(&self) -> &str;

    /// Contribution of the index block `[start, end)` to the objective value.
    fn evaluate_partial(&self, x: &[f64], start: usize, end: usize) -> f64;

    /// Objective value of the whole vector.
    fn evaluate_full(&self, x: &[f64]) -> f64 {
        self.evaluate_partial(x, 0, x.len())
    }

    /// Number of consecutive coordinates that form one term of the objective.
    fn group_width(&self) -> usize {
        1
    }

    /// The conventional starting vector of dimension `n`.
    fn starting_point(&self, n: usize) -> Vec<f64>;

    /// Checks that `n` is a usable dimension for this objective.
    fn validate_dimension(&self, n: usize) -> Result<(), String> {
        let width = self.group_width();
        if n == 0 {
            return Err(format!("{}: dimension must be positive", self.name()));
        }
        if n % width != 0 {
            return Err(format!(
                "{}: dimension {n} is not a multiple of {width}",
                self.name()
            ));
        }
        Ok(())
    }
}

/// Result of an annealing run, sequential or multi-process.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunOutcome {
    /// The best vector found.
    pub best: Vec<f64>,

    /// Objective value of the best vector.
    pub best_value: f64,

    /// Objective value of the incumbent when the run stopped.
    pub incumbent_value: f64,

    /// Total number of candidates evaluated.
    pub iterations: u64,

    /// Number of cooling events applied.
    pub cooling_events: u64,

    /// Temperature when the run stopped.
    pub final_temperature: f64,

    /// Number of accepted candidates (including improvements).
    pub accepted_moves: u64,

    /// Number of candidates strictly better than the incumbent.
    pub improving_moves: u64,

    /// The seed the run actually used.
    pub seed: u64,

    /// Whether cancelled externally.
    pub cancelled: bool,
}
