//! Benchmark objectives: quadratic bowl, extended Woods, extended Powell singular.
//!
//! Each objective is a sum of independent terms over fixed-width groups of
//! coordinates, which is what makes block-wise evaluation across processes
//! possible.

mod powell;
mod quadratic;
mod woods;

use std::fmt;
use std::str::FromStr;

pub use powell::Powell;
pub use quadratic::Quadratic;
pub use woods::Woods;

use crate::sa::Objective;

/// Sum over the groups of `width` coordinates whose first index lies in
/// `[start, end)`. Groups are anchored at multiples of `width`.
#[inline]
pub(crate) fn grouped_sum<F>(x: &[f64], start: usize, end: usize, width: usize, term: F) -> f64
where
    F: Fn(&[f64]) -> f64,
{
    let first = start.div_ceil(width) * width;
    if first >= end {
        return 0.0;
    }
    let last = end.div_ceil(width) * width;
    x[first..last].chunks_exact(width).map(term).sum()
}

/// Euclidean norm.
pub fn l2_norm(x: &[f64]) -> f64 {
    x.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Euclidean distance from `x` to the constant vector `(target, ..., target)`.
pub fn distance_to_constant(x: &[f64], target: f64) -> f64 {
    x.iter()
        .map(|v| (v - target) * (v - target))
        .sum::<f64>()
        .sqrt()
}

/// Selects one of the built-in objectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectiveKind {
    Quadratic,
    Woods,
    Powell,
}

impl ObjectiveKind {
    pub fn all() -> [ObjectiveKind; 3] {
        [
            ObjectiveKind::Quadratic,
            ObjectiveKind::Woods,
            ObjectiveKind::Powell,
        ]
    }

    pub fn objective(self) -> &'static dyn Objective {
        match self {
            ObjectiveKind::Quadratic => &Quadratic,
            ObjectiveKind::Woods => &Woods,
            ObjectiveKind::Powell => &Powell,
        }
    }

    /// The search box used for this objective.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            ObjectiveKind::Quadratic | ObjectiveKind::Woods => (-5.0, 5.0),
            ObjectiveKind::Powell => (-4.0, 4.0),
        }
    }

    /// Block alignment used for multi-process runs.
    pub fn block_alignment(self) -> usize {
        match self {
            ObjectiveKind::Quadratic => 1,
            ObjectiveKind::Woods | ObjectiveKind::Powell => 4,
        }
    }

    /// Distance from `x` to the global minimizer.
    pub fn distance_to_minimum(self, x: &[f64]) -> f64 {
        match self {
            ObjectiveKind::Quadratic | ObjectiveKind::Powell => l2_norm(x),
            ObjectiveKind::Woods => distance_to_constant(x, 1.0),
        }
    }

    /// Label of the quality metric printed next to run times.
    pub fn metric_label(self) -> &'static str {
        match self {
            ObjectiveKind::Quadratic => "Euclidean norm",
            ObjectiveKind::Woods | ObjectiveKind::Powell => "Distance to minimum",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ObjectiveKind::Quadratic => "Quadratic Function",
            ObjectiveKind::Woods => "Woods Function",
            ObjectiveKind::Powell => "Powell Singular Function",
        }
    }
}

impl fmt::Display for ObjectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.objective().name())
    }
}

impl FromStr for ObjectiveKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quadratic" => Ok(ObjectiveKind::Quadratic),
            "woods" => Ok(ObjectiveKind::Woods),
            "powell" => Ok(ObjectiveKind::Powell),
            other => Err(format!(
                "unknown objective `{other}` (expected quadratic, woods or powell)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::{blocks, evaluate_partitioned};
    use crate::sa::CandidateStream;
    use proptest::prelude::*;

    fn assert_close(a: f64, b: f64) {
        let tolerance = 1e-9 * a.abs().max(b.abs()).max(1.0);
        assert!((a - b).abs() <= tolerance, "{a} != {b}");
    }

    fn check_partition_invariance(kind: ObjectiveKind, n: usize, k: usize, alignment: usize) {
        let objective = kind.objective();
        let (lower, upper) = kind.bounds();
        let x = CandidateStream::new(n as u64, lower, upper).candidate(0, n);
        let full = objective.evaluate_full(&x);
        let split = evaluate_partitioned(objective, &x, &blocks(n, k, alignment));
        assert_close(full, split);
    }

    #[test]
    fn test_partition_invariance_quadratic() {
        for n in [2, 100, 800_000] {
            for k in [1, 4, 7] {
                check_partition_invariance(ObjectiveKind::Quadratic, n, k, 1);
            }
        }
    }

    #[test]
    fn test_partition_invariance_grouped() {
        for kind in [ObjectiveKind::Woods, ObjectiveKind::Powell] {
            for n in [4, 100, 800_000] {
                for k in [1, 4, 7] {
                    check_partition_invariance(kind, n, k, 4);
                    // Unaligned boundaries still attribute each group once.
                    check_partition_invariance(kind, n, k, 1);
                }
            }
        }
    }

    #[test]
    fn test_full_equals_single_block_exactly() {
        let x = CandidateStream::new(1, -5.0, 5.0).candidate(0, 400);
        for kind in ObjectiveKind::all() {
            let objective = kind.objective();
            assert_eq!(
                objective.evaluate_full(&x),
                objective.evaluate_partial(&x, 0, x.len())
            );
        }
    }

    #[test]
    fn test_minimizers() {
        assert_eq!(Quadratic.evaluate_full(&[0.0; 8]), 0.0);
        assert_eq!(Woods.evaluate_full(&[1.0; 8]), 0.0);
        assert_eq!(Powell.evaluate_full(&[0.0; 8]), 0.0);
        assert_eq!(ObjectiveKind::Woods.distance_to_minimum(&[1.0; 8]), 0.0);
        assert_eq!(ObjectiveKind::Powell.distance_to_minimum(&[0.0; 8]), 0.0);
    }

    #[test]
    fn test_parse_and_display() {
        for kind in ObjectiveKind::all() {
            assert_eq!(kind.to_string().parse::<ObjectiveKind>().unwrap(), kind);
        }
        assert_eq!("WOODS".parse::<ObjectiveKind>().unwrap(), ObjectiveKind::Woods);
        assert!("rosenbrock".parse::<ObjectiveKind>().is_err());
    }

    #[test]
    fn test_grouped_sum_empty_range() {
        let x = [1.0; 8];
        assert_eq!(grouped_sum(&x, 1, 4, 4, |g| g[0]), 0.0);
        assert_eq!(grouped_sum(&x, 5, 5, 4, |g| g[0]), 0.0);
        assert_eq!(grouped_sum(&x, 3, 5, 4, |g| g[0]), 1.0);
    }

    proptest! {
        #[test]
        fn prop_any_contiguous_partition_sums_to_full(
            groups in 1usize..64,
            cuts in proptest::collection::vec(0usize..256, 0..6),
            seed in any::<u64>(),
        ) {
            let n = groups * 4;
            let mut bounds: Vec<usize> = cuts.into_iter().map(|c| c % (n + 1)).collect();
            bounds.push(0);
            bounds.push(n);
            bounds.sort_unstable();
            bounds.dedup();

            let x = CandidateStream::new(seed, -5.0, 5.0).candidate(0, n);
            for kind in ObjectiveKind::all() {
                let objective = kind.objective();
                let full = objective.evaluate_full(&x);
                let split: f64 = bounds
                    .windows(2)
                    .map(|w| objective.evaluate_partial(&x, w[0], w[1]))
                    .sum();
                let tolerance = 1e-9 * full.abs().max(1.0);
                prop_assert!((full - split).abs() <= tolerance, "{} vs {}", full, split);
            }
        }
    }
}
