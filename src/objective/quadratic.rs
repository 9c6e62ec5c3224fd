use crate::sa::Objective;

/// Quadratic bowl `f(x) = sum x_i^2`, minimum 0 at the origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quadratic;

impl Objective for Quadratic {
    fn name(&self) -> &str {
        "quadratic"
    }

    #[inline]
    fn evaluate_partial(&self, x: &[f64], start: usize, end: usize) -> f64 {
        x[start..end].iter().map(|v| v * v).sum()
    }

    fn starting_point(&self, n: usize) -> Vec<f64> {
        vec![1.0; n]
    }
}
