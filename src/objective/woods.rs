use super::grouped_sum;
use crate::sa::Objective;

/// Extended Wood function over consecutive groups of four coordinates.
///
/// Each group contributes
/// `100(x2 - x1^2)^2 + (1 - x1)^2 + 90(x4 - x3^2)^2 + (1 - x3)^2
///  + 10.1((x2 - 1)^2 + (x4 - 1)^2) + 19.8(x2 - 1)(x4 - 1)`;
/// the minimum is 0 at `(1, ..., 1)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Woods;

#[inline]
fn woods_term(g: &[f64]) -> f64 {
    let (x1, x2, x3, x4) = (g[0], g[1], g[2], g[3]);
    let a = x2 - x1 * x1;
    let b = 1.0 - x1;
    let c = x4 - x3 * x3;
    let d = 1.0 - x3;
    let e = x2 - 1.0;
    let h = x4 - 1.0;
    100.0 * a * a + b * b + 90.0 * c * c + d * d + 10.1 * (e * e + h * h) + 19.8 * e * h
}

impl Objective for Woods {
    fn name(&self) -> &str {
        "woods"
    }

    #[inline]
    fn evaluate_partial(&self, x: &[f64], start: usize, end: usize) -> f64 {
        grouped_sum(x, start, end, 4, woods_term)
    }

    fn group_width(&self) -> usize {
        4
    }

    /// The classic start `(-3, -1, -3, -1)`, repeated.
    fn starting_point(&self, n: usize) -> Vec<f64> {
        [-3.0, -1.0, -3.0, -1.0].iter().copied().cycle().take(n).collect()
    }
}
