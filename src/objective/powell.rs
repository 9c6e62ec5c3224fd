use super::grouped_sum;
use crate::sa::Objective;

/// Extended Powell singular function over consecutive groups of four
/// coordinates: `(x1 + 10 x2)^2 + 5(x3 - x4)^2 + (x2 - 2 x3)^4 + 10(x1 - x4)^4`.
/// The minimum is 0 at the origin, where the Hessian is singular.
#[derive(Debug, Clone, Copy, Default)]
pub struct Powell;

#[inline]
fn powell_term(g: &[f64]) -> f64 {
    let (x1, x2, x3, x4) = (g[0], g[1], g[2], g[3]);
    let a = x1 + 10.0 * x2;
    let b = x3 - x4;
    let c = x2 - 2.0 * x3;
    let d = x1 - x4;
    a * a + 5.0 * b * b + c.powi(4) + 10.0 * d.powi(4)
}

impl Objective for Powell {
    fn name(&self) -> &str {
        "powell"
    }

    #[inline]
    fn evaluate_partial(&self, x: &[f64], start: usize, end: usize) -> f64 {
        grouped_sum(x, start, end, 4, powell_term)
    }

    fn group_width(&self) -> usize {
        4
    }

    /// The classic start `(3, -1, 0, 1)`, repeated.
    fn starting_point(&self, n: usize) -> Vec<f64> {
        [3.0, -1.0, 0.0, 1.0].iter().copied().cycle().take(n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_powell_classic_start_value() {
        // f(3, -1, 0, 1) = 215.
        let x = Powell.starting_point(8);
        assert!((Powell.evaluate_partial(&x, 0, 4) - 215.0).abs() < 1e-12);
        assert!((Powell.evaluate_full(&x) - 430.0).abs() < 1e-12);
    }

    #[test]
    fn test_powell_requires_groups_of_four() {
        assert!(Powell.validate_dimension(4).is_ok());
        assert!(Powell.validate_dimension(6).is_err());
    }
}
