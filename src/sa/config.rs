//! SA configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the annealing schedule and the search box.
///
/// The defaults are the classic setup: `T_0 = 500`, geometric cooling
/// by `1 - 0.3` every 30 iterations, stop once `T <= 0.1`, box `[-5, 5]`.
///
/// # Examples
///
/// ```
/// use u_shm_anneal::sa::SaConfig;
///
/// let config = SaConfig::default()
///     .with_initial_temperature(100.0)
///     .with_min_temperature(0.01)
///     .with_cooling_rate(0.2)
///     .with_iterations_per_temperature(50)
///     .with_bounds(-4.0, 4.0)
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SaConfig {
    /// Initial temperature. Higher values allow more uphill moves early on.
    pub initial_temperature: f64,

    /// Stop threshold (`epsilon`). The run ends at the first cooling event
    /// that brings the temperature to or below this value.
    pub min_temperature: f64,

    /// Geometric cooling rate (`alpha`): `T <- T * (1 - alpha)`.
    pub cooling_rate: f64,

    /// Number of candidates evaluated at each temperature level.
    pub iterations_per_temperature: usize,

    /// Lower bound of every coordinate of a candidate.
    pub lower: f64,

    /// Upper bound of every coordinate of a candidate.
    pub upper: f64,

    /// Maximum total iterations (hard budget). 0 = no limit.
    pub max_iterations: usize,

    /// Random seed for reproducibility. Multi-process runs require one.
    pub seed: Option<u64>,
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 500.0,
            min_temperature: 0.1,
            cooling_rate: 0.3,
            iterations_per_temperature: 30,
            lower: -5.0,
            upper: 5.0,
            max_iterations: 0,
            seed: None,
        }
    }
}

impl SaConfig {
    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = t;
        self
    }

    pub fn with_min_temperature(mut self, t: f64) -> Self {
        self.min_temperature = t;
        self
    }

    pub fn with_cooling_rate(mut self, alpha: f64) -> Self {
        self.cooling_rate = alpha;
        self
    }

    pub fn with_iterations_per_temperature(mut self, n: usize) -> Self {
        self.iterations_per_temperature = n;
        self
    }

    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower = lower;
        self.upper = upper;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.initial_temperature > 0.0) || !self.initial_temperature.is_finite() {
            return Err("initial_temperature must be positive and finite".into());
        }
        if !(self.min_temperature > 0.0) {
            return Err("min_temperature must be positive".into());
        }
        if self.min_temperature >= self.initial_temperature {
            return Err("min_temperature must be less than initial_temperature".into());
        }
        if self.cooling_rate <= 0.0 || self.cooling_rate >= 1.0 {
            return Err(format!(
                "cooling_rate must be in (0, 1), got {}",
                self.cooling_rate
            ));
        }
        if self.iterations_per_temperature == 0 {
            return Err("iterations_per_temperature must be at least 1".into());
        }
        if !self.lower.is_finite() || !self.upper.is_finite() || self.lower >= self.upper {
            return Err(format!(
                "bounds must be finite with lower < upper, got [{}, {}]",
                self.lower, self.upper
            ));
        }
        Ok(())
    }
}
