//! Metropolis acceptance and the geometric cooling schedule.
//!
//! [`AnnealState`] holds everything the decision-maker owns: temperature,
//! counters, the cached incumbent value and the best value. The sequential
//! runner keeps it on its stack; in a multi-process run only the coordinator
//! holds one and publishes its fields to the shared control block.

use rand::Rng;

use super::config::SaConfig;
use super::types::RunOutcome;

/// Probability of accepting a candidate of value `f1` against an incumbent
/// of value `f0` at temperature `temperature`.
///
/// Improvements are always accepted. `temperature` must be positive.
#[inline]
pub fn acceptance_probability(f0: f64, f1: f64, temperature: f64) -> f64 {
    debug_assert!(temperature > 0.0, "temperature must stay positive");
    if f1 < f0 {
        1.0
    } else {
        ((f0 - f1) / temperature).exp()
    }
}

/// Metropolis criterion.
///
/// The uniform draw is only taken for non-improving candidates, so the
/// acceptance stream advances identically in every runner.
#[inline]
pub fn metropolis_accepts<R: Rng>(f0: f64, f1: f64, temperature: f64, rng: &mut R) -> bool {
    if f1 < f0 {
        return true;
    }
    let r: f64 = rng.random();
    r < acceptance_probability(f0, f1, temperature)
}

/// Number of cooling events after which the schedule freezes, i.e. the
/// smallest `k` with `T_0 * (1 - alpha)^k <= epsilon`.
pub fn cooling_events_until_frozen(config: &SaConfig) -> u64 {
    let mut temperature = config.initial_temperature;
    let mut events = 0;
    loop {
        temperature *= 1.0 - config.cooling_rate;
        events += 1;
        if temperature <= config.min_temperature {
            return events;
        }
    }
}

/// Outcome of judging one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The incumbent is kept.
    Rejected,
    /// The candidate became the incumbent.
    Accepted,
    /// The candidate became the incumbent and the new best.
    Improved,
}

impl Verdict {
    #[inline]
    pub fn is_accepted(self) -> bool {
        !matches!(self, Verdict::Rejected)
    }

    #[inline]
    pub fn is_improved(self) -> bool {
        matches!(self, Verdict::Improved)
    }

    /// Compact encoding for the shared decision field.
    #[inline]
    pub fn to_bits(self) -> u32 {
        match self {
            Verdict::Rejected => 0,
            Verdict::Accepted => 1,
            Verdict::Improved => 2,
        }
    }

    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        match bits {
            1 => Verdict::Accepted,
            2 => Verdict::Improved,
            _ => Verdict::Rejected,
        }
    }
}

/// What the schedule did after an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleEvent {
    /// Still inside the current temperature level.
    Continue,
    /// The temperature was lowered and the level counter reset.
    Cooled,
    /// A cooling event brought the temperature to or below `epsilon`.
    Frozen,
    /// The hard iteration budget is spent.
    Exhausted,
}

impl ScheduleEvent {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, ScheduleEvent::Frozen | ScheduleEvent::Exhausted)
    }
}

/// Decision state owned by exactly one participant.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnealState {
    pub temperature: f64,
    /// Iterations spent at the current temperature level.
    pub iteration_counter: u64,
    /// Cooling events applied so far.
    pub outer_round_counter: u64,
    /// Global iteration index; keys the candidate stream.
    pub step: u64,
    /// Value of the last accepted candidate.
    pub incumbent_value: f64,
    pub best_value: f64,
    pub accepted_moves: u64,
    pub improving_moves: u64,
}

impl AnnealState {
    /// Starts a run whose initial incumbent has value `initial_value`.
    pub fn new(config: &SaConfig, initial_value: f64) -> Self {
        Self {
            temperature: config.initial_temperature,
            iteration_counter: 0,
            outer_round_counter: 0,
            step: 0,
            incumbent_value: initial_value,
            best_value: initial_value,
            accepted_moves: 0,
            improving_moves: 0,
        }
    }

    /// Judges a freshly evaluated candidate against the cached incumbent value.
    pub fn judge<R: Rng>(&mut self, candidate_value: f64, rng: &mut R) -> Verdict {
        let f0 = self.incumbent_value;
        if candidate_value < f0 {
            self.improving_moves += 1;
        }
        if !metropolis_accepts(f0, candidate_value, self.temperature, rng) {
            return Verdict::Rejected;
        }

        self.incumbent_value = candidate_value;
        self.accepted_moves += 1;
        if candidate_value < self.best_value {
            self.best_value = candidate_value;
            Verdict::Improved
        } else {
            Verdict::Accepted
        }
    }

    /// Closes the current iteration and applies the cooling schedule.
    pub fn advance(&mut self, config: &SaConfig) -> ScheduleEvent {
        self.step += 1;
        self.iteration_counter += 1;

        let mut event = ScheduleEvent::Continue;
        if self.iteration_counter >= config.iterations_per_temperature as u64 {
            self.temperature *= 1.0 - config.cooling_rate;
            self.outer_round_counter += 1;
            if self.temperature <= config.min_temperature {
                return ScheduleEvent::Frozen;
            }
            self.iteration_counter = 0;
            event = ScheduleEvent::Cooled;
        }

        if config.max_iterations > 0 && self.step >= config.max_iterations as u64 {
            return ScheduleEvent::Exhausted;
        }
        event
    }

    pub fn into_outcome(self, best: Vec<f64>, seed: u64, cancelled: bool) -> RunOutcome {
        RunOutcome {
            best,
            best_value: self.best_value,
            incumbent_value: self.incumbent_value,
            iterations: self.step,
            cooling_events: self.outer_round_counter,
            final_temperature: self.temperature,
            accepted_moves: self.accepted_moves,
            improving_moves: self.improving_moves,
            seed,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_improvement_always_accepted() {
        for t in [1e-9, 0.1, 1.0, 500.0, 1e12] {
            assert_eq!(acceptance_probability(10.0, 8.0, t), 1.0);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..1000 {
            assert!(metropolis_accepts(10.0, 8.0, 1e-9, &mut rng));
        }
    }

    #[test]
    fn test_uphill_probability_vanishes_when_cold() {
        let p = acceptance_probability(8.0, 10.0, 1e-6);
        assert!(p < 1e-100, "expected ~0, got {p}");

        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let accepted = (0..10_000)
            .filter(|_| metropolis_accepts(8.0, 10.0, 1e-3, &mut rng))
            .count();
        assert_eq!(accepted, 0);
    }

    #[test]
    fn test_uphill_probability_approaches_one_when_hot() {
        let p = acceptance_probability(8.0, 10.0, 1e9);
        assert!(p > 0.999_999, "expected ~1, got {p}");

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let accepted = (0..10_000)
            .filter(|_| metropolis_accepts(8.0, 10.0, 1e9, &mut rng))
            .count();
        assert!(accepted > 9_990, "accepted {accepted}");
    }

    #[test]
    fn test_equal_values_accepted_with_probability_one() {
        assert_eq!(acceptance_probability(4.0, 4.0, 0.5), 1.0);
    }

    #[test]
    fn test_cooling_event_count_matches_closed_form() {
        let config = SaConfig::default();
        let closed_form = ((config.min_temperature / config.initial_temperature).ln()
            / (1.0 - config.cooling_rate).ln())
        .ceil() as u64;
        assert_eq!(closed_form, 24);
        assert_eq!(cooling_events_until_frozen(&config), closed_form);
    }

    #[test]
    fn test_schedule_freezes_after_exact_event_count() {
        let config = SaConfig::default();
        let mut state = AnnealState::new(&config, 1.0);
        let mut cooled = 0;
        let event = loop {
            let event = state.advance(&config);
            match event {
                ScheduleEvent::Cooled => cooled += 1,
                ScheduleEvent::Continue => {}
                _ => break event,
            }
        };

        assert_eq!(event, ScheduleEvent::Frozen);
        assert_eq!(cooled + 1, 24);
        assert_eq!(state.outer_round_counter, 24);
        assert_eq!(state.step, 24 * 30);
        assert!(state.temperature <= config.min_temperature);
        assert!(state.temperature > 0.0);
    }

    #[test]
    fn test_iteration_counter_resets_on_cooling() {
        let config = SaConfig::default().with_iterations_per_temperature(3);
        let mut state = AnnealState::new(&config, 1.0);
        assert_eq!(state.advance(&config), ScheduleEvent::Continue);
        assert_eq!(state.advance(&config), ScheduleEvent::Continue);
        assert_eq!(state.advance(&config), ScheduleEvent::Cooled);
        assert_eq!(state.iteration_counter, 0);
        assert!((state.temperature - 350.0).abs() < 1e-9);
    }

    #[test]
    fn test_budget_exhaustion() {
        let config = SaConfig::default().with_max_iterations(5);
        let mut state = AnnealState::new(&config, 1.0);
        for _ in 0..4 {
            assert!(!state.advance(&config).is_terminal());
        }
        assert_eq!(state.advance(&config), ScheduleEvent::Exhausted);
    }

    #[test]
    fn test_judge_compares_against_cached_incumbent() {
        let config = SaConfig::default();
        let mut state = AnnealState::new(&config, 10.0);
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        assert_eq!(state.judge(8.0, &mut rng), Verdict::Improved);
        assert_eq!(state.incumbent_value, 8.0);
        assert_eq!(state.best_value, 8.0);

        state.temperature = 1e-12;
        assert_eq!(state.judge(9.0, &mut rng), Verdict::Rejected);
        assert_eq!(state.incumbent_value, 8.0);

        state.temperature = 1e12;
        assert_eq!(state.judge(9.0, &mut rng), Verdict::Accepted);
        assert_eq!(state.incumbent_value, 9.0);
        assert_eq!(state.best_value, 8.0);

        // Better than the incumbent, worse than the best.
        assert_eq!(state.judge(8.5, &mut rng), Verdict::Accepted);
        assert_eq!(state.improving_moves, 2);
        assert_eq!(state.accepted_moves, 3);
    }

    #[test]
    fn test_verdict_bits() {
        for v in [Verdict::Rejected, Verdict::Accepted, Verdict::Improved] {
            assert_eq!(Verdict::from_bits(v.to_bits()), v);
        }
    }
}
