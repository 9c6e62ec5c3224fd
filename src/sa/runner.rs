//! Single-process SA execution loop (the baseline).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, trace};

use super::config::SaConfig;
use super::schedule::{AnnealState, ScheduleEvent};
use super::stream::{acceptance_rng, resolve_seed, CandidateStream};
use super::types::{Objective, RunOutcome};
use crate::error::{AnnealError, AnnealResult};

/// Executes simulated annealing in the calling thread.
///
/// Contract: `(objective, initial_vector, n, a, b, seed) -> (best_vector,
/// best_value)`, with `n = initial.len()` and `a`, `b`, `seed` taken from the
/// [`SaConfig`]. For a given seed it draws exactly the candidates and
/// acceptance numbers the multi-process runner draws, so both are directly
/// comparable.
pub struct SequentialRunner;

impl SequentialRunner {
    /// Runs SA optimization.
    pub fn run<O: Objective + ?Sized>(
        objective: &O,
        initial: Vec<f64>,
        config: &SaConfig,
    ) -> AnnealResult<RunOutcome> {
        Self::run_with_cancel(objective, initial, config, None)
    }

    /// Runs SA with an optional cancellation token.
    pub fn run_with_cancel<O: Objective + ?Sized>(
        objective: &O,
        initial: Vec<f64>,
        config: &SaConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> AnnealResult<RunOutcome> {
        config.validate().map_err(AnnealError::InvalidConfig)?;
        let n = initial.len();
        objective
            .validate_dimension(n)
            .map_err(AnnealError::InvalidConfig)?;

        let seed = resolve_seed(config.seed);
        let stream = CandidateStream::new(seed, config.lower, config.upper);
        let mut rng = acceptance_rng(seed);

        let initial_value = evaluate(objective, &initial, 0)?;
        let mut state = AnnealState::new(config, initial_value);
        let mut best = initial;
        let mut candidate = vec![0.0; n];
        let mut cancelled = false;

        debug!(
            "sequential {}: n={n}, seed={seed}, f(x0)={initial_value}",
            objective.name()
        );

        loop {
            if let Some(ref flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    cancelled = true;
                    break;
                }
            }

            stream.fill_block(state.step, 0, &mut candidate);
            let value = evaluate(objective, &candidate, state.step)?;
            let verdict = state.judge(value, &mut rng);
            if verdict.is_improved() {
                best.copy_from_slice(&candidate);
            }
            trace!("step {}: f={value} {verdict:?}", state.step);

            match state.advance(config) {
                ScheduleEvent::Cooled => debug!(
                    "cooling event {}: T={:.6}",
                    state.outer_round_counter, state.temperature
                ),
                event if event.is_terminal() => break,
                _ => {}
            }
        }

        info!(
            "sequential {} finished: best={} after {} iterations ({} accepted)",
            objective.name(),
            state.best_value,
            state.step,
            state.accepted_moves
        );
        Ok(state.into_outcome(best, seed, cancelled))
    }
}

fn evaluate<O: Objective + ?Sized>(objective: &O, x: &[f64], step: u64) -> AnnealResult<f64> {
    let value = objective.evaluate_full(x);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnnealError::Computation {
            rank: 0,
            step,
            value,
        })
    }
}
