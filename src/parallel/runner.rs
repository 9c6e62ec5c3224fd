//! Region lifecycle around the worker loop.

use log::{debug, error, info};

use super::config::ParallelConfig;
use super::partition::{block_range, effective_alignment};
use super::worker::Worker;
use crate::error::{AnnealError, AnnealResult};
use crate::sa::{resolve_seed, CandidateStream, Objective, RunOutcome, SaConfig};
use crate::shm::{Fault, SharedRegion};

/// Executes simulated annealing as one participant of a multi-process run.
///
/// Rank 0 creates the shared region and acts as coordinator; every other
/// rank attaches to it. All ranks must be started with the same objective,
/// initial vector, [`SaConfig`] and seed. The coordinator returns the run
/// outcome; the other ranks return `None` once the run has completed.
///
/// With a single participant the run draws and judges exactly what
/// [`SequentialRunner`](crate::sa::SequentialRunner) does for the same seed.
pub struct ParallelRunner;

impl ParallelRunner {
    pub fn run<O: Objective + ?Sized>(
        objective: &O,
        initial: &[f64],
        config: &SaConfig,
        parallel: &ParallelConfig,
    ) -> AnnealResult<Option<RunOutcome>> {
        config.validate().map_err(AnnealError::InvalidConfig)?;
        parallel.validate().map_err(AnnealError::InvalidConfig)?;
        let n = initial.len();
        objective
            .validate_dimension(n)
            .map_err(AnnealError::InvalidConfig)?;
        if parallel.size > 1 && config.seed.is_none() {
            return Err(AnnealError::InvalidConfig(
                "a multi-process run needs an explicit seed shared by every rank".into(),
            ));
        }
        let seed = resolve_seed(config.seed);

        let alignment = effective_alignment(parallel.block_alignment, objective.group_width());
        let block = block_range(n, parallel.size, parallel.rank, alignment);
        debug!(
            "rank {}/{}: {} block {block:?} of n={n}",
            parallel.rank,
            parallel.size,
            objective.name()
        );

        let region = if parallel.is_coordinator() {
            SharedRegion::create(&parallel.region_name, n, parallel.size)?
        } else {
            let region = SharedRegion::attach(&parallel.region_name, parallel.attach_timeout)?;
            if let Err(err) = Self::check_layout(&region, n, parallel) {
                region.control().signal_fault(Fault::Initialization);
                region.control().depart();
                region.release();
                return Err(err);
            }
            region
        };

        let stream = CandidateStream::new(seed, config.lower, config.upper);
        let result = Worker::new(
            objective,
            &region,
            parallel.rank,
            parallel.size,
            block,
            stream,
        )
        .run(initial, config, seed);

        if let Err(err) = &result {
            if !matches!(err, AnnealError::PeerAborted { .. }) {
                error!("rank {}: {err}", parallel.rank);
                region.control().signal_fault(err.fault());
            }
        }

        if !region.is_creator() {
            region.control().depart();
            region.release();
            return result.map(|_| None);
        }

        let expected = parallel.size - 1;
        let departed = region.await_departures(expected, parallel.shutdown_timeout);
        let state = match result {
            Ok(state) => state,
            Err(err) => {
                region.release();
                return Err(err);
            }
        };
        if departed < expected {
            region.release();
            return Err(AnnealError::ShutdownTimeout { departed, expected });
        }

        // SAFETY: every peer has departed, so all block writes happen-before
        // this read.
        let best = unsafe { region.read_vector() };
        region.release();

        let outcome = state.map(|state| state.into_outcome(best, seed, false));
        if let Some(outcome) = &outcome {
            info!(
                "parallel {} finished on {} ranks: best={} after {} iterations ({} accepted)",
                objective.name(),
                parallel.size,
                outcome.best_value,
                outcome.iterations,
                outcome.accepted_moves
            );
        }
        Ok(outcome)
    }

    fn check_layout(region: &SharedRegion, n: usize, parallel: &ParallelConfig) -> AnnealResult<()> {
        if region.dimension() != n {
            return Err(AnnealError::Initialization(format!(
                "region `{}` holds n={}, rank {} expects n={n}",
                region.name(),
                region.dimension(),
                parallel.rank
            )));
        }
        if region.participants() != parallel.size {
            return Err(AnnealError::Initialization(format!(
                "region `{}` was created for {} participants, rank {} expects {}",
                region.name(),
                region.participants(),
                parallel.rank,
                parallel.size
            )));
        }
        Ok(())
    }
}
