//! One participant's side of the iteration protocol.
//!
//! Every round is two barrier phases:
//!
//! ```text
//! all ranks:    fill own block of x'  ->  partial f  ->  slot[rank]
//!               ---------------- barrier ----------------
//! coordinator:  reduce -> judge -> cool -> publish state (+ completion)
//!               ---------------- barrier ----------------
//! all ranks:    read decision -> copy own block if improved -> exit?
//! ```

use std::ops::Range;

use log::{debug, info, trace};
use rand_chacha::ChaCha8Rng;

use crate::error::{AnnealError, AnnealResult};
use crate::sa::{
    acceptance_rng, AnnealState, CandidateStream, Objective, SaConfig, ScheduleEvent, Verdict,
};
use crate::shm::{Barrier, BarrierOutcome, ExitState, SharedRegion};

/// Decision state held only by rank 0.
struct Coordinator<'c> {
    config: &'c SaConfig,
    state: AnnealState,
    rng: ChaCha8Rng,
}

impl Coordinator<'_> {
    /// Judges the reduced candidate value and applies the cooling schedule.
    fn decide(&mut self, value: f64) -> (Verdict, ScheduleEvent) {
        let verdict = self.state.judge(value, &mut self.rng);
        let step = self.state.step;
        let event = self.state.advance(self.config);
        trace!("step {step}: f={value} {verdict:?}");
        if event == ScheduleEvent::Cooled {
            debug!(
                "cooling event {}: T={:.6}, best={}",
                self.state.outer_round_counter, self.state.temperature, self.state.best_value
            );
        }
        (verdict, event)
    }
}

pub(crate) struct Worker<'a, O: ?Sized> {
    objective: &'a O,
    region: &'a SharedRegion,
    barrier: Barrier<'a>,
    rank: usize,
    block: Range<usize>,
    stream: CandidateStream,
    /// Full-length scratch vector; only `block` is ever filled.
    candidate: Vec<f64>,
}

impl<'a, O: Objective + ?Sized> Worker<'a, O> {
    pub(crate) fn new(
        objective: &'a O,
        region: &'a SharedRegion,
        rank: usize,
        size: usize,
        block: Range<usize>,
        stream: CandidateStream,
    ) -> Self {
        Self {
            objective,
            region,
            barrier: Barrier::new(region.control(), size, rank),
            rank,
            block,
            stream,
            candidate: vec![0.0; region.dimension()],
        }
    }

    /// Runs the protocol to completion. Rank 0 returns its final decision
    /// state; every other rank returns `None`.
    pub(crate) fn run(
        &mut self,
        initial: &[f64],
        config: &SaConfig,
        seed: u64,
    ) -> AnnealResult<Option<AnnealState>> {
        let region = self.region;
        let control = region.control();

        // Round zero: every rank seeds its block of the shared vector and the
        // coordinator learns f(x0).
        // SAFETY: blocks are disjoint and nobody reads the vector until the
        // shutdown handshake.
        unsafe {
            region.write_block(self.block.start, &initial[self.block.clone()]);
        }
        control.write_slot(self.rank, self.evaluate(initial, 0)?);
        self.sync()?;

        let mut coordinator = if self.rank == 0 {
            let initial_value = self.reduce(0)?;
            let state = AnnealState::new(config, initial_value);
            control.publish_state(&state, Verdict::Rejected);
            debug!("coordinator: f(x0)={initial_value}, seed={seed}");
            Some(Coordinator {
                config,
                state,
                rng: acceptance_rng(seed),
            })
        } else {
            None
        };
        self.sync()?;

        loop {
            let step = control.step();
            let block = self.block.clone();
            self.stream
                .fill_block(step, block.start, &mut self.candidate[block.clone()]);
            control.write_slot(self.rank, self.evaluate(&self.candidate, step)?);
            self.sync()?;

            if let Some(coordinator) = coordinator.as_mut() {
                let value = self.reduce(step)?;
                let (verdict, event) = coordinator.decide(value);
                control.publish_state(&coordinator.state, verdict);
                if event.is_terminal() {
                    info!(
                        "coordinator: {event:?} after {} iterations, best={}",
                        coordinator.state.step, coordinator.state.best_value
                    );
                    control.signal_completion();
                }
            }
            self.sync()?;

            let completed = match control.exit_state() {
                ExitState::Running => false,
                ExitState::Completed => true,
                ExitState::Faulted(fault) => {
                    return Err(AnnealError::PeerAborted {
                        rank: self.rank,
                        fault,
                    })
                }
            };
            if control.decision().is_improved() {
                // SAFETY: as above; the coordinator reads the vector only
                // after every peer has departed.
                unsafe {
                    region.write_block(block.start, &self.candidate[block.clone()]);
                }
            }
            if completed {
                break;
            }
        }

        Ok(coordinator.map(|c| c.state))
    }

    /// Barrier wait that turns a faulted exit flag into an error.
    fn sync(&self) -> AnnealResult<()> {
        if self.barrier.wait()? == BarrierOutcome::Exit {
            if let ExitState::Faulted(fault) = self.region.control().exit_state() {
                return Err(AnnealError::PeerAborted {
                    rank: self.rank,
                    fault,
                });
            }
        }
        Ok(())
    }

    fn evaluate(&self, x: &[f64], step: u64) -> AnnealResult<f64> {
        let value = self
            .objective
            .evaluate_partial(x, self.block.start, self.block.end);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(AnnealError::Computation {
                rank: self.rank,
                step,
                value,
            })
        }
    }

    fn reduce(&self, step: u64) -> AnnealResult<f64> {
        let value = self.region.control().reduce(self.barrier.size());
        if value.is_finite() {
            Ok(value)
        } else {
            Err(AnnealError::Computation {
                rank: self.rank,
                step,
                value,
            })
        }
    }
}
