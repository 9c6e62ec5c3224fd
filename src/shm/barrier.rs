//! Reusable N-party spin barrier over `(arrival_count, generation)`.
//!
//! The completing participant resets the arrival counter and bumps the
//! generation with release semantics; everyone else spins on the generation
//! with acquire semantics. Arrivals are `AcqRel` read-modify-writes, so all
//! writes made before any participant's `wait` happen-before every
//! participant's return from the matching `wait`.
//!
//! Waiting never blocks in the OS. A set exit flag releases spinning
//! participants with [`BarrierOutcome::Exit`]; a peer that dies after arriving
//! wedges everyone else, which is a known limitation.

use std::hint::spin_loop;
use std::sync::atomic::Ordering;

use super::control::{ControlBlock, Fault, MAX_PARTICIPANTS};
use crate::error::{AnnealError, AnnealResult};

/// How a `wait` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierOutcome {
    /// All participants arrived; the generation advanced by one.
    Released,
    /// The exit flag was raised while waiting.
    Exit,
}

/// One participant's view of the shared barrier.
#[derive(Debug, Clone, Copy)]
pub struct Barrier<'a> {
    control: &'a ControlBlock,
    size: usize,
    rank: usize,
}

impl<'a> Barrier<'a> {
    /// `size` must equal the number of participants that will ever call
    /// [`wait`](Barrier::wait) on this control block.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or above [`MAX_PARTICIPANTS`].
    pub fn new(control: &'a ControlBlock, size: usize, rank: usize) -> Self {
        assert!(
            size > 0 && size <= MAX_PARTICIPANTS,
            "barrier size {size} out of range 1..={MAX_PARTICIPANTS}"
        );
        Self {
            control,
            size,
            rank,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current generation.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.control.generation()
    }

    fn violation(&self, detail: String) -> AnnealError {
        self.control.signal_fault(Fault::BarrierProtocol);
        AnnealError::BarrierProtocolViolation {
            rank: self.rank,
            detail,
        }
    }

    /// Waits until all `size` participants have arrived.
    pub fn wait(&self) -> AnnealResult<BarrierOutcome> {
        let control = self.control;
        let size = self.size as u64;

        let generation = control.generation.0.load(Ordering::Acquire);
        let arrived = control.arrival_count.0.fetch_add(1, Ordering::AcqRel) + 1;

        if arrived > size {
            return Err(self.violation(format!(
                "{arrived} arrivals at generation {generation} for a barrier of {size}"
            )));
        }

        if arrived == size {
            control.arrival_count.0.store(0, Ordering::Relaxed);
            control.generation.0.fetch_add(1, Ordering::AcqRel);
            return Ok(BarrierOutcome::Released);
        }

        loop {
            let current = control.generation.0.load(Ordering::Acquire);
            if current != generation {
                if current != generation + 1 {
                    return Err(self.violation(format!(
                        "generation moved from {generation} to {current} without this rank"
                    )));
                }
                return Ok(BarrierOutcome::Released);
            }
            if control.exit_requested() {
                return Ok(BarrierOutcome::Exit);
            }
            spin_loop();
        }
    }
}
