//! Fixed layout of the control block at the start of the shared region.
//!
//! Every field is an atomic so the block can be viewed as `&ControlBlock` from
//! any number of mappings at once. Ownership is by convention:
//!
//! | field | writer |
//! |---|---|
//! | `magic`, `dimension`, `participants`, `best_vector_offset`, `ready_flag` | creator, once |
//! | `arrival_count`, `generation` | every participant (barrier) |
//! | `exit_flag` | any participant (first writer wins) |
//! | `temperature`, counters, `incumbent_value`, `best_value`, `decision` | coordinator |
//! | `reduction_slots[r]` | rank `r` |
//! | `departed` | every non-creator, once |
//!
//! Coordinator-owned fields use relaxed accesses; they are ordered by the
//! barrier that follows the write.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::sa::{AnnealState, Verdict};

/// Upper bound on participants; one reduction slot each.
pub const MAX_PARTICIPANTS: usize = 64;

/// Marks a fully initialized control block ("SASHM" + layout version 1).
pub const REGION_MAGIC: u64 = 0x5341_5348_4d00_0001;

const READY: u32 = 1;
const EXIT_RUNNING: u32 = 0;
const EXIT_COMPLETED: u32 = 1;

/// Fatal conditions published through the exit flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Fault {
    Initialization = 2,
    BarrierProtocol = 3,
    Computation = 4,
}

impl Fault {
    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            2 => Some(Fault::Initialization),
            3 => Some(Fault::BarrierProtocol),
            4 => Some(Fault::Computation),
            _ => None,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Fault::Initialization => "an initialization fault",
            Fault::BarrierProtocol => "a barrier protocol violation",
            Fault::Computation => "a computation fault",
        };
        f.write_str(s)
    }
}

/// Decoded value of the exit flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Running,
    Completed,
    Faulted(Fault),
}

/// Keeps hot atomics on separate cache lines.
#[derive(Debug, Default)]
#[repr(C, align(64))]
pub struct CachePadded<T>(pub T);

/// Shared control state. Lives at offset 0 of the region.
#[derive(Debug)]
#[repr(C)]
pub struct ControlBlock {
    magic: AtomicU64,
    dimension: AtomicU64,
    participants: AtomicU64,
    /// Byte offset of the best vector from the start of the region. Fixed at
    /// creation; improved blocks are rewritten in place by their owners, so
    /// the coordinator never moves it.
    best_vector_offset: AtomicU64,
    ready_flag: AtomicU32,
    exit_flag: AtomicU32,
    decision: AtomicU32,
    _reserved: AtomicU32,

    temperature: AtomicU64,
    iteration_counter: AtomicU64,
    outer_round_counter: AtomicU64,
    step: AtomicU64,
    incumbent_value: AtomicU64,
    best_value: AtomicU64,
    accepted_moves: AtomicU64,
    improving_moves: AtomicU64,

    pub(crate) arrival_count: CachePadded<AtomicU64>,
    pub(crate) generation: CachePadded<AtomicU64>,
    departed: CachePadded<AtomicU64>,

    reduction_slots: [CachePadded<AtomicU64>; MAX_PARTICIPANTS],
}

impl Default for ControlBlock {
    fn default() -> Self {
        Self {
            magic: AtomicU64::new(0),
            dimension: AtomicU64::new(0),
            participants: AtomicU64::new(0),
            best_vector_offset: AtomicU64::new(0),
            ready_flag: AtomicU32::new(0),
            exit_flag: AtomicU32::new(EXIT_RUNNING),
            decision: AtomicU32::new(0),
            _reserved: AtomicU32::new(0),
            temperature: AtomicU64::new(0),
            iteration_counter: AtomicU64::new(0),
            outer_round_counter: AtomicU64::new(0),
            step: AtomicU64::new(0),
            incumbent_value: AtomicU64::new(0),
            best_value: AtomicU64::new(0),
            accepted_moves: AtomicU64::new(0),
            improving_moves: AtomicU64::new(0),
            arrival_count: CachePadded::default(),
            generation: CachePadded::default(),
            departed: CachePadded::default(),
            reduction_slots: std::array::from_fn(|_| CachePadded::default()),
        }
    }
}

#[inline]
fn load_f64(cell: &AtomicU64) -> f64 {
    f64::from_bits(cell.load(Ordering::Relaxed))
}

#[inline]
fn store_f64(cell: &AtomicU64, value: f64) {
    cell.store(value.to_bits(), Ordering::Relaxed);
}

impl ControlBlock {
    /// Zeroes every field except `ready_flag`, which must already be clear.
    pub(crate) fn reset(&self) {
        for cell in [
            &self.magic,
            &self.dimension,
            &self.participants,
            &self.best_vector_offset,
            &self.temperature,
            &self.iteration_counter,
            &self.outer_round_counter,
            &self.step,
            &self.incumbent_value,
            &self.best_value,
            &self.accepted_moves,
            &self.improving_moves,
        ] {
            cell.store(0, Ordering::Relaxed);
        }
        self.exit_flag.store(EXIT_RUNNING, Ordering::Relaxed);
        self.decision.store(0, Ordering::Relaxed);
        self.arrival_count.0.store(0, Ordering::Relaxed);
        self.generation.0.store(0, Ordering::Relaxed);
        self.departed.0.store(0, Ordering::Relaxed);
        for slot in &self.reduction_slots {
            slot.0.store(0, Ordering::Relaxed);
        }
    }

    /// Writes the layout fields and publishes the block to attachers.
    pub(crate) fn publish_layout(
        &self,
        dimension: usize,
        participants: usize,
        best_vector_offset: usize,
    ) {
        self.dimension.store(dimension as u64, Ordering::Relaxed);
        self.participants
            .store(participants as u64, Ordering::Relaxed);
        self.best_vector_offset
            .store(best_vector_offset as u64, Ordering::Relaxed);
        self.magic.store(REGION_MAGIC, Ordering::Relaxed);
        self.ready_flag.store(READY, Ordering::Release);
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready_flag.load(Ordering::Acquire) == READY
    }

    pub fn magic(&self) -> u64 {
        self.magic.load(Ordering::Relaxed)
    }

    pub fn dimension(&self) -> usize {
        self.dimension.load(Ordering::Relaxed) as usize
    }

    pub fn participants(&self) -> usize {
        self.participants.load(Ordering::Relaxed) as usize
    }

    pub fn best_vector_offset(&self) -> usize {
        self.best_vector_offset.load(Ordering::Relaxed) as usize
    }

    // ---- exit flag ----

    #[inline]
    pub fn exit_state(&self) -> ExitState {
        match self.exit_flag.load(Ordering::Acquire) {
            EXIT_RUNNING => ExitState::Running,
            EXIT_COMPLETED => ExitState::Completed,
            bits => ExitState::Faulted(Fault::from_bits(bits).unwrap_or(Fault::BarrierProtocol)),
        }
    }

    #[inline]
    pub fn exit_requested(&self) -> bool {
        self.exit_flag.load(Ordering::Acquire) != EXIT_RUNNING
    }

    /// Normal termination. Only the coordinator calls this.
    pub fn signal_completion(&self) {
        let _ = self.exit_flag.compare_exchange(
            EXIT_RUNNING,
            EXIT_COMPLETED,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Publishes a fault. A fault overrides a completion; the first fault wins.
    pub fn signal_fault(&self, fault: Fault) {
        let mut current = self.exit_flag.load(Ordering::Acquire);
        while current == EXIT_RUNNING || current == EXIT_COMPLETED {
            match self.exit_flag.compare_exchange_weak(
                current,
                fault as u32,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    // ---- reduction ----

    #[inline]
    pub fn write_slot(&self, rank: usize, partial: f64) {
        store_f64(&self.reduction_slots[rank].0, partial);
    }

    #[inline]
    pub fn read_slot(&self, rank: usize) -> f64 {
        load_f64(&self.reduction_slots[rank].0)
    }

    /// Sum of the first `size` slots, in rank order.
    pub fn reduce(&self, size: usize) -> f64 {
        self.reduction_slots[..size]
            .iter()
            .map(|slot| load_f64(&slot.0))
            .sum()
    }

    // ---- coordinator-owned decision state ----

    pub fn publish_state(&self, state: &AnnealState, verdict: Verdict) {
        store_f64(&self.temperature, state.temperature);
        self.iteration_counter
            .store(state.iteration_counter, Ordering::Relaxed);
        self.outer_round_counter
            .store(state.outer_round_counter, Ordering::Relaxed);
        self.step.store(state.step, Ordering::Relaxed);
        store_f64(&self.incumbent_value, state.incumbent_value);
        store_f64(&self.best_value, state.best_value);
        self.accepted_moves
            .store(state.accepted_moves, Ordering::Relaxed);
        self.improving_moves
            .store(state.improving_moves, Ordering::Relaxed);
        self.decision.store(verdict.to_bits(), Ordering::Relaxed);
    }

    /// Reads back what the coordinator published before the last barrier.
    pub fn published_state(&self) -> AnnealState {
        AnnealState {
            temperature: load_f64(&self.temperature),
            iteration_counter: self.iteration_counter.load(Ordering::Relaxed),
            outer_round_counter: self.outer_round_counter.load(Ordering::Relaxed),
            step: self.step.load(Ordering::Relaxed),
            incumbent_value: load_f64(&self.incumbent_value),
            best_value: load_f64(&self.best_value),
            accepted_moves: self.accepted_moves.load(Ordering::Relaxed),
            improving_moves: self.improving_moves.load(Ordering::Relaxed),
        }
    }

    #[inline]
    pub fn decision(&self) -> Verdict {
        Verdict::from_bits(self.decision.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn step(&self) -> u64 {
        self.step.load(Ordering::Relaxed)
    }

    // ---- barrier introspection ----

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.0.load(Ordering::Acquire)
    }

    // ---- shutdown handshake ----

    /// Called once by every non-creator after its last access to the region.
    pub fn depart(&self) {
        self.departed.0.fetch_add(1, Ordering::Release);
    }

    pub fn departed(&self) -> usize {
        self.departed.0.load(Ordering::Acquire) as usize
    }
}
