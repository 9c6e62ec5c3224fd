//! Multi-process simulated annealing over one shared-memory region.
//!
//! Each participant owns a contiguous block of coordinates. Every iteration
//! all participants regenerate their block of the same candidate from the
//! shared seed, evaluate their partial objective into a reduction slot, and
//! meet at the barrier; rank 0 sums the slots, applies the Metropolis rule and
//! the cooling schedule, publishes the decision, and everyone meets again
//! before reading it. No candidate data ever crosses process boundaries; the
//! shared vector only ever holds the best point found so far.

mod config;
mod partition;
mod runner;
mod worker;

pub use config::ParallelConfig;
pub use partition::{block_range, blocks, effective_alignment, evaluate_partitioned};
pub use runner::ParallelRunner;
