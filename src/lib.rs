//! Simulated annealing over high-dimensional continuous objectives, with a
//! single-process baseline and a multi-process variant that coordinates
//! through one named shared-memory region.
//!
//! - **Sequential baseline** ([`sa::SequentialRunner`]): candidates drawn
//!   uniformly from the search box, Metropolis acceptance against the cached
//!   incumbent value, geometric cooling.
//! - **Multi-process variant** ([`parallel::ParallelRunner`]): every process
//!   evaluates its own contiguous block of each candidate; a spin barrier and
//!   per-rank reduction slots in shared memory replace message passing, and
//!   rank 0 makes every decision.
//! - **Objectives** ([`objective`]): quadratic bowl, extended Woods, extended
//!   Powell singular, all block-separable.
//!
//! # Architecture
//!
//! [`shm`] owns the raw region: control block layout, create/attach/release,
//! and the barrier. [`parallel`] builds the iteration protocol on top of it and
//! reuses the decision logic of [`sa`], so both runners draw the same
//! candidates for the same seed. [`launch`] and [`report`] serve the
//! `shm-anneal` binary.
//!
//! Peers that crash mid-run are not recovered: the survivors spin in the
//! barrier until they are killed.

pub mod error;
pub mod launch;
pub mod objective;
pub mod parallel;
pub mod report;
pub mod sa;
pub mod shm;

pub use error::{AnnealError, AnnealResult};
