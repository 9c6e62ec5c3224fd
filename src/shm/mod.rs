//! Cross-process shared state: control block, region lifecycle, spin barrier.
//!
//! Nothing here blocks in the OS. Ordering between participants comes solely
//! from the acquire/release pairs of the barrier, plus the `ready_flag` and
//! `exit_flag` handshakes.

mod barrier;
mod control;
mod region;

pub use barrier::{Barrier, BarrierOutcome};
pub use control::{CachePadded, ControlBlock, ExitState, Fault, MAX_PARTICIPANTS, REGION_MAGIC};
pub use region::SharedRegion;
