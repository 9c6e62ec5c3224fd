//! Simulated Annealing (SA) over continuous objectives.
//!
//! Candidates are drawn uniformly from the search box, compared against the
//! cached value of the last accepted incumbent with the Metropolis criterion,
//! and the temperature is cooled geometrically after a fixed number of
//! iterations per level. The same decision logic drives both the
//! single-process [`SequentialRunner`] and the coordinator role of the
//! multi-process runner in [`crate::parallel`].
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Metropolis et al. (1953), "Equation of State Calculations by Fast Computing Machines"

mod config;
mod runner;
mod schedule;
mod stream;
mod types;

pub use config::SaConfig;
pub use runner::SequentialRunner;
pub use schedule::{
    acceptance_probability, cooling_events_until_frozen, metropolis_accepts, AnnealState,
    ScheduleEvent, Verdict,
};
pub use stream::{acceptance_rng, resolve_seed, CandidateStream};
pub use types::{Objective, RunOutcome};
