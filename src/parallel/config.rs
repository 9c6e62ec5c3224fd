//! Multi-process run configuration.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::shm::MAX_PARTICIPANTS;

/// Identity of this participant and the shared-region parameters.
///
/// # Examples
///
/// ```
/// use u_shm_anneal::parallel::ParallelConfig;
///
/// let config = ParallelConfig::new("sa-quadratic", 2, 4).with_block_alignment(4);
/// assert!(!config.is_coordinator());
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParallelConfig {
    /// Name of the shared region; rank 0 creates it, everyone else attaches.
    pub region_name: String,

    /// This participant's 0-based rank.
    pub rank: usize,

    /// Total number of participants.
    pub size: usize,

    /// Block boundaries are multiples of this (combined with the
    /// objective's group width).
    pub block_alignment: usize,

    /// How long an attacher waits for the region to exist and be ready.
    pub attach_timeout: Duration,

    /// How long the creator waits for peers to depart before releasing.
    pub shutdown_timeout: Duration,
}

impl ParallelConfig {
    pub const COORDINATOR: usize = 0;

    pub fn new(region_name: impl Into<String>, rank: usize, size: usize) -> Self {
        Self {
            region_name: region_name.into(),
            rank,
            size,
            block_alignment: 1,
            attach_timeout: Duration::from_secs(300),
            shutdown_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_block_alignment(mut self, alignment: usize) -> Self {
        self.block_alignment = alignment;
        self
    }

    pub fn with_attach_timeout(mut self, timeout: Duration) -> Self {
        self.attach_timeout = timeout;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[inline]
    pub fn is_coordinator(&self) -> bool {
        self.rank == Self::COORDINATOR
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.size == 0 || self.size > MAX_PARTICIPANTS {
            return Err(format!(
                "size must be in 1..={MAX_PARTICIPANTS}, got {}",
                self.size
            ));
        }
        if self.rank >= self.size {
            return Err(format!(
                "rank {} out of range for size {}",
                self.rank, self.size
            ));
        }
        if self.block_alignment == 0 {
            return Err("block_alignment must be at least 1".into());
        }
        if self.region_name.is_empty() || self.region_name.trim_start_matches('/').contains('/') {
            return Err(format!(
                "region name `{}` must be non-empty and contain no `/`",
                self.region_name
            ));
        }
        Ok(())
    }
}
