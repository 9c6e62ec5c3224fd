//! Error type shared by the sequential and multi-process runners.

use std::process::ExitStatus;

use thiserror::Error;

use crate::shm::Fault;

#[derive(Error, Debug)]
pub enum AnnealError {
    /// Region create/attach failure, layout mismatch or ready handshake timeout.
    #[error("initialization failed: {0}")]
    Initialization(String),

    #[error("shared memory region `{name}`: {source}")]
    SharedMemory {
        name: String,
        #[source]
        source: shared_memory::ShmemError,
    },

    #[error("barrier protocol violation on rank {rank}: {detail}")]
    BarrierProtocolViolation { rank: usize, detail: String },

    #[error("rank {rank} produced a non-finite objective value {value} at step {step}")]
    Computation { rank: usize, step: u64, value: f64 },

    #[error("rank {rank} stopped because a peer raised {fault}")]
    PeerAborted { rank: usize, fault: Fault },

    #[error("failed to launch peer rank {rank}: {source}")]
    Launch {
        rank: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("peer rank {rank} exited with {status}")]
    PeerExit { rank: usize, status: ExitStatus },

    /// The creator gave up waiting for peers to leave the region.
    #[error("only {departed} of {expected} peers departed before shutdown")]
    ShutdownTimeout { departed: usize, expected: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnnealError {
    /// The fault code other participants observe when this error is published
    /// through the exit flag.
    pub fn fault(&self) -> Fault {
        match self {
            AnnealError::Computation { .. } => Fault::Computation,
            AnnealError::BarrierProtocolViolation { .. } => Fault::BarrierProtocol,
            AnnealError::PeerAborted { fault, .. } => *fault,
            _ => Fault::Initialization,
        }
    }
}

pub type AnnealResult<T> = std::result::Result<T, AnnealError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_mapping() {
        let computation = AnnealError::Computation {
            rank: 2,
            step: 10,
            value: f64::NAN,
        };
        assert_eq!(computation.fault(), Fault::Computation);

        let violation = AnnealError::BarrierProtocolViolation {
            rank: 1,
            detail: "extra arrival".into(),
        };
        assert_eq!(violation.fault(), Fault::BarrierProtocol);

        let aborted = AnnealError::PeerAborted {
            rank: 3,
            fault: Fault::Computation,
        };
        assert_eq!(aborted.fault(), Fault::Computation);

        assert_eq!(
            AnnealError::Initialization("gone".into()).fault(),
            Fault::Initialization
        );
    }

    #[test]
    fn test_messages_name_the_rank() {
        let err = AnnealError::Computation {
            rank: 2,
            step: 10,
            value: f64::INFINITY,
        };
        assert_eq!(
            err.to_string(),
            "rank 2 produced a non-finite objective value inf at step 10"
        );
        let err = AnnealError::PeerAborted {
            rank: 1,
            fault: Fault::BarrierProtocol,
        };
        assert_eq!(
            err.to_string(),
            "rank 1 stopped because a peer raised a barrier protocol violation"
        );
    }
}
