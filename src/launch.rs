//! Starting and reaping peer processes.
//!
//! Rank 0 launches ranks `1..size` as copies of a program, passing each its
//! identity on the command line. Peers find the shared region by name; nothing
//! else is exchanged through the process boundary.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::{Child, Command};

use log::{error, info, warn};

use crate::error::{AnnealError, AnnealResult};

/// Launches copies of `program` as peer ranks.
#[derive(Debug, Clone)]
pub struct PeerLauncher {
    program: PathBuf,
}

impl PeerLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// A launcher for the currently running executable.
    pub fn current_exe() -> AnnealResult<Self> {
        std::env::current_exe()
            .map(Self::new)
            .map_err(|source| AnnealError::Launch { rank: 0, source })
    }

    /// The command line rank `rank` is started with.
    pub fn command<I, S>(&self, rank: usize, size: usize, seed: u64, extra_args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command
            .arg("--rank")
            .arg(rank.to_string())
            .arg("--size")
            .arg(size.to_string())
            .arg("--seed")
            .arg(seed.to_string())
            .args(extra_args);
        command
    }

    /// Spawns ranks `1..size`. If any spawn fails, the peers already started
    /// are killed and reaped before the error is returned.
    pub fn launch_all<I, S>(&self, size: usize, seed: u64, extra_args: I) -> AnnealResult<PeerGroup>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let extra: Vec<OsString> = extra_args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();

        let mut group = PeerGroup {
            children: Vec::with_capacity(size.saturating_sub(1)),
        };
        for rank in 1..size {
            match self.command(rank, size, seed, &extra).spawn() {
                Ok(child) => {
                    info!("launched rank {rank}/{size} as pid {}", child.id());
                    group.children.push((rank, child));
                }
                Err(source) => {
                    error!("failed to launch rank {rank}: {source}");
                    group.kill_all();
                    return Err(AnnealError::Launch { rank, source });
                }
            }
        }
        Ok(group)
    }
}

/// Peer processes started by [`PeerLauncher::launch_all`].
#[derive(Debug)]
pub struct PeerGroup {
    children: Vec<(usize, Child)>,
}

impl PeerGroup {
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Process ids, in rank order.
    pub fn pids(&self) -> Vec<u32> {
        self.children.iter().map(|(_, child)| child.id()).collect()
    }

    /// Waits for every peer. Returns the first failure after all have been
    /// reaped.
    pub fn wait_all(mut self) -> AnnealResult<()> {
        let mut first_error = None;
        for (rank, mut child) in self.children.drain(..) {
            match child.wait() {
                Ok(status) if status.success() => info!("rank {rank} exited cleanly"),
                Ok(status) => {
                    error!("rank {rank} exited with {status}");
                    first_error.get_or_insert(AnnealError::PeerExit { rank, status });
                }
                Err(source) => {
                    error!("failed to wait for rank {rank}: {source}");
                    first_error.get_or_insert(AnnealError::Launch { rank, source });
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Kills and reaps every peer that is still running.
    pub fn kill_all(&mut self) {
        for (rank, mut child) in self.children.drain(..) {
            if let Err(err) = child.kill() {
                warn!("could not kill rank {rank}: {err}");
            }
            let _ = child.wait();
        }
    }
}

impl Drop for PeerGroup {
    fn drop(&mut self) {
        if !self.children.is_empty() {
            warn!("dropping {} unreaped peers; killing them", self.children.len());
            self.kill_all();
        }
    }
}
