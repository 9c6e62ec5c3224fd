//! Named shared-memory region: control block followed by `n` doubles.
//!
//! ```text
//! offset 0                         best_vector_offset
//! | ControlBlock (cache aligned)   | f64 x n (best vector)        |
//! ```
//!
//! The best vector sits right after the control block for the life of the
//! region.
//!
//! The creator maps a fresh object, clears the control block, writes the
//! layout fields and only then raises `ready_flag`. Attachers spin on
//! `ready_flag` (bounded) before reading anything else. Dropping the creator's
//! handle unlinks the backing object; peers keep their own mappings until
//! they drop theirs.

use std::mem::size_of;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use shared_memory::{Shmem, ShmemConf};

use super::control::{ControlBlock, Fault, MAX_PARTICIPANTS, REGION_MAGIC};
use crate::error::{AnnealError, AnnealResult};

/// POSIX object names are portable only with a single leading slash.
fn os_id(name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    }
}

/// A mapping of the shared region, owned by one participant.
pub struct SharedRegion {
    shmem: Shmem,
    name: String,
    creator: bool,
    dimension: usize,
    best_vector_offset: usize,
}

impl std::fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRegion")
            .field("name", &self.name)
            .field("creator", &self.creator)
            .field("dimension", &self.dimension)
            .field("len", &self.shmem.len())
            .finish()
    }
}

impl SharedRegion {
    /// Bytes needed for a vector of `dimension` doubles.
    pub fn required_size(dimension: usize) -> Option<usize> {
        dimension
            .checked_mul(size_of::<f64>())?
            .checked_add(size_of::<ControlBlock>())
    }

    /// Creates and initializes the region. Fails if the name is taken.
    pub fn create(name: &str, dimension: usize, participants: usize) -> AnnealResult<Self> {
        if participants == 0 || participants > MAX_PARTICIPANTS {
            return Err(AnnealError::Initialization(format!(
                "participant count {participants} out of range 1..={MAX_PARTICIPANTS}"
            )));
        }
        let size = Self::required_size(dimension).ok_or_else(|| {
            AnnealError::Initialization(format!("dimension {dimension} overflows the region size"))
        })?;

        let shmem = ShmemConf::new()
            .size(size)
            .os_id(os_id(name))
            .create()
            .map_err(|source| AnnealError::SharedMemory {
                name: name.to_string(),
                source,
            })?;

        let best_vector_offset = size_of::<ControlBlock>();
        let region = Self {
            shmem,
            name: name.to_string(),
            creator: true,
            dimension,
            best_vector_offset,
        };

        // A fresh object is zero-filled; clear explicitly anyway so the
        // block never depends on what the OS hands out.
        let control = region.control();
        control.reset();
        // SAFETY: nobody reads the vector before `ready_flag` is raised.
        unsafe {
            std::ptr::write_bytes(region.vector_ptr(), 0, dimension);
        }
        control.publish_layout(dimension, participants, best_vector_offset);

        info!(
            "created region `{name}`: {size} bytes, n={dimension}, {participants} participants"
        );
        Ok(region)
    }

    /// Attaches to a region created by another participant, waiting up to
    /// `timeout` for it to exist and be published.
    pub fn attach(name: &str, timeout: Duration) -> AnnealResult<Self> {
        let deadline = Instant::now() + timeout;
        let id = os_id(name);

        let shmem = loop {
            match ShmemConf::new().os_id(&id).open() {
                Ok(shmem) if shmem.len() >= size_of::<ControlBlock>() => break shmem,
                Ok(_) if Instant::now() < deadline => {}
                Ok(shmem) => {
                    return Err(AnnealError::Initialization(format!(
                        "region `{name}` is {} bytes, too small for a control block",
                        shmem.len()
                    )))
                }
                Err(source) if Instant::now() >= deadline => {
                    return Err(AnnealError::SharedMemory {
                        name: name.to_string(),
                        source,
                    })
                }
                Err(_) => {}
            }
            thread::sleep(Duration::from_millis(1));
        };

        // SAFETY: the mapping is at least one control block long and page
        // aligned; every field is an atomic, valid for any bit pattern.
        let control = unsafe { &*(shmem.as_ptr() as *const ControlBlock) };
        debug!("attached to `{name}`, waiting for ready flag");
        while !control.is_ready() {
            if Instant::now() >= deadline {
                return Err(AnnealError::Initialization(format!(
                    "region `{name}` not ready after {timeout:?}"
                )));
            }
            std::hint::spin_loop();
            thread::yield_now();
        }

        // Past the ready flag the creator counts this attacher, so a rejected
        // layout still departs before the mapping is dropped.
        let fail = |detail: String| {
            control.signal_fault(Fault::Initialization);
            control.depart();
            Err(AnnealError::Initialization(detail))
        };
        if control.magic() != REGION_MAGIC {
            return fail(format!("region `{name}` has an unknown layout"));
        }
        let dimension = control.dimension();
        let best_vector_offset = control.best_vector_offset();
        let needed = dimension
            .checked_mul(size_of::<f64>())
            .and_then(|bytes| bytes.checked_add(best_vector_offset));
        match needed {
            Some(needed) if needed <= shmem.len() && best_vector_offset % 8 == 0 => {}
            _ => {
                return fail(format!(
                    "region `{name}` is {} bytes, layout needs n={dimension} at offset {best_vector_offset}",
                    shmem.len()
                ))
            }
        }

        info!("attached to region `{name}`: n={dimension}");
        Ok(Self {
            shmem,
            name: name.to_string(),
            creator: false,
            dimension,
            best_vector_offset,
        })
    }

    #[inline]
    pub fn control(&self) -> &ControlBlock {
        // SAFETY: see `attach`; the creator's mapping is at least as large.
        unsafe { &*(self.shmem.as_ptr() as *const ControlBlock) }
    }

    #[inline]
    fn vector_ptr(&self) -> *mut f64 {
        // SAFETY: `best_vector_offset + dimension * 8 <= len`, checked at create/attach.
        unsafe { self.shmem.as_ptr().add(self.best_vector_offset) as *mut f64 }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_creator(&self) -> bool {
        self.creator
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn participants(&self) -> usize {
        self.control().participants()
    }

    /// Copies `values` into the shared vector at `start`.
    ///
    /// # Safety
    ///
    /// The caller must be the only writer of `start..start + values.len()`
    /// until the next barrier, and nobody may read that range before it.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the vector.
    pub unsafe fn write_block(&self, start: usize, values: &[f64]) {
        assert!(
            start + values.len() <= self.dimension,
            "block {start}..{} exceeds dimension {}",
            start + values.len(),
            self.dimension
        );
        std::ptr::copy_nonoverlapping(values.as_ptr(), self.vector_ptr().add(start), values.len());
    }

    /// Copies the whole shared vector out.
    ///
    /// # Safety
    ///
    /// No participant may be writing to the vector; every write must
    /// happen-before this call (barrier or shutdown handshake).
    pub unsafe fn read_vector(&self) -> Vec<f64> {
        std::slice::from_raw_parts(self.vector_ptr(), self.dimension).to_vec()
    }

    /// Waits for every other participant to depart, up to `timeout`.
    /// Returns the number that did.
    pub fn await_departures(&self, expected: usize, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let control = self.control();
        loop {
            let departed = control.departed();
            if departed >= expected {
                return departed;
            }
            if Instant::now() >= deadline {
                warn!(
                    "region `{}`: only {departed}/{expected} peers departed within {timeout:?}",
                    self.name
                );
                return departed;
            }
            std::hint::spin_loop();
            thread::yield_now();
        }
    }

    /// Unmaps the region; the creator also destroys the backing object.
    pub fn release(self) {
        if self.creator {
            info!("releasing region `{}`", self.name);
        } else {
            debug!("detaching from region `{}`", self.name);
        }
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shm::ExitState;

    fn unique_name(tag: &str) -> String {
        format!("u-shm-anneal-{}-{tag}", std::process::id())
    }

    #[test]
    fn test_create_publishes_layout() {
        let name = unique_name("layout");
        let region = SharedRegion::create(&name, 10, 3).unwrap();
        let control = region.control();
        assert!(control.is_ready());
        assert_eq!(control.dimension(), 10);
        assert_eq!(control.participants(), 3);
        assert_eq!(control.best_vector_offset(), size_of::<ControlBlock>());
        assert_eq!(control.exit_state(), ExitState::Running);
        assert_eq!(unsafe { region.read_vector() }, vec![0.0; 10]);
        assert!(region.is_creator());
    }

    #[test]
    fn test_attach_sees_creator_writes() {
        let name = unique_name("attach");
        let creator = SharedRegion::create(&name, 6, 2).unwrap();
        unsafe { creator.write_block(2, &[1.5, 2.5]) };
        creator.control().write_slot(0, 42.0);

        let peer = SharedRegion::attach(&name, Duration::from_secs(5)).unwrap();
        assert!(!peer.is_creator());
        assert_eq!(peer.dimension(), 6);
        assert_eq!(peer.participants(), 2);
        assert_eq!(peer.control().read_slot(0), 42.0);
        assert_eq!(
            unsafe { peer.read_vector() },
            vec![0.0, 0.0, 1.5, 2.5, 0.0, 0.0]
        );

        unsafe { peer.write_block(0, &[9.0]) };
        assert_eq!(unsafe { creator.read_vector() }[0], 9.0);
    }

    #[test]
    fn test_create_twice_fails() {
        let name = unique_name("twice");
        let _first = SharedRegion::create(&name, 4, 1).unwrap();
        let err = SharedRegion::create(&name, 4, 1).unwrap_err();
        assert!(matches!(err, AnnealError::SharedMemory { .. }));
    }

    #[test]
    fn test_attach_missing_region_times_out() {
        let name = unique_name("missing");
        let started = Instant::now();
        let err = SharedRegion::attach(&name, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, AnnealError::SharedMemory { .. }));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_attach_times_out_when_never_ready() {
        let name = unique_name("unready");
        // Right size, never published: `ready_flag` stays zero.
        let _raw = ShmemConf::new()
            .size(SharedRegion::required_size(8).unwrap())
            .os_id(os_id(&name))
            .create()
            .unwrap();
        let started = Instant::now();
        let err = SharedRegion::attach(&name, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, AnnealError::Initialization(_)));
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_rejected_layout_faults_and_departs() {
        let name = unique_name("magic");
        let creator = SharedRegion::create(&name, 4, 2).unwrap();
        // `magic` is the first field of the control block.
        let magic = unsafe { &*(creator.shmem.as_ptr() as *const std::sync::atomic::AtomicU64) };
        magic.store(0, std::sync::atomic::Ordering::Relaxed);

        let err = SharedRegion::attach(&name, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, AnnealError::Initialization(_)));
        let control = creator.control();
        assert_eq!(control.exit_state(), ExitState::Faulted(Fault::Initialization));
        assert_eq!(creator.await_departures(1, Duration::from_millis(20)), 1);
    }

    #[test]
    fn test_attach_waits_for_late_creator() {
        let name = unique_name("late");
        let peer = {
            let name = name.clone();
            thread::spawn(move || {
                SharedRegion::attach(&name, Duration::from_secs(10)).map(|r| r.dimension())
            })
        };
        thread::sleep(Duration::from_millis(30));
        let _creator = SharedRegion::create(&name, 12, 2).unwrap();
        assert_eq!(peer.join().unwrap().unwrap(), 12);
    }

    #[test]
    fn test_release_unlinks() {
        let name = unique_name("release");
        SharedRegion::create(&name, 4, 1).unwrap().release();
        // The name is free again.
        SharedRegion::create(&name, 4, 1).unwrap().release();
    }

    #[test]
    fn test_rejects_bad_participant_count() {
        let name = unique_name("participants");
        assert!(SharedRegion::create(&name, 4, 0).is_err());
        assert!(SharedRegion::create(&name, 4, MAX_PARTICIPANTS + 1).is_err());
    }

    #[test]
    fn test_await_departures() {
        let name = unique_name("depart");
        let region = SharedRegion::create(&name, 1, 3).unwrap();
        region.control().depart();
        assert_eq!(region.await_departures(2, Duration::from_millis(20)), 1);
        region.control().depart();
        assert_eq!(region.await_departures(2, Duration::from_millis(20)), 2);
    }
}
