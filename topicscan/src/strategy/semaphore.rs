use crossbeam_channel::{bounded, Receiver, Sender};

/// Counting semaphore with a fixed number of slots.
///
/// Backed by a token queue: acquiring pushes a token and blocks while the
/// queue is full, releasing takes one back out. Capacity never changes.
#[derive(Debug)]
pub struct Semaphore {
    acquire: Sender<()>,
    release: Receiver<()>,
    capacity: usize,
}

impl Semaphore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (acquire, release) = bounded(capacity);
        Self {
            acquire,
            release,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held
    pub fn in_use(&self) -> usize {
        self.acquire.len()
    }

    /// Blocks until a slot is free
    pub fn acquire(&self) -> Permit<'_> {
        // Cannot fail: `self` owns the receiving side
        let _ = self.acquire.send(());
        Permit { semaphore: self }
    }

    /// Takes a slot only if one is free right now
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        self.acquire
            .try_send(())
            .ok()
            .map(|_| Permit { semaphore: self })
    }
}

/// A held slot, returned to the semaphore on drop
#[derive(Debug)]
pub struct Permit<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let released = self.semaphore.release.try_recv();
        debug_assert!(released.is_ok(), "permit dropped with no slot held");
    }
}
