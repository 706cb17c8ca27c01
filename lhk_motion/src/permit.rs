//! Bounded counting permit for X-axis homing.
//!
//! X homes sweep the whole gantry and draw high current, so at most a
//! fixed number may run at once across every arm of a topology. The
//! topology owns one [`HomingPermits`] and hands an `Arc` of it to each
//! arm; [`HomingPermits::acquire`] blocks until a permit is free and the
//! returned guard gives it back on drop, whatever the exit path.

use parking_lot::{Condvar, Mutex};
use tracing::trace;

/// Counting semaphore.
#[derive(Debug)]
pub struct HomingPermits {
    capacity: usize,
    available: Mutex<usize>,
    released: Condvar,
}

impl HomingPermits {
    /// Semaphore with `capacity` permits (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            available: Mutex::new(capacity),
            released: Condvar::new(),
        }
    }

    /// Block until a permit is free.
    pub fn acquire(&self) -> HomingPermit<'_> {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
        trace!("Homing permit taken ({} left)", *available);
        HomingPermit { permits: self }
    }

    /// Take a permit only if one is free right now.
    pub fn try_acquire(&self) -> Option<HomingPermit<'_>> {
        let mut available = self.available.lock();
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(HomingPermit { permits: self })
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        *self.available.lock()
    }

    /// Total number of permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self) {
        let mut available = self.available.lock();
        *available += 1;
        trace!("Homing permit returned ({} left)", *available);
        self.released.notify_one();
    }
}

/// A held permit; released on drop.
#[derive(Debug)]
pub struct HomingPermit<'a> {
    permits: &'a HomingPermits,
}

impl Drop for HomingPermit<'_> {
    fn drop(&mut self) {
        self.permits.release();
    }
}
