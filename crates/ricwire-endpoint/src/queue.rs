//! Fixed-capacity FIFO guarded by a bounded-wait lock.
//!
//! Producers and consumers may sit on different threads. No operation waits
//! longer than the configured lock timeout: a contended `put` fails with
//! [`QueueError::LockTimeout`] and a contended `get` reports empty, and the
//! caller retries on its next service tick.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::QueueError;

/// Default bound on lock acquisition.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(1);

/// Attempts that only yield before the wait starts sleeping.
const SPIN_ATTEMPTS: u32 = 8;

/// Sleep between later attempts, clipped to the time left.
const BACKOFF_SLEEP: Duration = Duration::from_micros(50);

/// Point-in-time occupancy of one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub capacity: usize,
    pub peak_depth: usize,
    pub current_depth: usize,
}

#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    lock_timeout: Duration,
    depth: AtomicUsize,
    peak: AtomicUsize,
}

/// Try to take `lock` until `timeout` has elapsed. The first few retries
/// yield; later ones sleep briefly. A poisoned lock is taken over as-is.
pub(crate) fn lock_bounded<T>(lock: &Mutex<T>, timeout: Duration) -> Option<MutexGuard<'_, T>> {
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;
    loop {
        match lock.try_lock() {
            Ok(guard) => return Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => return Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {
                let now = Instant::now();
                if now >= deadline {
                    return None;
                }
                attempts = attempts.saturating_add(1);
                if attempts <= SPIN_ATTEMPTS {
                    std::thread::yield_now();
                } else {
                    std::thread::sleep(BACKOFF_SLEEP.min(deadline - now));
                }
            }
        }
    }
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self::with_lock_timeout(capacity, DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(capacity: usize, lock_timeout: Duration) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            lock_timeout,
            depth: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Hold the queue lock so other callers hit the bounded wait.
    #[cfg(test)]
    pub(crate) fn hold_lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `item`, failing rather than waiting if the queue is full or the
    /// lock is busy.
    pub fn put(&self, item: T) -> Result<(), QueueError> {
        let mut items = lock_bounded(&self.items, self.lock_timeout).ok_or(QueueError::LockTimeout)?;
        if items.len() >= self.capacity {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }
        items.push_back(item);
        let depth = items.len();
        self.depth.store(depth, Ordering::Release);
        self.peak.fetch_max(depth, Ordering::AcqRel);
        Ok(())
    }

    /// Take the oldest item. `None` if empty or the lock is busy.
    pub fn get(&self) -> Option<T> {
        let mut items = lock_bounded(&self.items, self.lock_timeout)?;
        let item = items.pop_front();
        self.depth.store(items.len(), Ordering::Release);
        item
    }

    /// Current depth (lock-free snapshot).
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if a `put` would currently find space.
    pub fn can_accept(&self) -> bool {
        self.len() < self.capacity
    }

    /// Drop every queued item. Peak depth is kept.
    pub fn clear(&self) {
        if let Some(mut items) = lock_bounded(&self.items, self.lock_timeout) {
            items.clear();
            self.depth.store(0, Ordering::Release);
        }
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            capacity: self.capacity,
            peak_depth: self.peak.load(Ordering::Acquire),
            current_depth: self.len(),
        }
    }

    /// Reset peak depth.
    pub fn clear_stats(&self) {
        self.peak.store(0, Ordering::Release);
    }
}
