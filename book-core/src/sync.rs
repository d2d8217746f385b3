//! The book's mutual-exclusion primitive.
//!
//! A single atomic flag, test-and-set on acquire, clear on release. On
//! contention the spinner escalates through `crossbeam::utils::Backoff`:
//! a handful of `spin_loop` pauses, doubling up to a cap, then a yield to
//! the OS scheduler. The flag lives in its own `CachePadded` cell so a
//! spinning reader never drags the rest of the book's hot state into its
//! cache line.
//!
//! Every externally observable book mutation acquires this lock and
//! releases it before returning; inside the lock, everything is
//! sequential. Lock-free surfaces elsewhere in the crate (the slab free
//! list, the id/statistics counters) do not depend on this lock and may
//! be touched without it, though in practice everything in this crate is
//! only ever called while it is held.

use crossbeam::utils::{Backoff, CachePadded};
use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

/// A spinlock-protected value.
pub struct Spinlock<T> {
    locked: CachePadded<AtomicBool>,
    value: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for Spinlock<T> {}
unsafe impl<T: Send> Sync for Spinlock<T> {}

impl<T> Spinlock<T> {
    /// Wraps `value` behind a fresh, unlocked spinlock.
    pub fn new(value: T) -> Self {
        Self {
            locked: CachePadded::new(AtomicBool::new(false)),
            value: UnsafeCell::new(value),
        }
    }

    /// Acquires the lock, spinning with exponential backoff on contention.
    pub fn lock(&self) -> SpinlockGuard<'_, T> {
        let backoff = Backoff::new();
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                backoff.snooze();
            }
        }
        SpinlockGuard { lock: self }
    }

    /// Consumes the spinlock and returns the wrapped value without locking.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

/// RAII guard releasing the spinlock's flag on drop.
pub struct SpinlockGuard<'a, T> {
    lock: &'a Spinlock<T>,
}

impl<'a, T> Deref for SpinlockGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.value.get() }
    }
}

impl<'a, T> DerefMut for SpinlockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<'a, T> Drop for SpinlockGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}
