//! Busy-wait mutual exclusion for the free list.
//!
//! Critical sections here are short walks over the free ring, so a spinning
//! flag beats a real mutex: no syscalls, no queues, usable before any
//! runtime exists. There is no recursion and no fairness; a starving thread
//! just keeps spinning.

use core::cell::UnsafeCell;
use core::hint;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::Ordering;

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(target_has_atomic = "8")] {
        use core::sync::atomic::AtomicBool;
    } else {
        // No native byte-wide atomic swap on this target; the polyfilled
        // flag routes its exchanges through a critical section instead.
        use portable_atomic::AtomicBool;
    }
}

/// A spinning mutex around `T`.
///
/// Locking returns a [`SpinGuard`] that releases on drop, so every exit path
/// of a critical section unlocks, early returns included.
pub(crate) struct SpinLock<T> {
    locked: AtomicBool,
    value: UnsafeCell<T>,
}

// Safety: moving the lock moves the value with it; nothing in the lock pins
// it to a thread.
unsafe impl<T: Send> Send for SpinLock<T> {}

// Safety: the flag serializes all access to `value`, and handing out `&mut T`
// through a guard is equivalent to sending `T` between threads, hence the
// `T: Send` bound.
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Spins until the flag is won, then hands out the sole reference.
    pub fn lock(&self) -> SpinGuard<'_, T> {
        self.acquire();
        SpinGuard { lock: self }
    }
}

cfg_if! {
    if #[cfg(target_has_atomic = "8")] {
        impl<T> SpinLock<T> {
            /// Test and test-and-set.
            ///
            /// The exchange keeps the cache line in exclusive state, so a
            /// contended loop of bare exchanges hammers the owner. Losing
            /// the exchange drops into a load-only poll until the flag
            /// reads clear, then the exchange is retried.
            fn acquire(&self) {
                while self.locked.swap(true, Ordering::Acquire) {
                    while self.locked.load(Ordering::Acquire) {
                        hint::spin_loop();
                    }
                }
            }
        }
    } else {
        impl<T> SpinLock<T> {
            /// Plain test-and-set. The polyfilled flag cannot be polled
            /// cheaper than it can be swapped, so there is nothing to gain
            /// from the load loop.
            fn acquire(&self) {
                while self.locked.swap(true, Ordering::Acquire) {
                    hint::spin_loop();
                }
            }
        }
    }
}

pub(crate) struct SpinGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Drop for SpinGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

impl<T> Deref for SpinGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // Safety: the guard exists, so the flag is held and no other
        // reference to the value can be live.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for SpinGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // Safety: same as `deref`.
        unsafe { &mut *self.lock.value.get() }
    }
}
