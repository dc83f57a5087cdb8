use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub trait PoisonedLockExt<T> {
    /// Lock, recovering the guard if a previous holder panicked.
    ///
    /// Critical sections in this crate finish every state change before
    /// anything that can panic, so poisoned data is still consistent.
    fn ensure_lock(&self) -> MutexGuard<'_, T>;
}

impl<T> PoisonedLockExt<T> for Mutex<T> {
    fn ensure_lock(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Two guards taken in key order, addressable in the caller's argument order.
pub struct LockedPair<'a, T> {
    // Fields drop in declaration order, so the later guard is released first.
    later: MutexGuard<'a, T>,
    earlier: MutexGuard<'a, T>,
    swapped: bool,
}

impl<T> LockedPair<'_, T> {
    /// Mutable views of `(a, b)` as they were passed to [`lock_pair`].
    pub fn both(&mut self) -> (&mut T, &mut T) {
        if self.swapped {
            (&mut *self.later, &mut *self.earlier)
        } else {
            (&mut *self.earlier, &mut *self.later)
        }
    }

    pub fn first(&mut self) -> &mut T {
        self.both().0
    }

    pub fn second(&mut self) -> &mut T {
        self.both().1
    }
}

/// Locks two mutexes, always acquiring the one with the smaller key first.
///
/// Every caller that goes through this function takes any given pair of
/// locks in the same global order, whatever the direction of the operation,
/// so no wait cycle can form between them.
///
/// Returns `None` when the keys are equal: both sides name the same resource
/// and locking it twice would block forever.
pub fn lock_pair<'a, T, K: Ord>(
    a: (&'a Mutex<T>, K),
    b: (&'a Mutex<T>, K),
) -> Option<LockedPair<'a, T>> {
    let swapped = match a.1.cmp(&b.1) {
        Ordering::Less => false,
        Ordering::Greater => true,
        Ordering::Equal => return None,
    };
    let (earlier, later) = if swapped { (b.0, a.0) } else { (a.0, b.0) };
    let earlier = earlier.ensure_lock();
    let later = later.ensure_lock();
    Some(LockedPair {
        later,
        earlier,
        swapped,
    })
}
