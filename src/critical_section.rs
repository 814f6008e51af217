//! Process-wide re-entrant critical section
//!
//! The registry map and every event-loop pump are serialized by one lock.
//! A pump delivers backend callbacks synchronously, and those callbacks are
//! allowed to acquire or release displays, so the owning thread must be able
//! to take the lock again without deadlocking.
//!
//! The protected value sits in a `RefCell`: the lock hands out shared
//! references only, and nested holders on the same thread borrow the value
//! one at a time. Keep `borrow_mut()` scopes short and never call out to
//! user code while a borrow is live.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::RefCell;

/// Re-entrant mutual exclusion around a value of type `T`
pub struct CriticalSection<T> {
    lock: ReentrantMutex<RefCell<T>>,
}

/// Guard returned by [`CriticalSection::lock`]
pub type SectionGuard<'a, T> = ReentrantMutexGuard<'a, RefCell<T>>;

impl<T> CriticalSection<T> {
    pub fn new(value: T) -> Self {
        Self {
            lock: ReentrantMutex::new(RefCell::new(value)),
        }
    }

    /// Enter the section. Entering again from the thread that already holds
    /// it succeeds immediately.
    pub fn lock(&self) -> SectionGuard<'_, T> {
        self.lock.lock()
    }

    /// Whether the calling thread currently holds the section
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.lock.is_owned_by_current_thread()
    }
}

impl<T: Default> Default for CriticalSection<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
