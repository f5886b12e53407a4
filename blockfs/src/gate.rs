//! Reader/writer gate over the whole engine state.
//!
//! Any number of readers may hold the gate at once; a writer holds it alone.
//! Acquisition blocks without a timeout. Releasing is dropping the guard, so every
//! exit path of a caller, including an early `?` return, releases exactly once.
//!
//! The lock is task-fair: once a writer is queued, later readers wait behind it, so
//! a steady stream of readers cannot starve a writer.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type ReadGuard<'a, T> = RwLockReadGuard<'a, T>;
pub type WriteGuard<'a, T> = RwLockWriteGuard<'a, T>;

pub struct Gate<T> {
    lock: RwLock<T>,
}

impl<T> Gate<T> {
    pub fn new(state: T) -> Self {
        Self {
            lock: RwLock::new(state),
        }
    }

    /// Blocks until no writer holds the gate.
    pub fn read(&self) -> ReadGuard<'_, T> {
        self.lock.read()
    }

    /// Blocks until neither readers nor a writer hold the gate.
    pub fn write(&self) -> WriteGuard<'_, T> {
        self.lock.write()
    }

    #[cfg(test)]
    pub fn try_write(&self) -> Option<WriteGuard<'_, T>> {
        self.lock.try_write()
    }

    pub fn into_inner(self) -> T {
        self.lock.into_inner()
    }
}
