// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// RwSem<T>: an RwSemaphore that owns the data it protects.

use std::cell::UnsafeCell;
use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};

use crate::RwSemaphore;

/// Data protected by a reader/writer semaphore.
///
/// Shared references come from [`RwSem::read`], the exclusive one from
/// [`RwSem::write`]. A write guard may be downgraded to a read guard while
/// readers queued behind it are let in.
pub struct RwSem<T: ?Sized> {
    sem: RwSemaphore,
    data: UnsafeCell<T>,
}

// Safety: same bounds as `std::sync::RwLock`. Readers share `&T` across
// threads, so `Sync` also needs `T: Sync`.
unsafe impl<T: ?Sized + Send> Send for RwSem<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for RwSem<T> {}

impl<T> RwSem<T> {
    pub const fn new(data: T) -> Self {
        Self {
            sem: RwSemaphore::new(),
            data: UnsafeCell::new(data),
        }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> RwSem<T> {
    pub fn read(&self) -> RwSemReadGuard<'_, T> {
        self.sem.down_read();
        RwSemReadGuard { lock: self }
    }

    pub fn write(&self) -> RwSemWriteGuard<'_, T> {
        self.sem.down_write();
        RwSemWriteGuard { lock: self }
    }

    pub fn try_read(&self) -> Option<RwSemReadGuard<'_, T>> {
        self.sem
            .down_read_trylock()
            .then(|| RwSemReadGuard { lock: self })
    }

    pub fn try_write(&self) -> Option<RwSemWriteGuard<'_, T>> {
        self.sem
            .down_write_trylock()
            .then(|| RwSemWriteGuard { lock: self })
    }

    /// Mutable access without locking; exclusivity is proven by `&mut self`.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// The underlying semaphore, for introspection.
    pub fn semaphore(&self) -> &RwSemaphore {
        &self.sem
    }
}

impl<T: Default> Default for RwSem<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for RwSem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("RwSem");
        match self.try_read() {
            Some(guard) => d.field("data", &&*guard),
            None => d.field("data", &format_args!("<locked>")),
        };
        d.finish()
    }
}

/// Shared access to the data of an [`RwSem`].
#[must_use = "the read slot is released as soon as the guard is dropped"]
pub struct RwSemReadGuard<'a, T: ?Sized> {
    lock: &'a RwSem<T>,
}

impl<T: ?Sized> Deref for RwSemReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: a read slot is held, so no `&mut T` exists.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for RwSemReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.sem.up_read();
    }
}

/// Exclusive access to the data of an [`RwSem`].
#[must_use = "the write lock is released as soon as the guard is dropped"]
pub struct RwSemWriteGuard<'a, T: ?Sized> {
    lock: &'a RwSem<T>,
}

impl<'a, T: ?Sized> RwSemWriteGuard<'a, T> {
    /// Keep shared access while letting queued readers in.
    pub fn downgrade(self) -> RwSemReadGuard<'a, T> {
        let lock = self.lock;
        mem::forget(self);
        lock.sem.downgrade_write();
        RwSemReadGuard { lock }
    }
}

impl<T: ?Sized> Deref for RwSemWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the write lock is held.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for RwSemWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: the write lock is held and `&mut self` is unique.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for RwSemWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.sem.up_write();
    }
}
