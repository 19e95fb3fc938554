// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// RAII guards for RwSemaphore: acquire on construction, release on drop.

use std::mem;

use crate::RwSemaphore;

/// A held read slot. Released on drop.
#[must_use = "the read slot is released as soon as the guard is dropped"]
pub struct ReadGuard<'a> {
    sem: &'a RwSemaphore,
}

impl<'a> ReadGuard<'a> {
    /// The caller must already hold a read slot on `sem`.
    pub(crate) fn new(sem: &'a RwSemaphore) -> Self {
        Self { sem }
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.sem.up_read();
    }
}

/// The held write lock. Released on drop.
#[must_use = "the write lock is released as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    sem: &'a RwSemaphore,
}

impl<'a> WriteGuard<'a> {
    /// The caller must already hold the write lock on `sem`.
    pub(crate) fn new(sem: &'a RwSemaphore) -> Self {
        Self { sem }
    }

    /// Convert into a read slot without releasing the semaphore in between.
    pub fn downgrade(self) -> ReadGuard<'a> {
        let sem = self.sem;
        mem::forget(self);
        sem.downgrade_write();
        ReadGuard::new(sem)
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.sem.up_write();
    }
}
