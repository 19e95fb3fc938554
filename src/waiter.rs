// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Waiter record queued on an rwsem wait list.
// Shared between the blocked context and the wait list through an `Arc`, so
// the wake engine may still touch it after the owner has observed its grant.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::task::Task;

/// What a queued context is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaiterKind {
    WaitingForRead,
    WaitingForWrite,
}

/// One blocked context on the wait list.
#[derive(Debug)]
pub(crate) struct Waiter {
    kind: WaiterKind,
    task: Task,
    granted: AtomicBool,
}

impl Waiter {
    /// Create a record for the calling context.
    pub(crate) fn new(kind: WaiterKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            task: Task::current(),
            granted: AtomicBool::new(false),
        })
    }

    pub(crate) fn kind(&self) -> WaiterKind {
        self.kind
    }

    pub(crate) fn is_reader(&self) -> bool {
        self.kind() == WaiterKind::WaitingForRead
    }

    /// Hand the lock to this waiter and wake it. The lock word must already
    /// account for it.
    pub(crate) fn grant(&self) {
        self.granted.store(true, Ordering::Release);
        self.task.wake();
    }

    /// Wake the owner without granting anything; it re-checks the lock word.
    pub(crate) fn wake(&self) {
        self.task.wake();
    }

    /// Block the calling context until `grant` has been called.
    pub(crate) fn wait_granted(&self) {
        while !self.granted.load(Ordering::Acquire) {
            Task::block();
        }
    }

    #[cfg(test)]
    pub(crate) fn is_granted(&self) -> bool {
        self.granted.load(Ordering::Acquire)
    }
}
