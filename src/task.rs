// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Execution-context hooks consumed by the slow paths.
// A context is an OS thread; blocking is `thread::park`, waking is
// `Thread::unpark`. Parking may return spuriously, so callers loop.

use std::thread::{self, Thread};

/// Handle to a (possibly blocked) execution context.
#[derive(Debug, Clone)]
pub(crate) struct Task {
    thread: Thread,
}

impl Task {
    /// Handle to the calling context.
    pub(crate) fn current() -> Self {
        Self {
            thread: thread::current(),
        }
    }

    /// Make `self` runnable. A wake that arrives before the context blocks
    /// is remembered, so it is never lost.
    pub(crate) fn wake(&self) {
        self.thread.unpark();
    }

    /// Suspend the calling context until woken (or spuriously).
    pub(crate) fn block() {
        thread::park();
    }
}
