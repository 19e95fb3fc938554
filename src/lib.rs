// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Reader/writer semaphore with a single biased lock word, a FIFO wait list,
// batched reader wakeups, writer lock stealing and write-to-read downgrade.

pub mod bias;

mod spin_lock;
mod task;
mod wait_list;
mod waiter;

mod rwsem;
pub use rwsem::RwSemaphore;

mod guard;
pub use guard::{ReadGuard, WriteGuard};

mod rw_sem;
pub use rw_sem::{RwSem, RwSemReadGuard, RwSemWriteGuard};
