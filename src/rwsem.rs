// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Reader/writer semaphore: a biased lock word plus a FIFO wait list.
//
// Uncontended acquire and release are a single atomic on the lock word. When
// that fails, the slow paths queue the caller under the wait-list spin lock
// and block it until the wake engine hands it the lock (readers) or until it
// can claim the lock itself (writers). Consecutive readers at the head of the
// queue are granted as one batch; readers never pass a queued writer, but a
// context that has not queued yet may steal the lock from a woken writer.

use std::fmt;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

use log::{debug, trace};

use crate::bias::{
    active_count, is_idle, waiting_units, ACTIVE_MASK, ACTIVE_READ_BIAS, ACTIVE_WRITE_BIAS,
    UNLOCKED_VALUE, WAITING_BIAS,
};
use crate::guard::{ReadGuard, WriteGuard};
use crate::spin_lock::SpinLock;
use crate::task::Task;
use crate::wait_list::WaitList;
use crate::waiter::{Waiter, WaiterKind};

/// Who the wake engine is allowed to wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WakeType {
    /// A holder released: wake readers at the head, or the head writer.
    Any,
    /// A queued writer found the lock read-owned: wake head readers only.
    Readers,
    /// The caller already holds a read slot (downgrade): wake head readers
    /// without taking a provisional slot first.
    ReadOwned,
}

/// A reader/writer semaphore.
///
/// Any number of readers or a single writer may hold it. Contended acquires
/// block the calling thread; there is no timeout or cancellation.
pub struct RwSemaphore {
    count: AtomicIsize,
    wait_list: SpinLock<WaitList>,
}

impl RwSemaphore {
    /// Create a new unlocked semaphore. Usable in `static` items.
    pub const fn new() -> Self {
        Self {
            count: AtomicIsize::new(UNLOCKED_VALUE),
            wait_list: SpinLock::new(WaitList::new()),
        }
    }

    /// Reset to the unlocked state with an empty wait list.
    pub fn init(&mut self) {
        debug_assert!(
            self.wait_list.get_mut().is_empty(),
            "init on an rwsem with queued waiters"
        );
        *self.count.get_mut() = UNLOCKED_VALUE;
        *self.wait_list.get_mut() = WaitList::new();
    }

    // ---------------------------------------------------------------------
    // Fast paths
    // ---------------------------------------------------------------------

    /// Acquire a read slot, blocking while a writer holds or waits.
    pub fn down_read(&self) {
        let count = self.count.fetch_add(ACTIVE_READ_BIAS, Ordering::Acquire) + ACTIVE_READ_BIAS;
        if count <= 0 {
            self.down_read_slow();
        }
    }

    /// Acquire a read slot only if no writer holds or waits.
    pub fn down_read_trylock(&self) -> bool {
        let mut count = self.count.load(Ordering::Relaxed);
        while count >= 0 {
            match self.count.compare_exchange_weak(
                count,
                count + ACTIVE_READ_BIAS,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => count = actual,
            }
        }
        false
    }

    /// Acquire the write lock, blocking while anyone else holds it.
    pub fn down_write(&self) {
        let count =
            self.count.fetch_add(ACTIVE_WRITE_BIAS, Ordering::Acquire) + ACTIVE_WRITE_BIAS;
        if count != ACTIVE_WRITE_BIAS {
            self.down_write_slow();
        }
    }

    /// Acquire the write lock only if the semaphore is unlocked and uncontended.
    pub fn down_write_trylock(&self) -> bool {
        self.count
            .compare_exchange(
                UNLOCKED_VALUE,
                ACTIVE_WRITE_BIAS,
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    /// Release a read slot.
    pub fn up_read(&self) {
        let old = self.count.fetch_sub(ACTIVE_READ_BIAS, Ordering::Release);
        debug_assert!(active_count(old) != 0, "up_read on an rwsem with no active holders");
        let count = old - ACTIVE_READ_BIAS;
        if count < -1 && is_idle(count) {
            self.wake_on_release();
        }
    }

    /// Release the write lock.
    pub fn up_write(&self) {
        let old = self.count.fetch_sub(ACTIVE_WRITE_BIAS, Ordering::Release);
        debug_assert!(old < 0, "up_write on an rwsem that is not write-locked");
        if old - ACTIVE_WRITE_BIAS < 0 {
            self.wake_on_release();
        }
    }

    /// Turn the held write lock into a read slot with no release window, and
    /// let the readers queued at the head in with it.
    pub fn downgrade_write(&self) {
        let count = self.count.fetch_add(-WAITING_BIAS, Ordering::AcqRel) - WAITING_BIAS;
        if count < 0 {
            self.wake_on_downgrade();
        }
    }

    // ---------------------------------------------------------------------
    // Guards
    // ---------------------------------------------------------------------

    /// Acquire a read slot released when the guard drops.
    pub fn read(&self) -> ReadGuard<'_> {
        self.down_read();
        ReadGuard::new(self)
    }

    /// Acquire the write lock, released when the guard drops.
    pub fn write(&self) -> WriteGuard<'_> {
        self.down_write();
        WriteGuard::new(self)
    }

    /// Take a read slot without blocking; `None` while a writer holds or waits.
    pub fn try_read(&self) -> Option<ReadGuard<'_>> {
        self.down_read_trylock().then(|| ReadGuard::new(self))
    }

    /// Take the write lock without blocking; `None` if anyone holds or waits.
    pub fn try_write(&self) -> Option<WriteGuard<'_>> {
        self.down_write_trylock().then(|| WriteGuard::new(self))
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    /// Snapshot of the raw lock word.
    pub fn count(&self) -> isize {
        self.count.load(Ordering::Relaxed)
    }

    /// Whether anyone holds or waits for the semaphore.
    pub fn is_locked(&self) -> bool {
        self.count() != UNLOCKED_VALUE
    }

    /// Whether any context is queued.
    pub fn is_contended(&self) -> bool {
        !self.wait_list.lock().is_empty()
    }

    /// Number of queued contexts.
    pub fn queued(&self) -> usize {
        self.wait_list.lock().len()
    }

    // ---------------------------------------------------------------------
    // Slow paths
    // ---------------------------------------------------------------------

    /// Contended read acquire.
    ///
    /// The caller has already added `ACTIVE_READ_BIAS` to the lock word and
    /// seen it come out non-positive. Returns once this context holds a read
    /// slot.
    pub fn down_read_slow(&self) {
        let waiter = Waiter::new(WaiterKind::WaitingForRead);
        let mut adjustment = -ACTIVE_READ_BIAS;

        {
            let mut list = self.wait_list.lock();
            if list.is_empty() {
                adjustment += WAITING_BIAS;
            }
            list.push_back(Arc::clone(&waiter));

            // Queued now, no longer an active holder.
            let count = self.update(adjustment);
            trace!("rwsem {:p}: reader queued, count {:#x}", self, count);

            // Nobody is active: wake the head. Or only readers are active and
            // this waiter started the queue: join them.
            if count == WAITING_BIAS
                || (count > WAITING_BIAS && adjustment != -ACTIVE_READ_BIAS)
            {
                self.do_wake(&mut list, WakeType::Any);
            }
        }

        waiter.wait_granted();
    }

    /// Contended write acquire.
    ///
    /// The caller has already added `ACTIVE_WRITE_BIAS` to the lock word and
    /// seen another holder. Returns once this context holds the write lock.
    pub fn down_write_slow(&self) {
        let waiter = Waiter::new(WaiterKind::WaitingForWrite);
        let mut adjustment = -ACTIVE_WRITE_BIAS;

        let mut list = self.wait_list.lock();
        if list.is_empty() {
            adjustment += WAITING_BIAS;
        }
        let key = list.push_back(Arc::clone(&waiter));

        let mut count = self.update(adjustment);
        trace!("rwsem {:p}: writer queued, count {:#x}", self, count);

        // Others were queued already and no writer is active, so the lock is
        // read-owned: let any readers queued ahead of us join it.
        if count > WAITING_BIAS && adjustment == -ACTIVE_WRITE_BIAS {
            self.do_wake(&mut list, WakeType::Readers);
        }

        loop {
            if is_idle(count) {
                let claim = if list.is_singular() {
                    ACTIVE_WRITE_BIAS
                } else {
                    ACTIVE_WRITE_BIAS + WAITING_BIAS
                };
                if self.count.load(Ordering::Relaxed) == WAITING_BIAS
                    && self
                        .count
                        .compare_exchange(WAITING_BIAS, claim, Ordering::Acquire, Ordering::Relaxed)
                        .is_ok()
                {
                    break;
                }
                debug!("rwsem {:p}: writer lost the claim race", self);
            }

            drop(list);

            // Block until there are no active holders.
            loop {
                Task::block();
                count = self.count.load(Ordering::Acquire);
                if is_idle(count) {
                    break;
                }
            }

            list = self.wait_list.lock();
        }

        list.remove(key);
        trace!("rwsem {:p}: writer acquired", self);
    }

    /// Called by a releasing holder that saw queued contexts and no remaining
    /// active holders.
    pub fn wake_on_release(&self) {
        let mut list = self.wait_list.lock();
        if !list.is_empty() {
            self.do_wake(&mut list, WakeType::Any);
        }
    }

    /// Called after a write lock was converted into a read slot while
    /// contexts were queued.
    pub fn wake_on_downgrade(&self) {
        let mut list = self.wait_list.lock();
        if !list.is_empty() {
            self.do_wake(&mut list, WakeType::ReadOwned);
        }
    }

    // ---------------------------------------------------------------------
    // Wake engine
    // ---------------------------------------------------------------------

    /// Grant the lock to the readers at the head of `list`, or wake the head
    /// writer so it can try to claim the lock itself.
    ///
    /// The wait-list lock must be held and `list` must be non-empty.
    fn do_wake(&self, list: &mut WaitList, wake_type: WakeType) {
        let head = match list.front() {
            Some(head) => head,
            None => return,
        };

        if !head.is_reader() {
            // The writer is not granted the lock here, so fast-path acquirers
            // may still steal it. Queued readers stay behind it.
            if wake_type == WakeType::Any {
                trace!("rwsem {:p}: waking head writer", self);
                head.wake();
            }
            return;
        }

        // Take one read slot before counting readers so that a writer that
        // stole the lock is noticed early.
        let mut pre_bias = 0;
        if wake_type != WakeType::ReadOwned {
            pre_bias = ACTIVE_READ_BIAS;
            loop {
                let old = self.update(pre_bias) - pre_bias;
                if old >= WAITING_BIAS {
                    break;
                }
                // A writer stole the lock; undo our grant.
                if self.update(-pre_bias) & ACTIVE_MASK != 0 {
                    return;
                }
                // The last active holder left meanwhile; try again.
            }
        }

        let (woken, reached_end) = list.leading_readers();
        let mut adjustment = woken as isize * ACTIVE_READ_BIAS - pre_bias;
        if reached_end {
            adjustment -= WAITING_BIAS;
        }
        if adjustment != 0 {
            self.count.fetch_add(adjustment, Ordering::AcqRel);
        }

        for _ in 0..woken {
            if let Some(waiter) = list.pop_front() {
                waiter.grant();
            }
        }
        trace!("rwsem {:p}: granted {} reader(s)", self, woken);
    }

    /// Add `delta` to the lock word, returning the new value.
    #[inline]
    fn update(&self, delta: isize) -> isize {
        self.count.fetch_add(delta, Ordering::AcqRel) + delta
    }
}

impl Default for RwSemaphore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RwSemaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.count();
        f.debug_struct("RwSemaphore")
            .field("count", &format_args!("{:#x}", count))
            .field("active", &active_count(count))
            .field("waiting_units", &waiting_units(count))
            .finish()
    }
}
