// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Contention scenarios for RwSemaphore: queue a known set of readers and
// writers behind a holder, release, and check the lock word and wait list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rwsem::bias::{ACTIVE_READ_BIAS, ACTIVE_WRITE_BIAS, UNLOCKED_VALUE, WAITING_BIAS};
use rwsem::RwSemaphore;

fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

/// A thread that takes the semaphore, reports that it got in, and holds it
/// until told to release.
struct Holder {
    acquired: mpsc::Receiver<()>,
    release: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

impl Holder {
    fn reader(sem: &Arc<RwSemaphore>) -> Self {
        Self::spawn(sem, false)
    }

    fn writer(sem: &Arc<RwSemaphore>) -> Self {
        Self::spawn(sem, true)
    }

    fn spawn(sem: &Arc<RwSemaphore>, write: bool) -> Self {
        let (acq_tx, acquired) = mpsc::channel();
        let (release, rel_rx) = mpsc::channel::<()>();
        let sem = Arc::clone(sem);
        let handle = thread::spawn(move || {
            if write {
                sem.down_write();
            } else {
                sem.down_read();
            }
            acq_tx.send(()).unwrap();
            rel_rx.recv().unwrap();
            if write {
                sem.up_write();
            } else {
                sem.up_read();
            }
        });
        Self {
            acquired,
            release,
            handle,
        }
    }

    fn wait_acquired(&self) {
        self.acquired
            .recv_timeout(Duration::from_secs(10))
            .expect("holder never acquired the semaphore");
    }

    fn has_acquired(&self) -> bool {
        self.acquired.try_recv().is_ok()
    }

    fn finish(self) {
        self.release.send(()).unwrap();
        self.handle.join().unwrap();
    }
}

// S1: uncontended writer.
#[test]
fn single_writer_round_trip() {
    let sem = RwSemaphore::new();
    sem.down_write();
    assert_eq!(sem.count(), ACTIVE_WRITE_BIAS);
    sem.up_write();
    assert_eq!(sem.count(), UNLOCKED_VALUE);
    assert!(!sem.is_contended());
}

// S2: one reader queued behind a writer.
#[test]
fn reader_woken_by_writer_release() {
    let sem = Arc::new(RwSemaphore::new());
    sem.down_write();

    let r1 = Holder::reader(&sem);
    wait_until("reader to queue", || sem.queued() == 1);
    assert_eq!(sem.count(), ACTIVE_WRITE_BIAS + WAITING_BIAS);

    sem.up_write();
    r1.wait_acquired();
    assert_eq!(sem.count(), ACTIVE_READ_BIAS);
    assert!(!sem.is_contended());

    r1.finish();
    assert_eq!(sem.count(), UNLOCKED_VALUE);
}

// S3: consecutive readers are granted together.
#[test]
fn queued_readers_granted_as_batch() {
    let sem = Arc::new(RwSemaphore::new());
    sem.down_write();

    let readers: Vec<_> = (1..=3)
        .map(|n| {
            let r = Holder::reader(&sem);
            wait_until("reader to queue", || sem.queued() == n);
            r
        })
        .collect();

    sem.up_write();
    for r in &readers {
        r.wait_acquired();
    }
    assert_eq!(sem.count(), 3 * ACTIVE_READ_BIAS);
    assert_eq!(sem.queued(), 0);

    for r in readers {
        r.finish();
    }
    assert_eq!(sem.count(), UNLOCKED_VALUE);
}

// S4: the reader batch stops at a queued writer.
#[test]
fn reader_batch_stops_at_writer() {
    let sem = Arc::new(RwSemaphore::new());
    sem.down_write();

    let r1 = Holder::reader(&sem);
    wait_until("reader to queue", || sem.queued() == 1);
    let w2 = Holder::writer(&sem);
    wait_until("writer to queue", || sem.queued() == 2);

    sem.up_write();
    r1.wait_acquired();
    assert_eq!(sem.count(), WAITING_BIAS + ACTIVE_READ_BIAS);
    assert_eq!(sem.queued(), 1);
    assert!(!w2.has_acquired());

    r1.finish();
    w2.wait_acquired();
    assert_eq!(sem.count(), ACTIVE_WRITE_BIAS);
    assert_eq!(sem.queued(), 0);

    w2.finish();
    assert_eq!(sem.count(), UNLOCKED_VALUE);
}

// S5: a queued writer is woken and claims the lock itself.
#[test]
fn writer_claims_after_wake() {
    let sem = Arc::new(RwSemaphore::new());
    sem.down_write();

    let w1 = Holder::writer(&sem);
    wait_until("writer to queue", || sem.queued() == 1);
    assert_eq!(sem.count(), ACTIVE_WRITE_BIAS + WAITING_BIAS);

    sem.up_write();
    w1.wait_acquired();
    assert_eq!(sem.count(), ACTIVE_WRITE_BIAS);
    assert!(!sem.is_contended());

    w1.finish();
    assert_eq!(sem.count(), UNLOCKED_VALUE);
}

// S6: downgrade lets the head reader in but not the writer behind it.
#[test]
fn downgrade_wakes_head_readers_only() {
    let sem = Arc::new(RwSemaphore::new());
    sem.down_write();

    let r1 = Holder::reader(&sem);
    wait_until("reader to queue", || sem.queued() == 1);
    let w2 = Holder::writer(&sem);
    wait_until("writer to queue", || sem.queued() == 2);

    sem.downgrade_write();
    r1.wait_acquired();
    assert_eq!(sem.count(), WAITING_BIAS + 2 * ACTIVE_READ_BIAS);
    assert_eq!(sem.queued(), 1);
    assert!(!w2.has_acquired());

    sem.up_read();
    assert!(!w2.has_acquired());
    r1.finish();
    w2.wait_acquired();
    assert_eq!(sem.count(), ACTIVE_WRITE_BIAS);

    w2.finish();
    assert_eq!(sem.count(), UNLOCKED_VALUE);
}

#[test]
fn downgrade_without_waiters() {
    let sem = RwSemaphore::new();
    sem.down_write();
    sem.downgrade_write();
    assert_eq!(sem.count(), ACTIVE_READ_BIAS);
    assert!(sem.down_read_trylock());
    assert!(!sem.down_write_trylock());
    sem.up_read();
    sem.up_read();
    assert_eq!(sem.count(), UNLOCKED_VALUE);
}

// A reader that queues behind a writer never gets in ahead of it.
#[test]
fn queued_writer_not_overtaken_by_later_reader() {
    let sem = Arc::new(RwSemaphore::new());
    let order = Arc::new(Mutex::new(Vec::new()));
    sem.down_read();

    let w = {
        let sem = Arc::clone(&sem);
        let order = Arc::clone(&order);
        thread::spawn(move || {
            sem.down_write();
            order.lock().unwrap().push("writer");
            thread::sleep(Duration::from_millis(20));
            sem.up_write();
        })
    };
    wait_until("writer to queue", || sem.queued() == 1);

    let r = {
        let sem = Arc::clone(&sem);
        let order = Arc::clone(&order);
        thread::spawn(move || {
            sem.down_read();
            order.lock().unwrap().push("reader");
            sem.up_read();
        })
    };
    wait_until("reader to queue", || sem.queued() == 2);

    // New readers cannot take the fast path past a queued writer either.
    assert!(!sem.down_read_trylock());

    sem.up_read();
    w.join().unwrap();
    r.join().unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["writer", "reader"]);
    assert_eq!(sem.count(), UNLOCKED_VALUE);
}

// A reader arriving while only readers hold the lock joins them directly.
#[test]
fn readers_share_without_queueing() {
    let sem = Arc::new(RwSemaphore::new());
    let r1 = Holder::reader(&sem);
    r1.wait_acquired();
    let r2 = Holder::reader(&sem);
    r2.wait_acquired();
    assert_eq!(sem.count(), 2 * ACTIVE_READ_BIAS);
    assert!(!sem.is_contended());
    r1.finish();
    r2.finish();
    assert_eq!(sem.count(), UNLOCKED_VALUE);
}

// Writers queued behind readers run one at a time, then the readers after
// them are released together.
#[test]
fn mixed_queue_drains_in_order() {
    let sem = Arc::new(RwSemaphore::new());
    let in_write = Arc::new(AtomicBool::new(false));
    let violation = Arc::new(AtomicBool::new(false));
    sem.down_write();

    let mut handles = Vec::new();
    for n in 0..6 {
        let write = n % 2 == 0;
        let sem2 = Arc::clone(&sem);
        let iw = Arc::clone(&in_write);
        let viol = Arc::clone(&violation);
        handles.push(thread::spawn(move || {
            if write {
                sem2.down_write();
                if iw.swap(true, Ordering::SeqCst) {
                    viol.store(true, Ordering::SeqCst);
                }
                thread::sleep(Duration::from_millis(2));
                iw.store(false, Ordering::SeqCst);
                sem2.up_write();
            } else {
                sem2.down_read();
                if iw.load(Ordering::SeqCst) {
                    viol.store(true, Ordering::SeqCst);
                }
                thread::sleep(Duration::from_millis(2));
                sem2.up_read();
            }
        }));
        wait_until("waiter to queue", || sem.queued() == n + 1);
    }

    sem.up_write();
    for h in handles {
        h.join().unwrap();
    }

    assert!(!violation.load(Ordering::SeqCst));
    assert_eq!(sem.count(), UNLOCKED_VALUE);
    assert!(!sem.is_contended());
}

#[test]
fn guards_release_on_drop() {
    let sem = RwSemaphore::new();
    {
        let _r1 = sem.read();
        let _r2 = sem.try_read().expect("second reader");
        assert!(sem.try_write().is_none());
        assert_eq!(sem.count(), 2 * ACTIVE_READ_BIAS);
    }
    {
        let w = sem.write();
        assert!(sem.try_read().is_none());
        let _r = w.downgrade();
        assert_eq!(sem.count(), ACTIVE_READ_BIAS);
    }
    assert_eq!(sem.count(), UNLOCKED_VALUE);
    assert!(!sem.is_locked());
}

#[test]
fn init_after_use() {
    let mut sem = RwSemaphore::new();
    sem.down_write();
    sem.up_write();
    sem.init();
    assert_eq!(sem.count(), UNLOCKED_VALUE);
    assert!(sem.down_write_trylock());
    sem.up_write();
}

#[test]
fn debug_shows_lock_word() {
    let sem = RwSemaphore::new();
    sem.down_read();
    let s = format!("{sem:?}");
    assert!(s.contains("RwSemaphore"));
    assert!(s.contains("active: 1"));
    sem.up_read();
}
