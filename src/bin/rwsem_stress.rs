// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Randomized multi-thread stress run for RwSemaphore.
//
// Run with:
//   cargo run --release --bin rwsem_stress -- --readers 8 --writers 4 --iters 20000
//
// Every thread picks read / write / write-then-downgrade at random and checks
// mutual exclusion from inside its critical section. Exits non-zero on a
// violation or if the lock word does not return to the unlocked value.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rwsem::bias::UNLOCKED_VALUE;
use rwsem::RwSemaphore;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StressConfig {
    readers: usize,
    writers: usize,
    iters: usize,
    downgrade_pct: u32,
    seed: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            readers: 4,
            writers: 2,
            iters: 10_000,
            downgrade_pct: 20,
            seed: 42,
        }
    }
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> io::Result<T> {
    let value = value.ok_or_else(|| invalid(format!("{flag} needs a value")))?;
    value
        .parse()
        .map_err(|_| invalid(format!("bad value for {flag}: {value}")))
}

impl StressConfig {
    fn from_args<I: Iterator<Item = String>>(mut args: I) -> io::Result<Self> {
        let mut cfg = Self::default();
        while let Some(flag) = args.next() {
            match flag.as_str() {
                "--readers" => cfg.readers = parse_value(&flag, args.next())?,
                "--writers" => cfg.writers = parse_value(&flag, args.next())?,
                "--iters" => cfg.iters = parse_value(&flag, args.next())?,
                "--downgrade-pct" => cfg.downgrade_pct = parse_value(&flag, args.next())?,
                "--seed" => cfg.seed = parse_value(&flag, args.next())?,
                other => return Err(invalid(format!("unknown flag: {other}"))),
            }
        }
        if cfg.downgrade_pct > 100 {
            return Err(invalid("--downgrade-pct must be 0..=100".into()));
        }
        if cfg.readers + cfg.writers == 0 {
            return Err(invalid("need at least one thread".into()));
        }
        Ok(cfg)
    }
}

// ---------------------------------------------------------------------------
// Shared state observed from inside critical sections
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Monitor {
    readers_in: AtomicIsize,
    writers_in: AtomicIsize,
    violation: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
    downgrades: AtomicUsize,
}

impl Monitor {
    fn enter_read(&self) {
        self.readers_in.fetch_add(1, Ordering::SeqCst);
        if self.writers_in.load(Ordering::SeqCst) != 0 {
            self.violation.store(true, Ordering::SeqCst);
        }
    }

    fn leave_read(&self) {
        self.readers_in.fetch_sub(1, Ordering::SeqCst);
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    fn enter_write(&self) {
        if self.writers_in.fetch_add(1, Ordering::SeqCst) != 0
            || self.readers_in.load(Ordering::SeqCst) != 0
        {
            self.violation.store(true, Ordering::SeqCst);
        }
    }

    fn leave_write(&self) {
        self.writers_in.fetch_sub(1, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

fn worker(sem: &RwSemaphore, mon: &Monitor, cfg: &StressConfig, id: u64, writer: bool) {
    let mut rng = SmallRng::seed_from_u64(cfg.seed.wrapping_add(id));
    for _ in 0..cfg.iters {
        let write = writer && rng.gen_bool(0.5);
        if !write {
            sem.down_read();
            mon.enter_read();
            spin(&mut rng);
            mon.leave_read();
            sem.up_read();
        } else if rng.gen_range(0..100) < cfg.downgrade_pct {
            sem.down_write();
            mon.enter_write();
            spin(&mut rng);
            // Become a reader while still excluding writers.
            mon.readers_in.fetch_add(1, Ordering::SeqCst);
            mon.leave_write();
            sem.downgrade_write();
            spin(&mut rng);
            mon.leave_read();
            mon.downgrades.fetch_add(1, Ordering::Relaxed);
            sem.up_read();
        } else {
            sem.down_write();
            mon.enter_write();
            spin(&mut rng);
            mon.leave_write();
            sem.up_write();
        }
        if rng.gen_bool(0.1) {
            thread::yield_now();
        }
    }
}

fn spin(rng: &mut SmallRng) {
    for _ in 0..rng.gen_range(0..64) {
        std::hint::spin_loop();
    }
}

fn main() -> io::Result<()> {
    if std::env::var_os("RUST_LOG").is_some() {
        env_logger::init();
    }
    let cfg = StressConfig::from_args(std::env::args().skip(1))?;
    println!("rwsem_stress: {cfg:?}");

    let sem = Arc::new(RwSemaphore::new());
    let mon = Arc::new(Monitor::default());
    let cfg = Arc::new(cfg);
    let n = cfg.readers + cfg.writers;
    let start = Arc::new(Barrier::new(n));

    let t0 = Instant::now();
    let threads: Vec<_> = (0..n)
        .map(|i| {
            let sem = Arc::clone(&sem);
            let mon = Arc::clone(&mon);
            let cfg = Arc::clone(&cfg);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                worker(&sem, &mon, &cfg, i as u64, i >= cfg.readers);
            })
        })
        .collect();

    for t in threads {
        t.join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "worker panicked"))?;
    }
    let elapsed = t0.elapsed();

    println!(
        "reads: {}  writes: {}  downgrades: {}  in {:.1} ms",
        mon.reads.load(Ordering::Relaxed),
        mon.writes.load(Ordering::Relaxed),
        mon.downgrades.load(Ordering::Relaxed),
        elapsed.as_secs_f64() * 1000.0
    );

    if mon.violation.load(Ordering::SeqCst) {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            "mutual exclusion violated",
        ));
    }
    if sem.count() != UNLOCKED_VALUE {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("lock word drifted: {:#x}", sem.count()),
        ));
    }
    println!("ok");
    Ok(())
}
