//! This crate provides a sharded reader/writer mutex, [SharedMutex], and the
//! harness used to compare it with other locks under contention.
//!
//! A shared lock on a [SharedMutex] only takes the shard assigned to the
//! calling thread, while an exclusive lock takes all shards. Readers running
//! on different threads thus mostly work on different cache lines, at the
//! price of more expensive writers.
//!
//! The harness runs a fixed workload: `threads` threads, each looping
//! `iterations` times. The first `writers` threads perform a write, under the
//! exclusive lock, once every `write_frequency` iterations. Every other
//! iteration is a read under the shared lock. Writes increment two counters
//! that reads check for equality (see [Oracle]), so a lock that does not
//! exclude readers from writers is caught while it is being measured.
//!
//! Real, user and system times of every run are measured by a [ProcTimer],
//! which accounts for all the threads of the process:
//!
//! ```no_run
//! use shared_mutex::{workload, Oracle, SharedMutex, Workload};
//!
//! let lock = SharedMutex::default();
//! let oracle = Oracle::new();
//! let report = workload::run(
//!     "shared_mutex::SharedMutex",
//!     || {
//!         let _g = lock.lock_exclusive();
//!         oracle.write();
//!         Ok(())
//!     },
//!     || {
//!         let _g = lock.lock_shared();
//!         oracle.check()
//!     },
//!     &Workload { threads: 4, iterations: 1 << 20, write_frequency: 16, writers: 4 },
//! )?
//! .into_result()?;
//! println!("{}", report);
//! # Ok::<(), shared_mutex::BenchError>(())
//! ```
//!
//! [Sweep] repeats such runs for a list of write frequencies and a set of
//! locks, as configured by a [Config].

mod futex;

mod spin_wait;

pub mod clocks;
pub use clocks::{Clocks, ProcTimer};

pub mod error;
pub use error::{BenchError, Result};

pub mod lock;
pub use lock::{LockKind, LockSet, ReadWriteLock};

pub mod oracle;
pub use oracle::Oracle;

pub mod shared_mutex;
pub use shared_mutex::{ExclusiveGuard, SharedGuard, SharedMutex};

pub mod sweep;
pub use sweep::{Config, Sweep};

pub mod workload;
pub use workload::{Report, Workload};
