use crate::error::{BenchError, Result};
use core::sync::atomic::{AtomicU64, Ordering};

/// Two counters that must always be seen equal by a reader.
///
/// [Oracle::write] must only be called while holding an exclusive
/// lock and [Oracle::check] while holding at least a shared lock on
/// the same lock. All the ordering comes from that lock: the counters
/// are accessed with relaxed loads and stores, and a write is a load
/// then a store, not a read-modify-write, so a lock that lets two
/// writers in loses increments and a lock that lets a reader in during
/// a write exposes a torn pair.
#[derive(Debug, Default)]
pub struct Oracle {
    a: AtomicU64,
    b: AtomicU64,
}

impl Oracle {
    pub const fn new() -> Self {
        Self {
            a: AtomicU64::new(0),
            b: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    pub fn write(&self) {
        let a = self.a.load(Ordering::Relaxed);
        self.a.store(a + 1, Ordering::Relaxed);
        let b = self.b.load(Ordering::Relaxed);
        self.b.store(b + 1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn check(&self) -> Result<()> {
        let a = self.a.load(Ordering::Relaxed);
        let b = self.b.load(Ordering::Relaxed);
        if a == b {
            Ok(())
        } else {
            Err(BenchError::OracleViolation { a, b })
        }
    }

    /// Current values of both counters.
    pub fn counts(&self) -> (u64, u64) {
        (self.a.load(Ordering::Acquire), self.b.load(Ordering::Acquire))
    }
}
