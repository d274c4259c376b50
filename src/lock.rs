use crate::error::BenchError;
use crate::shared_mutex::{ExclusiveGuard, SharedGuard, SharedMutex};
use bitflags::bitflags;
use core::fmt;
use core::str::FromStr;
use std::sync::PoisonError;

/// A lock with a shared and an exclusive acquisition mode.
///
/// Both modes are scoped: the lock is released when the returned
/// guard is dropped, including while unwinding. Locks without a
/// shared mode implement `lock_shared` with their exclusive lock.
pub trait ReadWriteLock: Sync {
    type SharedGuard<'a>
    where
        Self: 'a;
    type ExclusiveGuard<'a>
    where
        Self: 'a;

    fn lock_shared(&self) -> Self::SharedGuard<'_>;

    fn lock_exclusive(&self) -> Self::ExclusiveGuard<'_>;
}

impl ReadWriteLock for SharedMutex {
    type SharedGuard<'a> = SharedGuard<'a>;
    type ExclusiveGuard<'a> = ExclusiveGuard<'a>;

    #[inline(always)]
    fn lock_shared(&self) -> SharedGuard<'_> {
        SharedMutex::lock_shared(self)
    }
    #[inline(always)]
    fn lock_exclusive(&self) -> ExclusiveGuard<'_> {
        SharedMutex::lock_exclusive(self)
    }
}

impl ReadWriteLock for parking_lot::Mutex<()> {
    type SharedGuard<'a> = parking_lot::MutexGuard<'a, ()>;
    type ExclusiveGuard<'a> = parking_lot::MutexGuard<'a, ()>;

    #[inline(always)]
    fn lock_shared(&self) -> Self::SharedGuard<'_> {
        self.lock()
    }
    #[inline(always)]
    fn lock_exclusive(&self) -> Self::ExclusiveGuard<'_> {
        self.lock()
    }
}

impl ReadWriteLock for parking_lot::RwLock<()> {
    type SharedGuard<'a> = parking_lot::RwLockReadGuard<'a, ()>;
    type ExclusiveGuard<'a> = parking_lot::RwLockWriteGuard<'a, ()>;

    #[inline(always)]
    fn lock_shared(&self) -> Self::SharedGuard<'_> {
        self.read()
    }
    #[inline(always)]
    fn lock_exclusive(&self) -> Self::ExclusiveGuard<'_> {
        self.write()
    }
}

// The guarded value is `()`, so a poisoned mutex is still usable.
impl ReadWriteLock for std::sync::Mutex<()> {
    type SharedGuard<'a> = std::sync::MutexGuard<'a, ()>;
    type ExclusiveGuard<'a> = std::sync::MutexGuard<'a, ()>;

    #[inline(always)]
    fn lock_shared(&self) -> Self::SharedGuard<'_> {
        self.lock().unwrap_or_else(PoisonError::into_inner)
    }
    #[inline(always)]
    fn lock_exclusive(&self) -> Self::ExclusiveGuard<'_> {
        self.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The lock implementations the benchmark knows about.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LockKind {
    SharedMutex,
    ParkingLotMutex,
    StdMutex,
    ParkingLotRwLock,
}

impl LockKind {
    /// Every kind, in report order.
    pub const ALL: [LockKind; 4] = [
        LockKind::SharedMutex,
        LockKind::ParkingLotMutex,
        LockKind::StdMutex,
        LockKind::ParkingLotRwLock,
    ];

    /// Label printed in the report rows.
    pub fn label(self) -> &'static str {
        match self {
            LockKind::SharedMutex => "shared_mutex::SharedMutex",
            LockKind::ParkingLotMutex => "parking_lot::Mutex",
            LockKind::StdMutex => "std::sync::Mutex",
            LockKind::ParkingLotRwLock => "parking_lot::RwLock",
        }
    }

    /// Name accepted by `FromStr`.
    pub fn short_name(self) -> &'static str {
        match self {
            LockKind::SharedMutex => "shared",
            LockKind::ParkingLotMutex => "mutex",
            LockKind::StdMutex => "std",
            LockKind::ParkingLotRwLock => "rwlock",
        }
    }

    fn flag(self) -> LockSet {
        match self {
            LockKind::SharedMutex => LockSet::SHARED_MUTEX,
            LockKind::ParkingLotMutex => LockSet::PARKING_LOT_MUTEX,
            LockKind::StdMutex => LockSet::STD_MUTEX,
            LockKind::ParkingLotRwLock => LockSet::PARKING_LOT_RWLOCK,
        }
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LockKind {
    type Err = BenchError;
    fn from_str(s: &str) -> Result<Self, BenchError> {
        let s = s.trim();
        LockKind::ALL
            .iter()
            .copied()
            .find(|k| k.short_name() == s || k.label() == s)
            .ok_or_else(|| BenchError::Config {
                key: "lock".to_owned(),
                value: s.to_owned(),
            })
    }
}

bitflags! {
    /// A set of lock kinds to compare.
    pub struct LockSet: u8 {
        const SHARED_MUTEX       = 0b0001;
        const PARKING_LOT_MUTEX  = 0b0010;
        const STD_MUTEX          = 0b0100;
        const PARKING_LOT_RWLOCK = 0b1000;
    }
}

impl LockSet {
    /// Members of the set, in report order.
    pub fn kinds(self) -> impl Iterator<Item = LockKind> {
        LockKind::ALL
            .into_iter()
            .filter(move |k| self.contains(k.flag()))
    }
}

impl Default for LockSet {
    /// The sharded mutex and its baseline.
    fn default() -> Self {
        LockSet::SHARED_MUTEX | LockSet::STD_MUTEX
    }
}

impl From<LockKind> for LockSet {
    fn from(k: LockKind) -> Self {
        k.flag()
    }
}

impl FromIterator<LockKind> for LockSet {
    fn from_iter<I: IntoIterator<Item = LockKind>>(iter: I) -> Self {
        iter.into_iter()
            .fold(LockSet::empty(), |set, k| set | k.flag())
    }
}

#[cfg(test)]
mod test_lock {
    use super::{LockKind, LockSet, ReadWriteLock};
    use crate::shared_mutex::SharedMutex;

    #[test]
    fn kinds_in_report_order() {
        let set = LockSet::PARKING_LOT_RWLOCK | LockSet::SHARED_MUTEX;
        let kinds: Vec<_> = set.kinds().collect();
        assert_eq!(kinds, [LockKind::SharedMutex, LockKind::ParkingLotRwLock]);
        assert_eq!(LockSet::all().kinds().count(), 4);
        assert_eq!(LockSet::empty().kinds().count(), 0);
    }

    #[test]
    fn parse() {
        assert_eq!("shared".parse::<LockKind>().unwrap(), LockKind::SharedMutex);
        assert_eq!(
            " std::sync::Mutex".parse::<LockKind>().unwrap(),
            LockKind::StdMutex
        );
        assert!("spin".parse::<LockKind>().is_err());
        let set: LockSet = ["mutex", "rwlock"]
            .iter()
            .map(|s| s.parse::<LockKind>().unwrap())
            .collect();
        assert_eq!(set, LockSet::PARKING_LOT_MUTEX | LockSet::PARKING_LOT_RWLOCK);
    }

    fn shared_then_exclusive<L: ReadWriteLock>(l: &L) {
        {
            let _s = l.lock_shared();
        }
        let _x = l.lock_exclusive();
    }

    #[test]
    fn every_kind_locks_and_unlocks() {
        shared_then_exclusive(&SharedMutex::default());
        shared_then_exclusive(&parking_lot::Mutex::new(()));
        shared_then_exclusive(&parking_lot::RwLock::new(()));
        shared_then_exclusive(&std::sync::Mutex::new(()));
    }

    #[test]
    fn poisoned_std_mutex_still_locks() {
        let m = std::sync::Mutex::new(());
        let _ = std::panic::catch_unwind(|| {
            let _g = m.lock_exclusive();
            panic!("poison");
        });
        assert!(m.is_poisoned());
        let _g = m.lock_shared();
    }
}
