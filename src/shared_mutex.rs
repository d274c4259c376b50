use crate::error::{BenchError, Result};
use crate::futex::Futex;
use crate::spin_wait::SpinWait;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};
use crossbeam::utils::CachePadded;

/// Number of shards of a default constructed [SharedMutex].
pub const DEFAULT_SHARDS: usize = 4;

// STATES:
// low 30 bits: number of readers, all ones => write locked
// READERS_WAITING => at least one reader is parked on the state futex
// WRITERS_WAITING => at least one writer is parked on writer_notify
const READ_LOCKED: u32 = 1;
const MASK: u32 = (1 << 30) - 1;
const WRITE_LOCKED: u32 = MASK;
const MAX_READERS: u32 = MASK - 1;
const READERS_WAITING: u32 = 1 << 30;
const WRITERS_WAITING: u32 = 1 << 31;

#[inline(always)]
fn is_unlocked(v: u32) -> bool {
    v & MASK == 0
}
#[inline(always)]
fn is_write_locked(v: u32) -> bool {
    v & MASK == WRITE_LOCKED
}
#[inline(always)]
fn has_readers_waiting(v: u32) -> bool {
    v & READERS_WAITING != 0
}
#[inline(always)]
fn has_writers_waiting(v: u32) -> bool {
    v & WRITERS_WAITING != 0
}
#[inline(always)]
fn has_reached_max_readers(v: u32) -> bool {
    v & MASK == MAX_READERS
}
#[inline(always)]
fn is_read_lockable(v: u32) -> bool {
    // parked threads have priority over new readers
    v & MASK < MAX_READERS && !has_readers_waiting(v) && !has_writers_waiting(v)
}

/// One reader/writer lock of a [SharedMutex].
pub(crate) struct ShardLock {
    state: Futex,
    writer_notify: Futex,
}

// ShardLock
// ---------
//
impl ShardLock {
    pub(crate) const fn new() -> Self {
        Self {
            state: Futex::new(0),
            writer_notify: Futex::new(0),
        }
    }

    #[inline(always)]
    pub(crate) fn try_read(&self) -> bool {
        let mut cur = self.state.load(Ordering::Relaxed);
        while is_read_lockable(cur) {
            match self.state.compare_exchange_weak(
                cur,
                cur + READ_LOCKED,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(x) => cur = x,
            }
        }
        false
    }

    #[inline(always)]
    pub(crate) fn read(&self) {
        let cur = self.state.load(Ordering::Relaxed);
        if !is_read_lockable(cur)
            || self
                .state
                .compare_exchange_weak(cur, cur + READ_LOCKED, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
        {
            self.read_slow();
        }
    }

    #[cold]
    fn read_slow(&self) {
        let mut cur = self.spin_read();
        loop {
            if is_read_lockable(cur) {
                match self.state.compare_exchange_weak(
                    cur,
                    cur + READ_LOCKED,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return,
                    Err(x) => {
                        cur = x;
                        continue;
                    }
                }
            }
            assert!(!has_reached_max_readers(cur), "too many readers");

            if !has_readers_waiting(cur) {
                if let Err(x) = self.state.compare_exchange(
                    cur,
                    cur | READERS_WAITING,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    cur = x;
                    continue;
                }
            }

            self.state.compare_and_wait(cur | READERS_WAITING);

            cur = self.spin_read();
        }
    }

    /// # Safety
    ///
    /// The calling thread must own a read lock on this shard.
    #[inline(always)]
    pub(crate) unsafe fn read_unlock(&self) {
        let cur = self.state.fetch_sub(READ_LOCKED, Ordering::Release) - READ_LOCKED;
        // readers only park behind a writer, or while a writer is waiting
        debug_assert!(!has_readers_waiting(cur) || has_writers_waiting(cur));
        if is_unlocked(cur) && has_writers_waiting(cur) {
            self.wake_writer_or_readers(cur);
        }
    }

    #[inline(always)]
    pub(crate) fn try_write(&self) -> bool {
        let mut cur = self.state.load(Ordering::Relaxed);
        while is_unlocked(cur) {
            match self.state.compare_exchange_weak(
                cur,
                cur | WRITE_LOCKED,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(x) => cur = x,
            }
        }
        false
    }

    #[inline(always)]
    pub(crate) fn write(&self) {
        if self
            .state
            .compare_exchange(0, WRITE_LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.write_slow();
        }
    }

    #[cold]
    fn write_slow(&self) {
        let mut cur = self.spin_write();

        // once this thread has parked, it can no longer tell whether other
        // writers are parked too, so it keeps the flag set when it locks.
        let mut other_writers_waiting = 0;

        loop {
            if is_unlocked(cur) {
                match self.state.compare_exchange_weak(
                    cur,
                    cur | WRITE_LOCKED | other_writers_waiting,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return,
                    Err(x) => {
                        cur = x;
                        continue;
                    }
                }
            }

            if !has_writers_waiting(cur) {
                if let Err(x) = self.state.compare_exchange(
                    cur,
                    cur | WRITERS_WAITING,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    cur = x;
                    continue;
                }
            }

            other_writers_waiting = WRITERS_WAITING;

            let seq = self.writer_notify.load(Ordering::Acquire);

            // the lock may have been released between the flag and the
            // load of writer_notify
            cur = self.state.load(Ordering::Relaxed);
            if is_unlocked(cur) || !has_writers_waiting(cur) {
                continue;
            }

            self.writer_notify.compare_and_wait(seq);

            cur = self.spin_write();
        }
    }

    /// # Safety
    ///
    /// The calling thread must own the write lock on this shard.
    #[inline(always)]
    pub(crate) unsafe fn write_unlock(&self) {
        let cur = self.state.fetch_sub(WRITE_LOCKED, Ordering::Release) - WRITE_LOCKED;
        debug_assert!(is_unlocked(cur));
        if has_writers_waiting(cur) || has_readers_waiting(cur) {
            self.wake_writer_or_readers(cur);
        }
    }

    #[cold]
    fn wake_writer_or_readers(&self, mut cur: u32) {
        assert!(is_unlocked(cur));

        // If the lock is taken again meanwhile, the new owner will wake
        // waiters when it unlocks.

        if cur == WRITERS_WAITING {
            match self
                .state
                .compare_exchange(cur, 0, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => {
                    self.wake_writer();
                    return;
                }
                Err(x) => cur = x,
            }
        }

        // readers stay parked while a writer is woken
        if cur == READERS_WAITING | WRITERS_WAITING {
            if self
                .state
                .compare_exchange(cur, READERS_WAITING, Ordering::Relaxed, Ordering::Relaxed)
                .is_err()
            {
                return;
            }
            if self.wake_writer() {
                return;
            }
            // no writer was actually parked
            cur = READERS_WAITING;
        }

        if cur == READERS_WAITING
            && self
                .state
                .compare_exchange(cur, 0, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        {
            self.state.wake_all();
        }
    }

    #[inline(always)]
    fn wake_writer(&self) -> bool {
        self.writer_notify.fetch_add(1, Ordering::Release);
        self.writer_notify.wake_one()
    }

    #[inline(always)]
    fn spin_read(&self) -> u32 {
        let mut spin_wait = SpinWait::new();
        loop {
            let cur = self.state.load(Ordering::Relaxed);
            if !is_write_locked(cur)
                || has_readers_waiting(cur)
                || has_writers_waiting(cur)
                || !spin_wait.spin_no_yield()
            {
                return cur;
            }
        }
    }

    // writers may also yield: a write lock is held longer than the time
    // readers need to drain
    #[inline(always)]
    fn spin_write(&self) -> u32 {
        let mut spin_wait = SpinWait::new();
        loop {
            let cur = self.state.load(Ordering::Relaxed);
            if is_unlocked(cur) || has_writers_waiting(cur) || !spin_wait.spin() {
                return cur;
            }
        }
    }
}

/// A reader/writer mutex split in independent shards.
///
/// A shared lock only takes one shard, the one assigned to the
/// calling thread, so readers running on different threads mostly
/// touch different cache lines. An exclusive lock takes every shard
/// in index order.
///
/// The mutex does not own any data: it guards whatever the caller
/// decides to access while a guard is alive.
pub struct SharedMutex {
    shards: Box<[CachePadded<ShardLock>]>,
}

/// Guard of a shared lock. The shard is released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SharedGuard<'a> {
    shard: &'a ShardLock,
}

/// Guard of an exclusive lock. Every shard is released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ExclusiveGuard<'a> {
    shards: &'a [CachePadded<ShardLock>],
}

static NEXT_SLOT: AtomicUsize = AtomicUsize::new(0);

std::thread_local! {
    static SLOT: usize = NEXT_SLOT.fetch_add(1, Ordering::Relaxed);
}

// SharedMutex
// -----------
//
impl SharedMutex {
    /// Build a mutex with `shards` shards.
    pub fn new(shards: usize) -> Result<Self> {
        if shards == 0 {
            return Err(BenchError::InvalidShards);
        }
        Ok(Self::with_shards(shards))
    }

    fn with_shards(shards: usize) -> Self {
        Self {
            shards: (0..shards).map(|_| CachePadded::new(ShardLock::new())).collect(),
        }
    }

    /// Number of shards.
    #[inline(always)]
    pub fn shards(&self) -> usize {
        self.shards.len()
    }

    #[inline(always)]
    fn local_shard(&self) -> &ShardLock {
        let slot = SLOT.with(|s| *s);
        &self.shards[slot % self.shards.len()]
    }

    /// Take a shared lock.
    ///
    /// Other threads may hold shared locks at the same time, no thread
    /// holds an exclusive lock while the returned guard is alive.
    #[inline(always)]
    pub fn lock_shared(&self) -> SharedGuard<'_> {
        let shard = self.local_shard();
        shard.read();
        SharedGuard { shard }
    }

    #[inline(always)]
    pub fn try_lock_shared(&self) -> Option<SharedGuard<'_>> {
        let shard = self.local_shard();
        if shard.try_read() {
            Some(SharedGuard { shard })
        } else {
            None
        }
    }

    /// Take an exclusive lock.
    ///
    /// No other thread holds a shared or exclusive lock while the
    /// returned guard is alive.
    pub fn lock_exclusive(&self) -> ExclusiveGuard<'_> {
        for shard in self.shards.iter() {
            shard.write();
        }
        ExclusiveGuard {
            shards: &self.shards[..],
        }
    }

    /// Try to take an exclusive lock without blocking.
    ///
    /// On failure the shards already taken are released.
    pub fn try_lock_exclusive(&self) -> Option<ExclusiveGuard<'_>> {
        for (i, shard) in self.shards.iter().enumerate() {
            if !shard.try_write() {
                for taken in self.shards[..i].iter().rev() {
                    unsafe { taken.write_unlock() };
                }
                return None;
            }
        }
        Some(ExclusiveGuard {
            shards: &self.shards[..],
        })
    }
}

impl Default for SharedMutex {
    fn default() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }
}

impl fmt::Debug for SharedMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMutex")
            .field("shards", &self.shards.len())
            .finish()
    }
}

impl Drop for SharedGuard<'_> {
    #[inline(always)]
    fn drop(&mut self) {
        unsafe { self.shard.read_unlock() }
    }
}

impl Drop for ExclusiveGuard<'_> {
    #[inline(always)]
    fn drop(&mut self) {
        for shard in self.shards.iter().rev() {
            unsafe { shard.write_unlock() }
        }
    }
}
