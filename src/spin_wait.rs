use core::hint;

/// Exponential back-off used before parking a thread.
pub(crate) struct SpinWait {
    counter: u32,
}

const SPIN_LIMIT: u32 = 6;
const YIELD_LIMIT: u32 = 10;

impl SpinWait {
    #[inline(always)]
    pub(crate) const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Spin for a while, then yield to the scheduler.
    ///
    /// Returns false once the thread should rather park.
    #[inline]
    pub(crate) fn spin(&mut self) -> bool {
        if self.counter >= YIELD_LIMIT {
            return false;
        }
        self.counter += 1;
        if self.counter <= SPIN_LIMIT {
            for _ in 0..(1 << self.counter) {
                hint::spin_loop();
            }
        } else {
            std::thread::yield_now();
        }
        true
    }

    /// Same as spin but never yields.
    #[inline]
    pub(crate) fn spin_no_yield(&mut self) -> bool {
        if self.counter >= SPIN_LIMIT {
            return false;
        }
        self.counter += 1;
        for _ in 0..(1 << self.counter) {
            hint::spin_loop();
        }
        true
    }
}
