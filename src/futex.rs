//! A 32 bits word threads can wait on.
//!
//! On linux and android this is the raw futex syscall. On other plateforms,
//! or if the `parking_lot_core` feature is enabled, threads are parked in
//! the parking_lot_core hash table using the address of the word as key.

#[cfg(futex)]
mod linux {
    use core::ops::Deref;
    use core::ptr;
    use core::sync::atomic::AtomicU32;
    use libc::{syscall, SYS_futex, FUTEX_PRIVATE_FLAG, FUTEX_WAIT, FUTEX_WAKE};

    pub(crate) struct Futex {
        futex: AtomicU32,
    }

    impl Futex {
        pub(crate) const fn new(value: u32) -> Self {
            Self {
                futex: AtomicU32::new(value),
            }
        }

        /// Block while the word is equal to `value`.
        ///
        /// Returns true if the thread was woken, false if the value
        /// did not match or the wait was interrupted.
        pub(crate) fn compare_and_wait(&self, value: u32) -> bool {
            unsafe {
                syscall(
                    SYS_futex,
                    &self.futex as *const _ as *const _,
                    FUTEX_WAIT | FUTEX_PRIVATE_FLAG,
                    value,
                    ptr::null::<libc::timespec>(),
                ) == 0
            }
        }

        pub(crate) fn wake_one(&self) -> bool {
            unsafe {
                syscall(
                    SYS_futex,
                    &self.futex as *const _ as *const _,
                    FUTEX_WAKE | FUTEX_PRIVATE_FLAG,
                    1,
                ) > 0
            }
        }

        pub(crate) fn wake_all(&self) -> usize {
            let r = unsafe {
                syscall(
                    SYS_futex,
                    &self.futex as *const _ as *const _,
                    FUTEX_WAKE | FUTEX_PRIVATE_FLAG,
                    i32::MAX,
                )
            };
            if r > 0 {
                r as usize
            } else {
                0
            }
        }
    }

    impl Deref for Futex {
        type Target = AtomicU32;
        fn deref(&self) -> &Self::Target {
            &self.futex
        }
    }
}
#[cfg(futex)]
pub(crate) use linux::Futex;

#[cfg(not(futex))]
mod other {
    use core::ops::Deref;
    use core::sync::atomic::{AtomicU32, Ordering};
    use parking_lot_core::{
        park, unpark_all, unpark_one, ParkResult, DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN,
    };

    pub(crate) struct Futex(AtomicU32);

    impl Futex {
        pub(crate) const fn new(value: u32) -> Self {
            Self(AtomicU32::new(value))
        }

        pub(crate) fn compare_and_wait(&self, value: u32) -> bool {
            unsafe {
                matches!(
                    park(
                        &self.0 as *const _ as usize,
                        || self.0.load(Ordering::Relaxed) == value,
                        || {},
                        |_, _| {},
                        DEFAULT_PARK_TOKEN,
                        None,
                    ),
                    ParkResult::Unparked(_)
                )
            }
        }
        pub(crate) fn wake_one(&self) -> bool {
            unsafe {
                let r = unpark_one(&self.0 as *const _ as usize, |_| DEFAULT_UNPARK_TOKEN);
                r.unparked_threads == 1
            }
        }
        pub(crate) fn wake_all(&self) -> usize {
            unsafe { unpark_all(&self.0 as *const _ as usize, DEFAULT_UNPARK_TOKEN) }
        }
    }

    impl Deref for Futex {
        type Target = AtomicU32;
        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }
}
#[cfg(not(futex))]
pub(crate) use other::Futex;
