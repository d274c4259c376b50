//! Wall clock and process CPU time measurement.
//!
//! CPU times come from `getrusage(RUSAGE_SELF)`, which sums the
//! contribution of every thread of the process. A [ProcTimer] created
//! by one thread therefore accounts for the work of all the threads
//! that ran while it was alive.
use crate::error::{BenchError, Result};
use std::io;
use std::time::{Duration, Instant};

/// Accumulated real, user and system times, in seconds.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Clocks {
    pub real: f64,
    pub user: f64,
    pub sys:  f64,
}

impl Clocks {
    #[inline]
    pub fn add(&mut self, real: f64, user: f64, sys: f64) {
        self.real += real;
        self.user += user;
        self.sys += sys;
    }
}

/// CPU time consumed by the process so far.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Usage {
    pub user: Duration,
    pub sys:  Duration,
}

#[cfg(unix)]
impl Usage {
    pub fn now() -> Result<Self> {
        let mut usage = core::mem::MaybeUninit::<libc::rusage>::uninit();
        if unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) } != 0 {
            return Err(BenchError::Clock(io::Error::last_os_error()));
        }
        let usage = unsafe { usage.assume_init() };
        Ok(Self {
            user: timeval_to_duration(&usage.ru_utime),
            sys:  timeval_to_duration(&usage.ru_stime),
        })
    }
}

#[cfg(unix)]
fn timeval_to_duration(t: &libc::timeval) -> Duration {
    Duration::from_secs(t.tv_sec as u64) + Duration::from_micros(t.tv_usec as u64)
}

// No process wide CPU accounting available.
#[cfg(not(unix))]
impl Usage {
    pub fn now() -> Result<Self> {
        Err(BenchError::Clock(io::Error::new(
            io::ErrorKind::Unsupported,
            "getrusage is not available on this plateform",
        )))
    }
}

/// Measures the real and CPU times elapsed between its creation and
/// its drop, and adds them to the bound [Clocks].
///
/// The measure is recorded exactly once, when the timer is dropped,
/// whether the scope is left normally or by unwinding.
pub struct ProcTimer<'a> {
    clocks:      &'a mut Clocks,
    start_wall:  Instant,
    start_usage: Usage,
}

impl<'a> ProcTimer<'a> {
    pub fn start(clocks: &'a mut Clocks) -> Result<Self> {
        let start_usage = Usage::now()?;
        Ok(Self {
            clocks,
            start_wall: Instant::now(),
            start_usage,
        })
    }
}

impl Drop for ProcTimer<'_> {
    fn drop(&mut self) {
        let real = self.start_wall.elapsed();
        let end = match Usage::now() {
            Ok(u) => u,
            Err(e) => {
                // The measure can neither be recorded nor reported.
                log::error!("{}", e);
                std::process::abort()
            }
        };
        let user = end.user.saturating_sub(self.start_usage.user);
        let sys = end.sys.saturating_sub(self.start_usage.sys);
        self.clocks
            .add(real.as_secs_f64(), user.as_secs_f64(), sys.as_secs_f64());
    }
}
