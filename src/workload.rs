//! Drives reader and writer threads against a lock and measures the run.
use crate::clocks::{Clocks, ProcTimer};
use crate::error::{BenchError, Result};
use core::fmt;
use crossbeam::thread;

/// Shape of one benchmark run.
///
/// Worker `i` is a writer if `i < writers`. A writer performs the write
/// operation at iterations `j` such that `j % write_frequency == 0` and
/// the read operation otherwise. Other workers only read.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Workload {
    pub threads:         usize,
    pub iterations:      usize,
    pub write_frequency: usize,
    pub writers:         usize,
}

impl Workload {
    pub fn validate(&self) -> Result<()> {
        if self.writers > self.threads {
            return Err(BenchError::TooManyWriters {
                writers: self.writers,
                threads: self.threads,
            });
        }
        if self.iterations == 0 {
            return Err(BenchError::ZeroIterations);
        }
        if self.write_frequency == 0 {
            return Err(BenchError::ZeroWriteFrequency);
        }
        Ok(())
    }

    #[inline(always)]
    pub fn is_writer(&self, worker: usize) -> bool {
        worker < self.writers
    }

    /// Number of write operations performed by one writer.
    pub fn writes_per_writer(&self) -> u64 {
        self.iterations.div_ceil(self.write_frequency) as u64
    }

    /// Number of write operations a complete run performs.
    pub fn expected_writes(&self) -> u64 {
        self.writes_per_writer() * self.writers as u64
    }

    /// Number of read operations a complete run performs.
    pub fn expected_reads(&self) -> u64 {
        self.threads as u64 * self.iterations as u64 - self.expected_writes()
    }
}

/// Operations performed by one worker.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct WorkerStats {
    pub writes: u64,
    pub reads:  u64,
}

struct WorkerOutcome {
    stats: WorkerStats,
    error: Option<BenchError>,
}

/// Result of one run: the measured times, what was run, and the
/// failures reported by the workers.
#[derive(Debug)]
pub struct Report {
    pub label:    String,
    pub workload: Workload,
    pub clocks:   Clocks,
    pub writes:   u64,
    pub reads:    u64,
    pub failures: Vec<BenchError>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn a report with failures into the first failure.
    pub fn into_result(mut self) -> Result<Report> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(self.failures.swap_remove(0))
        }
    }

    /// Sanity bound on CPU accounting: the threads of the run cannot
    /// have consumed much more CPU time than `real * threads`.
    ///
    /// The slack covers the clock granularity and the other threads of
    /// the process.
    pub fn cpu_is_plausible(&self) -> bool {
        let c = &self.clocks;
        let cores = self.workload.threads.max(1) as f64;
        c.user + c.sys <= c.real * cores * 1.1 + 0.05
    }
}

/// Width of the label column, wide enough for every [LockKind] label.
///
/// [LockKind]: crate::lock::LockKind
pub const LABEL_WIDTH: usize = 26;

/// The header line matching [Report] rows.
pub struct Header;

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>6},{:>6},{:>6},{:>w$}",
            "real",
            "user",
            "sys",
            "mutex_type",
            w = LABEL_WIDTH
        )
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = &self.workload;
        write!(
            f,
            "{:6.2},{:6.2},{:6.2},{:>lw$}\t({},{},{},{})",
            self.clocks.real,
            self.clocks.user,
            self.clocks.sys,
            self.label,
            w.threads,
            w.iterations,
            w.write_frequency,
            w.writers,
            lw = LABEL_WIDTH
        )
    }
}

fn worker<W, R>(index: usize, write: &W, read: &R, workload: Workload) -> WorkerOutcome
where
    W: Fn() -> Result<()>,
    R: Fn() -> Result<()>,
{
    let writer = workload.is_writer(index);
    let mut stats = WorkerStats::default();
    for j in 0..workload.iterations {
        let r = if writer && j % workload.write_frequency == 0 {
            write().map(|_| stats.writes += 1)
        } else {
            read().map(|_| stats.reads += 1)
        };
        if let Err(e) = r {
            return WorkerOutcome {
                stats,
                error: Some(BenchError::WorkerFailed {
                    worker: index,
                    iteration: j,
                    source: Box::new(e),
                }),
            };
        }
    }
    WorkerOutcome { stats, error: None }
}

/// Run `workload` and measure it.
///
/// Spawns `workload.threads` threads, each running its loop of write and
/// read operations, and waits for all of them. The timer covers the
/// spawns, the loops and the joins.
///
/// A worker whose operation fails stops and its error is recorded in the
/// report. The other workers run to completion. Errors are only returned
/// directly when the workload is invalid or the clocks cannot be read.
pub fn run<W, R>(label: &str, write: W, read: R, workload: &Workload) -> Result<Report>
where
    W: Fn() -> Result<()> + Sync,
    R: Fn() -> Result<()> + Sync,
{
    workload.validate()?;
    let workload = *workload;

    log::debug!(
        "{}: {} writers, {} readers, {} iterations, write every {}",
        label,
        workload.writers,
        workload.threads - workload.writers,
        workload.iterations,
        workload.write_frequency
    );

    let mut clocks = Clocks::default();
    let outcomes = {
        let _timer = ProcTimer::start(&mut clocks)?;
        let write = &write;
        let read = &read;
        let joined = thread::scope(|s| {
            let spawned: Vec<_> = (0..workload.threads)
                .map(|i| s.spawn(move |_| worker(i, write, read, workload)))
                .collect();
            spawned
                .into_iter()
                .enumerate()
                .map(|(i, t)| {
                    t.join().unwrap_or_else(|_| WorkerOutcome {
                        stats: WorkerStats::default(),
                        error: Some(BenchError::WorkerPanicked { worker: i }),
                    })
                })
                .collect::<Vec<_>>()
        });
        // every thread is joined above, so the scope reports no panic of
        // its own; keep one failure per worker if it ever does
        joined.unwrap_or_else(|_| {
            (0..workload.threads)
                .map(|i| WorkerOutcome {
                    stats: WorkerStats::default(),
                    error: Some(BenchError::WorkerPanicked { worker: i }),
                })
                .collect()
        })
    };

    let mut report = Report {
        label: label.to_owned(),
        workload,
        clocks,
        writes: 0,
        reads: 0,
        failures: Vec::new(),
    };
    for o in outcomes {
        report.writes += o.stats.writes;
        report.reads += o.stats.reads;
        if let Some(e) = o.error {
            match std::error::Error::source(&e) {
                Some(cause) => log::error!("{}: {}: {}", label, e, cause),
                None => log::error!("{}: {}", label, e),
            }
            report.failures.push(e);
        }
    }

    log::debug!(
        "{}: {} writes, {} reads, {:.3}s real",
        label,
        report.writes,
        report.reads,
        report.clocks.real
    );
    if !report.cpu_is_plausible() {
        log::warn!(
            "{}: cpu time {:.2}s exceeds real time {:.2}s on {} threads",
            label,
            report.clocks.user + report.clocks.sys,
            report.clocks.real,
            workload.threads
        );
    }

    Ok(report)
}
