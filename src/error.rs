use std::io;
use thiserror::Error;

/// Errors raised by the benchmark harness.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The process resource usage could not be read.
    #[error("unable to read process clocks: {0}")]
    Clock(#[source] io::Error),

    /// A reader observed the two oracle counters out of step.
    #[error("oracle violation: counters observed as {a} and {b}")]
    OracleViolation { a: u64, b: u64 },

    #[error("worker {worker} failed at iteration {iteration}")]
    WorkerFailed {
        worker: usize,
        iteration: usize,
        #[source]
        source: Box<BenchError>,
    },

    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("writer count {writers} exceeds thread count {threads}")]
    TooManyWriters { writers: usize, threads: usize },

    #[error("iteration count must be at least 1")]
    ZeroIterations,

    #[error("write frequency must be at least 1")]
    ZeroWriteFrequency,

    #[error("a shared mutex needs at least one shard")]
    InvalidShards,

    #[error("invalid value {value:?} for {key}")]
    Config { key: String, value: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = core::result::Result<T, BenchError>;
