//! Runs the same workload against every lock under comparison, for each
//! write frequency of a sweep.
use crate::error::{BenchError, Result};
use crate::lock::{LockKind, LockSet, ReadWriteLock};
use crate::oracle::Oracle;
use crate::shared_mutex::{SharedMutex, DEFAULT_SHARDS};
use crate::workload::{self, Header, Report, Workload};
use std::io::Write;

/// Prefix of the environment variables read by [Config::from_env].
pub const ENV_PREFIX: &str = "SHARED_MUTEX_BENCH_";

/// Parameters of a sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub threads:           usize,
    pub writers:           usize,
    pub iterations:        usize,
    /// Write frequencies, in the order they are run.
    pub write_frequencies: Vec<usize>,
    pub locks:             LockSet,
    /// Number of shards of the [SharedMutex].
    pub shards:            usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads:           4,
            writers:           4,
            iterations:        32 * 1024 * 1024,
            write_frequencies: vec![1024, 512, 256, 128, 16, 4],
            locks:             LockSet::default(),
            shards:            DEFAULT_SHARDS,
        }
    }
}

impl Config {
    /// Default configuration overridden by the `SHARED_MUTEX_BENCH_*`
    /// environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Default configuration overridden by the `SHARED_MUTEX_BENCH_*`
    /// entries of `vars`. Other entries are ignored.
    ///
    /// Recognized keys are `THREADS`, `WRITERS`, `ITERATIONS`, `SHARDS`,
    /// `FREQUENCIES` (comma separated integers) and `LOCKS` (comma
    /// separated lock names, see [LockKind]).
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Config::default();
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            let name = match key.strip_prefix(ENV_PREFIX) {
                Some(n) => n,
                None => continue,
            };
            let bad = || BenchError::Config {
                key: key.to_owned(),
                value: value.to_owned(),
            };
            let number = |s: &str| s.trim().parse::<usize>().map_err(|_| bad());
            match name {
                "THREADS" => config.threads = number(value)?,
                "WRITERS" => config.writers = number(value)?,
                "ITERATIONS" => config.iterations = number(value)?,
                "SHARDS" => config.shards = number(value)?,
                "FREQUENCIES" => {
                    config.write_frequencies = value
                        .split(',')
                        .map(number)
                        .collect::<Result<Vec<_>>>()?
                }
                "LOCKS" => {
                    config.locks = value
                        .split(',')
                        .map(|s| s.parse::<LockKind>().map_err(|_| bad()))
                        .collect::<Result<LockSet>>()?
                }
                _ => log::warn!("ignoring unknown setting {}", key),
            }
        }
        Ok(config)
    }

    /// The workload run for one write frequency.
    pub fn workload(&self, write_frequency: usize) -> Workload {
        Workload {
            threads: self.threads,
            iterations: self.iterations,
            write_frequency,
            writers: self.writers,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.shards == 0 {
            return Err(BenchError::InvalidShards);
        }
        self.write_frequencies
            .iter()
            .try_for_each(|f| self.workload(*f).validate())
    }
}

/// Owns the locks under comparison and the oracle they protect.
pub struct Sweep {
    config:       Config,
    oracle:       Oracle,
    shared_mutex: SharedMutex,
    mutex:        parking_lot::Mutex<()>,
    std_mutex:    std::sync::Mutex<()>,
    rwlock:       parking_lot::RwLock<()>,
}

impl Sweep {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared_mutex: SharedMutex::new(config.shards)?,
            config,
            oracle: Oracle::new(),
            mutex: parking_lot::Mutex::new(()),
            std_mutex: std::sync::Mutex::new(()),
            rwlock: parking_lot::RwLock::new(()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The oracle shared by every run of the sweep.
    pub fn oracle(&self) -> &Oracle {
        &self.oracle
    }

    /// Write the header, then run every (frequency, lock) pair and write
    /// its row. Stops at the first run that reports a failure.
    pub fn run(&self, out: &mut impl Write) -> Result<Vec<Report>> {
        log::info!(
            "sweep: {} threads ({} writers), {} iterations, frequencies {:?}, {} shards",
            self.config.threads,
            self.config.writers,
            self.config.iterations,
            self.config.write_frequencies,
            self.config.shards
        );
        writeln!(out, "{}", Header)?;
        let mut reports = Vec::new();
        for &f in &self.config.write_frequencies {
            for kind in self.config.locks.kinds() {
                let report = self.run_one(kind, f)?.into_result()?;
                writeln!(out, "{}", report)?;
                out.flush()?;
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Run the workload of one write frequency against one lock.
    pub fn run_one(&self, kind: LockKind, write_frequency: usize) -> Result<Report> {
        log::info!("{}: write frequency {}", kind, write_frequency);
        match kind {
            LockKind::SharedMutex => self.run_with(kind, &self.shared_mutex, write_frequency),
            LockKind::ParkingLotMutex => self.run_with(kind, &self.mutex, write_frequency),
            LockKind::StdMutex => self.run_with(kind, &self.std_mutex, write_frequency),
            LockKind::ParkingLotRwLock => self.run_with(kind, &self.rwlock, write_frequency),
        }
    }

    fn run_with<L: ReadWriteLock>(
        &self,
        kind: LockKind,
        lock: &L,
        write_frequency: usize,
    ) -> Result<Report> {
        let oracle = &self.oracle;
        workload::run(
            kind.label(),
            || {
                let _g = lock.lock_exclusive();
                oracle.write();
                Ok(())
            },
            || {
                let _g = lock.lock_shared();
                oracle.check()
            },
            &self.config.workload(write_frequency),
        )
    }
}

#[cfg(test)]
mod test_config {
    use super::Config;
    use crate::error::BenchError;
    use crate::lock::LockSet;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!((c.threads, c.writers, c.iterations), (4, 4, 32 * 1024 * 1024));
        assert_eq!(c.write_frequencies, [1024, 512, 256, 128, 16, 4]);
        assert_eq!(c.locks, LockSet::SHARED_MUTEX | LockSet::STD_MUTEX);
        assert_eq!(c.shards, 4);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn overrides() {
        let c = Config::from_vars([
            ("SHARED_MUTEX_BENCH_THREADS", "8"),
            ("SHARED_MUTEX_BENCH_WRITERS", "2"),
            ("SHARED_MUTEX_BENCH_FREQUENCIES", "64, 8,1"),
            ("SHARED_MUTEX_BENCH_LOCKS", "rwlock,shared"),
            ("PATH", "/usr/bin"),
        ])
        .unwrap();
        assert_eq!((c.threads, c.writers), (8, 2));
        assert_eq!(c.write_frequencies, [64, 8, 1]);
        assert_eq!(c.locks, LockSet::PARKING_LOT_RWLOCK | LockSet::SHARED_MUTEX);
        assert_eq!(c.iterations, Config::default().iterations);
    }

    #[test]
    fn bad_values() {
        let e = Config::from_vars([("SHARED_MUTEX_BENCH_ITERATIONS", "many")]).unwrap_err();
        assert!(matches!(e, BenchError::Config { ref value, .. } if value == "many"));
        assert!(Config::from_vars([("SHARED_MUTEX_BENCH_LOCKS", "spin")]).is_err());
        let c = Config {
            writers: 5,
            ..Config::default()
        };
        assert!(matches!(c.validate(), Err(BenchError::TooManyWriters { .. })));
        let c = Config {
            shards: 0,
            ..Config::default()
        };
        assert!(matches!(c.validate(), Err(BenchError::InvalidShards)));
    }
}
