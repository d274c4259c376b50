mod synchronised_bench;
use synchronised_bench::{synchro_bench_input, Config};

use shared_mutex::{LockKind, Oracle, ReadWriteLock, SharedMutex};

use criterion::{
    criterion_group, criterion_main, measurement::WallTime, AxisScale, BenchmarkGroup,
    BenchmarkId, Criterion, PlotConfiguration,
};

use std::time::Duration;

struct Subject<L> {
    lock:   L,
    oracle: Oracle,
}

impl<L: ReadWriteLock> Subject<L> {
    fn new(lock: L) -> Self {
        Self {
            lock,
            oracle: Oracle::new(),
        }
    }
    #[inline(always)]
    fn read(&self) -> bool {
        let _g = self.lock.lock_shared();
        self.oracle.check().is_ok()
    }
    #[inline(always)]
    fn write(&self) {
        let _g = self.lock.lock_exclusive();
        self.oracle.write()
    }
    /// Write once every `w_freq` calls, read otherwise.
    #[inline(always)]
    fn mixed(&self, j: u64, w_freq: u64) -> bool {
        if j % w_freq == 0 {
            self.write();
            true
        } else {
            self.read()
        }
    }
}

fn do_bench<L, R, const NT: usize>(
    gp: &mut BenchmarkGroup<WallTime>,
    kind: LockKind,
    build: impl Fn() -> L,
    access: impl Fn(&Subject<L>, u64) -> R + Sync,
) where
    L: ReadWriteLock,
{
    synchro_bench_input(
        gp,
        BenchmarkId::new(kind.label(), NT),
        &NT,
        |_| Subject::new(build()),
        access,
        Config::<NT>,
    );
}

macro_rules! scaling {
    (@ $gp:expr, $access:expr, $($nt:literal),*) => {
        $(
        do_bench::<_, _, $nt>($gp, LockKind::SharedMutex, SharedMutex::default, $access);
        do_bench::<_, _, $nt>($gp, LockKind::ParkingLotMutex, || parking_lot::Mutex::new(()), $access);
        do_bench::<_, _, $nt>($gp, LockKind::StdMutex, || std::sync::Mutex::new(()), $access);
        do_bench::<_, _, $nt>($gp, LockKind::ParkingLotRwLock, || parking_lot::RwLock::new(()), $access);
        )*
    };
    ($gp:expr, $access:expr) => {
        scaling!(@ $gp, $access, 1, 2, 4, 8);
    };
}

fn bench_read(c: &mut Criterion) {
    let mut gp = c.benchmark_group("Shared lock Thread Scaling");

    gp.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    scaling!(&mut gp, |s, _| s.read());

    gp.finish();
}

fn bench_write(c: &mut Criterion) {
    let mut gp = c.benchmark_group("Exclusive lock Thread Scaling");

    gp.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    scaling!(&mut gp, |s, _| s.write());

    gp.finish();
}

fn bench_mixed(c: &mut Criterion) {
    for w_freq in [1024u64, 16, 4] {
        let mut gp = c.benchmark_group(format!("Mixed (1 write / {}) Thread Scaling", w_freq));

        gp.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

        scaling!(&mut gp, |s, j| s.mixed(j, w_freq));

        gp.finish();
    }
}

criterion_group! {name=multi; config=Criterion::default().measurement_time(Duration::from_secs(3));
targets=
bench_read,
bench_write,
bench_mixed
}

criterion_main! {multi}
