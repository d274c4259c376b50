use shared_mutex::{Config, LockKind, LockSet, Sweep};

fn small(locks: LockSet) -> Config {
    Config {
        threads: 4,
        writers: 4,
        iterations: 2048,
        write_frequencies: vec![64, 16, 4],
        locks,
        shards: 4,
    }
}

#[test]
fn rows_in_sweep_order() {
    let sweep = Sweep::new(small(LockSet::default())).unwrap();
    let mut out = Vec::new();
    let reports = sweep.run(&mut out).unwrap();
    assert_eq!(reports.len(), 6);

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(
        lines[0],
        format!("{:>6},{:>6},{:>6},{:>26}", "real", "user", "sys", "mutex_type")
    );

    let expected = [
        (LockKind::SharedMutex, 64),
        (LockKind::StdMutex, 64),
        (LockKind::SharedMutex, 16),
        (LockKind::StdMutex, 16),
        (LockKind::SharedMutex, 4),
        (LockKind::StdMutex, 4),
    ];
    for ((line, report), (kind, f)) in lines[1..].iter().zip(&reports).zip(expected) {
        assert_eq!(report.label, kind.label());
        assert_eq!(report.workload.write_frequency, f);
        assert_eq!(line.find('\t'), Some(lines[0].len()), "{}", line);
        let (times, params) = line.split_once('\t').unwrap();
        assert_eq!(params, format!("(4,2048,{},4)", f));
        let fields: Vec<_> = times.split(',').collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[3].trim(), kind.label());
        for t in &fields[..3] {
            assert!(t.trim().parse::<f64>().unwrap() >= 0.0);
        }
    }

    // 4 writers, ceil(2048 / f) writes each, summed over both locks
    let writes = 2 * 4 * (2048 / 64 + 2048 / 16 + 2048 / 4);
    assert_eq!(sweep.oracle().counts(), (writes, writes));
}

#[test]
fn every_lock_kind() {
    let sweep = Sweep::new(small(LockSet::all())).unwrap();
    let mut out = Vec::new();
    let reports = sweep.run(&mut out).unwrap();
    assert_eq!(reports.len(), 12);
    assert!(reports.iter().all(|r| r.is_clean()));
    let labels: Vec<_> = reports[..4].iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        labels,
        [
            "shared_mutex::SharedMutex",
            "parking_lot::Mutex",
            "std::sync::Mutex",
            "parking_lot::RwLock"
        ]
    );
}

#[test]
fn single_lock_kind() {
    let sweep = Sweep::new(small(LockKind::ParkingLotRwLock.into())).unwrap();
    assert_eq!(sweep.config().locks, LockSet::PARKING_LOT_RWLOCK);
    assert_eq!(sweep.config().write_frequencies, [64, 16, 4]);
    let mut out = Vec::new();
    let reports = sweep.run(&mut out).unwrap();
    assert!(reports.iter().all(|r| r.label == "parking_lot::RwLock"));
    assert_eq!(reports.len(), sweep.config().write_frequencies.len());
}

#[test]
fn invalid_config_is_rejected() {
    let mut c = small(LockSet::default());
    c.write_frequencies.push(0);
    assert!(Sweep::new(c).is_err());
}

#[test]
fn empty_sweep_only_prints_header() {
    let mut c = small(LockSet::default());
    c.write_frequencies.clear();
    let mut out = Vec::new();
    let reports = Sweep::new(c).unwrap().run(&mut out).unwrap();
    assert!(reports.is_empty());
    assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
}
