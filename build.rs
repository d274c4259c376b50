use cfg_aliases::cfg_aliases;

fn main() {
    cfg_aliases! {
        futex: { all(not(feature = "parking_lot_core"), any(target_os = "linux", target_os = "android")) },
    }
}
