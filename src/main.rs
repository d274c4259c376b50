use anyhow::Context;
use shared_mutex::{Config, Sweep};
use std::io;
use std::process;

fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    let sweep = Sweep::new(config).context("invalid configuration")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    sweep.run(&mut out).context("benchmark failed")?;
    Ok(())
}

/// One line, with the whole context chain.
fn diagnostic(e: &anyhow::Error) -> String {
    format!("error: {:#}", e)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("{}", diagnostic(&e));
        process::exit(1);
    }
}
