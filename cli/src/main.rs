//! Fanout CLI - example driver for the bounded pool.
//!
//! Submits `--tasks` trivial jobs that bump a shared counter, waits for the
//! pool to drain, and prints a summary:
//!
//! ```text
//! Finished: counter=10000 results=10000
//! failed=0
//! ```
//!
//! The concurrency limit comes from `--limit`, then `FANOUT_LIMIT`, then
//! `~/.fanout/config.toml`, then the default of 10. Logs go to stderr so
//! stdout only carries the summary.

mod driver;

use anyhow::Result;
use std::env;
use std::io;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use driver::{Command, DriverOptions};
use fanout_config::{FanoutConfig, resolve_limit_from_env};

const USAGE: &str = "\
Usage: fanout [--tasks N] [--limit N] [--fail-every N]

  --tasks N       number of tasks to submit (default 10000)
  --limit N       maximum tasks running at once; N <= 0 means 1
  --fail-every N  make every Nth task return an error
";

fn init_tracing(config: Option<&FanoutConfig>) {
    let configured = config.and_then(FanoutConfig::log_filter);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| match configured {
            Some(filter) => EnvFilter::try_new(filter),
            None => EnvFilter::try_new("warn"),
        })
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();

    if let Some(path) = FanoutConfig::path() {
        tracing::debug!(path = %path.display(), loaded = config.is_some(), "Config resolved");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging isn't up yet; hold the config error until it is.
    let (config, config_error) = match FanoutConfig::try_load() {
        Ok(config) => (config, None),
        Err(err) => (None, Some(err)),
    };
    init_tracing(config.as_ref());
    if let Some(err) = config_error {
        tracing::warn!("{err}");
    }

    let options = match Command::parse(env::args().skip(1))? {
        Command::Help => {
            print!("{USAGE}");
            return Ok(());
        }
        Command::Run(options) => options,
    };

    let limit = options
        .limit
        .unwrap_or_else(|| resolve_limit_from_env(config.as_ref()));
    tracing::info!(tasks = options.tasks, %limit, "Starting fan-out");

    let report = driver::run(&DriverOptions {
        limit: Some(limit),
        ..options
    })
    .await;

    println!(
        "Finished: counter={} results={}",
        report.counter, report.summary.total
    );
    println!("failed={}", report.summary.unsuccessful());

    Ok(())
}
