//! Argument parsing and the fan-out run itself.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, anyhow, bail};
use fanout_pool::{ConcurrencyLimit, OutcomeSummary, Pool};

const DEFAULT_TASKS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DriverOptions {
    pub(crate) tasks: usize,
    /// `None` defers to environment and config.
    pub(crate) limit: Option<ConcurrencyLimit>,
    pub(crate) fail_every: Option<NonZeroUsize>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            tasks: DEFAULT_TASKS,
            limit: None,
            fail_every: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Help,
    Run(DriverOptions),
}

impl Command {
    pub(crate) fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = DriverOptions::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg.clone(), None),
            };

            match flag.as_str() {
                "-h" | "--help" => return Ok(Command::Help),
                "--tasks" => {
                    let value = flag_value(&flag, inline, &mut args)?;
                    options.tasks = value
                        .parse()
                        .with_context(|| format!("--tasks expects a count (got {value:?})"))?;
                }
                "--limit" => {
                    let value = flag_value(&flag, inline, &mut args)?;
                    options.limit = Some(value.parse()?);
                }
                "--fail-every" => {
                    let value = flag_value(&flag, inline, &mut args)?;
                    let every: usize = value
                        .parse()
                        .with_context(|| format!("--fail-every expects a count (got {value:?})"))?;
                    options.fail_every = NonZeroUsize::new(every);
                }
                other => bail!("unknown argument: {other}"),
            }
        }

        Ok(Command::Run(options))
    }
}

fn flag_value(
    flag: &str,
    inline: Option<String>,
    args: &mut impl Iterator<Item = String>,
) -> Result<String> {
    inline
        .or_else(|| args.next())
        .ok_or_else(|| anyhow!("{flag} requires a value"))
}

/// Error returned by the driver's deliberately failing tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InjectedFailure {
    pub(crate) task: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Report {
    pub(crate) counter: u64,
    pub(crate) summary: OutcomeSummary,
}

/// Submit every task, wait for the pool to drain, and count what came back.
pub(crate) async fn run(options: &DriverOptions) -> Report {
    let pool: Pool<InjectedFailure> = Pool::with_limit(options.limit.unwrap_or_default());
    let counter = Arc::new(AtomicU64::new(0));

    for task in 1..=options.tasks {
        let counter = Arc::clone(&counter);
        let fails = options
            .fail_every
            .is_some_and(|every| task % every.get() == 0);

        pool.submit(move || async move {
            counter.fetch_add(1, Ordering::Relaxed);
            if fails {
                Err(InjectedFailure { task })
            } else {
                Ok(())
            }
        });
    }

    let outcomes = pool.wait().await;
    for failure in outcomes.iter().filter_map(|outcome| outcome.error()) {
        tracing::debug!(task = failure.task, "Task reported failure");
    }

    Report {
        counter: counter.load(Ordering::Relaxed),
        summary: OutcomeSummary::from_outcomes(&outcomes),
    }
}
