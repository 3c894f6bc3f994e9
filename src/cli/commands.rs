//! CLI command implementations
//!
//! Commands write their human-readable output to a caller-supplied writer so
//! they can be exercised from tests; log lines still go through the logger.

use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use serde::Serialize;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use crate::config::RecmgrConfig;
use crate::index::{Group, Index};
use crate::observability::{log_event_with_fields, Event, MetricsSnapshot};

/// Parse CLI arguments and execute the command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let mut out = io::stdout();

    match cmd {
        Command::Demo { config } => {
            let config = load_config(config.as_deref())?;
            demo(&config, &mut out)
        }
        Command::Stress {
            config,
            threads,
            records,
        } => {
            let config = load_config(config.as_deref())?;
            let report = stress(&config, threads, records)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<RecmgrConfig> {
    let config = match path {
        Some(path) => RecmgrConfig::load(path)?,
        None => RecmgrConfig::default(),
    };
    config.apply_logging()?;
    Ok(config)
}

// =============================================================================
// demo
// =============================================================================

#[derive(Debug, Default)]
struct Composer {
    name: String,
    born: i32,
}

impl Composer {
    fn new(name: &str, born: i32) -> Self {
        Self {
            name: name.to_string(),
            born,
        }
    }

    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn born(born: i32) -> Self {
        Self {
            born,
            ..Default::default()
        }
    }
}

impl fmt::Display for Composer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let born = self.born.to_string();
        let dots = 18usize.saturating_sub(self.name.len() + born.len());
        write!(f, "{}{}{}", self.name, ".".repeat(dots), born)
    }
}

const COMPOSERS: [(&str, i32); 5] = [
    ("Brahms", 1833),
    ("Bach", 1685),
    ("Palestrina", 1525),
    ("Mozart", 1756),
    ("Schubert", 1797),
];

fn section<W: Write>(out: &mut W, title: &str, records: &[Arc<Composer>]) -> io::Result<()> {
    writeln!(out, "{}", title)?;
    for record in records {
        writeln!(out, "    {}", record)?;
    }
    Ok(())
}

/// Index five composers by name and by birth year, then query both indexes.
pub fn demo<W: Write>(config: &RecmgrConfig, out: &mut W) -> CliResult<()> {
    let group = Group::with_config(config);
    let by_name = group.index_with_default(|a: &Composer, b: &Composer| a.name < b.name)?;
    let by_born = group.index_with_default(|a: &Composer, b: &Composer| a.born < b.born)?;

    for (name, born) in COMPOSERS {
        group.replace_or_insert(Arc::new(Composer::new(name, born)));
    }

    section(out, "Name order", &by_name.ascend_list())?;
    section(out, "Number order", &by_born.ascend_list())?;

    writeln!(out, "Delete \"Palestrina\"")?;
    let removed = group.delete(by_name.get(&Composer::named("Palestrina")).as_deref());
    writeln!(out, "    keys deleted: {}", removed)?;

    section(out, "Name order", &by_name.ascend_list())?;
    section(out, "Number order", &by_born.ascend_list())?;
    section(
        out,
        "Number < 1797",
        &by_born.ascend_less_than_list(&Composer::born(1797)),
    )?;
    section(
        out,
        "Name >= \"Mozart\"",
        &by_name.ascend_greater_or_equal_list(&Composer::named("Mozart")),
    )?;
    section(
        out,
        "1685 <= Number < 1797",
        &by_born.ascend_range_list(&Composer::born(1685), &Composer::born(1797)),
    )?;

    let lookups = [
        ("Get 1756", by_born.get(&Composer::born(1756))),
        ("Get 1800", by_born.get(&Composer::born(1800))),
        ("Get \"Schubert\"", by_name.get(&Composer::named("Schubert"))),
        ("Get \"Beethoven\"", by_name.get(&Composer::named("Beethoven"))),
    ];
    for (title, found) in lookups {
        section(out, title, found.as_slice())?;
    }

    writeln!(out, "Has 1756")?;
    writeln!(out, "    {}", by_born.has(&Composer::born(1756)))?;
    writeln!(out, "Has 1770")?;
    writeln!(out, "    {}", by_born.has(&Composer::born(1770)))?;

    let mut earliest = Vec::new();
    by_born.ascend(|record| {
        earliest.push(Arc::clone(record));
        earliest.len() < 2
    });
    section(out, "Earliest two", &earliest)?;

    Ok(())
}

// =============================================================================
// stress
// =============================================================================

/// Outcome of a stress run
#[derive(Debug, Clone, Serialize)]
pub struct StressReport {
    pub threads: usize,
    pub records_per_thread: usize,
    /// Records left in every index after the run
    pub remaining: usize,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Default)]
struct Job {
    id: usize,
    worker: usize,
    label: String,
}

/// Insert, read, traverse and delete from `threads` workers at once, then
/// check that every index agrees with itself and with the others.
///
/// Each worker inserts `records` jobs and deletes every second one.
pub fn stress(config: &RecmgrConfig, threads: usize, records: usize) -> CliResult<StressReport> {
    // Job ids run up to threads * records.
    if threads.checked_mul(records).is_none() {
        return Err(CliError::InvalidArguments(format!(
            "{} threads x {} records overflows the job id range",
            threads, records
        )));
    }

    let (threads_str, records_str) = (threads.to_string(), records.to_string());
    log_event_with_fields(
        Event::StressStart,
        &[("records", records_str.as_str()), ("threads", threads_str.as_str())],
    );

    let group = Group::with_config(config);
    let indexes = [
        group.index_with_default(|a: &Job, b: &Job| a.id < b.id)?,
        group.index_with_default(|a: &Job, b: &Job| (a.worker, a.id) < (b.worker, b.id))?,
        group.index_with_default(|a: &Job, b: &Job| a.label < b.label)?,
    ];

    let outcomes: Vec<Result<(), String>> = thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|worker| {
                let (group, indexes) = (&group, &indexes);
                scope.spawn(move || run_worker(group, indexes, worker, records))
            })
            .collect();

        workers
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err("worker panicked".to_string()))
            })
            .collect()
    });

    let mut violations: Vec<String> = outcomes.into_iter().filter_map(Result::err).collect();

    let remaining = threads * (records - records / 2);
    for (slot, index) in indexes.iter().enumerate() {
        let (len, traversed) = (index.len(), index.ascend_list().len());
        if len != traversed || len != remaining {
            violations.push(format!(
                "index {}: len {}, traversal {}, expected {}",
                slot, len, traversed, remaining
            ));
        }
    }

    if let Some(reason) = violations.first() {
        log_event_with_fields(Event::ConsistencyViolation, &[("reason", reason.as_str())]);
        return Err(CliError::ConsistencyViolation(violations.join("; ")));
    }

    let remaining_str = remaining.to_string();
    log_event_with_fields(Event::StressComplete, &[("remaining", remaining_str.as_str())]);

    Ok(StressReport {
        threads,
        records_per_thread: records,
        remaining,
        metrics: group.metrics(),
    })
}

fn run_worker(
    group: &Group<Job>,
    indexes: &[Index<Job>],
    worker: usize,
    records: usize,
) -> Result<(), String> {
    let expected = indexes.len();

    for i in 0..records {
        let id = worker * records + i;
        group.replace_or_insert(Arc::new(Job {
            id,
            worker,
            label: format!("job-{:010}", id),
        }));

        let key = Job {
            id,
            ..Default::default()
        };
        let found = indexes[0]
            .get(&key)
            .ok_or_else(|| format!("job {} missing after insert", id))?;

        let present = group.has(&*found);
        if present != expected {
            return Err(format!("job {} present in {} of {} indexes", id, present, expected));
        }

        if i % 2 == 1 {
            let removed = group.delete(&*found);
            if removed != expected {
                return Err(format!("job {} removed from {} of {} indexes", id, removed, expected));
            }
        }

        if i % 16 == 0 {
            let listed = indexes[1].ascend_list();
            let ordered = listed
                .windows(2)
                .all(|pair| (pair[0].worker, pair[0].id) < (pair[1].worker, pair[1].id));
            if !ordered {
                return Err(format!("worker index out of order after job {}", id));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_output() {
        let mut out = Vec::new();
        demo(&RecmgrConfig::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let expected = "\
Name order
    Bach..........1685
    Brahms........1833
    Mozart........1756
    Palestrina....1525
    Schubert......1797
Number order
    Palestrina....1525
    Bach..........1685
    Mozart........1756
    Schubert......1797
    Brahms........1833
Delete \"Palestrina\"
    keys deleted: 2
Name order
    Bach..........1685
    Brahms........1833
    Mozart........1756
    Schubert......1797
Number order
    Bach..........1685
    Mozart........1756
    Schubert......1797
    Brahms........1833
Number < 1797
    Bach..........1685
    Mozart........1756
Name >= \"Mozart\"
    Mozart........1756
    Schubert......1797
1685 <= Number < 1797
    Bach..........1685
    Mozart........1756
Get 1756
    Mozart........1756
Get 1800
Get \"Schubert\"
    Schubert......1797
Get \"Beethoven\"
Has 1756
    true
Has 1770
    false
Earliest two
    Bach..........1685
    Mozart........1756
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_stress_small_run() {
        let report = stress(&RecmgrConfig::default(), 4, 50).unwrap();

        assert_eq!(report.remaining, 100);
        assert_eq!(report.metrics.writes, 200);
        assert_eq!(report.metrics.deletes, 100);
        assert_eq!(report.metrics.keys_removed, 300);
        assert_eq!(report.metrics.lock_poisonings, 0);
    }

    #[test]
    fn test_stress_rejects_overflowing_job_count() {
        let err = stress(&RecmgrConfig::default(), usize::MAX, 2).unwrap_err();
        assert_eq!(err.code(), "RECMGR_CLI_INVALID_ARGUMENTS");
    }

    #[test]
    fn test_stress_odd_record_count() {
        let report = stress(&RecmgrConfig::default(), 2, 7).unwrap();
        assert_eq!(report.remaining, 8);
    }
}
