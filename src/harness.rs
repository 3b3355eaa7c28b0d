//! Visibility harness
//!
//! Drives many worker threads against a shared [`NameRepo`]. Each worker adds
//! a unique name and immediately reads the full name set back through a
//! [`Strategy`]. A read that misses the worker's own name is a visibility
//! error: the strategy handed out a result computed before the worker's write.
//!
//! Comparing strategies shows how many repository reads coalescing saves
//! while staying error-free.

use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::ZeroTimeCache;
use crate::config::{CoalescingConfig, Config};
use crate::{Error, Result};

/// Append-only name store guarded by its own lock
#[derive(Debug, Default)]
pub struct NameRepo {
    names: Mutex<Vec<String>>,
    reads: AtomicU64,
}

impl NameRepo {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a name
    pub fn add_name(&self, name: impl Into<String>) {
        self.names.lock().push(name.into());
    }

    /// Every name added so far
    pub fn names(&self) -> HashSet<String> {
        let names = self.names.lock();
        self.reads.fetch_add(1, Ordering::Relaxed);
        names.iter().cloned().collect()
    }

    /// How many times [`names`](Self::names) ran
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

/// How workers read the name set back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Read the repository on every call
    Direct,
    /// Read through a [`ZeroTimeCache`] without delay
    Coalesced,
    /// Read through a [`ZeroTimeCache`] that waits before each refresh
    CoalescedDelay(Duration),
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Coalesced => write!(f, "coalesced"),
            Self::CoalescedDelay(delay) => write!(f, "coalesced+delay({}ms)", delay.as_millis()),
        }
    }
}

/// Outcome of one harness run
#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    /// Strategy label
    pub strategy: String,
    /// Worker threads
    pub workers: usize,
    /// Reads each worker performed
    pub rounds: usize,
    /// Times the repository was actually read
    pub repo_reads: u64,
    /// Reads that missed the worker's own name
    pub errors: u64,
    /// Wall time of the run in milliseconds
    pub elapsed_ms: u128,
}

impl HarnessReport {
    /// Total reads requested by workers
    #[must_use]
    pub fn calls(&self) -> u64 {
        (self.workers * self.rounds) as u64
    }
}

impl fmt::Display for HarnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} calls, repo read {} times, {} errors ({} ms)",
            self.strategy,
            self.calls(),
            self.repo_reads,
            self.errors,
            self.elapsed_ms
        )
    }
}

/// Name set shared between coalesced callers
pub type NameSet = Arc<HashSet<String>>;

/// Cache a strategy reads through, if any
///
/// [`Strategy::Coalesced`] takes its delay from `coalescing`.
pub fn cache_for(
    strategy: Strategy,
    coalescing: &CoalescingConfig,
) -> Option<ZeroTimeCache<NameSet, Infallible>> {
    match strategy {
        Strategy::Direct => None,
        Strategy::Coalesced => Some(ZeroTimeCache::from_config(coalescing)),
        Strategy::CoalescedDelay(delay) => Some(ZeroTimeCache::with_delay(delay)),
    }
}

/// Run `harness.workers` threads for `harness.rounds` add-then-read iterations each
pub fn check(strategy: Strategy, config: &Config) -> Result<HarnessReport> {
    let workers = config.harness.workers;
    let rounds = config.harness.rounds;
    let repo = Arc::new(NameRepo::new());
    let cache = cache_for(strategy, &config.coalescing).map(Arc::new);
    let errors = Arc::new(AtomicU64::new(0));

    let started = Instant::now();
    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let repo = Arc::clone(&repo);
            let cache = cache.clone();
            let errors = Arc::clone(&errors);
            thread::Builder::new()
                .name(format!("worker-{worker}"))
                .spawn(move || {
                    for round in 0..rounds {
                        let name = format!("worker-{worker}-{round}");
                        repo.add_name(name.clone());
                        let seen = read_names(&repo, cache.as_deref());
                        if !seen.contains(&name) {
                            errors.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
        })
        .collect::<std::io::Result<_>>()?;

    for handle in handles {
        handle
            .join()
            .map_err(|_| Error::Harness("worker thread panicked".to_string()))?;
    }

    let report = HarnessReport {
        strategy: strategy.to_string(),
        workers,
        rounds,
        repo_reads: repo.reads(),
        errors: errors.load(Ordering::Relaxed),
        elapsed_ms: started.elapsed().as_millis(),
    };
    info!(
        strategy = %report.strategy,
        repo_reads = report.repo_reads,
        errors = report.errors,
        elapsed_ms = report.elapsed_ms,
        "Harness run finished"
    );
    Ok(report)
}

fn read_names(repo: &NameRepo, cache: Option<&ZeroTimeCache<NameSet, Infallible>>) -> NameSet {
    let Some(cache) = cache else {
        return Arc::new(repo.names());
    };
    match cache.run(|| Ok(Arc::new(repo.names()))) {
        Ok(names) => names,
        Err(never) => match never {},
    }
}

/// Run every strategy with the configured worker count
pub fn compare(config: &Config) -> Result<Vec<HarnessReport>> {
    [
        Strategy::Direct,
        Strategy::Coalesced,
        Strategy::CoalescedDelay(config.harness.delay),
    ]
    .into_iter()
    .map(|strategy| check(strategy, config))
    .collect()
}

/// Format reports as one line each, or as pretty JSON
pub fn render(reports: &[HarnessReport], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(reports)?);
    }
    Ok(reports.iter().map(|r| format!("{r}\n")).collect())
}

/// Fail if any strategy handed a worker a result older than its own write
pub fn verify(reports: &[HarnessReport]) -> Result<()> {
    let stale: u64 = reports.iter().map(|r| r.errors).sum();
    if stale > 0 {
        return Err(Error::Harness(format!("{stale} stale reads observed")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;

    fn config(workers: usize, rounds: usize) -> Config {
        Config {
            harness: HarnessConfig {
                workers,
                rounds,
                delay: Duration::from_millis(1),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_name_repo_counts_reads() {
        let repo = NameRepo::new();
        repo.add_name("a");
        repo.add_name("b");

        let names = repo.names();
        assert_eq!(names.len(), 2);
        assert!(names.contains("a"));
        assert_eq!(repo.reads(), 1);
    }

    #[test]
    fn test_strategy_labels() {
        assert_eq!(Strategy::Direct.to_string(), "direct");
        assert_eq!(Strategy::Coalesced.to_string(), "coalesced");
        assert_eq!(
            Strategy::CoalescedDelay(Duration::from_millis(2)).to_string(),
            "coalesced+delay(2ms)"
        );
    }

    #[test]
    fn test_direct_reads_once_per_call() {
        let report = check(Strategy::Direct, &config(4, 5)).unwrap();
        assert_eq!(report.calls(), 20);
        assert_eq!(report.repo_reads, 20);
        assert_eq!(report.errors, 0);
    }

    #[test]
    fn test_coalesced_never_stale() {
        let report = check(Strategy::Coalesced, &config(16, 10)).unwrap();
        assert_eq!(report.errors, 0);
        assert!(report.repo_reads >= 1);
        assert!(report.repo_reads <= report.calls());
    }

    #[test]
    fn test_compare_runs_all_strategies() {
        let reports = compare(&config(4, 2)).unwrap();

        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.errors == 0));
        assert_eq!(reports[0].strategy, "direct");
    }

    #[test]
    fn test_direct_strategy_has_no_cache() {
        assert!(cache_for(Strategy::Direct, &CoalescingConfig::default()).is_none());
    }

    #[test]
    fn test_coalesced_cache_uses_configured_delay() {
        let coalescing = CoalescingConfig {
            delay: Duration::from_millis(40),
        };

        let cache = cache_for(Strategy::Coalesced, &coalescing).unwrap();
        assert_eq!(cache.delay(), Duration::from_millis(40));

        let cache = cache_for(Strategy::CoalescedDelay(Duration::from_millis(2)), &coalescing)
            .unwrap();
        assert_eq!(cache.delay(), Duration::from_millis(2));
    }

    #[test]
    fn test_configured_delay_reaches_harness_run() {
        let mut config = config(1, 2);
        config.coalescing.delay = Duration::from_millis(30);

        // One worker never coalesces, so every round pays the delay.
        let report = check(Strategy::Coalesced, &config).unwrap();
        assert_eq!(report.repo_reads, 2);
        assert!(report.elapsed_ms >= 60);
    }

    fn report(strategy: &str, errors: u64) -> HarnessReport {
        HarnessReport {
            strategy: strategy.to_string(),
            workers: 1,
            rounds: 1,
            repo_reads: 1,
            errors,
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_render_text_and_json() {
        let reports = [report("direct", 0), report("coalesced", 0)];

        let text = render(&reports, false).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("direct: 1 calls"));

        let json = render(&reports, true).unwrap();
        let json: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(json[1]["strategy"], "coalesced");
    }

    #[test]
    fn test_verify_reports_stale_reads() {
        assert!(verify(&[report("direct", 0)]).is_ok());

        let err = verify(&[report("direct", 0), report("coalesced", 2)]).unwrap_err();
        assert!(matches!(err, Error::Harness(_)));
        assert_eq!(err.to_string(), "Harness error: 2 stale reads observed");
    }

    #[test]
    fn test_report_display() {
        let report = HarnessReport {
            strategy: "direct".to_string(),
            workers: 2,
            rounds: 3,
            repo_reads: 6,
            errors: 0,
            elapsed_ms: 1,
        };
        assert_eq!(
            report.to_string(),
            "direct: 6 calls, repo read 6 times, 0 errors (1 ms)"
        );
    }
}
