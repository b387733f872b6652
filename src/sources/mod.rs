// src/sources/mod.rs
pub mod normalize;
pub mod providers;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::config::{BoardKind, SourcesConfig};
use crate::posting::Source;
use crate::sources::providers::{greenhouse::GreenhouseFetcher, lever::LeverFetcher};
use crate::sources::types::{FetchError, RawJob, SourceFetcher};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_records_total", "Raw records parsed from boards.");
        describe_counter!("fetch_errors_total", "Source fetch/timeout/parse errors.");
        describe_counter!("postings_new_total", "Postings that survived dedup.");
        describe_counter!("postings_dropped_total", "Records dropped by normalization.");
        describe_counter!("match_hits_total", "(user, posting) matches routed to the scheduler.");
        describe_counter!("notify_sent_total", "Notification batches handed to a sink.");
        describe_counter!("notify_errors_total", "Notification batches lost to sink errors.");
        describe_counter!("cycle_runs_total", "Completed check cycles.");
        describe_counter!("cycle_persistence_failures_total", "Cycles aborted by the dedup store.");
        describe_histogram!("fetch_duration_ms", "Per-source fetch wall time in milliseconds.");
        describe_gauge!("cycle_last_run_ts", "Unix ts when a check cycle last completed.");
    });
}

/// Fixed mapping from configured sources to fetcher implementations,
/// resolved once at startup.
pub struct SourceRegistry {
    fetchers: Vec<Arc<dyn SourceFetcher>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self { fetchers: Vec::new() }
    }

    pub fn register(&mut self, fetcher: Arc<dyn SourceFetcher>) {
        self.fetchers.push(fetcher);
    }

    pub fn from_config(cfg: &SourcesConfig) -> Self {
        let mut reg = Self::new();
        for entry in &cfg.boards {
            let fetcher: Arc<dyn SourceFetcher> = match entry.kind {
                BoardKind::Greenhouse => {
                    Arc::new(GreenhouseFetcher::from_board(entry.source, entry.slug.clone()))
                }
                BoardKind::Lever => {
                    Arc::new(LeverFetcher::from_site(entry.source, entry.slug.clone()))
                }
            };
            reg.register(fetcher);
        }
        reg
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }

    pub fn sources(&self) -> Vec<Source> {
        self.fetchers.iter().map(|f| f.source()).collect()
    }

    pub fn fetchers(&self) -> &[Arc<dyn SourceFetcher>] {
        &self.fetchers
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub struct FetchOutcome {
    pub raw: Vec<RawJob>,
    pub failed: Vec<Source>,
}

/// Run every registered fetcher concurrently, one task per source, each with
/// an independent wall-clock timeout. A source that errors or times out
/// contributes nothing and is reported in `failed`; it never aborts the
/// others. Results are sorted so downstream order does not depend on task
/// completion order.
pub async fn fetch_all(registry: &SourceRegistry, timeout: Duration) -> FetchOutcome {
    ensure_metrics_described();

    let mut set = JoinSet::new();
    for fetcher in registry.fetchers() {
        let fetcher = Arc::clone(fetcher);
        set.spawn(async move {
            let t0 = Instant::now();
            let res = match tokio::time::timeout(timeout, fetcher.fetch()).await {
                Ok(res) => res,
                Err(_) => Err(FetchError::Timeout(timeout.as_secs())),
            };
            (fetcher.source(), res, t0.elapsed())
        });
    }

    let mut raw = Vec::new();
    let mut failed = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((source, Ok(mut records), elapsed)) => {
                histogram!("fetch_duration_ms").record(elapsed.as_secs_f64() * 1_000.0);
                tracing::debug!(
                    source = source.as_str(),
                    records = records.len(),
                    ms = elapsed.as_millis() as u64,
                    "source fetched"
                );
                raw.append(&mut records);
            }
            Ok((source, Err(e), _)) => {
                tracing::warn!(error = ?e, source = source.as_str(), "source fetch failed");
                counter!("fetch_errors_total").increment(1);
                failed.push(source);
            }
            Err(e) => {
                tracing::warn!(error = ?e, "fetch task join error");
                counter!("fetch_errors_total").increment(1);
            }
        }
    }

    raw.sort_by(|a, b| (a.source, &a.url).cmp(&(b.source, &b.url)));
    failed.sort();

    FetchOutcome { raw, failed }
}
