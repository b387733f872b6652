//! # Monitor Loop
//! Ties the pipeline together on a fixed interval: fetch every source →
//! normalize → dedup → match against every active user → route into the
//! notification scheduler → deliver due batches.
//!
//! Cycle execution is serialized behind an async gate: a manual check that
//! arrives while a scheduled cycle is in flight waits for it, then runs its
//! own cycle — never concurrently, never silently dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::matcher;
use crate::notify::{NotificationBatch, Notifier};
use crate::posting::{Posting, Source};
use crate::preferences::Preferences;
use crate::schedule::NotificationScheduler;
use crate::sources::{self, normalize, SourceRegistry};
use crate::store::prefs::PrefsStore;
use crate::store::seen::SeenStore;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CycleError {
    /// Seen-ids could not be durably recorded. The cycle delivers nothing
    /// and is retried wholesale on the next interval — re-notification
    /// amplification is worse than a late notification.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub fetched: usize,
    pub dropped: usize,
    pub new: usize,
    pub matched: usize,
    pub flushed_batches: usize,
    pub lost_batches: usize,
    pub failed_sources: Vec<Source>,
}

#[derive(Clone, Copy, Debug)]
pub struct MonitorCfg {
    pub check_interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(7_200),
            fetch_timeout: Duration::from_secs(60),
        }
    }
}

pub struct Monitor {
    registry: SourceRegistry,
    seen: Arc<SeenStore>,
    prefs: Arc<PrefsStore>,
    scheduler: Arc<NotificationScheduler>,
    notifier: Arc<dyn Notifier>,
    cfg: MonitorCfg,
    cycle_gate: tokio::sync::Mutex<()>,
}

impl Monitor {
    pub fn new(
        registry: SourceRegistry,
        seen: Arc<SeenStore>,
        prefs: Arc<PrefsStore>,
        scheduler: Arc<NotificationScheduler>,
        notifier: Arc<dyn Notifier>,
        cfg: MonitorCfg,
    ) -> Self {
        Self {
            registry,
            seen,
            prefs,
            scheduler,
            notifier,
            cfg,
            cycle_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn prefs_store(&self) -> &Arc<PrefsStore> {
        &self.prefs
    }

    /// Run one full check cycle. Serialized: concurrent callers queue on the
    /// gate and each runs its own complete cycle.
    pub async fn run_cycle(&self) -> Result<CycleSummary, CycleError> {
        let _gate = self.cycle_gate.lock().await;
        self.run_cycle_locked().await
    }

    /// Manual trigger: same cycle logic, same gate, does not touch the
    /// timer's own schedule.
    pub async fn check_now(&self) -> Result<CycleSummary, CycleError> {
        self.run_cycle().await
    }

    async fn run_cycle_locked(&self) -> Result<CycleSummary, CycleError> {
        let outcome = sources::fetch_all(&self.registry, self.cfg.fetch_timeout).await;
        let now = Utc::now();
        let fetched = outcome.raw.len();

        let mut normalized = Vec::with_capacity(fetched);
        let mut dropped = 0usize;
        for raw in outcome.raw {
            match normalize::normalize(raw, now) {
                Some(p) => normalized.push(p),
                None => dropped += 1,
            }
        }
        counter!("postings_dropped_total").increment(dropped as u64);

        // The one cycle-wide shared mutation. On failure nothing below runs.
        let new = match self.seen.filter_new(normalized) {
            Ok(new) => new,
            Err(e) => {
                counter!("cycle_persistence_failures_total").increment(1);
                tracing::error!(error = ?e, "dedup store commit failed; aborting cycle");
                return Err(e.into());
            }
        };
        counter!("postings_new_total").increment(new.len() as u64);

        let users = self.prefs.all_active();
        let mut matched = 0usize;
        for posting in &new {
            for prefs in &users {
                if matcher::matches(posting, prefs) {
                    let score = matcher::priority_score(posting, prefs);
                    self.scheduler.enqueue(prefs, posting.clone(), score, now);
                    matched += 1;
                }
            }
        }
        counter!("match_hits_total").increment(matched as u64);

        let (flushed_batches, lost_batches) = self.deliver_due(&outcome.failed).await;

        counter!("cycle_runs_total").increment(1);
        gauge!("cycle_last_run_ts").set(now.timestamp() as f64);

        let summary = CycleSummary {
            fetched,
            dropped,
            new: new.len(),
            matched,
            flushed_batches,
            lost_batches,
            failed_sources: outcome.failed,
        };
        tracing::info!(
            fetched = summary.fetched,
            new = summary.new,
            matched = summary.matched,
            flushed = summary.flushed_batches,
            failed_sources = summary.failed_sources.len(),
            "check cycle complete"
        );
        Ok(summary)
    }

    /// Flush every due user queue and deliver the batches. A failed delivery
    /// is reported and counted; the payload is not re-enqueued.
    pub async fn deliver_due(&self, failed_sources: &[Source]) -> (usize, usize) {
        let now = Utc::now();
        let batches = self.scheduler.flush_due(now);

        let mut sent = 0usize;
        let mut lost = 0usize;
        for (user_id, postings) in batches {
            let batch = NotificationBatch {
                user_id,
                postings,
                failed_sources: failed_sources.to_vec(),
                generated_at: now,
            };
            match self.notifier.send(&batch).await {
                Ok(()) => {
                    counter!("notify_sent_total").increment(1);
                    sent += 1;
                }
                Err(e) => {
                    counter!("notify_errors_total").increment(1);
                    tracing::warn!(error = ?e, user = batch.user_id, "notification batch lost");
                    lost += 1;
                }
            }
        }
        (sent, lost)
    }

    /// Timer-driven loop. The first cycle runs right away, then on the fixed
    /// interval; manual checks share the gate but not this timer.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.cfg.check_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = monitor.run_cycle().await {
                    tracing::error!(error = ?e, "scheduled cycle failed");
                }
            }
        })
    }

    /// Lightweight ticker that honors daily/weekly flush boundaries between
    /// cycles.
    pub fn spawn_flush_ticker(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let (sent, lost) = monitor.deliver_due(&[]).await;
                if sent + lost > 0 {
                    tracing::debug!(sent, lost, "flush tick delivered");
                }
            }
        })
    }

    /// Fresh fetch of every source for the on-demand dump. Applies an ad-hoc
    /// filter when given and never touches the seen set.
    pub async fn dump_postings(
        &self,
        filter: Option<&Preferences>,
    ) -> HashMap<Source, Vec<Posting>> {
        let outcome = sources::fetch_all(&self.registry, self.cfg.fetch_timeout).await;
        let now = Utc::now();

        let mut by_source: HashMap<Source, Vec<Posting>> = HashMap::new();
        for raw in outcome.raw {
            let Some(posting) = normalize::normalize(raw, now) else {
                continue;
            };
            if let Some(prefs) = filter {
                if !matcher::matches(&posting, prefs) {
                    continue;
                }
            }
            by_source.entry(posting.source).or_default().push(posting);
        }
        by_source
    }
}
