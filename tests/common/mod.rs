//! Shared harness for integration tests: canned fetchers, a capturing
//! notifier and a monitor builder wired to temp-file stores.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use jobhunt_monitor::monitor::{Monitor, MonitorCfg};
use jobhunt_monitor::notify::{NotificationBatch, Notifier, NotifyError};
use jobhunt_monitor::schedule::{NotificationScheduler, SchedulerCfg};
use jobhunt_monitor::sources::types::{FetchError, RawJob, SourceFetcher};
use jobhunt_monitor::sources::SourceRegistry;
use jobhunt_monitor::store::prefs::PrefsStore;
use jobhunt_monitor::store::seen::SeenStore;
use jobhunt_monitor::Source;

pub struct StaticFetcher {
    pub source: Source,
    pub jobs: Vec<RawJob>,
}

#[async_trait::async_trait]
impl SourceFetcher for StaticFetcher {
    async fn fetch(&self) -> Result<Vec<RawJob>, FetchError> {
        Ok(self.jobs.clone())
    }
    fn source(&self) -> Source {
        self.source
    }
}

pub struct FailingFetcher {
    pub source: Source,
}

#[async_trait::async_trait]
impl SourceFetcher for FailingFetcher {
    async fn fetch(&self) -> Result<Vec<RawJob>, FetchError> {
        Err(FetchError::Timeout(1))
    }
    fn source(&self) -> Source {
        self.source
    }
}

#[derive(Default)]
pub struct CaptureNotifier {
    pub batches: Mutex<Vec<NotificationBatch>>,
}

#[async_trait::async_trait]
impl Notifier for CaptureNotifier {
    async fn send(&self, batch: &NotificationBatch) -> Result<(), NotifyError> {
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "capture"
    }
}

pub struct FailingNotifier;

#[async_trait::async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _batch: &NotificationBatch) -> Result<(), NotifyError> {
        Err(NotifyError::Email("sink down".to_string()))
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

pub fn raw_job(source: Source, id: &str, title: &str, location: &str) -> RawJob {
    RawJob {
        source,
        external_id: Some(id.to_string()),
        title: title.to_string(),
        url: format!("https://{}.test/jobs/{id}", source.as_str()),
        location: location.to_string(),
        company: source.as_str().to_string(),
        description: None,
        salary_text: None,
        salary_floor: None,
        arrangement_hint: None,
    }
}

pub fn mk_monitor(
    fetchers: Vec<Arc<dyn SourceFetcher>>,
    seen: Arc<SeenStore>,
    prefs: Arc<PrefsStore>,
    notifier: Arc<dyn Notifier>,
) -> Arc<Monitor> {
    let mut registry = SourceRegistry::new();
    for f in fetchers {
        registry.register(f);
    }
    let scheduler = Arc::new(NotificationScheduler::new(SchedulerCfg::default()));
    Arc::new(Monitor::new(
        registry,
        seen,
        prefs,
        scheduler,
        notifier,
        MonitorCfg {
            check_interval: Duration::from_secs(3600),
            fetch_timeout: Duration::from_secs(5),
        },
    ))
}
