// tests/persistence_failure.rs
mod common;

use std::sync::Arc;

use common::{mk_monitor, raw_job, CaptureNotifier, StaticFetcher};
use jobhunt_monitor::monitor::CycleError;
use jobhunt_monitor::preferences::NotificationFrequency;
use jobhunt_monitor::store::prefs::PrefsStore;
use jobhunt_monitor::store::seen::SeenStore;
use jobhunt_monitor::Source;

/// If the dedup store cannot durably commit, the cycle aborts before any
/// matching or notification, and the next cycle retries wholesale.
#[tokio::test]
async fn persistence_failure_aborts_cycle_before_notifying() {
    let dir = tempfile::tempdir().unwrap();
    // A plain file where the store expects its parent directory: the atomic
    // write fails while load-from-empty still succeeds.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    let seen = Arc::new(SeenStore::load(blocker.join("seen.json")).unwrap());

    let prefs = Arc::new(PrefsStore::load(dir.path().join("prefs.json")).unwrap());
    prefs
        .update(1, |p| {
            p.set_notification_frequency(NotificationFrequency::Immediate)
        })
        .unwrap();

    let capture = Arc::new(CaptureNotifier::default());
    let monitor = mk_monitor(
        vec![Arc::new(StaticFetcher {
            source: Source::Gitlab,
            jobs: vec![raw_job(Source::Gitlab, "1", "Backend Engineer", "Remote")],
        })],
        seen.clone(),
        prefs,
        capture.clone(),
    );

    let res = monitor.run_cycle().await;
    assert!(matches!(res, Err(CycleError::Persistence(_))));

    // Nothing was delivered and nothing was committed.
    assert!(capture.batches.lock().unwrap().is_empty());
    assert!(seen.is_empty());
}
