// tests/partial_failure.rs
mod common;

use std::sync::Arc;

use common::{mk_monitor, raw_job, CaptureNotifier, FailingFetcher, FailingNotifier, StaticFetcher};
use jobhunt_monitor::preferences::NotificationFrequency;
use jobhunt_monitor::store::prefs::PrefsStore;
use jobhunt_monitor::store::seen::SeenStore;
use jobhunt_monitor::Source;

/// A failing source contributes nothing but never blocks the others: their
/// postings are surfaced in the same cycle, with the failure reported in the
/// summary and in the notification diagnostics.
#[tokio::test]
async fn failed_source_does_not_block_other_sources() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(SeenStore::load(dir.path().join("seen.json")).unwrap());
    let prefs = Arc::new(PrefsStore::load(dir.path().join("prefs.json")).unwrap());
    prefs
        .update(1, |p| {
            p.set_notification_frequency(NotificationFrequency::Immediate)
        })
        .unwrap();

    let capture = Arc::new(CaptureNotifier::default());
    let monitor = mk_monitor(
        vec![
            Arc::new(FailingFetcher {
                source: Source::Reddit,
            }),
            Arc::new(StaticFetcher {
                source: Source::Gitlab,
                jobs: vec![raw_job(Source::Gitlab, "1", "Backend Engineer", "Remote")],
            }),
        ],
        seen,
        prefs,
        capture.clone(),
    );

    let summary = monitor.run_cycle().await.unwrap();
    assert_eq!(summary.new, 1);
    assert_eq!(summary.failed_sources, vec![Source::Reddit]);

    let batches = capture.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].failed_sources, vec![Source::Reddit]);
    assert_eq!(batches[0].postings[0].posting.source, Source::Gitlab);
}

/// A record the normalizer cannot use is dropped; the rest of the batch
/// survives.
#[tokio::test]
async fn unnormalizable_record_is_dropped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(SeenStore::load(dir.path().join("seen.json")).unwrap());
    let prefs = Arc::new(PrefsStore::load(dir.path().join("prefs.json")).unwrap());

    let broken = raw_job(Source::Gitlab, "1", "   ", "Remote"); // no usable title

    let capture = Arc::new(CaptureNotifier::default());
    let monitor = mk_monitor(
        vec![Arc::new(StaticFetcher {
            source: Source::Gitlab,
            jobs: vec![
                broken,
                raw_job(Source::Gitlab, "2", "Backend Engineer", "Remote"),
            ],
        })],
        seen,
        prefs,
        capture,
    );

    let summary = monitor.run_cycle().await.unwrap();
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.new, 1);
}

/// A failed delivery is reported and the payload is NOT re-enqueued: the
/// next flush has nothing to send (at-most-once).
#[tokio::test]
async fn failed_delivery_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(SeenStore::load(dir.path().join("seen.json")).unwrap());
    let prefs = Arc::new(PrefsStore::load(dir.path().join("prefs.json")).unwrap());
    prefs
        .update(1, |p| {
            p.set_notification_frequency(NotificationFrequency::Immediate)
        })
        .unwrap();

    let monitor = mk_monitor(
        vec![Arc::new(StaticFetcher {
            source: Source::Gitlab,
            jobs: vec![raw_job(Source::Gitlab, "1", "Backend Engineer", "Remote")],
        })],
        seen,
        prefs,
        Arc::new(FailingNotifier),
    );

    let summary = monitor.run_cycle().await.unwrap();
    assert_eq!(summary.flushed_batches, 0);
    assert_eq!(summary.lost_batches, 1);

    // Nothing pending afterwards; the batch is gone for good.
    let (sent, lost) = monitor.deliver_due(&[]).await;
    assert_eq!((sent, lost), (0, 0));
}
