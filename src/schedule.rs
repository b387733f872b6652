//! # Notification Scheduler
//! Per-user accumulation of matched postings and the decision of WHEN the
//! pending queue flushes, driven by the user's `notification_frequency`.
//!
//! The state machine per user is Idle (no pending items) → Accumulating
//! (pending items, `due_at` computed) → flush → Idle. Queues are drained
//! atomically under the scheduler lock, so a posting lands in at most one
//! flush payload; a failed send is never re-enqueued.
//!
//! All clock inputs are injected (`now`) so every transition is testable
//! without sleeping.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Timelike, Utc, Weekday};

use crate::matcher::{rank, ScoredPosting};
use crate::posting::Posting;
use crate::preferences::{NotificationFrequency, Preferences};

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    /// Pending count at which a digest user flushes without waiting.
    pub digest_threshold: usize,
    /// Upper bound on how long digest items may sit unflushed.
    pub digest_max_age_secs: i64,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            digest_threshold: 10,
            digest_max_age_secs: 24 * 3600,
        }
    }
}

fn default_notification_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("09:00 is a valid time")
}

#[derive(Debug, Default)]
struct UserQueue {
    pending: Vec<ScoredPosting>,
    due_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct NotificationScheduler {
    cfg: SchedulerCfg,
    queues: Mutex<HashMap<u64, UserQueue>>,
}

impl NotificationScheduler {
    pub fn new(cfg: SchedulerCfg) -> Self {
        Self {
            cfg,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Append a matched posting to the user's pending queue, computing the
    /// flush deadline on the Idle → Accumulating transition.
    pub fn enqueue(&self, prefs: &Preferences, posting: Posting, score: i32, now: DateTime<Utc>) {
        let mut guard = self.queues.lock().expect("scheduler mutex poisoned");
        let q = guard.entry(prefs.user_id).or_default();

        let was_idle = q.pending.is_empty();
        q.pending.push(ScoredPosting { posting, score });

        match prefs.notification_frequency {
            NotificationFrequency::Digest => {
                if was_idle {
                    // Age fallback: never let a quiet filter starve forever.
                    q.due_at = Some(now + Duration::seconds(self.cfg.digest_max_age_secs));
                }
                if q.pending.len() >= self.cfg.digest_threshold {
                    q.due_at = Some(now);
                }
            }
            freq => {
                if was_idle {
                    q.due_at = Some(next_boundary(freq, prefs.notification_time, now));
                }
            }
        }
    }

    /// Drain every queue whose deadline has passed. Each drained payload is
    /// ordered by score descending, ties by `first_seen_at` ascending, and
    /// the user returns to Idle. The caller owns delivery (and its failures).
    pub fn flush_due(&self, now: DateTime<Utc>) -> Vec<(u64, Vec<ScoredPosting>)> {
        let mut guard = self.queues.lock().expect("scheduler mutex poisoned");

        let mut out = Vec::new();
        for (user_id, q) in guard.iter_mut() {
            if q.pending.is_empty() {
                continue;
            }
            let due = match q.due_at {
                Some(due) => due,
                None => continue,
            };
            if now < due {
                continue;
            }

            let mut batch = std::mem::take(&mut q.pending);
            q.due_at = None;
            rank(&mut batch);
            out.push((*user_id, batch));
        }

        out.sort_by_key(|(user_id, _)| *user_id);
        out
    }

    pub fn pending_count(&self, user_id: u64) -> usize {
        self.queues
            .lock()
            .expect("scheduler mutex poisoned")
            .get(&user_id)
            .map(|q| q.pending.len())
            .unwrap_or(0)
    }
}

/// Next flush boundary strictly after `now` for time-driven frequencies.
fn next_boundary(
    freq: NotificationFrequency,
    notification_time: Option<NaiveTime>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let at = notification_time.unwrap_or_else(default_notification_time);
    match freq {
        NotificationFrequency::Immediate => now,
        NotificationFrequency::Hourly => {
            let top = now
                .with_minute(0)
                .and_then(|t| t.with_second(0))
                .and_then(|t| t.with_nanosecond(0))
                .unwrap_or(now);
            top + Duration::hours(1)
        }
        NotificationFrequency::Daily => {
            let today = now.date_naive().and_time(at).and_utc();
            if today > now {
                today
            } else {
                today + Duration::days(1)
            }
        }
        NotificationFrequency::Weekly => {
            // Fixed reference day: Monday, at the user's notification time.
            let mut date = now.date_naive();
            loop {
                if date.weekday() == Weekday::Mon {
                    let candidate = date.and_time(at).and_utc();
                    if candidate > now {
                        return candidate;
                    }
                }
                date = date + Duration::days(1);
            }
        }
        NotificationFrequency::Digest => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::Source;
    use chrono::TimeZone;

    fn mk_posting(id: &str, first_seen_at: DateTime<Utc>) -> Posting {
        Posting {
            id: id.to_string(),
            source: Source::Gitlab,
            title: format!("Engineer {id}"),
            categories: Vec::new(),
            location: "Remote".to_string(),
            company: "gitlab".to_string(),
            experience_level: None,
            salary: None,
            work_arrangement: None,
            url: format!("https://x.test/{id}"),
            first_seen_at,
        }
    }

    fn prefs_with(freq: NotificationFrequency) -> Preferences {
        let mut p = Preferences::new(1);
        p.set_notification_frequency(freq);
        p
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap() // a Monday
    }

    #[test]
    fn immediate_flushes_on_the_same_tick() {
        let s = NotificationScheduler::new(SchedulerCfg::default());
        let prefs = prefs_with(NotificationFrequency::Immediate);
        let now = at(8, 0);

        s.enqueue(&prefs, mk_posting("a", now), 0, now);
        let flushed = s.flush_due(now);
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].1.len(), 1);
        assert_eq!(s.pending_count(1), 0);
    }

    #[test]
    fn daily_flushes_once_at_notification_time() {
        let s = NotificationScheduler::new(SchedulerCfg::default());
        let mut prefs = prefs_with(NotificationFrequency::Daily);
        prefs.set_notification_time(NaiveTime::from_hms_opt(9, 0, 0));

        // Three arrivals: 08:00, 08:30 (before the boundary), 10:00 (after).
        s.enqueue(&prefs, mk_posting("a", at(8, 0)), 0, at(8, 0));
        s.enqueue(&prefs, mk_posting("b", at(8, 30)), 0, at(8, 30));

        assert!(s.flush_due(at(8, 45)).is_empty());

        let flushed = s.flush_due(at(9, 0));
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].1.len(), 2);

        // The 10:00 arrival waits for the NEXT day's 09:00.
        s.enqueue(&prefs, mk_posting("c", at(10, 0)), 0, at(10, 0));
        assert!(s.flush_due(at(23, 59)).is_empty());

        let next_day = at(9, 0) + Duration::days(1);
        let flushed = s.flush_due(next_day);
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].1.len(), 1);
        assert_eq!(flushed[0].1[0].posting.id, "c");
    }

    #[test]
    fn hourly_waits_for_the_top_of_the_hour() {
        let s = NotificationScheduler::new(SchedulerCfg::default());
        let prefs = prefs_with(NotificationFrequency::Hourly);

        s.enqueue(&prefs, mk_posting("a", at(8, 20)), 0, at(8, 20));
        assert!(s.flush_due(at(8, 59)).is_empty());
        assert_eq!(s.flush_due(at(9, 0)).len(), 1);
    }

    #[test]
    fn weekly_flushes_on_monday() {
        let s = NotificationScheduler::new(SchedulerCfg::default());
        let prefs = prefs_with(NotificationFrequency::Weekly);

        // Enqueued Monday 10:00, after this week's 09:00 boundary: waits a
        // full week.
        let enq = at(10, 0);
        s.enqueue(&prefs, mk_posting("a", enq), 0, enq);
        assert!(s.flush_due(enq + Duration::days(3)).is_empty());
        assert_eq!(s.flush_due(at(9, 0) + Duration::days(7)).len(), 1);
    }

    #[test]
    fn digest_flushes_at_threshold() {
        let cfg = SchedulerCfg {
            digest_threshold: 3,
            digest_max_age_secs: 24 * 3600,
        };
        let s = NotificationScheduler::new(cfg);
        let prefs = prefs_with(NotificationFrequency::Digest);
        let now = at(8, 0);

        s.enqueue(&prefs, mk_posting("a", now), 0, now);
        s.enqueue(&prefs, mk_posting("b", now), 0, now);
        assert!(s.flush_due(now).is_empty());

        s.enqueue(&prefs, mk_posting("c", now), 0, now);
        let flushed = s.flush_due(now);
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].1.len(), 3);
    }

    #[test]
    fn digest_age_fallback_prevents_starvation() {
        let cfg = SchedulerCfg {
            digest_threshold: 100,
            digest_max_age_secs: 3600,
        };
        let s = NotificationScheduler::new(cfg);
        let prefs = prefs_with(NotificationFrequency::Digest);
        let now = at(8, 0);

        s.enqueue(&prefs, mk_posting("a", now), 0, now);
        assert!(s.flush_due(now + Duration::minutes(30)).is_empty());
        assert_eq!(s.flush_due(now + Duration::hours(1)).len(), 1);
    }

    #[test]
    fn flush_payload_is_ordered_by_score_then_age() {
        let s = NotificationScheduler::new(SchedulerCfg::default());
        let prefs = prefs_with(NotificationFrequency::Immediate);
        let now = at(8, 0);

        s.enqueue(&prefs, mk_posting("low", now), 0, now);
        s.enqueue(&prefs, mk_posting("high", now), 2, now);
        let flushed = s.flush_due(now);
        assert_eq!(flushed[0].1[0].posting.id, "high");
        assert_eq!(flushed[0].1[1].posting.id, "low");
    }

    #[test]
    fn users_flush_independently() {
        let s = NotificationScheduler::new(SchedulerCfg::default());
        let immediate = prefs_with(NotificationFrequency::Immediate);
        let mut daily = Preferences::new(2);
        daily.set_notification_frequency(NotificationFrequency::Daily);

        let now = at(8, 0);
        s.enqueue(&immediate, mk_posting("a", now), 0, now);
        s.enqueue(&daily, mk_posting("a", now), 0, now);

        let flushed = s.flush_due(now);
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].0, 1);
        assert_eq!(s.pending_count(2), 1);
    }
}
