// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod matcher;
pub mod metrics;
pub mod monitor;
pub mod notify;
pub mod posting;
pub mod preferences;
pub mod schedule;
pub mod sources;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::matcher::{matches, priority_score, ScoredPosting};
pub use crate::monitor::{CycleError, CycleSummary, Monitor, MonitorCfg};
pub use crate::notify::{NotificationBatch, Notifier, NotifierMux, NotifyError};
pub use crate::posting::{ExperienceLevel, Posting, SalaryBucket, Source, WorkArrangement};
pub use crate::preferences::{NotificationFrequency, Preferences};
pub use crate::schedule::{NotificationScheduler, SchedulerCfg};
pub use crate::sources::types::{FetchError, RawJob, SourceFetcher};
pub use crate::store::{prefs::PrefsStore, seen::SeenStore, StoreError};
