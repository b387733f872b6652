pub mod discord;
pub mod email;
pub mod slack;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use crate::matcher::ScoredPosting;
use crate::posting::Source;

/// How many postings a single message spells out before truncating.
const MAX_RENDERED_POSTINGS: usize = 10;

/// One flush for one user: scored postings ordered by the matcher's rank,
/// plus the cycle's failed-source diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationBatch {
    pub user_id: u64,
    pub postings: Vec<ScoredPosting>,
    pub failed_sources: Vec<Source>,
    pub generated_at: DateTime<Utc>,
}

/// Non-fatal: a lost batch is reported and counted, never retried into a
/// storm. Sinks may retry internally within their own bounded policy.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("email error: {0}")]
    Email(String),

    #[error("all notification sinks failed: {0}")]
    AllSinksFailed(String),
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, batch: &NotificationBatch) -> Result<(), NotifyError>;
    fn name(&self) -> &'static str;
}

/// Plain-text rendering shared by every sink.
pub fn render_batch(batch: &NotificationBatch) -> String {
    let mut lines = Vec::new();
    for sp in batch.postings.iter().take(MAX_RENDERED_POSTINGS) {
        let p = &sp.posting;
        let mut line = format!("• {} — {} ({})", p.title, p.company, p.location);
        if sp.score > 0 {
            line.push_str(&format!(" [priority {}]", sp.score));
        }
        line.push_str(&format!("\n  {}", p.url));
        lines.push(line);
    }
    if batch.postings.len() > MAX_RENDERED_POSTINGS {
        lines.push(format!(
            "... and {} more",
            batch.postings.len() - MAX_RENDERED_POSTINGS
        ));
    }
    if !batch.failed_sources.is_empty() {
        let names: Vec<&str> = batch.failed_sources.iter().map(|s| s.as_str()).collect();
        lines.push(format!("Sources skipped this check: {}", names.join(", ")));
    }
    lines.join("\n")
}

/// Fan-out over the configured sinks. Partial failure is logged and
/// tolerated; the batch counts as lost only when every sink fails.
pub struct NotifierMux {
    sinks: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn push(&mut self, sink: Box<dyn Notifier>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Assemble sinks from the environment. Absent variables disable a sink;
    /// a mux with no sinks logs batches instead of delivering them.
    pub fn from_env() -> Self {
        let mut mux = Self::new();
        if let Ok(url) = std::env::var("DISCORD_WEBHOOK_URL") {
            mux.push(Box::new(discord::DiscordNotifier::new(url)));
        }
        if let Ok(url) = std::env::var("SLACK_WEBHOOK_URL") {
            mux.push(Box::new(slack::SlackNotifier::new(url)));
        }
        if std::env::var("SMTP_HOST").is_ok() {
            match email::EmailNotifier::from_env() {
                Ok(sink) => mux.push(Box::new(sink)),
                Err(e) => tracing::warn!(error = ?e, "email sink disabled"),
            }
        }
        mux
    }
}

impl Default for NotifierMux {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Notifier for NotifierMux {
    async fn send(&self, batch: &NotificationBatch) -> Result<(), NotifyError> {
        if self.sinks.is_empty() {
            tracing::info!(
                user = batch.user_id,
                postings = batch.postings.len(),
                "no notification sinks configured; batch logged only"
            );
            return Ok(());
        }

        let mut delivered = 0usize;
        let mut last_err: Option<NotifyError> = None;
        for sink in &self.sinks {
            match sink.send(batch).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        error = ?e,
                        sink = sink.name(),
                        user = batch.user_id,
                        "sink send failed"
                    );
                    last_err = Some(e);
                }
            }
        }

        if delivered == 0 {
            let detail = last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no sinks attempted".to_string());
            return Err(NotifyError::AllSinksFailed(detail));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mux"
    }
}
