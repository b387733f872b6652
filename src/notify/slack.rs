use reqwest::Client;

use super::{render_batch, NotificationBatch, Notifier, NotifyError};

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
}

impl SlackNotifier {
    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, batch: &NotificationBatch) -> Result<(), NotifyError> {
        let text = format!(
            "*{} new job posting(s)*\n{}",
            batch.postings.len(),
            render_batch(batch)
        );
        let body = serde_json::json!({ "text": text });

        let rsp = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await?;
        let status = rsp.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
