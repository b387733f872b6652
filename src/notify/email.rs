use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{render_batch, NotificationBatch, Notifier, NotifyError};

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    /// Build from SMTP_HOST / SMTP_USER / SMTP_PASS / NOTIFY_EMAIL_FROM /
    /// NOTIFY_EMAIL_TO. Any missing or invalid variable disables the sink.
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("SMTP_HOST").context("SMTP_HOST missing")?;
        let user = std::env::var("SMTP_USER").context("SMTP_USER missing")?;
        let pass = std::env::var("SMTP_PASS").context("SMTP_PASS missing")?;
        let from_addr =
            std::env::var("NOTIFY_EMAIL_FROM").context("NOTIFY_EMAIL_FROM missing")?;
        let to_addr = std::env::var("NOTIFY_EMAIL_TO").context("NOTIFY_EMAIL_TO missing")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr.parse().context("invalid NOTIFY_EMAIL_FROM")?;
        let to = to_addr.parse().context("invalid NOTIFY_EMAIL_TO")?;

        Ok(Self { mailer, from, to })
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, batch: &NotificationBatch) -> Result<(), NotifyError> {
        let subject = format!("{} new job posting(s)", batch.postings.len());
        let body = format!(
            "{}\n\nGenerated at {}\n",
            render_batch(batch),
            batch.generated_at.to_rfc3339()
        );

        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| NotifyError::Email(format!("build email: {e}")))?;

        self.mailer
            .send(msg)
            .await
            .map_err(|e| NotifyError::Email(format!("send email: {e}")))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
