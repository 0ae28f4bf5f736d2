use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{Notification, Notifier};
use crate::config::settings::env_nonempty;
use crate::error::DeliveryError;

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    /// `Ok(None)` when `SMTP_HOST` is unset; an error when it is set but the
    /// rest of the SMTP settings are missing or invalid.
    pub fn from_env() -> Result<Option<Self>> {
        let Some(host) = env_nonempty("SMTP_HOST") else {
            return Ok(None);
        };
        let user = env_nonempty("SMTP_USER").context("SMTP_USER missing")?;
        let pass = env_nonempty("SMTP_PASS").context("SMTP_PASS missing")?;
        let from_addr = env_nonempty("NOTIFY_EMAIL_FROM").context("NOTIFY_EMAIL_FROM missing")?;
        let to_addr = env_nonempty("NOTIFY_EMAIL_TO").context("NOTIFY_EMAIL_TO missing")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr.parse().context("invalid NOTIFY_EMAIL_FROM")?;
        let to = to_addr.parse().context("invalid NOTIFY_EMAIL_TO")?;

        Ok(Some(Self { mailer, from, to }))
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, msg: &Notification) -> Result<(), DeliveryError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(msg.title.clone())
            .header(header::ContentType::TEXT_PLAIN)
            .body(msg.text.clone())
            .map_err(|e| DeliveryError::Email(format!("build email: {e}")))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| DeliveryError::Email(e.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
