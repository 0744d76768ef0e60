use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

/// Delivers a plaintext message to an email address. Failures surface to the
/// caller so the password-reset flow can roll back.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// SMTP delivery over STARTTLS via `lettre`.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?.port(config.port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.transport.send(email).await?;
        info!(to, subject, "email sent");
        Ok(())
    }
}

/// Stand-in used when `SMTP_HOST` is not set. Every send fails, which the
/// forgot-password handler observes and surfaces as a 500.
pub struct UnconfiguredMailer;

#[async_trait]
impl Mailer for UnconfiguredMailer {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
        anyhow::bail!("SMTP transport is not configured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_mailer_always_fails() {
        let err = UnconfiguredMailer
            .send("user@example.com", "subject", "body")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }
}
