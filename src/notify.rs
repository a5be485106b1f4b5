//! # Notifier
//!
//! SMTP delivery of the rendered report. Delivery is best-effort: the
//! orchestrator logs a failure and moves on, since the snapshot was
//! already persisted and a lost mail only means a quiet week.

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{config::Config, error::AppError};

pub const SUBJECT: &str = "Codeforces Weekly Update";

pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    recipients: Vec<Mailbox>,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?;
        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let sender: Mailbox = config.sender.parse()?;
        let recipients = config
            .recipients
            .iter()
            .map(|r| r.parse())
            .collect::<Result<Vec<Mailbox>, _>>()?;

        Ok(Self {
            transport: builder.build(),
            sender,
            recipients,
        })
    }

    pub async fn send(&self, html: String) -> Result<(), AppError> {
        let mut message = Message::builder()
            .from(self.sender.clone())
            .subject(SUBJECT)
            .header(ContentType::TEXT_HTML);
        for recipient in &self.recipients {
            message = message.to(recipient.clone());
        }

        self.transport.send(message.body(html)?).await?;
        Ok(())
    }
}
