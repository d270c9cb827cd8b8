use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::Settings;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("missing mail setting `{0}`")]
    Missing(&'static str),

    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
}

/// Outbound account notifications. Delivery is fire-and-forget: failures
/// are logged and never reach the caller.
pub trait Notifier: Send + Sync {
    fn send_validation(&self, email: &str, customer_id: Uuid);
}

/// Used when account validation mail is switched off.
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
    fn send_validation(&self, email: &str, customer_id: Uuid) {
        debug!(%email, %customer_id, "validation email disabled");
    }
}

pub struct SmtpNotifier {
    transport: SmtpTransport,
    from: Mailbox,
    settings: Settings,
}

impl SmtpNotifier {
    pub fn from_settings(settings: &Settings) -> Result<Self, NotifyError> {
        let host = settings
            .smtp_host
            .as_deref()
            .ok_or(NotifyError::Missing("SMTP_HOST"))?;
        let from = settings
            .mail_from
            .as_deref()
            .ok_or(NotifyError::Missing("MAIL_FROM"))?
            .parse::<Mailbox>()?;

        let mut builder = SmtpTransport::relay(host)?;
        if let (Some(user), Some(password)) = (&settings.smtp_username, &settings.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            settings: settings.clone(),
        })
    }

    fn validation_message(&self, email: &str, customer_id: Uuid) -> Result<Message, NotifyError> {
        let url = self.settings.validation_url(customer_id);
        Ok(Message::builder()
            .from(self.from.clone())
            .to(email.parse::<Mailbox>()?)
            .subject("Email verification")
            .header(ContentType::TEXT_HTML)
            .body(validation_body(&url))?)
    }
}

impl Notifier for SmtpNotifier {
    fn send_validation(&self, email: &str, customer_id: Uuid) {
        let message = match self.validation_message(email, customer_id) {
            Ok(message) => message,
            Err(err) => {
                error!(error = %err, %customer_id, "validation email not sent");
                return;
            }
        };
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || match transport.send(&message) {
            Ok(_) => info!(%customer_id, "validation email sent"),
            Err(err) => error!(error = %err, %customer_id, "validation email not sent"),
        });
    }
}

fn validation_body(url: &str) -> String {
    format!(
        "<div style=\"max-width: 600px; margin: 0 auto; text-align: center; padding: 20px;\">\
         <h3>Thanks for your registration</h3>\
         <p>Please confirm your email by clicking the link below:</p>\
         <a href=\"{url}\">Click here</a>\
         </div>"
    )
}
