/// Transactional notification sink
///
/// Account signup and deletion each send one email. Sending is
/// fire-and-forget: [`dispatch`] spawns the delivery onto the runtime and
/// returns immediately, and a failed delivery is logged at WARN and otherwise
/// ignored. It never changes the outcome of the request that triggered it.
///
/// # Mailers
///
/// - [`sendgrid::SendGridMailer`]: SendGrid v3 `mail/send` over HTTPS
/// - [`LogMailer`]: writes the message to the log; used when no API key is set
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskapp_shared::email::{dispatch, Email, LogMailer, Mailer};
///
/// # async fn example() {
/// let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
/// dispatch(mailer, Email::welcome("noreply@taskapp.local", "a@x.com", "Ann"));
/// # }
/// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub mod sendgrid;

pub const WELCOME_SUBJECT: &str = "Thanks for joining Task App";
pub const CANCELLATION_SUBJECT: &str = "Sorry to see you go :(";

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail transport failed: {0}")]
    Transport(String),

    #[error("Mail provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// A plain-text email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub text: String,
}

impl Email {
    /// Sent after a successful signup
    pub fn welcome(from: &str, to: &str, name: &str) -> Self {
        Self {
            to: to.to_string(),
            from: from.to_string(),
            subject: WELCOME_SUBJECT.to_string(),
            text: format!(
                "Hello {}, welcome to Task App. Let me know how it goes.",
                name
            ),
        }
    }

    /// Sent after an account is deleted
    pub fn cancellation(from: &str, to: &str, name: &str) -> Self {
        Self {
            to: to.to_string(),
            from: from.to_string(),
            subject: CANCELLATION_SUBJECT.to_string(),
            text: format!(
                "Hello {}, I am sorry to see you go. Let me know what I could have done to make you stay.",
                name
            ),
        }
    }
}

/// Outbound email transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Mailer that only logs what it would have sent
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "Email delivery disabled; not sending");
        Ok(())
    }
}

/// Sends `email` in the background
///
/// Must be called from within a Tokio runtime.
pub fn dispatch(mailer: Arc<dyn Mailer>, email: Email) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&email).await {
            warn!(to = %email.to, subject = %email.subject, error = %e, "Failed to send email");
        }
    });
}
