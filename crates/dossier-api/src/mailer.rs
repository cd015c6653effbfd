use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Outbound mail transport.
pub trait Mailer: Send + Sync {
    fn send(&self, email: OutgoingEmail) -> anyhow::Result<()>;
}

/// Writes outgoing mail to the log instead of delivering it.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        info!(to = %email.to, subject = %email.subject, "Outgoing email");
        debug!(html = %email.html, "Email body");
        Ok(())
    }
}

pub fn verification_email(to: &str, first_name: &str, link: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Verify your email address".to_string(),
        html: format!(
            "<h2>Welcome, {first_name}!</h2>\
             <p>Please confirm your email address to activate your account.</p>\
             <p><a href=\"{link}\">Verify email</a></p>\
             <p>This link expires in 24 hours.</p>"
        ),
    }
}

pub fn password_reset_email(to: &str, first_name: &str, link: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        html: format!(
            "<h2>Hello {first_name},</h2>\
             <p>We received a request to reset your password.</p>\
             <p><a href=\"{link}\">Choose a new password</a></p>\
             <p>This link expires in 1 hour. If you did not ask for a reset you can ignore this email.</p>"
        ),
    }
}
