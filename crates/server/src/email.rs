//! # Email Sender
//!
//! Fire-and-forget templated email over SMTP. Sends are spawned onto the
//! runtime and failures are logged; a failed send never fails the
//! operation that triggered it. Without SMTP configuration the mailer
//! degrades to logging the would-be message.

use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport,
    AsyncTransport,
    Message,
    Tokio1Executor,
};
use tracing::{info, warn};

/// SMTP configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub host:     String,
    pub port:     u16,
    pub username: String,
    pub password: String,
    pub from:     String,
}

impl EmailConfig {
    /// Load SMTP settings from the environment; `None` when no host is
    /// configured (development mode).
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("MERIDIAN_SMTP_HOST").ok()?;
        Some(Self {
            host,
            port:     std::env::var("MERIDIAN_SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            username: std::env::var("MERIDIAN_SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("MERIDIAN_SMTP_PASSWORD").unwrap_or_default(),
            from:     std::env::var("MERIDIAN_SMTP_FROM")
                .unwrap_or_else(|_| "Meridian <no-reply@meridian.example>".to_string()),
        })
    }
}

/// Outbound email sender.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from:      String,
}

impl Mailer {
    /// Build a mailer from configuration; falls back to log-only mode when
    /// the transport cannot be constructed.
    pub fn new(config: Option<EmailConfig>) -> Self {
        let Some(config) = config else {
            return Self {
                transport: None,
                from:      "Meridian <no-reply@meridian.example>".to_string(),
            };
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map(|builder| {
                builder
                    .port(config.port)
                    .credentials(Credentials::new(
                        config.username.clone(),
                        config.password.clone(),
                    ))
                    .build()
            })
            .map_err(|e| {
                warn!(host = %config.host, error = %e, "SMTP transport unavailable, falling back to log-only mail");
                e
            })
            .ok();

        Self {
            transport,
            from: config.from,
        }
    }

    /// Log-only mailer for tests.
    #[must_use]
    pub fn disabled() -> Self { Self::new(None) }

    /// Queue an email. Returns immediately; delivery happens on a spawned
    /// task and failures are only logged.
    pub fn send(&self, to: &str, subject: &str, body: String) {
        let Some(transport) = self.transport.clone() else {
            info!(to = %to, subject = %subject, "Email suppressed (no SMTP configured)");
            return;
        };

        let message = Message::builder()
            .from(match self.from.parse() {
                Ok(mbox) => mbox,
                Err(e) => {
                    warn!(from = %self.from, error = %e, "Invalid from address, dropping email");
                    return;
                },
            })
            .to(match to.parse() {
                Ok(mbox) => mbox,
                Err(e) => {
                    warn!(to = %to, error = %e, "Invalid recipient address, dropping email");
                    return;
                },
            })
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body);

        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!(to = %to, error = %e, "Failed to build email, dropping");
                return;
            },
        };

        let to = to.to_string();
        let subject = subject.to_string();
        tokio::spawn(async move {
            match transport.send(message).await {
                Ok(_) => info!(to = %to, subject = %subject, "Email sent"),
                Err(e) => warn!(to = %to, subject = %subject, error = %e, "Email send failed"),
            }
        });
    }

    /// Invitation email with the acceptance token.
    pub fn send_invitation(&self, to: &str, organization_name: &str, token: &str) {
        let body = format!(
            "You have been invited to join {} on Meridian.\n\nUse this invitation token to accept: \
             {}\n\nThe invitation expires in 7 days.",
            organization_name, token
        );
        self.send(to, &format!("Invitation to join {}", organization_name), body);
    }

    /// Trial expiry warning sent at the 7/3/1 day marks.
    pub fn send_trial_warning(&self, to: &str, organization_name: &str, days_left: i64) {
        let body = format!(
            "The trial for {} ends in {} day{}.\n\nUpgrade to a paid plan to keep access to your \
             teams and data.",
            organization_name,
            days_left,
            if days_left == 1 { "" } else { "s" }
        );
        self.send(
            to,
            &format!("Your Meridian trial ends in {} days", days_left),
            body,
        );
    }

    /// Final notice once the trial has expired.
    pub fn send_trial_expired(&self, to: &str, organization_name: &str) {
        let body = format!(
            "The trial for {} has ended and the account has been placed in a past-due state.\n\n\
             Upgrade to a paid plan to restore access.",
            organization_name
        );
        self.send(to, "Your Meridian trial has ended", body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_mailer_does_not_panic() {
        let mailer = Mailer::disabled();
        mailer.send("user@example.com", "subject", "body".to_string());
        mailer.send_invitation("user@example.com", "Acme", "tok_123");
        mailer.send_trial_warning("user@example.com", "Acme", 3);
        mailer.send_trial_expired("user@example.com", "Acme");
    }
}
