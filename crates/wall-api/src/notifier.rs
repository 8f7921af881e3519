use std::sync::Mutex;

use thiserror::Error;
use tracing::{info, warn};

use wall_db::models::UserRow;

pub const WELCOME_SUBJECT: &str = "Welcome to the Wall!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("message has no recipients")]
    NoRecipients,

    #[error("outbox lock poisoned")]
    OutboxPoisoned,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Outbound message transport.
pub trait Notifier: Send + Sync {
    fn send(&self, email: Email) -> Result<(), NotificationError>;
}

pub fn welcome_email(from: &str, user: &UserRow) -> Email {
    Email {
        from: from.to_string(),
        to: vec![user.email.clone()],
        subject: WELCOME_SUBJECT.to_string(),
        body: format!(
            "Hello {}, your account has been created successfully! Welcome to the Wall!",
            user.username
        ),
    }
}

/// Sends the welcome message for a freshly created account. Delivery
/// problems are logged and never reach the caller.
pub fn notify_created(notifier: &dyn Notifier, from: &str, user: &UserRow) {
    if let Err(e) = notifier.send(welcome_email(from, user)) {
        warn!(user_id = user.id, error = %e, "Welcome notification not delivered");
    }
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, email: Email) -> Result<(), NotificationError> {
        if email.to.is_empty() {
            return Err(NotificationError::NoRecipients);
        }
        info!(
            from = %email.from,
            to = ?email.to,
            subject = %email.subject,
            "{}",
            email.body
        );
        Ok(())
    }
}

/// Keeps every message in memory, for inspection in tests.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    outbox: Mutex<Vec<Email>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outbox(&self) -> Vec<Email> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, email: Email) -> Result<(), NotificationError> {
        if email.to.is_empty() {
            return Err(NotificationError::NoRecipients);
        }
        self.outbox
            .lock()
            .map_err(|_| NotificationError::OutboxPoisoned)?
            .push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserRow {
        UserRow {
            id: 7,
            username: "newbie".into(),
            email: "newbie@example.com".into(),
            password: "hash".into(),
            date_joined: "2024-01-01T00:00:00.000000Z".into(),
        }
    }

    struct Broken;

    impl Notifier for Broken {
        fn send(&self, _: Email) -> Result<(), NotificationError> {
            Err(NotificationError::Delivery("connection refused".into()))
        }
    }

    #[test]
    fn welcome_email_addresses_user() {
        let email = welcome_email("wall@localhost", &user());
        assert_eq!(email.to, vec!["newbie@example.com".to_string()]);
        assert_eq!(email.subject, WELCOME_SUBJECT);
        assert!(email.body.starts_with("Hello newbie,"));
    }

    #[test]
    fn memory_notifier_collects_messages() {
        let notifier = MemoryNotifier::new();
        notify_created(&notifier, "wall@localhost", &user());
        notify_created(&notifier, "wall@localhost", &user());
        assert_eq!(notifier.outbox().len(), 2);
    }

    #[test]
    fn empty_recipient_list_is_rejected() {
        let mut email = welcome_email("wall@localhost", &user());
        email.to.clear();
        assert!(matches!(LogNotifier.send(email), Err(NotificationError::NoRecipients)));
    }

    #[test]
    fn failures_are_swallowed() {
        notify_created(&Broken, "wall@localhost", &user());
    }
}
