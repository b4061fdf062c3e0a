//! Recording in-process [`EmailSender`] for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::{EmailError, EmailSender, OutgoingEmail};

/// Records every message instead of delivering it.
#[derive(Debug, Default)]
pub struct FakeEmailSender {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: AtomicBool,
}

impl FakeEmailSender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn fail_sends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages accepted so far.
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmailSender for FakeEmailSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmailError::Rejected("550 mailbox unavailable".to_owned()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}
