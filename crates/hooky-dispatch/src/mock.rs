//! In-memory mail transport for tests.
//!
//! Records every rendered message instead of talking to an SMTP relay.
//! Can be switched to fail every send to exercise handler error paths.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::{ClientError, Result},
    handlers::email::{MailTransport, OutgoingMail},
};

/// Mail transport that keeps sent messages in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailTransport {
    sent: Arc<RwLock<Vec<OutgoingMail>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingMailTransport {
    /// Creates a transport that accepts every message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send fail with a network error.
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Messages sent so far, oldest first.
    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.read().await.clone()
    }

    /// Number of messages sent so far.
    pub async fn sent_count(&self) -> usize {
        self.sent.read().await.len()
    }
}

#[async_trait]
impl MailTransport for RecordingMailTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::network("smtp", "connection refused"));
        }

        self.sent.write().await.push(mail.clone());
        Ok(())
    }
}
