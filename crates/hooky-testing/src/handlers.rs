//! Recording notification handler.
//!
//! Several handlers can share one `CallLog`, so tests can assert that one
//! handler finished before the next one started.

use std::sync::Arc;

use async_trait::async_trait;
use hooky_core::{Application, HookyError, Notification, NotificationHandler, Result};
use tokio::sync::RwLock;

/// Handler call boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    /// Handler with this name was entered.
    Started(String),
    /// Handler with this name returned.
    Finished(String),
}

/// Shared, ordered log of handler call boundaries.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    events: Arc<RwLock<Vec<CallEvent>>>,
}

impl CallLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub async fn record(&self, event: CallEvent) {
        self.events.write().await.push(event);
    }

    /// All events in the order they happened.
    pub async fn events(&self) -> Vec<CallEvent> {
        self.events.read().await.clone()
    }

    /// Names of handlers in the order they started.
    pub async fn started(&self) -> Vec<String> {
        self.events
            .read()
            .await
            .iter()
            .filter_map(|event| match event {
                CallEvent::Started(name) => Some(name.clone()),
                CallEvent::Finished(_) => None,
            })
            .collect()
    }
}

/// Handler that records every notification it receives.
///
/// Yields to the runtime between start and finish so overlapping calls
/// would show up in the `CallLog`.
#[derive(Debug)]
pub struct RecordingHandler {
    name: String,
    log: CallLog,
    fail: bool,
    received: RwLock<Vec<Notification>>,
}

impl RecordingHandler {
    /// Type string reported by every recording handler.
    pub const HANDLER_TYPE: &'static str = "recording";

    /// Creates a handler that succeeds.
    pub fn new(name: impl Into<String>, log: CallLog) -> Self {
        Self { name: name.into(), log, fail: false, received: RwLock::new(Vec::new()) }
    }

    /// Makes the handler return an error after recording the call.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Notifications received so far.
    pub async fn received(&self) -> Vec<Notification> {
        self.received.read().await.clone()
    }

    /// Number of calls so far.
    pub async fn call_count(&self) -> usize {
        self.received.read().await.len()
    }
}

#[async_trait]
impl NotificationHandler for RecordingHandler {
    fn handler_type(&self) -> &str {
        Self::HANDLER_TYPE
    }

    async fn handle(&self, _app: &Application, notification: &Notification) -> Result<()> {
        self.log.record(CallEvent::Started(self.name.clone())).await;
        tokio::task::yield_now().await;

        self.received.write().await.push(notification.clone());
        self.log.record(CallEvent::Finished(self.name.clone())).await;

        if self.fail {
            return Err(HookyError::handler(Self::HANDLER_TYPE, format!("{} failed", self.name)));
        }
        Ok(())
    }
}
