//! Notification handler capability and the per-application handler registry.
//!
//! A handler performs one side effect (file a ticket, send an email) for a
//! dispatched notification. Each application owns a `HandlerRegistry` that
//! groups its handlers by event kind, built once from configuration.
//!
//! # Dispatch Flow
//!
//! ```text
//! ┌────────────┐  handlers_for(kind)  ┌──────────────────┐
//! │ Dispatcher │ ───────────────────▶ │ HandlerRegistry  │
//! └────────────┘                      └──────────────────┘
//!       │                                      │
//!       │ handle(app, notification)            │ [H1, H2, ...]
//!       ▼                                      ▼
//!   H1 ──▶ H2 ──▶ ...   one at a time, in registration order
//! ```

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{app::Application, error::Result, models::EventKind, Notification};

/// Processes one enriched notification for one application.
///
/// Implementations are constructed once at startup and shared across
/// concurrent requests, so any session state they keep must be safe to use
/// from several tasks.
#[async_trait]
pub trait NotificationHandler: Send + Sync + fmt::Debug {
    /// Configuration type string this handler was built from.
    fn handler_type(&self) -> &str;

    /// Handles a notification.
    ///
    /// A returned error is logged by the dispatcher and does not stop the
    /// remaining handlers.
    async fn handle(&self, app: &Application, notification: &Notification) -> Result<()>;
}

/// Handlers of one application, grouped by event kind.
///
/// Insertion order is dispatch order. The registry is filled during startup
/// and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    crash: Vec<Arc<dyn NotificationHandler>>,
    release: Vec<Arc<dyn NotificationHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler to the bucket for `kind`.
    pub fn register(&mut self, kind: EventKind, handler: Arc<dyn NotificationHandler>) {
        match kind {
            EventKind::Crash => self.crash.push(handler),
            EventKind::Release => self.release.push(handler),
        }
    }

    /// Returns the handlers for `kind` in registration order.
    pub fn handlers_for(&self, kind: EventKind) -> &[Arc<dyn NotificationHandler>] {
        match kind {
            EventKind::Crash => &self.crash,
            EventKind::Release => &self.release,
        }
    }

    /// Returns the number of handlers registered for `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.handlers_for(kind).len()
    }

    /// Returns true when no handler is registered for any kind.
    pub fn is_empty(&self) -> bool {
        self.crash.is_empty() && self.release.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NamedHandler(&'static str);

    #[async_trait]
    impl NotificationHandler for NamedHandler {
        fn handler_type(&self) -> &str {
            self.0
        }

        async fn handle(&self, _app: &Application, _notification: &Notification) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn empty_registry_has_no_handlers() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.handlers_for(EventKind::Crash).is_empty());
        assert_eq!(registry.count(EventKind::Release), 0);
    }

    #[test]
    fn handlers_are_bucketed_by_kind_in_registration_order() {
        let mut registry = HandlerRegistry::new();
        registry.register(EventKind::Crash, Arc::new(NamedHandler("first")));
        registry.register(EventKind::Release, Arc::new(NamedHandler("release")));
        registry.register(EventKind::Crash, Arc::new(NamedHandler("second")));

        let crash: Vec<&str> =
            registry.handlers_for(EventKind::Crash).iter().map(|h| h.handler_type()).collect();
        assert_eq!(crash, vec!["first", "second"]);
        assert_eq!(registry.count(EventKind::Release), 1);
        assert!(!registry.is_empty());
    }
}
