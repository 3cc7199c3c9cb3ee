//! Notification dispatch.
//!
//! The dispatcher owns the per-request flow: parse, resolve the target
//! application, enrich crash reasons, then run every handler registered
//! for the event kind. Handlers run one after another in registration
//! order. A handler that fails or panics is logged and counted; the next
//! handler still runs with the same payload.

use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use hooky_core::{
    AppRegistry, Application, EnrichmentClient, EventKind, HookyError, Notification,
};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Result of one dispatch, for logs and tests.
///
/// The webhook response never depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The payload did not parse.
    Rejected,
    /// No application is registered for the public identifier.
    UnknownApplication,
    /// Fetching crash occurrences failed; no handler ran.
    EnrichmentFailed,
    /// Handlers for `kind` ran.
    Dispatched {
        /// Event kind that selected the handlers
        kind: EventKind,
        /// Handlers that returned `Ok`
        succeeded: usize,
        /// Handlers that returned an error or panicked
        failed: usize,
    },
}

impl DispatchOutcome {
    /// Number of handlers invoked.
    pub const fn handlers_invoked(&self) -> usize {
        match self {
            Self::Dispatched { succeeded, failed, .. } => *succeeded + *failed,
            _ => 0,
        }
    }

    /// Short name used as a log field.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::UnknownApplication => "unknown_application",
            Self::EnrichmentFailed => "enrichment_failed",
            Self::Dispatched { .. } => "dispatched",
        }
    }
}

/// Routes notifications to the handlers of the application they belong to.
///
/// Cheap to clone; the registry and enrichment client are shared.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    apps: Arc<AppRegistry>,
    enrichment: Arc<dyn EnrichmentClient>,
    log_payloads: bool,
}

impl Dispatcher {
    /// Creates a dispatcher over a built application registry.
    pub fn new(apps: Arc<AppRegistry>, enrichment: Arc<dyn EnrichmentClient>) -> Self {
        Self { apps, enrichment, log_payloads: false }
    }

    /// Logs every raw payload at debug level when enabled.
    #[must_use]
    pub fn with_payload_logging(mut self, enabled: bool) -> Self {
        self.log_payloads = enabled;
        self
    }

    /// Registered applications.
    pub fn apps(&self) -> &AppRegistry {
        &self.apps
    }

    /// Handles one raw webhook body.
    ///
    /// Never fails: every problem is logged and reflected in the outcome.
    pub async fn on_notification(&self, raw: &[u8]) -> DispatchOutcome {
        if self.log_payloads {
            debug!(payload = %String::from_utf8_lossy(raw), "received notification payload");
        }

        let notification = match Notification::from_slice(raw) {
            Ok(notification) => notification,
            Err(error) => {
                warn!(error = %error, code = error.code(), "rejected notification payload");
                return DispatchOutcome::Rejected;
            },
        };

        self.dispatch(notification).await
    }

    /// Dispatches an already parsed notification.
    pub async fn dispatch(&self, notification: Notification) -> DispatchOutcome {
        let span = info_span!(
            "dispatch",
            public_identifier = %notification.public_identifier,
            event_kind = %notification.kind(),
        );

        self.dispatch_resolved(notification).instrument(span).await
    }

    async fn dispatch_resolved(&self, notification: Notification) -> DispatchOutcome {
        let Some(app) = self.apps.resolve(&notification.public_identifier) else {
            info!("ignoring notification for unknown application");
            return DispatchOutcome::UnknownApplication;
        };

        let kind = notification.kind();
        let notification = match self.enrich(app, notification).await {
            Ok(notification) => notification,
            Err(error) => {
                error!(
                    error = %error,
                    code = error.code(),
                    "crash enrichment failed, skipping handlers"
                );
                return DispatchOutcome::EnrichmentFailed;
            },
        };

        let (succeeded, failed) = run_handlers(app, &notification).await;
        info!(app = app.name(), succeeded, failed, "notification dispatched");

        DispatchOutcome::Dispatched { kind, succeeded, failed }
    }

    async fn enrich(
        &self,
        app: &Application,
        notification: Notification,
    ) -> hooky_core::Result<Notification> {
        let Some(crash_reason_id) = notification.crash_reason().map(|reason| reason.id) else {
            return Ok(notification);
        };

        let occurrences = self
            .enrichment
            .fetch_occurrences(app.credentials(), crash_reason_id)
            .await
            .map_err(|e| HookyError::enrichment(crash_reason_id, e.to_string()))?;

        debug!(crash_reason_id, occurrences = occurrences.len(), "crash reason enriched");
        Ok(notification.with_occurrences(occurrences))
    }
}

/// Runs every handler for the notification's kind, returning
/// `(succeeded, failed)`.
async fn run_handlers(app: &Application, notification: &Notification) -> (usize, usize) {
    let handlers = app.handlers().handlers_for(notification.kind());
    if handlers.is_empty() {
        debug!("no handlers registered for event kind");
    }

    let mut succeeded = 0;
    let mut failed = 0;

    for handler in handlers {
        let handler_type = handler.handler_type();
        match AssertUnwindSafe(handler.handle(app, notification)).catch_unwind().await {
            Ok(Ok(())) => {
                succeeded += 1;
                debug!(handler_type, "handler completed");
            },
            Ok(Err(error)) => {
                failed += 1;
                error!(handler_type, error = %error, code = error.code(), "handler failed");
            },
            Err(_) => {
                failed += 1;
                error!(handler_type, "handler panicked");
            },
        }
    }

    (succeeded, failed)
}
