//! Error types and result handling for relay operations.
//!
//! Errors carry a stable code so log lines can be grouped by failure class:
//! E1xxx for inbound payload problems, E2xxx for remote collaborators and
//! handlers, E3xxx for startup configuration.

use thiserror::Error;

use crate::models::EventKind;

/// Result type alias using `HookyError`.
pub type Result<T> = std::result::Result<T, HookyError>;

/// Hooky error types.
#[derive(Debug, Error)]
pub enum HookyError {
    // Payload errors (E1001-E1002)
    /// Inbound webhook body could not be parsed (E1001).
    #[error("[E1001] Invalid payload: {message}")]
    InvalidPayload {
        /// Parser error description
        message: String,
    },

    /// A handler was given a notification kind it does not process (E1002).
    #[error("[E1002] Unsupported event: {handler_type} does not handle {kind} notifications")]
    UnsupportedEvent {
        /// Type string of the handler that rejected the notification
        handler_type: String,
        /// Kind of the rejected notification
        kind: EventKind,
    },

    // Collaborator errors (E2001-E2003)
    /// Crash occurrences could not be fetched (E2001).
    #[error("[E2001] Enrichment failed for crash reason {crash_reason_id}: {message}")]
    Enrichment {
        /// Crash reason that was being enriched
        crash_reason_id: i64,
        /// Underlying failure
        message: String,
    },

    /// A handler failed to process a notification (E2002).
    #[error("[E2002] Handler {handler_type} failed: {message}")]
    Handler {
        /// Type string of the failing handler
        handler_type: String,
        /// Failure description
        message: String,
    },

    /// A remote API answered with an error or could not be reached (E2003).
    #[error("[E2003] Remote API error from {service}: {message}")]
    RemoteApi {
        /// Remote service name
        service: String,
        /// Failure description
        message: String,
    },

    // Startup errors (E3001-E3002)
    /// Configuration is malformed or semantically invalid (E3001).
    #[error("[E3001] Configuration error: {message}")]
    Configuration {
        /// What is wrong with the configuration
        message: String,
    },

    /// A handler could not be constructed from its configuration (E3002).
    #[error("[E3002] Failed to construct {handler_type} handler: {message}")]
    HandlerConstruction {
        /// Type string of the handler being constructed
        handler_type: String,
        /// Construction failure
        message: String,
    },
}

impl HookyError {
    /// Creates an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload { message: message.into() }
    }

    /// Creates an unsupported event error.
    pub fn unsupported_event(handler_type: impl Into<String>, kind: EventKind) -> Self {
        Self::UnsupportedEvent { handler_type: handler_type.into(), kind }
    }

    /// Creates an enrichment error for a crash reason.
    pub fn enrichment(crash_reason_id: i64, message: impl Into<String>) -> Self {
        Self::Enrichment { crash_reason_id, message: message.into() }
    }

    /// Creates a handler error.
    pub fn handler(handler_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler { handler_type: handler_type.into(), message: message.into() }
    }

    /// Creates a remote API error.
    pub fn remote_api(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteApi { service: service.into(), message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Creates a handler construction error.
    pub fn handler_construction(
        handler_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::HandlerConstruction { handler_type: handler_type.into(), message: message.into() }
    }

    /// Returns the error code (E1001-E3002).
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload { .. } => "E1001",
            Self::UnsupportedEvent { .. } => "E1002",
            Self::Enrichment { .. } => "E2001",
            Self::Handler { .. } => "E2002",
            Self::RemoteApi { .. } => "E2003",
            Self::Configuration { .. } => "E3001",
            Self::HandlerConstruction { .. } => "E3002",
        }
    }
}

impl From<serde_json::Error> for HookyError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_payload(err.to_string())
    }
}
