//! Error types for calls to remote collaborators.
//!
//! Covers the HockeyApp REST API, the FogBugz XML API and SMTP delivery.
//! Each error names the service it came from so handler failures read well
//! in logs. Errors convert into `HookyError` at the crate boundary.

use std::fmt;

use hooky_core::HookyError;
use thiserror::Error;

/// Result type alias for remote calls.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Remote call failures.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The request could not be sent or the response not read.
    #[error("{service} request failed: {message}")]
    Network {
        /// Remote service name
        service: String,
        /// Transport error description
        message: String,
    },

    /// The service answered with a non-success HTTP status.
    #[error("{service} returned HTTP {status_code}")]
    Status {
        /// Remote service name
        service: String,
        /// HTTP status code
        status_code: u16,
        /// Response body content
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode {service} response: {message}")]
    Decode {
        /// Remote service name
        service: String,
        /// Decoder error description
        message: String,
    },

    /// The service reported an application-level error code.
    #[error("{service} error {code}: {message}")]
    Api {
        /// Remote service name
        service: String,
        /// Error code reported by the service
        code: i64,
        /// Error description reported by the service
        message: String,
    },

    /// Client settings are invalid.
    #[error("invalid client configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },
}

impl ClientError {
    /// Creates a network error.
    pub fn network(service: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Network { service: service.into(), message: message.to_string() }
    }

    /// Creates an HTTP status error.
    pub fn status(service: impl Into<String>, status_code: u16, body: impl Into<String>) -> Self {
        Self::Status { service: service.into(), status_code, body: body.into() }
    }

    /// Creates a decode error.
    pub fn decode(service: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Decode { service: service.into(), message: message.to_string() }
    }

    /// Creates an API error.
    pub fn api(service: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self::Api { service: service.into(), code, message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Remote service the error came from, if any.
    pub fn service(&self) -> Option<&str> {
        match self {
            Self::Network { service, .. }
            | Self::Status { service, .. }
            | Self::Decode { service, .. }
            | Self::Api { service, .. } => Some(service),
            Self::Configuration { .. } => None,
        }
    }
}

impl From<ClientError> for HookyError {
    fn from(error: ClientError) -> Self {
        match &error {
            ClientError::Configuration { message } => Self::configuration(message.clone()),
            _ => {
                let service = error.service().unwrap_or("remote").to_string();
                Self::remote_api(service, error.to_string())
            },
        }
    }
}
