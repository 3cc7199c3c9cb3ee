//! Core domain model for the Hooky webhook relay.
//!
//! Provides the parsed notification payload, the error taxonomy, and the
//! capabilities the dispatch core is built from: notification handlers,
//! the enrichment client, and the read-only application registry that maps
//! public identifiers to configured applications.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod handler;
pub mod models;

pub use app::{AppCredentials, AppRegistry, AppRegistryBuilder, Application};
pub use config::{AppConfig, HandlerConfig};
pub use enrichment::EnrichmentClient;
pub use error::{HookyError, Result};
pub use handler::{HandlerRegistry, NotificationHandler};
pub use models::{
    ApiToken, AppVersion, CrashOccurrence, CrashReason, EventKind, Notification,
    NotificationEvent, PublicIdentifier,
};
