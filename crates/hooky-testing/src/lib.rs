//! Test doubles and fixtures for the webhook relay.
//!
//! Provides a recording handler that logs when each call starts and
//! finishes, a scripted enrichment client, and HockeyApp payload fixtures.
//! Everything here is in-memory and deterministic.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod enrichment;
pub mod fixtures;
pub mod handlers;

pub use enrichment::StubEnrichmentClient;
pub use handlers::{CallEvent, CallLog, RecordingHandler};
