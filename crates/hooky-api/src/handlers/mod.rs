//! HTTP request handlers for the Hooky API.
//!
//! - `webhook` - HockeyApp notification intake
//! - `health` - Health and liveness checks

pub mod health;
pub mod webhook;

pub use health::{health_check, liveness_check};
pub use webhook::hockeyapp_webhook;
