//! HockeyApp webhook intake.
//!
//! The sender only learns that the body arrived. Parse failures, unknown
//! applications and handler errors are reported through logs, never
//! through the response status.

use axum::{extract::State, http::StatusCode};
use bytes::Bytes;
use tracing::{debug, instrument};

use crate::AppState;

/// Dispatches one webhook notification and answers `200 OK`.
///
/// The response is sent after every handler has run.
#[instrument(name = "hockeyapp_webhook", skip(state, body), fields(body_size = body.len()))]
pub async fn hockeyapp_webhook(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let outcome = state.dispatcher.on_notification(&body).await;

    debug!(
        outcome = outcome.as_str(),
        handlers_invoked = outcome.handlers_invoked(),
        "webhook processed"
    );

    StatusCode::OK
}
