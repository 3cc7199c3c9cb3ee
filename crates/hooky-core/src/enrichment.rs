//! Capability for fetching crash detail from the crash-reporting service.

use std::fmt;

use async_trait::async_trait;

use crate::{app::AppCredentials, error::Result, models::CrashOccurrence};

/// Remote source of crash detail.
///
/// Every call is a potentially failing remote request. The dispatch core
/// imposes no retry or timeout on these calls; whatever the implementation
/// enforces is what applies.
#[async_trait]
pub trait EnrichmentClient: Send + Sync + fmt::Debug {
    /// Fetches every occurrence grouped under a crash reason.
    async fn fetch_occurrences(
        &self,
        credentials: &AppCredentials,
        crash_reason_id: i64,
    ) -> Result<Vec<CrashOccurrence>>;

    /// Fetches the plain-text crash log of one occurrence.
    async fn fetch_log_text(
        &self,
        credentials: &AppCredentials,
        occurrence: &CrashOccurrence,
    ) -> Result<String>;

    /// Links a crash reason to a ticket in an issue tracker.
    async fn set_ticket_url(
        &self,
        credentials: &AppCredentials,
        crash_reason_id: i64,
        ticket_url: &str,
    ) -> Result<()>;
}
