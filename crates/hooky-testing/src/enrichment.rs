//! Scripted enrichment client.

use std::sync::Arc;

use async_trait::async_trait;
use hooky_core::{AppCredentials, CrashOccurrence, EnrichmentClient, HookyError, Result};
use tokio::sync::RwLock;

/// Enrichment client answering from canned data and recording requests.
#[derive(Debug, Clone, Default)]
pub struct StubEnrichmentClient {
    occurrences: Vec<CrashOccurrence>,
    log_text: String,
    fail_occurrences: bool,
    fail_logs: bool,
    occurrence_requests: Arc<RwLock<Vec<i64>>>,
    log_requests: Arc<RwLock<Vec<i64>>>,
    ticket_urls: Arc<RwLock<Vec<(i64, String)>>>,
}

impl StubEnrichmentClient {
    /// Client that returns no occurrences and empty logs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Occurrences returned for every crash reason.
    #[must_use]
    pub fn with_occurrences(mut self, occurrences: Vec<CrashOccurrence>) -> Self {
        self.occurrences = occurrences;
        self
    }

    /// Log text returned for every crash.
    #[must_use]
    pub fn with_log_text(mut self, log_text: impl Into<String>) -> Self {
        self.log_text = log_text.into();
        self
    }

    /// Fails every occurrence fetch.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail_occurrences = true;
        self
    }

    /// Fails every log fetch.
    #[must_use]
    pub fn failing_logs(mut self) -> Self {
        self.fail_logs = true;
        self
    }

    /// Crash reason ids occurrences were requested for.
    pub async fn occurrence_requests(&self) -> Vec<i64> {
        self.occurrence_requests.read().await.clone()
    }

    /// Crash ids logs were requested for.
    pub async fn log_requests(&self) -> Vec<i64> {
        self.log_requests.read().await.clone()
    }

    /// `(crash_reason_id, url)` pairs linked so far.
    pub async fn ticket_urls(&self) -> Vec<(i64, String)> {
        self.ticket_urls.read().await.clone()
    }
}

#[async_trait]
impl EnrichmentClient for StubEnrichmentClient {
    async fn fetch_occurrences(
        &self,
        _credentials: &AppCredentials,
        crash_reason_id: i64,
    ) -> Result<Vec<CrashOccurrence>> {
        self.occurrence_requests.write().await.push(crash_reason_id);
        if self.fail_occurrences {
            return Err(HookyError::remote_api("hockeyapp", "HTTP 503"));
        }
        Ok(self.occurrences.clone())
    }

    async fn fetch_log_text(
        &self,
        _credentials: &AppCredentials,
        occurrence: &CrashOccurrence,
    ) -> Result<String> {
        self.log_requests.write().await.push(occurrence.id);
        if self.fail_logs {
            return Err(HookyError::remote_api("hockeyapp", "HTTP 404"));
        }
        Ok(self.log_text.clone())
    }

    async fn set_ticket_url(
        &self,
        _credentials: &AppCredentials,
        crash_reason_id: i64,
        ticket_url: &str,
    ) -> Result<()> {
        self.ticket_urls.write().await.push((crash_reason_id, ticket_url.to_string()));
        Ok(())
    }
}
