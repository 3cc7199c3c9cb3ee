//! HockeyApp REST client used to enrich crash notifications.
//!
//! Handles request construction, token authentication and response
//! decoding. Also provides the shared HTTP client settings every outbound
//! collaborator (HockeyApp, FogBugz) is built from.

use std::time::Duration;

use async_trait::async_trait;
use hooky_core::{AppCredentials, CrashOccurrence, EnrichmentClient};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, info_span, Instrument};

use crate::error::{ClientError, Result};

/// HockeyApp API base URL.
pub const DEFAULT_API_URL: &str = "https://rink.hockeyapp.net/api/2";

/// Header carrying the per-application API token.
pub const TOKEN_HEADER: &str = "X-HockeyAppToken";

const SERVICE: &str = "hockeyapp";

/// Longest error body kept for logs.
const MAX_ERROR_BODY: usize = 1024;

/// Settings shared by every outbound HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout. `None` waits for as long as the remote takes.
    pub timeout: Option<Duration>,
    /// User agent string for requests.
    pub user_agent: String,
    /// Maximum number of redirects to follow.
    pub max_redirects: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            user_agent: concat!("Hooky/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 5,
        }
    }
}

/// Builds a `reqwest` client from shared settings.
///
/// # Errors
///
/// Returns `ClientError::Configuration` if the TLS backend cannot be
/// initialized.
pub fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize));

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| ClientError::configuration(format!("failed to build HTTP client: {e}")))
}

/// Turns a non-2xx response into `ClientError::Status`.
pub(crate) async fn ensure_success(service: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(ClientError::status(service, status.as_u16(), body))
}

/// HockeyApp API client.
///
/// One client serves every configured application; the credentials passed
/// to each call select the application and authenticate the request.
#[derive(Debug, Clone)]
pub struct HockeyAppClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CrashList {
    #[serde(default)]
    crashes: Vec<CrashOccurrence>,
}

impl HockeyAppClient {
    /// Creates a client for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the URL is not http(s) or the
    /// HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, config: &ClientConfig) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(ClientError::configuration(format!(
                "HockeyApp API URL must be http(s): {base_url}"
            )));
        }

        Ok(Self { client: build_http_client(config)?, base_url })
    }

    /// API base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn app_url(&self, credentials: &AppCredentials, path: &str) -> String {
        format!("{}/apps/{}{}", self.base_url, credentials.app_id, path)
    }

    async fn send(&self, request: RequestBuilder, credentials: &AppCredentials) -> Result<Response> {
        let response = request
            .header(TOKEN_HEADER, credentials.api_token.expose())
            .send()
            .await
            .map_err(|e| ClientError::network(SERVICE, e))?;

        ensure_success(SERVICE, response).await
    }

    /// Fetches the occurrences of a crash reason.
    pub async fn crashes(
        &self,
        credentials: &AppCredentials,
        crash_reason_id: i64,
    ) -> Result<Vec<CrashOccurrence>> {
        let url = self.app_url(credentials, &format!("/crash_reasons/{crash_reason_id}"));
        let span = info_span!("hockeyapp_crashes", app_id = %credentials.app_id, crash_reason_id);

        async move {
            let response = self.send(self.client.get(&url), credentials).await?;
            let list: CrashList =
                response.json().await.map_err(|e| ClientError::decode(SERVICE, e))?;

            debug!(occurrences = list.crashes.len(), "fetched crash occurrences");
            Ok(list.crashes)
        }
        .instrument(span)
        .await
    }

    /// Fetches the plain-text log of one crash.
    pub async fn crash_log(&self, credentials: &AppCredentials, crash_id: i64) -> Result<String> {
        let url = self.app_url(credentials, &format!("/crashes/{crash_id}"));
        let span = info_span!("hockeyapp_crash_log", app_id = %credentials.app_id, crash_id);

        async move {
            let request = self.client.get(&url).query(&[("format", "log")]);
            let response = self.send(request, credentials).await?;
            response.text().await.map_err(|e| ClientError::network(SERVICE, e))
        }
        .instrument(span)
        .await
    }

    /// Records an issue tracker URL on a crash reason.
    pub async fn update_ticket_url(
        &self,
        credentials: &AppCredentials,
        crash_reason_id: i64,
        ticket_url: &str,
    ) -> Result<()> {
        let url = self.app_url(credentials, &format!("/crash_reasons/{crash_reason_id}"));
        let span =
            info_span!("hockeyapp_ticket_url", app_id = %credentials.app_id, crash_reason_id);

        async move {
            let request = self.client.post(&url).form(&[("ticket_url", ticket_url)]);
            self.send(request, credentials).await?;
            debug!(ticket_url, "linked crash reason to ticket");
            Ok(())
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl EnrichmentClient for HockeyAppClient {
    async fn fetch_occurrences(
        &self,
        credentials: &AppCredentials,
        crash_reason_id: i64,
    ) -> hooky_core::Result<Vec<CrashOccurrence>> {
        Ok(self.crashes(credentials, crash_reason_id).await?)
    }

    async fn fetch_log_text(
        &self,
        credentials: &AppCredentials,
        occurrence: &CrashOccurrence,
    ) -> hooky_core::Result<String> {
        Ok(self.crash_log(credentials, occurrence.id).await?)
    }

    async fn set_ticket_url(
        &self,
        credentials: &AppCredentials,
        crash_reason_id: i64,
        ticket_url: &str,
    ) -> hooky_core::Result<()> {
        Ok(self.update_ticket_url(credentials, crash_reason_id, ticket_url).await?)
    }
}
