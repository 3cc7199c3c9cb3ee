//! FogBugz crash handler.
//!
//! Files one FogBugz case per crash notification. The handler logs on once
//! at startup and reuses the session token for every case. FogBugz answers
//! with XML; a non-zero `<error code>` is a failure.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use hooky_core::{
    Application, CrashOccurrence, CrashReason, EnrichmentClient, EventKind, HookyError,
    Notification, NotificationHandler, Result,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    client::{build_http_client, ensure_success, ClientConfig},
    error::{self, ClientError},
    factory::{parse_options, HandlerContext, HandlerFactory},
};

/// Type string selecting this handler in configuration.
pub const HANDLER_TYPE: &str = "fogbugz";

const SERVICE: &str = "fogbugz";

/// Options of a FogBugz handler.
#[derive(Clone, Deserialize)]
pub struct FogbugzConfig {
    /// FogBugz host, either bare (`example.fogbugz.com`) or a full base URL.
    pub host: String,
    /// Account email used to log on.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Project new cases are filed under.
    #[serde(default)]
    pub project: String,
    /// Area new cases are filed under.
    #[serde(default)]
    pub area: String,
    /// Post the case URL back to HockeyApp as the crash reason's ticket.
    #[serde(default)]
    pub link_ticket: bool,
}

impl fmt::Debug for FogbugzConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FogbugzConfig")
            .field("host", &self.host)
            .field("email", &self.email)
            .field("password", &"***")
            .field("project", &self.project)
            .field("area", &self.area)
            .field("link_ticket", &self.link_ticket)
            .finish()
    }
}

impl FogbugzConfig {
    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(HookyError::handler_construction(HANDLER_TYPE, "host is required"));
        }
        if self.email.trim().is_empty() {
            return Err(HookyError::handler_construction(HANDLER_TYPE, "email is required"));
        }
        Ok(())
    }

    /// API base URL derived from `host`.
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("https://") || host.starts_with("http://") {
            host.to_string()
        } else {
            format!("https://{host}")
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    error: Option<ApiErrorElement>,
    #[serde(default)]
    case: Option<CaseElement>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorElement {
    #[serde(rename = "@code", default)]
    code: i64,
    #[serde(rename = "$text", default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CaseElement {
    #[serde(rename = "@ixBug")]
    ix_bug: u64,
}

/// Authenticated FogBugz API session.
#[derive(Clone)]
pub struct FogbugzSession {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl fmt::Debug for FogbugzSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FogbugzSession")
            .field("base_url", &self.base_url)
            .field("token", &"***")
            .finish_non_exhaustive()
    }
}

impl FogbugzSession {
    /// Logs on and keeps the returned token.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-2xx responses, malformed XML, a
    /// non-zero FogBugz error code or a response without a token.
    pub async fn logon(config: &FogbugzConfig, client_config: &ClientConfig) -> error::Result<Self> {
        let client = build_http_client(client_config)?;
        let base_url = config.base_url();

        let params = [
            ("cmd", "logon"),
            ("email", config.email.as_str()),
            ("password", config.password.as_str()),
        ];
        let response = call_api(&client, &base_url, &params).await?;

        let token = response.token.map(|t| t.trim().to_string()).unwrap_or_default();
        if token.is_empty() {
            return Err(ClientError::decode(SERVICE, "logon response carried no token"));
        }

        Ok(Self { client, base_url, token })
    }

    /// Files a new case, returning its number when FogBugz reports one.
    pub async fn file_bug(
        &self,
        project: &str,
        area: &str,
        title: &str,
        body: &str,
    ) -> error::Result<Option<u64>> {
        let params = [
            ("cmd", "new"),
            ("token", self.token.as_str()),
            ("sProject", project),
            ("sArea", area),
            ("sTitle", title),
            ("sEvent", body),
        ];
        let response = call_api(&self.client, &self.base_url, &params).await?;

        Ok(response.case.map(|case| case.ix_bug))
    }

    /// Browser URL of a case.
    pub fn case_url(&self, ix_bug: u64) -> String {
        format!("{}/default.asp?{ix_bug}", self.base_url)
    }
}

async fn call_api(
    client: &reqwest::Client,
    base_url: &str,
    params: &[(&str, &str)],
) -> error::Result<ApiResponse> {
    let response = client
        .get(format!("{base_url}/api.asp"))
        .query(params)
        .send()
        .await
        .map_err(|e| ClientError::network(SERVICE, e))?;
    let response = ensure_success(SERVICE, response).await?;
    let body = response.text().await.map_err(|e| ClientError::network(SERVICE, e))?;

    let parsed: ApiResponse =
        quick_xml::de::from_str(&body).map_err(|e| ClientError::decode(SERVICE, e))?;

    if let Some(error) = parsed.error.as_ref().filter(|e| e.code != 0) {
        return Err(ClientError::api(SERVICE, error.code, error.message.trim()));
    }

    Ok(parsed)
}

/// Case title for a crash reason.
pub fn case_title(reason: &CrashReason) -> String {
    format!("Crash at {}:{} - {} - {}", reason.file, reason.line, reason.method, reason.reason)
}

/// Case body for the first occurrence of a crash reason.
pub fn case_body(url: &str, occurrence: &CrashOccurrence, log: &str) -> String {
    format!("\nSee HockeyApp at {url}\nUser: {}\n\n{log}\n", occurrence.user_string)
}

/// Files FogBugz cases for crash notifications.
#[derive(Debug)]
pub struct FogbugzHandler {
    session: FogbugzSession,
    project: String,
    area: String,
    link_ticket: bool,
    enrichment: Arc<dyn EnrichmentClient>,
}

impl FogbugzHandler {
    /// Creates a handler over an established session.
    pub fn new(
        session: FogbugzSession,
        config: &FogbugzConfig,
        enrichment: Arc<dyn EnrichmentClient>,
    ) -> Self {
        Self {
            session,
            project: config.project.clone(),
            area: config.area.clone(),
            link_ticket: config.link_ticket,
            enrichment,
        }
    }

    async fn crash_log(&self, app: &Application, occurrence: &CrashOccurrence) -> String {
        if !occurrence.has_log {
            return String::new();
        }

        match self.enrichment.fetch_log_text(app.credentials(), occurrence).await {
            Ok(log) => log,
            Err(error) => {
                warn!(
                    crash_id = occurrence.id,
                    error = %error,
                    "failed to fetch crash log, filing without it"
                );
                String::new()
            },
        }
    }

    async fn link_case(&self, app: &Application, crash_reason_id: i64, ix_bug: u64) {
        let ticket_url = self.session.case_url(ix_bug);
        if let Err(error) =
            self.enrichment.set_ticket_url(app.credentials(), crash_reason_id, &ticket_url).await
        {
            warn!(crash_reason_id, ix_bug, error = %error, "failed to link case to crash reason");
        }
    }
}

#[async_trait]
impl NotificationHandler for FogbugzHandler {
    fn handler_type(&self) -> &str {
        HANDLER_TYPE
    }

    async fn handle(&self, app: &Application, notification: &Notification) -> Result<()> {
        let Some(reason) = notification.crash_reason() else {
            return Err(HookyError::unsupported_event(HANDLER_TYPE, notification.kind()));
        };

        let empty = CrashOccurrence::default();
        let occurrence = reason.occurrences.first().unwrap_or(&empty);
        let log = self.crash_log(app, occurrence).await;

        let title = case_title(reason);
        let body = case_body(&notification.url, occurrence, &log);

        let case = self
            .session
            .file_bug(&self.project, &self.area, &title, &body)
            .await
            .map_err(|e| HookyError::handler(HANDLER_TYPE, e.to_string()))?;

        info!(crash_reason_id = reason.id, case = ?case, "filed FogBugz case");

        if let (true, Some(ix_bug)) = (self.link_ticket, case) {
            self.link_case(app, reason.id, ix_bug).await;
        }

        Ok(())
    }
}

/// Builds `"fogbugz"` handlers. Crash notifications only.
#[derive(Debug, Clone, Copy, Default)]
pub struct FogbugzFactory;

#[async_trait]
impl HandlerFactory for FogbugzFactory {
    fn handler_type(&self) -> &'static str {
        HANDLER_TYPE
    }

    fn supports(&self, kind: EventKind) -> bool {
        kind == EventKind::Crash
    }

    async fn build(
        &self,
        options: &serde_json::Value,
        context: &HandlerContext,
    ) -> Result<Arc<dyn NotificationHandler>> {
        let config: FogbugzConfig = parse_options(HANDLER_TYPE, options)?;
        config.validate()?;

        let session =
            FogbugzSession::logon(&config, context.client_config()).await.map_err(|e| {
                HookyError::handler_construction(
                    HANDLER_TYPE,
                    format!("logon to {} failed: {e}", config.host),
                )
            })?;

        info!(
            host = %config.host,
            project = %config.project,
            area = %config.area,
            "FogBugz session established"
        );
        Ok(Arc::new(FogbugzHandler::new(session, &config, context.enrichment().clone())))
    }
}
