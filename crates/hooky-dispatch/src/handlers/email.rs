//! Email release handler.
//!
//! Sends one HTML message per release notification to every configured
//! recipient. Delivery goes through a `MailTransport` so the SMTP relay can
//! be swapped for a recording double in tests.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use handlebars::Handlebars;
use hooky_core::{
    AppVersion, Application, EventKind, HookyError, Notification, NotificationHandler, Result,
};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{self, ClientError},
    factory::{parse_options, HandlerContext, HandlerFactory},
};

/// Type string selecting this handler in configuration.
pub const HANDLER_TYPE: &str = "email";

const SERVICE: &str = "smtp";

/// Options of an email handler.
#[derive(Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host.
    pub smtp_host: String,
    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP user name; no authentication when absent.
    #[serde(default)]
    pub smtp_username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Upgrade the connection with STARTTLS.
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    /// Sender address.
    pub from_address: String,
    /// Recipient addresses.
    pub to_addresses: Vec<String>,
    /// Subject tag; defaults to the application name.
    #[serde(default)]
    pub subject_prefix: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_use_tls() -> bool {
    true
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "***"))
            .field("use_tls", &self.use_tls)
            .field("from_address", &self.from_address)
            .field("to_addresses", &self.to_addresses)
            .field("subject_prefix", &self.subject_prefix)
            .finish()
    }
}

impl EmailConfig {
    /// Parses the sender and recipient addresses.
    fn mailboxes(&self) -> Result<(Mailbox, Vec<Mailbox>)> {
        let from = parse_mailbox(&self.from_address)?;

        if self.to_addresses.is_empty() {
            return Err(HookyError::handler_construction(
                HANDLER_TYPE,
                "to_addresses must name at least one recipient",
            ));
        }
        let to = self.to_addresses.iter().map(|a| parse_mailbox(a)).collect::<Result<Vec<_>>>()?;

        Ok((from, to))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address.trim().parse().map_err(|e| {
        HookyError::handler_construction(HANDLER_TYPE, format!("invalid address {address:?}: {e}"))
    })
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    /// Sender.
    pub from: Mailbox,
    /// Recipients.
    pub to: Vec<Mailbox>,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
}

/// Delivers rendered mail.
#[async_trait]
pub trait MailTransport: Send + Sync + fmt::Debug {
    /// Sends one message to all of its recipients.
    async fn send(&self, mail: &OutgoingMail) -> error::Result<()>;
}

/// SMTP relay transport.
#[derive(Clone)]
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    relay: String,
}

impl fmt::Debug for SmtpMailTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpMailTransport").field("relay", &self.relay).finish_non_exhaustive()
    }
}

impl SmtpMailTransport {
    /// Creates a pooled transport for the relay in `config`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` when the relay host is empty or
    /// the TLS parameters cannot be built.
    pub fn from_config(config: &EmailConfig) -> error::Result<Self> {
        let host = config.smtp_host.trim();
        if host.is_empty() {
            return Err(ClientError::configuration("smtp_host is required"));
        }

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| ClientError::configuration(format!("invalid SMTP relay {host}: {e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };

        let mut builder = builder.port(config.smtp_port);
        if let Some(username) = &config.smtp_username {
            let password = config.smtp_password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }

        Ok(Self { transport: builder.build(), relay: format!("{host}:{}", config.smtp_port) })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, mail: &OutgoingMail) -> error::Result<()> {
        let mut builder = Message::builder()
            .from(mail.from.clone())
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_HTML);
        for recipient in &mail.to {
            builder = builder.to(recipient.clone());
        }

        let message = builder
            .body(mail.html_body.clone())
            .map_err(|e| ClientError::decode(SERVICE, format!("failed to build message: {e}")))?;

        self.transport.send(message).await.map_err(|e| ClientError::network(SERVICE, e))?;
        Ok(())
    }
}

const SUBJECT_TEMPLATE: &str = "subject";
const BODY_TEMPLATE: &str = "body";

const SUBJECT_SOURCE: &str =
    "[{{{tag}}}] {{{headline}}} released{{#if mandatory}} - mandatory update{{/if}}";

// Release notes are HTML already and are embedded unescaped.
const BODY_SOURCE: &str = "<h2>{{headline}} released</h2>
{{#if minimum_os_version}}<p>Minimum OS version: {{minimum_os_version}}</p>
{{/if}}{{#if mandatory}}<p><strong>This update is mandatory.</strong></p>
{{/if}}{{#if notes}}<div>{{{notes}}}</div>
{{/if}}{{#if url}}<p><a href=\"{{url}}\">View {{app_name}} on HockeyApp</a></p>
{{/if}}";

#[derive(Serialize)]
struct ReleaseContext<'a> {
    tag: &'a str,
    app_name: &'a str,
    headline: String,
    minimum_os_version: &'a str,
    mandatory: bool,
    notes: &'a str,
    url: &'a str,
}

impl<'a> ReleaseContext<'a> {
    fn new(tag: &'a str, app_name: &'a str, version: &'a AppVersion, url: &'a str) -> Self {
        let display_version = version.display_version();
        let headline = [version.title.as_str(), display_version.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            tag,
            app_name,
            headline,
            minimum_os_version: &version.minimum_os_version,
            mandatory: version.mandatory,
            notes: &version.notes,
            url,
        }
    }
}

/// Subject and HTML body templates for release announcements.
///
/// Fields are HTML-escaped in the body except the release notes.
pub struct ReleaseTemplates {
    registry: Handlebars<'static>,
}

impl fmt::Debug for ReleaseTemplates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseTemplates").finish_non_exhaustive()
    }
}

impl ReleaseTemplates {
    /// Compiles the subject and body templates.
    ///
    /// # Errors
    ///
    /// Returns `HookyError::HandlerConstruction` if a template fails to
    /// compile.
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        for (name, source) in [(SUBJECT_TEMPLATE, SUBJECT_SOURCE), (BODY_TEMPLATE, BODY_SOURCE)] {
            registry.register_template_string(name, source).map_err(|e| {
                HookyError::handler_construction(HANDLER_TYPE, format!("template {name}: {e}"))
            })?;
        }
        Ok(Self { registry })
    }

    /// Subject line for a release, tagged with `tag`.
    pub fn subject(&self, tag: &str, version: &AppVersion) -> Result<String> {
        self.render(SUBJECT_TEMPLATE, &ReleaseContext::new(tag, "", version, ""))
    }

    /// HTML body for a release of `app_name` linking to `url`.
    pub fn body(&self, app_name: &str, version: &AppVersion, url: &str) -> Result<String> {
        self.render(BODY_TEMPLATE, &ReleaseContext::new("", app_name, version, url))
    }

    fn render(&self, name: &str, context: &ReleaseContext<'_>) -> Result<String> {
        self.registry
            .render(name, context)
            .map_err(|e| HookyError::handler(HANDLER_TYPE, format!("failed to render {name}: {e}")))
    }
}

/// Emails release announcements.
#[derive(Debug)]
pub struct EmailHandler {
    transport: Arc<dyn MailTransport>,
    templates: ReleaseTemplates,
    from: Mailbox,
    to: Vec<Mailbox>,
    subject_prefix: Option<String>,
}

impl EmailHandler {
    /// Creates a handler from validated config and a transport.
    ///
    /// # Errors
    ///
    /// Returns `HookyError::HandlerConstruction` for invalid addresses or an
    /// empty recipient list.
    pub fn new(config: &EmailConfig, transport: Arc<dyn MailTransport>) -> Result<Self> {
        let (from, to) = config.mailboxes()?;
        Ok(Self {
            transport,
            templates: ReleaseTemplates::new()?,
            from,
            to,
            subject_prefix: config.subject_prefix.clone(),
        })
    }

    /// Renders the message for a release.
    pub fn render(
        &self,
        app: &Application,
        version: &AppVersion,
        url: &str,
    ) -> Result<OutgoingMail> {
        let tag = self.subject_prefix.as_deref().unwrap_or_else(|| app.name());
        Ok(OutgoingMail {
            from: self.from.clone(),
            to: self.to.clone(),
            subject: self.templates.subject(tag, version)?,
            html_body: self.templates.body(app.name(), version, url)?,
        })
    }
}

#[async_trait]
impl NotificationHandler for EmailHandler {
    fn handler_type(&self) -> &str {
        HANDLER_TYPE
    }

    async fn handle(&self, app: &Application, notification: &Notification) -> Result<()> {
        let Some(version) = notification.app_version() else {
            return Err(HookyError::unsupported_event(HANDLER_TYPE, notification.kind()));
        };

        let mail = self.render(app, version, &notification.url)?;
        self.transport
            .send(&mail)
            .await
            .map_err(|e| HookyError::handler(HANDLER_TYPE, e.to_string()))?;

        info!(
            recipients = mail.to.len(),
            version = %version.display_version(),
            "release email sent"
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum TransportSource {
    Smtp,
    Shared(Arc<dyn MailTransport>),
}

/// Builds `"email"` handlers. Release notifications only.
#[derive(Debug, Clone)]
pub struct EmailFactory {
    source: TransportSource,
}

impl EmailFactory {
    /// Factory giving every handler its own SMTP relay from its options.
    pub fn smtp() -> Self {
        Self { source: TransportSource::Smtp }
    }

    /// Factory giving every handler the same transport.
    pub fn with_transport(transport: Arc<dyn MailTransport>) -> Self {
        Self { source: TransportSource::Shared(transport) }
    }
}

#[async_trait]
impl HandlerFactory for EmailFactory {
    fn handler_type(&self) -> &'static str {
        HANDLER_TYPE
    }

    fn supports(&self, kind: EventKind) -> bool {
        kind == EventKind::Release
    }

    async fn build(
        &self,
        options: &serde_json::Value,
        _context: &HandlerContext,
    ) -> Result<Arc<dyn NotificationHandler>> {
        let config: EmailConfig = parse_options(HANDLER_TYPE, options)?;

        let transport: Arc<dyn MailTransport> = match &self.source {
            TransportSource::Smtp => Arc::new(SmtpMailTransport::from_config(&config).map_err(
                |e| HookyError::handler_construction(HANDLER_TYPE, e.to_string()),
            )?),
            TransportSource::Shared(transport) => transport.clone(),
        };

        let handler = EmailHandler::new(&config, transport)?;
        info!(
            relay = %config.smtp_host,
            recipients = config.to_addresses.len(),
            "email handler configured"
        );
        Ok(Arc::new(handler))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn version() -> AppVersion {
        AppVersion {
            title: "Demo".to_string(),
            shortversion: "1.2".to_string(),
            version: "120".to_string(),
            notes: "<p>Fixes</p>".to_string(),
            ..Default::default()
        }
    }

    fn options() -> serde_json::Value {
        json!({
            "smtp_host": "smtp.example.com",
            "from_address": "Hooky <hooky@example.com>",
            "to_addresses": ["qa@example.com", "dev@example.com"]
        })
    }

    fn templates() -> ReleaseTemplates {
        ReleaseTemplates::new().expect("templates compile")
    }

    #[test]
    fn subject_names_version_and_mandatory_flag() {
        let templates = templates();
        assert_eq!(
            templates.subject("Demo", &version()).unwrap(),
            "[Demo] Demo 1.2 (120) released"
        );

        let mandatory = AppVersion { mandatory: true, ..version() };
        assert_eq!(
            templates.subject("QA", &mandatory).unwrap(),
            "[QA] Demo 1.2 (120) released - mandatory update"
        );
    }

    #[test]
    fn subject_skips_missing_parts() {
        let templates = templates();

        let untitled = AppVersion { title: String::new(), ..version() };
        assert_eq!(templates.subject("Demo", &untitled).unwrap(), "[Demo] 1.2 (120) released");

        let bare = AppVersion { shortversion: String::new(), version: String::new(), ..version() };
        assert_eq!(templates.subject("Demo", &bare).unwrap(), "[Demo] Demo released");
    }

    #[test]
    fn subject_is_not_html_escaped() {
        let version = AppVersion { title: "A&B".to_string(), ..version() };
        assert_eq!(templates().subject("R&D", &version).unwrap(), "[R&D] A&B 1.2 (120) released");
    }

    #[test]
    fn body_embeds_notes_and_escapes_text() {
        let version = AppVersion { title: "A&B".to_string(), ..version() };
        let body = templates()
            .body("<Demo>", &version, "https://rink.hockeyapp.net/apps/1?a=1&b=2")
            .unwrap();

        assert!(body.contains("<h2>A&amp;B 1.2 (120) released</h2>"));
        assert!(body.contains("<div><p>Fixes</p></div>"));
        assert!(body.contains("href=\"https://rink.hockeyapp.net/apps/1?a&#x3D;1&amp;b&#x3D;2\""));
        assert!(body.contains("View &lt;Demo&gt; on HockeyApp"));
        assert!(!body.contains("mandatory"));
        assert!(!body.contains("Minimum OS version"));
    }

    #[test]
    fn body_lists_optional_sections() {
        let version =
            AppVersion { mandatory: true, minimum_os_version: "7.0".to_string(), ..version() };
        let body = templates().body("Demo", &version, "").unwrap();

        assert!(body.contains("<p>Minimum OS version: 7.0</p>"));
        assert!(body.contains("<strong>This update is mandatory.</strong>"));
        assert!(!body.contains("<a href"));
    }

    #[test]
    fn config_defaults_apply() {
        let config: EmailConfig = serde_json::from_value(options()).unwrap();
        assert_eq!(config.smtp_port, 587);
        assert!(config.use_tls);
        assert!(config.smtp_username.is_none());
    }

    #[test]
    fn debug_masks_password() {
        let mut options = options();
        options["smtp_username"] = json!("bot");
        options["smtp_password"] = json!("hunter2");
        let config: EmailConfig = serde_json::from_value(options).unwrap();

        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn invalid_recipient_fails_construction() {
        let mut options = options();
        options["to_addresses"] = json!(["not an address"]);
        let config: EmailConfig = serde_json::from_value(options).unwrap();

        let error = config.mailboxes().unwrap_err();
        assert_eq!(error.code(), "E3002");
    }

    #[test]
    fn empty_recipient_list_fails_construction() {
        let mut options = options();
        options["to_addresses"] = json!([]);
        let config: EmailConfig = serde_json::from_value(options).unwrap();

        assert!(config.mailboxes().unwrap_err().to_string().contains("at least one recipient"));
    }

    #[tokio::test]
    async fn smtp_transport_builds_without_connecting() {
        let mut options = options();
        options["use_tls"] = json!(false);
        options["smtp_port"] = json!(2525);
        let config: EmailConfig = serde_json::from_value(options).unwrap();
        let transport = SmtpMailTransport::from_config(&config).unwrap();
        assert!(format!("{transport:?}").contains("smtp.example.com:2525"));
    }
}
