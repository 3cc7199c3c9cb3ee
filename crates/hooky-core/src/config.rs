//! Per-application configuration schema.
//!
//! The service configuration holds a map of these entries keyed by a name
//! that only organizes the file. The `hockeyapp_id` inside each entry is
//! the routing key inbound notifications are matched against.
//!
//! ```toml
//! [apps.demo]
//! name = "Demo"
//! hockeyapp_id = "abc123"
//! hockeyapp_api_token = "..."
//!
//! [apps.demo.crash_handlers.tickets]
//! type = "fogbugz"
//! config = { host = "example.fogbugz.com", email = "...", password = "...", project = "Demo", area = "Crashes" }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    app::AppCredentials,
    error::{HookyError, Result},
    models::{ApiToken, EventKind, PublicIdentifier},
};

/// Configuration of one application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// HockeyApp public identifier; the routing key.
    #[serde(default)]
    pub hockeyapp_id: String,
    /// HockeyApp API token.
    #[serde(default = "empty_token")]
    pub hockeyapp_api_token: ApiToken,
    /// Handlers for crash notifications, keyed by handler name.
    #[serde(default)]
    pub crash_handlers: BTreeMap<String, HandlerConfig>,
    /// Handlers for release notifications, keyed by handler name.
    #[serde(default)]
    pub release_handlers: BTreeMap<String, HandlerConfig>,
}

/// Configuration of one handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Handler type string, e.g. `"fogbugz"` or `"email"`.
    #[serde(rename = "type")]
    pub handler_type: String,
    /// Handler-specific options, interpreted by the handler factory.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl AppConfig {
    /// Checks the invariants every application must satisfy.
    ///
    /// # Errors
    ///
    /// Returns `HookyError::Configuration` naming the offending config key
    /// when the identifier or API token is empty.
    pub fn validate(&self, key: &str) -> Result<()> {
        if self.hockeyapp_id.trim().is_empty() {
            return Err(HookyError::configuration(format!("apps.{key}: hockeyapp_id is required")));
        }
        if self.hockeyapp_api_token.is_empty() {
            return Err(HookyError::configuration(format!(
                "apps.{key}: hockeyapp_api_token is required"
            )));
        }
        Ok(())
    }

    /// Builds the API credentials for this application.
    pub fn credentials(&self) -> Result<AppCredentials> {
        let app_id = PublicIdentifier::new(self.hockeyapp_id.clone())?;
        Ok(AppCredentials::new(app_id, self.hockeyapp_api_token.clone()))
    }

    /// Returns the configured handlers for `kind`, ordered by handler name.
    pub fn handlers(&self, kind: EventKind) -> &BTreeMap<String, HandlerConfig> {
        match kind {
            EventKind::Crash => &self.crash_handlers,
            EventKind::Release => &self.release_handlers,
        }
    }

    /// Display name, falling back to the public identifier.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.hockeyapp_id
        } else {
            &self.name
        }
    }
}

fn empty_token() -> ApiToken {
    ApiToken::new("")
}
