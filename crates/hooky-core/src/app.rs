//! Configured applications and the registry that routes notifications to
//! them.

use std::collections::HashMap;

use crate::{
    error::{HookyError, Result},
    handler::HandlerRegistry,
    models::{ApiToken, PublicIdentifier},
};

/// Everything needed to address one application on the HockeyApp API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCredentials {
    /// Public identifier used in API paths.
    pub app_id: PublicIdentifier,
    /// Token sent with every API request.
    pub api_token: ApiToken,
}

impl AppCredentials {
    /// Creates credentials for an application.
    pub fn new(app_id: PublicIdentifier, api_token: ApiToken) -> Self {
        Self { app_id, api_token }
    }
}

/// A configured application and its handlers.
///
/// Built once at startup and never modified afterwards.
#[derive(Debug, Clone)]
pub struct Application {
    name: String,
    credentials: AppCredentials,
    handlers: HandlerRegistry,
}

impl Application {
    /// Creates an application.
    pub fn new(
        name: impl Into<String>,
        credentials: AppCredentials,
        handlers: HandlerRegistry,
    ) -> Self {
        Self { name: name.into(), credentials, handlers }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Public identifier this application is routed by.
    pub fn public_identifier(&self) -> &PublicIdentifier {
        &self.credentials.app_id
    }

    /// API credentials.
    pub fn credentials(&self) -> &AppCredentials {
        &self.credentials
    }

    /// Handlers grouped by event kind.
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }
}

/// Read-only mapping from public identifier to application.
///
/// Resolution is the only runtime operation. The registry is shared across
/// requests behind an `Arc` and needs no locking.
#[derive(Debug, Clone, Default)]
pub struct AppRegistry {
    apps: HashMap<PublicIdentifier, Application>,
}

impl AppRegistry {
    /// Starts building a registry.
    pub fn builder() -> AppRegistryBuilder {
        AppRegistryBuilder::default()
    }

    /// Looks up the application for a public identifier.
    ///
    /// Unknown identifiers are expected (another team's webhook, a stale
    /// config) and yield `None` rather than an error.
    pub fn resolve(&self, public_identifier: &str) -> Option<&Application> {
        self.apps.get(public_identifier)
    }

    /// Number of registered applications.
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Returns true when no application is registered.
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Registered public identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.apps.keys().map(PublicIdentifier::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// Collects applications before freezing them into an `AppRegistry`.
#[derive(Debug, Default)]
pub struct AppRegistryBuilder {
    apps: HashMap<PublicIdentifier, Application>,
}

impl AppRegistryBuilder {
    /// Adds an application.
    ///
    /// # Errors
    ///
    /// Returns `HookyError::Configuration` if another application already
    /// uses the same public identifier; routing would be ambiguous.
    pub fn register(&mut self, app: Application) -> Result<&mut Self> {
        let id = app.public_identifier().clone();
        if self.apps.contains_key(&id) {
            return Err(HookyError::configuration(format!(
                "public identifier {id} is configured for more than one application"
            )));
        }
        self.apps.insert(id, app);
        Ok(self)
    }

    /// Freezes the registry.
    pub fn build(self) -> AppRegistry {
        AppRegistry { apps: self.apps }
    }
}
