//! Handler construction from configuration.
//!
//! Every handler variant is a `HandlerFactory` registered under the type
//! string operators write in the config file. Adding a variant means
//! registering another factory; the dispatcher never changes.

use std::{collections::BTreeMap, fmt, sync::Arc};

use async_trait::async_trait;
use hooky_core::{EnrichmentClient, EventKind, HookyError, NotificationHandler, Result};
use serde::de::DeserializeOwned;

use crate::{
    client::ClientConfig,
    handlers::{email::EmailFactory, fogbugz::FogbugzFactory},
};

/// Shared collaborators handed to every factory.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    enrichment: Arc<dyn EnrichmentClient>,
    client_config: ClientConfig,
}

impl HandlerContext {
    /// Creates a context from the enrichment client and HTTP settings.
    pub fn new(enrichment: Arc<dyn EnrichmentClient>, client_config: ClientConfig) -> Self {
        Self { enrichment, client_config }
    }

    /// Client used to fetch crash logs and link tickets.
    pub fn enrichment(&self) -> &Arc<dyn EnrichmentClient> {
        &self.enrichment
    }

    /// HTTP settings for handlers that talk to remote services.
    pub fn client_config(&self) -> &ClientConfig {
        &self.client_config
    }
}

/// Builds handlers of one type from their opaque options.
#[async_trait]
pub trait HandlerFactory: Send + Sync + fmt::Debug {
    /// Type string selecting this factory, e.g. `"fogbugz"`.
    fn handler_type(&self) -> &'static str;

    /// Whether handlers of this type may be registered for `kind`.
    fn supports(&self, kind: EventKind) -> bool;

    /// Builds a handler.
    ///
    /// # Errors
    ///
    /// Returns `HookyError::HandlerConstruction` when the options are
    /// invalid or a startup side effect (such as a remote logon) fails.
    async fn build(
        &self,
        options: &serde_json::Value,
        context: &HandlerContext,
    ) -> Result<Arc<dyn NotificationHandler>>;
}

/// Factories keyed by handler type string.
#[derive(Debug, Clone, Default)]
pub struct HandlerFactories {
    factories: BTreeMap<&'static str, Arc<dyn HandlerFactory>>,
}

impl HandlerFactories {
    /// Creates an empty set of factories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Factories for the built-in handler types: `"fogbugz"` for crashes and
    /// `"email"` for releases.
    pub fn with_defaults() -> Self {
        let mut factories = Self::new();
        factories.register(Arc::new(FogbugzFactory));
        factories.register(Arc::new(EmailFactory::smtp()));
        factories
    }

    /// Registers a factory, replacing any previous one with the same type.
    pub fn register(&mut self, factory: Arc<dyn HandlerFactory>) -> &mut Self {
        self.factories.insert(factory.handler_type(), factory);
        self
    }

    /// Looks up the factory for a type string.
    pub fn get(&self, handler_type: &str) -> Option<&Arc<dyn HandlerFactory>> {
        self.factories.get(handler_type)
    }

    /// Registered type strings in sorted order.
    pub fn handler_types(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

/// Decodes handler options into a typed config.
///
/// A missing `config` table decodes like an empty one.
pub(crate) fn parse_options<T: DeserializeOwned>(
    handler_type: &str,
    options: &serde_json::Value,
) -> Result<T> {
    let options = if options.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        options.clone()
    };

    serde_json::from_value(options).map_err(|e| {
        HookyError::handler_construction(handler_type, format!("invalid options: {e}"))
    })
}
