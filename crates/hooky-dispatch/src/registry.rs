//! Startup construction of the application registry.
//!
//! Walks the application config map, builds every handler through the
//! factories and registers the result under the declared public
//! identifier. Unknown handler types are skipped with a warning; any
//! construction failure aborts the whole build.

use std::collections::BTreeMap;

use hooky_core::{
    AppConfig, AppRegistry, Application, EventKind, HandlerRegistry, HookyError, Result,
};
use tracing::{info, warn};

use crate::factory::{HandlerContext, HandlerFactories};

/// Builds the registry for every configured application.
///
/// # Errors
///
/// Returns the first validation, construction or duplicate-identifier
/// error. No partial registry is returned.
pub async fn build_app_registry(
    apps: &BTreeMap<String, AppConfig>,
    factories: &HandlerFactories,
    context: &HandlerContext,
) -> Result<AppRegistry> {
    let mut builder = AppRegistry::builder();

    for (key, config) in apps {
        let app = build_application(key, config, factories, context).await?;
        info!(
            app = app.name(),
            public_identifier = %app.public_identifier(),
            crash_handlers = app.handlers().count(EventKind::Crash),
            release_handlers = app.handlers().count(EventKind::Release),
            "application registered"
        );
        builder.register(app)?;
    }

    Ok(builder.build())
}

/// Builds one application and its handlers.
///
/// Handlers are built in config key order within each kind, which is the
/// order they run in.
pub async fn build_application(
    key: &str,
    config: &AppConfig,
    factories: &HandlerFactories,
    context: &HandlerContext,
) -> Result<Application> {
    config.validate(key)?;
    let credentials = config.credentials()?;
    let mut handlers = HandlerRegistry::new();

    for kind in EventKind::ALL {
        let bucket = bucket_name(kind);

        for (name, handler_config) in config.handlers(kind) {
            let handler_type = handler_config.handler_type.as_str();

            let Some(factory) = factories.get(handler_type) else {
                warn!(app = key, handler = %name, handler_type, "unknown handler type, skipping");
                continue;
            };
            if !factory.supports(kind) {
                warn!(
                    app = key,
                    handler = %name,
                    handler_type,
                    event_kind = %kind,
                    "handler type does not support event kind, skipping"
                );
                continue;
            }

            let handler = factory
                .build(&handler_config.config, context)
                .await
                .map_err(|e| locate(e, handler_type, &format!("apps.{key}.{bucket}.{name}")))?;
            handlers.register(kind, handler);
        }
    }

    Ok(Application::new(config.display_name(), credentials, handlers))
}

const fn bucket_name(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Crash => "crash_handlers",
        EventKind::Release => "release_handlers",
    }
}

/// Prefixes a construction error with the config path it came from.
fn locate(error: HookyError, handler_type: &str, path: &str) -> HookyError {
    match error {
        HookyError::HandlerConstruction { handler_type, message } => {
            HookyError::handler_construction(handler_type, format!("{path}: {message}"))
        },
        other => HookyError::handler_construction(handler_type, format!("{path}: {other}")),
    }
}
