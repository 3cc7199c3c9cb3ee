//! Hooky webhook relay.
//!
//! Main entry point. Loads configuration, builds every configured handler,
//! and serves the webhook endpoint until a shutdown signal arrives. Any
//! failure before the listener is bound exits non-zero.

use std::sync::Arc;

use anyhow::{Context, Result};
use hooky_api::{AppState, Config};
use hooky_dispatch::{
    client::HockeyAppClient, registry::build_app_registry, Dispatcher, HandlerContext,
    HandlerFactories,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    init_tracing(&config);

    info!(
        server_addr = %format!("{}:{}", config.bind_address, config.bind_port),
        hockeyapp_api_url = %config.hockeyapp_api_url,
        applications = config.apps.len(),
        debug = config.debug,
        "configuration loaded"
    );

    if config.apps.is_empty() {
        warn!("no applications configured; every notification will be ignored");
    }

    let addr = config.parse_server_addr()?;
    let dispatcher = build_dispatcher(&config).await?;

    info!(
        applications = dispatcher.apps().len(),
        identifiers = ?dispatcher.apps().identifiers(),
        "hooky is ready to receive webhooks"
    );

    hooky_api::start_server(AppState::new(dispatcher), addr)
        .await
        .context("HTTP server failed")?;

    info!("hooky shutdown complete");
    Ok(())
}

/// Builds the enrichment client, every configured handler, and the
/// dispatcher that owns them.
async fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let client_config = config.to_client_config();
    let enrichment = Arc::new(
        HockeyAppClient::new(config.hockeyapp_api_url.clone(), &client_config)
            .context("Failed to create HockeyApp client")?,
    );

    let context = HandlerContext::new(enrichment.clone(), client_config);
    let registry = build_app_registry(&config.apps, &HandlerFactories::with_defaults(), &context)
        .await
        .context("Failed to build application registry")?;

    Ok(Dispatcher::new(Arc::new(registry), enrichment).with_payload_logging(config.debug))
}

/// Initializes tracing; `RUST_LOG` wins over the configured filter.
fn init_tracing(config: &Config) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
