//! Notification dispatch for the Hooky webhook relay.
//!
//! This crate turns a parsed HockeyApp notification into handler side
//! effects. The `Dispatcher` resolves the target application, enriches
//! crash notifications with occurrence detail, and runs every matching
//! handler in order.
//!
//! # Architecture
//!
//! 1. **Parse** - Raw webhook body becomes a `Notification`
//! 2. **Resolve** - Public identifier selects an `Application`
//! 3. **Enrich** - Crash reasons get their occurrences from HockeyApp
//! 4. **Dispatch** - Handlers run one after another; failures are logged
//!
//! Handlers are built at startup from configuration through
//! `HandlerFactories`, which map a type string (`"fogbugz"`, `"email"`) to
//! a constructor. Any construction failure aborts startup.
//!
//! # Example
//!
//! ```no_run
//! use std::{collections::BTreeMap, sync::Arc};
//!
//! use hooky_core::AppConfig;
//! use hooky_dispatch::{
//!     client::{ClientConfig, HockeyAppClient, DEFAULT_API_URL},
//!     registry::build_app_registry,
//!     Dispatcher, HandlerContext, HandlerFactories,
//! };
//!
//! # async fn example(apps: BTreeMap<String, AppConfig>) -> hooky_core::Result<()> {
//! let client_config = ClientConfig::default();
//! let enrichment = Arc::new(HockeyAppClient::new(DEFAULT_API_URL, &client_config)?);
//! let context = HandlerContext::new(enrichment.clone(), client_config);
//!
//! let registry = build_app_registry(&apps, &HandlerFactories::with_defaults(), &context).await?;
//! let dispatcher = Dispatcher::new(Arc::new(registry), enrichment);
//!
//! dispatcher.on_notification(br#"{"public_identifier":"abc123","type":"app_version","app_version":{}}"#).await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod factory;
pub mod handlers;
pub mod mock;
pub mod registry;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::ClientError;
pub use factory::{HandlerContext, HandlerFactories, HandlerFactory};
