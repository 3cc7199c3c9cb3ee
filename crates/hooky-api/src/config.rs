//! Configuration management for the Hooky webhook relay.

use std::{
    collections::BTreeMap,
    env,
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use hooky_core::AppConfig;
use hooky_dispatch::client::{ClientConfig, DEFAULT_API_URL};
use serde::{Deserialize, Serialize};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "HOOKY_CONFIG";

/// Configuration file used when `HOOKY_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "hookyapp.toml";

const ENV_PREFIX: &str = "HOOKY_";

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables prefixed `HOOKY_` (highest priority)
/// 2. Configuration file (`hookyapp.toml` or `$HOOKY_CONFIG`)
/// 3. Built-in defaults (lowest priority)
///
/// Unlike the server settings, the application map only comes from the
/// file, so a missing file is an error.
///
/// ```toml
/// bind_address = "0.0.0.0"
/// bind_port = 8080
///
/// [apps.demo]
/// name = "Demo"
/// hockeyapp_id = "abc123"
/// hockeyapp_api_token = "..."
///
/// [apps.demo.release_handlers.announce]
/// type = "email"
/// config = { smtp_host = "smtp.example.com", from_address = "hooky@example.com", to_addresses = ["qa@example.com"] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOOKY_BIND_ADDRESS`
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Server bind port.
    ///
    /// Environment variable: `HOOKY_BIND_PORT`
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    // Logging
    /// Log raw payloads and lift Hooky targets to debug.
    ///
    /// Environment variable: `HOOKY_DEBUG`
    #[serde(default)]
    pub debug: bool,
    /// Log filter used when `RUST_LOG` is unset.
    ///
    /// Environment variable: `HOOKY_RUST_LOG`
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    // HockeyApp
    /// HockeyApp API base URL.
    ///
    /// Environment variable: `HOOKY_HOCKEYAPP_API_URL`
    #[serde(default = "default_api_url")]
    pub hockeyapp_api_url: String,
    /// Timeout for outbound requests in seconds; unset waits indefinitely.
    ///
    /// Environment variable: `HOOKY_REQUEST_TIMEOUT_SECONDS`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_seconds: Option<u64>,

    // Applications
    /// Applications keyed by a name that only organizes the file.
    #[serde(default)]
    pub apps: BTreeMap<String, AppConfig>,
}

impl Config {
    /// Loads configuration from the file named by `HOOKY_CONFIG`, falling
    /// back to `hookyapp.toml`.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Loads configuration from defaults, the given file, and environment
    /// overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            anyhow::bail!("configuration file {} not found", path.display());
        }

        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]));

        let config: Self = figment
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Convert to the shared outbound HTTP settings.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: self.request_timeout_seconds.map(Duration::from_secs),
            ..ClientConfig::default()
        }
    }

    /// Parse server socket address from bind address and port.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_address, self.bind_port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Log filter directive; debug mode lifts the Hooky crates to `debug`.
    pub fn log_filter(&self) -> String {
        if self.debug {
            format!("{},hooky=debug,hooky_api=debug,hooky_dispatch=debug", self.rust_log)
        } else {
            self.rust_log.clone()
        }
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.bind_port == 0 {
            anyhow::bail!("bind_port must be greater than 0");
        }

        if !(self.hockeyapp_api_url.starts_with("https://")
            || self.hockeyapp_api_url.starts_with("http://"))
        {
            anyhow::bail!("hockeyapp_api_url must be an http(s) URL");
        }

        if self.request_timeout_seconds == Some(0) {
            anyhow::bail!("request_timeout_seconds must be greater than 0 when set");
        }

        for (key, app) in &self.apps {
            app.validate(key)?;
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            debug: false,
            rust_log: default_log_level(),
            hockeyapp_api_url: default_api_url(),
            request_timeout_seconds: None,
            apps: BTreeMap::new(),
        }
    }
}

/// Path of the configuration file to load.
pub fn config_path() -> PathBuf {
    env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

#[cfg(test)]
mod tests {
    use figment::Jail;
    use hooky_core::EventKind;

    use super::*;

    const SAMPLE: &str = r#"
        bind_address = "0.0.0.0"
        bind_port = 9000

        [apps.demo]
        name = "Demo"
        hockeyapp_id = "abc123"
        hockeyapp_api_token = "secret"

        [apps.demo.crash_handlers.tickets]
        type = "fogbugz"
        config = { host = "example.fogbugz.com", email = "bot@example.com", password = "x", project = "Demo", area = "Crashes" }

        [apps.demo.release_handlers.announce]
        type = "email"

        [apps.demo.release_handlers.announce.config]
        smtp_host = "smtp.example.com"
        smtp_port = 2525
        from_address = "hooky@example.com"
        to_addresses = ["qa@example.com"]
    "#;

    #[test]
    fn loads_file_with_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("hookyapp.toml", SAMPLE)?;

            let config = Config::load_from("hookyapp.toml").map_err(|e| e.to_string())?;

            assert_eq!(config.bind_address, "0.0.0.0");
            assert_eq!(config.bind_port, 9000);
            assert!(!config.debug);
            assert_eq!(config.rust_log, "info");
            assert_eq!(config.hockeyapp_api_url, DEFAULT_API_URL);
            assert!(config.request_timeout_seconds.is_none());

            let app = &config.apps["demo"];
            assert_eq!(app.hockeyapp_id, "abc123");
            assert_eq!(app.hockeyapp_api_token.expose(), "secret");
            assert_eq!(app.handlers(EventKind::Crash)["tickets"].handler_type, "fogbugz");

            let announce = &app.handlers(EventKind::Release)["announce"];
            assert_eq!(announce.config["smtp_port"], 2525);
            assert_eq!(announce.config["to_addresses"][0], "qa@example.com");

            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("hookyapp.toml", SAMPLE)?;
            jail.set_env("HOOKY_BIND_PORT", "9090");
            jail.set_env("HOOKY_DEBUG", "true");
            jail.set_env("HOOKY_REQUEST_TIMEOUT_SECONDS", "15");

            let config = Config::load_from("hookyapp.toml").map_err(|e| e.to_string())?;

            assert_eq!(config.bind_port, 9090);
            assert!(config.debug);
            assert_eq!(config.to_client_config().timeout, Some(Duration::from_secs(15)));
            assert!(config.log_filter().contains("hooky_dispatch=debug"));

            Ok(())
        });
    }

    #[test]
    fn config_path_follows_environment() {
        Jail::expect_with(|jail| {
            assert_eq!(config_path(), PathBuf::from(DEFAULT_CONFIG_FILE));

            jail.set_env(CONFIG_ENV, "custom.toml");
            assert_eq!(config_path(), PathBuf::from("custom.toml"));

            jail.create_file("custom.toml", "bind_port = 7000")?;
            let config = Config::load().map_err(|e| e.to_string())?;
            assert_eq!(config.bind_port, 7000);
            assert!(config.apps.is_empty());

            Ok(())
        });
    }

    #[test]
    fn missing_file_is_an_error() {
        Jail::expect_with(|_jail| {
            let error = Config::load_from("absent.toml").unwrap_err();
            assert!(error.to_string().contains("absent.toml not found"));
            Ok(())
        });
    }

    #[test]
    fn app_without_token_fails_validation() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "hookyapp.toml",
                r#"
                [apps.demo]
                hockeyapp_id = "abc123"
                "#,
            )?;

            let error = Config::load_from("hookyapp.toml").unwrap_err();
            assert!(format!("{error:#}").contains("apps.demo: hockeyapp_api_token is required"));

            Ok(())
        });
    }

    #[test]
    fn invalid_config_validation_fails() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.bind_port = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.hockeyapp_api_url = "rink.hockeyapp.net".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.request_timeout_seconds = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn socket_address_parsing() {
        let mut config = Config::default();
        config.bind_port = 9000;

        let addr = config.parse_server_addr().expect("Should parse socket address");

        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 9000);
    }
}
