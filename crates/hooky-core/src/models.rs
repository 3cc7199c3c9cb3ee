//! Notification payload model and strongly-typed identifiers.
//!
//! HockeyApp posts one JSON object per event. The `type` field selects the
//! variant and the matching sub-object (`crash_reason` or `app_version`)
//! carries the event detail. HockeyApp is loose about nulls and sends some
//! numeric fields as strings and vice versa, so scalar fields decode
//! leniently and fall back to their defaults.

use std::{borrow::Borrow, fmt};

use chrono::{DateTime, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

use crate::error::{HookyError, Result};

/// Public identifier HockeyApp assigns to an application.
///
/// This is the routing key of inbound notifications. It is never empty.
///
/// # Example
///
/// ```
/// use hooky_core::PublicIdentifier;
///
/// let id = PublicIdentifier::new("abc123").unwrap();
/// assert_eq!(id.as_str(), "abc123");
/// assert!(PublicIdentifier::new("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicIdentifier(String);

impl PublicIdentifier {
    /// Creates an identifier, rejecting empty or whitespace-only values.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(HookyError::configuration("public identifier must not be empty"));
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PublicIdentifier {
    type Error = HookyError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PublicIdentifier> for String {
    fn from(id: PublicIdentifier) -> Self {
        id.0
    }
}

impl Borrow<str> for PublicIdentifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque HockeyApp API token.
///
/// Formatting never reveals the token so credentials can sit inside
/// structures that are logged with `?`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use in request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true when no token is configured.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Kind of event a handler is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A crash reason was created or updated.
    Crash,
    /// A new application version was released.
    Release,
}

impl EventKind {
    /// Every event kind, in registry order.
    pub const ALL: [Self; 2] = [Self::Crash, Self::Release];

    /// Returns the lowercase name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Crash => "crash",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound HockeyApp notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Public identifier of the application the event belongs to.
    pub public_identifier: String,

    /// Link to the event on the HockeyApp dashboard.
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,

    /// When HockeyApp sent the notification.
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,

    /// Event detail selected by the `type` field.
    #[serde(flatten)]
    pub event: NotificationEvent,
}

/// Event detail of a notification, tagged by the `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// `"type": "crash_reason"`
    CrashReason {
        /// The crash reason the notification is about.
        crash_reason: CrashReason,
    },
    /// `"type": "app_version"`
    AppVersion {
        /// The released version.
        app_version: AppVersion,
    },
}

impl Notification {
    /// Parses a raw webhook body.
    ///
    /// # Errors
    ///
    /// Returns `HookyError::InvalidPayload` when the body is not JSON, the
    /// `type` is not one of the known kinds, or a required field is missing.
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Returns the event kind used to select handlers.
    pub fn kind(&self) -> EventKind {
        match self.event {
            NotificationEvent::CrashReason { .. } => EventKind::Crash,
            NotificationEvent::AppVersion { .. } => EventKind::Release,
        }
    }

    /// Returns the crash reason for crash notifications.
    pub fn crash_reason(&self) -> Option<&CrashReason> {
        match &self.event {
            NotificationEvent::CrashReason { crash_reason } => Some(crash_reason),
            NotificationEvent::AppVersion { .. } => None,
        }
    }

    /// Returns the released version for release notifications.
    pub fn app_version(&self) -> Option<&AppVersion> {
        match &self.event {
            NotificationEvent::AppVersion { app_version } => Some(app_version),
            NotificationEvent::CrashReason { .. } => None,
        }
    }

    /// Attaches fetched crash occurrences to a crash notification.
    ///
    /// Release notifications are returned unchanged.
    #[must_use]
    pub fn with_occurrences(mut self, occurrences: Vec<CrashOccurrence>) -> Self {
        if let NotificationEvent::CrashReason { crash_reason } = &mut self.event {
            crash_reason.occurrences = occurrences;
        }
        self
    }
}

/// A group of crashes sharing one signature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrashReason {
    /// HockeyApp crash reason id; enrichment is keyed on it.
    pub id: i64,
    /// Numeric HockeyApp application id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub app_id: i64,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// HockeyApp workflow status.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: i64,
    /// Exception reason.
    #[serde(default, deserialize_with = "lenient_string")]
    pub reason: String,
    /// Time of the most recent crash.
    #[serde(default)]
    pub last_crash_at: Option<DateTime<Utc>>,
    /// Whether the reason is marked fixed.
    #[serde(default, deserialize_with = "null_as_default")]
    pub fixed: bool,
    /// Version the crash reason was first seen in.
    #[serde(default, deserialize_with = "null_as_default")]
    pub app_version_id: i64,
    /// Bundle version string.
    #[serde(default, deserialize_with = "lenient_string")]
    pub bundle_version: String,
    /// Bundle short version string.
    #[serde(default, deserialize_with = "lenient_string")]
    pub bundle_short_version: String,
    /// Number of crashes grouped under this reason.
    #[serde(default, deserialize_with = "null_as_default")]
    pub number_of_crashes: i64,
    /// Crashing method.
    #[serde(default, deserialize_with = "lenient_string")]
    pub method: String,
    /// Crashing file.
    #[serde(default, deserialize_with = "lenient_string")]
    pub file: String,
    /// Crashing class.
    #[serde(default, deserialize_with = "lenient_string")]
    pub class: String,
    /// Crashing line.
    #[serde(default, deserialize_with = "lenient_string")]
    pub line: String,
    /// Device-level occurrences, filled in by enrichment before dispatch.
    #[serde(default, skip_deserializing)]
    pub occurrences: Vec<CrashOccurrence>,
}

/// One device-level crash belonging to a crash reason.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrashOccurrence {
    /// HockeyApp crash id; used to fetch the crash log.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    /// Numeric HockeyApp application id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub app_id: i64,
    /// Owning crash reason.
    #[serde(default, deserialize_with = "null_as_default")]
    pub crash_reason_id: i64,
    /// Bundle version string.
    #[serde(default, deserialize_with = "lenient_string")]
    pub bundle_version: String,
    /// Bundle short version string.
    #[serde(default, deserialize_with = "lenient_string")]
    pub bundle_short_version: String,
    /// Contact details the user supplied.
    #[serde(default, deserialize_with = "lenient_string")]
    pub contact_string: String,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Whether a user description is attached.
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_description: bool,
    /// Whether a crash log can be fetched.
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_log: bool,
    /// Device model.
    #[serde(default, deserialize_with = "lenient_string")]
    pub model: String,
    /// Device manufacturer.
    #[serde(default, deserialize_with = "lenient_string")]
    pub oem: String,
    /// Operating system version.
    #[serde(default, deserialize_with = "lenient_string")]
    pub os_version: String,
    /// Free-text context the user supplied.
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_string: String,
}

/// A released application version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppVersion {
    /// HockeyApp version id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    /// Numeric HockeyApp application id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub app_id: i64,
    /// Build version.
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: String,
    /// Marketing version.
    #[serde(default, deserialize_with = "lenient_string")]
    pub shortversion: String,
    /// Application title.
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    /// Upload time as a unix timestamp.
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: i64,
    /// Package size in bytes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub appsize: i64,
    /// Release notes as raw HTML.
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: String,
    /// Whether installing this version is mandatory.
    #[serde(default, deserialize_with = "null_as_default")]
    pub mandatory: bool,
    /// Minimum supported OS version.
    #[serde(default, deserialize_with = "lenient_string")]
    pub minimum_os_version: String,
    /// Device family, when HockeyApp knows it.
    #[serde(default)]
    pub device_family: Option<String>,
    /// Whether downloads are restricted to tagged testers.
    #[serde(default, deserialize_with = "null_as_default")]
    pub restricted_to_tags: bool,
    /// HockeyApp download status.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: i64,
    /// Tester tags the version is restricted to.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl AppVersion {
    /// Returns `"{shortversion} ({version})"`, or whichever half is present.
    pub fn display_version(&self) -> String {
        match (self.shortversion.is_empty(), self.version.is_empty()) {
            (false, false) => format!("{} ({})", self.shortversion, self.version),
            (false, true) => self.shortversion.clone(),
            (true, _) => self.version.clone(),
        }
    }
}

/// Decodes a value, treating JSON `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decodes a string that HockeyApp may send as a number or `null`.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!("expected a string, found {other}"))),
    }
}
