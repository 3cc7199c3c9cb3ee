//! HockeyApp payload fixtures and application builders.
//!
//! Payloads mirror what HockeyApp posts, including the nulls it sends for
//! fields it has no value for.

use std::sync::Arc;

use hooky_core::{
    ApiToken, AppCredentials, AppRegistry, Application, CrashOccurrence, EventKind,
    HandlerRegistry, Notification, NotificationHandler, PublicIdentifier,
};
use serde_json::{json, Value};

/// API token used by every fixture application.
pub const TEST_TOKEN: &str = "test-token";

/// Crash reason notification body.
pub fn crash_notification_json(public_identifier: &str, crash_reason_id: i64) -> Value {
    json!({
        "public_identifier": public_identifier,
        "type": "crash_reason",
        "url": format!("https://rink.hockeyapp.net/manage/apps/1/crash_reasons/{crash_reason_id}"),
        "sent_at": "2014-01-21T09:08:42+00:00",
        "crash_reason": {
            "id": crash_reason_id,
            "app_id": 1,
            "created_at": "2014-01-21T09:08:30Z",
            "updated_at": "2014-01-21T09:08:30Z",
            "status": 0,
            "reason": "-[__NSArrayM objectAtIndex:]: index 3 beyond bounds",
            "last_crash_at": "2014-01-21T09:08:12Z",
            "fixed": false,
            "app_version_id": 5,
            "bundle_version": "120",
            "bundle_short_version": "1.2",
            "number_of_crashes": 1,
            "method": "-[ListController tableView:cellForRowAtIndexPath:]",
            "file": "ListController.m",
            "class": "ListController",
            "line": "87"
        }
    })
}

/// App version notification body.
pub fn release_notification_json(public_identifier: &str) -> Value {
    json!({
        "public_identifier": public_identifier,
        "type": "app_version",
        "url": "https://rink.hockeyapp.net/manage/apps/1/app_versions/5",
        "sent_at": "2014-01-21T10:00:00+00:00",
        "app_version": {
            "id": 5,
            "app_id": 1,
            "version": "120",
            "shortversion": "1.2",
            "title": "Demo",
            "timestamp": 1_390_298_400,
            "appsize": 1_048_576,
            "notes": "<p>Bug fixes</p>",
            "mandatory": false,
            "minimum_os_version": "7.0",
            "device_family": null,
            "restricted_to_tags": false,
            "status": 2,
            "tags": null
        }
    })
}

fn parse(value: Value) -> Notification {
    match serde_json::from_value(value) {
        Ok(notification) => notification,
        Err(error) => panic!("fixture payload must parse: {error}"),
    }
}

/// Parsed crash reason notification.
pub fn crash_notification(public_identifier: &str, crash_reason_id: i64) -> Notification {
    parse(crash_notification_json(public_identifier, crash_reason_id))
}

/// Parsed app version notification.
pub fn release_notification(public_identifier: &str) -> Notification {
    parse(release_notification_json(public_identifier))
}

/// Crash occurrence as returned by the crash reason endpoint.
pub fn occurrence(id: i64, has_log: bool) -> CrashOccurrence {
    CrashOccurrence {
        id,
        app_id: 1,
        crash_reason_id: 42,
        bundle_version: "120".to_string(),
        bundle_short_version: "1.2".to_string(),
        has_log,
        model: "iPhone6,1".to_string(),
        oem: "Apple".to_string(),
        os_version: "7.0.4".to_string(),
        user_string: format!("user-{id}"),
        ..Default::default()
    }
}

/// Application with fixture credentials.
pub fn application(public_identifier: &str, handlers: HandlerRegistry) -> Application {
    let id = match PublicIdentifier::new(public_identifier) {
        Ok(id) => id,
        Err(error) => panic!("fixture identifier must be valid: {error}"),
    };
    Application::new("Demo", AppCredentials::new(id, ApiToken::new(TEST_TOKEN)), handlers)
}

/// Handler registry with the given handlers for one kind.
pub fn handlers_for(
    kind: EventKind,
    handlers: impl IntoIterator<Item = Arc<dyn NotificationHandler>>,
) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for handler in handlers {
        registry.register(kind, handler);
    }
    registry
}

/// Registry holding the given applications.
pub fn registry(apps: impl IntoIterator<Item = Application>) -> AppRegistry {
    let mut builder = AppRegistry::builder();
    for app in apps {
        if let Err(error) = builder.register(app) {
            panic!("fixture applications must be unique: {error}");
        }
    }
    builder.build()
}
