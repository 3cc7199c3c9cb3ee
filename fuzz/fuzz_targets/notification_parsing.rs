#![no_main]

//! Fuzz target for webhook notification parsing.
//!
//! Arbitrary bodies must either parse into a notification or produce an
//! `InvalidPayload` error. Parsed notifications must survive every
//! accessor the dispatcher and handlers use.

use hooky_core::{EventKind, Notification};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    fuzz_notification_parsing(data);
});

fn fuzz_notification_parsing(data: &[u8]) {
    let notification = match Notification::from_slice(data) {
        Ok(notification) => notification,
        Err(error) => {
            assert_eq!(error.code(), "E1001");
            return;
        },
    };

    let _ = notification.public_identifier.as_str();

    match notification.kind() {
        EventKind::Crash => {
            let reason = notification.crash_reason();
            assert!(reason.is_some());
            if let Some(reason) = reason {
                assert!(reason.occurrences.is_empty());
            }
        },
        EventKind::Release => {
            if let Some(version) = notification.app_version() {
                let _ = version.display_version();
            }
        },
    }

    // Re-serializing a parsed notification must round-trip through the parser.
    if let Ok(encoded) = serde_json::to_vec(&notification) {
        let _ = Notification::from_slice(&encoded);
    }
}
