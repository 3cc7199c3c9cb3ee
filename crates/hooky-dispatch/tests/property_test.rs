//! Property-based tests for dispatch invariants.
//!
//! For any mix of succeeding and failing handlers, every handler is
//! invoked exactly once, in registration order, without overlap, and all
//! of them see the same enriched payload.

use std::sync::Arc;

use hooky_core::{EventKind, HandlerRegistry, NotificationHandler};
use hooky_dispatch::{DispatchOutcome, Dispatcher};
use hooky_testing::{fixtures, CallEvent, CallLog, RecordingHandler, StubEnrichmentClient};
use proptest::prelude::*;

fn recording_handlers(failures: &[bool], log: &CallLog) -> Vec<Arc<RecordingHandler>> {
    failures
        .iter()
        .enumerate()
        .map(|(index, fails)| {
            let handler = RecordingHandler::new(format!("h{index}"), log.clone());
            Arc::new(if *fails { handler.failing() } else { handler })
        })
        .collect()
}

fn registry_for(kind: EventKind, handlers: &[Arc<RecordingHandler>]) -> HandlerRegistry {
    fixtures::handlers_for(
        kind,
        handlers.iter().map(|h| h.clone() as Arc<dyn NotificationHandler>),
    )
}

proptest! {
    /// Every crash handler runs once with the enriched payload, regardless
    /// of how many handlers before it failed.
    #[test]
    fn crash_handlers_all_run_in_order(
        failures in prop::collection::vec(any::<bool>(), 0..8),
        crash_reason_id in 1i64..1_000_000,
        occurrence_count in 0usize..4,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let log = CallLog::new();
            let handlers = recording_handlers(&failures, &log);
            let occurrences =
                (0..occurrence_count).map(|i| fixtures::occurrence(i as i64, false)).collect();
            let enrichment = Arc::new(StubEnrichmentClient::new().with_occurrences(occurrences));

            let apps = fixtures::registry([fixtures::application(
                "abc123",
                registry_for(EventKind::Crash, &handlers),
            )]);
            let dispatcher = Dispatcher::new(Arc::new(apps), enrichment.clone());

            let outcome =
                dispatcher.dispatch(fixtures::crash_notification("abc123", crash_reason_id)).await;

            let expected_failed = failures.iter().filter(|f| **f).count();
            prop_assert_eq!(outcome, DispatchOutcome::Dispatched {
                kind: EventKind::Crash,
                succeeded: failures.len() - expected_failed,
                failed: expected_failed,
            });
            prop_assert_eq!(enrichment.occurrence_requests().await, vec![crash_reason_id]);

            let expected_events: Vec<CallEvent> = (0..failures.len())
                .flat_map(|i| {
                    [CallEvent::Started(format!("h{i}")), CallEvent::Finished(format!("h{i}"))]
                })
                .collect();
            prop_assert_eq!(log.events().await, expected_events);

            for handler in &handlers {
                let received = handler.received().await;
                prop_assert_eq!(received.len(), 1);
                let reason = received[0].crash_reason().unwrap();
                prop_assert_eq!(reason.id, crash_reason_id);
                prop_assert_eq!(reason.occurrences.len(), occurrence_count);
            }

            Ok(())
        })?;
    }

    /// Notifications for identifiers that are not registered never reach
    /// enrichment or handlers.
    #[test]
    fn unknown_identifiers_have_no_side_effects(
        public_identifier in "[a-z0-9]{1,32}",
        crash in any::<bool>(),
    ) {
        prop_assume!(public_identifier != "abc123");

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let log = CallLog::new();
            let handlers = recording_handlers(&[false, true], &log);
            let mut registry = registry_for(EventKind::Crash, &handlers);
            for handler in &handlers {
                registry.register(EventKind::Release, handler.clone());
            }

            let enrichment = Arc::new(StubEnrichmentClient::new());
            let apps = fixtures::registry([fixtures::application("abc123", registry)]);
            let dispatcher = Dispatcher::new(Arc::new(apps), enrichment.clone());

            let notification = if crash {
                fixtures::crash_notification(&public_identifier, 42)
            } else {
                fixtures::release_notification(&public_identifier)
            };

            prop_assert_eq!(dispatcher.dispatch(notification).await, DispatchOutcome::UnknownApplication);
            prop_assert!(enrichment.occurrence_requests().await.is_empty());
            prop_assert!(log.events().await.is_empty());

            Ok(())
        })?;
    }

    /// Arbitrary bytes never panic the dispatcher.
    #[test]
    fn arbitrary_bodies_never_panic(raw in prop::collection::vec(any::<u8>(), 0..512)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let apps = fixtures::registry([fixtures::application("abc123", HandlerRegistry::new())]);
            let dispatcher = Dispatcher::new(Arc::new(apps), Arc::new(StubEnrichmentClient::new()));

            let outcome = dispatcher.on_notification(&raw).await;
            prop_assert_eq!(outcome.handlers_invoked(), 0);

            Ok(())
        })?;
    }
}
