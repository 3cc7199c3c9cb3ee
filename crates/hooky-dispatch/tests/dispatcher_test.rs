//! Integration tests for notification dispatch.
//!
//! Drives the dispatcher with raw webhook bodies against recording handlers
//! and a scripted enrichment client:
//! - Enrichment happens before crash handlers and gates them
//! - Unknown applications are ignored without side effects
//! - Handlers run sequentially in registration order, each isolated

use std::sync::Arc;

use anyhow::Result;
use hooky_core::{EventKind, HandlerRegistry, NotificationHandler};
use hooky_dispatch::{DispatchOutcome, Dispatcher};
use hooky_testing::{fixtures, CallEvent, CallLog, RecordingHandler, StubEnrichmentClient};

fn body(value: &serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(value).expect("fixture serializes")
}

fn dispatcher(handlers: HandlerRegistry, enrichment: Arc<StubEnrichmentClient>) -> Dispatcher {
    let apps = fixtures::registry([fixtures::application("abc123", handlers)]);
    Dispatcher::new(Arc::new(apps), enrichment)
}

#[tokio::test]
async fn crash_is_enriched_then_dispatched() -> Result<()> {
    let enrichment = Arc::new(
        StubEnrichmentClient::new()
            .with_occurrences(vec![fixtures::occurrence(1, true), fixtures::occurrence(2, false)]),
    );
    let handler = Arc::new(RecordingHandler::new("tickets", CallLog::new()));
    let handlers = fixtures::handlers_for(EventKind::Crash, [handler.clone() as Arc<dyn NotificationHandler>]);

    let outcome = dispatcher(handlers, enrichment.clone())
        .on_notification(&body(&fixtures::crash_notification_json("abc123", 42)))
        .await;

    assert_eq!(outcome, DispatchOutcome::Dispatched { kind: EventKind::Crash, succeeded: 1, failed: 0 });
    assert_eq!(enrichment.occurrence_requests().await, vec![42]);

    let received = handler.received().await;
    assert_eq!(received.len(), 1);
    let reason = received[0].crash_reason().expect("crash payload");
    assert_eq!(reason.id, 42);
    assert_eq!(reason.occurrences.len(), 2);
    assert_eq!(reason.occurrences[0].user_string, "user-1");

    Ok(())
}

#[tokio::test]
async fn unknown_application_is_ignored() -> Result<()> {
    let enrichment = Arc::new(StubEnrichmentClient::new());
    let handler = Arc::new(RecordingHandler::new("tickets", CallLog::new()));
    let handlers = fixtures::handlers_for(EventKind::Crash, [handler.clone() as Arc<dyn NotificationHandler>]);

    let outcome = dispatcher(handlers, enrichment.clone())
        .on_notification(&body(&fixtures::crash_notification_json("unknown", 42)))
        .await;

    assert_eq!(outcome, DispatchOutcome::UnknownApplication);
    assert!(enrichment.occurrence_requests().await.is_empty());
    assert_eq!(handler.call_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn release_without_handlers_is_a_no_op() -> Result<()> {
    let enrichment = Arc::new(StubEnrichmentClient::new());
    let crash_handler = Arc::new(RecordingHandler::new("tickets", CallLog::new()));
    let handlers =
        fixtures::handlers_for(EventKind::Crash, [crash_handler.clone() as Arc<dyn NotificationHandler>]);

    let outcome = dispatcher(handlers, enrichment.clone())
        .on_notification(&body(&fixtures::release_notification_json("abc123")))
        .await;

    assert_eq!(outcome, DispatchOutcome::Dispatched { kind: EventKind::Release, succeeded: 0, failed: 0 });
    assert_eq!(outcome.handlers_invoked(), 0);
    assert!(enrichment.occurrence_requests().await.is_empty());
    assert_eq!(crash_handler.call_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn enrichment_failure_skips_handlers() -> Result<()> {
    let enrichment = Arc::new(StubEnrichmentClient::new().failing());
    let handler = Arc::new(RecordingHandler::new("tickets", CallLog::new()));
    let handlers = fixtures::handlers_for(EventKind::Crash, [handler.clone() as Arc<dyn NotificationHandler>]);

    let outcome = dispatcher(handlers, enrichment.clone())
        .on_notification(&body(&fixtures::crash_notification_json("abc123", 7)))
        .await;

    assert_eq!(outcome, DispatchOutcome::EnrichmentFailed);
    assert_eq!(enrichment.occurrence_requests().await, vec![7]);
    assert_eq!(handler.call_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn handlers_run_in_order_without_overlap() -> Result<()> {
    let log = CallLog::new();
    let first = Arc::new(RecordingHandler::new("first", log.clone()));
    let second = Arc::new(RecordingHandler::new("second", log.clone()));
    let handlers = fixtures::handlers_for(
        EventKind::Release,
        [first.clone() as Arc<dyn NotificationHandler>, second.clone() as Arc<dyn NotificationHandler>],
    );

    dispatcher(handlers, Arc::new(StubEnrichmentClient::new()))
        .dispatch(fixtures::release_notification("abc123"))
        .await;

    assert_eq!(
        log.events().await,
        vec![
            CallEvent::Started("first".to_string()),
            CallEvent::Finished("first".to_string()),
            CallEvent::Started("second".to_string()),
            CallEvent::Finished("second".to_string()),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn failing_handler_does_not_stop_the_next() -> Result<()> {
    let log = CallLog::new();
    let first = Arc::new(RecordingHandler::new("first", log.clone()).failing());
    let second = Arc::new(RecordingHandler::new("second", log.clone()));
    let handlers = fixtures::handlers_for(
        EventKind::Crash,
        [first.clone() as Arc<dyn NotificationHandler>, second.clone() as Arc<dyn NotificationHandler>],
    );
    let enrichment = Arc::new(StubEnrichmentClient::new().with_occurrences(vec![fixtures::occurrence(3, true)]));

    let outcome =
        dispatcher(handlers, enrichment).dispatch(fixtures::crash_notification("abc123", 42)).await;

    assert_eq!(outcome, DispatchOutcome::Dispatched { kind: EventKind::Crash, succeeded: 1, failed: 1 });
    assert_eq!(log.started().await, vec!["first", "second"]);

    let seen_by_first = first.received().await;
    let seen_by_second = second.received().await;
    assert_eq!(seen_by_first, seen_by_second);
    assert_eq!(seen_by_second[0].crash_reason().map(|r| r.occurrences.len()), Some(1));

    Ok(())
}

#[tokio::test]
async fn malformed_payload_is_rejected() -> Result<()> {
    let handler = Arc::new(RecordingHandler::new("tickets", CallLog::new()));
    let handlers = fixtures::handlers_for(EventKind::Crash, [handler.clone() as Arc<dyn NotificationHandler>]);
    let dispatcher = dispatcher(handlers, Arc::new(StubEnrichmentClient::new()));

    assert_eq!(dispatcher.on_notification(b"{").await, DispatchOutcome::Rejected);
    assert_eq!(
        dispatcher.on_notification(br#"{"public_identifier":"abc123","type":"crash_reason"}"#).await,
        DispatchOutcome::Rejected
    );
    assert_eq!(handler.call_count().await, 0);

    Ok(())
}
