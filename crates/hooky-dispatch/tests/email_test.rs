//! Integration tests for the email release handler.

use std::sync::Arc;

use anyhow::Result;
use hooky_core::{EventKind, HandlerRegistry};
use hooky_dispatch::{
    client::ClientConfig, handlers::EmailFactory, mock::RecordingMailTransport, HandlerContext,
    HandlerFactory,
};
use hooky_testing::{fixtures, StubEnrichmentClient};
use serde_json::json;

fn context() -> HandlerContext {
    HandlerContext::new(Arc::new(StubEnrichmentClient::new()), ClientConfig::default())
}

fn options(subject_prefix: Option<&str>) -> serde_json::Value {
    json!({
        "smtp_host": "smtp.example.com",
        "from_address": "Hooky <hooky@example.com>",
        "to_addresses": ["qa@example.com", "dev@example.com"],
        "subject_prefix": subject_prefix
    })
}

#[tokio::test]
async fn sends_one_message_to_all_recipients() -> Result<()> {
    let transport = RecordingMailTransport::new();
    let factory = EmailFactory::with_transport(Arc::new(transport.clone()));
    let handler = factory.build(&options(None), &context()).await?;

    let app = fixtures::application("abc123", HandlerRegistry::new());
    handler.handle(&app, &fixtures::release_notification("abc123")).await?;

    let sent = transport.sent().await;
    assert_eq!(sent.len(), 1);

    let mail = &sent[0];
    assert_eq!(mail.subject, "[Demo] Demo 1.2 (120) released");
    assert_eq!(mail.from.email.to_string(), "hooky@example.com");
    let recipients: Vec<String> = mail.to.iter().map(|m| m.email.to_string()).collect();
    assert_eq!(recipients, vec!["qa@example.com", "dev@example.com"]);
    assert!(mail.html_body.contains("<p>Bug fixes</p>"));
    assert!(mail.html_body.contains("https://rink.hockeyapp.net/manage/apps/1/app_versions/5"));

    Ok(())
}

#[tokio::test]
async fn subject_prefix_and_mandatory_flag() -> Result<()> {
    let transport = RecordingMailTransport::new();
    let factory = EmailFactory::with_transport(Arc::new(transport.clone()));
    let handler = factory.build(&options(Some("Beta")), &context()).await?;

    let mut payload = fixtures::release_notification_json("abc123");
    payload["app_version"]["mandatory"] = json!(true);
    let notification: hooky_core::Notification = serde_json::from_value(payload)?;

    let app = fixtures::application("abc123", HandlerRegistry::new());
    handler.handle(&app, &notification).await?;

    let sent = transport.sent().await;
    assert_eq!(sent[0].subject, "[Beta] Demo 1.2 (120) released - mandatory update");

    Ok(())
}

#[tokio::test]
async fn transport_failure_fails_the_handler() -> Result<()> {
    let transport = RecordingMailTransport::new();
    transport.fail_sends(true);
    let factory = EmailFactory::with_transport(Arc::new(transport.clone()));
    let handler = factory.build(&options(None), &context()).await?;

    let app = fixtures::application("abc123", HandlerRegistry::new());
    let error = handler.handle(&app, &fixtures::release_notification("abc123")).await.unwrap_err();

    assert_eq!(error.code(), "E2002");
    assert_eq!(transport.sent_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn crash_notifications_are_unsupported() -> Result<()> {
    let factory = EmailFactory::with_transport(Arc::new(RecordingMailTransport::new()));
    let handler = factory.build(&options(None), &context()).await?;

    let app = fixtures::application("abc123", HandlerRegistry::new());
    let error = handler.handle(&app, &fixtures::crash_notification("abc123", 42)).await.unwrap_err();

    assert_eq!(error.code(), "E1002");
    assert!(!factory.supports(EventKind::Crash));

    Ok(())
}

#[tokio::test]
async fn invalid_sender_fails_construction() {
    let factory = EmailFactory::with_transport(Arc::new(RecordingMailTransport::new()));
    let mut options = options(None);
    options["from_address"] = json!("nobody");

    let error = factory.build(&options, &context()).await.unwrap_err();
    assert_eq!(error.code(), "E3002");
}
