mod common;

use common::{next_message, RecordingTransport};
use serde_json::Value;
use tracing_gelf_sink::{GelfLayer, GelfSink, SinkConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

#[tokio::test(flavor = "multi_thread")]
async fn tracing_events_reach_the_collector() {
    let (transport, mut rx) = RecordingTransport::new();
    let config = SinkConfig::new("checkout").with_extra("service", "cart");
    let (sink, _worker) = GelfSink::with_transport(transport, config).unwrap();

    let subscriber = Registry::default().with(GelfLayer::new(sink));
    let guard = tracing::subscriber::set_default(subscriber);

    tracing::error!(order_id = 123, "order failed\ncaused by: card declined");
    let line = line!() - 1;
    tracing::debug!("debug is forwarded too");
    tracing::trace!("trace is not");
    drop(guard);

    let msg = next_message(&mut rx).await;
    assert_eq!(msg.short_message, "order failed");
    assert_eq!(msg.full_message, "order failed\ncaused by: card declined");
    assert_eq!(msg.level, 3);
    assert_eq!(msg.facility, "checkout");
    assert!(msg.file.ends_with("tests/layer.rs"), "resolved {}", msg.file);
    assert_eq!(msg.line, line);
    assert_eq!(msg.extra["_order_id"], Value::from(123));
    assert_eq!(msg.extra["_service"], Value::from("cart"));
    assert_eq!(msg.extra["_severity"], Value::from("error"));

    let msg = next_message(&mut rx).await;
    assert_eq!(msg.level, 7);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}
