#![allow(dead_code)]

use async_trait::async_trait;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tracing_gelf_sink::message::WireMessage;
use tracing_gelf_sink::transport::GelfTransport;

/// Transport that hands every message to the test through a channel.
pub struct RecordingTransport {
    tx: mpsc::UnboundedSender<WireMessage>,
}

impl RecordingTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WireMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (RecordingTransport { tx }, rx)
    }
}

#[async_trait]
impl GelfTransport for RecordingTransport {
    async fn send(&self, message: &WireMessage) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.tx.send(message.clone()).map_err(|e| e.to_string().into())
    }
}

/// Fails the first `failures` sends, then records like [`RecordingTransport`].
pub struct FlakyTransport {
    failures: usize,
    attempts: AtomicUsize,
    inner: RecordingTransport,
}

impl FlakyTransport {
    pub fn new(failures: usize) -> (Self, mpsc::UnboundedReceiver<WireMessage>) {
        let (inner, rx) = RecordingTransport::new();
        let transport = FlakyTransport {
            failures,
            attempts: AtomicUsize::new(0),
            inner,
        };
        (transport, rx)
    }
}

#[async_trait]
impl GelfTransport for FlakyTransport {
    async fn send(&self, message: &WireMessage) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err("collector unreachable".into());
        }
        self.inner.send(message).await
    }
}

/// Holds every send until the test adds permits to `gate`, and reports on
/// `started` each time the worker begins a send.
pub struct GatedTransport {
    gate: Arc<Semaphore>,
    started: mpsc::UnboundedSender<()>,
    inner: RecordingTransport,
}

pub struct Gate {
    pub permits: Arc<Semaphore>,
    pub started: mpsc::UnboundedReceiver<()>,
}

impl GatedTransport {
    pub fn new() -> (Self, Gate, mpsc::UnboundedReceiver<WireMessage>) {
        let (inner, rx) = RecordingTransport::new();
        let (started_tx, started_rx) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(0));
        let transport = GatedTransport {
            gate: Arc::clone(&permits),
            started: started_tx,
            inner,
        };
        let gate = Gate {
            permits,
            started: started_rx,
        };
        (transport, gate, rx)
    }
}

#[async_trait]
impl GelfTransport for GatedTransport {
    async fn send(&self, message: &WireMessage) -> Result<(), Box<dyn Error + Send + Sync>> {
        let _ = self.started.send(());
        self.gate.acquire().await?.forget();
        self.inner.send(message).await
    }
}

pub async fn next_message(rx: &mut mpsc::UnboundedReceiver<WireMessage>) -> WireMessage {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("transport dropped")
}

/// Stand-in for an application's logging facade wrapping the sink.
#[inline(never)]
pub fn log_through_wrapper(sink: &tracing_gelf_sink::GelfSink, message: &str) {
    let event = tracing_gelf_sink::LogEvent::new(tracing_gelf_sink::Level::Info, message);
    let _ = sink.submit(event);
}

/// Same facade, passing its caller's location through.
#[track_caller]
pub fn log_through_tracked_wrapper(sink: &tracing_gelf_sink::GelfSink, message: &str) {
    let event = tracing_gelf_sink::LogEvent::new(tracing_gelf_sink::Level::Info, message);
    let _ = sink.submit(event);
}
