use async_trait::async_trait;
use tracing::{error, info};
use tracing_gelf_sink::{
    init::init_tracing,
    message::WireMessage,
    transport::GelfTransport,
    GelfSink, SinkConfig,
};

/// Example of shipping GELF messages somewhere else than UDP by
/// implementing the `GelfTransport` trait directly. Imagine this posts
/// to an HTTP GELF input; for the sake of example we just print the JSON.
struct StdoutTransport;

#[async_trait]
impl GelfTransport for StdoutTransport {
    async fn send(&self, message: &WireMessage) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!("[gelf] {}", serde_json::to_string(message)?);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (sink, worker) = GelfSink::with_transport(StdoutTransport, SinkConfig::new("custom-transport"))?;

    init_tracing(sink)?;

    info!("custom transport example started");
    error!(db = "orders", "simulated error sent via custom transport");

    worker.shutdown().await;
    Ok(())
}
