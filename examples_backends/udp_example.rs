use tracing::{error, info, warn};

use tracing_gelf_sink::init::init_tracing;
use tracing_gelf_sink::{env, GelfSink, SinkConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1) Point GELF_ADDRESS at a Graylog GELF UDP input,
    //    e.g. `udp://127.0.0.1:12201`.
    let address = env::env_or(env::GELF_ADDRESS_ENV, env::DEFAULT_ADDRESS);

    // 2) Create the sink and install the tracing layer.
    let config = SinkConfig::new("udp-example").with_extra("env", "dev");
    let (sink, worker) = GelfSink::connect(&address, config).await?;
    init_tracing(sink)?;

    // 3) Emit some events. Multi-line messages keep their first line
    //    as the short message.
    info!("service started");
    warn!(free_mb = 120, "disk space low");
    error!(order_id = 123, "order failed\ncaused by: payment gateway timeout");

    // 4) Deliver what is still queued before exiting.
    worker.shutdown().await;
    Ok(())
}
