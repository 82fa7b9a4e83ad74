use std::time::Instant;
use tracing::error;

use tracing_gelf_sink::init::{init_tracing_with_config, LayerConfig};
use tracing_gelf_sink::noop::NoopTransport;
use tracing_gelf_sink::{GelfSink, SinkConfig};

#[tokio::main]
async fn main() {
    // A small queue makes producers wait on the worker.
    let config = SinkConfig::new("load-test")
        .with_extra("scenario", "small-queue")
        .with_queue_capacity(64);
    let (sink, worker) = GelfSink::with_transport(NoopTransport, config).expect("start GELF worker");

    init_tracing_with_config(sink, LayerConfig { enable_stdout: false }).expect("set global subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "custom load test error");
    }

    let elapsed = start.elapsed();
    println!("custom config: submitted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    worker.shutdown().await;
}
