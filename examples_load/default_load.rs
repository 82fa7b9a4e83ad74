use std::time::Instant;
use tracing::error;

use tracing_gelf_sink::init::{init_tracing_with_config, LayerConfig};
use tracing_gelf_sink::noop::NoopTransport;
use tracing_gelf_sink::{GelfSink, SinkConfig};

#[tokio::main]
async fn main() {
    let (sink, worker) = GelfSink::with_transport(NoopTransport, SinkConfig::new("load-test")).expect("start GELF worker");
    let stats_sink = sink.clone();
    init_tracing_with_config(sink, LayerConfig { enable_stdout: false }).expect("set global subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: submitted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    worker.shutdown().await;
    println!("delivered {} events", stats_sink.stats().delivered());
}
