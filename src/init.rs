use crate::config::SinkConfig;
use crate::env;
use crate::error::{BuildError, ConfigError};
use crate::layer::GelfLayer;
use crate::sink::GelfSink;
use crate::worker::WorkerHandle;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Subscriber settings applied by [`init_tracing_with_config`].
///
/// **Fields**
/// - `enable_stdout`: when `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked on top of [`GelfLayer`] so events are printed to the console
///   as well.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self { enable_stdout: true }
    }
}

/// Errors from [`init_from_env`].
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Install a global `tracing` subscriber forwarding to `sink`.
///
/// **Parameters**
/// - `sink`: the [`GelfSink`] receiving events.
/// - `config`: [`LayerConfig`] controlling console output.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`GelfLayer`] as the global default
/// subscriber, so all `tracing` events in the process are observed.
pub fn init_tracing_with_config(sink: GelfSink, config: LayerConfig) -> Result<(), SetGlobalDefaultError> {
    let layer = GelfLayer::new(sink);

    // Two subscriber types, one per console setting.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)
    }
}

/// Install the global subscriber with [`LayerConfig::default`].
pub fn init_tracing(sink: GelfSink) -> Result<(), SetGlobalDefaultError> {
    init_tracing_with_config(sink, LayerConfig::default())
}

/// Connect a sink configured from `GELF_*` environment variables and install
/// it globally. This is the recommended entrypoint for typical services.
pub async fn init_from_env(config: LayerConfig) -> Result<WorkerHandle, InitError> {
    let endpoint = env::endpoint_from_env().map_err(BuildError::from)?;
    let sink_config = SinkConfig::from_env()?;

    let (sink, handle) = GelfSink::connect(&endpoint.authority(), sink_config).await?;
    init_tracing_with_config(sink, config)?;

    Ok(handle)
}
