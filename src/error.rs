use crate::endpoint::EndpointError;

/// Error returned when a [`GelfSink`](crate::sink::GelfSink) cannot be built.
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("invalid GELF endpoint: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("GELF endpoint {0} did not resolve to any address")]
    Unresolved(String),

    #[error("failed to set up UDP socket: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned by [`GelfSink::submit`](crate::sink::GelfSink::submit).
///
/// Delivery problems are never reported here; the only failure is a queue
/// whose worker has already shut down.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SubmitError {
    #[error("log queue is closed")]
    Closed,
}

/// Error produced by the UDP transport while sending one message.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("failed to encode GELF message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to compress GELF payload: {0}")]
    Compress(#[source] std::io::Error),

    #[error("{0:?} compression requires the `compression` feature")]
    CompressionDisabled(crate::udp::Compression),

    #[error("message needs {chunks} chunks, at most {max} are allowed")]
    TooManyChunks { chunks: usize, max: usize },

    #[error("failed to send datagram: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned when configuration read from the environment is invalid.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}")]
    InvalidValue { name: &'static str, value: String },
}
