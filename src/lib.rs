pub mod record;
pub mod caller;
pub mod message;
pub mod transport;
pub mod udp;
pub mod worker;
pub mod sink;
pub mod layer;

pub mod config;
pub mod endpoint;
pub mod env;
pub mod error;
pub mod init;
pub mod noop;

pub use config::SinkConfig;
pub use error::{BuildError, SubmitError};
pub use layer::GelfLayer;
pub use record::{FieldValue, Level, LogEvent};
pub use sink::GelfSink;
