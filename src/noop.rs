use crate::message::WireMessage;
use crate::transport::GelfTransport;
use async_trait::async_trait;
use std::error::Error;

/// A transport that simply drops all messages.
///
/// Useful for measuring the overhead of the pipeline itself without any
/// network I/O, and for tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopTransport;

#[async_trait]
impl GelfTransport for NoopTransport {
    async fn send(&self, _message: &WireMessage) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
