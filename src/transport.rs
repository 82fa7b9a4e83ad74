use crate::message::WireMessage;
use async_trait::async_trait;
use std::error::Error;

/// Network client that puts a [`WireMessage`] on the wire.
///
/// Implementations own the socket, the encoding and the framing. The
/// delivery worker calls `send` from its background task, one message at a
/// time, and never awaits it on an application thread.
#[async_trait]
pub trait GelfTransport: Send + Sync {
    /// Send a single message to the collector.
    ///
    /// **Returns**
    /// - `Ok(())` once the message was handed to the network.
    /// - `Err(..)` on encoding or socket errors. The worker drops the
    ///   message; there is no retry.
    async fn send(&self, message: &WireMessage) -> Result<(), Box<dyn Error + Send + Sync>>;
}

#[async_trait]
impl<T> GelfTransport for Box<T>
where
    T: GelfTransport + ?Sized,
{
    async fn send(&self, message: &WireMessage) -> Result<(), Box<dyn Error + Send + Sync>> {
        (**self).send(message).await
    }
}
