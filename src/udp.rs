//! GELF over UDP.
//!
//! Each message is serialized to JSON, optionally compressed, and sent as a
//! single datagram when it fits in `chunk_size` bytes. Larger payloads are
//! split into chunks carrying a 12 byte header:
//!
//! ```text
//! 0x1e 0x0f | message id (8 bytes, big endian) | seq num | seq count | data
//! ```

use crate::endpoint::Endpoint;
use crate::error::{BuildError, TransportError};
use crate::message::WireMessage;
use crate::transport::GelfTransport;
use async_trait::async_trait;
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::OnceCell;

/// Largest datagram sent without chunking, and the size of every chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1420;

/// Most chunks a collector will reassemble into one message.
pub const MAX_CHUNKS: usize = 128;

const CHUNK_MAGIC: [u8; 2] = [0x1e, 0x0f];
const CHUNK_HEADER_LEN: usize = 12;

/// Payload compression applied before chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zlib,
    None,
}

impl Default for Compression {
    #[cfg(feature = "compression")]
    fn default() -> Self {
        Compression::Gzip
    }

    #[cfg(not(feature = "compression"))]
    fn default() -> Self {
        Compression::None
    }
}

impl Compression {
    pub fn encode(self, payload: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        match self {
            Compression::None => Ok(payload),
            #[cfg(feature = "compression")]
            Compression::Gzip => {
                use std::io::Write;

                let mut encoder = libflate::gzip::Encoder::new(Vec::new()).map_err(TransportError::Compress)?;
                encoder.write_all(&payload).map_err(TransportError::Compress)?;
                encoder.finish().into_result().map_err(TransportError::Compress)
            }
            #[cfg(feature = "compression")]
            Compression::Zlib => {
                use std::io::Write;

                let mut encoder = libflate::zlib::Encoder::new(Vec::new()).map_err(TransportError::Compress)?;
                encoder.write_all(&payload).map_err(TransportError::Compress)?;
                encoder.finish().into_result().map_err(TransportError::Compress)
            }
            #[cfg(not(feature = "compression"))]
            other => Err(TransportError::CompressionDisabled(other)),
        }
    }
}

/// Split `payload` into the datagrams that carry it.
///
/// Payloads up to `chunk_size` bytes travel as-is in one datagram.
pub fn datagrams(payload: Vec<u8>, chunk_size: usize, message_id: u64) -> Result<Vec<Vec<u8>>, TransportError> {
    if payload.len() <= chunk_size {
        return Ok(vec![payload]);
    }

    let data_len = chunk_size.saturating_sub(CHUNK_HEADER_LEN).max(1);
    let count = payload.len().div_ceil(data_len);
    if count > MAX_CHUNKS {
        return Err(TransportError::TooManyChunks {
            chunks: count,
            max: MAX_CHUNKS,
        });
    }

    let id = message_id.to_be_bytes();
    let chunks = payload
        .chunks(data_len)
        .enumerate()
        .map(|(seq, data)| {
            let mut dgram = Vec::with_capacity(CHUNK_HEADER_LEN + data.len());
            dgram.extend_from_slice(&CHUNK_MAGIC);
            dgram.extend_from_slice(&id);
            dgram.push(seq as u8);
            dgram.push(count as u8);
            dgram.extend_from_slice(data);
            dgram
        })
        .collect();

    Ok(chunks)
}

/// [`GelfTransport`] writing to a connected UDP socket.
///
/// The socket is registered with a Tokio reactor on first send, which puts
/// it on the delivery worker's runtime rather than the one that built it.
pub struct UdpTransport {
    bound: std::net::UdpSocket,
    socket: OnceCell<UdpSocket>,
    compression: Compression,
    chunk_size: usize,
}

impl UdpTransport {
    /// Resolve `endpoint` and connect a local UDP socket to it.
    ///
    /// Fails if the host does not resolve or the socket can't be set up.
    /// UDP has no handshake, so a resolvable but unreachable collector is
    /// only noticed (and ignored) at send time.
    pub async fn connect(endpoint: &Endpoint) -> Result<Self, BuildError> {
        let remote = tokio::net::lookup_host(endpoint.authority())
            .await?
            .next()
            .ok_or_else(|| BuildError::Unresolved(endpoint.authority()))?;

        let local: SocketAddr = if remote.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        let bound = std::net::UdpSocket::bind(local)?;
        bound.connect(remote)?;
        bound.set_nonblocking(true)?;

        Ok(UdpTransport {
            bound,
            socket: OnceCell::new(),
            compression: Compression::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Values below the chunk header size plus one byte are raised to it.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(CHUNK_HEADER_LEN + 1);
        self
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.bound.peer_addr()
    }

    async fn socket(&self) -> io::Result<&UdpSocket> {
        self.socket
            .get_or_try_init(|| async { UdpSocket::from_std(self.bound.try_clone()?) })
            .await
    }

    fn encode(&self, message: &WireMessage) -> Result<Vec<Vec<u8>>, TransportError> {
        let json = serde_json::to_vec(message)?;
        let payload = self.compression.encode(json)?;
        datagrams(payload, self.chunk_size, rand::random())
    }
}

#[async_trait]
impl GelfTransport for UdpTransport {
    async fn send(&self, message: &WireMessage) -> Result<(), Box<dyn Error + Send + Sync>> {
        let socket = self.socket().await.map_err(TransportError::Io)?;
        for dgram in self.encode(message)? {
            socket.send(&dgram).await.map_err(TransportError::Io)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_payloads_are_not_chunked() {
        let payload = b"{\"short_message\":\"hi\"}".to_vec();
        let dgrams = datagrams(payload.clone(), DEFAULT_CHUNK_SIZE, 7).unwrap();
        assert_eq!(dgrams, vec![payload]);
    }

    #[test]
    fn large_payloads_are_chunked_with_headers() {
        let payload: Vec<u8> = (0..50u8).collect();
        // 10 data bytes per chunk
        let dgrams = datagrams(payload.clone(), 22, 0x0102030405060708).unwrap();

        assert_eq!(dgrams.len(), 5);
        for (seq, dgram) in dgrams.iter().enumerate() {
            assert_eq!(&dgram[..2], &CHUNK_MAGIC);
            assert_eq!(&dgram[2..10], &[1, 2, 3, 4, 5, 6, 7, 8]);
            assert_eq!(dgram[10] as usize, seq);
            assert_eq!(dgram[11], 5);
        }

        let reassembled: Vec<u8> = dgrams.iter().flat_map(|d| d[CHUNK_HEADER_LEN..].to_vec()).collect();
        assert_eq!(reassembled, payload);
    }

    #[test]
    fn refuses_more_than_max_chunks() {
        let payload = vec![b'x'; 10 * (MAX_CHUNKS + 1)];
        let err = datagrams(payload, 22, 1).unwrap_err();
        assert!(matches!(err, TransportError::TooManyChunks { chunks, max } if chunks == MAX_CHUNKS + 1 && max == MAX_CHUNKS));
    }

    #[cfg(feature = "compression")]
    #[test]
    fn gzip_payload_decodes() {
        use std::io::Read;

        let compressed = Compression::Gzip.encode(b"{\"a\":1}".to_vec()).unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);

        let mut decoded = String::new();
        libflate::gzip::Decoder::new(&compressed[..])
            .unwrap()
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "{\"a\":1}");
    }

    #[test]
    fn uncompressed_payload_is_untouched() {
        assert_eq!(Compression::None.encode(b"abc".to_vec()).unwrap(), b"abc".to_vec());
    }
}
