//! Transports a session can run over.

use std::future::Future;
use std::io;

use esplink_protocol::Endpoint;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Opens the byte stream to the device's streaming endpoint.
///
/// The returned future resolving `Ok` is the transport's readiness signal.
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn connect(&self, endpoint: &Endpoint) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Plain TCP, as spoken by WiFi Firmata firmware.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, endpoint: &Endpoint) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;
        // Pin commands are a few bytes each.
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}
