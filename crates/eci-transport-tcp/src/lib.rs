//! A [`Transport`] over `tokio::net::TcpStream`, grounded in
//! `original_source/elitecloud_alarm/transport.py::TcpTransport` and in the
//! teacher's `spark-transport-tcp` channel shape (a single async mutex
//! guarding the currently-active half of the stream).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eci_core::{EciError, Transport};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone)]
pub struct TcpTransportConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
}

impl TcpTransportConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

enum StreamState {
    Disconnected,
    Connected(TcpStream),
}

/// A `Transport` that dials `host:port` on [`connect`](Transport::connect)
/// and tears the socket down on [`disconnect`](Transport::disconnect)/EOF.
pub struct TcpTransport {
    config: TcpTransportConfig,
    state: Mutex<StreamState>,
}

impl TcpTransport {
    pub fn new(config: TcpTransportConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: Mutex::new(StreamState::Disconnected),
        })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    #[tracing::instrument(skip(self), fields(host = %self.config.host, port = self.config.port))]
    async fn connect(&self) -> Result<(), EciError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| EciError::Connection(format!("connect to {addr} timed out")))?
            .map_err(|e| EciError::Connection(format!("connect to {addr} failed: {e}")))?;

        let mut state = self.state.lock().await;
        *state = StreamState::Connected(stream);
        tracing::info!(%addr, "connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), EciError> {
        let mut state = self.state.lock().await;
        if let StreamState::Connected(stream) = &mut *state {
            let _ = stream.shutdown().await;
        }
        *state = StreamState::Disconnected;
        Ok(())
    }

    async fn write(&self, data: &str) -> Result<(), EciError> {
        let mut state = self.state.lock().await;
        match &mut *state {
            StreamState::Connected(stream) => stream
                .write_all(data.as_bytes())
                .await
                .map_err(|e| EciError::Connection(format!("write failed: {e}"))),
            StreamState::Disconnected => Err(EciError::connection_closed()),
        }
    }

    async fn read(&self) -> Result<String, EciError> {
        let mut state = self.state.lock().await;
        match &mut *state {
            StreamState::Connected(stream) => {
                let mut buf = [0u8; READ_CHUNK];
                let n = stream
                    .read(&mut buf)
                    .await
                    .map_err(|e| EciError::Connection(format!("read failed: {e}")))?;
                if n == 0 {
                    return Err(EciError::connection_closed());
                }
                Ok(String::from_utf8_lossy(&buf[..n]).into_owned())
            }
            StreamState::Disconnected => Err(EciError::connection_closed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn round_trips_bytes_over_a_real_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(&buf[..n]).await.unwrap();
        });

        let transport = TcpTransport::new(TcpTransportConfig::new(addr.ip().to_string(), addr.port()));
        transport.connect().await.unwrap();
        transport.write("PING\n").await.unwrap();
        let echoed = transport.read().await.unwrap();
        assert_eq!(echoed, "PING\n");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn write_before_connect_errors() {
        let transport = TcpTransport::new(TcpTransportConfig::new("127.0.0.1", 1));
        let err = transport.write("hi\n").await.unwrap_err();
        assert!(matches!(err, EciError::Connection(_)));
    }
}
