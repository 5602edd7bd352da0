//! A deterministic in-memory [`Transport`] for tests, grounded in the
//! teacher's test-stub pattern of wrapping channels behind the production
//! trait instead of mocking individual calls.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::error::EciError;
use crate::transport::Transport;

pub struct InMemoryTransport {
    inbound: Mutex<mpsc::UnboundedReceiver<String>>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn connect(&self) -> Result<(), EciError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), EciError> {
        Ok(())
    }

    async fn write(&self, data: &str) -> Result<(), EciError> {
        self.outbound
            .send(data.to_string())
            .map_err(|_| EciError::connection_closed())
    }

    async fn read(&self) -> Result<String, EciError> {
        let mut rx = self.inbound.lock().await;
        rx.recv().await.ok_or_else(EciError::connection_closed)
    }
}

/// The test-side handle to an [`InMemoryTransport`]: feed panel bytes in,
/// observe what the session wrote out.
pub struct InMemoryTransportHandle {
    inbound: mpsc::UnboundedSender<String>,
    outbound: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl InMemoryTransportHandle {
    pub fn feed(&self, data: &str) {
        let _ = self.inbound.send(data.to_string());
    }

    pub async fn written(&self) -> Option<String> {
        self.outbound.lock().await.recv().await
    }

    /// Drops the inbound sender, simulating the transport observing EOF.
    pub fn close(self) {}
}

pub fn in_memory_transport() -> (Arc<InMemoryTransport>, InMemoryTransportHandle) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let transport = Arc::new(InMemoryTransport {
        inbound: Mutex::new(in_rx),
        outbound: out_tx,
    });
    let handle = InMemoryTransportHandle {
        inbound: in_tx,
        outbound: Mutex::new(out_rx),
    };
    (transport, handle)
}

/// A transport whose `connect` always fails, for exercising reconnect
/// exhaustion deterministically.
pub struct AlwaysFailTransport {
    pub attempts: std::sync::atomic::AtomicUsize,
}

impl AlwaysFailTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            attempts: std::sync::atomic::AtomicUsize::new(0),
        })
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for AlwaysFailTransport {
    async fn connect(&self) -> Result<(), EciError> {
        self.attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Err(EciError::Connection("refused".to_string()))
    }

    async fn disconnect(&self) -> Result<(), EciError> {
        Ok(())
    }

    async fn write(&self, _data: &str) -> Result<(), EciError> {
        Err(EciError::connection_closed())
    }

    async fn read(&self) -> Result<String, EciError> {
        std::future::pending().await
    }
}
