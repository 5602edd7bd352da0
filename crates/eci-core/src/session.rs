//! The session layer: transport ownership, the read task, the consumer
//! registry, the two-sided connected event and the supervised reconnect
//! worker (spec §5), grounded in `original_source/elitecloud_alarm/session.py`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::auth;
use crate::consumer::{Outcome, Sink};
use crate::error::EciError;
use crate::event::{CancelSignal, ToggleEvent};
use crate::reconnect;
use crate::registry::{Registry, RegistrationGuard};
use crate::request::Request;
use crate::transport::Transport;

/// Credentials exchanged when the panel challenges with a login prompt.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Tunables for connection, authentication, and reconnect behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub delimiter: String,
    pub connection_timeout: Duration,
    pub authentication_timeout: Duration,
    pub reconnect_delay: Duration,
    pub max_retries: u32,
    pub status_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            delimiter: "\n".to_string(),
            connection_timeout: Duration::from_secs(10),
            authentication_timeout: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(1),
            max_retries: 10,
            status_timeout: Duration::from_millis(100),
        }
    }
}

impl SessionConfig {
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_authentication_timeout(mut self, timeout: Duration) -> Self {
        self.authentication_timeout = timeout;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }
}

fn add_delimiter_if_missing(message: &str, delimiter: &str) -> String {
    if message.ends_with(delimiter) {
        message.to_string()
    } else {
        format!("{message}{delimiter}")
    }
}

#[derive(Default)]
struct Tasks {
    read: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

pub(crate) struct SessionInner {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) config: SessionConfig,
    pub(crate) registry: Registry,
    pub(crate) connected: ToggleEvent,
    pub(crate) cancel: CancelSignal,
    connect_lock: AsyncMutex<()>,
    tasks: std::sync::Mutex<Tasks>,
}

impl SessionInner {
    pub(crate) async fn send_and_await<T: Send + 'static>(&self, request: Request<T>) -> Result<T, EciError> {
        let deadline = request.timeout;
        let guard = self.registry.register(request.consumer);
        let payload = add_delimiter_if_missing(&request.data, &self.config.delimiter);
        self.write_raw(&payload).await?;
        let outcome = match deadline {
            Some(duration) => match tokio::time::timeout(duration, request.pending).await {
                Ok(received) => received.map_err(|_| EciError::connection_closed()),
                Err(_) => Err(EciError::Timeout),
            },
            None => request.pending.await.map_err(|_| EciError::connection_closed()),
        };
        drop(guard);
        outcome?
    }

    pub(crate) async fn listen_and_await<T: Send + 'static>(
        &self,
        consumer: Arc<dyn Sink>,
        pending: tokio::sync::oneshot::Receiver<Result<T, EciError>>,
    ) -> Result<T, EciError> {
        let guard = self.registry.register(consumer);
        let outcome = pending.await.map_err(|_| EciError::connection_closed());
        drop(guard);
        outcome?
    }

    pub(crate) async fn write_raw(&self, data: &str) -> Result<(), EciError> {
        if let Err(e) = self.transport.write(data).await {
            self.connected.clear();
            return Err(e);
        }
        Ok(())
    }

    /// Writes `data` + delimiter without registering any consumer.
    pub(crate) async fn write_line(&self, data: &str) -> Result<(), EciError> {
        let payload = add_delimiter_if_missing(data, &self.config.delimiter);
        self.write_raw(&payload).await
    }

    async fn ensure_connected(&self) -> Result<(), EciError> {
        tokio::time::timeout(self.config.connection_timeout, self.connected.wait_set())
            .await
            .map_err(|_| EciError::Connection("timed out waiting for connection".to_string()))
    }

    /// Tears down the live connection: clears the connected flag, stops the
    /// read task, disconnects the transport and fails every pending consumer.
    async fn cleanup_connection(&self) {
        self.connected.clear();
        let read_task = {
            let mut tasks = self.tasks.lock().expect("tasks mutex poisoned");
            tasks.read.take()
        };
        if let Some(handle) = read_task {
            handle.abort();
        }
        let _ = self.transport.disconnect().await;
        self.registry.fail_all(&EciError::connection_closed());
    }

    /// Connects the transport, starts the read task, authenticates, and
    /// flips the connected event — all under `connect_lock` so concurrent
    /// callers never race each other into a double connect.
    pub(crate) async fn establish_connection(self: &Arc<Self>) -> Result<(), EciError> {
        let _guard = self.connect_lock.lock().await;
        self.transport.connect().await?;

        let read_handle = {
            let inner = self.clone();
            tokio::spawn(async move { inner.read_loop().await })
        };
        {
            let mut tasks = self.tasks.lock().expect("tasks mutex poisoned");
            tasks.read = Some(read_handle);
        }

        if let Err(e) = auth::authenticate(self).await {
            self.cleanup_connection().await;
            return Err(e);
        }

        self.connected.set();
        Ok(())
    }

    async fn read_loop(self: Arc<Self>) {
        loop {
            match self.transport.read().await {
                Ok(chunk) => self.registry.dispatch(&chunk),
                Err(e) => {
                    tracing::warn!(error = %e, "transport read failed, tearing down connection");
                    self.cleanup_connection().await;
                    return;
                }
            }
        }
    }
}

/// A live connection to a panel: transport ownership, authentication, and an
/// automatically-supervised reconnect loop.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, credentials: Option<Credentials>, config: SessionConfig) -> Self {
        let inner = Arc::new(SessionInner {
            transport,
            credentials,
            config,
            registry: Registry::new(),
            connected: ToggleEvent::new(false),
            cancel: CancelSignal::new(),
            connect_lock: AsyncMutex::new(()),
            tasks: std::sync::Mutex::new(Tasks::default()),
        });
        Self { inner }
    }

    /// Idempotent: starts the reconnect worker on first call, then waits for
    /// the connection to come up.
    #[tracing::instrument(skip(self))]
    pub async fn connect(&self) -> Result<(), EciError> {
        {
            let mut tasks = self.inner.tasks.lock().expect("tasks mutex poisoned");
            if tasks.reconnect.is_none() {
                let inner = self.inner.clone();
                tasks.reconnect = Some(tokio::spawn(async move { reconnect::run(inner).await }));
            }
        }
        self.inner.ensure_connected().await
    }

    pub fn connected(&self) -> bool {
        self.inner.connected.is_set()
    }

    #[tracing::instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<(), EciError> {
        self.inner.cancel.cancel();
        self.inner.cleanup_connection().await;
        let reconnect_task = {
            let mut tasks = self.inner.tasks.lock().expect("tasks mutex poisoned");
            tasks.reconnect.take()
        };
        if let Some(handle) = reconnect_task {
            handle.abort();
        }
        Ok(())
    }

    /// Sends a request's bytes and awaits its parsed result, bounded by
    /// [`SessionConfig::connection_timeout`] for the initial connectedness wait
    /// and, if set via [`Request::with_timeout`], by a separate per-request
    /// deadline on the response itself.
    #[tracing::instrument(skip(self, request), fields(command = %request.data))]
    pub async fn request<T: Send + 'static>(&self, request: Request<T>) -> Result<T, EciError> {
        self.inner.ensure_connected().await?;
        self.inner.send_and_await(request).await
    }

    /// Registers a long-lived event subscription; drop the returned guard to
    /// unsubscribe.
    pub fn subscribe<T: Send + 'static>(
        &self,
        transformer: crate::flow::Flow<T>,
    ) -> (RegistrationGuard, tokio::sync::mpsc::UnboundedReceiver<Outcome<T>>) {
        let (consumer, rx) = crate::consumer::QueueConsumer::new(transformer);
        let guard = self.inner.registry.register(consumer);
        (guard, rx)
    }

    pub async fn write_line(&self, data: &str) -> Result<(), EciError> {
        self.inner.ensure_connected().await?;
        self.inner.write_line(data).await
    }
}

pub(crate) async fn with_auth_timeout<T>(
    config: &SessionConfig,
    fut: impl Future<Output = Result<T, EciError>>,
) -> Result<T, EciError> {
    match tokio::time::timeout(config.authentication_timeout, fut).await {
        Err(_) => Err(EciError::Timeout),
        Ok(Err(EciError::Connection(_))) => Err(EciError::InvalidCredentials),
        Ok(Err(e)) => Err(e),
        Ok(Ok(v)) => Ok(v),
    }
}
