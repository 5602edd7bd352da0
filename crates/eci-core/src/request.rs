//! `Request<T>`: outbound text paired with its inbound consumer and the
//! eventual parsed result (spec §4.4).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::consumer::{FutureConsumer, Sink, SlidingTimeoutConsumer};
use crate::error::EciError;
use crate::flow::Flow;

/// A fully-formed command: the bytes to write, the consumer registered to
/// read the response, and the one-shot result it will eventually produce.
pub struct Request<T: Send + 'static> {
    pub data: String,
    pub(crate) consumer: Arc<dyn Sink>,
    pub(crate) pending: oneshot::Receiver<Result<T, EciError>>,
    pub(crate) timeout: Option<Duration>,
}

impl<T: Send + 'static> Request<T> {
    /// A request whose response is the first `Go`/`Error` the transformer produces.
    pub fn single_shot(data: impl Into<String>, transformer: Flow<T>) -> Self {
        let (consumer, pending) = FutureConsumer::new(transformer);
        Self {
            data: data.into(),
            consumer,
            pending,
            timeout: None,
        }
    }

    /// A request whose response accumulates until a silence window elapses.
    pub fn sliding_timeout(
        data: impl Into<String>,
        transformer: Flow<T>,
        timeout: std::time::Duration,
    ) -> Self {
        let (consumer, pending) = SlidingTimeoutConsumer::new(transformer, timeout);
        Self {
            data: data.into(),
            consumer,
            pending,
            timeout: None,
        }
    }

    /// Bounds the overall request by `duration`. If no response has arrived by
    /// then, the consumer is deregistered and `EciError::Timeout` is returned.
    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}
