//! The three consumer adapter shapes (spec §4.3), grounded in
//! `original_source/arrowhead_alarm/consumers.py`.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::error::EciError;
use crate::flow::{Flow, FlowResult};

/// Something the registry can feed bytes to and fail, without knowing its
/// output type. Feeding and failing must never suspend (spec §5).
pub trait Sink: Send + Sync {
    fn feed(&self, chunk: &str);
    fn fail(&self, err: EciError);
}

/// One outcome of a long-lived subscription fed by a [`QueueConsumer`].
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Fail(EciError),
}

/// Resolves a one-shot value on the first `Go` or `Error`; ignores everything
/// once resolved. Backs command/response requests.
pub struct FutureConsumer<T: Send + 'static> {
    transformer: Flow<T>,
    state: Mutex<FutureState<T>>,
}

struct FutureState<T> {
    buffer: String,
    sender: Option<oneshot::Sender<Result<T, EciError>>>,
}

impl<T: Send + 'static> FutureConsumer<T> {
    pub fn new(transformer: Flow<T>) -> (std::sync::Arc<Self>, oneshot::Receiver<Result<T, EciError>>) {
        let (tx, rx) = oneshot::channel();
        let consumer = std::sync::Arc::new(Self {
            transformer,
            state: Mutex::new(FutureState {
                buffer: String::new(),
                sender: Some(tx),
            }),
        });
        (consumer, rx)
    }
}

impl<T: Send + 'static> Sink for FutureConsumer<T> {
    fn feed(&self, chunk: &str) {
        let mut state = self.state.lock().expect("consumer mutex poisoned");
        if state.sender.is_none() {
            return;
        }
        for ch in chunk.chars() {
            if state.sender.is_none() {
                return;
            }
            state.buffer.push(ch);
            match self.transformer.apply(&state.buffer) {
                FlowResult::Go(value) => {
                    if let Some(tx) = state.sender.take() {
                        let _ = tx.send(Ok(value));
                    }
                    return;
                }
                FlowResult::Error(e) => {
                    if let Some(tx) = state.sender.take() {
                        let _ = tx.send(Err(e));
                    }
                    return;
                }
                FlowResult::Reject => state.buffer.clear(),
                FlowResult::Wait => {}
            }
        }
    }

    fn fail(&self, err: EciError) {
        let mut state = self.state.lock().expect("consumer mutex poisoned");
        if let Some(tx) = state.sender.take() {
            let _ = tx.send(Err(err));
        }
    }
}

/// Pushes every `Go`/`Error` outcome onto an unbounded queue, resetting the
/// buffer to empty after each one. Backs long-lived event subscriptions.
pub struct QueueConsumer<T: Send + 'static> {
    transformer: Flow<T>,
    state: Mutex<QueueState>,
    sender: mpsc::UnboundedSender<Outcome<T>>,
}

struct QueueState {
    buffer: String,
}

impl<T: Send + 'static> QueueConsumer<T> {
    pub fn new(transformer: Flow<T>) -> (std::sync::Arc<Self>, mpsc::UnboundedReceiver<Outcome<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let consumer = std::sync::Arc::new(Self {
            transformer,
            state: Mutex::new(QueueState { buffer: String::new() }),
            sender: tx,
        });
        (consumer, rx)
    }
}

impl<T: Send + 'static> Sink for QueueConsumer<T> {
    fn feed(&self, chunk: &str) {
        let mut state = self.state.lock().expect("consumer mutex poisoned");
        for ch in chunk.chars() {
            state.buffer.push(ch);
            match self.transformer.apply(&state.buffer) {
                FlowResult::Go(value) => {
                    state.buffer.clear();
                    let _ = self.sender.send(Outcome::Success(value));
                }
                FlowResult::Error(e) => {
                    state.buffer.clear();
                    let _ = self.sender.send(Outcome::Fail(e));
                }
                FlowResult::Reject => state.buffer.clear(),
                FlowResult::Wait => {}
            }
        }
    }

    fn fail(&self, err: EciError) {
        let _ = self.sender.send(Outcome::Fail(err));
    }
}

/// Accumulates `Go` values across a sliding silence window: the timer arms on
/// the first byte ever seen, and every further `Go` cancels and re-arms it.
/// `Reject` clears the buffer but leaves the timer alone — silence still
/// terminates the wait (spec.md §9 open-question resolution). On expiry the
/// transformer runs once more against whatever is left in the buffer.
pub struct SlidingTimeoutConsumer<T: Send + 'static> {
    transformer: Flow<T>,
    timeout: Duration,
    self_handle: std::sync::Weak<Self>,
    state: Mutex<SlidingState<T>>,
}

struct SlidingState<T> {
    buffer: String,
    sender: Option<oneshot::Sender<Result<T, EciError>>>,
    timer_armed: bool,
    generation: u64,
}

impl<T: Send + 'static> SlidingTimeoutConsumer<T> {
    pub fn new(
        transformer: Flow<T>,
        timeout: Duration,
    ) -> (std::sync::Arc<Self>, oneshot::Receiver<Result<T, EciError>>) {
        let (tx, rx) = oneshot::channel();
        let consumer = std::sync::Arc::new_cyclic(|weak| Self {
            transformer,
            timeout,
            self_handle: weak.clone(),
            state: Mutex::new(SlidingState {
                buffer: String::new(),
                sender: Some(tx),
                timer_armed: false,
                generation: 0,
            }),
        });
        (consumer, rx)
    }

    fn arm_timer(&self, generation: u64) {
        let Some(this) = self.self_handle.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            tokio::time::sleep(this.timeout).await;
            this.on_timeout(generation);
        });
    }

    fn on_timeout(&self, expected_generation: u64) {
        let mut state = self.state.lock().expect("consumer mutex poisoned");
        if state.sender.is_none() || state.generation != expected_generation {
            return;
        }
        let result = match self.transformer.apply(&state.buffer) {
            FlowResult::Go(value) => Ok(value),
            FlowResult::Error(e) => Err(e),
            FlowResult::Wait | FlowResult::Reject => Err(EciError::Timeout),
        };
        if let Some(tx) = state.sender.take() {
            let _ = tx.send(result);
        }
    }
}

impl<T: Send + 'static> Sink for SlidingTimeoutConsumer<T> {
    fn feed(&self, chunk: &str) {
        let mut state = self.state.lock().expect("consumer mutex poisoned");
        if state.sender.is_none() {
            return;
        }
        if !state.timer_armed {
            state.timer_armed = true;
            let generation = state.generation;
            drop(state);
            self.arm_timer(generation);
            state = self.state.lock().expect("consumer mutex poisoned");
        }
        for ch in chunk.chars() {
            if state.sender.is_none() {
                return;
            }
            state.buffer.push(ch);
            match self.transformer.apply(&state.buffer) {
                FlowResult::Go(_) => {
                    state.generation += 1;
                    let generation = state.generation;
                    drop(state);
                    self.arm_timer(generation);
                    state = self.state.lock().expect("consumer mutex poisoned");
                }
                FlowResult::Error(e) => {
                    if let Some(tx) = state.sender.take() {
                        let _ = tx.send(Err(e));
                    }
                    return;
                }
                FlowResult::Reject => state.buffer.clear(),
                FlowResult::Wait => {}
            }
        }
    }

    fn fail(&self, err: EciError) {
        let mut state = self.state.lock().expect("consumer mutex poisoned");
        if let Some(tx) = state.sender.take() {
            let _ = tx.send(Err(err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformers::wait_any_complete_lines;

    #[tokio::test]
    async fn future_consumer_resolves_on_first_go() {
        let (consumer, rx) = FutureConsumer::new(crate::transformers::wait_line("\n"));
        consumer.feed("hello\n");
        let value = rx.await.unwrap().unwrap();
        assert_eq!(value, "hello");
    }

    #[tokio::test]
    async fn queue_consumer_emits_one_outcome_per_line() {
        let (consumer, mut rx) = QueueConsumer::new(crate::transformers::wait_line("\n"));
        consumer.feed("a\nb\n");
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, Outcome::Success(ref s) if s == "a"));
        assert!(matches!(second, Outcome::Success(ref s) if s == "b"));
    }

    #[tokio::test(start_paused = true)]
    async fn sliding_timeout_finalizes_on_silence() {
        let (consumer, rx) =
            SlidingTimeoutConsumer::new(wait_any_complete_lines("\n"), Duration::from_millis(100));
        consumer.feed("1\n2\n");
        tokio::time::advance(Duration::from_millis(150)).await;
        let value = rx.await.unwrap().unwrap();
        assert_eq!(value, vec!["1".to_string(), "2".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn sliding_timeout_reject_clears_buffer_without_rearming() {
        let transformer: Flow<Vec<String>> = Flow::new(|buf: &str| {
            if buf == "X" {
                FlowResult::Reject
            } else if buf.ends_with('\n') {
                FlowResult::Go(vec![buf.trim_end().to_string()])
            } else {
                FlowResult::Wait
            }
        });
        let (consumer, rx) = SlidingTimeoutConsumer::new(transformer, Duration::from_millis(100));
        consumer.feed("X");
        tokio::time::advance(Duration::from_millis(150)).await;
        // timer was armed on first byte and was never touched by the Reject,
        // so it still fires at 100ms against the now-empty buffer.
        let result = rx.await.unwrap();
        assert!(result.is_err());
    }
}
