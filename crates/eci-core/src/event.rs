//! Two-sided "connected" event and the reconnect cancel signal (spec §5),
//! grounded in `original_source/elitecloud_alarm/types.py::ToggleEvent`.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{watch, Notify};

/// A boolean state whose `set`/`clear` edges are each independently awaitable.
/// `asyncio.Event` alone only exposes one edge; this wraps a `watch` channel
/// to give both.
pub struct ToggleEvent {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl ToggleEvent {
    pub fn new(initially_set: bool) -> Self {
        let (tx, rx) = watch::channel(initially_set);
        Self { tx, rx }
    }

    pub fn set(&self) {
        let _ = self.tx.send(true);
    }

    pub fn clear(&self) {
        let _ = self.tx.send(false);
    }

    pub fn is_set(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves immediately if already set, else waits for the next set edge.
    pub async fn wait_set(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }

    /// Resolves immediately if already clear, else waits for the next clear edge.
    pub async fn wait_clear(&self) {
        let mut rx = self.rx.clone();
        if !*rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if !*rx.borrow() {
                return;
            }
        }
    }
}

/// A one-shot, broadcastable cancellation flag. Once cancelled it stays
/// cancelled; every waiter wakes promptly.
pub struct CancelSignal {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancelled, immediately if already so.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_set_resolves_on_edge() {
        let event = Arc::new(ToggleEvent::new(false));
        let waiter = {
            let event = event.clone();
            tokio::spawn(async move {
                event.wait_set().await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        event.set();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should complete")
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let signal = Arc::new(CancelSignal::new());
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move {
                signal.cancelled().await;
            })
        };
        signal.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should complete")
            .unwrap();
    }
}
