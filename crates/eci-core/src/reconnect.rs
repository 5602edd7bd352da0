//! The supervised reconnect worker (spec §5), grounded in
//! `original_source/elitecloud_alarm/session.py::_reconnect_worker`.

use std::sync::Arc;

use crate::session::SessionInner;

/// Runs for the lifetime of the session: waits for disconnection, then
/// retries `establish_connection` up to `max_retries` times (each attempt
/// bounded by `connection_timeout`), waiting `reconnect_delay` between
/// attempts. Exits immediately whenever the cancel signal fires, and gives up
/// for good once retries are exhausted.
pub(crate) async fn run(inner: Arc<SessionInner>) {
    'outer: while !inner.cancel.is_cancelled() {
        inner.connected.wait_clear().await;
        if inner.cancel.is_cancelled() {
            return;
        }

        for attempt in 1..=inner.config.max_retries {
            tokio::select! {
                _ = inner.cancel.cancelled() => return,
                result = tokio::time::timeout(inner.config.connection_timeout, inner.establish_connection()) => {
                    match result {
                        Ok(Ok(())) => continue 'outer,
                        Ok(Err(e)) => {
                            tracing::error!(attempt, max_retries = inner.config.max_retries, error = %e, "reconnect attempt failed");
                        }
                        Err(_) => {
                            tracing::error!(attempt, max_retries = inner.config.max_retries, "reconnect attempt timed out");
                        }
                    }
                }
            }

            if attempt == inner.config.max_retries {
                tracing::error!("max reconnect attempts reached, giving up");
                return;
            }

            tokio::select! {
                _ = inner.cancel.cancelled() => return,
                _ = tokio::time::sleep(inner.config.reconnect_delay) => {}
            }
        }
    }
}
