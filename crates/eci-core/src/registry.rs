//! The consumer registry: a map from a fresh unique id to a sink, fed by the
//! single read task and deregistered on every exit path via a scope guard
//! (spec §5, grounded in `EciSession._read_context`/`_callbacks`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::consumer::Sink;
use crate::error::EciError;

#[derive(Clone, Default)]
pub struct Registry {
    sinks: Arc<Mutex<HashMap<Uuid, Arc<dyn Sink>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sink` under a fresh id, returning a guard that removes it
    /// again when dropped — on success, on error, or on cancellation.
    pub fn register(&self, sink: Arc<dyn Sink>) -> RegistrationGuard {
        let id = Uuid::new_v4();
        self.sinks.lock().expect("registry mutex poisoned").insert(id, sink);
        RegistrationGuard {
            sinks: self.sinks.clone(),
            id,
        }
    }

    /// Feeds `chunk` to every registered sink. Called from the single read task.
    pub fn dispatch(&self, chunk: &str) {
        for sink in self.snapshot() {
            sink.feed(chunk);
        }
    }

    /// Fails every registered sink with `err` and empties the registry — the
    /// fan-out a closed session sends to every outstanding consumer.
    pub fn fail_all(&self, err: &EciError) {
        let sinks: Vec<Arc<dyn Sink>> = {
            let mut guard = self.sinks.lock().expect("registry mutex poisoned");
            guard.drain().map(|(_, sink)| sink).collect()
        };
        for sink in sinks {
            sink.fail(err.clone());
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn Sink>> {
        self.sinks
            .lock()
            .expect("registry mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

/// Deregisters its sink from the registry on drop.
pub struct RegistrationGuard {
    sinks: Arc<Mutex<HashMap<Uuid, Arc<dyn Sink>>>>,
    id: Uuid,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.sinks.lock() {
            guard.remove(&self.id);
        }
    }
}
