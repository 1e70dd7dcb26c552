//! Auxiliary events dispatcher.
//!
//! A fire-and-forget re-broadcast channel for raw Events API bodies.
//! Listeners registered here receive every event delivery as the original
//! JSON string, off the request path, regardless of whether a keyed handler
//! was found. Started and stopped with the app lifecycle.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// A raw-event listener.
pub type EventListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Fans raw event bodies out to registered listeners on a background task.
#[derive(Default)]
pub struct EventsDispatcher {
    listeners: Arc<RwLock<Vec<EventListener>>>,
    sender: Mutex<Option<mpsc::UnboundedSender<String>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EventsDispatcher {
    /// Creates an idle dispatcher with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. Takes effect immediately, even while running.
    pub fn register(&self, listener: EventListener) {
        self.listeners.write().push(listener);
    }

    /// Whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Whether the background task is consuming.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Starts the background consumer. Idempotent. Requires a Tokio runtime;
    /// without one the dispatcher stays stopped.
    pub fn start(&self) {
        let mut sender = self.sender.lock();
        if sender.is_some() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime available; the events dispatcher stays stopped");
            return;
        };
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let listeners = Arc::clone(&self.listeners);
        let task = runtime.spawn(async move {
            while let Some(body) = rx.recv().await {
                for listener in listeners.read().iter() {
                    listener(&body);
                }
            }
        });
        *sender = Some(tx);
        *self.task.lock() = Some(task);
    }

    /// Stops the background consumer after draining queued events.
    pub fn stop(&self) {
        // Dropping the sender ends the consumer loop.
        self.sender.lock().take();
        self.task.lock().take();
    }

    /// Queues a raw event body for re-broadcast. A no-op while stopped.
    pub fn enqueue(&self, body: &str) {
        if let Some(sender) = self.sender.lock().as_ref() {
            let _ = sender.send(body.to_string());
        }
    }
}
