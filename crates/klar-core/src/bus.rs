//! In-process named events.
//!
//! Stands in for the window manager's "emit to every window" primitive. Each
//! event name gets its own broadcast channel; a [`Subscription`] is a handle
//! that stops receiving when dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::WindowError;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Default)]
pub struct EventBus {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<Value>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, name: &str) -> Result<broadcast::Sender<Value>, WindowError> {
        let mut channels = self.channels.lock().map_err(|_| WindowError::EmitFailed {
            event: name.to_string(),
            message: "event bus poisoned".into(),
        })?;
        Ok(channels
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone())
    }

    /// Deliver `payload` to every current subscriber of `name`.
    /// Returns the number of receivers.
    ///
    /// # Errors
    /// Fails when nobody is subscribed.
    pub fn emit(&self, name: &str, payload: Value) -> Result<usize, WindowError> {
        self.sender(name)?
            .send(payload)
            .map_err(|_| WindowError::EmitFailed {
                event: name.to_string(),
                message: "no listeners".into(),
            })
    }

    pub fn subscribe(&self, name: &str) -> Result<Subscription, WindowError> {
        Ok(Subscription {
            name: name.to_string(),
            rx: self.sender(name)?.subscribe(),
        })
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.channels
            .lock()
            .ok()
            .and_then(|channels| channels.get(name).map(|tx| tx.receiver_count()))
            .unwrap_or(0)
    }
}

/// Receiving side of one event name.
pub struct Subscription {
    name: String,
    rx: broadcast::Receiver<Value>,
}

impl Subscription {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next payload. Skips over payloads lost to lag. `None` once the bus
    /// is gone.
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(event = %self.name, skipped, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive, for polling callers.
    pub fn try_recv(&mut self) -> Option<Value> {
        loop {
            match self.rx.try_recv() {
                Ok(value) => return Some(value),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
