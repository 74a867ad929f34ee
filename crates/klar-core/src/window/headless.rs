use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use super::{WidgetKind, WindowManager, WindowSpec};
use crate::bridge::{BridgeHandle, Snapshot, WidgetPeer};
use crate::bus::EventBus;
use crate::error::WindowError;

/// Called with every snapshot a headless widget receives.
pub type RenderFn = Arc<dyn Fn(WidgetKind, &Snapshot) + Send + Sync>;

/// Window manager without a display: each window is a [`WidgetPeer`] task.
pub struct HeadlessWindowManager {
    bus: EventBus,
    bridge: BridgeHandle,
    render: RenderFn,
    peers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl HeadlessWindowManager {
    pub fn new(bus: EventBus, bridge: BridgeHandle, render: RenderFn) -> Self {
        Self {
            bus,
            bridge,
            render,
            peers: Mutex::new(HashMap::new()),
        }
    }

    fn peers(&self, label: &str) -> Result<std::sync::MutexGuard<'_, HashMap<String, JoinHandle<()>>>, WindowError> {
        self.peers.lock().map_err(|_| WindowError::NotFound(label.to_string()))
    }
}

impl WindowManager for HeadlessWindowManager {
    fn create(&self, spec: &WindowSpec) -> Result<(), WindowError> {
        let create_failed = |message: String| WindowError::CreateFailed {
            label: spec.label.clone(),
            message,
        };
        let kind = WidgetKind::from_label(&spec.label)
            .ok_or_else(|| create_failed("unknown widget".into()))?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| create_failed(e.to_string()))?;

        let peer = WidgetPeer::new(kind, &self.bus, self.bridge.clone())?;
        let render = Arc::clone(&self.render);
        let task = runtime.spawn(peer.run(move |snapshot| render(kind, snapshot)));

        if let Some(previous) = self.peers(&spec.label)?.insert(spec.label.clone(), task) {
            previous.abort();
        }
        tracing::debug!(label = %spec.label, "headless widget started");
        Ok(())
    }

    fn focus(&self, label: &str) -> Result<(), WindowError> {
        match self.peers(label)?.get(label) {
            Some(task) if !task.is_finished() => Ok(()),
            _ => Err(WindowError::NotFound(label.to_string())),
        }
    }

    fn close(&self, label: &str) -> Result<(), WindowError> {
        let task = self
            .peers(label)?
            .remove(label)
            .ok_or_else(|| WindowError::NotFound(label.to_string()))?;
        task.abort();
        Ok(())
    }
}

impl Drop for HeadlessWindowManager {
    fn drop(&mut self) {
        let peers = match self.peers.get_mut() {
            Ok(peers) => peers,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (_, task) in peers.drain() {
            task.abort();
        }
    }
}
