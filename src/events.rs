//! Real-time event bus.
//!
//! Handlers publish [`SocketEvent`]s here; the websocket gateway subscribes and
//! fans them out to connected dispatch clients.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::UnitKind;

/// Events pushed to connected dispatch clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "PascalCase")]
pub enum SocketEvent {
    UpdateOfficerStatus { unit_id: Uuid },
    UpdateEmsFdStatus { unit_id: Uuid },
}

impl SocketEvent {
    /// The status-update event for a unit of the given discipline.
    pub fn unit_status(kind: UnitKind, unit_id: Uuid) -> Self {
        match kind {
            UnitKind::Officer => Self::UpdateOfficerStatus { unit_id },
            UnitKind::EmsFd => Self::UpdateEmsFdStatus { unit_id },
        }
    }
}

/// Cloneable broadcast sender shared through `AppState`.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SocketEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SocketEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event. Having no subscribers is not an error.
    pub fn emit(&self, event: SocketEvent) {
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(receivers, "Broadcast socket event"),
            Err(broadcast::error::SendError(event)) => {
                tracing::debug!(?event, "No socket subscribers for event")
            }
        }
    }
}
