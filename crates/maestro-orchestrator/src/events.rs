//! Lifecycle events.
//!
//! Every request publishes, in order: `RequestStarted`, then
//! `ResponseReceived` if it produced a model answer, then `RequestEnded`
//! exactly once. Events of different requests interleave freely.

use maestro_core::{Request, RequestId, RequestState, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A lifecycle signal published by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    RequestStarted { request: Request },
    ResponseReceived { response: Response },
    RequestEnded {
        request_id: RequestId,
        state: RequestState,
    },
}

impl OrchestratorEvent {
    pub fn request_id(&self) -> &RequestId {
        match self {
            OrchestratorEvent::RequestStarted { request } => &request.id,
            OrchestratorEvent::ResponseReceived { response } => &response.request_id,
            OrchestratorEvent::RequestEnded { request_id, .. } => request_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrchestratorEvent::RequestStarted { .. } => "request_started",
            OrchestratorEvent::ResponseReceived { .. } => "response_received",
            OrchestratorEvent::RequestEnded { .. } => "request_ended",
        }
    }
}

/// Publish/subscribe fan-out of [`OrchestratorEvent`]s.
///
/// Each subscriber gets its own bounded buffer; a subscriber that falls
/// behind by more than the capacity observes `RecvError::Lagged` and loses
/// the oldest events. Publishing never blocks.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<OrchestratorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn publish(&self, event: OrchestratorEvent) {
        let name = event.name();
        // Err only means nobody is listening.
        if self.sender.send(event).is_err() {
            tracing::trace!(event = name, "No event subscribers");
        }
    }
}
