//! In-process event bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use homereg_domain::error::RegistryError;
use homereg_domain::event::Event;

use crate::ports::EventPublisher;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing never blocks and succeeds even when there are no active
/// subscribers (the event is simply dropped), so registries can publish
/// from any thread, inside or outside a runtime.
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> Result<(), RegistryError> {
        if self.sender.send(event).is_err() {
            tracing::trace!("no subscriber for registry event");
        }
        Ok(())
    }
}
