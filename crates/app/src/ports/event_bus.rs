//! Event bus port: outbound publication of registry events.

use std::sync::Arc;

use homereg_domain::error::RegistryError;
use homereg_domain::event::Event;

/// Publishes registry events to interested subscribers.
///
/// Publication is fire-and-forget from the registry's point of view: an
/// error is logged by the caller and never undoes the change that caused
/// the event.
pub trait EventPublisher: Send + Sync {
    /// Publish an event to all current subscribers.
    ///
    /// # Errors
    ///
    /// Implementation defined; registries only log it.
    fn publish(&self, event: Event) -> Result<(), RegistryError>;
}

impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    fn publish(&self, event: Event) -> Result<(), RegistryError> {
        (**self).publish(event)
    }
}
