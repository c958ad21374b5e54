use std::sync::Arc;

use super::supervisor::Supervisor;
use crate::{config::Config, events::Event, events::EventManager, handlers::Handle};

/// Builder for constructing a [`Supervisor`] around a shared [`EventManager`].
pub struct SupervisorBuilder<E: Event> {
    cfg: Config,
    manager: Arc<EventManager<E>>,
    handlers: Vec<Arc<dyn Handle<E>>>,
}

impl<E: Event> SupervisorBuilder<E> {
    /// Creates a new builder with the given configuration and manager.
    pub fn new(cfg: Config, manager: Arc<EventManager<E>>) -> Self {
        Self {
            cfg,
            manager,
            handlers: Vec::new(),
        }
    }

    /// Sets the handlers driven by the supervisor (one runner each).
    pub fn with_handlers(mut self, handlers: Vec<Arc<dyn Handle<E>>>) -> Self {
        self.handlers = handlers;
        self
    }

    /// Adds a single handler.
    pub fn with_handler(mut self, handler: Arc<dyn Handle<E>>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Builds and returns the Supervisor instance.
    ///
    /// Nothing is spawned until [`Supervisor::run`].
    pub fn build(self) -> Arc<Supervisor<E>> {
        Arc::new(Supervisor::new_internal(
            self.cfg,
            self.manager,
            self.handlers,
        ))
    }
}
