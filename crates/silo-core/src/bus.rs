//! Event-bus capability for publishing outbound envelopes.
//!
//! The bus is the one observable signal consumers rely on: publish failures
//! must surface to the caller, never be swallowed. The in-memory bus records
//! envelopes in publish order for tests and local inspection.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::event::EventEnvelope;

/// Publish capability for outbound events.
#[async_trait]
pub trait EventBus: Send + Sync + 'static {
    /// Publishes one envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the envelope could not be delivered.
    /// Implementations must not drop envelopes silently.
    async fn publish(&self, event: EventEnvelope) -> Result<()>;
}

/// In-memory bus that retains published envelopes in order.
#[derive(Debug, Default)]
pub struct MemoryBus {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
}

impl MemoryBus {
    /// Creates a new empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all published envelopes in publish order.
    ///
    /// # Panics
    ///
    /// Panics if the interior lock is poisoned (test-only accessor).
    #[must_use]
    pub fn events(&self) -> Vec<EventEnvelope> {
        self.events.read().expect("bus lock poisoned").clone()
    }

    /// Returns the envelopes published with the given category.
    ///
    /// # Panics
    ///
    /// Panics if the interior lock is poisoned (test-only accessor).
    #[must_use]
    pub fn events_of_type(&self, detail_type: &str) -> Vec<EventEnvelope> {
        self.events()
            .into_iter()
            .filter(|e| e.detail_type == detail_type)
            .collect()
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn publish(&self, event: EventEnvelope) -> Result<()> {
        self.events
            .write()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .push(event);
        Ok(())
    }
}
