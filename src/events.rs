//! Viewer event bus
//!
//! Hosts drain events with [`EventBus::drain`] once per frame, the same
//! way a UI loop polls worker responses.

use flume::{Receiver, Sender};

use crate::error::RenderFault;
use crate::geometry::ScaleFactors;

/// Events emitted by the orchestration engine.
#[derive(Debug)]
pub enum ViewerEvent {
    /// Every requested pass for a page completed while still current.
    Rendered { page: u32, factors: ScaleFactors },

    /// A provider or backend pass failed. No automatic retry; the host
    /// reacts by changing props to force a fresh render.
    RenderingFailed { page: u32, fault: RenderFault },

    /// A page crossed the intersection threshold in either direction.
    VisibilityChanged { page: u32, visible: bool },

    /// An annotation link pointing inside the document was activated.
    InternalLinkClicked { page: u32 },

    /// An annotation link pointing outside the document was activated.
    ExternalLinkClicked { uri: String },
}

/// Cloneable emitting half of the bus, handed to orchestrators and link
/// proxies.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<ViewerEvent>,
}

impl EventSender {
    pub fn emit(&self, event: ViewerEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

/// Unbounded event channel owned by the document view.
pub struct EventBus {
    tx: Sender<ViewerEvent>,
    rx: Receiver<ViewerEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }

    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// Drain all pending events without blocking.
    pub fn drain(&self) -> Vec<ViewerEvent> {
        let mut events = vec![];
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[must_use]
    pub fn receiver(&self) -> &Receiver<ViewerEvent> {
        &self.rx
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_events_in_order() {
        let bus = EventBus::new();
        let sender = bus.sender();
        sender.emit(ViewerEvent::VisibilityChanged { page: 1, visible: true });
        sender.emit(ViewerEvent::InternalLinkClicked { page: 3 });

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ViewerEvent::VisibilityChanged { page: 1, visible: true }));
        assert!(matches!(events[1], ViewerEvent::InternalLinkClicked { page: 3 }));
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn emit_survives_dropped_receiver() {
        let bus = EventBus::new();
        let sender = bus.sender();
        drop(bus);
        sender.emit(ViewerEvent::InternalLinkClicked { page: 1 });
    }
}
