//! Central event broadcasting

use tokio::sync::broadcast;

use crate::events::{CompanyEvent, EngineEvent, EntryEvent, SessionEvent};
use crate::timer::TimerEvent;

/// Fans engine events out to every subscriber
pub struct EventManager {
    event_tx: broadcast::Sender<EngineEvent>,
}

impl EventManager {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(1000);
        Self { event_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    pub fn emit_session(&self, event: SessionEvent) {
        let _ = self.event_tx.send(EngineEvent::Session(event));
    }

    pub fn emit_timer(&self, event: TimerEvent) {
        let _ = self.event_tx.send(EngineEvent::Timer(event));
    }

    pub fn emit_company(&self, event: CompanyEvent) {
        tracing::debug!("Broadcasting company event: {:?}", event.event_type);
        let _ = self.event_tx.send(EngineEvent::Company(event));
    }

    pub fn emit_entry(&self, event: EntryEvent) {
        tracing::debug!("Broadcasting entry event: {:?}", event.event_type);
        let _ = self.event_tx.send(EngineEvent::Entry(event));
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}
