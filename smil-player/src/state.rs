//! Shared player state
//!
//! Thread-safe state shared between the interpreter, trigger tasks and
//! whoever embeds the player.

use smil_common::events::{EventBus, PlayerEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Shared state accessible by all components
pub struct SharedState {
    /// Event broadcaster
    pub events: EventBus,

    /// Completed document cycles since startup
    pub cycles_total: AtomicU64,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            events: EventBus::new(256),
            cycles_total: AtomicU64::new(0),
        }
    }

    /// Broadcast an event to all listeners (no receivers is OK)
    pub fn broadcast_event(&self, event: PlayerEvent) {
        self.events.emit_lossy(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn increment_cycles(&self) -> u64 {
        self.cycles_total.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn cycles(&self) -> u64 {
        self.cycles_total.load(Ordering::Relaxed)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
