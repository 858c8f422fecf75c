//! Player event definitions and EventBus
//!
//! Events are broadcast whenever a media item starts or finishes, a region
//! conflict is arbitrated, a trigger starts or stops, or the document is
//! reloaded. They serialize with a `"type"` tag so external observers can log
//! or forward them without knowing the Rust types.

use crate::node::{Behavior, MediaKind};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Which conflict tier of the occupant's policy was consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictTier {
    Higher,
    Peer,
    Lower,
}

/// Player event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Media item is now showing (or audible) in its region
    MediaStarted {
        src: String,
        kind: MediaKind,
        region: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Media item finished or was stopped early
    MediaFinished {
        src: String,
        region: String,
        /// True when cut short by a stop request or cancellation
        stopped: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A priority class met an occupied region
    RegionConflict {
        region: String,
        tier: ConflictTier,
        /// Occupant behavior applied to the conflict
        behavior: Behavior,
        candidate_level: u32,
        occupant_level: u32,
        /// False when the candidate was rejected
        admitted: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    TriggerStarted {
        trigger_id: String,
        region: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    TriggerStopped {
        trigger_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Document changed on disk; the current cycle was torn down
    DocumentReloaded {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Event name as it appears in the serialized `"type"` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::MediaStarted { .. } => "MediaStarted",
            PlayerEvent::MediaFinished { .. } => "MediaFinished",
            PlayerEvent::RegionConflict { .. } => "RegionConflict",
            PlayerEvent::TriggerStarted { .. } => "TriggerStarted",
            PlayerEvent::TriggerStopped { .. } => "TriggerStopped",
            PlayerEvent::DocumentReloaded { .. } => "DocumentReloaded",
        }
    }
}

/// Central event distribution bus
///
/// Wraps `tokio::broadcast`: publishing never blocks, slow subscribers see
/// `Lagged` instead of stalling the scheduler.
///
/// ```
/// use smil_common::events::{EventBus, PlayerEvent};
///
/// let bus = EventBus::new(100);
/// let mut rx = bus.subscribe();
/// bus.emit_lossy(PlayerEvent::DocumentReloaded { timestamp: chrono::Utc::now() });
/// assert!(matches!(rx.try_recv(), Ok(PlayerEvent::DocumentReloaded { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; `Err` when nobody is listening
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: PlayerEvent) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
