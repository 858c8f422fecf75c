//! Trigger sub-trees
//!
//! A trigger is a node tree started and stopped from outside the playlist.
//! Each running trigger:
//!
//! - is assigned a concrete region once, at start: the first nested region of
//!   its declared region that nobody holds (falling back to the first nested
//!   region, or the declared region itself when it has none),
//! - holds that region in the arbitration table with a trigger-level record,
//! - interrupts ordinary media showing there, and
//! - runs as its own tokio task until it finishes or is stopped.

use super::core::Player;
use super::interpreter::Scope;
use crate::error::{Error, Result};
use crate::playback::arbitration::{ConflictPolicy, Decision, OccupancyRecord, OccupancySignals};
use smil_common::events::PlayerEvent;
use smil_common::{Layout, Node};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Triggers outrank every priority class
pub const TRIGGER_LEVEL: u32 = u32::MAX;

/// Bookkeeping for one running trigger
pub(crate) struct ActiveTrigger {
    pub(crate) region: String,
    pub(crate) signals: Arc<OccupancySignals>,
    pub(crate) handle: JoinHandle<()>,
}

impl Player {
    /// Start the trigger sub-tree declared under `id` in the current document
    ///
    /// Unknown ids are logged and ignored.
    pub fn start_trigger(&self, id: &str) -> Result<()> {
        let cycle = self
            .current_cycle()
            .ok_or_else(|| Error::Playback("no document cycle running".to_string()))?;
        let Some(node) = cycle.document.trigger(id).cloned() else {
            warn!("Unknown trigger '{}' ignored", id);
            return Ok(());
        };
        self.start_trigger_with(id, node)
    }

    /// Start `node` as trigger `id` against the current document's layout
    pub fn start_trigger_with(&self, id: &str, node: Node) -> Result<()> {
        let cycle = self
            .current_cycle()
            .ok_or_else(|| Error::Playback("no document cycle running".to_string()))?;

        let Some(declared) = node.first_media().map(|item| item.region.clone()) else {
            warn!("Trigger '{}' has no media, ignored", id);
            return Ok(());
        };

        let mut triggers = self.lock_triggers();
        if triggers.contains_key(id) {
            debug!("Trigger '{}' already running", id);
            return Ok(());
        }

        let taken: Vec<String> = triggers.values().map(|t| t.region.clone()).collect();
        let region = self.assign_trigger_region(&cycle.document.layout, &declared, &taken);
        info!("Starting trigger '{}' in region {}", id, region);

        let record = OccupancyRecord::new(TRIGGER_LEVEL, format!("trigger/{}", id), ConflictPolicy::trigger());
        let signals = record.signals.clone();
        let player = self.clone();
        let trigger_id = id.to_string();
        let task_region = region.clone();
        let handle = tokio::spawn(async move {
            player
                .run_trigger(trigger_id, node, task_region, record, cycle.document, cycle.cancel)
                .await;
        });

        triggers.insert(id.to_string(), ActiveTrigger { region, signals, handle });
        Ok(())
    }

    /// Ask trigger `id` to stop; `false` if it was not running
    pub fn stop_trigger(&self, id: &str) -> bool {
        match self.lock_triggers().get(id) {
            Some(trigger) => {
                info!("Stopping trigger '{}'", id);
                trigger.signals.request_stop();
                true
            }
            None => {
                debug!("Trigger '{}' not running", id);
                false
            }
        }
    }

    pub fn active_triggers(&self) -> Vec<String> {
        self.lock_triggers().keys().cloned().collect()
    }

    /// Region the trigger `id` was assigned, while it runs
    pub fn trigger_region(&self, id: &str) -> Option<String> {
        self.lock_triggers().get(id).map(|t| t.region.clone())
    }

    /// First unoccupied nested region of `declared`
    fn assign_trigger_region(&self, layout: &Layout, declared: &str, taken: &[String]) -> String {
        let nested = layout.nested_names(declared);
        let Some(first) = nested.first() else {
            return declared.to_string();
        };
        nested
            .iter()
            .find(|name| !taken.contains(name) && !self.table.is_held(std::slice::from_ref(*name)))
            .unwrap_or(first)
            .clone()
    }

    async fn run_trigger(
        &self,
        id: String,
        node: Node,
        region: String,
        record: OccupancyRecord,
        document: Arc<smil_common::Document>,
        cancel: crate::playback::cancel::CancellationContext,
    ) {
        loop {
            match self.table.enter(&region, &record, &cancel).await {
                Decision::Proceed => break,
                Decision::Retry if !cancel.is_stopped() => continue,
                _ => {
                    debug!("Trigger '{}' could not claim region {}", id, region);
                    self.finish_trigger(&id, &record);
                    return;
                }
            }
        }

        let interrupted = self
            .display
            .interrupt_unmanaged(&document.layout.with_nested(&region));
        if interrupted > 0 {
            debug!("Trigger '{}' interrupted {} item(s) in {}", id, interrupted, region);
        }

        self.state.broadcast_event(PlayerEvent::TriggerStarted {
            trigger_id: id.clone(),
            region: region.clone(),
            timestamp: chrono::Utc::now(),
        });

        let scope = Scope::trigger(&id, document, cancel, record.signals.clone(), region.clone());
        match self.run_node(&node, &scope).await {
            Ok(outcome) => debug!("Trigger '{}' finished: {:?}", id, outcome),
            Err(e) => warn!("Trigger '{}' failed: {}", id, e),
        }

        if let Some(shown) = self.display.current(&region) {
            if shown.managed {
                if let Err(e) = self.renderer.stop(&shown.item, &shown.geometry).await {
                    warn!("Renderer failed to stop {}: {:#}", shown.item.src, e);
                }
                self.display.remove_if_current(&region, &shown.signals);
            }
        }

        self.finish_trigger(&id, &record);
    }

    fn finish_trigger(&self, id: &str, record: &OccupancyRecord) {
        record.signals.set_playing(false);
        let region = {
            let mut triggers = self.lock_triggers();
            let owned = triggers
                .get(id)
                .is_some_and(|t| Arc::ptr_eq(&t.signals, &record.signals));
            if owned {
                triggers.remove(id).map(|t| t.region)
            } else {
                None
            }
        };
        if let Some(region) = region {
            self.table.leave(&region, record.owner);
            info!("Trigger '{}' stopped", id);
            self.state.broadcast_event(PlayerEvent::TriggerStopped {
                trigger_id: id.to_string(),
                timestamp: chrono::Utc::now(),
            });
        }
    }
}
