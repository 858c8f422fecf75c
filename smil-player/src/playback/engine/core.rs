//! Player lifecycle: document cycles, staleness watch, teardown, public API
//!
//! One *document cycle* is: load the document, build a fresh
//! [`CancellationContext`], run the playlist in an endless loop while a
//! background watch polls the document for changes, and tear everything down
//! once the watch (or an embedder) sets `stop_all_loops`. [`Player::run`]
//! repeats cycles forever.

use super::interpreter::{NodeOutcome, Scope};
use super::triggers::ActiveTrigger;
use crate::config::PlaybackSettings;
use crate::document::DocumentProvider;
use crate::error::{Error, Result};
use crate::playback::arbitration::RegionArbitrationTable;
use crate::playback::cancel::CancellationContext;
use crate::playback::clock::Clock;
use crate::playback::display::DisplayRegistry;
use crate::playback::renderer::Renderer;
use crate::state::SharedState;
use smil_common::events::PlayerEvent;
use smil_common::Document;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Document and cancellation context of the running cycle
#[derive(Clone)]
pub(super) struct CycleContext {
    pub(super) document: Arc<Document>,
    pub(super) cancel: CancellationContext,
}

/// Scheduling engine facade
///
/// Cheap to clone; all clones drive the same table, display registry and
/// trigger set.
#[derive(Clone)]
pub struct Player {
    /// Media backend
    pub(super) renderer: Arc<dyn Renderer>,

    /// Local wallclock source for window resolution
    pub(super) clock: Arc<dyn Clock>,

    pub(super) settings: PlaybackSettings,

    /// Region arbitration table shared by the playlist and triggers
    pub(super) table: Arc<RegionArbitrationTable>,

    /// What each region currently shows
    pub(super) display: Arc<DisplayRegistry>,

    /// Event broadcasting
    pub(super) state: Arc<SharedState>,

    /// Running cycle, if any
    pub(super) cycle: Arc<Mutex<Option<CycleContext>>>,

    /// Trigger id -> running trigger sub-tree
    pub(super) triggers: Arc<Mutex<HashMap<String, ActiveTrigger>>>,
}

impl Player {
    pub fn new(renderer: Arc<dyn Renderer>, clock: Arc<dyn Clock>, settings: PlaybackSettings) -> Self {
        let state = Arc::new(SharedState::new());
        Self {
            renderer,
            clock,
            settings,
            table: Arc::new(RegionArbitrationTable::new(
                settings.poll_interval,
                state.events.clone(),
            )),
            display: Arc::new(DisplayRegistry::new()),
            state,
            cycle: Arc::new(Mutex::new(None)),
            triggers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run document cycles forever
    pub async fn run(&self, provider: Arc<dyn DocumentProvider>) {
        loop {
            let document = match provider.load().await {
                Ok(document) => Arc::new(document),
                Err(e) => {
                    warn!(
                        "Failed to load document, retrying in {}s: {:#}",
                        self.settings.download_retry.as_secs(),
                        e
                    );
                    tokio::time::sleep(self.settings.download_retry).await;
                    continue;
                }
            };

            let cancel = CancellationContext::new();
            let watch = self.watch_document(
                provider.clone(),
                document.refresh_interval(self.settings.refresh_seconds),
                cancel.clone(),
            );
            let cycle = async {
                let result = self.run_cycle(document.clone(), cancel.clone()).await;
                // the watch has nothing left to guard
                cancel.set_file_watch(false);
                result
            };

            let (result, ()) = tokio::join!(cycle, watch);
            if let Err(e) = result {
                error!("Document cycle failed, reloading: {}", e);
            }

            let cycles = self.state.increment_cycles();
            info!("Document cycle {} finished", cycles);
            self.state.broadcast_event(PlayerEvent::DocumentReloaded {
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Poll the provider every `interval` until the document changes or the watch is disabled
    async fn watch_document(
        &self,
        provider: Arc<dyn DocumentProvider>,
        interval: std::time::Duration,
        cancel: CancellationContext,
    ) {
        debug!("Watching document every {}s", interval.as_secs());
        while cancel.sleep_watch(interval).await {
            match provider.has_changed().await {
                Ok(true) => {
                    info!("Document changed, stopping current cycle");
                    cancel.set_file_watch(false);
                    cancel.disable_loop(true);
                    return;
                }
                Ok(false) => {}
                Err(e) => warn!("Document staleness check failed: {:#}", e),
            }
        }
    }

    /// Run one document cycle until `cancel` stops it, then tear down
    ///
    /// The playlist is replayed endlessly. Fatal interpreter errors end the
    /// cycle with `Err`; the caller is expected to reload.
    pub async fn run_cycle(&self, document: Arc<Document>, cancel: CancellationContext) -> Result<()> {
        {
            let mut cycle = self.lock_cycle();
            if cycle.is_some() {
                return Err(Error::Playback("a document cycle is already running".to_string()));
            }
            *cycle = Some(CycleContext {
                document: document.clone(),
                cancel: cancel.clone(),
            });
        }

        info!(
            "Starting document cycle ({} trigger(s), {} region(s))",
            document.triggers.len(),
            document.layout.regions.len()
        );

        let result = self.run_playlist(&document, &cancel).await;
        self.teardown().await;
        *self.lock_cycle() = None;
        result
    }

    async fn run_playlist(&self, document: &Arc<Document>, cancel: &CancellationContext) -> Result<()> {
        let scope = Scope::root(document.clone(), cancel.clone());
        while !cancel.is_stopped() {
            let started = Instant::now();
            let outcome = self.run_node(&document.playlist, &scope).await?;
            // a pass that neither played nor waited would spin
            if outcome == NodeOutcome::Idle
                && started.elapsed() < self.settings.poll_interval
                && !cancel.sleep(self.settings.default_await).await
            {
                break;
            }
        }
        debug!("Playlist loop stopped");
        Ok(())
    }

    /// Stop triggers and everything on screen, forget all occupancy
    async fn teardown(&self) {
        let triggers: Vec<(String, ActiveTrigger)> = self.lock_triggers().drain().collect();
        for (id, trigger) in triggers {
            debug!("Teardown: stopping trigger {}", id);
            trigger.signals.request_stop();
            trigger.handle.abort();
            self.state.broadcast_event(PlayerEvent::TriggerStopped {
                trigger_id: id,
                timestamp: chrono::Utc::now(),
            });
        }

        for (region, shown) in self.display.drain() {
            debug!("Teardown: stopping {} in {}", shown.item.src, region);
            if let Err(e) = self.renderer.stop(&shown.item, &shown.geometry).await {
                warn!("Renderer failed to stop {}: {:#}", shown.item.src, e);
            }
        }

        self.table.clear();
    }

    pub(super) fn lock_cycle(&self) -> MutexGuard<'_, Option<CycleContext>> {
        self.cycle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(super) fn lock_triggers(&self) -> MutexGuard<'_, HashMap<String, ActiveTrigger>> {
        self.triggers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(super) fn current_cycle(&self) -> Option<CycleContext> {
        self.lock_cycle().clone()
    }

    /// Set or clear `stop_all_loops` on the running cycle
    pub fn disable_loop(&self, disabled: bool) {
        if let Some(cycle) = self.current_cycle() {
            cycle.cancel.disable_loop(disabled);
        }
    }

    /// Enable or disable the document staleness watch of the running cycle
    pub fn set_file_watch(&self, enabled: bool) {
        if let Some(cycle) = self.current_cycle() {
            cycle.cancel.set_file_watch(enabled);
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.state.subscribe_events()
    }

    pub fn table(&self) -> &RegionArbitrationTable {
        &self.table
    }

    pub fn display(&self) -> &DisplayRegistry {
        &self.display
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }
}
