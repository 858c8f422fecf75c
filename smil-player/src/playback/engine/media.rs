//! Media leaves: video runs, timed images and widgets, audio
//!
//! Videos play with a three-element look-ahead (previous / current / next):
//! the next item is prepared while the current one plays, and the previously
//! displayed item of the region is stopped only after the current one is
//! showing. Images and widgets count their `dur` down in poll-interval ticks.

use super::core::Player;
use super::interpreter::{NodeOutcome, Scope};
use crate::error::Result;
use crate::playback::arbitration::OccupancySignals;
use crate::playback::display::DisplayedItem;
use smil_common::events::PlayerEvent;
use smil_common::timing::media_duration;
use smil_common::{MediaItem, MediaKind, RegionGeometry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Why a watched item stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Watch {
    /// Natural end (or countdown elapsed)
    Ended,
    /// Cycle cancelled or enclosing activation stopped
    Stopped,
    /// This item alone was interrupted (a trigger took its region)
    Interrupted,
}

impl Player {
    /// Region name and geometry an item plays in
    fn placement(&self, item: &MediaItem, scope: &Scope) -> (String, RegionGeometry) {
        let name = scope.trigger_region.clone().unwrap_or_else(|| item.region.clone());
        let geometry = scope.document.layout.resolve(&name).clone();
        (name, geometry)
    }

    /// Unmanaged media yields while its region or a nested region is held
    async fn wait_for_region(&self, region: &str, scope: &Scope) -> bool {
        if scope.is_managed() {
            return true;
        }
        let regions = scope.document.layout.with_nested(region);
        let mut logged = false;
        while self.table.is_held(&regions) {
            if !logged {
                debug!("{}: region {} held, waiting", scope.path, region);
                logged = true;
            }
            if !self.sleep_in(scope, self.settings.poll_interval).await {
                return false;
            }
        }
        true
    }

    /// Gapless run of videos sharing the look-ahead
    pub(super) async fn run_video_run(&self, items: &[&MediaItem], scope: &Scope) -> Result<NodeOutcome> {
        let mut outcome = NodeOutcome::Idle;

        for (index, item) in items.iter().copied().enumerate() {
            if scope.is_stopped() {
                return Ok(NodeOutcome::Stopped);
            }

            let (region, geometry) = self.placement(item, scope);
            if !self.wait_for_region(&region, scope).await {
                return Ok(NodeOutcome::Stopped);
            }

            if index == 0 && !self.display.is_displaying(&region, &item.src) {
                self.render_quietly("prepare", item, self.renderer.prepare(item, &geometry).await);
            }

            let signals = Arc::new(OccupancySignals::new());
            let previous = self.show(&region, item, &geometry, &signals, scope);

            let started = self.renderer.play(item, &geometry).await;
            let playing = self.render_quietly("play", item, started);
            self.emit_started(item, &region);

            if let Some(previous) = previous {
                self.hand_over(&previous, item).await;
            }

            let next = items[(index + 1) % items.len()];
            if next.src != item.src {
                let (_, next_geometry) = self.placement(next, scope);
                self.render_quietly("prepare", next, self.renderer.prepare(next, &next_geometry).await);
            }

            let watch = if playing {
                self.watch_until_ended(item, &region, &geometry, &signals, scope).await
            } else {
                Watch::Ended
            };

            match watch {
                Watch::Ended => {
                    self.emit_finished(item, &region, false);
                    outcome = NodeOutcome::Played;
                }
                Watch::Stopped => {
                    self.take_down(item, &region, &geometry, &signals).await;
                    return Ok(NodeOutcome::Stopped);
                }
                Watch::Interrupted => {
                    self.take_down(item, &region, &geometry, &signals).await;
                    return Ok(NodeOutcome::Played);
                }
            }
        }

        Ok(outcome)
    }

    /// Image or widget shown for its `dur`
    pub(super) async fn run_timed(&self, item: &MediaItem, scope: &Scope) -> Result<NodeOutcome> {
        let (region, geometry) = self.placement(item, scope);
        if !self.wait_for_region(&region, scope).await {
            return Ok(NodeOutcome::Stopped);
        }

        self.render_quietly("prepare", item, self.renderer.prepare(item, &geometry).await);
        let started = self.renderer.play(item, &geometry).await;
        if !self.render_quietly("play", item, started) {
            return Ok(NodeOutcome::Played);
        }

        let signals = Arc::new(OccupancySignals::new());
        if let Some(previous) = self.show(&region, item, &geometry, &signals, scope) {
            self.hand_over(&previous, item).await;
        }
        self.emit_started(item, &region);

        let duration = media_duration(item.dur.as_deref());
        match self.count_down(item, &region, &geometry, duration, &signals, scope).await {
            Watch::Ended => {
                self.emit_finished(item, &region, false);
                Ok(NodeOutcome::Played)
            }
            Watch::Stopped => {
                self.take_down(item, &region, &geometry, &signals).await;
                Ok(NodeOutcome::Stopped)
            }
            Watch::Interrupted => {
                self.take_down(item, &region, &geometry, &signals).await;
                Ok(NodeOutcome::Played)
            }
        }
    }

    /// Audio: no region display, runs to its natural end
    pub(super) async fn run_audio(&self, item: &MediaItem, scope: &Scope) -> Result<NodeOutcome> {
        let (region, geometry) = self.placement(item, scope);
        self.render_quietly("prepare", item, self.renderer.prepare(item, &geometry).await);
        let started = self.renderer.play(item, &geometry).await;
        if !self.render_quietly("play", item, started) {
            return Ok(NodeOutcome::Played);
        }
        self.emit_started(item, &region);

        let signals = Arc::new(OccupancySignals::new());
        match self.watch_until_ended(item, &region, &geometry, &signals, scope).await {
            Watch::Stopped => {
                self.render_quietly("stop", item, self.renderer.stop(item, &geometry).await);
                self.emit_finished(item, &region, true);
                Ok(NodeOutcome::Stopped)
            }
            _ => {
                self.emit_finished(item, &region, false);
                Ok(NodeOutcome::Played)
            }
        }
    }

    /// Await `once_ended`, polling stop and pause signals every interval
    async fn watch_until_ended(
        &self,
        item: &MediaItem,
        region: &str,
        geometry: &RegionGeometry,
        own: &Arc<OccupancySignals>,
        scope: &Scope,
    ) -> Watch {
        let ended = self.renderer.once_ended(item, geometry);
        tokio::pin!(ended);

        loop {
            tokio::select! {
                result = &mut ended => {
                    if let Err(e) = result {
                        warn!("Renderer failed while playing {}: {:#}", item.src, e);
                    }
                    return Watch::Ended;
                }
                _ = tokio::time::sleep(self.settings.poll_interval) => {
                    if let Some(watch) = self.check_signals(item, region, geometry, own, scope).await {
                        return watch;
                    }
                }
            }
        }
    }

    /// Tick `duration` down, honoring stop, pause and the enclosing window end
    async fn count_down(
        &self,
        item: &MediaItem,
        region: &str,
        geometry: &RegionGeometry,
        duration: Duration,
        own: &Arc<OccupancySignals>,
        scope: &Scope,
    ) -> Watch {
        let mut remaining = duration;
        while !remaining.is_zero() {
            if let Some(watch) = self.check_signals(item, region, geometry, own, scope).await {
                return watch;
            }
            if scope.end_reached(self.clock.now()) {
                debug!("{}: window closed during {}", scope.path, item.src);
                return Watch::Ended;
            }
            let tick = remaining.min(self.settings.poll_interval);
            if !scope.cancel.sleep(tick).await {
                return Watch::Stopped;
            }
            remaining -= tick;
        }
        Watch::Ended
    }

    /// Stop checks plus pause handling; `None` means keep going
    ///
    /// A resumed item takes its region back from whatever was shown meanwhile.
    async fn check_signals(
        &self,
        item: &MediaItem,
        region: &str,
        geometry: &RegionGeometry,
        own: &Arc<OccupancySignals>,
        scope: &Scope,
    ) -> Option<Watch> {
        if scope.is_stopped() {
            return Some(Watch::Stopped);
        }
        if own.is_stop_requested() {
            return Some(Watch::Interrupted);
        }
        if scope.is_paused() {
            debug!("{}: pausing {}", scope.path, item.src);
            self.render_quietly("pause", item, self.renderer.pause(item, geometry).await);
            while scope.is_paused() {
                if scope.is_stopped() {
                    return Some(Watch::Stopped);
                }
                if !scope.cancel.sleep(self.settings.poll_interval).await {
                    return Some(Watch::Stopped);
                }
            }
            debug!("{}: resuming {}", scope.path, item.src);
            self.render_quietly("resume", item, self.renderer.resume(item, geometry).await);
            if item.kind != MediaKind::Audio {
                if let Some(previous) = self.show(region, item, geometry, own, scope) {
                    if !Arc::ptr_eq(&previous.signals, own) && previous.item.src != item.src {
                        self.stop_displayed(&previous).await;
                    }
                }
            }
        }
        None
    }

    /// Register `item` as displayed in `region`, returning the replaced item
    fn show(
        &self,
        region: &str,
        item: &MediaItem,
        geometry: &RegionGeometry,
        signals: &Arc<OccupancySignals>,
        scope: &Scope,
    ) -> Option<DisplayedItem> {
        self.display.replace(
            region,
            DisplayedItem {
                item: item.clone(),
                geometry: geometry.clone(),
                signals: signals.clone(),
                owner: scope.occupancy.clone(),
                managed: scope.is_managed(),
            },
        )
    }

    /// Stop the item `next` replaced, unless it is the same source or merely paused
    async fn hand_over(&self, previous: &DisplayedItem, next: &MediaItem) {
        if previous.item.src == next.src {
            return;
        }
        if previous.owner.as_ref().is_some_and(|owner| owner.is_paused()) {
            debug!("{} paused under {}, kept for resume", previous.item.src, next.src);
            return;
        }
        self.stop_displayed(previous).await;
    }

    /// Stop an item that was handed over to a new one
    async fn stop_displayed(&self, previous: &DisplayedItem) {
        let result = self.renderer.stop(&previous.item, &previous.geometry).await;
        self.render_quietly("stop", &previous.item, result);
    }

    /// Stop an item cut short, unless something else already took its region
    async fn take_down(
        &self,
        item: &MediaItem,
        region: &str,
        geometry: &RegionGeometry,
        signals: &Arc<OccupancySignals>,
    ) {
        if self.display.remove_if_current(region, signals).is_some() {
            self.render_quietly("stop", item, self.renderer.stop(item, geometry).await);
        }
        self.emit_finished(item, region, true);
    }

    /// Log renderer failures at warn; `true` when the command succeeded
    fn render_quietly(&self, command: &str, item: &MediaItem, result: anyhow::Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Renderer {} failed for {}: {:#}", command, item.src, e);
                false
            }
        }
    }

    fn emit_started(&self, item: &MediaItem, region: &str) {
        self.state.broadcast_event(PlayerEvent::MediaStarted {
            src: item.src.clone(),
            kind: item.kind,
            region: region.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }

    fn emit_finished(&self, item: &MediaItem, region: &str, stopped: bool) {
        self.state.broadcast_event(PlayerEvent::MediaFinished {
            src: item.src.clone(),
            region: region.to_string(),
            stopped,
            timestamp: chrono::Utc::now(),
        });
    }
}
