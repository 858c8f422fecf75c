//! Region arbitration table
//!
//! **Purpose:** Decide, per screen region, which priority-class activation may
//! play when two of them want the same region.
//!
//! **Architecture:** One `std::sync::Mutex<HashMap<region, OccupancyHistory>>`.
//! Every decision is taken under the lock; every wait (stop, defer) happens
//! outside it, polling the occupant's [`OccupancySignals`] once per
//! `poll_interval`. The lock is never held across an `.await`.
//!
//! Each region keeps at most two records (`previous`, `current`): the record
//! that is playing or was displaced, and the one that displaced it. Pushing a
//! third record evicts the oldest.
//!
//! # Conflict tiers
//!
//! The *occupant's* policy decides what happens to a newcomer:
//!
//! | Newcomer level | Policy consulted | Stop | Pause | Defer | Never |
//! |----------------|------------------|------|-------|-------|-------|
//! | higher | `higher` | occupant stops, newcomer waits for it | occupant paused, newcomer plays | ignored | ignored |
//! | equal, other parent | `peers` | as above | as above | newcomer parks | rejected |
//! | lower | `lower` | treated as Defer | treated as Defer | newcomer parks | rejected |

use super::cancel::CancellationContext;
use smil_common::events::{ConflictTier, EventBus, PlayerEvent};
use smil_common::node::{Behavior, PriorityClass};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Pause horizon used for "paused until resumed"
const INDEFINITE_PAUSE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Cross-task signals of one activation
///
/// The only state non-owners touch: an arbitrating newcomer asks the occupant
/// to stop or pause, and watches `playing` to learn when it is gone.
#[derive(Debug)]
pub struct OccupancySignals {
    playing: AtomicBool,
    stop_requested: AtomicBool,
    pause_until: Mutex<Option<Instant>>,
}

impl OccupancySignals {
    /// New activation, considered playing until it says otherwise
    pub fn new() -> Self {
        Self {
            playing: AtomicBool::new(true),
            stop_requested: AtomicBool::new(false),
            pause_until: Mutex::new(None),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn pause_indefinitely(&self) {
        self.pause_for(INDEFINITE_PAUSE);
    }

    pub fn pause_for(&self, duration: Duration) {
        *self.pause_guard() = Some(Instant::now() + duration);
    }

    pub fn resume(&self) {
        *self.pause_guard() = None;
    }

    pub fn is_paused(&self) -> bool {
        self.pause_guard().is_some_and(|until| until > Instant::now())
    }

    fn pause_guard(&self) -> MutexGuard<'_, Option<Instant>> {
        self.pause_until.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for OccupancySignals {
    fn default() -> Self {
        Self::new()
    }
}

/// Conflict policy of a priority class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictPolicy {
    pub higher: Behavior,
    pub peers: Behavior,
    pub lower: Behavior,
}

impl ConflictPolicy {
    /// Policy held by running trigger sub-trees
    pub fn trigger() -> Self {
        Self {
            higher: Behavior::Stop,
            peers: Behavior::Stop,
            lower: Behavior::Defer,
        }
    }
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self {
            higher: Behavior::Pause,
            peers: Behavior::Stop,
            lower: Behavior::Defer,
        }
    }
}

impl From<&PriorityClass> for ConflictPolicy {
    fn from(class: &PriorityClass) -> Self {
        Self {
            higher: class.higher,
            peers: class.peers,
            lower: class.lower,
        }
    }
}

/// One activation's claim on a region
#[derive(Debug, Clone)]
pub struct OccupancyRecord {
    /// Unique per activation
    pub owner: Uuid,
    pub level: u32,
    /// Lineage path of the priority class or trigger
    pub parent: String,
    pub policy: ConflictPolicy,
    /// Behavior applied to this record when it was displaced
    pub behavior: Option<Behavior>,
    pub signals: Arc<OccupancySignals>,
}

impl OccupancyRecord {
    pub fn new(level: u32, parent: impl Into<String>, policy: ConflictPolicy) -> Self {
        Self {
            owner: Uuid::new_v4(),
            level,
            parent: parent.into(),
            policy,
            behavior: None,
            signals: Arc::new(OccupancySignals::new()),
        }
    }
}

/// Two-slot ring of records for one region
#[derive(Debug, Clone, Default)]
pub struct OccupancyHistory {
    pub previous: Option<OccupancyRecord>,
    pub current: Option<OccupancyRecord>,
}

impl OccupancyHistory {
    fn single(record: OccupancyRecord) -> Self {
        Self {
            previous: None,
            current: Some(record),
        }
    }

    /// Push a new current record, evicting the oldest
    fn push(&mut self, record: OccupancyRecord) {
        self.previous = self.current.take();
        self.current = Some(record);
    }

    pub fn len(&self) -> usize {
        usize::from(self.previous.is_some()) + usize::from(self.current.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(&self) -> impl Iterator<Item = &OccupancyRecord> {
        self.previous.iter().chain(self.current.iter())
    }
}

/// Outcome of [`RegionArbitrationTable::enter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Candidate owns the region now
    Proceed,
    /// Candidate must not play this activation
    Rejected,
    /// Region was cleared; enter again
    Retry,
}

/// What to do after the lock is released
enum Pending {
    /// Occupant was asked to stop; wait for it, then proceed
    AwaitStop(Arc<OccupancySignals>),
    /// Park until the occupant stops playing, then take over the region
    Park(OccupancyRecord),
    /// Same-lineage occupant is stopping; wait, clear, retry
    AwaitThenRetry(OccupancyRecord),
}

/// Shared region arbitration table
pub struct RegionArbitrationTable {
    regions: Mutex<HashMap<String, OccupancyHistory>>,
    poll_interval: Duration,
    events: EventBus,
}

impl RegionArbitrationTable {
    pub fn new(poll_interval: Duration, events: EventBus) -> Self {
        Self {
            regions: Mutex::new(HashMap::new()),
            poll_interval,
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, OccupancyHistory>> {
        self.regions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Arbitrate `candidate` against the current occupant of `region`
    pub async fn enter(
        &self,
        region: &str,
        candidate: &OccupancyRecord,
        cancel: &CancellationContext,
    ) -> Decision {
        let pending = match self.decide(region, candidate) {
            Ok(decision) => return decision,
            Err(pending) => pending,
        };

        match pending {
            Pending::AwaitStop(occupant) => {
                if !self.wait_until_idle(&occupant, cancel).await {
                    self.leave(region, candidate.owner);
                    return Decision::Rejected;
                }
                debug!("Region {}: displaced occupant stopped, {} proceeds", region, candidate.parent);
                Decision::Proceed
            }
            Pending::Park(occupant) => {
                debug!("Region {}: {} parked behind {}", region, candidate.parent, occupant.parent);
                if !self.wait_until_idle(&occupant.signals, cancel).await {
                    return Decision::Rejected;
                }
                let mut regions = self.lock();
                let still_ours = regions
                    .get(region)
                    .and_then(|history| history.current.as_ref())
                    .map_or(true, |current| current.owner == occupant.owner);
                if !still_ours {
                    return Decision::Retry;
                }
                regions.insert(region.to_string(), OccupancyHistory::single(candidate.clone()));
                debug!("Region {}: collapsed to {}", region, candidate.parent);
                Decision::Proceed
            }
            Pending::AwaitThenRetry(occupant) => {
                if !self.wait_until_idle(&occupant.signals, cancel).await {
                    return Decision::Rejected;
                }
                let mut regions = self.lock();
                let unchanged = regions
                    .get(region)
                    .and_then(|history| history.current.as_ref())
                    .is_some_and(|current| current.owner == occupant.owner);
                if unchanged {
                    regions.remove(region);
                }
                Decision::Retry
            }
        }
    }

    /// Decision part of `enter`, taken under the lock
    fn decide(&self, region: &str, candidate: &OccupancyRecord) -> Result<Decision, Pending> {
        let mut regions = self.lock();
        let history = regions.entry(region.to_string()).or_default();

        let Some(occupant) = history.current.clone() else {
            history.push(candidate.clone());
            debug!("Region {}: empty, {} enters", region, candidate.parent);
            return Ok(Decision::Proceed);
        };

        if occupant.owner == candidate.owner {
            return Ok(Decision::Proceed);
        }

        if occupant.parent == candidate.parent {
            if occupant.signals.is_stop_requested() {
                return Err(Pending::AwaitThenRetry(occupant));
            }
            let mut refreshed = candidate.clone();
            refreshed.behavior = occupant.behavior;
            history.current = Some(refreshed);
            debug!("Region {}: refreshed {}", region, candidate.parent);
            return Ok(Decision::Proceed);
        }

        let (tier, configured) = if candidate.level > occupant.level {
            (ConflictTier::Higher, occupant.policy.higher)
        } else if candidate.level < occupant.level {
            (ConflictTier::Lower, occupant.policy.lower)
        } else {
            (ConflictTier::Peer, occupant.policy.peers)
        };

        let behavior = match (tier, configured) {
            (ConflictTier::Lower, Behavior::Stop | Behavior::Pause) => {
                debug!(
                    "Region {}: '{:?}' not allowed for lower priority, deferring instead",
                    region, configured
                );
                Behavior::Defer
            }
            _ => configured,
        };

        debug!(
            "Region {}: {} (level {}) meets {} (level {}), {:?} tier -> {:?}",
            region, candidate.parent, candidate.level, occupant.parent, occupant.level, tier, behavior
        );

        let admitted = behavior != Behavior::Never || tier == ConflictTier::Higher;
        self.events.emit_lossy(PlayerEvent::RegionConflict {
            region: region.to_string(),
            tier,
            behavior,
            candidate_level: candidate.level,
            occupant_level: occupant.level,
            admitted,
            timestamp: chrono::Utc::now(),
        });

        match (tier, behavior) {
            (ConflictTier::Higher, Behavior::Defer | Behavior::Never) => {
                debug!("Region {}: '{:?}' meaningless for higher priority, ignored", region, behavior);
                history.push(candidate.clone());
                Ok(Decision::Proceed)
            }
            (_, Behavior::Never) => {
                info!("Region {}: {} rejected by {}", region, candidate.parent, occupant.parent);
                Ok(Decision::Rejected)
            }
            (_, Behavior::Stop) => {
                occupant.signals.request_stop();
                if let Some(current) = history.current.as_mut() {
                    current.behavior = Some(Behavior::Stop);
                }
                history.push(candidate.clone());
                Err(Pending::AwaitStop(occupant.signals))
            }
            (_, Behavior::Pause) => {
                occupant.signals.pause_indefinitely();
                if let Some(current) = history.current.as_mut() {
                    current.behavior = Some(Behavior::Pause);
                }
                history.push(candidate.clone());
                Ok(Decision::Proceed)
            }
            (_, Behavior::Defer) => Err(Pending::Park(occupant)),
        }
    }

    /// Poll until `signals` stops playing; `false` if the cycle was cancelled
    async fn wait_until_idle(&self, signals: &OccupancySignals, cancel: &CancellationContext) -> bool {
        while signals.is_playing() {
            if !cancel.sleep(self.poll_interval).await {
                return false;
            }
        }
        true
    }

    /// Release `owner`'s claim on `region`
    pub fn leave(&self, region: &str, owner: Uuid) {
        let mut regions = self.lock();
        let Some(history) = regions.get_mut(region) else {
            return;
        };

        if history.current.as_ref().is_some_and(|r| r.owner == owner) {
            history.current = None;
            if let Some(mut predecessor) = history.previous.take() {
                match predecessor.behavior {
                    Some(Behavior::Pause) => {
                        debug!("Region {}: resuming {}", region, predecessor.parent);
                        predecessor.signals.resume();
                        predecessor.behavior = None;
                        history.current = Some(predecessor);
                    }
                    Some(Behavior::Stop) => {
                        predecessor.signals.set_playing(false);
                    }
                    _ => history.current = Some(predecessor),
                }
            }
        } else if history.previous.as_ref().is_some_and(|r| r.owner == owner) {
            history.previous = None;
        }

        if history.is_empty() {
            regions.remove(region);
        }
    }

    /// True when any record in any of `regions` is playing
    pub fn is_held(&self, regions: &[String]) -> bool {
        let table = self.lock();
        let held = regions
            .iter()
            .filter_map(|name| table.get(name))
            .flat_map(OccupancyHistory::records)
            .any(|record| record.signals.is_playing());
        held
    }

    pub fn len(&self, region: &str) -> usize {
        self.lock().get(region).map_or(0, OccupancyHistory::len)
    }

    /// Copy of a region's history, oldest first
    pub fn snapshot(&self, region: &str) -> Vec<OccupancyRecord> {
        self.lock()
            .get(region)
            .map(|history| history.records().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Arc<RegionArbitrationTable> {
        Arc::new(RegionArbitrationTable::new(Duration::from_secs(1), EventBus::new(64)))
    }

    fn record(level: u32, parent: &str) -> OccupancyRecord {
        OccupancyRecord::new(level, parent, ConflictPolicy::default())
    }

    fn record_with(level: u32, parent: &str, higher: Behavior, peers: Behavior, lower: Behavior) -> OccupancyRecord {
        OccupancyRecord::new(level, parent, ConflictPolicy { higher, peers, lower })
    }

    #[tokio::test]
    async fn test_empty_region_proceeds() {
        let table = table();
        let cancel = CancellationContext::new();
        let a = record(0, "a");
        assert_eq!(table.enter("main", &a, &cancel).await, Decision::Proceed);
        assert_eq!(table.len("main"), 1);
        assert!(table.is_held(&["main".to_string()]));

        table.leave("main", a.owner);
        assert_eq!(table.len("main"), 0);
    }

    #[tokio::test]
    async fn test_peer_never_rejects_and_leaves_table_unchanged() {
        let table = table();
        let cancel = CancellationContext::new();
        let occupant = record_with(1, "a", Behavior::Pause, Behavior::Never, Behavior::Defer);
        let newcomer = record(1, "b");

        table.enter("main", &occupant, &cancel).await;
        assert_eq!(table.enter("main", &newcomer, &cancel).await, Decision::Rejected);

        let snapshot = table.snapshot("main");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].owner, occupant.owner);
    }

    #[tokio::test]
    async fn test_lower_never_rejects() {
        let table = table();
        let cancel = CancellationContext::new();
        let occupant = record_with(5, "a", Behavior::Pause, Behavior::Stop, Behavior::Never);
        table.enter("main", &occupant, &cancel).await;
        assert_eq!(table.enter("main", &record(1, "b"), &cancel).await, Decision::Rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_higher_stop_waits_for_occupant() {
        let table = table();
        let cancel = CancellationContext::new();
        let occupant = record_with(0, "low", Behavior::Stop, Behavior::Stop, Behavior::Defer);
        table.enter("main", &occupant, &cancel).await;

        let newcomer = record(3, "high");
        let entering = {
            let table = table.clone();
            let cancel = cancel.clone();
            let newcomer = newcomer.clone();
            tokio::spawn(async move { table.enter("main", &newcomer, &cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(occupant.signals.is_stop_requested());
        assert!(!entering.is_finished());

        // occupant notices the request and winds down
        occupant.signals.set_playing(false);
        table.leave("main", occupant.owner);

        assert_eq!(entering.await.unwrap(), Decision::Proceed);
        let snapshot = table.snapshot("main");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].owner, newcomer.owner);
    }

    #[tokio::test]
    async fn test_higher_pause_then_resume_on_leave() {
        let table = table();
        let cancel = CancellationContext::new();
        let occupant = record(0, "low");
        table.enter("main", &occupant, &cancel).await;

        let newcomer = record(2, "high");
        assert_eq!(table.enter("main", &newcomer, &cancel).await, Decision::Proceed);
        assert!(occupant.signals.is_paused());
        assert_eq!(table.len("main"), 2);

        table.leave("main", newcomer.owner);
        assert!(!occupant.signals.is_paused());
        let snapshot = table.snapshot("main");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].owner, occupant.owner);
        assert_eq!(snapshot[0].behavior, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lower_defer_parks_then_collapses() {
        let table = table();
        let cancel = CancellationContext::new();
        let occupant = record(4, "high");
        table.enter("main", &occupant, &cancel).await;

        let newcomer = record(1, "low");
        let entering = {
            let table = table.clone();
            let cancel = cancel.clone();
            let newcomer = newcomer.clone();
            tokio::spawn(async move { table.enter("main", &newcomer, &cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!entering.is_finished());
        assert!(!occupant.signals.is_stop_requested());

        occupant.signals.set_playing(false);
        assert_eq!(entering.await.unwrap(), Decision::Proceed);
        let snapshot = table.snapshot("main");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].owner, newcomer.owner);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lower_stop_is_treated_as_defer() {
        let table = table();
        let cancel = CancellationContext::new();
        let occupant = record_with(4, "high", Behavior::Pause, Behavior::Stop, Behavior::Stop);
        table.enter("main", &occupant, &cancel).await;

        let entering = {
            let table = table.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { table.enter("main", &record(0, "low"), &cancel).await })
        };
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!occupant.signals.is_stop_requested());
        assert!(!entering.is_finished());

        cancel.disable_loop(true);
        assert_eq!(entering.await.unwrap(), Decision::Rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_stop_waits_for_occupant() {
        let table = table();
        let cancel = CancellationContext::new();
        let occupant = record_with(1, "a", Behavior::Pause, Behavior::Stop, Behavior::Defer);
        table.enter("main", &occupant, &cancel).await;

        let newcomer = record(1, "b");
        let entering = {
            let table = table.clone();
            let cancel = cancel.clone();
            let newcomer = newcomer.clone();
            tokio::spawn(async move { table.enter("main", &newcomer, &cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(occupant.signals.is_stop_requested());
        assert!(!entering.is_finished());
        let snapshot = table.snapshot("main");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].behavior, Some(Behavior::Stop));
        assert_eq!(snapshot[1].owner, newcomer.owner);

        occupant.signals.set_playing(false);
        assert_eq!(entering.await.unwrap(), Decision::Proceed);

        // the stopped predecessor is not brought back
        table.leave("main", newcomer.owner);
        assert_eq!(table.len("main"), 0);
    }

    #[tokio::test]
    async fn test_peer_pause_proceeds_at_once() {
        let table = table();
        let cancel = CancellationContext::new();
        let occupant = record_with(1, "a", Behavior::Pause, Behavior::Pause, Behavior::Defer);
        table.enter("main", &occupant, &cancel).await;

        let newcomer = record(1, "b");
        assert_eq!(table.enter("main", &newcomer, &cancel).await, Decision::Proceed);
        assert!(occupant.signals.is_paused());
        assert!(!occupant.signals.is_stop_requested());

        let snapshot = table.snapshot("main");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].behavior, Some(Behavior::Pause));
        assert_eq!(snapshot[1].owner, newcomer.owner);
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_defer_parks_then_collapses() {
        let table = table();
        let cancel = CancellationContext::new();
        let occupant = record_with(1, "a", Behavior::Pause, Behavior::Defer, Behavior::Defer);
        table.enter("main", &occupant, &cancel).await;

        let newcomer = record(1, "b");
        let entering = {
            let table = table.clone();
            let cancel = cancel.clone();
            let newcomer = newcomer.clone();
            tokio::spawn(async move { table.enter("main", &newcomer, &cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!entering.is_finished());
        assert!(!occupant.signals.is_stop_requested());
        assert!(!occupant.signals.is_paused());
        assert_eq!(table.len("main"), 1);

        occupant.signals.set_playing(false);
        assert_eq!(entering.await.unwrap(), Decision::Proceed);
        let snapshot = table.snapshot("main");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].owner, newcomer.owner);
    }

    #[tokio::test]
    async fn test_higher_defer_and_never_are_ignored() {
        for behavior in [Behavior::Defer, Behavior::Never] {
            let table = table();
            let cancel = CancellationContext::new();
            let occupant = record_with(0, "low", behavior, Behavior::Stop, Behavior::Defer);
            table.enter("main", &occupant, &cancel).await;

            let newcomer = record(3, "high");
            assert_eq!(table.enter("main", &newcomer, &cancel).await, Decision::Proceed);
            assert!(occupant.signals.is_playing());
            assert!(!occupant.signals.is_paused());
            assert!(!occupant.signals.is_stop_requested());

            let snapshot = table.snapshot("main");
            assert_eq!(snapshot.len(), 2);
            assert_eq!(snapshot[0].owner, occupant.owner);
            assert_eq!(snapshot[0].behavior, None);
            assert_eq!(snapshot[1].owner, newcomer.owner);
        }
    }

    #[tokio::test]
    async fn test_same_parent_refresh_inherits_behavior() {
        let table = table();
        let cancel = CancellationContext::new();
        let first = record(1, "class");
        table.enter("main", &first, &cancel).await;

        let again = record(1, "class");
        assert_eq!(table.enter("main", &again, &cancel).await, Decision::Proceed);
        let snapshot = table.snapshot("main");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].owner, again.owner);

        // the replaced activation leaving is a no-op
        table.leave("main", first.owner);
        assert_eq!(table.len("main"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_parent_stopping_occupant_retries() {
        let table = table();
        let cancel = CancellationContext::new();
        let first = record(1, "class");
        table.enter("main", &first, &cancel).await;
        first.signals.request_stop();

        let again = record(1, "class");
        let entering = {
            let table = table.clone();
            let cancel = cancel.clone();
            let again = again.clone();
            tokio::spawn(async move { table.enter("main", &again, &cancel).await })
        };
        tokio::time::sleep(Duration::from_secs(2)).await;
        first.signals.set_playing(false);

        assert_eq!(entering.await.unwrap(), Decision::Retry);
        assert_eq!(table.len("main"), 0);
        assert_eq!(table.enter("main", &again, &cancel).await, Decision::Proceed);
    }

    #[tokio::test]
    async fn test_history_never_exceeds_two() {
        let table = table();
        let cancel = CancellationContext::new();
        let mut owners = Vec::new();
        // each newcomer outranks the last and pauses it
        for level in 0..6 {
            let r = record(level, &format!("class{}", level));
            assert_eq!(table.enter("main", &r, &cancel).await, Decision::Proceed);
            assert!(table.len("main") <= 2);
            owners.push(r.owner);
        }
        for owner in owners.iter().rev() {
            table.leave("main", *owner);
            assert!(table.len("main") <= 2);
        }
        assert_eq!(table.len("main"), 0);
    }

    #[tokio::test]
    async fn test_conflict_is_broadcast() {
        let events = EventBus::new(16);
        let mut rx = events.subscribe();
        let table = RegionArbitrationTable::new(Duration::from_secs(1), events);
        let cancel = CancellationContext::new();

        table.enter("main", &record(0, "a"), &cancel).await;
        table.enter("main", &record(2, "b"), &cancel).await;

        match rx.recv().await.unwrap() {
            PlayerEvent::RegionConflict { region, tier, behavior, admitted, .. } => {
                assert_eq!(region, "main");
                assert_eq!(tier, ConflictTier::Higher);
                assert_eq!(behavior, Behavior::Pause);
                assert!(admitted);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_signals_pause_resume() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let signals = OccupancySignals::new();
            assert!(signals.is_playing());
            assert!(!signals.is_paused());
            signals.pause_indefinitely();
            assert!(signals.is_paused());
            signals.resume();
            assert!(!signals.is_paused());
        });
    }
}
