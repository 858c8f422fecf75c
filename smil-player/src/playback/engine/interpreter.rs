//! Recursive node interpreter
//!
//! Walks the node tree depth-first. Every node goes through [`Player::run_node`],
//! which resolves its time window, waits for the window to open and applies the
//! repeat count; [`Player::run_body`] then dispatches on the node kind.
//!
//! Node lifecycle: Pending → Waiting → Arbitrating → Playing → (Repeating) →
//! Completed | Stopped | Rejected. Scheduling misses and rejections are not
//! errors; they surface as [`NodeOutcome::Idle`].

use super::core::Player;
use crate::error::Result;
use crate::playback::arbitration::{ConflictPolicy, Decision, OccupancyRecord, OccupancySignals};
use crate::playback::cancel::CancellationContext;
use chrono::NaiveDateTime;
use futures::future::{join_all, BoxFuture, FutureExt};
use smil_common::node::{needs_default_await, Group, PriorityClass};
use smil_common::timing::resolve;
use smil_common::{Document, MediaItem, MediaKind, Node, RepeatCount};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// How a node activation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    /// Something was rendered
    Played,
    /// Nothing was eligible (window closed, rejected, empty)
    Idle,
    /// Cut short by cancellation or a stop request
    Stopped,
}

impl NodeOutcome {
    fn merge(self, other: NodeOutcome) -> NodeOutcome {
        match (self, other) {
            (NodeOutcome::Stopped, _) | (_, NodeOutcome::Stopped) => NodeOutcome::Stopped,
            (NodeOutcome::Played, _) | (_, NodeOutcome::Played) => NodeOutcome::Played,
            _ => NodeOutcome::Idle,
        }
    }
}

/// Traversal context handed down the tree
#[derive(Clone)]
pub(super) struct Scope {
    /// Lineage path, e.g. `playlist/2/0`
    pub(super) path: String,
    pub(super) document: Arc<Document>,
    pub(super) cancel: CancellationContext,
    /// Closing instant of the tightest enclosing window
    pub(super) end: Option<NaiveDateTime>,
    /// Signals of the enclosing priority class or trigger
    pub(super) occupancy: Option<Arc<OccupancySignals>>,
    /// Region held by the enclosing priority class
    pub(super) claimed_region: Option<String>,
    /// Region assigned to the enclosing trigger
    pub(super) trigger_region: Option<String>,
}

impl Scope {
    pub(super) fn root(document: Arc<Document>, cancel: CancellationContext) -> Self {
        Self {
            path: "playlist".to_string(),
            document,
            cancel,
            end: None,
            occupancy: None,
            claimed_region: None,
            trigger_region: None,
        }
    }

    pub(super) fn trigger(
        id: &str,
        document: Arc<Document>,
        cancel: CancellationContext,
        signals: Arc<OccupancySignals>,
        region: String,
    ) -> Self {
        Self {
            path: format!("trigger/{}", id),
            document,
            cancel,
            end: None,
            occupancy: Some(signals),
            claimed_region: None,
            trigger_region: Some(region),
        }
    }

    fn child(&self, index: usize) -> Self {
        Self {
            path: format!("{}/{}", self.path, index),
            ..self.clone()
        }
    }

    fn with_end(&self, end: Option<NaiveDateTime>) -> Self {
        let end = match (self.end, end) {
            (Some(outer), Some(inner)) => Some(outer.min(inner)),
            (outer, inner) => outer.or(inner),
        };
        Self { end, ..self.clone() }
    }

    fn with_claim(&self, signals: Arc<OccupancySignals>, region: &str) -> Self {
        Self {
            occupancy: Some(signals),
            claimed_region: Some(region.to_string()),
            ..self.clone()
        }
    }

    /// Media inside a priority class or trigger
    pub(super) fn is_managed(&self) -> bool {
        self.occupancy.is_some()
    }

    /// Cycle cancelled or enclosing activation asked to stop
    pub(super) fn is_stopped(&self) -> bool {
        self.cancel.is_stopped()
            || self
                .occupancy
                .as_ref()
                .is_some_and(|signals| signals.is_stop_requested())
    }

    pub(super) fn is_paused(&self) -> bool {
        self.occupancy.as_ref().is_some_and(|signals| signals.is_paused())
    }

    pub(super) fn end_reached(&self, now: NaiveDateTime) -> bool {
        self.end.is_some_and(|end| now >= end)
    }
}

impl Player {
    /// Activate `node`: resolve its window, wait, then run its body per repeat count
    pub(super) fn run_node<'a>(&'a self, node: &'a Node, scope: &'a Scope) -> BoxFuture<'a, Result<NodeOutcome>> {
        async move {
            let now = self.clock.now();
            if scope.end_reached(now) {
                debug!("{}: enclosing window already closed", scope.path);
                return Ok(NodeOutcome::Idle);
            }

            let window = resolve(node.begin(), node.end(), now);
            if !window.is_playable(now) {
                debug!("{}: window over, skipping {}", scope.path, node.kind_name());
                return Ok(NodeOutcome::Idle);
            }

            if !window.wait.is_zero() {
                debug!("{}: waiting {:?} for window to open", scope.path, window.wait);
                if !self.sleep_in(scope, window.wait).await {
                    return Ok(NodeOutcome::Stopped);
                }
            }

            let scope = scope.with_end(window.end_instant());

            match node.repeat_count() {
                RepeatCount::Count(times) => self.repeat_counted(node, &scope, times).await,
                RepeatCount::Indefinite => self.repeat_indefinitely(node, &scope).await,
            }
        }
        .boxed()
    }

    async fn repeat_counted(&self, node: &Node, scope: &Scope, times: u32) -> Result<NodeOutcome> {
        let mut outcome = NodeOutcome::Idle;
        for iteration in 0..times {
            if scope.is_stopped() {
                return Ok(NodeOutcome::Stopped);
            }
            if scope.end_reached(self.clock.now()) {
                break;
            }

            let started = Instant::now();
            let result = self.run_body(node, scope).await?;
            outcome = outcome.merge(result);
            if result == NodeOutcome::Stopped {
                break;
            }
            if iteration + 1 < times && !self.pace_iteration(scope, result, started).await {
                return Ok(NodeOutcome::Stopped);
            }
        }
        Ok(outcome)
    }

    async fn repeat_indefinitely(&self, node: &Node, scope: &Scope) -> Result<NodeOutcome> {
        let mut outcome = NodeOutcome::Idle;
        loop {
            if scope.is_stopped() {
                return Ok(NodeOutcome::Stopped);
            }
            if scope.end_reached(self.clock.now()) {
                debug!("{}: window closed, leaving indefinite repeat", scope.path);
                return Ok(outcome);
            }

            let started = Instant::now();
            let result = self.run_body(node, scope).await?;
            if result == NodeOutcome::Stopped {
                return Ok(NodeOutcome::Stopped);
            }
            outcome = outcome.merge(result);
            if !self.pace_iteration(scope, result, started).await {
                return Ok(NodeOutcome::Stopped);
            }
        }
    }

    /// Sleep one default await after an iteration that neither played nor waited
    async fn pace_iteration(&self, scope: &Scope, result: NodeOutcome, started: Instant) -> bool {
        if result == NodeOutcome::Idle && started.elapsed() < self.settings.poll_interval {
            debug!("{}: nothing played, awaiting {:?}", scope.path, self.settings.default_await);
            return self.sleep_in(scope, self.settings.default_await).await;
        }
        true
    }

    /// Run the node's contents, ignoring its own timing
    fn run_body<'a>(&'a self, node: &'a Node, scope: &'a Scope) -> BoxFuture<'a, Result<NodeOutcome>> {
        async move {
            match node {
                Node::Seq(group) => self.run_sequence(group, scope).await,
                Node::Excl(group) => {
                    debug!("{}: excl mapped to sequential playback", scope.path);
                    self.run_sequence(group, scope).await
                }
                Node::Par(group) => self.run_parallel(group, scope).await,
                Node::PriorityClass(class) => self.run_priority_class(class, scope).await,
                Node::Media(item) => match item.kind {
                    MediaKind::Video => self.run_video_run(&[item], scope).await,
                    MediaKind::Image | MediaKind::Widget => self.run_timed(item, scope).await,
                    MediaKind::Audio => self.run_audio(item, scope).await,
                },
                Node::Unsupported => {
                    warn!("{}: unsupported node kind ignored", scope.path);
                    Ok(NodeOutcome::Idle)
                }
            }
        }
        .boxed()
    }

    /// Children strictly in document order
    async fn run_sequence(&self, group: &Group, scope: &Scope) -> Result<NodeOutcome> {
        let children = &group.children;
        let len = children.len();
        let mut outcome = NodeOutcome::Idle;
        let mut index = 0;

        while index < len {
            if scope.is_stopped() {
                return Ok(NodeOutcome::Stopped);
            }

            let child = &children[index];
            if child.is_trigger() {
                debug!("{}/{}: trigger-begun child skipped", scope.path, index);
                index += 1;
                continue;
            }

            let run_end = if child.is_plain_video() {
                children[index..]
                    .iter()
                    .position(|c| !c.is_plain_video())
                    .map_or(len, |offset| index + offset)
            } else {
                index + 1
            };

            let now = self.clock.now();
            if run_end == len && needs_default_await(children, now) {
                debug!(
                    "{}: no wallclock child playable, awaiting {:?}",
                    scope.path, self.settings.default_await
                );
                if !self.sleep_in(scope, self.settings.default_await).await {
                    return Ok(NodeOutcome::Stopped);
                }
            }

            let result = if child.is_plain_video() {
                let run: Vec<&MediaItem> = children[index..run_end]
                    .iter()
                    .filter_map(|node| match node {
                        Node::Media(item) => Some(item),
                        _ => None,
                    })
                    .collect();
                self.run_video_run(&run, &scope.child(index)).await?
            } else if len > 1 && child.has_wallclock_begin() && !self.window_open(child) {
                debug!("{}/{}: wallclock window not open yet, skipped this pass", scope.path, index);
                NodeOutcome::Idle
            } else {
                self.run_node(child, &scope.child(index)).await?
            };

            outcome = outcome.merge(result);
            if result == NodeOutcome::Stopped {
                return Ok(NodeOutcome::Stopped);
            }
            index = run_end;
        }

        Ok(outcome)
    }

    fn window_open(&self, node: &Node) -> bool {
        let now = self.clock.now();
        resolve(node.begin(), node.end(), now).is_open(now)
    }

    /// All children concurrently, joined
    async fn run_parallel(&self, group: &Group, scope: &Scope) -> Result<NodeOutcome> {
        let branches = group
            .children
            .iter()
            .enumerate()
            .filter(|(index, child)| {
                if child.is_trigger() {
                    debug!("{}/{}: trigger-begun child skipped", scope.path, index);
                }
                !child.is_trigger()
            })
            .map(|(index, child)| {
                let child_scope = scope.child(index);
                async move { self.run_node(child, &child_scope).await }
            });

        let mut outcome = NodeOutcome::Idle;
        for result in join_all(branches).await {
            outcome = outcome.merge(result?);
        }
        Ok(outcome)
    }

    /// Arbitrate for the class's region, then run its body as the occupant
    async fn run_priority_class(&self, class: &PriorityClass, scope: &Scope) -> Result<NodeOutcome> {
        if scope.trigger_region.is_some() {
            debug!("{}: priority class inside trigger runs under the trigger's claim", scope.path);
            return self.run_node(&class.body, scope).await;
        }

        let Some(region) = class.body.first_media().map(|item| item.region.clone()) else {
            debug!("{}: priority class without media", scope.path);
            return Ok(NodeOutcome::Idle);
        };

        // the enclosing class already holds this region
        if scope.claimed_region.as_deref() == Some(region.as_str()) {
            debug!("{}: nested priority class runs under the enclosing claim on {}", scope.path, region);
            return self.run_node(&class.body, scope).await;
        }

        let record = OccupancyRecord::new(class.level, scope.path.clone(), ConflictPolicy::from(class));
        loop {
            match self.table.enter(&region, &record, &scope.cancel).await {
                Decision::Proceed => break,
                Decision::Retry => {
                    if scope.cancel.is_stopped() {
                        return Ok(NodeOutcome::Stopped);
                    }
                }
                Decision::Rejected => {
                    debug!("{}: rejected from region {}", scope.path, region);
                    return Ok(if scope.cancel.is_stopped() {
                        NodeOutcome::Stopped
                    } else {
                        NodeOutcome::Idle
                    });
                }
            }
        }

        let body_scope = scope.with_claim(record.signals.clone(), &region);
        let result = self.run_node(&class.body, &body_scope).await;
        record.signals.set_playing(false);
        self.table.leave(&region, record.owner);

        match result? {
            // displaced by a higher class: this activation is over, the playlist goes on
            NodeOutcome::Stopped if !scope.is_stopped() => Ok(NodeOutcome::Played),
            other => Ok(other),
        }
    }

    /// Sleep honoring cycle cancellation and the enclosing stop request
    pub(super) async fn sleep_in(&self, scope: &Scope, duration: Duration) -> bool {
        let Some(signals) = scope.occupancy.as_ref() else {
            return scope.cancel.sleep(duration).await;
        };

        let deadline = Instant::now() + duration;
        loop {
            if signals.is_stop_requested() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            if !scope.cancel.sleep(remaining.min(self.settings.poll_interval)).await {
                return false;
            }
        }
    }
}
