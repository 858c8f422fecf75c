//! Test helper modules for SMIL player integration tests
//!
//! Provides reusable test infrastructure components:
//! - RecordingRenderer: renderer double that records every command with its virtual time
//! - documents: JSON builders for documents and node trees
//! - MemoryProvider: in-memory document provider for reload tests

#![allow(dead_code)]

pub mod documents;
pub mod recording_renderer;

pub use documents::{document, document_with_triggers, node, MemoryProvider};
pub use recording_renderer::{Call, Op, RecordingRenderer};

use chrono::{NaiveDate, NaiveDateTime};
use smil_common::events::PlayerEvent;
use smil_common::Document;
use smil_player::config::PlaybackSettings;
use smil_player::playback::{CancellationContext, TokioClock};
use smil_player::Player;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Wallclock every test starts at: Wednesday 2024-05-15 12:00:00
pub fn anchor() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Player over `renderer` with default settings and a virtual clock at [`anchor`]
///
/// Must be called from inside a paused tokio runtime.
pub fn player(renderer: Arc<RecordingRenderer>) -> Player {
    Player::new(
        renderer,
        Arc::new(TokioClock::new(anchor())),
        PlaybackSettings::default(),
    )
}

/// Run one document cycle in the background
pub fn spawn_cycle(
    player: &Player,
    doc: Document,
) -> (CancellationContext, JoinHandle<smil_player::Result<()>>) {
    let cancel = CancellationContext::new();
    let task_player = player.clone();
    let task_cancel = cancel.clone();
    let handle = tokio::spawn(async move { task_player.run_cycle(Arc::new(doc), task_cancel).await });
    (cancel, handle)
}

/// Stop a cycle started with [`spawn_cycle`] and wait for its teardown
pub async fn stop_cycle(cancel: &CancellationContext, handle: JoinHandle<smil_player::Result<()>>) {
    cancel.disable_loop(true);
    handle
        .await
        .expect("cycle task panicked")
        .expect("cycle returned an error");
}

/// Everything broadcast so far on `events`
pub fn drain_events(events: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut received = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => received.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return received,
        }
    }
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}
