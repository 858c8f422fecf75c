//! Renderer double that records commands

use async_trait::async_trait;
use smil_common::{MediaItem, MediaKind, RegionGeometry};
use smil_player::playback::Renderer;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Prepare,
    Play,
    Stop,
    OnceEnded,
    Pause,
    Resume,
}

/// One renderer command
#[derive(Debug, Clone)]
pub struct Call {
    pub op: Op,
    pub src: String,
    /// Region the command was issued for
    pub region: String,
    /// Virtual time since the renderer was created
    pub at: Duration,
}

pub struct RecordingRenderer {
    started: Instant,
    video_length: Duration,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingRenderer {
    /// Videos and audio end `video_length` after `once_ended` is awaited
    pub fn new(video_length: Duration) -> Arc<Self> {
        Arc::new(Self {
            started: Instant::now(),
            video_length,
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        })
    }

    /// Make `play` fail for `src`
    pub fn fail_play(&self, src: &str) {
        self.failing.lock().unwrap().insert(src.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, op: Op, src: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.op == op && call.src == src)
            .collect()
    }

    pub fn count(&self, op: Op, src: &str) -> usize {
        self.calls_for(op, src).len()
    }

    /// Times of every `op` for `src`
    pub fn times(&self, op: Op, src: &str) -> Vec<Duration> {
        self.calls_for(op, src).into_iter().map(|call| call.at).collect()
    }

    /// Index of the first `op` for `src` in the command log
    pub fn position(&self, op: Op, src: &str) -> Option<usize> {
        self.calls()
            .iter()
            .position(|call| call.op == op && call.src == src)
    }

    fn record(&self, op: Op, item: &MediaItem, region: &RegionGeometry) {
        self.calls.lock().unwrap().push(Call {
            op,
            src: item.src.clone(),
            region: region.name.clone(),
            at: self.started.elapsed(),
        });
    }
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn prepare(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()> {
        self.record(Op::Prepare, item, region);
        Ok(())
    }

    async fn play(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()> {
        self.record(Op::Play, item, region);
        if self.failing.lock().unwrap().contains(&item.src) {
            anyhow::bail!("cannot open {}", item.src);
        }
        Ok(())
    }

    async fn stop(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()> {
        self.record(Op::Stop, item, region);
        Ok(())
    }

    async fn once_ended(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()> {
        self.record(Op::OnceEnded, item, region);
        if matches!(item.kind, MediaKind::Video | MediaKind::Audio) {
            tokio::time::sleep(self.video_length).await;
        }
        Ok(())
    }

    async fn pause(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()> {
        self.record(Op::Pause, item, region);
        Ok(())
    }

    async fn resume(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()> {
        self.record(Op::Resume, item, region);
        Ok(())
    }
}
