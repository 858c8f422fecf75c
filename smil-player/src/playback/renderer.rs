//! Renderer interface
//!
//! The scheduler never draws pixels or decodes media; it drives a [`Renderer`]
//! with high-level commands. Every command receives the media item and the
//! geometry of the region it plays in.
//!
//! Errors are `anyhow` so embedders can surface whatever their backend
//! produces. The interpreter logs them at warn level and treats the item as
//! finished.

use async_trait::async_trait;
use smil_common::{MediaItem, MediaKind, RegionGeometry};
use std::time::Duration;
use tracing::info;

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Get the item ready (buffer a video, place an image placeholder)
    async fn prepare(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()>;

    /// Start showing the item; returns once it is loaded and visible
    async fn play(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()>;

    /// Take the item off screen
    async fn stop(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()>;

    /// Resolves when a video or audio item reaches its natural end
    async fn once_ended(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()>;

    async fn pause(&self, _item: &MediaItem, _region: &RegionGeometry) -> anyhow::Result<()> {
        Ok(())
    }

    async fn resume(&self, _item: &MediaItem, _region: &RegionGeometry) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Headless renderer that logs every command
///
/// Videos and audio "play" for a fixed simulated length.
#[derive(Debug, Clone)]
pub struct TracingRenderer {
    simulated_length: Duration,
}

impl TracingRenderer {
    pub fn new(simulated_length: Duration) -> Self {
        Self { simulated_length }
    }
}

impl Default for TracingRenderer {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl Renderer for TracingRenderer {
    async fn prepare(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()> {
        info!(src = %item.src, region = %region.name, "prepare {:?}", item.kind);
        Ok(())
    }

    async fn play(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()> {
        info!(
            src = %item.src,
            region = %region.name,
            "play {:?} at {}x{}+{}+{}",
            item.kind, region.width, region.height, region.left, region.top
        );
        Ok(())
    }

    async fn stop(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()> {
        info!(src = %item.src, region = %region.name, "stop");
        Ok(())
    }

    async fn once_ended(&self, item: &MediaItem, _region: &RegionGeometry) -> anyhow::Result<()> {
        if matches!(item.kind, MediaKind::Video | MediaKind::Audio) {
            tokio::time::sleep(self.simulated_length).await;
        }
        Ok(())
    }

    async fn pause(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()> {
        info!(src = %item.src, region = %region.name, "pause");
        Ok(())
    }

    async fn resume(&self, item: &MediaItem, region: &RegionGeometry) -> anyhow::Result<()> {
        info!(src = %item.src, region = %region.name, "resume");
        Ok(())
    }
}
