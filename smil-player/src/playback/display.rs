//! Per-region display registry
//!
//! Tracks what each region is currently showing so that:
//!
//! - a new item can take over a region before the old one is stopped (gapless
//!   handover, and only when the source actually changes),
//! - a starting trigger can interrupt items that play outside any priority class,
//! - cycle teardown can stop everything still on screen.

use super::arbitration::OccupancySignals;
use smil_common::{MediaItem, RegionGeometry};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Item currently shown in a region
#[derive(Debug, Clone)]
pub struct DisplayedItem {
    pub item: MediaItem,
    pub geometry: RegionGeometry,
    /// Per-item signals; a trigger requests a stop through these
    pub signals: Arc<OccupancySignals>,
    /// Signals of the priority class or trigger that showed it
    pub owner: Option<Arc<OccupancySignals>>,
    /// Started inside a priority class or trigger
    pub managed: bool,
}

/// Region name -> displayed item
#[derive(Default)]
pub struct DisplayRegistry {
    regions: Mutex<HashMap<String, DisplayedItem>>,
}

impl DisplayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DisplayedItem>> {
        self.regions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `displayed` for `region`, returning what it replaced
    pub fn replace(&self, region: &str, displayed: DisplayedItem) -> Option<DisplayedItem> {
        self.lock().insert(region.to_string(), displayed)
    }

    pub fn current(&self, region: &str) -> Option<DisplayedItem> {
        self.lock().get(region).cloned()
    }

    pub fn is_displaying(&self, region: &str, src: &str) -> bool {
        self.lock().get(region).is_some_and(|shown| shown.item.src == src)
    }

    /// Forget `region` if it still shows the item with these signals
    pub fn remove_if_current(&self, region: &str, signals: &Arc<OccupancySignals>) -> Option<DisplayedItem> {
        let mut regions = self.lock();
        if regions
            .get(region)
            .is_some_and(|shown| Arc::ptr_eq(&shown.signals, signals))
        {
            regions.remove(region)
        } else {
            None
        }
    }

    /// Ask unmanaged items in `regions` to stop; returns how many were asked
    pub fn interrupt_unmanaged(&self, regions: &[String]) -> usize {
        let shown = self.lock();
        let asked = regions
            .iter()
            .filter_map(|name| shown.get(name))
            .filter(|item| !item.managed)
            .inspect(|item| item.signals.request_stop())
            .count();
        asked
    }

    /// Remove and return everything on screen
    pub fn drain(&self) -> Vec<(String, DisplayedItem)> {
        self.lock().drain().collect()
    }
}
