//! Parsed timing document: layout, playlist and trigger sub-trees

use crate::node::Node;
use crate::region::Layout;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Everything the scheduler needs for one document cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub layout: Layout,
    pub playlist: Node,
    /// Trigger id -> sub-tree started externally
    #[serde(default)]
    pub triggers: BTreeMap<String, Node>,
    /// Staleness check interval in seconds; the player's configured default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<u64>,
}

impl Document {
    pub fn new(layout: Layout, playlist: Node) -> Self {
        Self {
            layout,
            playlist,
            triggers: BTreeMap::new(),
            refresh: None,
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Staleness check interval, falling back to `default_seconds`
    pub fn refresh_interval(&self, default_seconds: u64) -> Duration {
        Duration::from_secs(self.refresh.unwrap_or(default_seconds).max(1))
    }

    pub fn trigger(&self, id: &str) -> Option<&Node> {
        self.triggers.get(id)
    }
}
