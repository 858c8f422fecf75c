//! Screen layout and region geometry

use serde::{Deserialize, Serialize};

/// A named rectangle on screen, optionally split into nested alternatives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionGeometry {
    pub name: String,
    #[serde(default)]
    pub left: i32,
    #[serde(default)]
    pub top: i32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<RegionGeometry>,
}

impl RegionGeometry {
    pub fn new(name: impl Into<String>, left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            left,
            top,
            width,
            height,
            ..Default::default()
        }
    }

    fn find(&self, name: &str) -> Option<&RegionGeometry> {
        if self.name == name {
            return Some(self);
        }
        self.nested.iter().find_map(|child| child.find(name))
    }
}

/// Root layout plus declared regions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub root: RegionGeometry,
    #[serde(default)]
    pub regions: Vec<RegionGeometry>,
}

impl Layout {
    /// Geometry for `name`; unknown names map to the root layout
    pub fn resolve(&self, name: &str) -> &RegionGeometry {
        self.find(name).unwrap_or(&self.root)
    }

    /// Declared region (top-level or nested) by name
    pub fn find(&self, name: &str) -> Option<&RegionGeometry> {
        self.regions.iter().find_map(|region| region.find(name))
    }

    /// Names of the nested alternatives declared under `name`
    pub fn nested_names(&self, name: &str) -> Vec<String> {
        self.find(name)
            .map(|region| region.nested.iter().map(|n| n.name.clone()).collect())
            .unwrap_or_default()
    }

    /// `name` followed by all of its nested regions
    pub fn with_nested(&self, name: &str) -> Vec<String> {
        let mut names = vec![name.to_string()];
        names.extend(self.nested_names(name));
        names
    }
}
