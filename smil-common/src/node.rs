//! Scheduling node tree
//!
//! **Purpose:** Closed model of a parsed timing document. Grouping nodes
//! (`seq`, `par`, `excl`, `priorityClass`) wrap media leaves; every node carries
//! optional `begin`/`end` time expressions and a repeat count.
//!
//! **Wire format:** JSON objects tagged by `"kind"`. Unknown kinds decode to
//! [`Node::Unsupported`] instead of failing the whole document.
//!
//! ```json
//! { "kind": "seq", "repeatCount": "indefinite", "children": [
//!     { "kind": "media", "type": "video", "src": "intro.mp4", "region": "main" },
//!     { "kind": "media", "type": "image", "src": "logo.png", "region": "main", "dur": "5s" }
//! ]}
//! ```

use crate::timing::{resolve, TimeExpr};
use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How many times a node's body runs per activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatCount {
    Count(u32),
    Indefinite,
}

impl Default for RepeatCount {
    fn default() -> Self {
        RepeatCount::Count(1)
    }
}

impl RepeatCount {
    /// Parse `"3"`, `"2.0"` or `"indefinite"`
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw == "indefinite" {
            return Ok(RepeatCount::Indefinite);
        }
        if let Ok(n) = raw.parse::<u32>() {
            return Ok(RepeatCount::Count(n));
        }
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() && n >= 0.0 => Ok(RepeatCount::Count(n.floor() as u32)),
            _ => Err(Error::InvalidTime(format!("invalid repeatCount '{}'", raw))),
        }
    }
}

impl<'de> Deserialize<'de> for RepeatCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(RepeatCount::Count(n)),
            Raw::Text(text) => RepeatCount::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

impl Serialize for RepeatCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            RepeatCount::Count(n) => serializer.serialize_u32(*n),
            RepeatCount::Indefinite => serializer.serialize_str("indefinite"),
        }
    }
}

/// Timing attributes shared by every node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin: Option<TimeExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<TimeExpr>,
    #[serde(default)]
    pub repeat_count: RepeatCount,
}

impl Timing {
    pub fn is_default(&self) -> bool {
        self.begin.is_none() && self.end.is_none() && self.repeat_count == RepeatCount::Count(1)
    }
}

/// Conflict behavior applied to an occupant when another priority class arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    Stop,
    Pause,
    Defer,
    Never,
}

/// Media leaf type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
    Audio,
    Widget,
}

/// Media leaf: what to show, where, for how long
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(flatten)]
    pub timing: Timing,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub src: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dur: Option<String>,
}

/// Children of a `seq`, `par` or `excl` node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(flatten)]
    pub timing: Timing,
    #[serde(default)]
    pub children: Vec<Node>,
}

fn default_higher() -> Behavior {
    Behavior::Pause
}

fn default_peers() -> Behavior {
    Behavior::Stop
}

fn default_lower() -> Behavior {
    Behavior::Defer
}

/// Priority policy wrapper around a sub-tree
///
/// A larger `level` is a higher priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityClass {
    #[serde(flatten)]
    pub timing: Timing,
    #[serde(default)]
    pub level: u32,
    #[serde(default = "default_higher")]
    pub higher: Behavior,
    #[serde(default = "default_peers")]
    pub peers: Behavior,
    #[serde(default = "default_lower")]
    pub lower: Behavior,
    pub body: Box<Node>,
}

/// Scheduling tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Node {
    Seq(Group),
    Par(Group),
    Excl(Group),
    PriorityClass(PriorityClass),
    Media(MediaItem),
    #[serde(other)]
    Unsupported,
}

impl Node {
    pub fn timing(&self) -> Option<&Timing> {
        match self {
            Node::Seq(group) | Node::Par(group) | Node::Excl(group) => Some(&group.timing),
            Node::PriorityClass(class) => Some(&class.timing),
            Node::Media(item) => Some(&item.timing),
            Node::Unsupported => None,
        }
    }

    pub fn begin(&self) -> Option<&TimeExpr> {
        self.timing().and_then(|t| t.begin.as_ref())
    }

    pub fn end(&self) -> Option<&TimeExpr> {
        self.timing().and_then(|t| t.end.as_ref())
    }

    pub fn repeat_count(&self) -> RepeatCount {
        self.timing().map(|t| t.repeat_count).unwrap_or_default()
    }

    /// Begin is a trigger reference; the automatic playlist skips these
    pub fn is_trigger(&self) -> bool {
        self.begin().is_some_and(TimeExpr::is_trigger)
    }

    pub fn has_wallclock_begin(&self) -> bool {
        self.begin().is_some_and(TimeExpr::is_wallclock)
    }

    /// Video leaf without timing of its own; runs of these play gaplessly
    pub fn is_plain_video(&self) -> bool {
        matches!(self, Node::Media(item) if item.kind == MediaKind::Video && item.timing.is_default())
    }

    /// First media leaf in document order
    pub fn first_media(&self) -> Option<&MediaItem> {
        match self {
            Node::Media(item) => Some(item),
            Node::Seq(group) | Node::Par(group) | Node::Excl(group) => {
                group.children.iter().find_map(Node::first_media)
            }
            Node::PriorityClass(class) => class.body.first_media(),
            Node::Unsupported => None,
        }
    }

    /// Short name for logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Seq(_) => "seq",
            Node::Par(_) => "par",
            Node::Excl(_) => "excl",
            Node::PriorityClass(_) => "priorityClass",
            Node::Media(_) => "media",
            Node::Unsupported => "unsupported",
        }
    }
}

/// Whether a sequential array should sleep one default await before its last child
///
/// True when the array contains a wallclock-begun child and none of its
/// automatically scheduled children could start right now.
pub fn needs_default_await(children: &[Node], now: NaiveDateTime) -> bool {
    let has_wallclock = children.iter().any(Node::has_wallclock_begin);
    if !has_wallclock {
        return false;
    }
    !children
        .iter()
        .filter(|child| !child.is_trigger())
        .any(|child| resolve(child.begin(), child.end(), now).is_open(now))
}
