//! # SMIL Common Library
//!
//! Shared model for the SMIL playback scheduler:
//! - Node tree (`seq` / `par` / `excl` / `priorityClass` / media leaves)
//! - Time expressions and the time-window resolver
//! - Layout and region geometry
//! - Document model
//! - Player events and EventBus
//! - Configuration file discovery

pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod node;
pub mod region;
pub mod time;
pub mod timing;

pub use document::Document;
pub use error::{Error, Result};
pub use node::{Behavior, MediaItem, MediaKind, Node, RepeatCount, Timing};
pub use region::{Layout, RegionGeometry};
pub use timing::{TimeExpr, TimeWindow, WindowEnd};
