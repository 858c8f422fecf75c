//! # SMIL Player Library (smil-player)
//!
//! Scheduling and priority-arbitration engine for declarative multimedia
//! timing documents.
//!
//! **Purpose:** Walk a tree of `seq` / `par` / `excl` / `priorityClass` nodes
//! wrapping video, image, audio and widget leaves, honor wallclock windows and
//! repeat counts, arbitrate screen regions between priority classes and
//! externally started triggers, and drive a [`playback::Renderer`] forever.
//!
//! **Architecture:** Tokio tasks. The playlist runs in the cycle task with
//! `par` branches joined cooperatively; triggers and the document staleness
//! watch run as separate tasks. Region ownership is decided by one
//! mutex-guarded [`playback::RegionArbitrationTable`].

pub mod config;
pub mod document;
pub mod error;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use playback::Player;
pub use state::SharedState;
