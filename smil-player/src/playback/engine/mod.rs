//! Scheduling engine
//!
//! **Module Structure:**
//! - `core.rs`: `Player` facade, document cycles, staleness watch, teardown
//! - `interpreter.rs`: recursive node walk, windows, repeats, sequencing, priority classes
//! - `media.rs`: video runs with look-ahead, timed images/widgets, audio
//! - `triggers.rs`: trigger sub-tree lifecycle and region assignment

mod core;
mod interpreter;
mod media;
mod triggers;

pub use core::Player;
pub use interpreter::NodeOutcome;
pub use triggers::TRIGGER_LEVEL;
