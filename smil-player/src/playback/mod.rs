//! Scheduling core: arbitration, cancellation, clocks, display handover, rendering

pub mod arbitration;
pub mod cancel;
pub mod clock;
pub mod display;
pub mod engine;
pub mod renderer;

pub use arbitration::{Decision, OccupancyRecord, OccupancySignals, RegionArbitrationTable};
pub use cancel::CancellationContext;
pub use clock::{Clock, SystemClock, TokioClock};
pub use engine::{NodeOutcome, Player};
pub use renderer::{Renderer, TracingRenderer};
