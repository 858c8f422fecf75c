//! Cooperative cancellation for one document cycle
//!
//! A fresh [`CancellationContext`] is built for every document cycle and
//! threaded through every recursive interpreter call. Two flags live in it:
//!
//! - `stop_all_loops`: every loop, wait and countdown of the cycle unwinds
//! - `stop_file_watch`: the document staleness watch stops polling
//!
//! Waits go through [`CancellationContext::sleep`], which wakes immediately when
//! a flag flips instead of running out the full duration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Default)]
struct Flags {
    stop_all_loops: AtomicBool,
    stop_file_watch: AtomicBool,
    changed: Notify,
}

/// Shared cancellation flags; cloning shares the same cycle
#[derive(Clone, Default)]
pub struct CancellationContext {
    flags: Arc<Flags>,
}

impl CancellationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear `stop_all_loops`
    pub fn disable_loop(&self, disabled: bool) {
        self.flags.stop_all_loops.store(disabled, Ordering::SeqCst);
        self.flags.changed.notify_waiters();
    }

    /// Enable or disable the document staleness watch
    pub fn set_file_watch(&self, enabled: bool) {
        self.flags.stop_file_watch.store(!enabled, Ordering::SeqCst);
        self.flags.changed.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.flags.stop_all_loops.load(Ordering::SeqCst)
    }

    pub fn file_watch_enabled(&self) -> bool {
        !self.flags.stop_file_watch.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`; `false` if the cycle was stopped first
    pub async fn sleep(&self, duration: Duration) -> bool {
        self.sleep_unless(duration, |ctx| ctx.is_stopped()).await
    }

    /// Sleep used by the staleness watch; `false` once the watch is disabled
    pub async fn sleep_watch(&self, duration: Duration) -> bool {
        self.sleep_unless(duration, |ctx| !ctx.file_watch_enabled()).await
    }

    async fn sleep_unless(&self, duration: Duration, cancelled: impl Fn(&Self) -> bool) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            let changed = self.flags.changed.notified();
            tokio::pin!(changed);
            // register before checking so a flip between check and select is not lost
            changed.as_mut().enable();

            if cancelled(self) {
                return false;
            }

            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return !cancelled(self),
                _ = &mut changed => {}
            }
        }
    }
}

impl std::fmt::Debug for CancellationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationContext")
            .field("stop_all_loops", &self.is_stopped())
            .field("file_watch", &self.file_watch_enabled())
            .finish()
    }
}
