//! Graceful shutdown coordination.
//!
//! A [`ShutdownCoordinator`] is shared between the CLI's signal handler and
//! the pipeline. Once shutdown is requested no further date is dispatched;
//! dates already in flight run to completion unless the pipeline is also
//! told to abandon them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared handle to a shutdown coordinator.
pub type SharedShutdown = Arc<ShutdownCoordinator>;

/// Coordinates graceful shutdown across async tasks.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    is_shutdown: AtomicBool,
}

impl ShutdownCoordinator {
    /// Creates a new coordinator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            is_shutdown: AtomicBool::new(false),
        }
    }

    /// Creates a new shared coordinator wrapped in [`Arc`].
    #[must_use]
    pub fn shared() -> SharedShutdown {
        Arc::new(Self::new())
    }

    /// Requests shutdown.
    pub fn request_shutdown(&self) {
        self.is_shutdown.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.is_shutdown.load(Ordering::SeqCst)
    }
}
