//! Readiness state shared between the lifecycle controller and `/ready`.
//!
//! # States
//! - Accepting: `/ready` returns 200
//! - Draining: `/ready` returns 503 so load balancers stop routing
//!
//! The transition is one-way; a draining process never becomes ready again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether the service is accepting new traffic.
#[derive(Debug, Clone)]
pub struct Readiness {
    accepting: Arc<AtomicBool>,
}

impl Readiness {
    /// Create a readiness state that accepts traffic.
    pub fn new() -> Self {
        Self {
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Mark the service as draining.
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}
