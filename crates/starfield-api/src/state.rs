//! Shared application state for the HTTP API.

use std::sync::atomic::{AtomicU64, Ordering};

use starfield_core::persistence::Persistence;
use starfield_core::simulation::SharedSimulation;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor. Handlers lock the same [`SharedSimulation`] the tick loop
/// advances.
#[derive(Debug)]
pub struct AppState {
    /// The live simulation.
    pub simulation: SharedSimulation,
    /// Best-effort persistence for ships created or deleted over HTTP.
    pub persistence: Persistence,
    request_count: AtomicU64,
}

impl AppState {
    /// Create application state around a running simulation.
    pub const fn new(simulation: SharedSimulation, persistence: Persistence) -> Self {
        Self {
            simulation,
            persistence,
            request_count: AtomicU64::new(0),
        }
    }

    /// Count one request. Returns the new total.
    pub fn record_request(&self) -> u64 {
        self.request_count
            .fetch_add(1, Ordering::Relaxed)
            .saturating_add(1)
    }

    /// Requests served since startup.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }
}
