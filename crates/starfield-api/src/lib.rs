//! HTTP API over the Starfield ship registry.
//!
//! A thin Axum layer: every endpoint locks the shared simulation, reads or
//! changes the registry, and for writes hands the change to the persistence
//! gate in the background.
//!
//! # Modules
//!
//! - [`handlers`] -- REST endpoint handlers
//! - [`router`] -- Route table and middleware
//! - [`server`] -- TCP bind and graceful shutdown
//! - [`state`] -- Shared application state
//! - [`error`] -- Error types mapped to JSON responses

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
