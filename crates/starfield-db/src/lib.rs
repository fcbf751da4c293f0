//! `PostgreSQL` persistence for the Starfield ship simulation.
//!
//! The simulation core only knows the [`ShipStore`] contract. This crate
//! provides [`PgShipStore`], which implements it on two tables:
//!
//! ```text
//! ships         one row per live ship (identity columns + JSONB state)
//! space_points  the shared field, one row per point
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- Connection pool, migrations, and reset
//! - [`ship_store`] -- Ship rows and batch upserts
//! - [`space_store`] -- Space point rows
//! - [`store`] -- The [`ShipStore`] implementation
//! - [`error`] -- Shared error types
//!
//! [`ShipStore`]: starfield_core::persistence::ShipStore

pub mod error;
pub mod postgres;
pub mod ship_store;
pub mod space_store;
pub mod store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use ship_store::{ShipRow, ShipTable};
pub use space_store::{SpacePointRow, SpacePointTable};
pub use store::PgShipStore;
