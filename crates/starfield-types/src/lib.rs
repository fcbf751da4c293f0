//! Shared type definitions for the Starfield ship simulation.
//!
//! This crate holds the plain data types that flow between the simulation
//! engine, the persistence adapter, and the HTTP adapter. Types defined here
//! are exported to `TypeScript` via `ts-rs` for the browser dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for ships and missions
//! - [`enums`] -- Ship lifecycle status
//! - [`structs`] -- Coordinates, space points, and log entries

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::ShipStatus;
pub use ids::{MissionId, ShipId};
pub use structs::{Coordinates, LogEntry, SpacePoint};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the dashboard.

    #[test]
    fn export_bindings() {
        // ts-rs writes the bindings into `bindings/` relative to the crate
        // root when `export_all` is called.
        use ts_rs::TS;

        let _ = crate::ids::ShipId::export_all();
        let _ = crate::ids::MissionId::export_all();
        let _ = crate::enums::ShipStatus::export_all();
        let _ = crate::structs::Coordinates::export_all();
        let _ = crate::structs::SpacePoint::export_all();
        let _ = crate::structs::LogEntry::export_all();
    }
}
