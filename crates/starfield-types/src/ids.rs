//! Ship and mission identifiers.
//!
//! A [`ShipId`] and a [`MissionId`] are both UUIDs, but kept as separate
//! types so an API path or store call cannot take one for the other.
//!
//! Ids are UUID v7, whose leading bits are the creation time. The registry
//! keys ships by [`ShipId`] in a sorted map, so sorting by id is sorting by
//! launch time: every tick steps ships oldest first, `GET /api/ships` lists them
//! in launch order, and a population resumed after a restart keeps the order
//! it had before.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Declares a `Copy` id newtype over a v7 [`Uuid`].
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// A fresh id stamped with the current time.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// The raw UUID, as bound to the store.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a ship in the registry.
    ShipId
}

define_id! {
    /// Unique identifier for the mission a ship is flying.
    MissionId
}
