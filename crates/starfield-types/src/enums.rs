//! Enumeration types for the Starfield simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle status of a ship.
///
/// A ship only ever moves forward through these states:
/// `Active -> InboundSpace -> Inbound`. The variant order matches that
/// progression, so `a <= b` means "`b` is not earlier than `a`".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum ShipStatus {
    /// Travelling between sub-destinations and exploring.
    #[default]
    Active,
    /// Every sub-destination visited; heading back to the origin.
    InboundSpace,
    /// Left the mission volume. Terminal.
    Inbound,
}

impl ShipStatus {
    /// Whether this is the terminal state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Inbound)
    }

    /// The status string stored in the `ships.status` column.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::InboundSpace => "INBOUND_SPACE",
            Self::Inbound => "INBOUND",
        }
    }

    /// Parse a stored status string. Inverse of [`ShipStatus::as_str`].
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ACTIVE" => Some(Self::Active),
            "INBOUND_SPACE" => Some(Self::InboundSpace),
            "INBOUND" => Some(Self::Inbound),
            _ => None,
        }
    }
}

impl core::fmt::Display for ShipStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_lifecycle() {
        assert!(ShipStatus::Active < ShipStatus::InboundSpace);
        assert!(ShipStatus::InboundSpace < ShipStatus::Inbound);
    }

    #[test]
    fn serde_uses_screaming_case() {
        let json = serde_json::to_string(&ShipStatus::InboundSpace).unwrap_or_default();
        assert_eq!(json, "\"INBOUND_SPACE\"");
        let back: ShipStatus = serde_json::from_str("\"INBOUND\"").unwrap_or_default();
        assert_eq!(back, ShipStatus::Inbound);
    }

    #[test]
    fn parse_inverts_as_str() {
        for status in [ShipStatus::Active, ShipStatus::InboundSpace, ShipStatus::Inbound] {
            assert_eq!(ShipStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ShipStatus::parse("active"), None);
    }

    #[test]
    fn only_inbound_is_terminal() {
        assert!(!ShipStatus::Active.is_terminal());
        assert!(!ShipStatus::InboundSpace.is_terminal());
        assert!(ShipStatus::Inbound.is_terminal());
    }
}
