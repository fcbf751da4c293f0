//! Missions: what a ship is sent to do and the record of what happened.

use serde::{Deserialize, Serialize};
use starfield_types::{Coordinates, LogEntry, MissionId};
use tracing::debug;

/// The objective a ship is launched with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionBrief {
    /// Mission identifier. Generated when omitted.
    #[serde(default)]
    pub id: MissionId,
    /// Short title.
    pub title: String,
    /// Objective tag, e.g. `"Exploration"`.
    pub objective: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Center of the mission sphere.
    pub center: Coordinates,
    /// Radius of the mission sphere.
    pub radius: f64,
}

/// A mission in progress, with its append-only event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    /// Mission identifier.
    pub id: MissionId,
    /// Short title.
    pub title: String,
    /// Objective tag.
    pub objective: String,
    /// Free-text description.
    pub description: String,
    /// Center of the mission sphere.
    pub center: Coordinates,
    /// Radius of the mission sphere.
    pub radius: f64,
    events: Vec<LogEntry>,
}

impl Mission {
    /// Start a mission with an empty event log.
    pub fn new(brief: MissionBrief) -> Self {
        Self::resume(brief, Vec::new())
    }

    /// Continue a mission whose earlier events are already known.
    pub fn resume(brief: MissionBrief, events: Vec<LogEntry>) -> Self {
        Self {
            id: brief.id,
            title: brief.title,
            objective: brief.objective,
            description: brief.description,
            center: brief.center,
            radius: brief.radius,
            events,
        }
    }

    /// Append an event stamped with the current time.
    pub fn add_event(&mut self, description: impl Into<String>) {
        let entry = LogEntry::now(description);
        debug!(mission = %self.id, event = entry.description, "Mission event");
        self.events.push(entry);
    }

    /// Events in the order they were added.
    pub fn events(&self) -> &[LogEntry] {
        &self.events
    }

    /// The descriptor this mission was started from.
    pub fn brief(&self) -> MissionBrief {
        MissionBrief {
            id: self.id,
            title: self.title.clone(),
            objective: self.objective.clone(),
            description: self.description.clone(),
            center: self.center,
            radius: self.radius,
        }
    }
}
