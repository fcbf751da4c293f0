//! Flavor text for ship logs and mission events.
//!
//! Each generator picks one of [`TEMPLATE_COUNT`] templates uniformly. The
//! last template reads differently once the ship's condition has hit zero.
//! The `*_template` functions are the pure mapping from index to text.

use rand::Rng;

/// Number of templates per generator.
pub const TEMPLATE_COUNT: usize = 4;

/// A random ship log line for a cruising ship.
pub fn ship_log_message<R: Rng + ?Sized>(name: &str, condition: u32, rng: &mut R) -> String {
    ship_log_template(rng.random_range(0..TEMPLATE_COUNT), name, condition)
}

/// A random mission event line for a cruising ship.
pub fn mission_event_message<R: Rng + ?Sized>(name: &str, condition: u32, rng: &mut R) -> String {
    mission_event_template(rng.random_range(0..TEMPLATE_COUNT), name, condition)
}

/// Ship log template `index`. Out-of-range indices use the last template.
pub fn ship_log_template(index: usize, name: &str, condition: u32) -> String {
    match index {
        0 => format!(
            "Static noise is received: communication devices on {name} are experiencing technical difficulties."
        ),
        1 => format!(
            "The crew of {name} witnesses a breathtaking view of a collection of stars. Crew morale is improved."
        ),
        2 => format!(
            "An asteroid passes by {name}. There is plenty of distance between the two; nonetheless, the crew is startled."
        ),
        _ if condition == 0 => format!(
            "{name} is malfunctioning, yet it is on course... somehow. The crew is apathetic, as if the end has already come."
        ),
        _ => format!(
            "The hull of {name} is creaking. The crew is attempting to resolve the issue. Duct tape won't last long..."
        ),
    }
}

/// Mission event template `index`. Out-of-range indices use the last template.
pub fn mission_event_template(index: usize, name: &str, condition: u32) -> String {
    match index {
        0 => format!("Mission update: {name} missed a turn, causing a slight delay."),
        1 => format!(
            "Mission update: {name} found a shortcut through an asteroid field, prompting a foolhardy endeavor."
        ),
        2 => format!(
            "Mission update: The crew of {name} thought to have sighted another ship in the distance. Turns out it was a star."
        ),
        _ if condition == 0 => {
            format!("The mission is proceeding smoothly, despite {name} being effectively broken.")
        }
        _ => format!("The mission, undertaken by {name}, is proceeding smoothly."),
    }
}
