//! Entity simulation engine for Starfield.
//!
//! A population of ships flies toward randomly sampled waypoints inside
//! their mission spheres, discovers points of interest on the way, wears
//! down, and eventually returns to the origin and leaves.
//!
//! # Modules
//!
//! - [`space`] -- The shared field of named space points and proximity
//!   queries over it.
//! - [`mission`] -- Mission descriptors and their append-only event log.
//! - [`chatter`] -- Flavor text for ship logs and mission events.
//! - [`ship`] -- The per-ship state machine and movement.
//! - [`registry`] -- The live population and the advance/prune tick.
//! - [`simulation`] -- Registry, field, and random source behind one lock.
//! - [`persistence`] -- [`ShipStore`] contract and the best-effort
//!   [`Persistence`] gate.
//! - [`runner`] -- Fixed-interval tick loop and persistence sync.
//! - [`config`] -- Configuration loading from `starfield-config.yaml`.
//!
//! [`ShipStore`]: persistence::ShipStore
//! [`Persistence`]: persistence::Persistence

pub mod chatter;
pub mod config;
pub mod mission;
pub mod persistence;
pub mod registry;
pub mod runner;
pub mod ship;
pub mod simulation;
pub mod space;
