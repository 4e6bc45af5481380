//! # RTS Core
//!
//! Authoritative, deterministic simulation for a real-time strategy game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! The server drives a [`simulation::Simulation`] one tick at a time and
//! broadcasts the [`delta::Delta`]s each tick produces; clients rebuild the
//! same tables from that stream.
//!
//! ## Crate Structure
//!
//! - [`entity`] / [`types`] - Entity kinds, capabilities and type descriptors
//! - [`commands`] - Move / attack / build / gather state machine
//! - [`world`] / [`spatial`] - Entity arena and tile occupancy index
//! - [`simulation`] - Request validation and the fixed tick order
//! - [`delta`] - Replicated change records
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod commands;
pub mod config;
pub mod delta;
pub mod entity;
pub mod error;
pub mod math;
pub mod production;
pub mod request;
pub mod simulation;
pub mod spatial;
pub mod types;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commands::{Command, CommandId, TickOutcome};
    pub use crate::config::SimConfig;
    pub use crate::delta::{Delta, EntityRef, Property, PropertyChange};
    pub use crate::entity::{
        Capability, Construction, Entity, EntityCategory, EntityId, EntityKind, PlayerId,
        NEUTRAL_PLAYER,
    };
    pub use crate::error::{GameError, Result};
    pub use crate::math::{Fixed, RectFixed, Vec2Fixed};
    pub use crate::request::Request;
    pub use crate::simulation::{Simulation, TickReport};
    pub use crate::spatial::{Terrain, TerrainGrid};
    pub use crate::types::{BuildingType, ResourceType, TechnologyType, TypeRegistry, UnitType};
    pub use crate::world::{Placement, World};
}
