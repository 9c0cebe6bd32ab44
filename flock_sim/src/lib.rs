//! Grid-accelerated boid flocking in a bounded 3D arena.
//!
//! A [`Flock`] owns a fixed population of two species. Each [`Flock::tick`]
//! steers every enabled agent with separation, cohesion and alignment against
//! same-species neighbors found through a [`SpatialGrid`], pushes it away from
//! repulsors and arena walls, and hands the force to the agent's
//! [`RigidBody`]. Positions are integrated by whoever owns the bodies.

pub mod body;
pub mod boid;
pub mod config;
pub mod error;
pub mod flock;
pub mod spatial;

pub use glam;

pub use body::{BodyFactory, BodySettings, PointMass, PointMassFactory, RigidBody, SpawnRequest};
pub use boid::{Boid, Species, SpeciesVisual};
pub use config::{
    ArenaConfig, FlockConfig, ForceLaw, MAX_GRID_DIMENSION, Population, SpeedClamp, WallPolicy,
};
pub use error::{ConfigError, FlockError};
pub use flock::{AgentState, Flock, TickStats};
pub use spatial::SpatialGrid;
