//! The rigid-body collaborator. The flock decides forces and clamps speeds but
//! never integrates positions itself; whoever owns the physics world does,
//! through these traits.

use glam::{Quat, Vec3};

use crate::boid::{Species, SpeciesVisual};
use crate::error::FlockError;

/// Authoritative kinematic state of one agent.
pub trait RigidBody {
    fn position(&self) -> Vec3;
    fn linear_velocity(&self) -> Vec3;
    fn set_linear_velocity(&mut self, velocity: Vec3);
    fn rotation(&self) -> Quat;
    fn set_rotation(&mut self, rotation: Quat);
    /// Hands `force` to the velocity integrator. The velocity returned by
    /// [`linear_velocity`](Self::linear_velocity) must reflect it afterwards.
    fn apply_force(&mut self, force: Vec3, dt: f32);
}

/// Physical setup every agent body is created with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodySettings {
    pub mass: f32,
    pub use_gravity: bool,
    pub collision_layer: u32,
}

impl Default for BodySettings {
    fn default() -> Self {
        Self {
            mass: 1.0,
            use_gravity: false,
            collision_layer: 2,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SpawnRequest {
    pub index: usize,
    pub species: Species,
    pub position: Vec3,
    pub visual: SpeciesVisual,
    pub settings: BodySettings,
}

/// Creates bodies at flock initialisation. Stands in for the scene and
/// resource handles of the host engine.
pub trait BodyFactory {
    type Body: RigidBody;

    fn spawn(&mut self, request: &SpawnRequest) -> Result<Self::Body, FlockError>;
}

/// Gravity-free point mass with explicit Euler velocity integration.
#[derive(Clone, Debug, PartialEq)]
pub struct PointMass {
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quat,
    pub mass: f32,
}

impl PointMass {
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position,
            velocity,
            rotation: Quat::IDENTITY,
            mass: 1.0,
        }
    }

    /// Moves the body along its velocity. This is the physics-world step
    /// the flock leaves to its host.
    pub fn advance(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }
}

impl RigidBody for PointMass {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn linear_velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    fn apply_force(&mut self, force: Vec3, dt: f32) {
        if self.mass > 0.0 {
            self.velocity += force / self.mass * dt;
        }
    }
}

/// Spawns [`PointMass`] bodies at rest.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointMassFactory;

impl BodyFactory for PointMassFactory {
    type Body = PointMass;

    fn spawn(&mut self, request: &SpawnRequest) -> Result<PointMass, FlockError> {
        if request.settings.mass <= 0.0 {
            return Err(FlockError::Spawn {
                index: request.index,
                reason: format!("non-positive mass {}", request.settings.mass),
            });
        }
        let mut body = PointMass::new(request.position, Vec3::ZERO);
        body.mass = request.settings.mass;
        Ok(body)
    }
}
