//! Tuning for a flock: population split, arena geometry, force law and speed
//! clamp. Every struct deserializes with defaults, so a JSON file only needs
//! the keys it overrides.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest number of grid cells allowed along one side of the arena.
pub const MAX_GRID_DIMENSION: usize = 1024;

/// How hard the arena walls push back on an agent that has crossed them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallPolicy {
    /// Push proportional to the overshoot.
    #[default]
    Linear,
    /// Push proportional to the squared overshoot.
    Quadratic,
}

impl WallPolicy {
    pub fn push(self, overshoot: f32) -> f32 {
        match self {
            WallPolicy::Linear => overshoot,
            WallPolicy::Quadratic => overshoot * overshoot,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Population {
    pub small: usize,
    pub big: usize,
}

impl Default for Population {
    fn default() -> Self {
        Self {
            small: 375,
            big: 375,
        }
    }
}

impl Population {
    pub fn total(&self) -> usize {
        self.small + self.big
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Containment walls on X and Z sit at `±wall_half_extent`.
    pub wall_half_extent: f32,
    /// Lower bound of the vertical band agents are kept in.
    pub floor: f32,
    /// Upper bound of the vertical band agents are kept in.
    pub ceiling: f32,
    /// The grid covers `[-grid_half_extent, grid_half_extent]` on X and Z.
    pub grid_half_extent: f32,
    pub cell_size: f32,
    pub spawn_min: Vec3,
    pub spawn_max: Vec3,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            wall_half_extent: 90.0,
            floor: 10.0,
            ceiling: 40.0,
            grid_half_extent: 100.0,
            cell_size: 10.0,
            spawn_min: Vec3::new(-90.0, 15.0, -90.0),
            spawn_max: Vec3::new(90.0, 85.0, 90.0),
        }
    }
}

impl ArenaConfig {
    /// Number of grid cells per side, capped at [`MAX_GRID_DIMENSION`].
    pub fn grid_dimension(&self) -> usize {
        (self.cells_per_side().round() as usize).clamp(1, MAX_GRID_DIMENSION)
    }

    fn cells_per_side(&self) -> f32 {
        2.0 * self.grid_half_extent / self.cell_size
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceLaw {
    pub separation_radius: f32,
    pub separation_factor: f32,
    pub cohesion_radius: f32,
    pub cohesion_factor: f32,
    pub alignment_radius: f32,
    pub alignment_factor: f32,
    /// Desired speed of the cohesion "seek" steering.
    pub seek_speed: f32,
    /// Weight of a repulsor's push relative to a peer's.
    pub repulsor_weight: f32,
    pub wall_policy: WallPolicy,
}

impl Default for ForceLaw {
    fn default() -> Self {
        Self {
            separation_radius: 30.0,
            separation_factor: 4.0,
            cohesion_radius: 30.0,
            cohesion_factor: 5.0,
            alignment_radius: 5.0,
            alignment_factor: 2.0,
            seek_speed: 5.0,
            repulsor_weight: 10.0,
            wall_policy: WallPolicy::Linear,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedClamp {
    pub min: f32,
    pub max: f32,
}

impl Default for SpeedClamp {
    fn default() -> Self {
        Self {
            min: 10.0,
            max: 150.0,
        }
    }
}

impl SpeedClamp {
    pub fn contains(&self, speed: f32) -> bool {
        speed >= self.min && speed <= self.max
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    pub population: Population,
    pub arena: ArenaConfig,
    pub force_law: ForceLaw,
    pub speed: SpeedClamp,
}

impl FlockConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: FlockConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects configurations the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let law = &self.force_law;
        positive("force_law.separation_radius", law.separation_radius)?;
        positive("force_law.cohesion_radius", law.cohesion_radius)?;
        positive("force_law.alignment_radius", law.alignment_radius)?;
        finite("force_law.separation_factor", law.separation_factor)?;
        finite("force_law.cohesion_factor", law.cohesion_factor)?;
        finite("force_law.alignment_factor", law.alignment_factor)?;
        non_negative("force_law.seek_speed", law.seek_speed)?;
        non_negative("force_law.repulsor_weight", law.repulsor_weight)?;

        non_negative("speed.min", self.speed.min)?;
        positive("speed.max", self.speed.max)?;
        if self.speed.min > self.speed.max {
            return Err(ConfigError::invalid(
                "speed",
                format!("min {} exceeds max {}", self.speed.min, self.speed.max),
            ));
        }

        let arena = &self.arena;
        positive("arena.wall_half_extent", arena.wall_half_extent)?;
        positive("arena.grid_half_extent", arena.grid_half_extent)?;
        positive("arena.cell_size", arena.cell_size)?;
        let cells = arena.cells_per_side();
        if !cells.is_finite() || cells.round() > MAX_GRID_DIMENSION as f32 {
            return Err(ConfigError::invalid(
                "arena.cell_size",
                format!("{cells} cells per side exceeds {MAX_GRID_DIMENSION}"),
            ));
        }
        finite("arena.floor", arena.floor)?;
        finite("arena.ceiling", arena.ceiling)?;
        if arena.floor >= arena.ceiling {
            return Err(ConfigError::invalid(
                "arena",
                format!("floor {} must be below ceiling {}", arena.floor, arena.ceiling),
            ));
        }
        if !arena.spawn_min.is_finite() || !arena.spawn_max.is_finite() {
            return Err(ConfigError::invalid("arena.spawn", "bounds must be finite"));
        }
        if arena.spawn_min.cmpgt(arena.spawn_max).any() {
            return Err(ConfigError::invalid(
                "arena.spawn",
                format!("min {} exceeds max {}", arena.spawn_min, arena.spawn_max),
            ));
        }
        Ok(())
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} is not finite")))
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} must be positive")))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} must not be negative")))
    }
}
