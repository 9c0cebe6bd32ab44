use flock_sim::glam::Vec3 as SimVec3;
use flock_sim::{Flock, PointMass};
use macroquad::prelude::*;

const MOVE_SPEED: f32 = 30.0;
const TURN_SPEED: f32 = 2.0;
/// Length of the catch probe cast from the player along its heading.
const PROBE_LENGTH: f32 = 100.0;
/// Agents whose centre passes within this distance of the probe are hit.
const PROBE_WIDTH: f32 = 1.0;
/// Players start within this distance of the arena centre on X and Z.
const START_SPREAD: f32 = 20.0;
const START_HEIGHT: f32 = 15.0;

/// Keyboard-driven avatar. Its position is the flock's only repulsor.
pub struct Player {
    pub position: Vec3,
    pub yaw: f32,
    pub caught: usize,
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl Player {
    pub fn new() -> Self {
        Self {
            position: vec3(
                rand::gen_range(-START_SPREAD, START_SPREAD),
                START_HEIGHT,
                rand::gen_range(-START_SPREAD, START_SPREAD),
            ),
            yaw: 0.0,
            caught: 0,
        }
    }

    pub fn forward(&self) -> Vec3 {
        vec3(self.yaw.sin(), 0.0, self.yaw.cos())
    }

    /// WASD moves and turns, Q/E change height.
    pub fn apply_controls(&mut self, dt: f32, wall: f32) {
        if is_key_down(KeyCode::A) {
            self.yaw += TURN_SPEED * dt;
        }
        if is_key_down(KeyCode::D) {
            self.yaw -= TURN_SPEED * dt;
        }

        let mut step = Vec3::ZERO;
        if is_key_down(KeyCode::W) {
            step += self.forward();
        }
        if is_key_down(KeyCode::S) {
            step -= self.forward();
        }
        if is_key_down(KeyCode::E) {
            step += Vec3::Y;
        }
        if is_key_down(KeyCode::Q) {
            step -= Vec3::Y;
        }

        self.position += step * MOVE_SPEED * dt;
        self.position.x = self.position.x.clamp(-wall, wall);
        self.position.z = self.position.z.clamp(-wall, wall);
        self.position.y = self.position.y.clamp(1.0, 80.0);
    }

    pub fn repulsor(&self) -> SimVec3 {
        SimVec3::new(self.position.x, self.position.y, self.position.z)
    }

    /// Casts the probe and disables the closest enabled agent it hits.
    pub fn try_catch(&mut self, flock: &mut Flock<PointMass>) -> Option<usize> {
        let origin = self.repulsor();
        let f = self.forward();
        let dir = SimVec3::new(f.x, f.y, f.z);

        let hit = flock
            .agents()
            .iter()
            .enumerate()
            .filter(|(_, agent)| agent.is_enabled())
            .filter_map(|(i, agent)| {
                let offset = agent.position() - origin;
                let along = offset.dot(dir);
                if !(0.0..=PROBE_LENGTH).contains(&along) {
                    return None;
                }
                let miss = (offset - dir * along).length();
                (miss < PROBE_WIDTH).then_some((i, along))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)?;

        match flock.disable(hit) {
            Ok(true) => {
                self.caught += 1;
                Some(hit)
            }
            _ => None,
        }
    }

    /// Third-person camera behind and slightly above the player.
    pub fn camera(&self) -> Camera3D {
        let target = self.position;
        Camera3D {
            position: target - self.forward() * 25.0 + Vec3::Y * 2.0,
            target,
            up: Vec3::Y,
            ..Default::default()
        }
    }

    pub fn draw(&self) {
        draw_sphere(self.position, 1.5, None, Color::from_rgba(160, 160, 150, 255));
        draw_line_3d(
            self.position,
            self.position + self.forward() * 6.0,
            Color::from_rgba(255, 220, 120, 255),
        );
    }
}
