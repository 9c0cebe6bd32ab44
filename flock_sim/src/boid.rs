use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::body::RigidBody;
use crate::config::{ArenaConfig, FlockConfig, SpeedClamp, WallPolicy};

/// Lengths below this are treated as zero before dividing by them.
const EPSILON: f32 = 1.0e-6;

/// Agents only flock with their own kind. Repulsors push every kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Small,
    Big,
}

/// Presentation parameters the renderer needs for one species.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeciesVisual {
    pub node_name: &'static str,
    pub model: &'static str,
    pub material: &'static str,
    pub scale: f32,
}

impl Species {
    pub fn visual(self) -> SpeciesVisual {
        match self {
            Species::Small => SpeciesVisual {
                node_name: "BoidSmall",
                model: "Models/Box.mdl",
                material: "Materials/Red-Scales.xml",
                scale: 1.0,
            },
            Species::Big => SpeciesVisual {
                node_name: "BoidBig",
                model: "Models/Cone.mdl",
                material: "Materials/Red-Scales.xml",
                scale: 1.0,
            },
        }
    }
}

pub struct Boid<B> {
    body: B,
    species: Species,
    force: Vec3,
    cell: (usize, usize),
    enabled: bool,
}

impl<B: RigidBody> Boid<B> {
    pub fn new(species: Species, body: B) -> Self {
        Self {
            body,
            species,
            force: Vec3::ZERO,
            cell: (0, 0),
            enabled: true,
        }
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn position(&self) -> Vec3 {
        self.body.position()
    }

    pub fn velocity(&self) -> Vec3 {
        self.body.linear_velocity()
    }

    pub fn rotation(&self) -> Quat {
        self.body.rotation()
    }

    /// Force decided on the last tick this agent was processed.
    pub fn force(&self) -> Vec3 {
        self.force
    }

    /// Grid cell assigned at the last grid rebuild.
    pub fn cell(&self) -> (usize, usize) {
        self.cell
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    pub(crate) fn set_cell(&mut self, cell: (usize, usize)) {
        self.cell = cell;
    }

    pub(crate) fn set_force(&mut self, force: Vec3) {
        self.force = force;
    }

    /// Returns `true` if the agent was enabled before the call.
    pub(crate) fn disable(&mut self) -> bool {
        std::mem::replace(&mut self.enabled, false)
    }

    /// Steering force for the agent at `index` of `agents`.
    ///
    /// `neighbors` are candidate indices into `agents`; self, disabled peers
    /// and peers of another species are ignored. Repulsors within the
    /// separation radius push regardless of species. The wall term is folded
    /// into separation, so it is scaled by the separation factor too.
    pub fn steering_force(
        &self,
        index: usize,
        agents: &[Boid<B>],
        repulsors: &[Vec3],
        neighbors: &[usize],
        config: &FlockConfig,
    ) -> Vec3 {
        if !self.enabled {
            return Vec3::ZERO;
        }

        let law = &config.force_law;
        let pos = self.body.position();
        let vel = self.body.linear_velocity();

        let mut separation = Vec3::ZERO;
        let mut cohesion = Vec3::ZERO;
        let mut alignment = Vec3::ZERO;

        // Repulsors push every species
        for &repulsor in repulsors {
            let delta = pos - repulsor;
            let dist = delta.length();
            if dist < law.separation_radius && dist > EPSILON {
                separation += law.repulsor_weight * (delta / dist);
            }
        }

        let mut position_sum = Vec3::ZERO;
        let mut position_count = 0;
        let mut velocity_sum = Vec3::ZERO;
        let mut velocity_count = 0;

        // Accumulate same-species peers
        for &j in neighbors {
            if j == index {
                continue;
            }
            let Some(other) = agents.get(j) else {
                continue;
            };
            if !other.enabled || other.species != self.species {
                continue;
            }

            let other_pos = other.body.position();
            let delta = pos - other_pos;
            let dist = delta.length();

            if dist < law.cohesion_radius {
                position_sum += other_pos;
                position_count += 1;
            }
            if dist < law.alignment_radius {
                velocity_sum += other.body.linear_velocity();
                velocity_count += 1;
            }
            if dist < law.separation_radius && dist > EPSILON {
                separation += delta / dist;
            }
        }

        // Cohesion: seek the local centre of mass
        if position_count > 0 {
            let centre = position_sum / position_count as f32;
            if let Some(toward) = (centre - pos).try_normalize() {
                cohesion = toward * law.seek_speed - vel;
            }
        }

        // Alignment: match the average heading
        if velocity_count > 0 {
            alignment = velocity_sum / velocity_count as f32 - vel;
        }

        // Walls
        separation += containment(pos, &config.arena, law.wall_policy);

        separation * law.separation_factor
            + cohesion * law.cohesion_factor
            + alignment * law.alignment_factor
    }

    /// Hands the pending force to the body, clamps the resulting speed into
    /// the configured band and faces the agent along its velocity.
    ///
    /// Returns `true` when the speed had to be clamped.
    pub fn update(&mut self, dt: f32, speed: &SpeedClamp) -> bool {
        self.body.apply_force(self.force, dt);

        // Only write back when the band was left
        let velocity = self.body.linear_velocity();
        let (velocity, clamped) = clamp_speed(velocity, speed);
        if clamped {
            self.body.set_linear_velocity(velocity);
            trace!(speed = velocity.length(), "speed clamped");
        }

        self.body.set_rotation(orientation(velocity));
        clamped
    }
}

/// Corrective push back into the arena, zero while inside it.
pub fn containment(pos: Vec3, arena: &ArenaConfig, policy: WallPolicy) -> Vec3 {
    let wall = arena.wall_half_extent;
    let mut push = Vec3::ZERO;

    if pos.x > wall {
        push.x -= policy.push(pos.x - wall);
    } else if pos.x < -wall {
        push.x += policy.push(-wall - pos.x);
    }

    if pos.y > arena.ceiling {
        push.y -= policy.push(pos.y - arena.ceiling);
    } else if pos.y < arena.floor {
        push.y += policy.push(arena.floor - pos.y);
    }

    if pos.z > wall {
        push.z -= policy.push(pos.z - wall);
    } else if pos.z < -wall {
        push.z += policy.push(-wall - pos.z);
    }

    push
}

/// Clamps the magnitude of `velocity` into `speed`.
///
/// A zero or non-finite velocity has no direction to keep; it is restarted
/// along +X at the minimum speed.
pub fn clamp_speed(velocity: Vec3, speed: &SpeedClamp) -> (Vec3, bool) {
    let magnitude = if velocity.is_finite() {
        velocity.length()
    } else {
        f32::NAN
    };

    if magnitude.is_nan() || magnitude <= EPSILON {
        if speed.min <= 0.0 && velocity.is_finite() {
            return (velocity, false);
        }
        return (Vec3::X * speed.min, true);
    }

    if speed.contains(magnitude) {
        return (velocity, false);
    }

    let target = magnitude.clamp(speed.min, speed.max);
    (velocity * (target / magnitude), true)
}

/// Banks the agent toward its direction of travel: a rotation about
/// `up × direction` by `acos(axis · direction)`. Vertical or zero velocity
/// gives the identity.
pub fn orientation(velocity: Vec3) -> Quat {
    let Some(direction) = velocity.try_normalize() else {
        return Quat::IDENTITY;
    };
    let Some(axis) = Vec3::Y.cross(direction).try_normalize() else {
        return Quat::IDENTITY;
    };
    let angle = axis.dot(direction).clamp(-1.0, 1.0).acos();
    Quat::from_axis_angle(axis, angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::PointMass;

    fn agent(species: Species, pos: Vec3, vel: Vec3) -> Boid<PointMass> {
        Boid::new(species, PointMass::new(pos, vel))
    }

    fn centre() -> Vec3 {
        Vec3::new(0.0, 25.0, 0.0)
    }

    fn force_on(index: usize, agents: &[Boid<PointMass>], repulsors: &[Vec3]) -> Vec3 {
        let all: Vec<usize> = (0..agents.len()).collect();
        agents[index].steering_force(index, agents, repulsors, &all, &FlockConfig::default())
    }

    #[test]
    fn isolated_agent_feels_no_force() {
        let agents = vec![agent(Species::Small, centre(), Vec3::new(20.0, 0.0, 0.0))];
        assert_eq!(force_on(0, &agents, &[]), Vec3::ZERO);
    }

    #[test]
    fn other_species_contributes_nothing() {
        let agents = vec![
            agent(Species::Small, centre(), Vec3::new(20.0, 0.0, 0.0)),
            agent(Species::Big, centre() + Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 30.0)),
        ];
        assert_eq!(force_on(0, &agents, &[]), Vec3::ZERO);
        assert_eq!(force_on(1, &agents, &[]), Vec3::ZERO);
    }

    #[test]
    fn repulsors_push_every_species() {
        let repulsor = centre() + Vec3::new(5.0, 0.0, 0.0);
        for species in [Species::Small, Species::Big] {
            let agents = vec![agent(species, centre(), Vec3::ZERO)];
            let force = force_on(0, &agents, &[repulsor]);
            // weight 10 times separation factor 4, pointing away along -X
            assert!((force - Vec3::new(-40.0, 0.0, 0.0)).length() < 1e-4);
        }
    }

    #[test]
    fn repulsor_out_of_range_is_ignored() {
        let agents = vec![agent(Species::Small, centre(), Vec3::ZERO)];
        let far = centre() + Vec3::new(0.0, 0.0, 31.0);
        assert_eq!(force_on(0, &agents, &[far]), Vec3::ZERO);
    }

    #[test]
    fn same_species_peer_engages_every_rule() {
        let peer_vel = Vec3::new(0.0, 0.0, 12.0);
        let agents = vec![
            agent(Species::Big, centre(), Vec3::ZERO),
            agent(Species::Big, centre() + Vec3::new(2.0, 0.0, 0.0), peer_vel),
        ];
        let law = FlockConfig::default().force_law;
        let separation = Vec3::new(-1.0, 0.0, 0.0) * law.separation_factor;
        let cohesion = Vec3::new(law.seek_speed, 0.0, 0.0) * law.cohesion_factor;
        let alignment = peer_vel * law.alignment_factor;
        let force = force_on(0, &agents, &[]);
        assert!((force - (separation + cohesion + alignment)).length() < 1e-4);
    }

    #[test]
    fn coincident_agents_do_not_produce_nan() {
        let agents = vec![
            agent(Species::Small, centre(), Vec3::new(15.0, 0.0, 0.0)),
            agent(Species::Small, centre(), Vec3::new(15.0, 0.0, 0.0)),
        ];
        let force = force_on(0, &agents, &[centre()]);
        assert!(force.is_finite());
        assert_eq!(force, Vec3::ZERO);
    }

    #[test]
    fn disabled_peers_and_self_are_skipped() {
        let mut agents = vec![
            agent(Species::Small, centre(), Vec3::ZERO),
            agent(Species::Small, centre() + Vec3::new(3.0, 0.0, 0.0), Vec3::ZERO),
        ];
        agents[1].disable();
        assert_eq!(force_on(0, &agents, &[]), Vec3::ZERO);

        agents[0].disable();
        let repulsor = centre() + Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(force_on(0, &agents, &[repulsor]), Vec3::ZERO);
    }

    #[test]
    fn walls_push_back_toward_the_arena() {
        let arena = ArenaConfig::default();
        let east = containment(Vec3::new(95.0, 25.0, 0.0), &arena, WallPolicy::Linear);
        let west = containment(Vec3::new(-95.0, 25.0, 0.0), &arena, WallPolicy::Linear);
        assert_eq!(east, Vec3::new(-5.0, 0.0, 0.0));
        assert_eq!(west, Vec3::new(5.0, 0.0, 0.0));

        let high = containment(Vec3::new(0.0, 43.0, -92.0), &arena, WallPolicy::Quadratic);
        assert_eq!(high, Vec3::new(0.0, -9.0, 4.0));

        let low = containment(Vec3::new(0.0, 4.0, 0.0), &arena, WallPolicy::Linear);
        assert_eq!(low, Vec3::new(0.0, 6.0, 0.0));

        assert_eq!(containment(centre(), &arena, WallPolicy::Quadratic), Vec3::ZERO);
    }

    #[test]
    fn wall_term_is_scaled_by_separation_factor() {
        let agents = vec![agent(Species::Small, Vec3::new(95.0, 25.0, 0.0), Vec3::ZERO)];
        assert_eq!(force_on(0, &agents, &[]), Vec3::new(-20.0, 0.0, 0.0));
    }

    #[test]
    fn speed_inside_band_is_untouched() {
        let speed = SpeedClamp::default();
        let mut boid = agent(Species::Small, centre(), Vec3::new(30.0, 0.0, 40.0));
        assert!(!boid.update(1.0 / 60.0, &speed));
        assert_eq!(boid.velocity(), Vec3::new(30.0, 0.0, 40.0));
    }

    #[test]
    fn speed_is_clamped_into_band() {
        let speed = SpeedClamp::default();
        let mut slow = agent(Species::Small, centre(), Vec3::new(0.0, 0.0, 2.0));
        assert!(slow.update(1.0 / 60.0, &speed));
        assert!((slow.velocity() - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-4);

        let mut fast = agent(Species::Small, centre(), Vec3::new(300.0, 0.0, 0.0));
        assert!(fast.update(1.0 / 60.0, &speed));
        assert!((fast.velocity() - Vec3::new(150.0, 0.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn resting_agent_restarts_at_minimum_speed() {
        let speed = SpeedClamp::default();
        let mut boid = agent(Species::Big, centre(), Vec3::ZERO);
        assert!(boid.update(1.0 / 60.0, &speed));
        assert_eq!(boid.velocity(), Vec3::new(10.0, 0.0, 0.0));

        let (nan_fixed, clamped) = clamp_speed(Vec3::splat(f32::NAN), &speed);
        assert!(clamped);
        assert_eq!(nan_fixed, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn force_is_applied_before_clamping() {
        let speed = SpeedClamp::default();
        let mut boid = agent(Species::Small, centre(), Vec3::new(20.0, 0.0, 0.0));
        boid.set_force(Vec3::new(0.0, 0.0, 600.0));
        assert!(!boid.update(0.05, &speed));
        assert!((boid.velocity() - Vec3::new(20.0, 0.0, 30.0)).length() < 1e-4);
    }

    #[test]
    fn orientation_rotates_about_up_cross_direction() {
        let rotation = orientation(Vec3::new(0.0, 0.0, 25.0));
        let (axis, angle) = rotation.to_axis_angle();
        assert!((axis - Vec3::X).length() < 1e-4);
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-4);

        assert_eq!(orientation(Vec3::new(0.0, 12.0, 0.0)), Quat::IDENTITY);
        assert_eq!(orientation(Vec3::ZERO), Quat::IDENTITY);
    }

    #[test]
    fn update_writes_orientation_to_body() {
        let mut boid = agent(Species::Small, centre(), Vec3::new(0.0, 0.0, 25.0));
        boid.update(1.0 / 60.0, &SpeedClamp::default());
        assert_eq!(boid.rotation(), orientation(Vec3::new(0.0, 0.0, 25.0)));
    }
}
