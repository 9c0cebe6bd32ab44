use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::body::{BodyFactory, BodySettings, RigidBody, SpawnRequest};
use crate::boid::{Boid, Species};
use crate::config::FlockConfig;
use crate::error::FlockError;
use crate::spatial::SpatialGrid;

/// Counters for one [`Flock::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Enabled agents that had a force computed and applied.
    pub processed: usize,
    /// Grid candidates handed to force computation, before any filtering.
    pub neighbor_candidates: usize,
    /// Agents whose speed left the band and was clamped back.
    pub clamped: usize,
}

/// What a renderer or replication layer needs to know about one agent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub index: usize,
    pub species: Species,
    pub enabled: bool,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quat,
    pub cell: (usize, usize),
}

/// Fixed-size population plus the grid used to find neighbors.
///
/// Every tick reads the grid as it was left at the end of the previous tick
/// and rebuilds it once all agents have moved, so the result does not depend
/// on anything but the inputs and the index order.
pub struct Flock<B> {
    config: FlockConfig,
    agents: Vec<Boid<B>>,
    grid: SpatialGrid,
    nearby: Vec<usize>,
}

impl<B: RigidBody> Flock<B> {
    /// Spawns `config.population` agents through `factory`, small ones first,
    /// at positions drawn from the spawn volume with a seeded generator.
    #[instrument(level = "debug", skip_all, fields(seed = seed))]
    pub fn initialise<F>(config: FlockConfig, factory: &mut F, seed: u64) -> Result<Self, FlockError>
    where
        F: BodyFactory<Body = B>,
    {
        config.validate()?;

        // Same seed, same spawn
        let mut rng = StdRng::seed_from_u64(seed);
        let (min, max) = (config.arena.spawn_min, config.arena.spawn_max);
        let total = config.population.total();
        let mut agents = Vec::with_capacity(total);

        for index in 0..total {
            let species = if index < config.population.small {
                Species::Small
            } else {
                Species::Big
            };
            let position = Vec3::new(
                sample(&mut rng, min.x, max.x),
                sample(&mut rng, min.y, max.y),
                sample(&mut rng, min.z, max.z),
            );
            let request = SpawnRequest {
                index,
                species,
                position,
                visual: species.visual(),
                settings: BodySettings::default(),
            };
            let body = factory.spawn(&request)?;
            agents.push(Boid::new(species, body));
        }

        let flock = Self::assemble(config, agents);
        info!(
            small = config.population.small,
            big = config.population.big,
            grid = flock.grid.dimension(),
            "flock initialised"
        );
        Ok(flock)
    }

    /// Builds a flock around bodies the host already placed. The population
    /// split in `config` is replaced by the species counts of `agents`.
    pub fn with_agents(mut config: FlockConfig, agents: Vec<Boid<B>>) -> Result<Self, FlockError> {
        config.validate()?;
        let small = agents
            .iter()
            .filter(|agent| agent.species() == Species::Small)
            .count();
        config.population.small = small;
        config.population.big = agents.len() - small;
        Ok(Self::assemble(config, agents))
    }

    fn assemble(config: FlockConfig, agents: Vec<Boid<B>>) -> Self {
        let mut flock = Self {
            grid: SpatialGrid::from_arena(&config.arena),
            config,
            agents,
            nearby: Vec::new(),
        };
        flock.rebuild_grid();
        flock
    }

    /// Advances every enabled agent by one step, in index order, then
    /// rebuilds the grid for the next tick.
    #[instrument(level = "trace", skip_all, fields(dt = dt, repulsors = repulsors.len()))]
    pub fn tick(&mut self, dt: f32, repulsors: &[Vec3]) -> TickStats {
        let mut stats = TickStats::default();

        for i in 0..self.agents.len() {
            if !self.agents[i].is_enabled() {
                continue;
            }

            // Candidates come from last tick's grid
            self.nearby.clear();
            let (cell_x, cell_z) = self.agents[i].cell();
            self.grid.neighbors_into(cell_x, cell_z, &mut self.nearby);
            stats.neighbor_candidates += self.nearby.len();

            let force =
                self.agents[i].steering_force(i, &self.agents, repulsors, &self.nearby, &self.config);

            let agent = &mut self.agents[i];
            agent.set_force(force);
            if agent.update(dt, &self.config.speed) {
                stats.clamped += 1;
            }
            stats.processed += 1;
        }

        // Rebuild once everyone has moved
        self.rebuild_grid();
        debug!(
            processed = stats.processed,
            candidates = stats.neighbor_candidates,
            clamped = stats.clamped,
            "tick complete"
        );
        stats
    }

    /// Removes agent `index` from the simulation without dropping it.
    /// Returns `true` if it was enabled; disabling twice is a no-op.
    pub fn disable(&mut self, index: usize) -> Result<bool, FlockError> {
        let len = self.agents.len();
        let Some(agent) = self.agents.get_mut(index) else {
            warn!(index, len, "disable rejected");
            return Err(FlockError::AgentOutOfRange { index, len });
        };
        let changed = agent.disable();
        if changed {
            debug!(index, species = ?agent.species(), "agent disabled");
        }
        Ok(changed)
    }

    pub fn is_enabled(&self, index: usize) -> Result<bool, FlockError> {
        self.agent(index).map(Boid::is_enabled)
    }

    pub fn agent(&self, index: usize) -> Result<&Boid<B>, FlockError> {
        self.agents.get(index).ok_or(FlockError::AgentOutOfRange {
            index,
            len: self.agents.len(),
        })
    }

    /// Grid candidates agent `index` would see on the next tick. Empty for a
    /// disabled agent.
    pub fn neighbor_ids(&self, index: usize) -> Result<Vec<usize>, FlockError> {
        let agent = self.agent(index)?;
        if !agent.is_enabled() {
            return Ok(Vec::new());
        }
        let (cell_x, cell_z) = agent.cell();
        Ok(self.grid.neighbors(cell_x, cell_z))
    }

    pub fn agents(&self) -> &[Boid<B>] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.agents.iter().filter(|agent| agent.is_enabled()).count()
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Bodies of enabled agents, for the host's physics step.
    pub fn active_bodies_mut(&mut self) -> impl Iterator<Item = &mut B> {
        self.agents
            .iter_mut()
            .filter(|agent| agent.is_enabled())
            .map(Boid::body_mut)
    }

    pub fn snapshot(&self) -> Vec<AgentState> {
        self.agents
            .iter()
            .enumerate()
            .map(|(index, agent)| AgentState {
                index,
                species: agent.species(),
                enabled: agent.is_enabled(),
                position: agent.position(),
                velocity: agent.velocity(),
                rotation: agent.rotation(),
                cell: agent.cell(),
            })
            .collect()
    }

    fn rebuild_grid(&mut self) {
        self.grid.clear();
        for (i, agent) in self.agents.iter_mut().enumerate() {
            if !agent.is_enabled() {
                continue;
            }
            let (cell_x, cell_z) = self.grid.cell_coordinates(agent.position());
            agent.set_cell((cell_x, cell_z));
            self.grid.insert(i, cell_x, cell_z);
        }
    }
}

fn sample(rng: &mut StdRng, low: f32, high: f32) -> f32 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{PointMass, PointMassFactory};
    use crate::config::Population;
    use crate::error::ConfigError;

    fn small_config(small: usize, big: usize) -> FlockConfig {
        FlockConfig {
            population: Population { small, big },
            ..FlockConfig::default()
        }
    }

    #[test]
    fn initialise_splits_species_and_stays_in_spawn_volume() {
        let config = small_config(6, 4);
        let flock = Flock::initialise(config, &mut PointMassFactory, 7).unwrap();
        assert_eq!(flock.len(), 10);
        assert_eq!(flock.enabled_count(), 10);
        for (i, agent) in flock.agents().iter().enumerate() {
            let expected = if i < 6 { Species::Small } else { Species::Big };
            assert_eq!(agent.species(), expected);
            let p = agent.position();
            assert!(p.cmpge(config.arena.spawn_min).all() && p.cmplt(config.arena.spawn_max).all());
        }
    }

    #[test]
    fn initial_grid_indexes_every_agent_once() {
        let flock = Flock::initialise(small_config(30, 30), &mut PointMassFactory, 11).unwrap();
        let dim = flock.grid().dimension();
        let mut seen = vec![0; flock.len()];
        for x in 0..dim {
            for z in 0..dim {
                for &i in flock.grid().cell(x, z) {
                    seen[i] += 1;
                    assert_eq!(flock.agents()[i].cell(), (x, z));
                }
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn spawn_failure_aborts_construction() {
        struct Failing;
        impl BodyFactory for Failing {
            type Body = PointMass;
            fn spawn(&mut self, request: &SpawnRequest) -> Result<PointMass, FlockError> {
                if request.index == 2 {
                    return Err(FlockError::Spawn {
                        index: request.index,
                        reason: "no model".into(),
                    });
                }
                PointMassFactory.spawn(request)
            }
        }
        let result = Flock::initialise(small_config(2, 2), &mut Failing, 0);
        assert!(matches!(result, Err(FlockError::Spawn { index: 2, .. })));
    }

    #[test]
    fn invalid_config_is_rejected_before_spawning() {
        let mut config = small_config(1, 1);
        config.speed.min = 500.0;
        let result = Flock::<PointMass>::initialise(config, &mut PointMassFactory, 0);
        assert!(matches!(result, Err(FlockError::Config(_))));
    }

    #[test]
    fn oversized_grid_is_rejected_before_allocation() {
        let mut config = small_config(1, 0);
        config.arena.cell_size = 1.0e-30;
        let result = Flock::<PointMass>::initialise(config, &mut PointMassFactory, 0);
        assert!(matches!(
            result,
            Err(FlockError::Config(ConfigError::Invalid { field: "arena.cell_size", .. }))
        ));
    }

    #[test]
    fn disable_is_idempotent_and_bounds_checked() {
        let mut flock = Flock::initialise(small_config(2, 1), &mut PointMassFactory, 3).unwrap();
        assert!(flock.disable(1).unwrap());
        assert!(!flock.disable(1).unwrap());
        assert!(!flock.is_enabled(1).unwrap());
        assert_eq!(flock.enabled_count(), 2);
        assert!(flock.neighbor_ids(1).unwrap().is_empty());
        assert!(matches!(
            flock.disable(3),
            Err(FlockError::AgentOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn disabled_agents_leave_the_grid_and_stop_moving() {
        let mut flock = Flock::initialise(small_config(4, 0), &mut PointMassFactory, 5).unwrap();
        flock.disable(0).unwrap();
        let before = flock.agents()[0].velocity();
        let stats = flock.tick(1.0 / 60.0, &[]);
        assert_eq!(stats.processed, 3);
        assert_eq!(flock.agents()[0].velocity(), before);
        for i in 1..4 {
            assert!(!flock.neighbor_ids(i).unwrap().contains(&0));
        }
        assert_eq!(flock.active_bodies_mut().count(), 3);
    }

    #[test]
    fn with_agents_recounts_population() {
        let agents = vec![
            Boid::new(Species::Big, PointMass::new(Vec3::ZERO, Vec3::X)),
            Boid::new(Species::Small, PointMass::new(Vec3::ONE, Vec3::X)),
            Boid::new(Species::Big, PointMass::new(Vec3::ONE, Vec3::X)),
        ];
        let flock = Flock::with_agents(FlockConfig::default(), agents).unwrap();
        assert_eq!(flock.config().population, Population { small: 1, big: 2 });
    }

    #[test]
    fn snapshot_reflects_agent_state() {
        let mut flock = Flock::initialise(small_config(1, 1), &mut PointMassFactory, 9).unwrap();
        flock.disable(0).unwrap();
        let snapshot = flock.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot[0].enabled);
        assert_eq!(snapshot[1].species, Species::Big);
        assert_eq!(snapshot[1].position, flock.agents()[1].position());
        assert_eq!(snapshot[1].cell, flock.agents()[1].cell());
    }
}
