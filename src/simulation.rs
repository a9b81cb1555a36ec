//! Simulation driver
//!
//! A [`Simulation`] owns the cooling schedule and the ordered list of forces.
//! Entities are passed in and handed back on every tick, so the caller stays
//! in charge of scheduling: tick once per frame, or run to convergence in one
//! call.
//!
//! Each tick:
//! 1. moves alpha toward `alpha_target` by `alpha_decay`,
//! 2. applies every force in order, each one seeing the velocities left by
//!    the previous ones,
//! 3. integrates: velocities are multiplied by `velocity_decay` and added to
//!    positions.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::config::{
    ConfigResult, DEFAULT_ALPHA, DEFAULT_ITERATIONS, DEFAULT_MAX_TICKS, DEFAULT_MIN_ALPHA,
    DEFAULT_VELOCITY_DECAY, SimulationConfig,
};
use crate::entity::{Entity, Identity};
use crate::force::{Force, Jiggle, TickContext};
use crate::quadtree::QuadTreeConfig;

/// Alpha decay that takes alpha from 1 to `min_alpha` in `iterations` ticks
pub fn alpha_decay_for(min_alpha: f64, iterations: usize) -> f64 {
    1.0 - min_alpha.powf(1.0 / iterations.max(1) as f64)
}

/// Force-directed simulation state
#[derive(Debug, Clone)]
pub struct Simulation<I> {
    alpha: f64,
    min_alpha: f64,
    alpha_decay: f64,
    alpha_target: f64,
    velocity_decay: f64,
    forces: Vec<Force<I>>,
    quadtree: QuadTreeConfig,
    jiggle: Jiggle,
    ticks: usize,
}

impl<I: Identity> Simulation<I> {
    /// Create a simulation with default parameters
    pub fn new(forces: Vec<Force<I>>) -> Self {
        debug!(
            forces = ?forces.iter().map(Force::name).collect::<Vec<_>>(),
            "creating simulation"
        );
        Self {
            alpha: DEFAULT_ALPHA,
            min_alpha: DEFAULT_MIN_ALPHA,
            alpha_decay: alpha_decay_for(DEFAULT_MIN_ALPHA, DEFAULT_ITERATIONS),
            alpha_target: 0.0,
            velocity_decay: DEFAULT_VELOCITY_DECAY,
            forces,
            quadtree: QuadTreeConfig::default(),
            jiggle: Jiggle::new(0),
            ticks: 0,
        }
    }

    /// Create a simulation from a validated configuration
    pub fn with_config(forces: Vec<Force<I>>, config: &SimulationConfig) -> ConfigResult<Self> {
        config.validate()?;
        let mut simulation = Self::new(forces);
        simulation.alpha = config.alpha;
        simulation.min_alpha = config.min_alpha;
        simulation.alpha_target = config.alpha_target;
        simulation.velocity_decay = config.velocity_decay;
        simulation.quadtree = config.quadtree;
        simulation.jiggle = Jiggle::new(config.jiggle_seed);
        simulation.set_iterations(config.iterations);
        Ok(simulation)
    }

    /// Builder form of [`Simulation::set_iterations`]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.set_iterations(iterations);
        self
    }

    /// Set alpha decay so that about `iterations` ticks reach convergence
    pub fn set_iterations(&mut self, iterations: usize) {
        self.alpha_decay = alpha_decay_for(self.min_alpha, iterations);
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn alpha_decay(&self) -> f64 {
        self.alpha_decay
    }

    /// Number of ticks performed so far
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn forces(&self) -> &[Force<I>] {
        &self.forces
    }

    /// Append a force; it runs after all existing ones
    pub fn push_force(&mut self, force: Force<I>) {
        self.forces.push(force);
    }

    /// A target above `min_alpha` keeps the simulation running, e.g. during a drag
    pub fn set_alpha_target(&mut self, alpha_target: f64) {
        self.alpha_target = alpha_target;
    }

    pub fn set_velocity_decay(&mut self, velocity_decay: f64) {
        self.velocity_decay = velocity_decay;
    }

    pub fn is_converged(&self) -> bool {
        self.alpha <= self.min_alpha
    }

    /// Reset alpha to 1, leaving forces and decay untouched
    pub fn reheat(&mut self) {
        self.alpha = DEFAULT_ALPHA;
    }

    /// Converged with nothing pulling alpha back up
    fn is_at_rest(&self) -> bool {
        self.is_converged() && self.alpha_target <= self.min_alpha
    }

    /// Advance the simulation by one tick.
    ///
    /// Entities come back ordered by identity. If several entities share an
    /// identity, only the last one is kept.
    ///
    /// A converged simulation is at rest: entities come back unmoved until
    /// [`Simulation::reheat`] or [`Simulation::set_alpha_target`] warms it up.
    pub fn tick<P>(&mut self, entities: Vec<Entity<I, P>>) -> Vec<Entity<I, P>> {
        let mut entities = Self::by_identity(entities);
        if self.is_at_rest() {
            trace!(alpha = self.alpha, "simulation at rest");
        } else {
            self.step(&mut entities);
        }
        entities
    }

    /// Advance the simulation by `n` ticks
    pub fn tick_n<P>(&mut self, entities: Vec<Entity<I, P>>, n: usize) -> Vec<Entity<I, P>> {
        self.run_while(entities, n, |_, _| true)
    }

    /// Tick until converged, or until `max_ticks` ticks have run
    pub fn run_to_convergence<P>(
        &mut self,
        entities: Vec<Entity<I, P>>,
        max_ticks: usize,
    ) -> Vec<Entity<I, P>> {
        let entities = self.run_while(entities, max_ticks, |_, _| true);
        if !self.is_converged() {
            warn!(
                max_ticks,
                alpha = self.alpha,
                "simulation stopped at tick limit before converging"
            );
        }
        entities
    }

    /// [`Simulation::run_to_convergence`] with [`DEFAULT_MAX_TICKS`]
    pub fn compute_simulation<P>(&mut self, entities: Vec<Entity<I, P>>) -> Vec<Entity<I, P>> {
        self.run_to_convergence(entities, DEFAULT_MAX_TICKS)
    }

    /// Tick until converged, until `max_ticks` ticks have run, or until
    /// `keep_going(ticks_done, entities)` returns false. The predicate is
    /// checked before every tick. A converged simulation with a warm
    /// `alpha_target` keeps ticking.
    pub fn run_while<P>(
        &mut self,
        entities: Vec<Entity<I, P>>,
        max_ticks: usize,
        mut keep_going: impl FnMut(usize, &[Entity<I, P>]) -> bool,
    ) -> Vec<Entity<I, P>> {
        let mut entities = Self::by_identity(entities);
        for done in 0..max_ticks {
            if self.is_at_rest() || !keep_going(done, &entities) {
                break;
            }
            self.step(&mut entities);
        }
        entities
    }

    fn by_identity<P>(entities: Vec<Entity<I, P>>) -> Vec<Entity<I, P>> {
        entities
            .into_iter()
            .map(|e| (e.id.clone(), e))
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .collect()
    }

    /// One tick over entities already sorted by identity
    fn step<P>(&mut self, entities: &mut [Entity<I, P>]) {
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        self.ticks += 1;
        trace!(tick = self.ticks, alpha = self.alpha, "tick");

        let mut ctx = TickContext {
            alpha: self.alpha,
            quadtree: &self.quadtree,
            jiggle: &mut self.jiggle,
        };
        for force in &self.forces {
            force.apply(&mut ctx, entities);
        }

        for e in entities.iter_mut() {
            e.vx *= self.velocity_decay;
            e.vy *= self.velocity_decay;
            e.x += e.vx;
            e.y += e.vy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::entity;

    #[test]
    fn alpha_decay_matches_iteration_count() {
        let decay = alpha_decay_for(0.001, 300);
        assert!((decay - (1.0 - 0.001_f64.powf(1.0 / 300.0))).abs() < 1e-15);

        let mut alpha = 1.0;
        for _ in 0..300 {
            alpha += (0.0 - alpha) * decay;
        }
        assert!((alpha - 0.001).abs() < 1e-9);
    }

    #[test]
    fn converges_after_configured_iterations() {
        let mut sim: Simulation<usize> = Simulation::new(vec![]).with_iterations(50);
        let entities = sim.compute_simulation(vec![entity(0, ())]);
        assert!(sim.is_converged());
        assert_eq!(entities.len(), 1);
        // Rounding may cost one extra tick
        assert!((50..=51).contains(&sim.ticks()), "took {} ticks", sim.ticks());
    }

    #[test]
    fn reheat_restarts_a_converged_simulation() {
        let mut sim: Simulation<usize> = Simulation::new(vec![]).with_iterations(10);
        sim.compute_simulation::<()>(vec![]);
        assert!(sim.is_converged());

        sim.reheat();
        assert_eq!(sim.alpha(), 1.0);
        assert!(!sim.is_converged());
    }

    #[test]
    fn converged_simulation_stays_at_rest_until_reheated() {
        let mut sim = Simulation::new(vec![Force::many_body([0, 1])]).with_iterations(10);
        let settled = sim.compute_simulation(vec![entity(0, ()), entity(1, ())]);
        assert!(sim.is_converged());
        let ticks = sim.ticks();

        // Velocities left over from the last tick do not move anything either
        let after = sim.tick(settled.clone());
        assert_eq!(after, settled);
        assert_eq!(sim.ticks(), ticks);

        sim.reheat();
        let moved = sim.tick(settled.clone());
        assert_eq!(sim.ticks(), ticks + 1);
        assert_ne!(moved[0].position(), settled[0].position());
    }

    #[test]
    fn alpha_target_wakes_a_converged_simulation() {
        let mut sim: Simulation<usize> = Simulation::new(vec![]).with_iterations(10);
        sim.compute_simulation::<()>(vec![]);
        assert!(sim.is_converged());
        let ticks = sim.ticks();

        sim.set_alpha_target(0.3);
        sim.tick_n::<()>(vec![], 3);
        assert_eq!(sim.ticks(), ticks + 3);
        assert!(!sim.is_converged());
    }

    #[test]
    fn unreachable_target_stops_at_tick_limit() {
        let mut sim: Simulation<usize> = Simulation::new(vec![]);
        sim.set_alpha_target(0.5);
        sim.run_to_convergence(vec![entity(0, ())], 25);
        assert!(!sim.is_converged());
        assert_eq!(sim.ticks(), 25);
    }

    #[test]
    fn run_while_stops_when_asked() {
        let mut sim = Simulation::new(vec![Force::many_body([0, 1])]);
        let entities = sim.run_while(vec![entity(0, ()), entity(1, ())], 1000, |done, _| done < 7);
        assert_eq!(sim.ticks(), 7);
        assert_eq!(entities.len(), 2);
    }

    #[test]
    fn tick_integrates_with_velocity_decay() {
        let mut sim: Simulation<u8> = Simulation::new(vec![]);
        let mut e = Entity::new(1, 0.0, 0.0, ());
        e.vx = 10.0;
        let out = sim.tick(vec![e]);
        assert_eq!(out[0].vx, 6.0);
        assert_eq!(out[0].x, 6.0);
        assert!(sim.alpha() < 1.0);
    }

    #[test]
    fn output_is_ordered_by_identity_and_deduplicated() {
        let mut sim: Simulation<&str> = Simulation::new(vec![]);
        let out = sim.tick(vec![
            Entity::new("c", 0.0, 0.0, 1),
            Entity::new("a", 0.0, 0.0, 2),
            Entity::new("c", 5.0, 5.0, 3),
        ]);
        let ids: Vec<_> = out.iter().map(|e| (e.id, e.value)).collect();
        assert_eq!(ids, vec![("a", 2), ("c", 3)]);
    }

    #[test]
    fn forces_run_in_the_given_order() {
        // Center runs first, so the pull sees x = 0
        let target = crate::force::PositionTarget {
            strength: 1.0,
            target: 100.0,
        };
        let forces = vec![Force::center(0.0, 0.0), Force::towards_x([(0, target)])];
        let mut sim = Simulation::new(forces);
        sim.push_force(Force::towards_y([]));
        assert_eq!(
            sim.forces().iter().map(Force::name).collect::<Vec<_>>(),
            vec!["center", "x", "y"]
        );

        let out = sim.tick(vec![Entity::new(0, 10.0, 0.0, ())]);
        let alpha = sim.alpha();
        assert!((out[0].vx - 100.0 * alpha * 0.6).abs() < 1e-9);
    }

    #[test]
    fn with_config_rejects_invalid_values() {
        let config = SimulationConfig {
            velocity_decay: -0.1,
            ..Default::default()
        };
        assert!(Simulation::<usize>::with_config(vec![], &config).is_err());
    }

    #[test]
    fn same_seed_gives_same_layout() {
        let run = || {
            let config = SimulationConfig {
                jiggle_seed: 99,
                iterations: 30,
                ..Default::default()
            };
            let mut sim = Simulation::with_config(vec![Force::links([(0, 1)])], &config).unwrap();
            // Coincident endpoints need the jiggle
            sim.compute_simulation(vec![Entity::new(0, 0.0, 0.0, ()), Entity::new(1, 0.0, 0.0, ())])
        };
        assert_eq!(run(), run());
    }
}
