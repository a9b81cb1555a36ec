//! Forces and how they are applied to entities
//!
//! A [`Force`] describes one effect on the entities of a simulation. All
//! per-entity parameters live in lookup maps keyed by identity: an entity that
//! is missing from a force's map is simply not affected by that force.
//!
//! Forces mutate velocities (the center force is the exception and shifts
//! positions directly). They never fail: numerically undefined contributions,
//! such as the push between two coincident points, count as zero.

mod collision;
mod link;
mod many_body;

use std::collections::BTreeMap;

use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Identity};
use crate::quadtree::QuadTreeConfig;

pub use link::{Link, LinkSpec};

// =============================================================================
// Default Constants
// =============================================================================

/// Default many-body strength (negative = repulsion)
pub const DEFAULT_STRENGTH: f64 = -30.0;

/// Default Barnes-Hut theta (0 = exact)
pub const DEFAULT_THETA: f64 = 0.9;

/// Default rest length of a link
pub const DEFAULT_LINK_DISTANCE: f64 = 30.0;

/// Default number of link relaxation passes per tick
pub const DEFAULT_LINK_ITERATIONS: usize = 1;

/// Default collision strength (1 = fully resolve overlaps)
pub const DEFAULT_COLLISION_STRENGTH: f64 = 1.0;

/// Default number of collision relaxation passes per tick
pub const DEFAULT_COLLISION_ITERATIONS: usize = 1;

/// Magnitude of the perturbation applied to zero-length link vectors
pub const JIGGLE_MAGNITUDE: f64 = 1e-6;

/// Coordinate axis for [`Force::Position`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

/// Pull toward a coordinate along one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionTarget {
    pub strength: f64,
    pub target: f64,
}

/// Pull toward a circle of `radius` around (`x`, `y`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadialTarget {
    pub strength: f64,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Tuning for [`Force::custom_collision`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionParams {
    pub iterations: usize,
    /// In `[0, 1]`; how much of an overlap is resolved per pass
    pub strength: f64,
}

impl Default for CollisionParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_COLLISION_ITERATIONS,
            strength: DEFAULT_COLLISION_STRENGTH,
        }
    }
}

/// A force acting on the entities of a simulation
#[derive(Debug, Clone, PartialEq)]
pub enum Force<I> {
    /// Translates all entities so that their mean position is (`x`, `y`)
    Center { x: f64, y: f64 },
    /// Barnes-Hut approximated repulsion (negative strength) or attraction
    ManyBody {
        theta: f64,
        strengths: BTreeMap<I, f64>,
    },
    /// Pushes overlapping circles apart
    Collision {
        iterations: usize,
        strength: f64,
        radii: BTreeMap<I, f64>,
    },
    /// Springs between pairs of entities
    Links { iterations: usize, links: Vec<Link<I>> },
    /// Pull toward a coordinate along one axis
    Position {
        axis: Axis,
        targets: BTreeMap<I, PositionTarget>,
    },
    /// Pull toward a circle
    Radial { targets: BTreeMap<I, RadialTarget> },
}

impl<I: Identity> Force<I> {
    /// Keep the mean position of all entities at (`x`, `y`)
    pub fn center(x: f64, y: f64) -> Self {
        Force::Center { x, y }
    }

    /// Repulsion between the given entities with the default strength and theta
    pub fn many_body(ids: impl IntoIterator<Item = I>) -> Self {
        Self::many_body_strength(DEFAULT_STRENGTH, ids)
    }

    /// Many-body force with one strength for all given entities
    pub fn many_body_strength(strength: f64, ids: impl IntoIterator<Item = I>) -> Self {
        Self::custom_many_body(DEFAULT_THETA, ids.into_iter().map(|id| (id, strength)))
    }

    /// Many-body force with a per-entity strength.
    ///
    /// `theta` is the Barnes-Hut accuracy: cells whose size divided by their
    /// distance is below `theta` are treated as a single body. `0.0` disables
    /// the approximation.
    pub fn custom_many_body(theta: f64, strengths: impl IntoIterator<Item = (I, f64)>) -> Self {
        Force::ManyBody {
            theta,
            strengths: strengths.into_iter().collect(),
        }
    }

    /// Springs between pairs with the default distance, strength and bias
    pub fn links(pairs: impl IntoIterator<Item = (I, I)>) -> Self {
        Self::custom_links(
            DEFAULT_LINK_ITERATIONS,
            pairs
                .into_iter()
                .map(|(source, target)| LinkSpec::new(source, target)),
        )
    }

    /// Springs with explicit parameters.
    ///
    /// Unset fields of a [`LinkSpec`] are resolved here, from the degrees of
    /// the linked entities over the whole list.
    pub fn custom_links(iterations: usize, specs: impl IntoIterator<Item = LinkSpec<I>>) -> Self {
        Force::Links {
            iterations,
            links: link::resolve(specs.into_iter().collect()),
        }
    }

    /// Collision between circles of a single radius
    pub fn collision(radius: f64, ids: impl IntoIterator<Item = I>) -> Self {
        Self::custom_collision(
            CollisionParams::default(),
            ids.into_iter().map(|id| (id, radius)),
        )
    }

    /// Collision with per-entity radii
    pub fn custom_collision(
        params: CollisionParams,
        radii: impl IntoIterator<Item = (I, f64)>,
    ) -> Self {
        Force::Collision {
            iterations: params.iterations,
            strength: params.strength,
            radii: radii.into_iter().collect(),
        }
    }

    /// Pull entities toward an x coordinate
    pub fn towards_x(targets: impl IntoIterator<Item = (I, PositionTarget)>) -> Self {
        Force::Position {
            axis: Axis::X,
            targets: targets.into_iter().collect(),
        }
    }

    /// Pull entities toward a y coordinate
    pub fn towards_y(targets: impl IntoIterator<Item = (I, PositionTarget)>) -> Self {
        Force::Position {
            axis: Axis::Y,
            targets: targets.into_iter().collect(),
        }
    }

    /// Pull entities toward circles
    pub fn radial(targets: impl IntoIterator<Item = (I, RadialTarget)>) -> Self {
        Force::Radial {
            targets: targets.into_iter().collect(),
        }
    }

    /// Short name, for logs
    pub fn name(&self) -> &'static str {
        match self {
            Force::Center { .. } => "center",
            Force::ManyBody { .. } => "many-body",
            Force::Collision { .. } => "collision",
            Force::Links { .. } => "links",
            Force::Position { axis: Axis::X, .. } => "x",
            Force::Position { axis: Axis::Y, .. } => "y",
            Force::Radial { .. } => "radial",
        }
    }

    /// Apply this force to `entities`, which must be sorted by identity
    /// without duplicates.
    pub(crate) fn apply<P>(&self, ctx: &mut TickContext<'_>, entities: &mut [Entity<I, P>]) {
        let alpha = ctx.alpha;
        match self {
            Force::Center { x, y } => apply_center(DVec2::new(*x, *y), entities),
            Force::ManyBody { theta, strengths } => {
                many_body::apply(alpha, *theta, strengths, entities, ctx.quadtree)
            }
            Force::Collision {
                iterations,
                strength,
                radii,
            } => collision::apply(*iterations, *strength, radii, entities, ctx.quadtree),
            Force::Links { iterations, links } => {
                link::apply(alpha, *iterations, links, entities, ctx.jiggle)
            }
            Force::Position { axis, targets } => {
                for e in entities.iter_mut() {
                    if let Some(t) = targets.get(&e.id) {
                        match axis {
                            Axis::X => e.vx += (t.target - e.x) * t.strength * alpha,
                            Axis::Y => e.vy += (t.target - e.y) * t.strength * alpha,
                        }
                    }
                }
            }
            Force::Radial { targets } => {
                for e in entities.iter_mut() {
                    if let Some(t) = targets.get(&e.id) {
                        let delta = e.position() - DVec2::new(t.x, t.y);
                        let r = delta.length();
                        let k = (t.radius - r) * t.strength * alpha / r;
                        e.add_velocity(or_zero(delta * k));
                    }
                }
            }
        }
    }
}

fn apply_center<I, P>(center: DVec2, entities: &mut [Entity<I, P>]) {
    if entities.is_empty() {
        return;
    }
    let sum: DVec2 = entities.iter().map(Entity::position).sum();
    let shift = sum / entities.len() as f64 - center;
    for e in entities.iter_mut() {
        e.translate(-shift);
    }
}

/// Per-tick state shared by all forces
pub(crate) struct TickContext<'a> {
    pub alpha: f64,
    pub quadtree: &'a QuadTreeConfig,
    pub jiggle: &'a mut Jiggle,
}

/// Source of tiny deterministic perturbations for zero-length vectors
#[derive(Debug, Clone)]
pub struct Jiggle {
    rng: StdRng,
}

impl Jiggle {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `value` itself, or a perturbation of at most `JIGGLE_MAGNITUDE / 2`
    /// when `value` is exactly zero
    pub fn apply(&mut self, value: f64) -> f64 {
        if value == 0.0 {
            (self.rng.random::<f64>() - 0.5) * JIGGLE_MAGNITUDE
        } else {
            value
        }
    }
}

/// NaN contributions count as no contribution
pub(crate) fn or_zero(v: DVec2) -> DVec2 {
    if v.is_nan() { DVec2::ZERO } else { v }
}

/// Position of `id` in identity-sorted `entities`
pub(crate) fn find<I: Ord, P>(entities: &[Entity<I, P>], id: &I) -> Option<usize> {
    entities.binary_search_by(|e| e.id.cmp(id)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<P>(force: &Force<usize>, alpha: f64, entities: &mut [Entity<usize, P>]) {
        let config = QuadTreeConfig::default();
        let mut jiggle = Jiggle::new(1);
        let mut ctx = TickContext {
            alpha,
            quadtree: &config,
            jiggle: &mut jiggle,
        };
        force.apply(&mut ctx, entities);
    }

    #[test]
    fn center_moves_mean_to_target() {
        let mut entities = vec![
            Entity::new(0, 0.0, 0.0, ()),
            Entity::new(1, 10.0, 4.0, ()),
            Entity::new(2, 2.0, -10.0, ()),
        ];
        run(&Force::center(100.0, -50.0), 1.0, &mut entities);

        let mean: DVec2 = entities.iter().map(Entity::position).sum::<DVec2>() / 3.0;
        assert!((mean - DVec2::new(100.0, -50.0)).length() < 1e-9);
        // Relative positions are preserved
        assert!((entities[1].position() - entities[0].position() - DVec2::new(10.0, 4.0)).length() < 1e-9);
    }

    #[test]
    fn center_on_no_entities_is_a_no_op() {
        let mut entities: Vec<Entity<usize>> = vec![];
        run(&Force::center(1.0, 1.0), 1.0, &mut entities);
        assert!(entities.is_empty());
    }

    #[test]
    fn position_force_pulls_only_listed_entities() {
        let mut entities = vec![Entity::new(0, 10.0, 5.0, ()), Entity::new(1, 10.0, 5.0, ())];
        let force = Force::towards_x([(
            0,
            PositionTarget {
                strength: 0.1,
                target: 0.0,
            },
        )]);
        run(&force, 0.5, &mut entities);

        assert_eq!(entities[0].vx, (0.0 - 10.0) * 0.1 * 0.5);
        assert_eq!(entities[0].vy, 0.0);
        assert_eq!(entities[1].vx, 0.0);
    }

    #[test]
    fn y_force_moves_vertically() {
        let mut entities = vec![Entity::new(0, 3.0, -4.0, ())];
        let force = Force::towards_y([(
            0,
            PositionTarget {
                strength: 1.0,
                target: 6.0,
            },
        )]);
        run(&force, 1.0, &mut entities);
        assert_eq!(entities[0].vx, 0.0);
        assert_eq!(entities[0].vy, 10.0);
    }

    #[test]
    fn radial_force_pushes_toward_circle() {
        let target = RadialTarget {
            strength: 1.0,
            x: 0.0,
            y: 0.0,
            radius: 10.0,
        };
        let mut entities = vec![Entity::new(0, 5.0, 0.0, ()), Entity::new(1, 0.0, 20.0, ())];
        run(&Force::radial([(0, target), (1, target)]), 1.0, &mut entities);

        // Inside the circle: pushed outward; outside: pulled inward
        assert!((entities[0].vx - 5.0).abs() < 1e-12);
        assert!((entities[1].vy + 10.0).abs() < 1e-12);
    }

    #[test]
    fn radial_force_at_center_is_zero() {
        let target = RadialTarget {
            strength: 1.0,
            x: 2.0,
            y: 2.0,
            radius: 10.0,
        };
        let mut entities = vec![Entity::new(0, 2.0, 2.0, ())];
        run(&Force::radial([(0, target)]), 1.0, &mut entities);
        assert_eq!(entities[0].velocity(), DVec2::ZERO);
    }

    #[test]
    fn jiggle_only_touches_zero() {
        let mut jiggle = Jiggle::new(7);
        assert_eq!(jiggle.apply(3.5), 3.5);
        let j = jiggle.apply(0.0);
        assert!(j.abs() <= JIGGLE_MAGNITUDE / 2.0);
    }

    #[test]
    fn jiggle_is_deterministic_per_seed() {
        let mut a = Jiggle::new(42);
        let mut b = Jiggle::new(42);
        for _ in 0..10 {
            assert_eq!(a.apply(0.0), b.apply(0.0));
        }
    }

    #[test]
    fn constructors_resolve_defaults() {
        match Force::many_body(["a", "b"]) {
            Force::ManyBody { theta, strengths } => {
                assert_eq!(theta, DEFAULT_THETA);
                assert_eq!(strengths.get("a"), Some(&DEFAULT_STRENGTH));
                assert_eq!(strengths.len(), 2);
            }
            other => panic!("unexpected force {other:?}"),
        }
        match Force::collision(4.0, [1, 2, 3]) {
            Force::Collision {
                iterations,
                strength,
                radii,
            } => {
                assert_eq!(iterations, DEFAULT_COLLISION_ITERATIONS);
                assert_eq!(strength, DEFAULT_COLLISION_STRENGTH);
                assert_eq!(radii.values().copied().collect::<Vec<_>>(), vec![4.0; 3]);
            }
            other => panic!("unexpected force {other:?}"),
        }
    }

    #[test]
    fn names_are_stable() {
        let names: Vec<&str> = [
            Force::center(0.0, 0.0),
            Force::many_body([0]),
            Force::collision(1.0, [0]),
            Force::links([(0, 1)]),
            Force::towards_x([]),
            Force::towards_y([]),
            Force::radial([]),
        ]
        .iter()
        .map(Force::name)
        .collect();
        insta::assert_snapshot!(names.join(","), @"center,many-body,collision,links,x,y,radial");
    }
}
