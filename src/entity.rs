//! Entities moved around by the simulation
//!
//! An entity is an identity, a position, a velocity and whatever payload the
//! caller wants to carry along. The simulation only touches the first three.

use std::f64::consts::PI;
use std::fmt::Debug;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::quadtree::Positioned;

/// Distance scale of the phyllotactic spiral used by [`entity`]
pub const INITIAL_RADIUS: f64 = 10.0;

/// Golden angle, `π(3 - √5)`
pub fn initial_angle() -> f64 {
    PI * (3.0 - 5.0_f64.sqrt())
}

/// Requirements on an entity's identity key.
///
/// Identities index the per-entity parameter maps of every force, so they must
/// be totally ordered; the order also fixes the order in which entities are
/// processed and returned.
pub trait Identity: Ord + Clone + Debug {}

impl<T: Ord + Clone + Debug> Identity for T {}

/// A simulated entity with an arbitrary payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity<I, P = ()> {
    pub id: I,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Caller data, never read by the simulation
    pub value: P,
}

impl<I, P> Entity<I, P> {
    /// Create an entity at rest at the given position
    pub fn new(id: I, x: f64, y: f64, value: P) -> Self {
        Self {
            id,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            value,
        }
    }

    pub fn position(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn velocity(&self) -> DVec2 {
        DVec2::new(self.vx, self.vy)
    }

    /// Where the entity would be after applying its current velocity
    pub fn projected(&self) -> DVec2 {
        self.position() + self.velocity()
    }

    pub(crate) fn add_velocity(&mut self, delta: DVec2) {
        self.vx += delta.x;
        self.vy += delta.y;
    }

    pub(crate) fn translate(&mut self, delta: DVec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Replace the payload, keeping identity and kinematics
    pub fn map_value<Q>(self, f: impl FnOnce(P) -> Q) -> Entity<I, Q> {
        Entity {
            id: self.id,
            x: self.x,
            y: self.y,
            vx: self.vx,
            vy: self.vy,
            value: f(self.value),
        }
    }
}

impl<I, P> Positioned for Entity<I, P> {
    fn position(&self) -> DVec2 {
        Entity::position(self)
    }
}

/// Create entity number `index`, placed on a phyllotactic spiral.
///
/// Consecutive indices land at well-separated positions, which makes this a
/// good initial placement: no two entities start on top of each other.
pub fn entity<P>(index: usize, value: P) -> Entity<usize, P> {
    let radius = (0.5 + index as f64).sqrt() * INITIAL_RADIUS;
    let rotation = index as f64 * initial_angle();
    Entity::new(index, radius * rotation.cos(), radius * rotation.sin(), value)
}
