//! forcelayout - force-directed layout of entities in the plane.
//!
//! A [`Simulation`] repeatedly applies a list of [`Force`]s to a set of
//! [`Entity`] values and integrates their velocities under a cooling schedule
//! until the system comes to rest. Many-body and collision forces run on an
//! aggregate [`QuadTree`](quadtree::QuadTree) rebuilt every tick.
//!
//! ```
//! use forcelayout::{Force, Simulation, entity};
//!
//! let entities: Vec<_> = (0..3).map(|i| entity(i, ())).collect();
//! let mut simulation = Simulation::new(vec![
//!     Force::many_body([0, 1, 2]),
//!     Force::links([(0, 1), (1, 2), (2, 0)]),
//!     Force::center(0.0, 0.0),
//! ]);
//! let entities = simulation.compute_simulation(entities);
//! assert!(simulation.is_converged());
//! assert_eq!(entities.len(), 3);
//! ```

pub mod config;
pub mod entity;
pub mod force;
pub mod graph;
pub mod io;
pub mod layout;
pub mod quadtree;
pub mod simulation;

pub use config::{ConfigError, ConfigResult, LayoutConfig, SimulationConfig};
pub use entity::{Entity, Identity, entity};
pub use force::{Force, LinkSpec};
pub use simulation::Simulation;
