//! Laying out a [`GraphData`] with a [`LayoutConfig`]

use tracing::{debug, info};

use crate::config::{ConfigResult, LayoutConfig};
use crate::entity::{Entity, entity};
use crate::force::{CollisionParams, Force, LinkSpec};
use crate::graph::{GraphData, Layout, LayoutNode};
use crate::simulation::Simulation;

/// Forces for a graph, in application order: links, many-body, collision
/// (when configured), center
pub fn forces(graph: &GraphData, config: &LayoutConfig) -> Vec<Force<String>> {
    let links = graph.edges.iter().map(|e| {
        let spec = LinkSpec::new(e.source.clone(), e.target.clone())
            .with_distance(e.distance.unwrap_or(config.link.distance));
        match e.strength {
            Some(strength) => spec.with_strength(strength),
            None => spec,
        }
    });
    let mut forces = vec![
        Force::custom_links(config.link.iterations, links),
        Force::custom_many_body(
            config.many_body.theta,
            graph.nodes.iter().map(|n| {
                (
                    n.id.clone(),
                    n.strength.unwrap_or(config.many_body.strength),
                )
            }),
        ),
    ];
    if let Some(collision) = &config.collision {
        forces.push(Force::custom_collision(
            CollisionParams {
                iterations: collision.iterations,
                strength: collision.strength,
            },
            graph
                .nodes
                .iter()
                .map(|n| (n.id.clone(), n.radius.unwrap_or(collision.radius))),
        ));
    }
    forces.push(Force::center(config.center.x, config.center.y));
    forces
}

/// Run a simulation over `graph` until it converges or hits `max_ticks`.
///
/// Nodes start on a phyllotactic spiral in input order.
pub fn layout(graph: &GraphData, config: &LayoutConfig) -> ConfigResult<Layout> {
    config.validate()?;
    let mut simulation = Simulation::with_config(forces(graph, config), &config.simulation)?;

    let entities: Vec<Entity<String, Option<String>>> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let placed = entity(index, ());
            Entity::new(node.id.clone(), placed.x, placed.y, node.label.clone())
        })
        .collect();
    debug!(
        nodes = entities.len(),
        edges = graph.edges.len(),
        "starting layout"
    );

    let entities = simulation.run_to_convergence(entities, config.max_ticks);
    info!(
        ticks = simulation.ticks(),
        converged = simulation.is_converged(),
        "layout finished"
    );

    Ok(Layout {
        ticks: simulation.ticks(),
        converged: simulation.is_converged(),
        alpha: simulation.alpha(),
        nodes: entities
            .into_iter()
            .map(|e| LayoutNode {
                x: e.x,
                y: e.y,
                id: e.id,
                label: e.value,
            })
            .collect(),
    })
}
