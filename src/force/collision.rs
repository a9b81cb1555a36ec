//! Collision between circles
//!
//! Circles are placed at their projected positions (position plus velocity).
//! Each quadtree cell knows the largest radius below it, so a cell can be
//! skipped as soon as its box, grown by both radii, does not reach the circle
//! being resolved. Every overlapping pair is resolved once, from the member
//! that comes first in identity order.

use std::collections::BTreeMap;

use glam::DVec2;

use super::or_zero;
use crate::entity::{Entity, Identity};
use crate::quadtree::{BoundingBox, Positioned, QuadTree, QuadTreeConfig};

#[derive(Debug, Clone, Copy)]
struct Disc {
    index: usize,
    center: DVec2,
    radius: f64,
}

impl Positioned for Disc {
    fn position(&self) -> DVec2 {
        self.center
    }
}

/// Largest radius per cell
type DiscTree = QuadTree<Disc, f64>;

fn build(config: &QuadTreeConfig, discs: impl IntoIterator<Item = Disc>) -> DiscTree {
    QuadTree::from_list(config, discs).aggregate(
        |first, rest| rest.iter().fold(first.radius, |r, d| r.max(d.radius)),
        |first, rest| rest.iter().fold(*first, |r, d| r.max(**d)),
    )
}

fn reaches(bounding_box: &BoundingBox, max_radius: f64, center: DVec2, radius: f64) -> bool {
    bounding_box.expand(radius + max_radius).contains(center)
}

/// Push `disc` and the members of `tree` with a greater index apart
fn resolve<I, P>(
    tree: &DiscTree,
    disc: &Disc,
    strength: f64,
    entities: &mut [Entity<I, P>],
) {
    match tree {
        QuadTree::Empty => {}
        QuadTree::Leaf(leaf) => {
            if !reaches(&leaf.bounding_box, leaf.aggregate, disc.center, disc.radius) {
                return;
            }
            for other in leaf.points.iter().filter(|other| other.index > disc.index) {
                resolve_pair(disc, other, strength, entities);
            }
        }
        QuadTree::Node(node) => {
            if !reaches(&node.bounding_box, node.aggregate, disc.center, disc.radius) {
                return;
            }
            for child in node.children.iter() {
                resolve(child, disc, strength, entities);
            }
        }
    }
}

fn resolve_pair<I, P>(disc: &Disc, other: &Disc, strength: f64, entities: &mut [Entity<I, P>]) {
    let r = disc.radius + other.radius;
    let delta = disc.center - entities[other.index].projected();
    let l2 = delta.length_squared();
    if l2 >= r * r {
        return;
    }

    let l = l2.sqrt();
    let push = or_zero(delta * ((r - l) / l * strength));
    let (ri2, rj2) = (disc.radius * disc.radius, other.radius * other.radius);
    let share = rj2 / (ri2 + rj2);
    entities[disc.index].add_velocity(push * share);
    entities[other.index].add_velocity(-push * (1.0 - share));
}

/// Apply `iterations` collision passes to the entities present in `radii`
pub(super) fn apply<I: Identity, P>(
    iterations: usize,
    strength: f64,
    radii: &BTreeMap<I, f64>,
    entities: &mut [Entity<I, P>],
    config: &QuadTreeConfig,
) {
    let members: Vec<(usize, f64)> = entities
        .iter()
        .enumerate()
        .filter_map(|(index, e)| radii.get(&e.id).map(|&radius| (index, radius)))
        .collect();
    if members.len() < 2 {
        return;
    }

    for _ in 0..iterations {
        let tree = build(
            config,
            members.iter().map(|&(index, radius)| Disc {
                index,
                center: entities[index].projected(),
                radius,
            }),
        );
        for &(index, radius) in &members {
            let disc = Disc {
                index,
                center: entities[index].projected(),
                radius,
            };
            resolve(&tree, &disc, strength, entities);
        }
    }
}
