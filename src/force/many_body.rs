//! Barnes-Hut many-body force
//!
//! Bodies are inserted into a quadtree whose cells carry the total strength
//! and the strength-weighted centroid of the bodies below them. A cell that is
//! small compared to its distance from the body being updated acts as a single
//! body at its centroid.

use std::collections::BTreeMap;

use glam::DVec2;

use super::or_zero;
use crate::entity::{Entity, Identity};
use crate::quadtree::{Positioned, QuadTree, QuadTreeConfig};

#[derive(Debug, Clone, Copy)]
struct Body {
    index: usize,
    position: DVec2,
    strength: f64,
}

impl Positioned for Body {
    fn position(&self) -> DVec2 {
        self.position
    }
}

/// Combined strength of a cell
#[derive(Debug, Clone, Copy)]
struct Charge {
    centroid: DVec2,
    strength: f64,
    /// Sum of absolute strengths, used to weight the centroid
    weight: f64,
}

impl Charge {
    fn of(body: &Body) -> Self {
        Self {
            centroid: body.position,
            strength: body.strength,
            weight: body.strength.abs(),
        }
    }

    /// Merge charges; with no weight at all the centroid is the plain mean.
    /// A lone charge is returned as is.
    fn combine(first: Charge, rest: impl Iterator<Item = Charge>) -> Self {
        let mut rest = rest.peekable();
        if rest.peek().is_none() {
            return first;
        }
        let (mut strength, mut weight, mut weighted, mut sum, mut count) =
            (0.0, 0.0, DVec2::ZERO, DVec2::ZERO, 0.0);
        for c in std::iter::once(first).chain(rest) {
            strength += c.strength;
            weight += c.weight;
            weighted += c.centroid * c.weight;
            sum += c.centroid;
            count += 1.0;
        }
        let centroid = if weight > 0.0 {
            weighted / weight
        } else {
            sum / count
        };
        Self {
            centroid,
            strength,
            weight,
        }
    }
}

type ChargeTree = QuadTree<Body, Charge>;

fn build(config: &QuadTreeConfig, bodies: impl IntoIterator<Item = Body>) -> ChargeTree {
    QuadTree::from_list(config, bodies).aggregate(
        |first, rest| Charge::combine(Charge::of(first), rest.iter().map(Charge::of)),
        |first, rest| Charge::combine(*first, rest.iter().map(|c| **c)),
    )
}

/// Velocity change of a body at `target` caused by a strength at `source`
fn pairwise(target: DVec2, source: DVec2, strength: f64, alpha: f64) -> DVec2 {
    let delta = source - target;
    let weight = strength * alpha / delta.length_squared();
    or_zero(delta * weight)
}

/// Cells whose box contains the body are always opened, so a body never
/// feels an aggregate that includes its own strength.
fn velocity_change(tree: &ChargeTree, body: &Body, theta: f64, alpha: f64) -> DVec2 {
    let (bounding_box, charge) = match tree {
        QuadTree::Empty => return DVec2::ZERO,
        QuadTree::Leaf(leaf) => (leaf.bounding_box, leaf.aggregate),
        QuadTree::Node(node) => (node.bounding_box, node.aggregate),
    };

    let size = bounding_box.width().max(bounding_box.height());
    let distance = body.position.distance(charge.centroid);
    if !bounding_box.contains(body.position) && size / distance < theta {
        return pairwise(body.position, charge.centroid, charge.strength, alpha);
    }

    match tree {
        QuadTree::Empty => DVec2::ZERO,
        QuadTree::Leaf(leaf) => leaf
            .points
            .iter()
            .filter(|other| other.index != body.index)
            .map(|other| pairwise(body.position, other.position, other.strength, alpha))
            .sum(),
        QuadTree::Node(node) => node
            .children
            .iter()
            .map(|child| velocity_change(child, body, theta, alpha))
            .sum(),
    }
}

/// Apply the force to the entities present in `strengths`
pub(super) fn apply<I: Identity, P>(
    alpha: f64,
    theta: f64,
    strengths: &BTreeMap<I, f64>,
    entities: &mut [Entity<I, P>],
    config: &QuadTreeConfig,
) {
    let bodies: Vec<Body> = entities
        .iter()
        .enumerate()
        .filter_map(|(index, e)| {
            strengths.get(&e.id).map(|&strength| Body {
                index,
                position: e.position(),
                strength,
            })
        })
        .collect();
    if bodies.len() < 2 {
        return;
    }

    let tree = build(config, bodies.iter().copied());
    for body in &bodies {
        let dv = velocity_change(&tree, body, theta, alpha);
        entities[body.index].add_velocity(dv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(bodies: &[Body], alpha: f64) -> Vec<DVec2> {
        bodies
            .iter()
            .map(|b| {
                bodies
                    .iter()
                    .filter(|o| o.index != b.index)
                    .map(|o| pairwise(b.position, o.position, o.strength, alpha))
                    .sum()
            })
            .collect()
    }

    fn scattered(n: usize) -> Vec<Entity<usize>> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                Entity::new(i, (t * 12.9898).sin() * 200.0, (t * 78.233).cos() * 150.0, ())
            })
            .collect()
    }

    #[test]
    fn two_bodies_repel_symmetrically() {
        let mut entities = vec![Entity::new(0, 0.0, 0.0, ()), Entity::new(1, 10.0, 0.0, ())];
        let strengths = BTreeMap::from([(0, -30.0), (1, -30.0)]);
        apply(1.0, 0.9, &strengths, &mut entities, &QuadTreeConfig::default());

        assert!((entities[0].vx + 3.0).abs() < 1e-12);
        assert!((entities[1].vx - 3.0).abs() < 1e-12);
        assert_eq!(entities[0].vy, 0.0);
    }

    #[test]
    fn zero_theta_matches_brute_force() {
        let config = QuadTreeConfig {
            leaf_capacity: 2,
            ..Default::default()
        };
        let mut entities = scattered(60);
        let strengths: BTreeMap<usize, f64> =
            (0..60).map(|i| (i, -10.0 - (i % 7) as f64)).collect();
        let bodies: Vec<Body> = entities
            .iter()
            .enumerate()
            .map(|(index, e)| Body {
                index,
                position: e.position(),
                strength: strengths[&e.id],
            })
            .collect();
        let expected = brute_force(&bodies, 0.5);

        apply(0.5, 0.0, &strengths, &mut entities, &config);

        for (e, want) in entities.iter().zip(expected) {
            assert!(
                (e.velocity() - want).length() < 1e-9 * want.length().max(1.0),
                "{:?} != {:?}",
                e.velocity(),
                want
            );
        }
    }

    #[test]
    fn approximation_stays_close_to_exact() {
        let config = QuadTreeConfig {
            leaf_capacity: 4,
            ..Default::default()
        };
        let strengths: BTreeMap<usize, f64> = (0..200).map(|i| (i, -30.0)).collect();
        let mut exact = scattered(200);
        let mut approx = exact.clone();
        apply(1.0, 0.0, &strengths, &mut exact, &config);
        apply(1.0, 0.9, &strengths, &mut approx, &config);

        let error: f64 = exact
            .iter()
            .zip(&approx)
            .map(|(a, b)| (a.velocity() - b.velocity()).length())
            .sum();
        let magnitude: f64 = exact.iter().map(|e| e.velocity().length()).sum();
        assert!(error / magnitude < 0.2, "relative error {}", error / magnitude);
    }

    #[test]
    fn entities_without_strength_are_untouched() {
        let mut entities = vec![
            Entity::new(0, 0.0, 0.0, ()),
            Entity::new(1, 10.0, 0.0, ()),
            Entity::new(2, 5.0, 5.0, ()),
        ];
        let strengths = BTreeMap::from([(0, -30.0), (1, -30.0)]);
        apply(1.0, 0.9, &strengths, &mut entities, &QuadTreeConfig::default());
        assert_eq!(entities[2].velocity(), DVec2::ZERO);
        // Entity 2 exerts nothing either
        assert_eq!(entities[0].vy, 0.0);
    }

    #[test]
    fn coincident_bodies_exert_nothing() {
        let mut entities = vec![Entity::new(0, 1.0, 1.0, ()), Entity::new(1, 1.0, 1.0, ())];
        let strengths = BTreeMap::from([(0, -30.0), (1, -30.0)]);
        apply(1.0, 0.9, &strengths, &mut entities, &QuadTreeConfig::default());
        for e in &entities {
            assert_eq!(e.velocity(), DVec2::ZERO);
        }
    }

    #[test]
    fn centroid_is_weighted_by_absolute_strength() {
        let charge = Charge::combine(
            Charge {
                centroid: DVec2::new(0.0, 0.0),
                strength: -30.0,
                weight: 30.0,
            },
            std::iter::once(Charge {
                centroid: DVec2::new(4.0, 0.0),
                strength: 10.0,
                weight: 10.0,
            }),
        );
        assert_eq!(charge.strength, -20.0);
        assert_eq!(charge.centroid, DVec2::new(1.0, 0.0));
    }

    #[test]
    fn lone_charge_keeps_its_exact_centroid() {
        // (p * |s|) / |s| is not always p in floating point
        let body = Body {
            index: 0,
            position: DVec2::new(-69.55068487985989, 0.7),
            strength: -30.0,
        };
        let charge = Charge::combine(Charge::of(&body), std::iter::empty());
        assert_eq!(charge.centroid, body.position);
        assert_eq!(charge.strength, -30.0);
    }

    #[test]
    fn single_body_leaves_never_act_on_their_own_body() {
        // Small leaves put most bodies alone in a cell
        let config = QuadTreeConfig {
            leaf_capacity: 2,
            ..Default::default()
        };
        let strengths: BTreeMap<usize, f64> = (0..200).map(|i| (i, -30.0)).collect();
        let mut exact = scattered(200);
        let mut approx = exact.clone();
        apply(1.0, 0.0, &strengths, &mut exact, &config);
        apply(1.0, 0.9, &strengths, &mut approx, &config);

        for (a, b) in exact.iter().zip(&approx) {
            let error = (a.velocity() - b.velocity()).length();
            assert!(
                error < 0.5 * a.velocity().length().max(1.0),
                "entity {}: {:?} vs exact {:?}",
                a.id,
                b.velocity(),
                a.velocity()
            );
        }
    }
}
