//! Spring links between entity pairs

use std::collections::BTreeMap;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::{DEFAULT_LINK_DISTANCE, Jiggle, find};
use crate::entity::{Entity, Identity};

/// A link as given by the caller; unset fields get defaults derived from the
/// degrees of its endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec<I> {
    pub source: I,
    pub target: I,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias: Option<f64>,
}

impl<I> LinkSpec<I> {
    pub fn new(source: I, target: I) -> Self {
        Self {
            source,
            target,
            distance: None,
            strength: None,
            bias: None,
        }
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = Some(strength);
        self
    }

    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = Some(bias);
        self
    }
}

/// A link with all parameters resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link<I> {
    pub source: I,
    pub target: I,
    /// Rest length
    pub distance: f64,
    pub strength: f64,
    /// Share of the correction applied to the target; the source gets the rest
    pub bias: f64,
}

/// Fill in defaults.
///
/// With `deg(n)` the number of link endpoints equal to `n`:
/// strength is `1 / min(deg(source), deg(target))` and bias is
/// `deg(source) / (deg(source) + deg(target))`.
pub(super) fn resolve<I: Identity>(specs: Vec<LinkSpec<I>>) -> Vec<Link<I>> {
    let mut degree: BTreeMap<&I, usize> = BTreeMap::new();
    for spec in &specs {
        *degree.entry(&spec.source).or_default() += 1;
        *degree.entry(&spec.target).or_default() += 1;
    }
    let degrees: Vec<(f64, f64)> = specs
        .iter()
        .map(|spec| {
            let count = |id: &I| degree.get(id).copied().unwrap_or(1) as f64;
            (count(&spec.source), count(&spec.target))
        })
        .collect();

    specs
        .into_iter()
        .zip(degrees)
        .map(|(spec, (source_degree, target_degree))| Link {
            distance: spec.distance.unwrap_or(DEFAULT_LINK_DISTANCE),
            strength: spec
                .strength
                .unwrap_or(1.0 / source_degree.min(target_degree)),
            bias: spec
                .bias
                .unwrap_or(source_degree / (source_degree + target_degree)),
            source: spec.source,
            target: spec.target,
        })
        .collect()
}

/// Relax every link `iterations` times, in list order.
///
/// Links whose endpoints are not both present are skipped.
pub(super) fn apply<I: Identity, P>(
    alpha: f64,
    iterations: usize,
    links: &[Link<I>],
    entities: &mut [Entity<I, P>],
    jiggle: &mut Jiggle,
) {
    for _ in 0..iterations {
        for link in links {
            let (Some(s), Some(t)) = (find(entities, &link.source), find(entities, &link.target))
            else {
                continue;
            };
            let delta = entities[t].projected() - entities[s].projected();
            let delta = DVec2::new(jiggle.apply(delta.x), jiggle.apply(delta.y));
            let d = delta.length();
            let l = (d - link.distance) / d * alpha * link.strength;
            let correction = delta * l;
            entities[t].add_velocity(-correction * link.bias);
            entities[s].add_velocity(correction * (1.0 - link.bias));
        }
    }
}
