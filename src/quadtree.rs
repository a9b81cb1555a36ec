//! Point quadtree with a caller-defined aggregate per cell
//!
//! The tree is built incrementally from points whose positions are not known
//! in advance: the root starts as a single-point leaf and its bounding box
//! doubles toward any point that falls outside of it. Leaves hold up to
//! `leaf_capacity` points before they are split into four quadrants.
//!
//! Aggregates are not maintained during insertion. Call [`QuadTree::aggregate`]
//! after the tree is built to compute them bottom-up.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default number of points a leaf holds before it is split
pub const DEFAULT_LEAF_CAPACITY: usize = 32;

/// Default maximum depth below which leaves are no longer split
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Parameters controlling the construction of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadTreeConfig {
    /// The maximum number of points a leaf is filled with before it is
    /// subdivided. The maximum can be exceeded at `max_depth`, or when all
    /// points of a leaf coincide.
    pub leaf_capacity: usize,
    /// The maximum depth at which a leaf is still subdivided.
    pub max_depth: usize,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            leaf_capacity: DEFAULT_LEAF_CAPACITY,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Anything that can be placed in a quadtree
pub trait Positioned {
    fn position(&self) -> DVec2;
}

impl Positioned for DVec2 {
    fn position(&self) -> DVec2 {
        *self
    }
}

/// Axis-aligned bounding box (inclusive on all sides)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: DVec2,
    pub max: DVec2,
}

impl BoundingBox {
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    /// Zero-sized box around a single point
    pub fn singleton(point: DVec2) -> Self {
        Self::new(point, point)
    }

    /// Smallest box containing both this box and `point`
    pub fn hull(&self, point: DVec2) -> Self {
        Self::new(self.min.min(point), self.max.max(point))
    }

    pub fn contains(&self, point: DVec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Whether `other` lies entirely within this box
    pub fn encloses(&self, other: &BoundingBox) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Box grown by `margin` on every side
    pub fn expand(&self, margin: f64) -> Self {
        Self::new(self.min - DVec2::splat(margin), self.max + DVec2::splat(margin))
    }

    fn is_point(&self) -> bool {
        self.min == self.max
    }

    /// Square box with the same minimum corner, large enough to hold this one
    fn squared(&self) -> Self {
        let side = self.width().max(self.height());
        Self::new(self.min, (self.min + DVec2::splat(side)).max(self.max))
    }

    /// Quadrant of `point` relative to the center; ties go north/east.
    pub fn quadrant(&self, point: DVec2) -> Quadrant {
        let center = self.center();
        let east = point.x >= center.x;
        let north = point.y >= center.y;
        match (north, east) {
            (true, false) => Quadrant::NorthWest,
            (true, true) => Quadrant::NorthEast,
            (false, true) => Quadrant::SouthEast,
            (false, false) => Quadrant::SouthWest,
        }
    }

    /// The cell covered by one quadrant of this box
    pub fn child(&self, quadrant: Quadrant) -> Self {
        let center = self.center();
        match quadrant {
            Quadrant::NorthWest => Self::new(
                DVec2::new(self.min.x, center.y),
                DVec2::new(center.x, self.max.y),
            ),
            Quadrant::NorthEast => Self::new(center, self.max),
            Quadrant::SouthEast => Self::new(
                DVec2::new(center.x, self.min.y),
                DVec2::new(self.max.x, center.y),
            ),
            Quadrant::SouthWest => Self::new(self.min, center),
        }
    }

    /// This box doubled toward `quadrant`; the old box becomes the opposite quadrant.
    fn doubled_toward(&self, quadrant: Quadrant) -> Self {
        let (w, h) = (self.width(), self.height());
        let (mut min, mut max) = (self.min, self.max);
        match quadrant {
            Quadrant::NorthWest => {
                min.x -= w;
                max.y += h;
            }
            Quadrant::NorthEast => {
                max.x += w;
                max.y += h;
            }
            Quadrant::SouthEast => {
                max.x += w;
                min.y -= h;
            }
            Quadrant::SouthWest => {
                min.x -= w;
                min.y -= h;
            }
        }
        Self::new(min, max)
    }
}

/// One of the four children of a node, in traversal order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    NorthWest = 0,
    NorthEast = 1,
    SouthEast = 2,
    SouthWest = 3,
}

impl Quadrant {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> Self {
        match self {
            Quadrant::NorthWest => Quadrant::SouthEast,
            Quadrant::NorthEast => Quadrant::SouthWest,
            Quadrant::SouthEast => Quadrant::NorthWest,
            Quadrant::SouthWest => Quadrant::NorthEast,
        }
    }
}

/// A leaf: a non-empty list of points and the tight box around them
#[derive(Debug, Clone)]
pub struct Leaf<V, A> {
    pub bounding_box: BoundingBox,
    pub points: Vec<V>,
    pub aggregate: A,
}

/// An internal node covering a cell, with children in [`Quadrant`] order
#[derive(Debug, Clone)]
pub struct Node<V, A> {
    pub bounding_box: BoundingBox,
    pub aggregate: A,
    pub children: [QuadTree<V, A>; 4],
}

/// Quadtree over points of type `V`, carrying an aggregate of type `A` per cell.
///
/// Trees are built with `A = ()` and turned into aggregated trees with
/// [`QuadTree::aggregate`].
#[derive(Debug, Clone)]
pub enum QuadTree<V, A = ()> {
    Empty,
    Leaf(Leaf<V, A>),
    Node(Box<Node<V, A>>),
}

impl<V, A> Default for QuadTree<V, A> {
    fn default() -> Self {
        QuadTree::Empty
    }
}

impl<V: Positioned> QuadTree<V> {
    pub fn new() -> Self {
        QuadTree::Empty
    }

    /// Build a tree by inserting every point in order
    pub fn from_list(config: &QuadTreeConfig, points: impl IntoIterator<Item = V>) -> Self {
        points
            .into_iter()
            .fold(QuadTree::Empty, |tree, point| tree.insert(config, point))
    }

    /// Add a point, growing the root first if the point lies outside of it.
    ///
    /// Points with a non-finite position are dropped: no box could ever
    /// contain them.
    pub fn insert(self, config: &QuadTreeConfig, vertex: V) -> Self {
        let point = vertex.position();
        if !point.is_finite() {
            debug!(?point, "dropping non-finite point from quadtree");
            return self;
        }

        match self {
            QuadTree::Node(node) => {
                let node = Self::grow_to_contain(node, point);
                Self::insert_into_node(node, config, vertex, point, 0)
            }
            tree => tree.insert_at(config, vertex, point, None, 0),
        }
    }

    fn grow_to_contain(mut node: Box<Node<V, ()>>, point: DVec2) -> Box<Node<V, ()>> {
        while !node.bounding_box.contains(point) {
            let toward = node.bounding_box.quadrant(point);
            let bounding_box = node.bounding_box.doubled_toward(toward);
            let mut children = [
                QuadTree::Empty,
                QuadTree::Empty,
                QuadTree::Empty,
                QuadTree::Empty,
            ];
            children[toward.opposite().index()] = QuadTree::Node(node);
            node = Box::new(Node {
                bounding_box,
                aggregate: (),
                children,
            });
        }
        node
    }

    /// `cell` is the region this subtree is responsible for; `None` for the root.
    fn insert_at(
        self,
        config: &QuadTreeConfig,
        vertex: V,
        point: DVec2,
        cell: Option<BoundingBox>,
        depth: usize,
    ) -> Self {
        match self {
            QuadTree::Empty => QuadTree::Leaf(Leaf {
                bounding_box: BoundingBox::singleton(point),
                points: vec![vertex],
                aggregate: (),
            }),
            QuadTree::Leaf(mut leaf) => {
                leaf.bounding_box = leaf.bounding_box.hull(point);
                leaf.points.push(vertex);
                if leaf.points.len() > config.leaf_capacity
                    && depth < config.max_depth
                    && !leaf.bounding_box.is_point()
                {
                    Self::split(leaf, config, cell, depth)
                } else {
                    QuadTree::Leaf(leaf)
                }
            }
            QuadTree::Node(node) => Self::insert_into_node(node, config, vertex, point, depth),
        }
    }

    fn insert_into_node(
        mut node: Box<Node<V, ()>>,
        config: &QuadTreeConfig,
        vertex: V,
        point: DVec2,
        depth: usize,
    ) -> Self {
        let quadrant = node.bounding_box.quadrant(point);
        let cell = node.bounding_box.child(quadrant);
        let slot = &mut node.children[quadrant.index()];
        *slot = std::mem::take(slot).insert_at(config, vertex, point, Some(cell), depth + 1);
        QuadTree::Node(node)
    }

    fn split(
        leaf: Leaf<V, ()>,
        config: &QuadTreeConfig,
        cell: Option<BoundingBox>,
        depth: usize,
    ) -> Self {
        let bounding_box = cell.unwrap_or_else(|| leaf.bounding_box.squared());
        let node = Box::new(Node {
            bounding_box,
            aggregate: (),
            children: Default::default(),
        });
        let mut tree = QuadTree::Node(node);
        for vertex in leaf.points {
            let point = vertex.position();
            tree = match tree {
                QuadTree::Node(node) => Self::insert_into_node(node, config, vertex, point, depth),
                other => other,
            };
        }
        tree
    }
}

impl<V, A> QuadTree<V, A> {
    pub fn is_empty(&self) -> bool {
        matches!(self, QuadTree::Empty)
    }

    /// Number of points stored in the tree
    pub fn len(&self) -> usize {
        match self {
            QuadTree::Empty => 0,
            QuadTree::Leaf(leaf) => leaf.points.len(),
            QuadTree::Node(node) => node.children.iter().map(QuadTree::len).sum(),
        }
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            QuadTree::Empty => None,
            QuadTree::Leaf(leaf) => Some(leaf.bounding_box),
            QuadTree::Node(node) => Some(node.bounding_box),
        }
    }

    /// Aggregate value of the root, if the tree is not empty
    pub fn root_aggregate(&self) -> Option<&A> {
        match self {
            QuadTree::Empty => None,
            QuadTree::Leaf(leaf) => Some(&leaf.aggregate),
            QuadTree::Node(node) => Some(&node.aggregate),
        }
    }

    /// All points, visiting children in NW, NE, SE, SW order
    pub fn to_list(&self) -> Vec<&V> {
        let mut out = Vec::with_capacity(self.len());
        self.collect_into(&mut out);
        out
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a V>) {
        match self {
            QuadTree::Empty => {}
            QuadTree::Leaf(leaf) => out.extend(leaf.points.iter()),
            QuadTree::Node(node) => {
                for child in node.children.iter() {
                    child.collect_into(out);
                }
            }
        }
    }

    /// Compute an aggregate for every cell, bottom-up.
    ///
    /// Leaves combine their points with `combine_vertices(first, rest)`; nodes
    /// combine the aggregates of their non-empty children with
    /// `combine_aggregates(first, rest)`. A node whose children are all empty
    /// becomes `Empty`. Both functions are expected to be associative; this is
    /// not checked.
    pub fn aggregate<B, FV, FA>(self, combine_vertices: FV, combine_aggregates: FA) -> QuadTree<V, B>
    where
        FV: Fn(&V, &[V]) -> B,
        FA: Fn(&B, &[&B]) -> B,
    {
        self.aggregate_with(&combine_vertices, &combine_aggregates)
    }

    fn aggregate_with<B, FV, FA>(self, combine_vertices: &FV, combine_aggregates: &FA) -> QuadTree<V, B>
    where
        FV: Fn(&V, &[V]) -> B,
        FA: Fn(&B, &[&B]) -> B,
    {
        match self {
            QuadTree::Empty => QuadTree::Empty,
            QuadTree::Leaf(leaf) => {
                let aggregate = leaf
                    .points
                    .split_first()
                    .map(|(first, rest)| combine_vertices(first, rest));
                match aggregate {
                    Some(aggregate) => QuadTree::Leaf(Leaf {
                        bounding_box: leaf.bounding_box,
                        points: leaf.points,
                        aggregate,
                    }),
                    None => QuadTree::Empty,
                }
            }
            QuadTree::Node(node) => {
                let Node {
                    bounding_box,
                    children,
                    ..
                } = *node;
                let children =
                    children.map(|child| child.aggregate_with(combine_vertices, combine_aggregates));
                let aggregate = {
                    let aggregates: Vec<&B> =
                        children.iter().filter_map(QuadTree::root_aggregate).collect();
                    aggregates
                        .split_first()
                        .map(|(first, rest)| combine_aggregates(*first, rest))
                };
                match aggregate {
                    Some(aggregate) => QuadTree::Node(Box::new(Node {
                        bounding_box,
                        aggregate,
                        children,
                    })),
                    None => QuadTree::Empty,
                }
            }
        }
    }
}
