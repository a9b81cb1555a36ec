//! Graph input and layout output types
//!
//! These are the file-level shapes read and written by the CLI. The
//! simulation itself works on [`Entity`](crate::entity::Entity) values.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A node to be laid out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique identifier, referenced by edges
    pub id: String,

    /// Optional human-readable label, copied to the output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Collision radius, overriding the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,

    /// Many-body strength, overriding the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            radius: None,
            strength: None,
        }
    }
}

/// A link between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,

    /// Rest length, overriding the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,

    /// Spring strength; derived from node degrees when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            distance: None,
            strength: None,
        }
    }
}

/// A graph as read from an input file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl GraphData {
    /// Remove edges whose source or target is not a node; returns how many
    /// were removed
    pub fn drop_dangling_edges(&mut self) -> usize {
        let ids: BTreeSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        let before = self.edges.len();
        self.edges.retain(|e| {
            ids.contains(e.source.as_str()) && ids.contains(e.target.as_str())
        });
        before - self.edges.len()
    }
}

/// Final position of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub x: f64,
    pub y: f64,
}

/// Result of laying out a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Ticks the simulation ran
    pub ticks: usize,
    /// Whether alpha reached its minimum before the tick limit
    pub converged: bool,
    /// Alpha at the end of the run
    pub alpha: f64,
    /// Nodes ordered by id
    pub nodes: Vec<LayoutNode>,
}
