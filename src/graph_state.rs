//! Shared node/link state read by the sequencer and the layout engine
//!
//! Each node has two regions with exactly one writer each:
//! - positions, written only through [`PositionWriter`] (the layout engine)
//! - display state (color, highlight, algorithm tag), written only through
//!   [`DisplayWriter`] (the sequencer)
//!
//! Neither writer is `Clone`, so a second writer for a region cannot exist.
//! [`GraphViewState`] is the cheap, cloneable read side.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::model::{GraphSnapshot, NodeId};
use crate::palette::{Color, colors};

/// Node position in world space
pub type Position = [f32; 3];

/// Keep a position only if the layout engine has actually placed the node.
///
/// Unset, non-finite and exact-origin positions all mean "not laid out yet".
pub fn laid_out(position: Option<Position>) -> Option<Position> {
    position.filter(|p| p.iter().all(|c| c.is_finite()) && *p != [0.0, 0.0, 0.0])
}

/// Display state of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDisplay {
    pub color: Color,
    pub highlighted: bool,
    /// Algorithm that claimed this node, if any
    pub algorithm: Option<String>,
}

impl Default for NodeDisplay {
    fn default() -> Self {
        Self {
            color: colors::NEUTRAL,
            highlighted: false,
            algorithm: None,
        }
    }
}

/// A link between two nodes (indices into the node list)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub source: usize,
    pub target: usize,
}

struct Shared {
    ids: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
    links: Vec<Link>,
    positions: RwLock<Vec<Option<Position>>>,
    display: RwLock<Vec<NodeDisplay>>,
}

/// Read-only view of the loaded graph
#[derive(Clone)]
pub struct GraphViewState {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for GraphViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphViewState")
            .field("nodes", &self.len())
            .field("links", &self.shared.links.len())
            .finish()
    }
}

impl GraphViewState {
    /// Build fresh state for a graph, handing out the two writers.
    ///
    /// Duplicate node ids keep their first occurrence; edges that mention
    /// unknown ids are dropped.
    pub fn load(snapshot: &GraphSnapshot) -> (GraphViewState, PositionWriter, DisplayWriter) {
        let mut ids = Vec::with_capacity(snapshot.nodes.len());
        let mut index = HashMap::with_capacity(snapshot.nodes.len());
        for id in &snapshot.nodes {
            if !index.contains_key(id) {
                index.insert(id.clone(), ids.len());
                ids.push(id.clone());
            }
        }

        let links = snapshot
            .edges
            .iter()
            .filter_map(|(source, target)| {
                Some(Link {
                    source: *index.get(source)?,
                    target: *index.get(target)?,
                })
            })
            .collect();

        let n = ids.len();
        let shared = Arc::new(Shared {
            ids,
            index,
            links,
            positions: RwLock::new(vec![None; n]),
            display: RwLock::new(vec![NodeDisplay::default(); n]),
        });

        (
            GraphViewState {
                shared: Arc::clone(&shared),
            },
            PositionWriter {
                shared: Arc::clone(&shared),
            },
            DisplayWriter { shared },
        )
    }

    pub fn len(&self) -> usize {
        self.shared.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.ids.is_empty()
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.shared.ids
    }

    pub fn links(&self) -> &[Link] {
        &self.shared.links
    }

    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.shared.index.get(id).copied()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.shared.index.contains_key(id)
    }

    /// Indices of the given ids that exist in this graph, first occurrence
    /// order, duplicates removed. Misses are skipped.
    pub fn resolve<'a>(&self, ids: impl IntoIterator<Item = &'a NodeId>) -> Vec<usize> {
        let mut seen = vec![false; self.len()];
        let mut out = Vec::new();
        for id in ids {
            match self.index_of(id) {
                Some(i) if !seen[i] => {
                    seen[i] = true;
                    out.push(i);
                }
                Some(_) => {}
                None => tracing::debug!(node = %id, "node not in current graph, skipping"),
            }
        }
        out
    }

    /// Raw position, whether or not the node has been laid out
    pub fn position(&self, index: usize) -> Option<Position> {
        self.shared.positions.read().get(index).copied().flatten()
    }

    /// Laid-out positions of the given nodes
    pub fn laid_out_positions(&self, indices: &[usize]) -> Vec<Position> {
        let positions = self.shared.positions.read();
        indices
            .iter()
            .filter_map(|&i| laid_out(positions.get(i).copied().flatten()))
            .collect()
    }

    /// Laid-out positions of every node
    pub fn all_laid_out(&self) -> Vec<Position> {
        let positions = self.shared.positions.read();
        positions.iter().filter_map(|p| laid_out(*p)).collect()
    }

    pub fn positioned_count(&self) -> usize {
        let positions = self.shared.positions.read();
        positions.iter().filter(|p| laid_out(**p).is_some()).count()
    }

    pub fn display(&self, index: usize) -> Option<NodeDisplay> {
        self.shared.display.read().get(index).cloned()
    }

    pub fn color_of(&self, id: &NodeId) -> Option<Color> {
        let i = self.index_of(id)?;
        self.shared.display.read().get(i).map(|d| d.color)
    }

    /// Current color of every node, in node order
    pub fn colors(&self) -> Vec<Color> {
        self.shared.display.read().iter().map(|d| d.color).collect()
    }

    /// Ids of the nodes currently highlighted
    pub fn highlighted(&self) -> Vec<NodeId> {
        let display = self.shared.display.read();
        display
            .iter()
            .zip(&self.shared.ids)
            .filter(|(d, _)| d.highlighted)
            .map(|(_, id)| id.clone())
            .collect()
    }

    /// True when both handles point at the same loaded graph
    pub fn same_graph(&self, other: &GraphViewState) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

/// Sole writer of node positions
pub struct PositionWriter {
    shared: Arc<Shared>,
}

impl PositionWriter {
    pub fn len(&self) -> usize {
        self.shared.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.ids.is_empty()
    }

    pub fn set(&self, index: usize, position: Position) {
        if let Some(slot) = self.shared.positions.write().get_mut(index) {
            *slot = Some(position);
        }
    }

    pub fn set_by_id(&self, id: &NodeId, position: Position) -> bool {
        match self.shared.index.get(id) {
            Some(&i) => {
                self.set(i, position);
                true
            }
            None => false,
        }
    }

    /// Replace every position at once, in node order
    pub fn publish(&self, positions: impl IntoIterator<Item = Position>) {
        let mut slots = self.shared.positions.write();
        for (slot, p) in slots.iter_mut().zip(positions) {
            *slot = Some(p);
        }
    }
}

/// Sole writer of node display state
pub struct DisplayWriter {
    shared: Arc<Shared>,
}

impl DisplayWriter {
    pub fn paint(&mut self, indices: &[usize], color: Color) {
        let mut display = self.shared.display.write();
        for &i in indices {
            if let Some(d) = display.get_mut(i) {
                d.color = color;
            }
        }
    }

    pub fn tag(&mut self, indices: &[usize], algorithm: Option<&str>) {
        let mut display = self.shared.display.write();
        for &i in indices {
            if let Some(d) = display.get_mut(i) {
                d.algorithm = algorithm.map(str::to_string);
            }
        }
    }

    /// Highlight exactly the given nodes
    pub fn set_highlighted(&mut self, indices: &[usize]) {
        let mut display = self.shared.display.write();
        for d in display.iter_mut() {
            d.highlighted = false;
        }
        for &i in indices {
            if let Some(d) = display.get_mut(i) {
                d.highlighted = true;
            }
        }
    }

    /// Every node back to neutral, untagged, not highlighted
    pub fn reset(&mut self) {
        let mut display = self.shared.display.write();
        for d in display.iter_mut() {
            *d = NodeDisplay::default();
        }
    }
}
