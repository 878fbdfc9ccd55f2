//! Interfaces to the host: the renderer/layout collaborator and the
//! observer that receives UI-visible playback state

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::graph_state::{GraphViewState, Position, PositionWriter};
use crate::model::{ComparisonRecord, CurrentStage, NodeId};

/// The rendering and layout collaborator.
///
/// Methods take `&self`; implementations that keep state use interior
/// mutability so the layout engine can run alongside playback.
pub trait Renderer {
    /// A new graph was loaded. The renderer's layout engine becomes the
    /// sole position writer.
    fn bind(&self, view: GraphViewState, positions: PositionWriter);

    /// Repaint after a display mutation
    fn refresh(&self);

    /// Move the camera to `position`, looking at `look_at`
    fn camera_position(&self, position: Position, look_at: Position, transition: Duration);

    /// Frame every node
    fn zoom_to_fit(&self, transition: Duration);

    /// Whether the layout engine has stopped moving nodes
    fn is_layout_idle(&self) -> bool;
}

impl<R: Renderer + ?Sized> Renderer for Arc<R> {
    fn bind(&self, view: GraphViewState, positions: PositionWriter) {
        (**self).bind(view, positions)
    }

    fn refresh(&self) {
        (**self).refresh()
    }

    fn camera_position(&self, position: Position, look_at: Position, transition: Duration) {
        (**self).camera_position(position, look_at, transition)
    }

    fn zoom_to_fit(&self, transition: Duration) {
        (**self).zoom_to_fit(transition)
    }

    fn is_layout_idle(&self) -> bool {
        (**self).is_layout_idle()
    }
}

/// Receives the UI-visible state a sequence publishes
pub trait PlaybackObserver {
    fn set_current_stage(&mut self, stage: Option<CurrentStage>);
    fn set_is_animating(&mut self, animating: bool);
    fn set_highlighted_nodes(&mut self, nodes: &BTreeSet<NodeId>);
    fn set_active_algorithm(&mut self, algorithm: Option<&str>);
    /// Append a comparison row, replacing any prior row for the same algorithm
    fn upsert_comparison(&mut self, record: ComparisonRecord);
    fn set_seed_nodes(&mut self, nodes: &BTreeSet<NodeId>);
    /// Grows monotonically within one seed-size pass
    fn set_activated_nodes(&mut self, nodes: &BTreeSet<NodeId>);
    fn set_current_seed_size(&mut self, size: Option<usize>);
}

/// Latest value of everything a sequence has published
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublishedState {
    pub current_stage: Option<CurrentStage>,
    pub is_animating: bool,
    pub highlighted_nodes: BTreeSet<NodeId>,
    pub active_algorithm: Option<String>,
    pub comparison_results: Vec<ComparisonRecord>,
    pub seed_nodes: BTreeSet<NodeId>,
    pub activated_nodes: BTreeSet<NodeId>,
    pub current_seed_size: Option<usize>,
}

impl PlaybackObserver for PublishedState {
    fn set_current_stage(&mut self, stage: Option<CurrentStage>) {
        self.current_stage = stage;
    }

    fn set_is_animating(&mut self, animating: bool) {
        self.is_animating = animating;
    }

    fn set_highlighted_nodes(&mut self, nodes: &BTreeSet<NodeId>) {
        self.highlighted_nodes = nodes.clone();
    }

    fn set_active_algorithm(&mut self, algorithm: Option<&str>) {
        self.active_algorithm = algorithm.map(str::to_string);
    }

    fn upsert_comparison(&mut self, record: ComparisonRecord) {
        self.comparison_results
            .retain(|r| r.algorithm != record.algorithm);
        self.comparison_results.push(record);
    }

    fn set_seed_nodes(&mut self, nodes: &BTreeSet<NodeId>) {
        self.seed_nodes = nodes.clone();
    }

    fn set_activated_nodes(&mut self, nodes: &BTreeSet<NodeId>) {
        self.activated_nodes = nodes.clone();
    }

    fn set_current_seed_size(&mut self, size: Option<usize>) {
        self.current_seed_size = size;
    }
}
